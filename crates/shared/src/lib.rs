//! Shared types, errors, and configuration for Satang.
//!
//! This crate provides common types used across all other crates:
//! - Typed IDs for type-safe entity references
//! - Application-wide error taxonomy
//! - Configuration management
//! - Authentication types (capabilities, current user, JWT claims)
//! - Pagination types for list endpoints

pub mod auth;
pub mod config;
pub mod error;
pub mod jwt;
pub mod types;

pub use auth::{Capability, CurrentUser, Language};
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use jwt::{Claims, JwtConfig, JwtError, JwtService};
