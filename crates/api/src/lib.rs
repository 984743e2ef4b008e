//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - REST API routes for rates, balances, transactions, EOD, and AMLO
//! - Authentication middleware decoding bearer tokens to a `CurrentUser`
//! - The `AppError` → JSON response mapping

pub mod document;
pub mod error;
pub mod middleware;
pub mod routes;

use axum::Router;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use satang_core::storage::DocumentStore;
use satang_shared::{AppConfig, JwtService};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: Arc<DatabaseConnection>,
    /// JWT service for token validation.
    pub jwt_service: Arc<JwtService>,
    /// Receipt/report file tree.
    pub store: Arc<DocumentStore>,
    /// Read-only AMLO template and field-map tree.
    pub templates: Arc<DocumentStore>,
    /// Loaded configuration.
    pub config: Arc<AppConfig>,
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes_with_state(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
