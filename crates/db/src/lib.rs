//! Database layer with `SeaORM` entities and repositories.
//!
//! This crate provides:
//! - `SeaORM` entity definitions
//! - Repository abstractions for data access
//! - Database migrations
//!
//! Repositories own their transaction boundaries: every mutating operation
//! begins a database transaction, takes the Balance row locks it needs in
//! the fixed (foreign, base) order, and commits or rolls back as a unit.

pub mod convert;
pub mod entities;
pub mod migration;
pub mod repositories;

pub use repositories::{
    AmloRepository, AuditLogRepository, BalanceRepository, BranchRepository, EodRepository,
    ExchangeService, LedgerRepository, RateRepository, SessionRepository,
};

use sea_orm::{Database, DatabaseConnection, DbErr};

/// Establishes a connection to the database.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    Database::connect(database_url).await
}
