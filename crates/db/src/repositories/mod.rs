//! Repository abstractions for data access.
//!
//! Repositories hide the `SeaORM` details from the rest of the application
//! and own their transaction boundaries: every mutating operation begins a
//! database transaction, takes the balance row locks it needs in the fixed
//! (foreign, base) order, and commits or rolls back as a unit.

pub mod amlo;
pub mod audit;
pub mod balance;
pub mod branch;
pub mod eod;
pub mod exchange;
pub mod ledger;
pub mod rate;
pub mod session;

pub use amlo::{AmloRepository, CreateReservationInput, OverdueReport, SubmitOutcome};
pub use audit::{AuditLogRepository, AuditRecord};
pub use balance::BalanceRepository;
pub use branch::{BranchRepository, BranchStatus};
pub use eod::{EodRepository, EodRun};
pub use exchange::{
    DualLineInput, ExchangeInput, ExchangeOutcome, ExchangeService, InitialBalanceItem,
};
pub use ledger::{LedgerFilter, LedgerRepository};
pub use rate::{BoardRate, RateItem, RateRepository};
pub use session::SessionRepository;

use sea_orm::DbErr;
use satang_shared::AppError;

pub(crate) fn db_err(err: DbErr) -> AppError {
    AppError::Database(err.to_string())
}
