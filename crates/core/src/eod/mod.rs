//! End-of-day settlement pipeline.
//!
//! Seven ordered steps close one business period and open the next:
//! freeze, income report, stock report, difference verification, cash-out,
//! snapshot and report rendering, completion. Each step is idempotent on
//! retry; advancing past a step is one-way.
//!
//! The step computations here are pure folds over ledger entries; the
//! repository layer feeds them the period window's rows and persists the
//! results.

pub mod error;
pub mod income;
pub mod phase;
pub mod stock;
pub mod verify;

#[cfg(test)]
mod pipeline_props;

pub use error::EodError;
pub use income::{compute_income, IncomeReport, IncomeRow};
pub use phase::{Advance, EodPhase, EodRunStatus};
pub use stock::{compute_stock, StockReport, StockRow};
pub use verify::{plan_cash_outs, plan_verifications, CashOutRequest, VerificationOutcome, VerificationRow};
