//! Append-only ledger entries and the transaction planning engine.
//!
//! This module implements the pure half of the transaction engine:
//! - Entry types and the domain view of a ledger row
//! - Quote checks with exact shortfall reporting
//! - Exchange, reversal, initial-balance, and adjustment planning
//! - Dual-direction (multi-currency, mixed-direction) splitting
//! - BOT-Provider threshold detection
//!
//! Planners validate and produce entry drafts plus balance deltas; the
//! repository layer applies them under row locks in one database
//! transaction.

pub mod engine;
pub mod error;
pub mod types;

#[cfg(test)]
mod engine_props;

pub use engine::{
    adjustment_crosses_bot_threshold, bot_threshold_exceeded, plan_adjustment, plan_cash_out,
    plan_dual_direction, plan_exchange,
    plan_initial_balance, plan_reversal, quote_check, zeroable, DenominationLine, DualDirectionPlan,
    ExchangePlan, QuoteOutcome, ReversalPlan, BOT_THRESHOLD_USD,
};
pub use error::LedgerError;
pub use types::{
    format_transaction_no, EntryDraft, EntryStatus, EntryType, LedgerEntry, TradeDirection,
};
