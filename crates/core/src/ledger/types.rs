//! Ledger domain types.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use satang_shared::types::{BranchId, BusinessGroupId, LedgerEntryId, OperatorId};

/// Type of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    /// Branch buys foreign currency from a customer.
    Buy,
    /// Branch sells foreign currency to a customer.
    Sell,
    /// Sign-inverted reversal of an earlier buy/sell.
    Reversal,
    /// Manual balance adjustment.
    AdjustBalance,
    /// One-shot opening balance for a (branch, currency).
    InitialBalance,
    /// Physical removal of cash at end of day.
    CashOut,
    /// Reconciliation artefact closing the theoretical/actual gap.
    EodDiff,
}

impl EntryType {
    /// Returns true for the types a reversal may target.
    #[must_use]
    pub const fn is_reversible(self) -> bool {
        matches!(self, Self::Buy | Self::Sell)
    }
}

/// Lifecycle status of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    /// Entry counts toward balances and aggregates.
    Active,
    /// Entry has been voided by a later reversal entry.
    Reversed,
}

/// Direction of a trade from the branch's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeDirection {
    /// The branch buys foreign currency (foreign stock up, base down).
    BranchBuys,
    /// The branch sells foreign currency (foreign stock down, base up).
    BranchSells,
}

impl TradeDirection {
    /// The entry type written for this direction.
    #[must_use]
    pub const fn entry_type(self) -> EntryType {
        match self {
            Self::BranchBuys => EntryType::Buy,
            Self::BranchSells => EntryType::Sell,
        }
    }
}

/// Domain view of a committed ledger row.
///
/// `balance_before`/`balance_after` are denormalisations for receipt
/// printing only; aggregations must fold over `amount`/`local_amount`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Surrogate id.
    pub id: LedgerEntryId,
    /// Human-readable transaction number, unique per branch.
    pub transaction_no: String,
    /// Sequence within (branch, transaction_date), contiguous from 1.
    pub daily_sequence: i32,
    /// Entry type.
    pub entry_type: EntryType,
    /// Owning branch.
    pub branch_id: BranchId,
    /// Affected currency code (ISO-like).
    pub currency: String,
    /// Operator who committed the entry.
    pub operator_id: OperatorId,
    /// Customer name, when captured.
    pub customer_name: Option<String>,
    /// Customer document id, when captured.
    pub customer_id: Option<String>,
    /// Stated purpose of the exchange.
    pub purpose: Option<String>,
    /// Free-form remarks.
    pub remarks: Option<String>,
    /// Signed foreign-currency amount.
    pub amount: Decimal,
    /// Rate captured at commit time.
    pub rate: Decimal,
    /// Signed base-currency amount.
    pub local_amount: Decimal,
    /// Balance of the affected currency before this entry.
    pub balance_before: Decimal,
    /// Balance of the affected currency after this entry.
    pub balance_after: Decimal,
    /// Business date.
    pub transaction_date: NaiveDate,
    /// Wall-clock commit time.
    pub created_at: DateTime<Utc>,
    /// Lifecycle status.
    pub status: EntryStatus,
    /// For reversals, the `transaction_no` of the voided entry.
    pub original_transaction_no: Option<String>,
    /// Shared group id when one customer operation split into several rows.
    pub business_group_id: Option<BusinessGroupId>,
    /// 1-based position inside the business group.
    pub group_sequence: Option<i32>,
    /// Receipt filename, once rendered.
    pub receipt_filename: Option<String>,
    /// How many times the receipt has been printed.
    pub print_count: i32,
}

/// Draft of a ledger row produced by a planner, before persistence assigns
/// id, transaction number, and timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryDraft {
    /// Entry type.
    pub entry_type: EntryType,
    /// Affected currency code.
    pub currency: String,
    /// Signed foreign-currency amount.
    pub amount: Decimal,
    /// Rate captured for the draft (zero for non-trade entries).
    pub rate: Decimal,
    /// Signed base-currency amount.
    pub local_amount: Decimal,
    /// Delta to apply to the affected currency's balance.
    pub balance_delta: Decimal,
    /// Delta to apply to the branch base-currency balance.
    pub base_delta: Decimal,
    /// For reversals, the voided entry's transaction number.
    pub original_transaction_no: Option<String>,
    /// Position inside a dual-direction group, when applicable.
    pub group_sequence: Option<i32>,
}

/// Formats the human-readable transaction number.
///
/// `<branch code>-<YYYYMMDD>-<4-digit sequence>`; the sequence restarts at 1
/// each business date, so the triple is unique per branch.
#[must_use]
pub fn format_transaction_no(branch_code: &str, date: NaiveDate, sequence: i32) -> String {
    format!("{branch_code}-{}-{sequence:04}", date.format("%Y%m%d"))
}
