//! Step 3: stock report (`CalBalance`).

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ledger::{EntryStatus, EntryType, LedgerEntry};

/// Per-currency stock position over one business period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRow {
    /// Currency code.
    pub currency: String,
    /// Opening balance at period start.
    pub opening: Decimal,
    /// Net in-period movement.
    pub change: Decimal,
    /// Theoretical balance: `opening + change`.
    pub current: Decimal,
}

/// The full stock report, rows sorted by currency code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockReport {
    /// One row per currency with an opening balance or in-period movement.
    pub rows: Vec<StockRow>,
}

impl StockReport {
    /// Looks up the theoretical balance for a currency.
    #[must_use]
    pub fn theoretical(&self, currency: &str) -> Option<Decimal> {
        self.rows
            .iter()
            .find(|r| r.currency == currency)
            .map(|r| r.current)
    }
}

fn counts_for_foreign(entry: &LedgerEntry) -> bool {
    entry.status == EntryStatus::Active
        && matches!(
            entry.entry_type,
            EntryType::Buy
                | EntryType::Sell
                | EntryType::InitialBalance
                | EntryType::AdjustBalance
                | EntryType::CashOut
        )
}

/// Computes the stock report.
///
/// Foreign change folds `amount` over active buy/sell/initial/adjust/cash-out
/// entries; a reversed trade and its reversal both drop out. The base
/// currency folds `local_amount` across every entry regardless of status, so
/// a trade and its reversal cancel arithmetically. Reconciliation artefacts
/// (`eod_diff`) never count.
#[must_use]
pub fn compute_stock(
    openings: &BTreeMap<String, Decimal>,
    entries: &[LedgerEntry],
    base_currency: &str,
) -> StockReport {
    let mut currencies: BTreeSet<String> = openings.keys().cloned().collect();
    for entry in entries {
        currencies.insert(entry.currency.clone());
    }

    let rows = currencies
        .into_iter()
        .map(|currency| {
            let is_base = currency == base_currency;
            let change: Decimal = entries
                .iter()
                .filter(|e| e.entry_type != EntryType::EodDiff)
                .filter_map(|e| {
                    if is_base {
                        // Foreign trades settle against the base till too.
                        Some(e.local_amount)
                    } else if e.currency == currency && counts_for_foreign(e) {
                        Some(e.amount)
                    } else {
                        None
                    }
                })
                .sum();
            let opening = openings.get(&currency).copied().unwrap_or(Decimal::ZERO);
            StockRow {
                currency,
                opening,
                change,
                current: opening + change,
            }
        })
        .collect();

    StockReport { rows }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;
    use satang_shared::types::{BranchId, LedgerEntryId, OperatorId};

    fn entry(
        entry_type: EntryType,
        currency: &str,
        amount: Decimal,
        local: Decimal,
        status: EntryStatus,
    ) -> LedgerEntry {
        LedgerEntry {
            id: LedgerEntryId::new(),
            transaction_no: "BKK01-20260826-0001".to_string(),
            daily_sequence: 1,
            entry_type,
            branch_id: BranchId::new(),
            currency: currency.to_string(),
            operator_id: OperatorId::new(),
            customer_name: None,
            customer_id: None,
            purpose: None,
            remarks: None,
            amount,
            rate: Decimal::ZERO,
            local_amount: local,
            balance_before: Decimal::ZERO,
            balance_after: Decimal::ZERO,
            transaction_date: chrono::NaiveDate::from_ymd_opt(2026, 8, 26).unwrap(),
            created_at: Utc.with_ymd_and_hms(2026, 8, 26, 10, 0, 0).unwrap(),
            status,
            original_transaction_no: None,
            business_group_id: None,
            group_sequence: None,
            receipt_filename: None,
            print_count: 0,
        }
    }

    #[test]
    fn test_foreign_change_folds_signed_amounts() {
        let openings = BTreeMap::from([("USD".to_string(), dec!(1000))]);
        let entries = vec![
            entry(EntryType::Buy, "USD", dec!(100), dec!(-3500), EntryStatus::Active),
            entry(EntryType::Sell, "USD", dec!(-40), dec!(1440), EntryStatus::Active),
            entry(EntryType::CashOut, "USD", dec!(-200), Decimal::ZERO, EntryStatus::Active),
        ];
        let report = compute_stock(&openings, &entries, "THB");

        let usd = report.rows.iter().find(|r| r.currency == "USD").unwrap();
        assert_eq!(usd.opening, dec!(1000));
        assert_eq!(usd.change, dec!(-140));
        assert_eq!(usd.current, dec!(860));
    }

    #[test]
    fn test_reversed_trade_drops_out_of_foreign_stock() {
        let openings = BTreeMap::from([("USD".to_string(), dec!(1000))]);
        let entries = vec![
            entry(EntryType::Buy, "USD", dec!(100), dec!(-3500), EntryStatus::Reversed),
            entry(EntryType::Reversal, "USD", dec!(-100), dec!(3500), EntryStatus::Active),
        ];
        let report = compute_stock(&openings, &entries, "THB");
        assert_eq!(report.theoretical("USD"), Some(dec!(1000)));
    }

    #[test]
    fn test_base_change_is_signed_local_sum() {
        let openings = BTreeMap::from([("THB".to_string(), dec!(10000))]);
        let entries = vec![
            entry(EntryType::Buy, "USD", dec!(100), dec!(-3500), EntryStatus::Active),
            entry(EntryType::Sell, "EUR", dec!(-10), dec!(390), EntryStatus::Active),
        ];
        let report = compute_stock(&openings, &entries, "THB");
        assert_eq!(report.theoretical("THB"), Some(dec!(6890)));
    }

    #[test]
    fn test_base_reversal_cancels_arithmetically() {
        // For the base till, a reversed buy and its reversal both stay in
        // the fold and sum to zero.
        let openings = BTreeMap::from([("THB".to_string(), dec!(10000))]);
        let entries = vec![
            entry(EntryType::Buy, "USD", dec!(100), dec!(-3500), EntryStatus::Reversed),
            entry(EntryType::Reversal, "USD", dec!(-100), dec!(3500), EntryStatus::Active),
        ];
        let report = compute_stock(&openings, &entries, "THB");
        assert_eq!(report.theoretical("THB"), Some(dec!(10000)));
    }

    #[test]
    fn test_eod_diff_never_counts() {
        let openings = BTreeMap::from([("USD".to_string(), dec!(100))]);
        let entries = vec![entry(
            EntryType::EodDiff,
            "USD",
            dec!(-5),
            Decimal::ZERO,
            EntryStatus::Active,
        )];
        let report = compute_stock(&openings, &entries, "THB");
        assert_eq!(report.theoretical("USD"), Some(dec!(100)));
    }

    #[test]
    fn test_currency_with_movement_but_no_opening_appears() {
        let openings = BTreeMap::new();
        let entries = vec![entry(
            EntryType::InitialBalance,
            "JPY",
            dec!(50000),
            Decimal::ZERO,
            EntryStatus::Active,
        )];
        let report = compute_stock(&openings, &entries, "THB");
        assert_eq!(report.theoretical("JPY"), Some(dec!(50000)));
    }
}
