//! Step 2: income report (`CalGain`).

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::currency::rounding::round_local;
use crate::ledger::{EntryType, LedgerEntry};

/// Per-currency income over one business period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomeRow {
    /// Currency code.
    pub currency: String,
    /// Σ |amount| over buys.
    pub total_buy: Decimal,
    /// Σ |amount| over sells.
    pub total_sell: Decimal,
    /// Realised base-currency income.
    pub income: Decimal,
    /// Spread income from the matched volume.
    pub spread_income: Decimal,
    /// Last-seen buy rate in the period, when any.
    pub buy_rate: Option<Decimal>,
    /// Last-seen sell rate in the period, when any.
    pub sell_rate: Option<Decimal>,
}

/// The full income report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomeReport {
    /// Foreign-currency rows, sorted by currency code. The base currency is
    /// excluded from this table in user-facing renderings.
    pub rows: Vec<IncomeRow>,
    /// Synthetic base-currency row: signed sum of `local_amount` across
    /// every foreign trade in the period.
    pub base_flow: Decimal,
    /// Sum of `income` across all rows.
    pub total_income: Decimal,
}

#[derive(Default)]
struct Accumulator {
    total_buy: Decimal,
    total_sell: Decimal,
    buy_local: Decimal,
    sell_local: Decimal,
    reversal_local: Decimal,
    buy_rate: Option<Decimal>,
    sell_rate: Option<Decimal>,
}

/// Computes the income report from the period's trade entries.
///
/// Reversed trades stay in the sums; the reversal entry's signed
/// `local_amount` cancels the income the original booked. The income per
/// currency is `sell_local − |buy_local| + reversal_local`; spread income
/// multiplies the matched volume by the last-seen rate gap.
#[must_use]
pub fn compute_income(entries: &[LedgerEntry], base_currency: &str) -> IncomeReport {
    let mut per_currency: BTreeMap<String, Accumulator> = BTreeMap::new();
    let mut base_flow = Decimal::ZERO;

    for entry in entries {
        if entry.currency == base_currency {
            continue;
        }
        match entry.entry_type {
            EntryType::Buy => {
                let acc = per_currency.entry(entry.currency.clone()).or_default();
                acc.total_buy += entry.amount.abs();
                acc.buy_local += entry.local_amount;
                acc.buy_rate = Some(entry.rate);
                base_flow += entry.local_amount;
            }
            EntryType::Sell => {
                let acc = per_currency.entry(entry.currency.clone()).or_default();
                acc.total_sell += entry.amount.abs();
                acc.sell_local += entry.local_amount;
                acc.sell_rate = Some(entry.rate);
                base_flow += entry.local_amount;
            }
            EntryType::Reversal => {
                let acc = per_currency.entry(entry.currency.clone()).or_default();
                acc.reversal_local += entry.local_amount;
                base_flow += entry.local_amount;
            }
            _ => {}
        }
    }

    let mut total_income = Decimal::ZERO;
    let rows: Vec<IncomeRow> = per_currency
        .into_iter()
        .map(|(currency, acc)| {
            let income = acc.sell_local - acc.buy_local.abs() + acc.reversal_local;
            let spread_income = match (acc.buy_rate, acc.sell_rate) {
                (Some(buy), Some(sell)) => {
                    round_local(acc.total_buy.min(acc.total_sell) * (sell - buy))
                }
                _ => Decimal::ZERO,
            };
            total_income += income;
            IncomeRow {
                currency,
                total_buy: acc.total_buy,
                total_sell: acc.total_sell,
                income,
                spread_income,
                buy_rate: acc.buy_rate,
                sell_rate: acc.sell_rate,
            }
        })
        .collect();

    IncomeReport {
        rows,
        base_flow,
        total_income,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::EntryStatus;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;
    use satang_shared::types::{BranchId, LedgerEntryId, OperatorId};

    fn trade(
        entry_type: EntryType,
        currency: &str,
        amount: Decimal,
        rate: Decimal,
        local: Decimal,
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
            rate,
            local_amount: local,
            balance_before: Decimal::ZERO,
            balance_after: Decimal::ZERO,
            transaction_date: chrono::NaiveDate::from_ymd_opt(2026, 8, 26).unwrap(),
            created_at: Utc.with_ymd_and_hms(2026, 8, 26, 10, 0, 0).unwrap(),
            status: EntryStatus::Active,
            original_transaction_no: None,
            business_group_id: None,
            group_sequence: None,
            receipt_filename: None,
            print_count: 0,
        }
    }

    #[test]
    fn test_buy_then_sell_income_and_spread() {
        // Buy 100 @ 35 (pay 3500), sell 80 @ 36 (receive 2880).
        let entries = vec![
            trade(EntryType::Buy, "USD", dec!(100), dec!(35), dec!(-3500)),
            trade(EntryType::Sell, "USD", dec!(-80), dec!(36), dec!(2880)),
        ];
        let report = compute_income(&entries, "THB");

        assert_eq!(report.rows.len(), 1);
        let row = &report.rows[0];
        assert_eq!(row.total_buy, dec!(100));
        assert_eq!(row.total_sell, dec!(80));
        // 2880 − 3500 = −620 realised base flow for USD.
        assert_eq!(row.income, dec!(-620));
        // min(100, 80) * (36 − 35) = 80.
        assert_eq!(row.spread_income, dec!(80.00));
        assert_eq!(report.base_flow, dec!(-620));
    }

    #[test]
    fn test_reversal_cancels_booked_income() {
        // A sell and its reversal: income nets to zero.
        let entries = vec![
            trade(EntryType::Sell, "USD", dec!(-100), dec!(36), dec!(3600)),
            trade(EntryType::Reversal, "USD", dec!(100), dec!(36), dec!(-3600)),
        ];
        let report = compute_income(&entries, "THB");
        assert_eq!(report.rows[0].income, Decimal::ZERO);
        assert_eq!(report.base_flow, Decimal::ZERO);
    }

    #[test]
    fn test_spread_needs_both_rates() {
        let entries = vec![trade(EntryType::Buy, "USD", dec!(100), dec!(35), dec!(-3500))];
        let report = compute_income(&entries, "THB");
        assert_eq!(report.rows[0].spread_income, Decimal::ZERO);
        assert_eq!(report.rows[0].sell_rate, None);
    }

    #[test]
    fn test_last_seen_rate_pair_wins() {
        let entries = vec![
            trade(EntryType::Buy, "USD", dec!(100), dec!(35), dec!(-3500)),
            trade(EntryType::Buy, "USD", dec!(50), dec!(35.20), dec!(-1760)),
            trade(EntryType::Sell, "USD", dec!(-60), dec!(36), dec!(2160)),
        ];
        let report = compute_income(&entries, "THB");
        let row = &report.rows[0];
        assert_eq!(row.buy_rate, Some(dec!(35.20)));
        // min(150, 60) * (36 − 35.20) = 48.
        assert_eq!(row.spread_income, dec!(48.00));
    }

    #[test]
    fn test_base_currency_entries_ignored_in_rows() {
        let entries = vec![trade(
            EntryType::AdjustBalance,
            "THB",
            Decimal::ZERO,
            Decimal::ZERO,
            dec!(500),
        )];
        let report = compute_income(&entries, "THB");
        assert!(report.rows.is_empty());
        assert_eq!(report.base_flow, Decimal::ZERO);
    }

    #[test]
    fn test_currencies_sorted() {
        let entries = vec![
            trade(EntryType::Buy, "USD", dec!(10), dec!(35), dec!(-350)),
            trade(EntryType::Buy, "EUR", dec!(10), dec!(39), dec!(-390)),
        ];
        let report = compute_income(&entries, "THB");
        assert_eq!(report.rows[0].currency, "EUR");
        assert_eq!(report.rows[1].currency, "USD");
    }
}
