//! Steps 4 and 5: difference verification and cash-out planning.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::EodError;
use super::stock::StockReport;
use crate::currency::Movement;
use crate::ledger::{EntryDraft, EntryType};

/// One verified currency: theoretical vs physically counted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationRow {
    /// Currency code.
    pub currency: String,
    /// Balance implied by the ledger.
    pub theoretical_balance: Decimal,
    /// Balance the operator counted in the till.
    pub actual_balance: Decimal,
    /// `actual − theoretical`.
    pub difference: Decimal,
}

/// Output of step 4: verification rows plus the reconciliation entries that
/// converge each Balance onto the counted value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationOutcome {
    /// One row per currency, in report order.
    pub rows: Vec<VerificationRow>,
    /// One `eod_diff` draft per non-zero difference.
    pub diff_drafts: Vec<EntryDraft>,
}

/// A requested physical removal of cash at step 5.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashOutRequest {
    /// Currency code.
    pub currency: String,
    /// Positive amount removed from the till.
    pub amount: Decimal,
}

/// Plans step 4 from the stock report and the operator's counts.
///
/// Every currency in the stock report needs a count. Non-zero differences
/// produce an `eod_diff` entry whose signed amount equals the difference, so
/// Balance converges to `actual`.
pub fn plan_verifications(
    stock: &StockReport,
    counts: &BTreeMap<String, Decimal>,
    base_currency: &str,
) -> Result<VerificationOutcome, EodError> {
    let mut rows = Vec::with_capacity(stock.rows.len());
    let mut diff_drafts = Vec::new();

    for stock_row in &stock.rows {
        let actual = counts
            .get(&stock_row.currency)
            .copied()
            .ok_or_else(|| EodError::MissingCount(stock_row.currency.clone()))?;
        let difference = actual - stock_row.current;

        if difference != Decimal::ZERO {
            let movement =
                Movement::for_currency(stock_row.currency == base_currency, difference);
            let (amount, local_amount) = movement.columns();
            diff_drafts.push(EntryDraft {
                entry_type: EntryType::EodDiff,
                currency: stock_row.currency.clone(),
                amount,
                rate: Decimal::ZERO,
                local_amount,
                balance_delta: difference,
                base_delta: Decimal::ZERO,
                original_transaction_no: None,
                group_sequence: None,
            });
        }

        rows.push(VerificationRow {
            currency: stock_row.currency.clone(),
            theoretical_balance: stock_row.current,
            actual_balance: actual,
            difference,
        });
    }

    Ok(VerificationOutcome { rows, diff_drafts })
}

/// Plans step 5 from the verified counts.
///
/// Each cash-out reduces the verified balance; what remains becomes the
/// next period's opening. Removing more than was counted is refused.
pub fn plan_cash_outs(
    verified: &[VerificationRow],
    requests: &[CashOutRequest],
    base_currency: &str,
) -> Result<Vec<EntryDraft>, EodError> {
    let counted: BTreeMap<&str, Decimal> = verified
        .iter()
        .map(|row| (row.currency.as_str(), row.actual_balance))
        .collect();

    let mut drafts = Vec::with_capacity(requests.len());
    for request in requests {
        if request.amount <= Decimal::ZERO {
            continue;
        }
        let available = counted
            .get(request.currency.as_str())
            .copied()
            .ok_or_else(|| EodError::MissingCount(request.currency.clone()))?;
        if request.amount > available {
            return Err(EodError::CashOutExceedsBalance {
                currency: request.currency.clone(),
            });
        }
        let movement =
            Movement::for_currency(request.currency == base_currency, -request.amount);
        let (amount, local_amount) = movement.columns();
        drafts.push(EntryDraft {
            entry_type: EntryType::CashOut,
            currency: request.currency.clone(),
            amount,
            rate: Decimal::ZERO,
            local_amount,
            balance_delta: -request.amount,
            base_delta: Decimal::ZERO,
            original_transaction_no: None,
            group_sequence: None,
        });
    }
    Ok(drafts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eod::stock::StockRow;
    use rust_decimal_macros::dec;

    fn stock() -> StockReport {
        StockReport {
            rows: vec![
                StockRow {
                    currency: "THB".to_string(),
                    opening: dec!(10000),
                    change: dec!(-3500),
                    current: dec!(6500),
                },
                StockRow {
                    currency: "USD".to_string(),
                    opening: dec!(0),
                    change: dec!(100),
                    current: dec!(100),
                },
            ],
        }
    }

    #[test]
    fn test_exact_count_writes_no_diff() {
        let counts = BTreeMap::from([
            ("THB".to_string(), dec!(6500)),
            ("USD".to_string(), dec!(100)),
        ]);
        let outcome = plan_verifications(&stock(), &counts, "THB").unwrap();
        assert!(outcome.diff_drafts.is_empty());
        assert_eq!(outcome.rows[0].difference, Decimal::ZERO);
    }

    #[test]
    fn test_shortfall_produces_signed_diff_entry() {
        let counts = BTreeMap::from([
            ("THB".to_string(), dec!(6400)),
            ("USD".to_string(), dec!(102)),
        ]);
        let outcome = plan_verifications(&stock(), &counts, "THB").unwrap();
        assert_eq!(outcome.diff_drafts.len(), 2);

        // Base shortfall lands in local_amount.
        let thb = &outcome.diff_drafts[0];
        assert_eq!(thb.entry_type, EntryType::EodDiff);
        assert_eq!(thb.amount, Decimal::ZERO);
        assert_eq!(thb.local_amount, dec!(-100));
        assert_eq!(thb.balance_delta, dec!(-100));

        // Foreign surplus lands in amount.
        let usd = &outcome.diff_drafts[1];
        assert_eq!(usd.amount, dec!(2));
        assert_eq!(usd.local_amount, Decimal::ZERO);

        // Balance converges onto the count: theoretical + diff == actual.
        for row in &outcome.rows {
            assert_eq!(row.theoretical_balance + row.difference, row.actual_balance);
        }
    }

    #[test]
    fn test_missing_count_is_refused() {
        let counts = BTreeMap::from([("THB".to_string(), dec!(6500))]);
        assert!(matches!(
            plan_verifications(&stock(), &counts, "THB"),
            Err(EodError::MissingCount(c)) if c == "USD"
        ));
    }

    #[test]
    fn test_cash_out_reduces_verified_balance() {
        let verified = vec![VerificationRow {
            currency: "THB".to_string(),
            theoretical_balance: dec!(6500),
            actual_balance: dec!(6500),
            difference: Decimal::ZERO,
        }];
        let requests = vec![CashOutRequest {
            currency: "THB".to_string(),
            amount: dec!(5000),
        }];
        let drafts = plan_cash_outs(&verified, &requests, "THB").unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].local_amount, dec!(-5000));
        assert_eq!(drafts[0].balance_delta, dec!(-5000));
    }

    #[test]
    fn test_cash_out_over_count_refused() {
        let verified = vec![VerificationRow {
            currency: "USD".to_string(),
            theoretical_balance: dec!(100),
            actual_balance: dec!(100),
            difference: Decimal::ZERO,
        }];
        let requests = vec![CashOutRequest {
            currency: "USD".to_string(),
            amount: dec!(150),
        }];
        assert!(matches!(
            plan_cash_outs(&verified, &requests, "THB"),
            Err(EodError::CashOutExceedsBalance { .. })
        ));
    }

    #[test]
    fn test_zero_cash_out_is_skipped() {
        let verified = vec![VerificationRow {
            currency: "USD".to_string(),
            theoretical_balance: dec!(100),
            actual_balance: dec!(100),
            difference: Decimal::ZERO,
        }];
        let requests = vec![CashOutRequest {
            currency: "USD".to_string(),
            amount: Decimal::ZERO,
        }];
        assert!(plan_cash_outs(&verified, &requests, "THB")
            .unwrap()
            .is_empty());
    }
}
