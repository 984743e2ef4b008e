//! Property tests for the settlement pipeline.

use std::collections::BTreeMap;

use proptest::prelude::*;
use rust_decimal::Decimal;

use super::phase::{Advance, EodPhase};
use super::stock::{StockReport, StockRow};
use super::verify::{plan_cash_outs, plan_verifications, CashOutRequest};

fn dec2(units: i64) -> Decimal {
    Decimal::new(units, 2)
}

fn arb_balance() -> impl Strategy<Value = Decimal> {
    (0i64..=10_000_000).prop_map(dec2)
}

proptest! {
    // After step 4, theoretical + difference == actual for every currency,
    // and a diff draft exists exactly when the difference is non-zero.
    #[test]
    fn verification_converges_on_counts(
        pairs in prop::collection::vec((arb_balance(), arb_balance()), 1..8),
    ) {
        let rows: Vec<StockRow> = pairs
            .iter()
            .enumerate()
            .map(|(i, (theoretical, _))| StockRow {
                currency: format!("C{i:02}"),
                opening: Decimal::ZERO,
                change: *theoretical,
                current: *theoretical,
            })
            .collect();
        let counts: BTreeMap<String, Decimal> = pairs
            .iter()
            .enumerate()
            .map(|(i, (_, actual))| (format!("C{i:02}"), *actual))
            .collect();
        let stock = StockReport { rows };

        let outcome = plan_verifications(&stock, &counts, "C00").unwrap();

        let expected_diffs = outcome
            .rows
            .iter()
            .filter(|r| r.difference != Decimal::ZERO)
            .count();
        prop_assert_eq!(outcome.diff_drafts.len(), expected_diffs);
        for row in &outcome.rows {
            prop_assert_eq!(row.theoretical_balance + row.difference, row.actual_balance);
        }
        for draft in &outcome.diff_drafts {
            prop_assert_eq!(
                draft.balance_delta,
                outcome
                    .rows
                    .iter()
                    .find(|r| r.currency == draft.currency)
                    .unwrap()
                    .difference
            );
        }
    }

    // Opening chain: the next period opens on actual − cash_out.
    #[test]
    fn opening_chain_holds(
        actual in arb_balance(),
        removed_fraction in 0u32..=100,
    ) {
        let removed = actual * Decimal::from(removed_fraction) / Decimal::ONE_HUNDRED;
        let verified = vec![super::verify::VerificationRow {
            currency: "USD".to_string(),
            theoretical_balance: actual,
            actual_balance: actual,
            difference: Decimal::ZERO,
        }];
        let requests = vec![CashOutRequest {
            currency: "USD".to_string(),
            amount: removed,
        }];

        let drafts = plan_cash_outs(&verified, &requests, "THB").unwrap();
        let cashed_out: Decimal = drafts.iter().map(|d| -d.balance_delta).sum();
        prop_assert_eq!(actual - cashed_out, actual - removed.max(Decimal::ZERO));
    }

    // Phase advancement never skips: any reachable Applied transition moves
    // exactly one step forward.
    #[test]
    fn phase_advances_one_step_at_a_time(from in 1i16..=7, to in 1i16..=7) {
        let current = EodPhase::from_step(from).unwrap();
        let requested = EodPhase::from_step(to).unwrap();
        match current.advance(requested) {
            Ok(Advance::Applied(next)) => prop_assert_eq!(next.step(), current.step() + 1),
            Ok(Advance::NoOp) => prop_assert!(requested <= current),
            Err(_) => prop_assert!(
                to > from + 1 || (current == EodPhase::Completed && to < 7)
            ),
        }
    }
}

#[cfg(test)]
mod scenario {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal_macros::dec;

    use crate::eod::verify::VerificationRow;
    use crate::period::{derive_window, PeriodInputs};

    // Day 1: initial THB=10000, USD=0; buy USD 100 @ 35; count THB=6500,
    // USD=100; cash out THB 5000. Day 2 opens on THB=1500, USD=100, one
    // second after completion.
    #[test]
    fn test_eod_opening_chain() {
        let stock = StockReport {
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
        };
        let counts = BTreeMap::from([
            ("THB".to_string(), dec!(6500)),
            ("USD".to_string(), dec!(100)),
        ]);

        let outcome = plan_verifications(&stock, &counts, "THB").unwrap();
        assert!(outcome.diff_drafts.is_empty());

        let requests = vec![CashOutRequest {
            currency: "THB".to_string(),
            amount: dec!(5000),
        }];
        let drafts = plan_cash_outs(&outcome.rows, &requests, "THB").unwrap();

        let next_opening = |currency: &str, verified: &[VerificationRow]| -> Decimal {
            let actual = verified
                .iter()
                .find(|r| r.currency == currency)
                .map(|r| r.actual_balance)
                .unwrap_or_default();
            let removed: Decimal = drafts
                .iter()
                .filter(|d| d.currency == currency)
                .map(|d| -d.balance_delta)
                .sum();
            actual - removed
        };

        assert_eq!(next_opening("THB", &outcome.rows), dec!(1500));
        assert_eq!(next_opening("USD", &outcome.rows), dec!(100));

        // Day 2's period starts one second after completion.
        let completed_at = Utc.with_ymd_and_hms(2026, 8, 26, 18, 0, 0).unwrap();
        let window = derive_window(PeriodInputs {
            last_completed_at: Some(completed_at),
            earliest_entry_at: None,
            active_eod_end: None,
            now: completed_at + Duration::hours(14),
        });
        assert_eq!(window.start, completed_at + Duration::seconds(1));
    }
}
