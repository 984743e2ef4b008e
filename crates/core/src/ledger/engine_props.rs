//! Property tests for the transaction planning engine.

use std::collections::HashMap;

use proptest::prelude::*;
use rust_decimal::Decimal;

use super::engine::{plan_dual_direction, plan_exchange, plan_reversal, DenominationLine};
use super::types::{EntryStatus, EntryType, LedgerEntry, TradeDirection};
use crate::currency::rounding::cross;
use chrono::{TimeZone, Utc};
use satang_shared::types::{BranchId, LedgerEntryId, OperatorId};

fn dec2(units: i64) -> Decimal {
    Decimal::new(units, 2)
}

fn arb_amount() -> impl Strategy<Value = Decimal> {
    // 0.01 .. 1_000_000.00 foreign units
    (1i64..=100_000_000).prop_map(dec2)
}

fn arb_rate() -> impl Strategy<Value = Decimal> {
    // 0.0001 .. 500.0000
    (1i64..=5_000_000).prop_map(|n| Decimal::new(n, 4))
}

fn arb_direction() -> impl Strategy<Value = TradeDirection> {
    prop_oneof![
        Just(TradeDirection::BranchBuys),
        Just(TradeDirection::BranchSells),
    ]
}

fn committed(draft: &super::types::EntryDraft) -> LedgerEntry {
    LedgerEntry {
        id: LedgerEntryId::new(),
        transaction_no: "BKK01-20260826-0001".to_string(),
        daily_sequence: 1,
        entry_type: draft.entry_type,
        branch_id: BranchId::new(),
        currency: draft.currency.clone(),
        operator_id: OperatorId::new(),
        customer_name: None,
        customer_id: None,
        purpose: None,
        remarks: None,
        amount: draft.amount,
        rate: draft.rate,
        local_amount: draft.local_amount,
        balance_before: Decimal::ZERO,
        balance_after: draft.amount,
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

proptest! {
    // amount and local_amount always carry opposite signs on a trade, and
    // |local_amount| is the rounded cross of |amount| and the rate.
    #[test]
    fn exchange_signs_oppose_and_cross(
        amount in arb_amount(),
        rate in arb_rate(),
        direction in arb_direction(),
    ) {
        // Fund the till generously so the plan always passes the check.
        let foreign = amount + Decimal::ONE;
        let base = cross(amount, rate) + Decimal::ONE;
        let plan = plan_exchange("USD", direction, amount, rate, foreign, base).unwrap();

        prop_assert!(plan.draft.amount * plan.draft.local_amount <= Decimal::ZERO);
        prop_assert_eq!(plan.draft.amount.abs(), amount);
        prop_assert_eq!(plan.draft.local_amount.abs(), cross(amount, rate));
    }

    // Replaying balance deltas from the draft reproduces the planner's
    // before/after pair.
    #[test]
    fn exchange_balance_reconstruction(
        amount in arb_amount(),
        rate in arb_rate(),
        direction in arb_direction(),
    ) {
        let foreign = amount + Decimal::ONE;
        let base = cross(amount, rate) + Decimal::ONE;
        let plan = plan_exchange("USD", direction, amount, rate, foreign, base).unwrap();

        prop_assert_eq!(plan.balance_before + plan.draft.balance_delta, plan.balance_after);
    }

    // A trade followed by its reversal nets to zero in both currencies.
    #[test]
    fn reversal_cancels_trade(
        amount in arb_amount(),
        rate in arb_rate(),
        direction in arb_direction(),
    ) {
        let foreign = amount + Decimal::ONE;
        let base = cross(amount, rate) + Decimal::ONE;
        let plan = plan_exchange("USD", direction, amount, rate, foreign, base).unwrap();
        let target = committed(&plan.draft);
        let reversal = plan_reversal(&target, false, &[]).unwrap();

        prop_assert_eq!(plan.draft.amount + reversal.draft.amount, Decimal::ZERO);
        prop_assert_eq!(plan.draft.local_amount + reversal.draft.local_amount, Decimal::ZERO);
        prop_assert_eq!(plan.draft.balance_delta + reversal.draft.balance_delta, Decimal::ZERO);
        prop_assert_eq!(plan.draft.base_delta + reversal.draft.base_delta, Decimal::ZERO);
    }

    // A reversed entry can never be reversed again.
    #[test]
    fn reversal_is_single_shot(
        amount in arb_amount(),
        rate in arb_rate(),
        direction in arb_direction(),
    ) {
        let foreign = amount + Decimal::ONE;
        let base = cross(amount, rate) + Decimal::ONE;
        let plan = plan_exchange("USD", direction, amount, rate, foreign, base).unwrap();
        let mut target = committed(&plan.draft);
        target.status = EntryStatus::Reversed;

        prop_assert!(plan_reversal(&target, false, &[]).is_err());
    }

    // The dual-direction planner's final balances equal the sum of the
    // per-draft deltas applied to the starting balances, and no affected
    // balance is negative.
    #[test]
    fn dual_direction_deltas_reconcile(
        amounts in prop::collection::vec(arb_amount(), 1..6),
        rate in arb_rate(),
        directions in prop::collection::vec(arb_direction(), 1..6),
    ) {
        let currencies = ["USD", "EUR", "JPY"];
        let lines: Vec<DenominationLine> = amounts
            .iter()
            .zip(directions.iter().cycle())
            .enumerate()
            .map(|(i, (amount, direction))| DenominationLine {
                currency: currencies[i % currencies.len()].to_string(),
                direction: *direction,
                foreign_amount: *amount,
                rate,
            })
            .collect();

        // Fund everything so the plan always validates.
        let total_foreign: Decimal = amounts.iter().copied().sum();
        let total_base: Decimal = lines
            .iter()
            .map(|l| cross(l.foreign_amount, l.rate))
            .sum();
        let mut balances: HashMap<String, Decimal> = currencies
            .iter()
            .map(|c| ((*c).to_string(), total_foreign))
            .collect();
        balances.insert("THB".to_string(), total_base + Decimal::ONE);

        let plan = plan_dual_direction(&lines, "THB", &balances).unwrap();

        let mut replay = balances.clone();
        for draft in &plan.drafts {
            *replay.entry(draft.currency.clone()).or_insert(Decimal::ZERO) +=
                draft.balance_delta;
            *replay.entry("THB".to_string()).or_insert(Decimal::ZERO) += draft.base_delta;
        }
        for (currency, expected) in &plan.final_balances {
            prop_assert_eq!(replay[currency], *expected);
            prop_assert!(*expected >= Decimal::ZERO);
        }

        // Group sequences are contiguous from 1 in teller order.
        for (i, draft) in plan.drafts.iter().enumerate() {
            prop_assert_eq!(draft.group_sequence, Some(i32::try_from(i + 1).unwrap()));
        }
    }
}
