//! Transaction planning engine.
//!
//! Pure validate-then-plan functions. Each planner receives the balances the
//! repository has already locked, validates the operation, and returns entry
//! drafts plus the balance deltas to apply. Nothing here touches a database.

use std::collections::HashMap;

use rust_decimal::Decimal;

use super::error::LedgerError;
use super::types::{EntryDraft, EntryStatus, EntryType, LedgerEntry, TradeDirection};
use crate::currency::rounding::cross;
use crate::currency::Movement;
use chrono::{DateTime, Utc};

/// BOT-Provider reporting threshold in USD equivalent.
pub const BOT_THRESHOLD_USD: Decimal = Decimal::from_parts(20_000, 0, 0, false, 0);

/// Result of a quote check: the applicable local amount and the balances
/// the trade would leave behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteOutcome {
    /// Rate used for the quote.
    pub rate: Decimal,
    /// Base-currency amount the trade moves (absolute).
    pub local_amount: Decimal,
    /// Foreign balance after the trade would commit.
    pub foreign_after: Decimal,
    /// Base balance after the trade would commit.
    pub base_after: Decimal,
}

/// A fully validated exchange, ready to persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangePlan {
    /// The ledger row to append.
    pub draft: EntryDraft,
    /// Foreign balance before the trade (for receipt printing).
    pub balance_before: Decimal,
    /// Foreign balance after the trade.
    pub balance_after: Decimal,
}

/// One line of a teller's denomination plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DenominationLine {
    /// Currency code.
    pub currency: String,
    /// Direction from the branch's point of view.
    pub direction: TradeDirection,
    /// Positive foreign amount for this line.
    pub foreign_amount: Decimal,
    /// Rate for this (currency, direction) today.
    pub rate: Decimal,
}

/// A validated dual-direction operation: one draft per (currency, direction)
/// group, in teller order, plus the final balances the whole plan leaves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DualDirectionPlan {
    /// Entry drafts with `group_sequence` set from 1.
    pub drafts: Vec<EntryDraft>,
    /// Final balance per affected currency (base currency included).
    pub final_balances: HashMap<String, Decimal>,
}

/// A validated reversal, ready to persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReversalPlan {
    /// The reversal row to append.
    pub draft: EntryDraft,
    /// Transaction number of the entry being voided.
    pub target_transaction_no: String,
}

fn validate_trade(foreign_amount: Decimal, rate: Decimal) -> Result<(), LedgerError> {
    if foreign_amount <= Decimal::ZERO {
        return Err(LedgerError::NonPositiveAmount(foreign_amount));
    }
    if rate <= Decimal::ZERO {
        return Err(LedgerError::NonPositiveRate(rate));
    }
    Ok(())
}

/// Checks that a prospective trade is covered by the branch till.
///
/// For a branch buy the base currency pays out; for a branch sell the
/// foreign stock pays out. Error messages quote the current balance, the
/// required amount, and the shortfall.
pub fn quote_check(
    currency: &str,
    direction: TradeDirection,
    foreign_amount: Decimal,
    rate: Decimal,
    foreign_balance: Decimal,
    base_balance: Decimal,
) -> Result<QuoteOutcome, LedgerError> {
    validate_trade(foreign_amount, rate)?;
    let local_amount = cross(foreign_amount, rate);

    match direction {
        TradeDirection::BranchBuys => {
            if base_balance < local_amount {
                return Err(LedgerError::BaseCurrencyInsufficient {
                    balance: base_balance,
                    required: local_amount,
                    shortfall: local_amount - base_balance,
                });
            }
            Ok(QuoteOutcome {
                rate,
                local_amount,
                foreign_after: foreign_balance + foreign_amount,
                base_after: base_balance - local_amount,
            })
        }
        TradeDirection::BranchSells => {
            if foreign_balance < foreign_amount {
                return Err(LedgerError::ForeignStockInsufficient {
                    currency: currency.to_string(),
                    balance: foreign_balance,
                    required: foreign_amount,
                    shortfall: foreign_amount - foreign_balance,
                });
            }
            Ok(QuoteOutcome {
                rate,
                local_amount,
                foreign_after: foreign_balance - foreign_amount,
                base_after: base_balance + local_amount,
            })
        }
    }
}

/// Plans a single-currency exchange.
///
/// Signs encode the direction: a branch buy appends `amount = +foreign`,
/// `local_amount = -foreign * rate`; a branch sell the inverse.
pub fn plan_exchange(
    currency: &str,
    direction: TradeDirection,
    foreign_amount: Decimal,
    rate: Decimal,
    foreign_balance: Decimal,
    base_balance: Decimal,
) -> Result<ExchangePlan, LedgerError> {
    let quote = quote_check(
        currency,
        direction,
        foreign_amount,
        rate,
        foreign_balance,
        base_balance,
    )?;

    let (amount, local_amount) = match direction {
        TradeDirection::BranchBuys => (foreign_amount, -quote.local_amount),
        TradeDirection::BranchSells => (-foreign_amount, quote.local_amount),
    };

    let draft = EntryDraft {
        entry_type: direction.entry_type(),
        currency: currency.to_string(),
        amount,
        rate,
        local_amount,
        balance_delta: amount,
        base_delta: local_amount,
        original_transaction_no: None,
        group_sequence: None,
    };

    Ok(ExchangePlan {
        draft,
        balance_before: foreign_balance,
        balance_after: quote.foreign_after,
    })
}

/// Plans a dual-direction operation.
///
/// The denomination lines are folded into one logical group per
/// (currency, direction) pair, preserving the order the teller entered.
/// Lines that merge into one group keep their own rates; the group's local
/// amount is the sum of the per-line crosses. Sufficiency is verified
/// cumulatively across the whole plan for every affected currency before
/// any balance is mutated.
pub fn plan_dual_direction(
    lines: &[DenominationLine],
    base_currency: &str,
    balances: &HashMap<String, Decimal>,
) -> Result<DualDirectionPlan, LedgerError> {
    if lines.is_empty() {
        return Err(LedgerError::EmptyPlan);
    }

    // Fold lines into groups keyed by (currency, direction), teller order.
    // Each line is priced at its own rate; a merged group's local amount is
    // the sum of per-line crosses, never the summed amount times one rate.
    let mut order: Vec<(String, TradeDirection)> = Vec::new();
    let mut grouped: HashMap<(String, TradeDirection), (Decimal, Decimal, Decimal)> =
        HashMap::new();
    for line in lines {
        validate_trade(line.foreign_amount, line.rate)?;
        let line_local = cross(line.foreign_amount, line.rate);
        let key = (line.currency.clone(), line.direction);
        if let Some((sum, local_sum, _rate)) = grouped.get_mut(&key) {
            *sum += line.foreign_amount;
            *local_sum += line_local;
        } else {
            order.push(key.clone());
            grouped.insert(key, (line.foreign_amount, line_local, line.rate));
        }
    }

    // Check-all-then-commit: apply every group to a working copy of the
    // balances and require nothing goes negative.
    let mut working: HashMap<String, Decimal> = HashMap::new();
    let mut drafts = Vec::with_capacity(order.len());
    for (seq, key) in order.iter().enumerate() {
        let (currency, direction) = key;
        let (foreign_amount, local_amount, rate) = grouped[key];

        let foreign_balance = *working
            .entry(currency.clone())
            .or_insert_with(|| balances.get(currency).copied().unwrap_or(Decimal::ZERO));
        let base_balance = *working.entry(base_currency.to_string()).or_insert_with(|| {
            balances
                .get(base_currency)
                .copied()
                .unwrap_or(Decimal::ZERO)
        });

        let (amount, signed_local) = match direction {
            TradeDirection::BranchBuys => {
                if base_balance < local_amount {
                    return Err(LedgerError::BaseCurrencyInsufficient {
                        balance: base_balance,
                        required: local_amount,
                        shortfall: local_amount - base_balance,
                    });
                }
                (foreign_amount, -local_amount)
            }
            TradeDirection::BranchSells => {
                if foreign_balance < foreign_amount {
                    return Err(LedgerError::ForeignStockInsufficient {
                        currency: currency.clone(),
                        balance: foreign_balance,
                        required: foreign_amount,
                        shortfall: foreign_amount - foreign_balance,
                    });
                }
                (-foreign_amount, local_amount)
            }
        };

        working.insert(currency.clone(), foreign_balance + amount);
        working.insert(base_currency.to_string(), base_balance + signed_local);

        #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        let group_sequence = Some((seq + 1) as i32);
        drafts.push(EntryDraft {
            entry_type: direction.entry_type(),
            currency: currency.clone(),
            amount,
            rate,
            local_amount: signed_local,
            balance_delta: amount,
            base_delta: signed_local,
            original_transaction_no: None,
            group_sequence,
        });
    }

    Ok(DualDirectionPlan {
        drafts,
        final_balances: working,
    })
}

/// Plans a reversal of a committed buy/sell entry.
///
/// Refuses entries that are not trades, entries already reversed, and
/// entries whose commit time falls inside any completed EOD window
/// (reversals cannot cross a settled period).
pub fn plan_reversal(
    target: &LedgerEntry,
    has_active_reversal: bool,
    completed_windows: &[(DateTime<Utc>, DateTime<Utc>)],
) -> Result<ReversalPlan, LedgerError> {
    if !target.entry_type.is_reversible() {
        return Err(LedgerError::NotReversible {
            transaction_no: target.transaction_no.clone(),
            entry_type: format!("{:?}", target.entry_type).to_lowercase(),
        });
    }
    if target.status == EntryStatus::Reversed || has_active_reversal {
        return Err(LedgerError::AlreadyReversed(target.transaction_no.clone()));
    }
    for (start, end) in completed_windows {
        if target.created_at >= *start && target.created_at <= *end {
            return Err(LedgerError::CrossPeriodReversal(
                target.transaction_no.clone(),
            ));
        }
    }

    let draft = EntryDraft {
        entry_type: EntryType::Reversal,
        currency: target.currency.clone(),
        amount: -target.amount,
        rate: target.rate,
        local_amount: -target.local_amount,
        balance_delta: -target.amount,
        base_delta: -target.local_amount,
        original_transaction_no: Some(target.transaction_no.clone()),
        group_sequence: None,
    };

    Ok(ReversalPlan {
        draft,
        target_transaction_no: target.transaction_no.clone(),
    })
}

fn movement_draft(entry_type: EntryType, currency: &str, movement: Movement) -> EntryDraft {
    let (amount, local_amount) = movement.columns();
    EntryDraft {
        entry_type,
        currency: currency.to_string(),
        amount,
        rate: Decimal::ZERO,
        local_amount,
        balance_delta: movement.value(),
        // The base row IS the affected row for base-currency movements;
        // base_delta only carries cross-currency effects.
        base_delta: Decimal::ZERO,
        original_transaction_no: None,
        group_sequence: None,
    }
}

/// Plans the one-shot opening balance for a (branch, currency).
///
/// Base-currency openings store the value in `local_amount` with
/// `amount = 0`; foreign openings the inverse.
pub fn plan_initial_balance(
    currency: &str,
    is_base: bool,
    amount: Decimal,
    already_initialized: bool,
) -> Result<EntryDraft, LedgerError> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::NonPositiveAmount(amount));
    }
    if already_initialized {
        return Err(LedgerError::AlreadyInitialized(currency.to_string()));
    }
    Ok(movement_draft(
        EntryType::InitialBalance,
        currency,
        Movement::for_currency(is_base, amount),
    ))
}

/// Plans a manual balance adjustment.
///
/// Permitted only when the branch is not mid-EOD, unless the operator holds
/// the override capability. Storage asymmetry matches initial balances.
pub fn plan_adjustment(
    currency: &str,
    is_base: bool,
    signed_amount: Decimal,
    eod_locked: bool,
    has_override: bool,
) -> Result<EntryDraft, LedgerError> {
    if signed_amount == Decimal::ZERO {
        return Err(LedgerError::NonPositiveAmount(signed_amount));
    }
    if eod_locked && !has_override {
        return Err(LedgerError::BusinessLocked);
    }
    Ok(movement_draft(
        EntryType::AdjustBalance,
        currency,
        Movement::for_currency(is_base, signed_amount),
    ))
}

/// Plans a cash-out of physically removed cash.
pub fn plan_cash_out(
    currency: &str,
    is_base: bool,
    amount: Decimal,
    current_balance: Decimal,
) -> Result<EntryDraft, LedgerError> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::NonPositiveAmount(amount));
    }
    if current_balance < amount {
        if is_base {
            return Err(LedgerError::BaseCurrencyInsufficient {
                balance: current_balance,
                required: amount,
                shortfall: amount - current_balance,
            });
        }
        return Err(LedgerError::ForeignStockInsufficient {
            currency: currency.to_string(),
            balance: current_balance,
            required: amount,
            shortfall: amount - current_balance,
        });
    }
    Ok(movement_draft(
        EntryType::CashOut,
        currency,
        Movement::for_currency(is_base, -amount),
    ))
}

/// Checks whether a currency may be zeroed administratively.
///
/// Set-to-zero writes no ledger entry and therefore refuses any currency
/// that already carries an initial-balance entry.
pub fn zeroable(currency: &str, has_initial: bool) -> Result<(), LedgerError> {
    if has_initial {
        return Err(LedgerError::ZeroRefused(currency.to_string()));
    }
    Ok(())
}

/// Returns true when a trade's local amount crosses the BOT-Provider
/// reporting threshold (20,000 USD equivalent).
///
/// The USD equivalent divides by the same-day USD sell rate. Without a USD
/// rate the check cannot fire.
#[must_use]
pub fn bot_threshold_exceeded(local_amount: Decimal, usd_sell_rate: Option<Decimal>) -> bool {
    match usd_sell_rate {
        Some(rate) if rate > Decimal::ZERO => (local_amount.abs() / rate) > BOT_THRESHOLD_USD,
        _ => false,
    }
}

/// Whether a manual balance adjustment must be reported to the provider:
/// only increases to a foreign currency count, valued at the currency's
/// same-day sell rate. Without a published rate the check cannot fire.
#[must_use]
pub fn adjustment_crosses_bot_threshold(
    is_base: bool,
    signed_amount: Decimal,
    sell_rate: Option<Decimal>,
    usd_sell_rate: Option<Decimal>,
) -> bool {
    if is_base || signed_amount <= Decimal::ZERO {
        return false;
    }
    match sell_rate {
        Some(rate) => bot_threshold_exceeded(cross(signed_amount, rate), usd_sell_rate),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use satang_shared::types::{BranchId, LedgerEntryId, OperatorId};

    fn entry(entry_type: EntryType, amount: Decimal, local: Decimal) -> LedgerEntry {
        LedgerEntry {
            id: LedgerEntryId::new(),
            transaction_no: "BKK01-20260826-0001".to_string(),
            daily_sequence: 1,
            entry_type,
            branch_id: BranchId::new(),
            currency: "USD".to_string(),
            operator_id: OperatorId::new(),
            customer_name: None,
            customer_id: None,
            purpose: None,
            remarks: None,
            amount,
            rate: dec!(35),
            local_amount: local,
            balance_before: dec!(1000),
            balance_after: dec!(1000) + amount,
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

    // Scenario: happy-path buy. USD 1000 / THB 100000, buy 100 @ 35.
    #[test]
    fn test_plan_buy_signs_and_balances() {
        let plan = plan_exchange(
            "USD",
            TradeDirection::BranchBuys,
            dec!(100),
            dec!(35),
            dec!(1000),
            dec!(100000),
        )
        .unwrap();

        assert_eq!(plan.draft.amount, dec!(100));
        assert_eq!(plan.draft.local_amount, dec!(-3500.00));
        assert_eq!(plan.draft.balance_delta, dec!(100));
        assert_eq!(plan.draft.base_delta, dec!(-3500.00));
        assert_eq!(plan.balance_before, dec!(1000));
        assert_eq!(plan.balance_after, dec!(1100));
    }

    #[test]
    fn test_plan_sell_signs() {
        let plan = plan_exchange(
            "USD",
            TradeDirection::BranchSells,
            dec!(100),
            dec!(35),
            dec!(1000),
            dec!(100000),
        )
        .unwrap();

        assert_eq!(plan.draft.amount, dec!(-100));
        assert_eq!(plan.draft.local_amount, dec!(3500.00));
        assert_eq!(plan.balance_after, dec!(900));
    }

    // Scenario: refused sell on insufficient foreign stock.
    #[test]
    fn test_sell_refused_on_insufficient_stock() {
        let err = plan_exchange(
            "USD",
            TradeDirection::BranchSells,
            dec!(100),
            dec!(35),
            dec!(50),
            dec!(100000),
        )
        .unwrap_err();

        match err {
            LedgerError::ForeignStockInsufficient {
                balance,
                required,
                shortfall,
                ..
            } => {
                assert_eq!(balance, dec!(50));
                assert_eq!(required, dec!(100));
                assert_eq!(shortfall, dec!(50));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_buy_refused_on_insufficient_base() {
        let err = plan_exchange(
            "USD",
            TradeDirection::BranchBuys,
            dec!(100),
            dec!(35),
            dec!(1000),
            dec!(3000),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::BaseCurrencyInsufficient { .. }
        ));
    }

    #[test]
    fn test_quote_rejects_bad_inputs() {
        assert!(matches!(
            quote_check(
                "USD",
                TradeDirection::BranchBuys,
                dec!(0),
                dec!(35),
                dec!(0),
                dec!(0)
            ),
            Err(LedgerError::NonPositiveAmount(_))
        ));
        assert!(matches!(
            quote_check(
                "USD",
                TradeDirection::BranchBuys,
                dec!(10),
                dec!(-1),
                dec!(0),
                dec!(0)
            ),
            Err(LedgerError::NonPositiveRate(_))
        ));
    }

    // Scenario: reverse the happy-path buy.
    #[test]
    fn test_plan_reversal_inverts_signs() {
        let target = entry(EntryType::Buy, dec!(100), dec!(-3500));
        let plan = plan_reversal(&target, false, &[]).unwrap();

        assert_eq!(plan.draft.entry_type, EntryType::Reversal);
        assert_eq!(plan.draft.amount, dec!(-100));
        assert_eq!(plan.draft.local_amount, dec!(3500));
        assert_eq!(
            plan.draft.original_transaction_no.as_deref(),
            Some("BKK01-20260826-0001")
        );
    }

    #[test]
    fn test_reversal_rejects_second_attempt() {
        let mut target = entry(EntryType::Buy, dec!(100), dec!(-3500));
        target.status = EntryStatus::Reversed;
        assert!(matches!(
            plan_reversal(&target, false, &[]),
            Err(LedgerError::AlreadyReversed(_))
        ));

        let target = entry(EntryType::Buy, dec!(100), dec!(-3500));
        assert!(matches!(
            plan_reversal(&target, true, &[]),
            Err(LedgerError::AlreadyReversed(_))
        ));
    }

    #[test]
    fn test_reversal_rejects_non_trade() {
        let target = entry(EntryType::AdjustBalance, dec!(100), dec!(0));
        assert!(matches!(
            plan_reversal(&target, false, &[]),
            Err(LedgerError::NotReversible { .. })
        ));
    }

    // Scenario: cross-period reversal refusal.
    #[test]
    fn test_reversal_refused_inside_settled_window() {
        let target = entry(EntryType::Buy, dec!(100), dec!(-3500));
        let window = (
            Utc.with_ymd_and_hms(2026, 8, 26, 8, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2026, 8, 26, 18, 0, 0).unwrap(),
        );
        assert!(matches!(
            plan_reversal(&target, false, &[window]),
            Err(LedgerError::CrossPeriodReversal(_))
        ));

        // A window that ends before the entry does not block it.
        let earlier = (
            Utc.with_ymd_and_hms(2026, 8, 25, 8, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2026, 8, 25, 18, 0, 0).unwrap(),
        );
        assert!(plan_reversal(&target, false, &[earlier]).is_ok());
    }

    // Scenario: initial balance asymmetry.
    #[test]
    fn test_initial_balance_asymmetry() {
        let base = plan_initial_balance("THB", true, dec!(50000), false).unwrap();
        assert_eq!(base.amount, Decimal::ZERO);
        assert_eq!(base.local_amount, dec!(50000));
        assert_eq!(base.balance_delta, dec!(50000));
        assert_eq!(base.base_delta, Decimal::ZERO);

        let foreign = plan_initial_balance("USD", false, dec!(1000), false).unwrap();
        assert_eq!(foreign.amount, dec!(1000));
        assert_eq!(foreign.local_amount, Decimal::ZERO);
    }

    #[test]
    fn test_initial_balance_one_shot() {
        assert!(matches!(
            plan_initial_balance("USD", false, dec!(1000), true),
            Err(LedgerError::AlreadyInitialized(_))
        ));
    }

    #[test]
    fn test_adjustment_gated_by_eod_lock() {
        assert!(matches!(
            plan_adjustment("USD", false, dec!(10), true, false),
            Err(LedgerError::BusinessLocked)
        ));
        // Override capability passes the gate.
        assert!(plan_adjustment("USD", false, dec!(10), true, true).is_ok());
        assert!(plan_adjustment("USD", false, dec!(-10), false, false).is_ok());
    }

    #[test]
    fn test_cash_out_checks_balance() {
        let draft = plan_cash_out("THB", true, dec!(5000), dec!(6500)).unwrap();
        assert_eq!(draft.local_amount, dec!(-5000));
        assert_eq!(draft.balance_delta, dec!(-5000));

        assert!(matches!(
            plan_cash_out("THB", true, dec!(7000), dec!(6500)),
            Err(LedgerError::BaseCurrencyInsufficient { .. })
        ));
    }

    #[test]
    fn test_zeroable() {
        assert!(zeroable("USD", false).is_ok());
        assert!(matches!(
            zeroable("USD", true),
            Err(LedgerError::ZeroRefused(_))
        ));
    }

    // Scenario: dual-direction group.
    #[test]
    fn test_dual_direction_group() {
        let lines = vec![
            DenominationLine {
                currency: "USD".to_string(),
                direction: TradeDirection::BranchBuys,
                foreign_amount: dec!(200),
                rate: dec!(35),
            },
            DenominationLine {
                currency: "EUR".to_string(),
                direction: TradeDirection::BranchSells,
                foreign_amount: dec!(50),
                rate: dec!(39),
            },
        ];
        let balances = HashMap::from([
            ("USD".to_string(), dec!(0)),
            ("EUR".to_string(), dec!(100)),
            ("THB".to_string(), dec!(10000)),
        ]);

        let plan = plan_dual_direction(&lines, "THB", &balances).unwrap();
        assert_eq!(plan.drafts.len(), 2);
        assert_eq!(plan.drafts[0].group_sequence, Some(1));
        assert_eq!(plan.drafts[1].group_sequence, Some(2));
        assert_eq!(plan.drafts[0].amount, dec!(200));
        assert_eq!(plan.drafts[1].amount, dec!(-50));

        // THB: 10000 - 7000 + 1950 = 4950
        assert_eq!(plan.final_balances["THB"], dec!(4950.00));
        assert_eq!(plan.final_balances["USD"], dec!(200));
        assert_eq!(plan.final_balances["EUR"], dec!(50));
    }

    #[test]
    fn test_dual_direction_merges_same_pair_lines() {
        let lines = vec![
            DenominationLine {
                currency: "USD".to_string(),
                direction: TradeDirection::BranchBuys,
                foreign_amount: dec!(100),
                rate: dec!(35),
            },
            DenominationLine {
                currency: "USD".to_string(),
                direction: TradeDirection::BranchBuys,
                foreign_amount: dec!(50),
                rate: dec!(35),
            },
        ];
        let balances = HashMap::from([("THB".to_string(), dec!(10000))]);
        let plan = plan_dual_direction(&lines, "THB", &balances).unwrap();
        assert_eq!(plan.drafts.len(), 1);
        assert_eq!(plan.drafts[0].amount, dec!(150));
    }

    // Scenario: merged lines with different rates, e.g. large and small
    // denominations of the same note priced differently.
    #[test]
    fn test_dual_direction_prices_each_line_at_its_rate() {
        let lines = vec![
            DenominationLine {
                currency: "USD".to_string(),
                direction: TradeDirection::BranchBuys,
                foreign_amount: dec!(100),
                rate: dec!(35),
            },
            DenominationLine {
                currency: "USD".to_string(),
                direction: TradeDirection::BranchBuys,
                foreign_amount: dec!(100),
                rate: dec!(36),
            },
        ];
        let balances = HashMap::from([("THB".to_string(), dec!(10000))]);
        let plan = plan_dual_direction(&lines, "THB", &balances).unwrap();
        assert_eq!(plan.drafts.len(), 1);
        assert_eq!(plan.drafts[0].amount, dec!(200));
        // 100 * 35 + 100 * 36, not 200 * 35.
        assert_eq!(plan.drafts[0].local_amount, dec!(-7100.00));
        assert_eq!(plan.final_balances["THB"], dec!(2900.00));
    }

    #[test]
    fn test_dual_direction_checks_whole_plan_before_commit() {
        // Selling EUR 50 needs EUR stock the branch does not have; the USD
        // buy must not be committed either.
        let lines = vec![
            DenominationLine {
                currency: "USD".to_string(),
                direction: TradeDirection::BranchBuys,
                foreign_amount: dec!(10),
                rate: dec!(35),
            },
            DenominationLine {
                currency: "EUR".to_string(),
                direction: TradeDirection::BranchSells,
                foreign_amount: dec!(50),
                rate: dec!(39),
            },
        ];
        let balances = HashMap::from([
            ("EUR".to_string(), dec!(10)),
            ("THB".to_string(), dec!(10000)),
        ]);
        assert!(matches!(
            plan_dual_direction(&lines, "THB", &balances),
            Err(LedgerError::ForeignStockInsufficient { .. })
        ));
    }

    #[test]
    fn test_dual_direction_empty_plan() {
        let balances = HashMap::new();
        assert!(matches!(
            plan_dual_direction(&[], "THB", &balances),
            Err(LedgerError::EmptyPlan)
        ));
    }

    #[test]
    fn test_bot_threshold() {
        // 700,000 THB at USD sell rate 35 = 20,000 USD exactly: not exceeded.
        assert!(!bot_threshold_exceeded(dec!(700000), Some(dec!(35))));
        assert!(bot_threshold_exceeded(dec!(700035), Some(dec!(35))));
        // Sign does not matter.
        assert!(bot_threshold_exceeded(dec!(-700035), Some(dec!(35))));
        // No USD rate: the check cannot fire.
        assert!(!bot_threshold_exceeded(dec!(10000000), None));
        assert!(!bot_threshold_exceeded(dec!(10000000), Some(dec!(0))));
    }

    #[test]
    fn test_adjustment_threshold_only_on_foreign_increases() {
        let sell = Some(dec!(35));
        let usd = Some(dec!(35));
        // 25,000 USD-equivalent increase: reportable.
        assert!(adjustment_crosses_bot_threshold(false, dec!(25000), sell, usd));
        // Decreases and base-currency adjustments are not.
        assert!(!adjustment_crosses_bot_threshold(false, dec!(-25000), sell, usd));
        assert!(!adjustment_crosses_bot_threshold(true, dec!(25000), sell, usd));
        // Without a published rate the check cannot fire.
        assert!(!adjustment_crosses_bot_threshold(false, dec!(25000), None, usd));
    }
}
