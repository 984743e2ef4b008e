//! Exchange service: orchestrates planners, row locks, and the ledger.
//!
//! Every mutating operation follows the same shape: derive the branch
//! state and pass the mutation gate, resolve today's published rates,
//! begin a database transaction, lock the balance rows in (foreign, base)
//! order, run the pure planner, append the resulting drafts, apply the
//! balance deltas, and commit.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set, TransactionTrait};
use uuid::Uuid;

use satang_core::ledger::{
    adjustment_crosses_bot_threshold, bot_threshold_exceeded, plan_adjustment, plan_cash_out,
    plan_dual_direction, plan_exchange, plan_initial_balance, plan_reversal, zeroable,
    DenominationLine, LedgerEntry, LedgerError, TradeDirection,
};
use satang_core::currency::rounding::cross;
use satang_core::period::assert_mutable;
use satang_shared::{AppError, AppResult};

use crate::entities::{bot_provider_reports, ledger_entries};

use super::balance::BalanceRepository;
use super::branch::BranchRepository;
use super::db_err;
use super::eod::EodRepository;
use super::ledger::{entry_from_model, AppendContext, LedgerRepository};
use super::rate::RateRepository;

/// Input for a single-currency exchange.
#[derive(Debug, Clone)]
pub struct ExchangeInput {
    /// Owning branch.
    pub branch_id: Uuid,
    /// Committing operator.
    pub operator_id: Uuid,
    /// Whether the operator may mutate balances mid-EOD.
    pub has_override: bool,
    /// Foreign currency code.
    pub currency: String,
    /// Direction from the branch's point of view.
    pub direction: TradeDirection,
    /// Positive foreign amount.
    pub foreign_amount: Decimal,
    /// Customer display name, when captured.
    pub customer_name: Option<String>,
    /// Customer document id, when captured.
    pub customer_id: Option<String>,
    /// Stated purpose.
    pub purpose: Option<String>,
    /// Free-form remarks.
    pub remarks: Option<String>,
}

/// One line of a dual-direction request; the service resolves the rate.
#[derive(Debug, Clone)]
pub struct DualLineInput {
    /// Currency code.
    pub currency: String,
    /// Direction from the branch's point of view.
    pub direction: TradeDirection,
    /// Positive foreign amount.
    pub foreign_amount: Decimal,
}

/// A committed exchange plus its reporting-threshold flag.
#[derive(Debug, Clone)]
pub struct ExchangeOutcome {
    /// The committed ledger row.
    pub entry: LedgerEntry,
    /// True when the trade crossed the BOT-Provider threshold.
    pub bot_flagged: bool,
}

/// One currency's opening balance.
#[derive(Debug, Clone)]
pub struct InitialBalanceItem {
    /// Currency code.
    pub currency: String,
    /// Positive opening amount.
    pub amount: Decimal,
}

/// Exchange service.
#[derive(Debug, Clone)]
pub struct ExchangeService {
    db: DatabaseConnection,
}

impl ExchangeService {
    /// Creates a new exchange service.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn branches(&self) -> BranchRepository {
        BranchRepository::new(self.db.clone())
    }

    fn rates(&self) -> RateRepository {
        RateRepository::new(self.db.clone())
    }

    fn ledger(&self) -> LedgerRepository {
        LedgerRepository::new(self.db.clone())
    }

    /// Appends a BOT Provider report record for a committed ledger entry.
    /// The trade is already durable; a failed write is logged, never raised.
    async fn record_bot_report(&self, entry: &ledger_entries::Model, local_amount: Decimal) {
        let active = bot_provider_reports::ActiveModel {
            id: Set(Uuid::now_v7()),
            branch_id: Set(entry.branch_id),
            ledger_entry_id: Set(entry.id),
            transaction_no: Set(entry.transaction_no.clone()),
            currency: Set(entry.currency.clone()),
            amount: Set(entry.amount),
            local_amount: Set(local_amount),
            created_at: Set(Utc::now().into()),
        };
        if let Err(err) = active.insert(&self.db).await {
            tracing::warn!(
                error = %err,
                transaction_no = %entry.transaction_no,
                "BOT provider report write failed"
            );
        }
    }

    /// Executes a single-currency exchange.
    pub async fn execute_exchange(&self, input: ExchangeInput) -> AppResult<ExchangeOutcome> {
        let status = self.branches().status(input.branch_id).await?;
        assert_mutable(status.state, input.has_override)?;
        let base_currency = status.branch.base_currency.clone();
        if input.currency == base_currency {
            return Err(AppError::ValidationFailed(format!(
                "cannot exchange the base currency {base_currency}"
            )));
        }

        let today = Utc::now().date_naive();
        let rate_row = self
            .rates()
            .published_rate(input.branch_id, &input.currency, today)
            .await?
            .ok_or(LedgerError::NoRateForToday {
                currency: input.currency.clone(),
            })
            .map_err(AppError::from)?;
        let rate = match input.direction {
            TradeDirection::BranchBuys => rate_row.buy_rate,
            TradeDirection::BranchSells => rate_row.sell_rate,
        };

        let txn = self.db.begin().await.map_err(db_err)?;
        let balances = BalanceRepository::lock_in_order(
            &txn,
            input.branch_id,
            std::slice::from_ref(&input.currency),
            &base_currency,
        )
        .await?;
        let foreign_balance = balances.get(&input.currency).copied().unwrap_or(Decimal::ZERO);
        let base_balance = balances.get(&base_currency).copied().unwrap_or(Decimal::ZERO);

        let plan = plan_exchange(
            &input.currency,
            input.direction,
            input.foreign_amount,
            rate,
            foreign_balance,
            base_balance,
        )?;

        let ctx = AppendContext {
            branch_id: input.branch_id,
            branch_code: status.branch.code.clone(),
            operator_id: input.operator_id,
            transaction_date: today,
            customer_name: input.customer_name.clone(),
            customer_id: input.customer_id.clone(),
            purpose: input.purpose.clone(),
            remarks: input.remarks.clone(),
            business_group_id: None,
        };
        let model = LedgerRepository::append(
            &txn,
            &ctx,
            &plan.draft,
            plan.balance_before,
            plan.balance_after,
            None,
        )
        .await?;

        let foreign_after = BalanceRepository::apply_delta(
            &txn,
            input.branch_id,
            &input.currency,
            plan.draft.balance_delta,
        )
        .await?;
        BalanceRepository::guard_non_negative(&input.currency, foreign_after)?;
        let base_after = BalanceRepository::apply_delta(
            &txn,
            input.branch_id,
            &base_currency,
            plan.draft.base_delta,
        )
        .await?;
        BalanceRepository::guard_non_negative(&base_currency, base_after)?;

        txn.commit().await.map_err(db_err)?;

        let usd_sell = self.rates().usd_sell_rate(input.branch_id, today).await?;
        let bot_flagged = bot_threshold_exceeded(model.local_amount, usd_sell);
        if bot_flagged {
            self.record_bot_report(&model, model.local_amount).await;
        }

        Ok(ExchangeOutcome {
            entry: entry_from_model(model)?,
            bot_flagged,
        })
    }

    /// Executes a dual-direction operation: several currencies and mixed
    /// directions committed atomically under one business group id.
    pub async fn execute_dual_direction(
        &self,
        branch_id: Uuid,
        operator_id: Uuid,
        has_override: bool,
        lines: &[DualLineInput],
        customer_name: Option<String>,
        customer_id: Option<String>,
    ) -> AppResult<(Vec<LedgerEntry>, Uuid)> {
        let status = self.branches().status(branch_id).await?;
        assert_mutable(status.state, has_override)?;
        let base_currency = status.branch.base_currency.clone();

        let today = Utc::now().date_naive();
        let mut denomination = Vec::with_capacity(lines.len());
        for line in lines {
            let rate_row = self
                .rates()
                .published_rate(branch_id, &line.currency, today)
                .await?
                .ok_or(LedgerError::NoRateForToday {
                    currency: line.currency.clone(),
                })
                .map_err(AppError::from)?;
            let rate = match line.direction {
                TradeDirection::BranchBuys => rate_row.buy_rate,
                TradeDirection::BranchSells => rate_row.sell_rate,
            };
            denomination.push(DenominationLine {
                currency: line.currency.clone(),
                direction: line.direction,
                foreign_amount: line.foreign_amount,
                rate,
            });
        }

        let currencies: Vec<String> = denomination.iter().map(|l| l.currency.clone()).collect();

        let txn = self.db.begin().await.map_err(db_err)?;
        let balances =
            BalanceRepository::lock_in_order(&txn, branch_id, &currencies, &base_currency).await?;

        let plan = plan_dual_direction(&denomination, &base_currency, &balances)?;

        let group_id = Uuid::now_v7();
        let ctx = AppendContext {
            branch_id,
            branch_code: status.branch.code.clone(),
            operator_id,
            transaction_date: today,
            customer_name,
            customer_id,
            purpose: None,
            remarks: None,
            business_group_id: Some(group_id),
        };

        let mut running = balances.clone();
        let mut committed = Vec::with_capacity(plan.drafts.len());
        for draft in &plan.drafts {
            let before = running.get(&draft.currency).copied().unwrap_or(Decimal::ZERO);
            let after = before + draft.balance_delta;
            running.insert(draft.currency.clone(), after);
            let base_before = running.get(&base_currency).copied().unwrap_or(Decimal::ZERO);
            running.insert(base_currency.clone(), base_before + draft.base_delta);

            let model =
                LedgerRepository::append(&txn, &ctx, draft, before, after, draft.group_sequence)
                    .await?;
            committed.push(entry_from_model(model)?);
        }

        for (currency, final_balance) in &plan.final_balances {
            BalanceRepository::guard_non_negative(currency, *final_balance)?;
            BalanceRepository::set_absolute(&txn, branch_id, currency, *final_balance).await?;
        }

        txn.commit().await.map_err(db_err)?;
        Ok((committed, group_id))
    }

    /// Reverses a committed buy/sell entry.
    pub async fn reverse(
        &self,
        branch_id: Uuid,
        operator_id: Uuid,
        has_override: bool,
        transaction_no: &str,
    ) -> AppResult<LedgerEntry> {
        let status = self.branches().status(branch_id).await?;
        assert_mutable(status.state, has_override)?;
        let base_currency = status.branch.base_currency.clone();

        let target = self
            .ledger()
            .find_by_transaction_no(branch_id, transaction_no)
            .await?;
        let has_active_reversal = self
            .ledger()
            .has_active_reversal(branch_id, transaction_no)
            .await?;
        let windows = EodRepository::new(self.db.clone())
            .completed_windows(branch_id)
            .await?;

        let plan = plan_reversal(&target, has_active_reversal, &windows)?;

        let txn = self.db.begin().await.map_err(db_err)?;
        let balances = BalanceRepository::lock_in_order(
            &txn,
            branch_id,
            std::slice::from_ref(&plan.draft.currency),
            &base_currency,
        )
        .await?;
        let before = balances
            .get(&plan.draft.currency)
            .copied()
            .unwrap_or(Decimal::ZERO);
        let after = before + plan.draft.balance_delta;

        let ctx = AppendContext {
            branch_id,
            branch_code: status.branch.code.clone(),
            operator_id,
            transaction_date: Utc::now().date_naive(),
            customer_name: target.customer_name.clone(),
            customer_id: target.customer_id.clone(),
            purpose: None,
            remarks: None,
            business_group_id: None,
        };
        let model = LedgerRepository::append(&txn, &ctx, &plan.draft, before, after, None).await?;

        LedgerRepository::mark_reversed(&txn, branch_id, &plan.target_transaction_no).await?;

        let foreign_after =
            BalanceRepository::apply_delta(&txn, branch_id, &plan.draft.currency, plan.draft.balance_delta)
                .await?;
        BalanceRepository::guard_non_negative(&plan.draft.currency, foreign_after)?;
        let base_after =
            BalanceRepository::apply_delta(&txn, branch_id, &base_currency, plan.draft.base_delta)
                .await?;
        BalanceRepository::guard_non_negative(&base_currency, base_after)?;

        txn.commit().await.map_err(db_err)?;
        entry_from_model(model)
    }

    /// Sets opening balances for a branch.
    ///
    /// With `skip_existing`, currencies that already carry an opening are
    /// skipped instead of failing the whole batch; the bulk setup screen
    /// re-submits its full list on retry.
    pub async fn set_initial_balance(
        &self,
        branch_id: Uuid,
        operator_id: Uuid,
        items: &[InitialBalanceItem],
        skip_existing: bool,
    ) -> AppResult<Vec<LedgerEntry>> {
        let branch = self.branches().get(branch_id).await?;
        let base_currency = branch.base_currency.clone();

        let mut committed = Vec::new();
        for item in items {
            let already = self
                .ledger()
                .has_initial_balance(branch_id, &item.currency)
                .await?;
            let is_base = item.currency == base_currency;

            let draft = match plan_initial_balance(&item.currency, is_base, item.amount, already) {
                Ok(draft) => draft,
                Err(LedgerError::AlreadyInitialized(_)) if skip_existing => continue,
                Err(err) => return Err(err.into()),
            };

            let txn = self.db.begin().await.map_err(db_err)?;
            let balances = BalanceRepository::lock_in_order(
                &txn,
                branch_id,
                std::slice::from_ref(&item.currency),
                &base_currency,
            )
            .await?;
            let before = balances.get(&item.currency).copied().unwrap_or(Decimal::ZERO);
            let after = before + draft.balance_delta;

            let ctx = AppendContext {
                branch_id,
                branch_code: branch.code.clone(),
                operator_id,
                transaction_date: Utc::now().date_naive(),
                customer_name: None,
                customer_id: None,
                purpose: None,
                remarks: None,
                business_group_id: None,
            };
            let model = LedgerRepository::append(&txn, &ctx, &draft, before, after, None).await?;
            BalanceRepository::apply_delta(&txn, branch_id, &item.currency, draft.balance_delta)
                .await?;
            txn.commit().await.map_err(db_err)?;
            committed.push(entry_from_model(model)?);
        }

        if !committed.is_empty() {
            self.branches()
                .complete_initial_setup(branch_id, operator_id)
                .await?;
        }
        Ok(committed)
    }

    /// Applies a manual signed adjustment to one currency.
    pub async fn adjust_balance(
        &self,
        branch_id: Uuid,
        operator_id: Uuid,
        has_override: bool,
        currency: &str,
        signed_amount: Decimal,
        remarks: Option<String>,
    ) -> AppResult<LedgerEntry> {
        let status = self.branches().status(branch_id).await?;
        let base_currency = status.branch.base_currency.clone();
        let eod_locked = status.state == satang_core::period::BranchState::EodProcessing;

        let draft = plan_adjustment(
            currency,
            currency == base_currency,
            signed_amount,
            eod_locked,
            has_override,
        )?;

        let txn = self.db.begin().await.map_err(db_err)?;
        let balances = BalanceRepository::lock_in_order(
            &txn,
            branch_id,
            &[currency.to_string()],
            &base_currency,
        )
        .await?;
        let before = balances.get(currency).copied().unwrap_or(Decimal::ZERO);
        let after = before + draft.balance_delta;
        BalanceRepository::guard_non_negative(currency, after)?;

        let ctx = AppendContext {
            branch_id,
            branch_code: status.branch.code.clone(),
            operator_id,
            transaction_date: Utc::now().date_naive(),
            customer_name: None,
            customer_id: None,
            purpose: None,
            remarks,
            business_group_id: None,
        };
        let model = LedgerRepository::append(&txn, &ctx, &draft, before, after, None).await?;
        BalanceRepository::apply_delta(&txn, branch_id, currency, draft.balance_delta).await?;
        txn.commit().await.map_err(db_err)?;

        // Large foreign-currency increases are reportable like trades;
        // failures here never unwind the committed adjustment.
        let today = Utc::now().date_naive();
        match self
            .adjustment_bot_value(branch_id, currency, &base_currency, signed_amount, today)
            .await
        {
            Ok(Some(local)) => self.record_bot_report(&model, local).await,
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(error = %err, currency, "BOT threshold check failed for adjustment");
            }
        }

        entry_from_model(model)
    }

    /// The local value of a reportable adjustment, or `None` when the
    /// adjustment does not cross the provider threshold.
    async fn adjustment_bot_value(
        &self,
        branch_id: Uuid,
        currency: &str,
        base_currency: &str,
        signed_amount: Decimal,
        today: chrono::NaiveDate,
    ) -> AppResult<Option<Decimal>> {
        let sell_rate = self
            .rates()
            .published_rate(branch_id, currency, today)
            .await?
            .map(|r| r.sell_rate);
        let usd_sell = self.rates().usd_sell_rate(branch_id, today).await?;
        let reportable = adjustment_crosses_bot_threshold(
            currency == base_currency,
            signed_amount,
            sell_rate,
            usd_sell,
        );
        match (reportable, sell_rate) {
            (true, Some(rate)) => Ok(Some(cross(signed_amount, rate))),
            _ => Ok(None),
        }
    }

    /// Records a physical cash removal outside the EOD pipeline.
    pub async fn cash_out(
        &self,
        branch_id: Uuid,
        operator_id: Uuid,
        currency: &str,
        amount: Decimal,
        remarks: Option<String>,
    ) -> AppResult<LedgerEntry> {
        let status = self.branches().status(branch_id).await?;
        let base_currency = status.branch.base_currency.clone();

        let txn = self.db.begin().await.map_err(db_err)?;
        let balances = BalanceRepository::lock_in_order(
            &txn,
            branch_id,
            &[currency.to_string()],
            &base_currency,
        )
        .await?;
        let before = balances.get(currency).copied().unwrap_or(Decimal::ZERO);

        let draft = plan_cash_out(currency, currency == base_currency, amount, before)?;
        let after = before + draft.balance_delta;

        let ctx = AppendContext {
            branch_id,
            branch_code: status.branch.code.clone(),
            operator_id,
            transaction_date: Utc::now().date_naive(),
            customer_name: None,
            customer_id: None,
            purpose: None,
            remarks,
            business_group_id: None,
        };
        let model = LedgerRepository::append(&txn, &ctx, &draft, before, after, None).await?;
        BalanceRepository::apply_delta(&txn, branch_id, currency, draft.balance_delta).await?;
        txn.commit().await.map_err(db_err)?;
        entry_from_model(model)
    }

    /// Administratively zeroes a currency that has never been initialised.
    ///
    /// Writes no ledger entry; refused when an initial-balance entry
    /// exists for the currency.
    pub async fn set_to_zero(&self, branch_id: Uuid, currency: &str) -> AppResult<()> {
        let has_initial = self
            .ledger()
            .has_initial_balance(branch_id, currency)
            .await?;
        zeroable(currency, has_initial).map_err(AppError::from)?;

        let txn = self.db.begin().await.map_err(db_err)?;
        BalanceRepository::set_absolute(&txn, branch_id, currency, Decimal::ZERO).await?;
        txn.commit().await.map_err(db_err)?;
        Ok(())
    }
}
