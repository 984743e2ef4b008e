//! EOD repository: persistence for the seven-step settlement pipeline.
//!
//! The pure step computations live in the core crate; this repository
//! gathers the period's ledger rows, feeds the planners, persists their
//! outputs, and advances the stored step through the typed state machine.
//! Each step re-reads the settlement row under `FOR UPDATE` so the phase
//! check, the step's side effects, and the step bump commit as one unit;
//! a concurrent attempt serialises behind the lock and sees the updated
//! phase. A retry that observes an already-advanced phase recomputes the
//! pure report without re-running side effects.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, SqlErr, TransactionTrait,
};
use uuid::Uuid;

use satang_core::eod::{
    compute_income, compute_stock, plan_cash_outs, plan_verifications, Advance, CashOutRequest,
    EodError, EodPhase, IncomeReport, StockReport, VerificationRow,
};
use satang_core::period::{derive_window, PeriodInputs, PeriodWindow};
use satang_shared::{AppError, AppResult};

use super::balance::BalanceRepository;
use super::branch::BranchRepository;
use super::db_err;
use super::ledger::{AppendContext, LedgerRepository};

use crate::entities::{balances, eod_balance_snapshots, eod_balance_verifications, eod_statuses};

/// An EOD row together with its decoded phase.
#[derive(Debug, Clone)]
pub struct EodRun {
    /// The stored row.
    pub model: eod_statuses::Model,
    /// Decoded pipeline phase.
    pub phase: EodPhase,
}

/// EOD repository.
#[derive(Debug, Clone)]
pub struct EodRepository {
    db: DatabaseConnection,
}

impl EodRepository {
    /// Creates a new EOD repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn ledger(&self) -> LedgerRepository {
        LedgerRepository::new(self.db.clone())
    }

    fn run_from_model(model: eod_statuses::Model) -> AppResult<EodRun> {
        let phase = EodPhase::from_step(model.step).ok_or_else(|| {
            AppError::InternalFailure(format!("eod {} carries step {}", model.id, model.step))
        })?;
        Ok(EodRun { model, phase })
    }

    /// The branch's current business-period window.
    pub async fn period_window(&self, branch_id: Uuid) -> AppResult<PeriodWindow> {
        let last_completed_at = self
            .last_completed(branch_id)
            .await?
            .and_then(|m| m.completed_at.map(|t| t.to_utc()));
        let earliest_entry_at = self.ledger().earliest_entry_at(branch_id).await?;
        let active_eod_end = self
            .current(branch_id)
            .await?
            .map(|run| run.model.business_end_time.to_utc());

        Ok(derive_window(PeriodInputs {
            last_completed_at,
            earliest_entry_at,
            active_eod_end,
            now: Utc::now(),
        }))
    }

    /// The in-flight EOD for a branch, when one exists.
    pub async fn current(&self, branch_id: Uuid) -> AppResult<Option<EodRun>> {
        let model = eod_statuses::Entity::find()
            .filter(eod_statuses::Column::BranchId.eq(branch_id))
            .filter(eod_statuses::Column::Status.eq("processing"))
            .one(&self.db)
            .await
            .map_err(db_err)?;
        model.map(Self::run_from_model).transpose()
    }

    /// Loads one EOD run by id.
    pub async fn get(&self, eod_id: Uuid) -> AppResult<EodRun> {
        let model = eod_statuses::Entity::find_by_id(eod_id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or_else(|| AppError::NotFound(format!("eod run {eod_id}")))?;
        Self::run_from_model(model)
    }

    async fn last_completed(&self, branch_id: Uuid) -> AppResult<Option<eod_statuses::Model>> {
        eod_statuses::Entity::find()
            .filter(eod_statuses::Column::BranchId.eq(branch_id))
            .filter(eod_statuses::Column::Status.eq("completed"))
            .order_by_desc(eod_statuses::Column::CompletedAt)
            .one(&self.db)
            .await
            .map_err(db_err)
    }

    /// The (start, end) windows of every completed settlement, used to
    /// refuse reversals that cross a settled period.
    pub async fn completed_windows(
        &self,
        branch_id: Uuid,
    ) -> AppResult<Vec<(DateTime<Utc>, DateTime<Utc>)>> {
        let rows = eod_statuses::Entity::find()
            .filter(eod_statuses::Column::BranchId.eq(branch_id))
            .filter(eod_statuses::Column::Status.eq("completed"))
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(rows
            .into_iter()
            .map(|r| (r.business_start_time.to_utc(), r.business_end_time.to_utc()))
            .collect())
    }

    /// Step 1: freezes the branch and fixes the period window.
    pub async fn start(&self, branch_id: Uuid, started_by: Uuid) -> AppResult<EodRun> {
        let status = BranchRepository::new(self.db.clone()).status(branch_id).await?;
        status.state.check_start_eod()?;

        let window = self.period_window(branch_id).await?;
        let now = Utc::now();
        let active = eod_statuses::ActiveModel {
            id: Set(Uuid::now_v7()),
            branch_id: Set(branch_id),
            status: Set("processing".to_string()),
            step: Set(EodPhase::Frozen.step()),
            is_locked: Set(true),
            started_at: Set(now.into()),
            business_start_time: Set(window.start.into()),
            business_end_time: Set(now.into()),
            completed_at: Set(None),
            started_by: Set(started_by),
            completed_by: Set(None),
            cancel_reason: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };
        // The partial unique index on (branch_id) WHERE status='processing'
        // closes the race between two concurrent starts: the second insert
        // conflicts no matter what the pre-check saw.
        let model = match active.insert(&self.db).await {
            Ok(model) => model,
            Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                return Err(AppError::ConcurrentEod(format!(
                    "branch {branch_id} already has a settlement in progress"
                )));
            }
            Err(err) => return Err(db_err(err)),
        };
        Self::run_from_model(model)
    }

    fn ensure_processing(run: &EodRun) -> AppResult<()> {
        match run.model.status.as_str() {
            "processing" => Ok(()),
            "cancelled" => Err(EodError::Cancelled.into()),
            _ => Err(EodError::AlreadyCompleted.into()),
        }
    }

    /// Re-reads the settlement row under `FOR UPDATE` so the phase check
    /// and whatever the caller writes next land in one transaction.
    async fn lock_run(txn: &DatabaseTransaction, eod_id: Uuid) -> AppResult<EodRun> {
        let model = eod_statuses::Entity::find_by_id(eod_id)
            .lock_exclusive()
            .one(txn)
            .await
            .map_err(db_err)?
            .ok_or_else(|| AppError::NotFound(format!("eod run {eod_id}")))?;
        Self::run_from_model(model)
    }

    async fn mark_step(txn: &DatabaseTransaction, run: &EodRun, next: EodPhase) -> AppResult<()> {
        let mut active: eod_statuses::ActiveModel = run.model.clone().into();
        active.step = Set(next.step());
        active.updated_at = Set(Utc::now().into());
        active.update(txn).await.map_err(db_err)?;
        Ok(())
    }

    /// Advances the stored step under a row lock, so concurrent attempts
    /// serialise and the loser sees the updated phase.
    async fn advance(&self, eod_id: Uuid, requested: EodPhase) -> AppResult<Advance> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let run = Self::lock_run(&txn, eod_id).await?;
        Self::ensure_processing(&run)?;
        let outcome = run.phase.advance(requested)?;
        if let Advance::Applied(next) = outcome {
            Self::mark_step(&txn, &run, next).await?;
        }
        txn.commit().await.map_err(db_err)?;
        Ok(outcome)
    }

    async fn window_entries(
        &self,
        run: &EodRun,
    ) -> AppResult<Vec<satang_core::ledger::LedgerEntry>> {
        self.ledger()
            .entries_between(
                run.model.branch_id,
                run.model.business_start_time.to_utc(),
                run.model.business_end_time.to_utc(),
            )
            .await
    }

    /// Step 2: income report over the frozen window.
    pub async fn income_report(&self, eod_id: Uuid, base_currency: &str) -> AppResult<IncomeReport> {
        let run = self.get(eod_id).await?;
        Self::ensure_processing(&run)?;
        let entries = self.window_entries(&run).await?;
        let report = compute_income(&entries, base_currency);
        self.advance(eod_id, EodPhase::IncomeReported).await?;
        Ok(report)
    }

    /// Step 3: stock report over the frozen window.
    ///
    /// Openings follow the verified-actual chain: the previous completed
    /// settlement's counted balances minus what it cashed out. Branches
    /// without settlement history derive the opening by backing the
    /// in-window change out of the current balance.
    pub async fn stock_report(&self, eod_id: Uuid, base_currency: &str) -> AppResult<StockReport> {
        let run = self.get(eod_id).await?;
        Self::ensure_processing(&run)?;
        let entries = self.window_entries(&run).await?;
        let openings = self.openings(&run, &entries, base_currency).await?;
        let report = compute_stock(&openings, &entries, base_currency);
        self.advance(eod_id, EodPhase::StockReported).await?;
        Ok(report)
    }

    async fn openings(
        &self,
        run: &EodRun,
        entries: &[satang_core::ledger::LedgerEntry],
        base_currency: &str,
    ) -> AppResult<BTreeMap<String, Decimal>> {
        let previous = self.last_completed(run.model.branch_id).await?;
        if let Some(previous) = previous {
            let verified = eod_balance_verifications::Entity::find()
                .filter(eod_balance_verifications::Column::EodStatusId.eq(previous.id))
                .all(&self.db)
                .await
                .map_err(db_err)?;
            if !verified.is_empty() {
                let mut openings: BTreeMap<String, Decimal> = verified
                    .into_iter()
                    .map(|v| (v.currency, v.actual_balance))
                    .collect();
                // Cash-outs land between the freeze and completion.
                let completed_at = previous
                    .completed_at
                    .map_or_else(Utc::now, |t| t.to_utc());
                let settlement = self
                    .ledger()
                    .entries_between(
                        run.model.branch_id,
                        previous.business_end_time.to_utc(),
                        completed_at,
                    )
                    .await?;
                for entry in settlement {
                    if entry.entry_type != satang_core::ledger::EntryType::CashOut {
                        continue;
                    }
                    let removed = if entry.currency == base_currency {
                        entry.local_amount
                    } else {
                        entry.amount
                    };
                    if let Some(balance) = openings.get_mut(&entry.currency) {
                        *balance += removed;
                    }
                }
                return Ok(openings);
            }
        }

        // No snapshot history: opening = current balance − in-window change.
        let balance_rows = balances::Entity::find()
            .filter(balances::Column::BranchId.eq(run.model.branch_id))
            .all(&self.db)
            .await
            .map_err(db_err)?;
        let current: BTreeMap<String, Decimal> = balance_rows
            .into_iter()
            .map(|b| (b.currency, b.balance))
            .collect();
        let changes = compute_stock(&BTreeMap::new(), entries, base_currency);
        Ok(current
            .into_iter()
            .map(|(currency, balance)| {
                let change = changes
                    .rows
                    .iter()
                    .find(|r| r.currency == currency)
                    .map_or(Decimal::ZERO, |r| r.change);
                (currency, balance - change)
            })
            .collect())
    }

    /// Step 4: verifies physical counts and writes reconciliation entries
    /// for every non-zero difference.
    pub async fn verify(
        &self,
        eod_id: Uuid,
        operator_id: Uuid,
        counts: &BTreeMap<String, Decimal>,
        base_currency: &str,
    ) -> AppResult<Vec<VerificationRow>> {
        let run = self.get(eod_id).await?;
        Self::ensure_processing(&run)?;

        if run.phase >= EodPhase::Verified {
            // Retry: report what was stored, write nothing.
            return self.stored_verifications(eod_id).await;
        }

        // Pure inputs derive from the frozen window; compute them before
        // taking any lock.
        let entries = self.window_entries(&run).await?;
        let openings = self.openings(&run, &entries, base_currency).await?;
        let stock = compute_stock(&openings, &entries, base_currency);
        let outcome = plan_verifications(&stock, counts, base_currency)?;

        let branch = BranchRepository::new(self.db.clone())
            .get(run.model.branch_id)
            .await?;
        let currencies: Vec<String> = outcome
            .diff_drafts
            .iter()
            .map(|d| d.currency.clone())
            .collect();

        let txn = self.db.begin().await.map_err(db_err)?;
        let run = Self::lock_run(&txn, eod_id).await?;
        Self::ensure_processing(&run)?;
        let next = match run.phase.advance(EodPhase::Verified)? {
            Advance::NoOp => {
                // Lost the race to a concurrent verify; its rows stand.
                txn.commit().await.map_err(db_err)?;
                return self.stored_verifications(eod_id).await;
            }
            Advance::Applied(next) => next,
        };
        let locked =
            BalanceRepository::lock_in_order(&txn, run.model.branch_id, &currencies, base_currency)
                .await?;

        let mut adjustment_ids: BTreeMap<String, Uuid> = BTreeMap::new();
        for draft in &outcome.diff_drafts {
            let before = locked.get(&draft.currency).copied().unwrap_or(Decimal::ZERO);
            let ctx = AppendContext {
                branch_id: run.model.branch_id,
                branch_code: branch.code.clone(),
                operator_id,
                transaction_date: Utc::now().date_naive(),
                customer_name: None,
                customer_id: None,
                purpose: None,
                remarks: None,
                business_group_id: None,
            };
            let model = LedgerRepository::append(
                &txn,
                &ctx,
                draft,
                before,
                before + draft.balance_delta,
                None,
            )
            .await?;
            BalanceRepository::apply_delta(
                &txn,
                run.model.branch_id,
                &draft.currency,
                draft.balance_delta,
            )
            .await?;
            adjustment_ids.insert(draft.currency.clone(), model.id);
        }

        for row in &outcome.rows {
            let active = eod_balance_verifications::ActiveModel {
                id: Set(Uuid::now_v7()),
                eod_status_id: Set(eod_id),
                currency: Set(row.currency.clone()),
                theoretical_balance: Set(row.theoretical_balance),
                actual_balance: Set(row.actual_balance),
                difference: Set(row.difference),
                adjustment_entry_id: Set(adjustment_ids.get(&row.currency).copied()),
                created_at: Set(Utc::now().into()),
            };
            active.insert(&txn).await.map_err(db_err)?;
        }
        Self::mark_step(&txn, &run, next).await?;
        txn.commit().await.map_err(db_err)?;

        Ok(outcome.rows)
    }

    /// The verification rows persisted at step 4, in currency order.
    pub async fn stored_verifications(&self, eod_id: Uuid) -> AppResult<Vec<VerificationRow>> {
        let rows = eod_balance_verifications::Entity::find()
            .filter(eod_balance_verifications::Column::EodStatusId.eq(eod_id))
            .order_by_asc(eod_balance_verifications::Column::Currency)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(rows
            .into_iter()
            .map(|r| VerificationRow {
                currency: r.currency,
                theoretical_balance: r.theoretical_balance,
                actual_balance: r.actual_balance,
                difference: r.difference,
            })
            .collect())
    }

    /// Step 5: records the physical cash removals.
    pub async fn record_cash_outs(
        &self,
        eod_id: Uuid,
        operator_id: Uuid,
        requests: &[CashOutRequest],
        base_currency: &str,
    ) -> AppResult<()> {
        let run = self.get(eod_id).await?;
        Self::ensure_processing(&run)?;

        if run.phase >= EodPhase::CashedOut {
            return Ok(());
        }

        let verified = self.stored_verifications(eod_id).await?;
        let drafts = plan_cash_outs(&verified, requests, base_currency)?;

        let branch = BranchRepository::new(self.db.clone())
            .get(run.model.branch_id)
            .await?;
        let currencies: Vec<String> = drafts.iter().map(|d| d.currency.clone()).collect();

        let txn = self.db.begin().await.map_err(db_err)?;
        let run = Self::lock_run(&txn, eod_id).await?;
        Self::ensure_processing(&run)?;
        let next = match run.phase.advance(EodPhase::CashedOut)? {
            Advance::NoOp => {
                txn.commit().await.map_err(db_err)?;
                return Ok(());
            }
            Advance::Applied(next) => next,
        };
        let locked =
            BalanceRepository::lock_in_order(&txn, run.model.branch_id, &currencies, base_currency)
                .await?;
        for draft in &drafts {
            let before = locked.get(&draft.currency).copied().unwrap_or(Decimal::ZERO);
            let ctx = AppendContext {
                branch_id: run.model.branch_id,
                branch_code: branch.code.clone(),
                operator_id,
                transaction_date: Utc::now().date_naive(),
                customer_name: None,
                customer_id: None,
                purpose: None,
                remarks: None,
                business_group_id: None,
            };
            LedgerRepository::append(&txn, &ctx, draft, before, before + draft.balance_delta, None)
                .await?;
            let after = BalanceRepository::apply_delta(
                &txn,
                run.model.branch_id,
                &draft.currency,
                draft.balance_delta,
            )
            .await?;
            BalanceRepository::guard_non_negative(&draft.currency, after)?;
        }
        Self::mark_step(&txn, &run, next).await?;
        txn.commit().await.map_err(db_err)?;
        Ok(())
    }

    /// Step 6: snapshots every remaining balance as the next period's
    /// opening.
    pub async fn snapshot(&self, eod_id: Uuid) -> AppResult<()> {
        let run = self.get(eod_id).await?;
        Self::ensure_processing(&run)?;

        if run.phase >= EodPhase::Snapshotted {
            return Ok(());
        }

        let txn = self.db.begin().await.map_err(db_err)?;
        let run = Self::lock_run(&txn, eod_id).await?;
        Self::ensure_processing(&run)?;
        let next = match run.phase.advance(EodPhase::Snapshotted)? {
            Advance::NoOp => {
                txn.commit().await.map_err(db_err)?;
                return Ok(());
            }
            Advance::Applied(next) => next,
        };

        let balance_rows = balances::Entity::find()
            .filter(balances::Column::BranchId.eq(run.model.branch_id))
            .all(&txn)
            .await
            .map_err(db_err)?;
        for row in balance_rows {
            let active = eod_balance_snapshots::ActiveModel {
                id: Set(Uuid::now_v7()),
                eod_status_id: Set(eod_id),
                branch_id: Set(run.model.branch_id),
                currency: Set(row.currency),
                remaining_balance: Set(row.balance),
                created_at: Set(Utc::now().into()),
            };
            active.insert(&txn).await.map_err(db_err)?;
        }
        Self::mark_step(&txn, &run, next).await?;
        txn.commit().await.map_err(db_err)?;
        Ok(())
    }

    /// Step 7: completes the settlement and reopens the branch.
    pub async fn complete(&self, eod_id: Uuid, completed_by: Uuid) -> AppResult<EodRun> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let run = Self::lock_run(&txn, eod_id).await?;
        Self::ensure_processing(&run)?;

        if let Advance::Applied(_) = run.phase.advance(EodPhase::Completed)? {
            let now = Utc::now();
            let mut active: eod_statuses::ActiveModel = run.model.clone().into();
            active.step = Set(EodPhase::Completed.step());
            active.status = Set("completed".to_string());
            active.is_locked = Set(false);
            active.completed_at = Set(Some(now.into()));
            active.completed_by = Set(Some(completed_by));
            active.updated_at = Set(now.into());
            let model = active.update(&txn).await.map_err(db_err)?;
            txn.commit().await.map_err(db_err)?;
            return Self::run_from_model(model);
        }
        txn.commit().await.map_err(db_err)?;
        Ok(run)
    }

    /// Abandons an in-flight settlement and unlocks the branch.
    pub async fn cancel(&self, eod_id: Uuid, reason: &str) -> AppResult<()> {
        let run = self.get(eod_id).await?;
        Self::ensure_processing(&run)?;

        let mut active: eod_statuses::ActiveModel = run.model.into();
        active.status = Set("cancelled".to_string());
        active.is_locked = Set(false);
        active.cancel_reason = Set(Some(reason.to_string()));
        active.updated_at = Set(Utc::now().into());
        active.update(&self.db).await.map_err(db_err)?;
        Ok(())
    }

    /// Cancels processing runs that have been stuck longer than the given
    /// age. With `force`, age is ignored. Returns how many were cancelled.
    pub async fn cleanup_stuck(
        &self,
        branch_id: Option<Uuid>,
        eod_id: Option<Uuid>,
        older_than_hours: i64,
        force: bool,
    ) -> AppResult<u64> {
        let mut query = eod_statuses::Entity::find()
            .filter(eod_statuses::Column::Status.eq("processing"));
        if let Some(branch_id) = branch_id {
            query = query.filter(eod_statuses::Column::BranchId.eq(branch_id));
        }
        if let Some(eod_id) = eod_id {
            query = query.filter(eod_statuses::Column::Id.eq(eod_id));
        }
        let rows = query.all(&self.db).await.map_err(db_err)?;

        let cutoff = Utc::now() - Duration::hours(older_than_hours);
        let mut cancelled = 0;
        for row in rows {
            if !force && row.started_at.to_utc() > cutoff {
                continue;
            }
            let id = row.id;
            let mut active: eod_statuses::ActiveModel = row.into();
            active.status = Set("cancelled".to_string());
            active.is_locked = Set(false);
            active.cancel_reason = Set(Some("stuck settlement cleanup".to_string()));
            active.updated_at = Set(Utc::now().into());
            active.update(&self.db).await.map_err(db_err)?;
            tracing::info!(eod_id = %id, "cancelled stuck settlement");
            cancelled += 1;
        }
        Ok(cancelled)
    }
}
