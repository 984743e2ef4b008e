//! Ledger repository: append-only entry storage and queries.
//!
//! Rows are never mutated after insert except to flip `status` to
//! `reversed` and to record receipt metadata. Transaction numbers come
//! from the per-(branch, date) counter row, incremented under lock inside
//! the same database transaction as the append.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use satang_core::ledger::{EntryDraft, LedgerEntry};
use satang_shared::types::{BranchId, BusinessGroupId, LedgerEntryId, OperatorId, PageRequest, PageResponse};
use satang_shared::{AppError, AppResult};

use crate::convert::{entry_status_str, entry_type_str, parse_entry_status, parse_entry_type};
use crate::entities::{ledger_entries, transaction_counters};

use super::db_err;

/// Filter options for listing ledger entries.
#[derive(Debug, Clone, Default)]
pub struct LedgerFilter {
    /// Restrict to one currency.
    pub currency: Option<String>,
    /// Restrict to one entry type (wire spelling).
    pub entry_type: Option<String>,
    /// Business date range start, inclusive.
    pub date_from: Option<NaiveDate>,
    /// Business date range end, inclusive.
    pub date_to: Option<NaiveDate>,
}

/// Context the append needs beyond the planner's draft.
#[derive(Debug, Clone)]
pub(crate) struct AppendContext {
    pub branch_id: Uuid,
    pub branch_code: String,
    pub operator_id: Uuid,
    pub transaction_date: NaiveDate,
    pub customer_name: Option<String>,
    pub customer_id: Option<String>,
    pub purpose: Option<String>,
    pub remarks: Option<String>,
    pub business_group_id: Option<Uuid>,
}

/// Ledger repository.
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    db: DatabaseConnection,
}

impl LedgerRepository {
    /// Creates a new ledger repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Finds one entry by its transaction number.
    pub async fn find_by_transaction_no(
        &self,
        branch_id: Uuid,
        transaction_no: &str,
    ) -> AppResult<LedgerEntry> {
        let model = ledger_entries::Entity::find()
            .filter(ledger_entries::Column::BranchId.eq(branch_id))
            .filter(ledger_entries::Column::TransactionNo.eq(transaction_no))
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or_else(|| AppError::NotFound(format!("transaction {transaction_no}")))?;
        entry_from_model(model)
    }

    /// Lists entries for a branch, newest first, paginated.
    pub async fn list(
        &self,
        branch_id: Uuid,
        filter: &LedgerFilter,
        page: &PageRequest,
    ) -> AppResult<PageResponse<LedgerEntry>> {
        let mut query = ledger_entries::Entity::find()
            .filter(ledger_entries::Column::BranchId.eq(branch_id));
        if let Some(currency) = &filter.currency {
            query = query.filter(ledger_entries::Column::Currency.eq(currency));
        }
        if let Some(entry_type) = &filter.entry_type {
            query = query.filter(ledger_entries::Column::EntryType.eq(entry_type));
        }
        if let Some(from) = filter.date_from {
            query = query.filter(ledger_entries::Column::TransactionDate.gte(from));
        }
        if let Some(to) = filter.date_to {
            query = query.filter(ledger_entries::Column::TransactionDate.lte(to));
        }

        let total = query.clone().count(&self.db).await.map_err(db_err)?;
        let models = query
            .order_by_desc(ledger_entries::Column::CreatedAt)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await
            .map_err(db_err)?;

        let data = models
            .into_iter()
            .map(entry_from_model)
            .collect::<AppResult<Vec<_>>>()?;
        Ok(PageResponse::new(data, page.page, page.per_page, total))
    }

    /// All entries a branch committed inside a time window, oldest first.
    pub async fn entries_between(
        &self,
        branch_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AppResult<Vec<LedgerEntry>> {
        let models = ledger_entries::Entity::find()
            .filter(ledger_entries::Column::BranchId.eq(branch_id))
            .filter(ledger_entries::Column::CreatedAt.gte(start))
            .filter(ledger_entries::Column::CreatedAt.lte(end))
            .order_by_asc(ledger_entries::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        models.into_iter().map(entry_from_model).collect()
    }

    /// All rows sharing a business group, in group order.
    pub async fn entries_in_group(
        &self,
        branch_id: Uuid,
        business_group_id: Uuid,
    ) -> AppResult<Vec<LedgerEntry>> {
        let models = ledger_entries::Entity::find()
            .filter(ledger_entries::Column::BranchId.eq(branch_id))
            .filter(ledger_entries::Column::BusinessGroupId.eq(business_group_id))
            .order_by_asc(ledger_entries::Column::GroupSequence)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        models.into_iter().map(entry_from_model).collect()
    }

    /// Commit time of the branch's earliest entry, when any.
    pub async fn earliest_entry_at(&self, branch_id: Uuid) -> AppResult<Option<DateTime<Utc>>> {
        let model = ledger_entries::Entity::find()
            .filter(ledger_entries::Column::BranchId.eq(branch_id))
            .order_by_asc(ledger_entries::Column::CreatedAt)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(|m| m.created_at.to_utc()))
    }

    /// Whether the (branch, currency) pair already carries an
    /// initial-balance entry.
    pub async fn has_initial_balance(&self, branch_id: Uuid, currency: &str) -> AppResult<bool> {
        let count = ledger_entries::Entity::find()
            .filter(ledger_entries::Column::BranchId.eq(branch_id))
            .filter(ledger_entries::Column::Currency.eq(currency))
            .filter(ledger_entries::Column::EntryType.eq("initial_balance"))
            .count(&self.db)
            .await
            .map_err(db_err)?;
        Ok(count > 0)
    }

    /// Whether an active reversal already targets the transaction.
    pub async fn has_active_reversal(
        &self,
        branch_id: Uuid,
        transaction_no: &str,
    ) -> AppResult<bool> {
        let count = ledger_entries::Entity::find()
            .filter(ledger_entries::Column::BranchId.eq(branch_id))
            .filter(ledger_entries::Column::EntryType.eq("reversal"))
            .filter(ledger_entries::Column::OriginalTransactionNo.eq(transaction_no))
            .filter(ledger_entries::Column::Status.eq("active"))
            .count(&self.db)
            .await
            .map_err(db_err)?;
        Ok(count > 0)
    }

    /// Records the rendered receipt filename on an entry.
    pub async fn set_receipt_filename(&self, id: Uuid, filename: &str) -> AppResult<()> {
        let model = ledger_entries::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or_else(|| AppError::NotFound(format!("ledger entry {id}")))?;
        let mut active: ledger_entries::ActiveModel = model.into();
        active.receipt_filename = Set(Some(filename.to_string()));
        active.update(&self.db).await.map_err(db_err)?;
        Ok(())
    }

    /// Increments the print counter and returns the new count.
    pub async fn bump_print_count(&self, id: Uuid) -> AppResult<i32> {
        let model = ledger_entries::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or_else(|| AppError::NotFound(format!("ledger entry {id}")))?;
        let next = model.print_count + 1;
        let mut active: ledger_entries::ActiveModel = model.into();
        active.print_count = Set(next);
        active.update(&self.db).await.map_err(db_err)?;
        Ok(next)
    }

    /// Allocates the next daily sequence for (branch, date) under lock.
    pub(crate) async fn next_sequence<C: ConnectionTrait>(
        txn: &C,
        branch_id: Uuid,
        date: NaiveDate,
    ) -> AppResult<i32> {
        let counter = transaction_counters::Entity::find()
            .filter(transaction_counters::Column::BranchId.eq(branch_id))
            .filter(transaction_counters::Column::CounterDate.eq(date))
            .lock_exclusive()
            .one(txn)
            .await
            .map_err(db_err)?;

        match counter {
            Some(row) => {
                let sequence = row.next_sequence;
                let mut active: transaction_counters::ActiveModel = row.into();
                active.next_sequence = Set(sequence + 1);
                active.updated_at = Set(Utc::now().into());
                active.update(txn).await.map_err(db_err)?;
                Ok(sequence)
            }
            None => {
                let active = transaction_counters::ActiveModel {
                    id: Set(Uuid::now_v7()),
                    branch_id: Set(branch_id),
                    counter_date: Set(date),
                    next_sequence: Set(2),
                    updated_at: Set(Utc::now().into()),
                };
                active.insert(txn).await.map_err(db_err)?;
                Ok(1)
            }
        }
    }

    /// Appends one planner draft as a committed row.
    pub(crate) async fn append<C: ConnectionTrait>(
        txn: &C,
        ctx: &AppendContext,
        draft: &EntryDraft,
        balance_before: Decimal,
        balance_after: Decimal,
        group_sequence: Option<i32>,
    ) -> AppResult<ledger_entries::Model> {
        let sequence = Self::next_sequence(txn, ctx.branch_id, ctx.transaction_date).await?;
        let transaction_no = satang_core::ledger::format_transaction_no(
            &ctx.branch_code,
            ctx.transaction_date,
            sequence,
        );

        let active = ledger_entries::ActiveModel {
            id: Set(Uuid::now_v7()),
            transaction_no: Set(transaction_no),
            daily_sequence: Set(sequence),
            entry_type: Set(entry_type_str(draft.entry_type).to_string()),
            branch_id: Set(ctx.branch_id),
            currency: Set(draft.currency.clone()),
            operator_id: Set(ctx.operator_id),
            customer_name: Set(ctx.customer_name.clone()),
            customer_id: Set(ctx.customer_id.clone()),
            purpose: Set(ctx.purpose.clone()),
            remarks: Set(ctx.remarks.clone()),
            amount: Set(draft.amount),
            rate: Set(draft.rate),
            local_amount: Set(draft.local_amount),
            balance_before: Set(balance_before),
            balance_after: Set(balance_after),
            transaction_date: Set(ctx.transaction_date),
            created_at: Set(Utc::now().into()),
            status: Set("active".to_string()),
            original_transaction_no: Set(draft.original_transaction_no.clone()),
            business_group_id: Set(ctx.business_group_id),
            group_sequence: Set(group_sequence.or(draft.group_sequence)),
            receipt_filename: Set(None),
            print_count: Set(0),
        };
        active.insert(txn).await.map_err(db_err)
    }

    /// Flips a committed trade to `reversed`.
    pub(crate) async fn mark_reversed<C: ConnectionTrait>(
        txn: &C,
        branch_id: Uuid,
        transaction_no: &str,
    ) -> AppResult<()> {
        let model = ledger_entries::Entity::find()
            .filter(ledger_entries::Column::BranchId.eq(branch_id))
            .filter(ledger_entries::Column::TransactionNo.eq(transaction_no))
            .one(txn)
            .await
            .map_err(db_err)?
            .ok_or_else(|| AppError::NotFound(format!("transaction {transaction_no}")))?;
        let mut active: ledger_entries::ActiveModel = model.into();
        active.status = Set(entry_status_str(satang_core::ledger::EntryStatus::Reversed).to_string());
        active.update(txn).await.map_err(db_err)?;
        Ok(())
    }
}

/// Converts a stored row into the domain view.
pub(crate) fn entry_from_model(model: ledger_entries::Model) -> AppResult<LedgerEntry> {
    let entry_type = parse_entry_type(&model.entry_type).ok_or_else(|| {
        AppError::InternalFailure(format!("unknown entry type {:?}", model.entry_type))
    })?;
    let status = parse_entry_status(&model.status).ok_or_else(|| {
        AppError::InternalFailure(format!("unknown entry status {:?}", model.status))
    })?;
    Ok(LedgerEntry {
        id: LedgerEntryId::from_uuid(model.id),
        transaction_no: model.transaction_no,
        daily_sequence: model.daily_sequence,
        entry_type,
        branch_id: BranchId::from_uuid(model.branch_id),
        currency: model.currency,
        operator_id: OperatorId::from_uuid(model.operator_id),
        customer_name: model.customer_name,
        customer_id: model.customer_id,
        purpose: model.purpose,
        remarks: model.remarks,
        amount: model.amount,
        rate: model.rate,
        local_amount: model.local_amount,
        balance_before: model.balance_before,
        balance_after: model.balance_after,
        transaction_date: model.transaction_date,
        created_at: model.created_at.to_utc(),
        status,
        original_transaction_no: model.original_transaction_no,
        business_group_id: model.business_group_id.map(BusinessGroupId::from_uuid),
        group_sequence: model.group_sequence,
        receipt_filename: model.receipt_filename,
        print_count: model.print_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use satang_core::ledger::{EntryStatus, EntryType};

    fn model(entry_type: &str, status: &str) -> ledger_entries::Model {
        ledger_entries::Model {
            id: Uuid::now_v7(),
            transaction_no: "BKK01-20260826-0001".to_string(),
            daily_sequence: 1,
            entry_type: entry_type.to_string(),
            branch_id: Uuid::now_v7(),
            currency: "USD".to_string(),
            operator_id: Uuid::now_v7(),
            customer_name: Some("Somchai".to_string()),
            customer_id: None,
            purpose: None,
            remarks: None,
            amount: dec!(100),
            rate: dec!(35),
            local_amount: dec!(-3500),
            balance_before: dec!(1000),
            balance_after: dec!(1100),
            transaction_date: chrono::NaiveDate::from_ymd_opt(2026, 8, 26).unwrap(),
            created_at: Utc::now().into(),
            status: status.to_string(),
            original_transaction_no: None,
            business_group_id: None,
            group_sequence: None,
            receipt_filename: None,
            print_count: 0,
        }
    }

    #[test]
    fn test_entry_from_model_decodes_enums() {
        let entry = entry_from_model(model("buy", "active")).unwrap();
        assert_eq!(entry.entry_type, EntryType::Buy);
        assert_eq!(entry.status, EntryStatus::Active);
        assert_eq!(entry.amount, dec!(100));
        assert_eq!(entry.local_amount, dec!(-3500));
    }

    #[test]
    fn test_entry_from_model_rejects_unknown_type() {
        assert!(entry_from_model(model("transfer", "active")).is_err());
        assert!(entry_from_model(model("buy", "pending")).is_err());
    }
}
