//! Audit log repository: who did what, when.
//!
//! Audit writes never fail the business operation they describe; callers
//! log and continue on error.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use satang_shared::types::{PageRequest, PageResponse};
use satang_shared::AppResult;

use crate::entities::audit_logs;

use super::db_err;

/// One audit event to record.
#[derive(Debug, Clone)]
pub struct AuditRecord {
    /// Branch context, when any.
    pub branch_id: Option<Uuid>,
    /// Acting operator, when known.
    pub operator_id: Option<Uuid>,
    /// Short action code, e.g. `exchange.execute`.
    pub action: String,
    /// Entity kind the action touched.
    pub entity: Option<String>,
    /// Entity id, stringified.
    pub entity_id: Option<String>,
    /// Structured detail payload.
    pub detail: Option<serde_json::Value>,
}

/// Audit log repository.
#[derive(Debug, Clone)]
pub struct AuditLogRepository {
    db: DatabaseConnection,
}

impl AuditLogRepository {
    /// Creates a new audit log repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Appends one audit event.
    pub async fn record(&self, record: AuditRecord) -> AppResult<()> {
        let active = audit_logs::ActiveModel {
            id: Set(Uuid::now_v7()),
            branch_id: Set(record.branch_id),
            operator_id: Set(record.operator_id),
            action: Set(record.action),
            entity: Set(record.entity),
            entity_id: Set(record.entity_id),
            detail: Set(record.detail),
            created_at: Set(Utc::now().into()),
        };
        active.insert(&self.db).await.map_err(db_err)?;
        Ok(())
    }

    /// Lists audit events for a branch, newest first.
    pub async fn list(
        &self,
        branch_id: Uuid,
        page: &PageRequest,
    ) -> AppResult<PageResponse<audit_logs::Model>> {
        let query = audit_logs::Entity::find()
            .filter(audit_logs::Column::BranchId.eq(branch_id));
        let total = query.clone().count(&self.db).await.map_err(db_err)?;
        let data = query
            .order_by_desc(audit_logs::Column::CreatedAt)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(PageResponse::new(data, page.page, page.per_page, total))
    }
}
