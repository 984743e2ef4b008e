//! Audit-log listing.

use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use uuid::Uuid;

use satang_db::repositories::AuditLogRepository;
use satang_shared::types::PageRequest;
use satang_shared::Capability;

use super::conn;
use crate::error::ApiResult;
use crate::middleware::auth::AuthUser;
use crate::AppState;

async fn list(
    State(state): State<AppState>,
    user: AuthUser,
    Path(branch_id): Path<Uuid>,
    Query(page): Query<PageRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    user.require(Capability::SystemManage)?;
    user.require_branch(branch_id)?;

    let page = AuditLogRepository::new(conn(&state))
        .list(branch_id, &page)
        .await?;
    Ok(Json(json!({ "data": page.data, "meta": page.meta })))
}

/// Creates audit-log routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/branches/{branch_id}/audit-logs", get(list))
}
