//! End-of-day settlement pipeline routes.
//!
//! Steps 2-7 address the run by its id so retries land on the same
//! settlement. Every step re-takes the session lock: one operator drives
//! one run, and a second operator gets a 409.

use std::collections::BTreeMap;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use satang_core::eod::CashOutRequest;
use satang_core::receipt::render_eod_summary;
use satang_db::repositories::{
    AuditRecord, BranchRepository, EodRepository, EodRun, SessionRepository,
};
use satang_shared::{AppError, AppResult, Capability};

use super::{conn, record_audit};
use crate::document::StreamCanvas;
use crate::error::{soft_warning, ApiResult};
use crate::middleware::auth::AuthUser;
use crate::AppState;

fn translate(key: &str) -> String {
    key.to_string()
}

#[derive(Debug, Deserialize)]
struct VerifyBody {
    /// Physical count per currency. Missing currencies count as zero.
    counts: BTreeMap<String, Decimal>,
}

#[derive(Debug, Deserialize)]
struct CashOutsBody {
    requests: Vec<CashOutRequest>,
}

#[derive(Debug, Deserialize)]
struct CancelBody {
    reason: String,
}

fn run_json(run: &EodRun) -> serde_json::Value {
    json!({
        "id": run.model.id,
        "branch_id": run.model.branch_id,
        "status": run.model.status,
        "phase": run.phase,
        "step": run.phase.step(),
        "started_at": run.model.started_at,
        "business_start_time": run.model.business_start_time,
        "business_end_time": run.model.business_end_time,
        "completed_at": run.model.completed_at,
    })
}

/// Loads the run, checks branch scope, and re-takes the session lock.
async fn checked_run(state: &AppState, user: &AuthUser, eod_id: Uuid) -> Result<EodRun, AppError> {
    user.require(Capability::BalanceManage).map_err(|e| e.0)?;
    let run = EodRepository::new(conn(state)).get(eod_id).await?;
    user.require_branch(run.model.branch_id).map_err(|e| e.0)?;
    SessionRepository::new(conn(state))
        .acquire_eod_lock(eod_id, user.operator_id())
        .await?;
    Ok(run)
}

async fn base_currency(state: &AppState, branch_id: Uuid) -> AppResult<String> {
    Ok(BranchRepository::new(conn(state)).get(branch_id).await?.base_currency)
}

async fn start(
    State(state): State<AppState>,
    user: AuthUser,
    Path(branch_id): Path<Uuid>,
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    user.require(Capability::BalanceManage)?;
    user.require_branch(branch_id)?;

    let run = EodRepository::new(conn(&state))
        .start(branch_id, user.operator_id())
        .await?;
    SessionRepository::new(conn(&state))
        .acquire_eod_lock(run.model.id, user.operator_id())
        .await?;

    record_audit(
        &state,
        AuditRecord {
            branch_id: Some(branch_id),
            operator_id: Some(user.operator_id()),
            action: "eod.start".to_string(),
            entity: Some("eod_status".to_string()),
            entity_id: Some(run.model.id.to_string()),
            detail: None,
        },
    )
    .await;

    Ok((StatusCode::CREATED, Json(run_json(&run))))
}

async fn status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(branch_id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    user.require(Capability::ViewBalances)?;
    user.require_branch(branch_id)?;

    let repo = EodRepository::new(conn(&state));
    let current = repo.current(branch_id).await?;
    let window = repo.period_window(branch_id).await?;
    Ok(Json(json!({
        "current": current.as_ref().map(run_json),
        "window": window,
    })))
}

async fn income(
    State(state): State<AppState>,
    user: AuthUser,
    Path(eod_id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    let run = checked_run(&state, &user, eod_id).await?;
    let base = base_currency(&state, run.model.branch_id).await?;
    let report = EodRepository::new(conn(&state))
        .income_report(eod_id, &base)
        .await?;
    Ok(Json(json!({ "income": report })))
}

async fn stock(
    State(state): State<AppState>,
    user: AuthUser,
    Path(eod_id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    let run = checked_run(&state, &user, eod_id).await?;
    let base = base_currency(&state, run.model.branch_id).await?;
    let report = EodRepository::new(conn(&state))
        .stock_report(eod_id, &base)
        .await?;
    Ok(Json(json!({ "stock": report })))
}

async fn verify(
    State(state): State<AppState>,
    user: AuthUser,
    Path(eod_id): Path<Uuid>,
    Json(body): Json<VerifyBody>,
) -> ApiResult<Json<serde_json::Value>> {
    let run = checked_run(&state, &user, eod_id).await?;
    let base = base_currency(&state, run.model.branch_id).await?;
    let rows = EodRepository::new(conn(&state))
        .verify(eod_id, user.operator_id(), &body.counts, &base)
        .await?;

    record_audit(
        &state,
        AuditRecord {
            branch_id: Some(run.model.branch_id),
            operator_id: Some(user.operator_id()),
            action: "eod.verify".to_string(),
            entity: Some("eod_status".to_string()),
            entity_id: Some(eod_id.to_string()),
            detail: Some(json!({ "currencies": rows.len() })),
        },
    )
    .await;

    Ok(Json(json!({ "verifications": rows })))
}

async fn cash_outs(
    State(state): State<AppState>,
    user: AuthUser,
    Path(eod_id): Path<Uuid>,
    Json(body): Json<CashOutsBody>,
) -> ApiResult<Json<serde_json::Value>> {
    let run = checked_run(&state, &user, eod_id).await?;
    let base = base_currency(&state, run.model.branch_id).await?;
    EodRepository::new(conn(&state))
        .record_cash_outs(eod_id, user.operator_id(), &body.requests, &base)
        .await?;

    record_audit(
        &state,
        AuditRecord {
            branch_id: Some(run.model.branch_id),
            operator_id: Some(user.operator_id()),
            action: "eod.cash_out".to_string(),
            entity: Some("eod_status".to_string()),
            entity_id: Some(eod_id.to_string()),
            detail: Some(json!({ "requests": body.requests.len() })),
        },
    )
    .await;

    Ok(Json(json!({ "recorded": body.requests.len() })))
}

/// Renders the settlement summary into the report tree. A failure here is
/// reported as a warning; the snapshot itself has already committed.
async fn render_summary(state: &AppState, run: &EodRun) -> AppResult<String> {
    let branch = BranchRepository::new(conn(state))
        .get(run.model.branch_id)
        .await?;
    let repo = EodRepository::new(conn(state));
    let income = repo.income_report(run.model.id, &branch.base_currency).await?;
    let stock = repo.stock_report(run.model.id, &branch.base_currency).await?;
    let verifications = repo.stored_verifications(run.model.id).await?;

    let mut canvas = StreamCanvas::new();
    render_eod_summary(
        &mut canvas,
        &branch.name,
        &income,
        &stock,
        &verifications,
        &translate,
    )
    .map_err(|e| AppError::PdfRenderFailed(e.to_string()))?;

    let end = run.model.business_end_time.date_naive();
    let path = format!(
        "reports/{}/EOD-{}-{}.pdf",
        end.format("%Y/%m"),
        branch.code,
        end.format("%Y%m%d"),
    );
    state
        .store
        .write_atomic(&path, canvas.into_bytes())
        .await
        .map_err(|e| AppError::PdfRenderFailed(e.to_string()))?;
    Ok(path)
}

async fn snapshot(
    State(state): State<AppState>,
    user: AuthUser,
    Path(eod_id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    let run = checked_run(&state, &user, eod_id).await?;
    EodRepository::new(conn(&state)).snapshot(eod_id).await?;

    let (summary_path, warning) = match render_summary(&state, &run).await {
        Ok(path) => (Some(path), None),
        Err(err) => {
            tracing::warn!(error = %err, eod_id = %eod_id, "summary render failed after snapshot");
            (None, Some(soft_warning(&err)))
        }
    };

    record_audit(
        &state,
        AuditRecord {
            branch_id: Some(run.model.branch_id),
            operator_id: Some(user.operator_id()),
            action: "eod.snapshot".to_string(),
            entity: Some("eod_status".to_string()),
            entity_id: Some(eod_id.to_string()),
            detail: None,
        },
    )
    .await;

    Ok(Json(json!({
        "snapshotted": true,
        "summary_path": summary_path,
        "warning": warning,
    })))
}

async fn complete(
    State(state): State<AppState>,
    user: AuthUser,
    Path(eod_id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    checked_run(&state, &user, eod_id).await?;
    let run = EodRepository::new(conn(&state))
        .complete(eod_id, user.operator_id())
        .await?;
    SessionRepository::new(conn(&state))
        .release_eod_lock(eod_id)
        .await?;

    record_audit(
        &state,
        AuditRecord {
            branch_id: Some(run.model.branch_id),
            operator_id: Some(user.operator_id()),
            action: "eod.complete".to_string(),
            entity: Some("eod_status".to_string()),
            entity_id: Some(eod_id.to_string()),
            detail: None,
        },
    )
    .await;

    Ok(Json(run_json(&run)))
}

async fn cancel(
    State(state): State<AppState>,
    user: AuthUser,
    Path(eod_id): Path<Uuid>,
    Json(body): Json<CancelBody>,
) -> ApiResult<Json<serde_json::Value>> {
    let run = checked_run(&state, &user, eod_id).await?;
    EodRepository::new(conn(&state))
        .cancel(eod_id, &body.reason)
        .await?;
    SessionRepository::new(conn(&state))
        .release_eod_lock(eod_id)
        .await?;

    record_audit(
        &state,
        AuditRecord {
            branch_id: Some(run.model.branch_id),
            operator_id: Some(user.operator_id()),
            action: "eod.cancel".to_string(),
            entity: Some("eod_status".to_string()),
            entity_id: Some(eod_id.to_string()),
            detail: Some(json!({ "reason": body.reason })),
        },
    )
    .await;

    Ok(Json(json!({ "cancelled": true })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use satang_core::eod::EodPhase;
    use satang_db::entities::eod_statuses;

    fn run(phase: EodPhase) -> EodRun {
        let now = Utc::now();
        EodRun {
            model: eod_statuses::Model {
                id: Uuid::now_v7(),
                branch_id: Uuid::new_v4(),
                status: "processing".to_string(),
                step: phase.step(),
                is_locked: true,
                started_at: now.into(),
                business_start_time: now.into(),
                business_end_time: now.into(),
                completed_at: None,
                started_by: Uuid::new_v4(),
                completed_by: None,
                cancel_reason: None,
                created_at: now.into(),
                updated_at: now.into(),
            },
            phase,
        }
    }

    #[test]
    fn test_run_json_carries_phase_and_step() {
        let value = run_json(&run(EodPhase::Verified));
        assert_eq!(value["phase"], "verified");
        assert_eq!(value["step"], 4);
        assert!(value["completed_at"].is_null());
    }
}

/// Creates end-of-day routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/branches/{branch_id}/eod", post(start))
        .route("/branches/{branch_id}/eod/status", get(status))
        .route("/eod/{eod_id}/income", post(income))
        .route("/eod/{eod_id}/stock", post(stock))
        .route("/eod/{eod_id}/verify", post(verify))
        .route("/eod/{eod_id}/cash-outs", post(cash_outs))
        .route("/eod/{eod_id}/snapshot", post(snapshot))
        .route("/eod/{eod_id}/complete", post(complete))
        .route("/eod/{eod_id}/cancel", post(cancel))
}
