//! Balance management: listing, opening balances, adjustments, cash-out,
//! set-to-zero, and alert thresholds.

use std::collections::HashSet;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use satang_db::repositories::{
    AuditRecord, BalanceRepository, BranchRepository, ExchangeService, InitialBalanceItem,
};
use satang_shared::Capability;

use super::{conn, record_audit};
use crate::AppState;
use crate::error::ApiResult;
use crate::middleware::auth::AuthUser;

#[derive(Debug, Deserialize)]
struct InitialItemBody {
    currency: String,
    amount: Decimal,
}

#[derive(Debug, Deserialize)]
struct InitialBody {
    items: Vec<InitialItemBody>,
    /// When true, currencies that already carry an opening are skipped
    /// instead of failing the batch.
    #[serde(default)]
    skip_existing: bool,
}

#[derive(Debug, Deserialize)]
struct AdjustBody {
    currency: String,
    /// Signed amount; positive adds stock.
    amount: Decimal,
    remarks: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CashOutBody {
    currency: String,
    /// Positive amount removed from the till.
    amount: Decimal,
    remarks: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SetToZeroBody {
    currency: String,
}

#[derive(Debug, Deserialize)]
struct AlertBody {
    currency: String,
    warning_threshold: Decimal,
    critical_threshold: Decimal,
}

async fn list_balances(
    State(state): State<AppState>,
    user: AuthUser,
    Path(branch_id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    user.require(Capability::ViewBalances)?;
    user.require_branch(branch_id)?;

    let status = BranchRepository::new(conn(&state)).status(branch_id).await?;
    let rows = BalanceRepository::new(conn(&state)).list(branch_id).await?;
    Ok(Json(json!({ "state": status.state, "balances": rows })))
}

async fn set_initial(
    State(state): State<AppState>,
    user: AuthUser,
    Path(branch_id): Path<Uuid>,
    Json(body): Json<InitialBody>,
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    user.require(Capability::BalanceManage)?;
    user.require_branch(branch_id)?;

    let items: Vec<InitialBalanceItem> = body
        .items
        .iter()
        .map(|item| InitialBalanceItem {
            currency: item.currency.clone(),
            amount: item.amount,
        })
        .collect();
    let committed = ExchangeService::new(conn(&state))
        .set_initial_balance(branch_id, user.operator_id(), &items, body.skip_existing)
        .await?;

    let committed_currencies: HashSet<&str> =
        committed.iter().map(|e| e.currency.as_str()).collect();
    let skipped: Vec<&str> = items
        .iter()
        .map(|i| i.currency.as_str())
        .filter(|c| !committed_currencies.contains(c))
        .collect();

    record_audit(
        &state,
        AuditRecord {
            branch_id: Some(branch_id),
            operator_id: Some(user.operator_id()),
            action: "balances.initial".to_string(),
            entity: Some("balances".to_string()),
            entity_id: None,
            detail: Some(json!({ "committed": committed.len(), "skipped": skipped })),
        },
    )
    .await;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "entries": committed, "skipped": skipped })),
    ))
}

async fn adjust(
    State(state): State<AppState>,
    user: AuthUser,
    Path(branch_id): Path<Uuid>,
    Json(body): Json<AdjustBody>,
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    user.require(Capability::BalanceManage)?;
    user.require_branch(branch_id)?;

    let entry = ExchangeService::new(conn(&state))
        .adjust_balance(
            branch_id,
            user.operator_id(),
            user.can(Capability::BalanceManage),
            &body.currency,
            body.amount,
            body.remarks,
        )
        .await?;

    record_audit(
        &state,
        AuditRecord {
            branch_id: Some(branch_id),
            operator_id: Some(user.operator_id()),
            action: "balances.adjust".to_string(),
            entity: Some("ledger_entry".to_string()),
            entity_id: Some(entry.transaction_no.clone()),
            detail: Some(json!({ "currency": body.currency, "amount": body.amount })),
        },
    )
    .await;

    Ok((StatusCode::CREATED, Json(json!({ "entry": entry }))))
}

async fn cash_out(
    State(state): State<AppState>,
    user: AuthUser,
    Path(branch_id): Path<Uuid>,
    Json(body): Json<CashOutBody>,
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    user.require(Capability::BalanceManage)?;
    user.require_branch(branch_id)?;

    let entry = ExchangeService::new(conn(&state))
        .cash_out(
            branch_id,
            user.operator_id(),
            &body.currency,
            body.amount,
            body.remarks,
        )
        .await?;

    record_audit(
        &state,
        AuditRecord {
            branch_id: Some(branch_id),
            operator_id: Some(user.operator_id()),
            action: "balances.cash_out".to_string(),
            entity: Some("ledger_entry".to_string()),
            entity_id: Some(entry.transaction_no.clone()),
            detail: Some(json!({ "currency": body.currency, "amount": body.amount })),
        },
    )
    .await;

    Ok((StatusCode::CREATED, Json(json!({ "entry": entry }))))
}

async fn set_to_zero(
    State(state): State<AppState>,
    user: AuthUser,
    Path(branch_id): Path<Uuid>,
    Json(body): Json<SetToZeroBody>,
) -> ApiResult<Json<serde_json::Value>> {
    user.require(Capability::BalanceManage)?;
    user.require_branch(branch_id)?;

    ExchangeService::new(conn(&state))
        .set_to_zero(branch_id, &body.currency)
        .await?;

    record_audit(
        &state,
        AuditRecord {
            branch_id: Some(branch_id),
            operator_id: Some(user.operator_id()),
            action: "balances.set_to_zero".to_string(),
            entity: Some("balances".to_string()),
            entity_id: Some(body.currency.clone()),
            detail: None,
        },
    )
    .await;

    Ok(Json(json!({ "currency": body.currency, "balance": "0" })))
}

async fn list_alerts(
    State(state): State<AppState>,
    user: AuthUser,
    Path(branch_id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    user.require(Capability::ViewBalances)?;
    user.require_branch(branch_id)?;

    let alerts = BranchRepository::new(conn(&state)).alerts(branch_id).await?;
    Ok(Json(json!({ "alerts": alerts })))
}

async fn upsert_alert(
    State(state): State<AppState>,
    user: AuthUser,
    Path(branch_id): Path<Uuid>,
    Json(body): Json<AlertBody>,
) -> ApiResult<Json<serde_json::Value>> {
    user.require(Capability::BalanceManage)?;
    user.require_branch(branch_id)?;

    BranchRepository::new(conn(&state))
        .upsert_alert(
            branch_id,
            &body.currency,
            body.warning_threshold,
            body.critical_threshold,
        )
        .await?;
    Ok(Json(json!({ "currency": body.currency })))
}

/// Creates balance routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/branches/{branch_id}/balances", get(list_balances))
        .route("/branches/{branch_id}/balances/initial", post(set_initial))
        .route("/branches/{branch_id}/balances/adjust", post(adjust))
        .route("/branches/{branch_id}/balances/cash-out", post(cash_out))
        .route(
            "/branches/{branch_id}/balances/set-to-zero",
            post(set_to_zero),
        )
        .route("/branches/{branch_id}/balances/alerts", get(list_alerts))
        .route("/branches/{branch_id}/balances/alerts", put(upsert_alert))
}
