//! Daily rate management: draft upsert, publication, and the board listing.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use satang_db::repositories::{AuditRecord, RateItem, RateRepository};
use satang_shared::Capability;

use super::{conn, record_audit};
use crate::AppState;
use crate::error::ApiResult;
use crate::middleware::auth::AuthUser;

#[derive(Debug, Deserialize)]
struct ListQuery {
    /// Defaults to today.
    date: Option<NaiveDate>,
    /// When false, drafts are included; requires the rate capability.
    #[serde(default = "default_published_only")]
    published_only: bool,
}

const fn default_published_only() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct RateItemBody {
    currency: String,
    buy_rate: Decimal,
    sell_rate: Decimal,
    sort_order: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct UpsertBody {
    date: Option<NaiveDate>,
    items: Vec<RateItemBody>,
}

#[derive(Debug, Deserialize)]
struct PublishBody {
    date: Option<NaiveDate>,
}

async fn list_rates(
    State(state): State<AppState>,
    user: AuthUser,
    Path(branch_id): Path<Uuid>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    user.require_branch(branch_id)?;
    let published_only = if user.can(Capability::RateManage) {
        query.published_only
    } else {
        true
    };
    let date = query.date.unwrap_or_else(|| Utc::now().date_naive());
    let rows = RateRepository::new(conn(&state))
        .for_date(branch_id, date, published_only)
        .await?;
    Ok(Json(json!({ "date": date, "rates": rows })))
}

async fn upsert_rates(
    State(state): State<AppState>,
    user: AuthUser,
    Path(branch_id): Path<Uuid>,
    Json(body): Json<UpsertBody>,
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    user.require(Capability::RateManage)?;
    user.require_branch(branch_id)?;

    let date = body.date.unwrap_or_else(|| Utc::now().date_naive());
    let items: Vec<RateItem> = body
        .items
        .into_iter()
        .map(|item| RateItem {
            currency: item.currency,
            buy_rate: item.buy_rate,
            sell_rate: item.sell_rate,
            sort_order: item.sort_order,
        })
        .collect();
    RateRepository::new(conn(&state))
        .upsert(branch_id, date, user.operator_id(), &items)
        .await?;

    record_audit(
        &state,
        AuditRecord {
            branch_id: Some(branch_id),
            operator_id: Some(user.operator_id()),
            action: "rates.upsert".to_string(),
            entity: Some("rates".to_string()),
            entity_id: Some(date.to_string()),
            detail: Some(json!({ "count": items.len() })),
        },
    )
    .await;

    Ok((
        StatusCode::OK,
        Json(json!({ "date": date, "updated": items.len() })),
    ))
}

async fn publish_rates(
    State(state): State<AppState>,
    user: AuthUser,
    Path(branch_id): Path<Uuid>,
    Json(body): Json<PublishBody>,
) -> ApiResult<Json<serde_json::Value>> {
    user.require(Capability::RateManage)?;
    user.require_branch(branch_id)?;

    let date = body.date.unwrap_or_else(|| Utc::now().date_naive());
    let published = RateRepository::new(conn(&state))
        .publish(branch_id, date, user.operator_id())
        .await?;

    record_audit(
        &state,
        AuditRecord {
            branch_id: Some(branch_id),
            operator_id: Some(user.operator_id()),
            action: "rates.publish".to_string(),
            entity: Some("rates".to_string()),
            entity_id: Some(date.to_string()),
            detail: Some(json!({ "published": published })),
        },
    )
    .await;

    Ok(Json(json!({ "date": date, "published": published })))
}

/// Creates rate routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/branches/{branch_id}/rates", get(list_rates))
        .route("/branches/{branch_id}/rates", put(upsert_rates))
        .route("/branches/{branch_id}/rates/publish", post(publish_rates))
}
