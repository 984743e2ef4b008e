//! AMLO compliance routes: reservation lifecycle, overdue tracking,
//! batch submission, and regulator form rendering.

use std::collections::BTreeMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use satang_core::amlo::{
    fill_report, map_fields, AuditAction, FieldMap, ReportType, Reservation,
};
use satang_db::convert::{parse_direction, parse_report_type, parse_reservation_status};
use satang_db::entities::amlo_reservations;
use satang_db::repositories::{AmloRepository, AuditRecord, CreateReservationInput};
use satang_shared::types::{
    BranchId, LedgerEntryId, OperatorId, PageRequest, ReservationId,
};
use satang_shared::{AppError, AppResult, Capability};

use super::{conn, record_audit};
use crate::document::encode_fill_ops;
use crate::error::{soft_warning, ApiResult};
use crate::middleware::auth::AuthUser;
use crate::AppState;

/// Field-map CSV shipped alongside the form templates.
const FIELD_MAP_KEY: &str = "fieldmap.csv";

#[derive(Debug, Deserialize)]
struct CreateBody {
    customer_name: String,
    customer_id: String,
    amount: Decimal,
    currency: String,
    direction: satang_core::ledger::TradeDirection,
    /// Regulator form code, e.g. `AMLO-1-01`.
    report_type: String,
    #[serde(default)]
    form_data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    page: Option<u32>,
    per_page: Option<u32>,
    status: Option<String>,
}

impl ListQuery {
    fn page_request(&self) -> PageRequest {
        let defaults = PageRequest::default();
        PageRequest {
            page: self.page.unwrap_or(defaults.page),
            per_page: self.per_page.unwrap_or(defaults.per_page),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AuditBody {
    /// `approve` or `reject`.
    action: AuditAction,
    rejection_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompleteBody {
    linked_transaction_id: Uuid,
}

#[derive(Debug, Deserialize)]
struct CustomerCheckQuery {
    customer_id: String,
}

#[derive(Debug, Deserialize)]
struct OverdueQuery {
    branch_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
struct SubmitBody {
    report_ids: Vec<Uuid>,
}

fn parse_type(code: &str) -> Result<ReportType, AppError> {
    ReportType::parse(code).map_err(|e| AppError::ValidationFailed(e.to_string()))
}

/// Rebuilds the domain reservation from its persisted row.
fn domain_reservation(model: &amlo_reservations::Model) -> AppResult<Reservation> {
    let direction = parse_direction(&model.direction).ok_or_else(|| {
        AppError::InternalFailure(format!("unknown direction {:?}", model.direction))
    })?;
    let report_type = parse_report_type(&model.report_type).ok_or_else(|| {
        AppError::InternalFailure(format!("unknown report type {:?}", model.report_type))
    })?;
    let status = parse_reservation_status(&model.status).ok_or_else(|| {
        AppError::InternalFailure(format!("unknown reservation status {:?}", model.status))
    })?;
    Ok(Reservation {
        id: ReservationId::from_uuid(model.id),
        reservation_no: model.reservation_no.clone(),
        branch_id: BranchId::from_uuid(model.branch_id),
        customer_name: model.customer_name.clone(),
        customer_id: model.customer_id.clone(),
        amount: model.amount,
        currency: model.currency.clone(),
        direction,
        report_type,
        status,
        rejection_reason: model.rejection_reason.clone(),
        audited_by: model.audited_by.map(OperatorId::from_uuid),
        created_by: OperatorId::from_uuid(model.created_by),
        linked_transaction_id: model.linked_transaction_id.map(LedgerEntryId::from_uuid),
        form_data: model.form_data.clone(),
        created_at: model.created_at.to_utc(),
    })
}

async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    Path(branch_id): Path<Uuid>,
    Json(body): Json<CreateBody>,
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    user.require(Capability::TransactionExecute)?;
    user.require_branch(branch_id)?;

    let report_type = parse_type(&body.report_type)?;
    let reservation = AmloRepository::new(conn(&state))
        .create(
            &state.config.amlo.institution_code,
            CreateReservationInput {
                branch_id,
                created_by: user.operator_id(),
                customer_name: body.customer_name,
                customer_id: body.customer_id,
                amount: body.amount,
                currency: body.currency,
                direction: body.direction,
                report_type,
                form_data: body.form_data,
            },
        )
        .await?;

    record_audit(
        &state,
        AuditRecord {
            branch_id: Some(branch_id),
            operator_id: Some(user.operator_id()),
            action: "amlo.reserve".to_string(),
            entity: Some("amlo_reservation".to_string()),
            entity_id: Some(reservation.reservation_no.clone()),
            detail: None,
        },
    )
    .await;

    Ok((StatusCode::CREATED, Json(json!({ "reservation": reservation }))))
}

async fn list(
    State(state): State<AppState>,
    user: AuthUser,
    Path(branch_id): Path<Uuid>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    user.require(Capability::ViewTransactions)?;
    user.require_branch(branch_id)?;

    let status = match query.status.as_deref() {
        Some(s) => Some(parse_reservation_status(s).ok_or_else(|| {
            AppError::ValidationFailed(format!("unknown reservation status {s:?}"))
        })?),
        None => None,
    };
    let page = AmloRepository::new(conn(&state))
        .list(branch_id, status, &query.page_request())
        .await?;
    Ok(Json(json!({ "data": page.data, "meta": page.meta })))
}

async fn get_one(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    user.require(Capability::ViewTransactions)?;
    let reservation = AmloRepository::new(conn(&state)).get(id).await?;
    user.require_branch(reservation.branch_id)?;
    Ok(Json(json!({ "reservation": reservation })))
}

async fn audit(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<AuditBody>,
) -> ApiResult<Json<serde_json::Value>> {
    user.require(Capability::AmloReservationAudit)?;
    let repo = AmloRepository::new(conn(&state));
    let existing = repo.get(id).await?;
    user.require_branch(existing.branch_id)?;

    let updated = repo
        .audit(
            id,
            body.action,
            body.rejection_reason.as_deref(),
            user.operator_id(),
        )
        .await?;

    record_audit(
        &state,
        AuditRecord {
            branch_id: Some(updated.branch_id),
            operator_id: Some(user.operator_id()),
            action: "amlo.audit".to_string(),
            entity: Some("amlo_reservation".to_string()),
            entity_id: Some(updated.reservation_no.clone()),
            detail: Some(json!({ "action": body.action })),
        },
    )
    .await;

    Ok(Json(json!({ "reservation": updated })))
}

async fn reverse_audit(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    user.require(Capability::AmloReservationAudit)?;
    let repo = AmloRepository::new(conn(&state));
    let existing = repo.get(id).await?;
    user.require_branch(existing.branch_id)?;

    let updated = repo.reverse_audit(id).await?;

    record_audit(
        &state,
        AuditRecord {
            branch_id: Some(updated.branch_id),
            operator_id: Some(user.operator_id()),
            action: "amlo.reverse_audit".to_string(),
            entity: Some("amlo_reservation".to_string()),
            entity_id: Some(updated.reservation_no.clone()),
            detail: None,
        },
    )
    .await;

    Ok(Json(json!({ "reservation": updated })))
}

async fn complete(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<CompleteBody>,
) -> ApiResult<Json<serde_json::Value>> {
    user.require(Capability::TransactionExecute)?;
    let repo = AmloRepository::new(conn(&state));
    let existing = repo.get(id).await?;
    user.require_branch(existing.branch_id)?;

    let updated = repo.complete(id, body.linked_transaction_id).await?;
    Ok(Json(json!({ "reservation": updated })))
}

/// The counter pre-fills from the open reservation when one exists; a
/// bare boolean rides along for the block check.
fn customer_check_payload(open: Option<amlo_reservations::Model>) -> serde_json::Value {
    json!({
        "has_open_reservation": open.is_some(),
        "reservation": open,
    })
}

async fn customer_check(
    State(state): State<AppState>,
    user: AuthUser,
    Path(branch_id): Path<Uuid>,
    Query(query): Query<CustomerCheckQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    user.require(Capability::TransactionExecute)?;
    user.require_branch(branch_id)?;

    let open = AmloRepository::new(conn(&state))
        .open_reservation(branch_id, &query.customer_id)
        .await?;
    Ok(Json(customer_check_payload(open)))
}

async fn overdue(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<OverdueQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    user.require(Capability::AmloReportSubmit)?;
    let branch_id = query.branch_id.unwrap_or_else(|| user.branch_id());
    user.require_branch(branch_id)?;

    let rows = AmloRepository::new(conn(&state))
        .overdue(Some(branch_id))
        .await?;
    let rows: Vec<serde_json::Value> = rows
        .into_iter()
        .map(|row| {
            json!({
                "report": row.report,
                "reservation_no": row.reservation.reservation_no,
                "customer_name": row.reservation.customer_name,
                "age_days": row.age_days,
                "class": row.class,
            })
        })
        .collect();
    Ok(Json(json!({ "overdue": rows })))
}

async fn submit(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<SubmitBody>,
) -> ApiResult<Json<serde_json::Value>> {
    user.require(Capability::AmloReportSubmit)?;

    let outcomes = AmloRepository::new(conn(&state))
        .mark_reported(&body.report_ids, user.operator_id())
        .await?;
    let outcomes: Vec<serde_json::Value> = outcomes
        .into_iter()
        .map(|o| json!({ "report_id": o.report_id, "skipped": o.skipped }))
        .collect();

    record_audit(
        &state,
        AuditRecord {
            branch_id: Some(user.branch_id()),
            operator_id: Some(user.operator_id()),
            action: "amlo.submit".to_string(),
            entity: Some("amlo_report".to_string()),
            entity_id: None,
            detail: Some(json!({ "count": outcomes.len() })),
        },
    )
    .await;

    Ok(Json(json!({ "outcomes": outcomes })))
}

/// Fills the regulator form into the report tree and returns the filename.
async fn render_form(state: &AppState, report_id: Uuid) -> AppResult<String> {
    let repo = AmloRepository::new(conn(state));
    let report = repo.get_report(report_id).await?;
    let model = repo.get(report.reservation_id).await?;
    let reservation = domain_reservation(&model)?;

    let csv_bytes = state
        .templates
        .read(FIELD_MAP_KEY)
        .await
        .map_err(|e| AppError::PdfRenderFailed(e.to_string()))?;
    let map = FieldMap::load(reservation.report_type, &csv_bytes)
        .map_err(|e| AppError::PdfRenderFailed(e.to_string()))?;
    let values = map_fields(&reservation, &reservation.reservation_no);
    let ops = fill_report(
        reservation.report_type,
        &map,
        &values,
        &BTreeMap::new(),
        &BTreeMap::new(),
    )
    .map_err(|e| AppError::PdfRenderFailed(e.to_string()))?;

    let now = Utc::now().date_naive();
    let filename = format!("{}.pdf", reservation.reservation_no);
    let path = format!("reports/amlo/{}/{filename}", now.format("%Y/%m"));
    state
        .store
        .write_atomic(&path, encode_fill_ops(&ops))
        .await
        .map_err(|e| AppError::PdfRenderFailed(e.to_string()))?;
    repo.set_pdf_filename(report_id, &filename).await?;
    Ok(filename)
}

async fn render(
    State(state): State<AppState>,
    user: AuthUser,
    Path(report_id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    user.require(Capability::AmloReportSubmit)?;
    let repo = AmloRepository::new(conn(&state));
    let report = repo.get_report(report_id).await?;
    let reservation = repo.get(report.reservation_id).await?;
    user.require_branch(reservation.branch_id)?;

    match render_form(&state, report_id).await {
        Ok(filename) => Ok(Json(json!({ "pdf_filename": filename }))),
        Err(err) => {
            tracing::warn!(error = %err, report_id = %report_id, "form render failed");
            Ok(Json(json!({ "pdf_filename": null, "warning": soft_warning(&err) })))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use satang_core::amlo::ReservationStatus;
    use satang_core::ledger::TradeDirection;

    fn model() -> amlo_reservations::Model {
        amlo_reservations::Model {
            id: Uuid::now_v7(),
            reservation_no: "015-001-69-0001USD".to_string(),
            serial: 1,
            branch_id: Uuid::new_v4(),
            customer_name: "สมชาย".to_string(),
            customer_id: "1234567890123".to_string(),
            amount: dec!(2500000),
            currency: "USD".to_string(),
            direction: "branch_buys".to_string(),
            report_type: "AMLO-1-01".to_string(),
            status: "approved".to_string(),
            rejection_reason: None,
            audited_by: Some(Uuid::new_v4()),
            created_by: Uuid::new_v4(),
            linked_transaction_id: None,
            form_data: json!({ "maker_occupation": "merchant" }),
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    #[test]
    fn test_parse_type_accepts_regulator_codes() {
        assert_eq!(parse_type("AMLO-1-01").unwrap(), ReportType::Cash);
        assert_eq!(parse_type("AMLO-1-03").unwrap(), ReportType::Suspicious);
        assert!(parse_type("AMLO-9-99").is_err());
    }

    #[test]
    fn test_domain_reservation_maps_persisted_row() {
        let model = model();
        let reservation = domain_reservation(&model).unwrap();
        assert_eq!(reservation.reservation_no, model.reservation_no);
        assert_eq!(reservation.direction, TradeDirection::BranchBuys);
        assert_eq!(reservation.report_type, ReportType::Cash);
        assert_eq!(reservation.status, ReservationStatus::Approved);
        assert_eq!(reservation.amount, dec!(2500000));
    }

    #[test]
    fn test_domain_reservation_rejects_unknown_status() {
        let mut model = model();
        model.status = "limbo".to_string();
        assert!(domain_reservation(&model).is_err());
    }

    #[test]
    fn test_customer_check_returns_the_open_reservation() {
        let payload = customer_check_payload(Some(model()));
        assert_eq!(payload["has_open_reservation"], json!(true));
        assert_eq!(
            payload["reservation"]["reservation_no"],
            json!("015-001-69-0001USD")
        );
        assert_eq!(payload["reservation"]["customer_name"], json!("สมชาย"));

        let payload = customer_check_payload(None);
        assert_eq!(payload["has_open_reservation"], json!(false));
        assert!(payload["reservation"].is_null());
    }
}

/// Creates AMLO routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/branches/{branch_id}/amlo/reservations",
            post(create).get(list),
        )
        .route(
            "/branches/{branch_id}/amlo/customer-check",
            get(customer_check),
        )
        .route("/amlo/reservations/{id}", get(get_one))
        .route("/amlo/reservations/{id}/audit", post(audit))
        .route("/amlo/reservations/{id}/reverse-audit", post(reverse_audit))
        .route("/amlo/reservations/{id}/complete", post(complete))
        .route("/amlo/overdue", get(overdue))
        .route("/amlo/reports/submit", post(submit))
        .route("/amlo/reports/{report_id}/render", post(render))
}
