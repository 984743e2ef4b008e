//! Exchange transactions: quoting, execution, reversal, history, receipts.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use satang_core::ledger::{quote_check, LedgerEntry, TradeDirection};
use satang_core::receipt::{
    group_receipt_filename, receipt_filename, receipt_path, render_exchange_receipt,
    render_reversal_receipt,
};
use satang_db::repositories::{
    AuditRecord, BalanceRepository, BranchRepository, DualLineInput, ExchangeInput,
    ExchangeService, LedgerFilter, LedgerRepository, RateRepository,
};
use satang_shared::types::PageRequest;
use satang_shared::{AppError, AppResult, Capability};

use super::{conn, record_audit};
use crate::document::StreamCanvas;
use crate::error::{soft_warning, ApiResult};
use crate::middleware::auth::AuthUser;
use crate::AppState;

/// Label keys pass through unchanged; the i18n table is a print-service
/// collaborator.
fn translate(key: &str) -> String {
    key.to_string()
}

#[derive(Debug, Deserialize)]
struct QuoteBody {
    currency: String,
    direction: TradeDirection,
    foreign_amount: Decimal,
}

#[derive(Debug, Deserialize)]
struct ExchangeBody {
    currency: String,
    direction: TradeDirection,
    foreign_amount: Decimal,
    customer_name: Option<String>,
    customer_id: Option<String>,
    purpose: Option<String>,
    remarks: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DualLineBody {
    currency: String,
    direction: TradeDirection,
    foreign_amount: Decimal,
}

#[derive(Debug, Deserialize)]
struct DualBody {
    lines: Vec<DualLineBody>,
    customer_name: Option<String>,
    customer_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    page: Option<u32>,
    per_page: Option<u32>,
    currency: Option<String>,
    entry_type: Option<String>,
    date_from: Option<NaiveDate>,
    date_to: Option<NaiveDate>,
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

/// Post-commit receipt pipeline: render, store atomically, record the
/// filename on every entry. Failures here never roll back the trade; the
/// caller attaches them as a warning on the success response.
async fn receipt_pipeline(
    state: &AppState,
    branch_id: Uuid,
    entries: &[LedgerEntry],
    filename: &str,
) -> AppResult<()> {
    let first = entries
        .first()
        .ok_or_else(|| AppError::PdfRenderFailed("no entries to render".to_string()))?;
    let branch = BranchRepository::new(conn(state)).get(branch_id).await?;

    let mut canvas = StreamCanvas::new();
    render_exchange_receipt(&mut canvas, entries, &branch.name, &translate)
        .map_err(|e| AppError::PdfRenderFailed(e.to_string()))?;
    let path = receipt_path(first.transaction_date, filename);
    state
        .store
        .write_atomic(&path, canvas.into_bytes())
        .await
        .map_err(|e| AppError::PdfRenderFailed(e.to_string()))?;

    let ledger = LedgerRepository::new(conn(state));
    for entry in entries {
        ledger
            .set_receipt_filename(entry.id.into_inner(), filename)
            .await?;
    }
    Ok(())
}

async fn reversal_receipt_pipeline(
    state: &AppState,
    branch_id: Uuid,
    entry: &LedgerEntry,
    filename: &str,
) -> AppResult<()> {
    let branch = BranchRepository::new(conn(state)).get(branch_id).await?;

    let mut canvas = StreamCanvas::new();
    render_reversal_receipt(&mut canvas, entry, &branch.name, &translate)
        .map_err(|e| AppError::PdfRenderFailed(e.to_string()))?;
    let path = receipt_path(entry.transaction_date, filename);
    state
        .store
        .write_atomic(&path, canvas.into_bytes())
        .await
        .map_err(|e| AppError::PdfRenderFailed(e.to_string()))?;

    LedgerRepository::new(conn(state))
        .set_receipt_filename(entry.id.into_inner(), filename)
        .await
}

async fn quote(
    State(state): State<AppState>,
    user: AuthUser,
    Path(branch_id): Path<Uuid>,
    Json(body): Json<QuoteBody>,
) -> ApiResult<Json<serde_json::Value>> {
    user.require(Capability::TransactionExecute)?;
    user.require_branch(branch_id)?;

    let status = BranchRepository::new(conn(&state)).status(branch_id).await?;
    let base_currency = status.branch.base_currency;
    let today = Utc::now().date_naive();

    let rate_row = RateRepository::new(conn(&state))
        .published_rate(branch_id, &body.currency, today)
        .await?
        .ok_or_else(|| AppError::RateMissing(format!("{} on {today}", body.currency)))?;
    let rate = match body.direction {
        TradeDirection::BranchBuys => rate_row.buy_rate,
        TradeDirection::BranchSells => rate_row.sell_rate,
    };

    // A stale balance read is acceptable here; execution re-reads under lock.
    let balances = BalanceRepository::new(conn(&state));
    let foreign_balance = balances.get(branch_id, &body.currency).await?;
    let base_balance = balances.get(branch_id, &base_currency).await?;

    let outcome = quote_check(
        &body.currency,
        body.direction,
        body.foreign_amount,
        rate,
        foreign_balance,
        base_balance,
    )
    .map_err(AppError::from)?;

    Ok(Json(json!({
        "currency": body.currency,
        "direction": body.direction,
        "rate": outcome.rate,
        "local_amount": outcome.local_amount,
        "foreign_after": outcome.foreign_after,
        "base_after": outcome.base_after,
    })))
}

async fn execute(
    State(state): State<AppState>,
    user: AuthUser,
    Path(branch_id): Path<Uuid>,
    Json(body): Json<ExchangeBody>,
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    user.require(Capability::TransactionExecute)?;
    user.require_branch(branch_id)?;

    let outcome = ExchangeService::new(conn(&state))
        .execute_exchange(ExchangeInput {
            branch_id,
            operator_id: user.operator_id(),
            has_override: user.can(Capability::BalanceManage),
            currency: body.currency,
            direction: body.direction,
            foreign_amount: body.foreign_amount,
            customer_name: body.customer_name,
            customer_id: body.customer_id,
            purpose: body.purpose,
            remarks: body.remarks,
        })
        .await?;

    let filename = receipt_filename(&outcome.entry.transaction_no, user.0.preferred_language);
    let entries = std::slice::from_ref(&outcome.entry);
    let warning = match receipt_pipeline(&state, branch_id, entries, &filename).await {
        Ok(()) => None,
        Err(err) => {
            tracing::warn!(error = %err, transaction_no = %outcome.entry.transaction_no,
                "receipt pipeline failed after commit");
            Some(soft_warning(&err))
        }
    };

    record_audit(
        &state,
        AuditRecord {
            branch_id: Some(branch_id),
            operator_id: Some(user.operator_id()),
            action: "transactions.execute".to_string(),
            entity: Some("ledger_entry".to_string()),
            entity_id: Some(outcome.entry.transaction_no.clone()),
            detail: Some(json!({ "bot_flagged": outcome.bot_flagged })),
        },
    )
    .await;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "entry": outcome.entry,
            "bot_flagged": outcome.bot_flagged,
            "receipt_filename": filename,
            "warning": warning,
        })),
    ))
}

async fn execute_dual(
    State(state): State<AppState>,
    user: AuthUser,
    Path(branch_id): Path<Uuid>,
    Json(body): Json<DualBody>,
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    user.require(Capability::TransactionExecute)?;
    user.require_branch(branch_id)?;

    let lines: Vec<DualLineInput> = body
        .lines
        .into_iter()
        .map(|line| DualLineInput {
            currency: line.currency,
            direction: line.direction,
            foreign_amount: line.foreign_amount,
        })
        .collect();
    let (entries, group_id) = ExchangeService::new(conn(&state))
        .execute_dual_direction(
            branch_id,
            user.operator_id(),
            user.can(Capability::BalanceManage),
            &lines,
            body.customer_name,
            body.customer_id,
        )
        .await?;

    let first_no = entries
        .first()
        .map(|e| e.transaction_no.clone())
        .unwrap_or_default();
    let filename = group_receipt_filename(&first_no);
    let warning = match receipt_pipeline(&state, branch_id, &entries, &filename).await {
        Ok(()) => None,
        Err(err) => {
            tracing::warn!(error = %err, business_group_id = %group_id,
                "receipt pipeline failed after commit");
            Some(soft_warning(&err))
        }
    };

    record_audit(
        &state,
        AuditRecord {
            branch_id: Some(branch_id),
            operator_id: Some(user.operator_id()),
            action: "transactions.dual_direction".to_string(),
            entity: Some("business_group".to_string()),
            entity_id: Some(group_id.to_string()),
            detail: Some(json!({ "entries": entries.len() })),
        },
    )
    .await;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "entries": entries,
            "business_group_id": group_id,
            "receipt_filename": filename,
            "warning": warning,
        })),
    ))
}

async fn reverse(
    State(state): State<AppState>,
    user: AuthUser,
    Path((branch_id, transaction_no)): Path<(Uuid, String)>,
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    user.require(Capability::ReverseTransaction)?;
    user.require_branch(branch_id)?;

    let entry = ExchangeService::new(conn(&state))
        .reverse(
            branch_id,
            user.operator_id(),
            user.can(Capability::BalanceManage),
            &transaction_no,
        )
        .await?;

    let filename = receipt_filename(&entry.transaction_no, user.0.preferred_language);
    let warning = match reversal_receipt_pipeline(&state, branch_id, &entry, &filename).await {
        Ok(()) => None,
        Err(err) => {
            tracing::warn!(error = %err, transaction_no = %entry.transaction_no,
                "receipt pipeline failed after commit");
            Some(soft_warning(&err))
        }
    };

    record_audit(
        &state,
        AuditRecord {
            branch_id: Some(branch_id),
            operator_id: Some(user.operator_id()),
            action: "transactions.reverse".to_string(),
            entity: Some("ledger_entry".to_string()),
            entity_id: Some(entry.transaction_no.clone()),
            detail: Some(json!({ "original": transaction_no })),
        },
    )
    .await;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "entry": entry,
            "receipt_filename": filename,
            "warning": warning,
        })),
    ))
}

async fn list(
    State(state): State<AppState>,
    user: AuthUser,
    Path(branch_id): Path<Uuid>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    user.require(Capability::ViewTransactions)?;
    user.require_branch(branch_id)?;

    let page_request = query.page_request();
    let filter = LedgerFilter {
        currency: query.currency,
        entry_type: query.entry_type,
        date_from: query.date_from,
        date_to: query.date_to,
    };
    let page = LedgerRepository::new(conn(&state))
        .list(branch_id, &filter, &page_request)
        .await?;
    Ok(Json(json!({ "data": page.data, "meta": page.meta })))
}

async fn get_one(
    State(state): State<AppState>,
    user: AuthUser,
    Path((branch_id, transaction_no)): Path<(Uuid, String)>,
) -> ApiResult<Json<serde_json::Value>> {
    user.require(Capability::ViewTransactions)?;
    user.require_branch(branch_id)?;

    let ledger = LedgerRepository::new(conn(&state));
    let entry = ledger
        .find_by_transaction_no(branch_id, &transaction_no)
        .await?;
    let group = match entry.business_group_id {
        Some(group_id) => {
            ledger
                .entries_in_group(branch_id, group_id.into_inner())
                .await?
        }
        None => Vec::new(),
    };
    Ok(Json(json!({ "entry": entry, "group": group })))
}

/// Re-renders the receipt and bumps the print counter.
async fn reprint_receipt(
    State(state): State<AppState>,
    user: AuthUser,
    Path((branch_id, transaction_no)): Path<(Uuid, String)>,
) -> ApiResult<Json<serde_json::Value>> {
    user.require(Capability::ViewTransactions)?;
    user.require_branch(branch_id)?;

    let ledger = LedgerRepository::new(conn(&state));
    let entry = ledger
        .find_by_transaction_no(branch_id, &transaction_no)
        .await?;

    let (entries, filename) = match entry.business_group_id {
        Some(group_id) => {
            let group = ledger
                .entries_in_group(branch_id, group_id.into_inner())
                .await?;
            let first_no = group
                .first()
                .map(|e| e.transaction_no.clone())
                .unwrap_or_else(|| entry.transaction_no.clone());
            (group, group_receipt_filename(&first_no))
        }
        None => {
            let filename = receipt_filename(&entry.transaction_no, user.0.preferred_language);
            (vec![entry.clone()], filename)
        }
    };
    receipt_pipeline(&state, branch_id, &entries, &filename).await?;
    let print_count = ledger.bump_print_count(entry.id.into_inner()).await?;

    Ok(Json(json!({
        "receipt_filename": filename,
        "print_count": print_count,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_query_defaults() {
        let query = ListQuery {
            page: None,
            per_page: None,
            currency: None,
            entry_type: None,
            date_from: None,
            date_to: None,
        };
        let page = query.page_request();
        assert_eq!(page.page, 1);
        assert_eq!(page.per_page, 20);
    }

    #[test]
    fn test_list_query_explicit_page() {
        let query = ListQuery {
            page: Some(3),
            per_page: Some(50),
            currency: Some("USD".to_string()),
            entry_type: None,
            date_from: None,
            date_to: None,
        };
        let page = query.page_request();
        assert_eq!(page.offset(), 100);
        assert_eq!(page.limit(), 50);
    }

    #[test]
    fn test_translate_passes_keys_through() {
        assert_eq!(translate("receipt.title"), "receipt.title");
    }
}

/// Creates transaction routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/branches/{branch_id}/transactions/quote", post(quote))
        .route(
            "/branches/{branch_id}/transactions",
            post(execute).get(list),
        )
        .route(
            "/branches/{branch_id}/transactions/dual",
            post(execute_dual),
        )
        .route(
            "/branches/{branch_id}/transactions/{transaction_no}",
            get(get_one),
        )
        .route(
            "/branches/{branch_id}/transactions/{transaction_no}/reverse",
            post(reverse),
        )
        .route(
            "/branches/{branch_id}/transactions/{transaction_no}/receipt",
            post(reprint_receipt),
        )
}
