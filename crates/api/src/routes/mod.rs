//! API route definitions.

use axum::{Router, middleware};
use sea_orm::DatabaseConnection;

use crate::{AppState, middleware::auth::auth_middleware};
use satang_db::repositories::{AuditLogRepository, AuditRecord};

pub mod amlo;
pub mod audit;
pub mod balances;
pub mod eod;
pub mod health;
pub mod rates;
pub mod transactions;

/// Creates the API router with all routes.
#[allow(clippy::needless_pass_by_value)]
pub fn api_routes_with_state(state: AppState) -> Router<AppState> {
    // Everything except health requires a bearer token.
    let protected_routes = Router::new()
        .merge(rates::routes())
        .merge(balances::routes())
        .merge(transactions::routes())
        .merge(eod::routes())
        .merge(amlo::routes())
        .merge(audit::routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new().merge(health::routes()).merge(protected_routes)
}

/// Clones the shared connection for a repository.
pub(crate) fn conn(state: &AppState) -> DatabaseConnection {
    state.db.as_ref().clone()
}

/// Appends an audit event. Audit writes never fail the business operation
/// they describe.
pub(crate) async fn record_audit(state: &AppState, record: AuditRecord) {
    let repo = AuditLogRepository::new(conn(state));
    if let Err(err) = repo.record(record).await {
        tracing::warn!(error = %err, "audit write failed");
    }
}
