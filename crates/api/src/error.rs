//! The `AppError` → HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use satang_shared::AppError;

/// Wrapper that turns an [`AppError`] into a JSON error response.
///
/// The body carries the stable error code plus a human-readable message:
/// `{"error": "BALANCE_INSUFFICIENT", "message": "..."}`.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }
        let body = json!({
            "error": self.0.error_code(),
            "message": self.0.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

/// Result alias for handlers.
pub type ApiResult<T> = Result<T, ApiError>;

/// Serialized form of a soft failure that occurred after a successful
/// business commit. Attach it to a success response instead of failing.
#[must_use]
pub fn soft_warning(err: &AppError) -> serde_json::Value {
    json!({
        "code": err.error_code(),
        "message": err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_maps_to_status_and_code() {
        let response =
            ApiError(AppError::BalanceInsufficient("USD short 50".into())).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_soft_warning_shape() {
        let warning = soft_warning(&AppError::PdfRenderFailed("font missing".into()));
        assert_eq!(warning["code"], "PDF_RENDER_FAILED");
        assert!(warning["message"].as_str().unwrap().contains("font missing"));
    }
}
