//! Authentication middleware for protected routes.

use axum::{
    Json,
    extract::{FromRequestParts, Request, State},
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;
use uuid::Uuid;

use crate::AppState;
use crate::error::ApiError;
use satang_shared::{AppError, Capability, Claims, CurrentUser, JwtError};

/// Extracts the bearer token from the Authorization header.
fn extract_bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
}

/// Authentication middleware that validates JWT tokens.
///
/// This middleware:
/// 1. Extracts the Bearer token from the Authorization header
/// 2. Validates the token using the JWT service
/// 3. Stores the claims in request extensions for handlers to access
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let Some(token) = auth_header.and_then(extract_bearer_token) else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "error": "UNAUTHORIZED",
                "message": "Authorization header with Bearer token is required"
            })),
        )
            .into_response();
    };

    match state.jwt_service.validate_token(token) {
        Ok(claims) => {
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Err(e) => {
            let message = match e {
                JwtError::Expired => "Token has expired",
                _ => "Invalid or malformed token",
            };
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "UNAUTHORIZED", "message": message })),
            )
                .into_response()
        }
    }
}

/// Extractor for the authenticated operator.
///
/// Use this in handlers to get the operator resolved from the claims:
///
/// ```ignore
/// async fn handler(user: AuthUser) -> impl IntoResponse {
///     let branch = user.branch_id();
///     // ...
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser(pub CurrentUser);

impl AuthUser {
    /// Returns the operator id.
    #[must_use]
    pub fn operator_id(&self) -> Uuid {
        self.0.id.into_inner()
    }

    /// Returns the operator's branch id.
    #[must_use]
    pub fn branch_id(&self) -> Uuid {
        self.0.branch_id.into_inner()
    }

    /// Returns true if the operator holds the capability.
    #[must_use]
    pub fn can(&self, capability: Capability) -> bool {
        self.0.can(capability)
    }

    /// Fails with `Forbidden` unless the operator holds the capability.
    pub fn require(&self, capability: Capability) -> Result<(), ApiError> {
        if self.can(capability) {
            Ok(())
        } else {
            Err(ApiError(AppError::Forbidden(format!(
                "requires the {} capability",
                capability.as_str()
            ))))
        }
    }

    /// Fails with `Forbidden` unless the operator works at the branch.
    pub fn require_branch(&self, branch_id: Uuid) -> Result<(), ApiError> {
        if self.branch_id() == branch_id {
            Ok(())
        } else {
            Err(ApiError(AppError::Forbidden(
                "cross-branch access is not permitted".to_string(),
            )))
        }
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<serde_json::Value>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Claims>()
            .map(|claims| AuthUser(claims.current_user()))
            .ok_or_else(|| {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({
                        "error": "UNAUTHORIZED",
                        "message": "Authentication required"
                    })),
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use satang_shared::auth::user_from_claims;
    use satang_shared::Language;

    fn user(capabilities: &[&str]) -> AuthUser {
        let capabilities: Vec<String> = capabilities.iter().map(|s| (*s).to_string()).collect();
        AuthUser(user_from_claims(
            Uuid::new_v4(),
            Uuid::new_v4(),
            &capabilities,
            Language::Th,
        ))
    }

    #[test]
    fn test_bearer_extraction() {
        assert_eq!(extract_bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(extract_bearer_token("bearer abc"), Some("abc"));
        assert_eq!(extract_bearer_token("Basic abc"), None);
    }

    #[test]
    fn test_require_capability() {
        let teller = user(&["transaction_execute"]);
        assert!(teller.require(Capability::TransactionExecute).is_ok());
        assert!(teller.require(Capability::SystemManage).is_err());
    }

    #[test]
    fn test_require_branch_rejects_foreign_branch() {
        let teller = user(&[]);
        assert!(teller.require_branch(teller.branch_id()).is_ok());
        assert!(teller.require_branch(Uuid::new_v4()).is_err());
    }
}
