//! JWT token validation.
//!
//! Token issuance lives in the collaborator auth service; this module only
//! validates bearer tokens and exposes the claims the core depends on.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::auth::{CurrentUser, Language, user_from_claims};

/// JWT configuration.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Secret key for verifying tokens.
    pub secret: String,
    /// Access token expiration in minutes (used by test token issuance).
    pub access_token_expires_minutes: i64,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: "change-me-in-production".to_string(),
            access_token_expires_minutes: 15,
        }
    }
}

/// Errors that can occur during JWT operations.
#[derive(Debug, Error)]
pub enum JwtError {
    /// Token encoding failed.
    #[error("failed to encode token: {0}")]
    EncodingError(String),

    /// Token decoding failed.
    #[error("failed to decode token: {0}")]
    DecodingError(String),

    /// Token has expired.
    #[error("token has expired")]
    Expired,

    /// Token is invalid.
    #[error("invalid token")]
    Invalid,
}

/// Claims carried by an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Operator ID.
    pub sub: Uuid,
    /// Branch ID.
    pub branch_id: Uuid,
    /// Granted capability strings.
    pub capabilities: Vec<String>,
    /// Preferred language.
    #[serde(default)]
    pub language: Language,
    /// Expiration timestamp (seconds since epoch).
    pub exp: i64,
    /// Issued-at timestamp (seconds since epoch).
    pub iat: i64,
}

impl Claims {
    /// Creates claims for an operator at a branch.
    #[must_use]
    pub fn new(
        operator: Uuid,
        branch: Uuid,
        capabilities: Vec<String>,
        language: Language,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            sub: operator,
            branch_id: branch,
            capabilities,
            language,
            exp: expires_at.timestamp(),
            iat: Utc::now().timestamp(),
        }
    }

    /// Resolves the claims into the `CurrentUser` the core consumes.
    #[must_use]
    pub fn current_user(&self) -> CurrentUser {
        user_from_claims(self.sub, self.branch_id, &self.capabilities, self.language)
    }
}

/// JWT service for token operations.
#[derive(Clone)]
pub struct JwtService {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl std::fmt::Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService")
            .field("config", &"[hidden]")
            .finish()
    }
}

impl JwtService {
    /// Creates a new JWT service with the given configuration.
    #[must_use]
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());
        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    /// Generates an access token. Used by fixtures and the dev login shim.
    pub fn generate_access_token(
        &self,
        operator: Uuid,
        branch: Uuid,
        capabilities: Vec<String>,
        language: Language,
    ) -> Result<String, JwtError> {
        let expires_at = Utc::now() + Duration::minutes(self.config.access_token_expires_minutes);
        let claims = Claims::new(operator, branch, capabilities, language, expires_at);

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| JwtError::EncodingError(e.to_string()))
    }

    /// Validates and decodes a token.
    ///
    /// # Errors
    ///
    /// Returns `JwtError::Expired` if the token has expired.
    /// Returns `JwtError::DecodingError` if the token is malformed.
    pub fn validate_token(&self, token: &str) -> Result<Claims, JwtError> {
        let validation = Validation::default();

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
                _ => JwtError::DecodingError(e.to_string()),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Capability;

    fn service() -> JwtService {
        JwtService::new(JwtConfig {
            secret: "test-secret".to_string(),
            access_token_expires_minutes: 15,
        })
    }

    #[test]
    fn test_token_round_trip() {
        let svc = service();
        let operator = Uuid::new_v4();
        let branch = Uuid::new_v4();
        let token = svc
            .generate_access_token(
                operator,
                branch,
                vec!["transaction_execute".to_string()],
                Language::Th,
            )
            .unwrap();

        let claims = svc.validate_token(&token).unwrap();
        assert_eq!(claims.sub, operator);
        assert_eq!(claims.branch_id, branch);

        let user = claims.current_user();
        assert!(user.can(Capability::TransactionExecute));
        assert_eq!(user.preferred_language, Language::Th);
    }

    #[test]
    fn test_invalid_token_rejected() {
        let svc = service();
        assert!(matches!(
            svc.validate_token("not.a.token"),
            Err(JwtError::DecodingError(_))
        ));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = service()
            .generate_access_token(Uuid::new_v4(), Uuid::new_v4(), vec![], Language::En)
            .unwrap();
        let other = JwtService::new(JwtConfig {
            secret: "different".to_string(),
            access_token_expires_minutes: 15,
        });
        assert!(other.validate_token(&token).is_err());
    }
}
