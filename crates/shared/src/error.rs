//! Application-wide error taxonomy.
//!
//! Every error surfaced to callers maps onto one of these kinds so the
//! HTTP layer, the receipts, and the audit log all speak the same language.

use thiserror::Error;

/// Result type alias using `AppError`.
pub type AppResult<T> = Result<T, AppError>;

/// Application error kinds.
#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed input; the operation never started.
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// Referenced entity (branch, currency, transaction, reservation) absent.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller is not authenticated.
    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    /// Caller lacks the required capability or cross-branch access.
    #[error("Access denied: {0}")]
    Forbidden(String),

    /// Branch is mid-EOD and the operation needs an unlocked state.
    #[error("Branch is locked for end-of-day processing: {0}")]
    BusinessLocked(String),

    /// Required funds exceed the available balance (foreign or base).
    #[error("Balance insufficient: {0}")]
    BalanceInsufficient(String),

    /// An initial balance already exists for the (branch, currency) pair.
    #[error("Already initialized: {0}")]
    AlreadyInitialized(String),

    /// A reversal already exists for the target transaction.
    #[error("Already reversed: {0}")]
    AlreadyReversed(String),

    /// Target transaction lies inside a completed EOD window.
    #[error("Cannot reverse across a settled period: {0}")]
    CrossPeriodReversal(String),

    /// A non-terminal EOD workflow already exists for the branch.
    #[error("End-of-day already in progress: {0}")]
    ConcurrentEod(String),

    /// No rate published for the requested (branch, currency, date).
    #[error("No rate published: {0}")]
    RateMissing(String),

    /// Receipt/AMLO render failed after the business operation succeeded.
    #[error("PDF rendering failed: {0}")]
    PdfRenderFailed(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// Unexpected condition; safe generic message to the caller.
    #[error("Internal error: {0}")]
    InternalFailure(String),
}

impl AppError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::ValidationFailed(_) | Self::RateMissing(_) => 400,
            Self::Unauthorized(_) => 401,
            Self::Forbidden(_) => 403,
            Self::NotFound(_) => 404,
            Self::ConcurrentEod(_) => 409,
            Self::BusinessLocked(_)
            | Self::BalanceInsufficient(_)
            | Self::AlreadyInitialized(_)
            | Self::AlreadyReversed(_)
            | Self::CrossPeriodReversal(_) => 422,
            Self::PdfRenderFailed(_) | Self::Database(_) | Self::InternalFailure(_) => 500,
        }
    }

    /// Returns the stable error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::ValidationFailed(_) => "VALIDATION_FAILED",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::BusinessLocked(_) => "BUSINESS_LOCKED",
            Self::BalanceInsufficient(_) => "BALANCE_INSUFFICIENT",
            Self::AlreadyInitialized(_) => "ALREADY_INITIALIZED",
            Self::AlreadyReversed(_) => "ALREADY_REVERSED",
            Self::CrossPeriodReversal(_) => "CROSS_PERIOD_REVERSAL",
            Self::ConcurrentEod(_) => "CONCURRENT_EOD",
            Self::RateMissing(_) => "RATE_MISSING",
            Self::PdfRenderFailed(_) => "PDF_RENDER_FAILED",
            Self::Database(_) => "DATABASE_ERROR",
            Self::InternalFailure(_) => "INTERNAL_FAILURE",
        }
    }

    /// Returns true when the failure occurred after a successful business
    /// commit and must be surfaced as a warning rather than an error.
    #[must_use]
    pub const fn is_soft(&self) -> bool {
        matches!(self, Self::PdfRenderFailed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::ValidationFailed(String::new()).status_code(), 400);
        assert_eq!(AppError::Unauthorized(String::new()).status_code(), 401);
        assert_eq!(AppError::Forbidden(String::new()).status_code(), 403);
        assert_eq!(AppError::NotFound(String::new()).status_code(), 404);
        assert_eq!(AppError::ConcurrentEod(String::new()).status_code(), 409);
        assert_eq!(AppError::BusinessLocked(String::new()).status_code(), 422);
        assert_eq!(
            AppError::BalanceInsufficient(String::new()).status_code(),
            422
        );
        assert_eq!(
            AppError::CrossPeriodReversal(String::new()).status_code(),
            422
        );
        assert_eq!(AppError::RateMissing(String::new()).status_code(), 400);
        assert_eq!(AppError::PdfRenderFailed(String::new()).status_code(), 500);
        assert_eq!(AppError::InternalFailure(String::new()).status_code(), 500);
    }

    #[test]
    fn test_error_codes_are_stable() {
        assert_eq!(
            AppError::BusinessLocked(String::new()).error_code(),
            "BUSINESS_LOCKED"
        );
        assert_eq!(
            AppError::AlreadyReversed(String::new()).error_code(),
            "ALREADY_REVERSED"
        );
        assert_eq!(
            AppError::CrossPeriodReversal(String::new()).error_code(),
            "CROSS_PERIOD_REVERSAL"
        );
        assert_eq!(
            AppError::ConcurrentEod(String::new()).error_code(),
            "CONCURRENT_EOD"
        );
    }

    #[test]
    fn test_soft_errors() {
        assert!(AppError::PdfRenderFailed(String::new()).is_soft());
        assert!(!AppError::BalanceInsufficient(String::new()).is_soft());
        assert!(!AppError::Database(String::new()).is_soft());
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            AppError::BalanceInsufficient("USD short 50".into()).to_string(),
            "Balance insufficient: USD short 50"
        );
        assert_eq!(
            AppError::RateMissing("USD on 2026-01-15".into()).to_string(),
            "No rate published: USD on 2026-01-15"
        );
    }
}
