//! EOD pipeline errors.

use thiserror::Error;

use satang_shared::AppError;

use super::phase::EodPhase;

/// Errors raised while advancing the settlement pipeline.
#[derive(Debug, Error)]
pub enum EodError {
    /// A step was requested out of order.
    #[error("Cannot run step {requested} while the settlement is at step {current}")]
    StepOutOfOrder {
        /// Step the EOD currently sits on.
        current: EodPhase,
        /// Step the caller asked for.
        requested: EodPhase,
    },

    /// The settlement has already completed.
    #[error("Settlement is already completed")]
    AlreadyCompleted,

    /// The settlement was cancelled.
    #[error("Settlement was cancelled")]
    Cancelled,

    /// A verification row is missing for a currency that must be counted.
    #[error("No physical count entered for {0}")]
    MissingCount(String),

    /// A cash-out exceeds the verified balance.
    #[error("Cash-out of {currency} exceeds the counted balance")]
    CashOutExceedsBalance {
        /// Currency code.
        currency: String,
    },
}

impl From<EodError> for AppError {
    fn from(err: EodError) -> Self {
        match err {
            EodError::StepOutOfOrder { .. } | EodError::AlreadyCompleted | EodError::Cancelled => {
                Self::ConcurrentEod(err.to_string())
            }
            EodError::MissingCount(_) | EodError::CashOutExceedsBalance { .. } => {
                Self::ValidationFailed(err.to_string())
            }
        }
    }
}
