//! Period controller errors.

use thiserror::Error;

use satang_shared::AppError;

/// Errors raised by state transitions and the mutation gate.
#[derive(Debug, Error)]
pub enum PeriodError {
    /// Branch has not completed initial setup.
    #[error("Branch has not completed initial setup")]
    NotInitialized,

    /// Branch is locked for EOD and the operator has no override.
    #[error("Branch is locked for end-of-day processing")]
    Locked,

    /// An EOD is already running for this branch.
    #[error("An end-of-day settlement is already in progress")]
    EodAlreadyRunning,

    /// Branch is not in a state that allows starting EOD.
    #[error("Branch must be open to start end-of-day settlement")]
    NotOpen,
}

impl From<PeriodError> for AppError {
    fn from(err: PeriodError) -> Self {
        match err {
            PeriodError::NotInitialized => Self::ValidationFailed(err.to_string()),
            PeriodError::Locked => Self::BusinessLocked(err.to_string()),
            PeriodError::EodAlreadyRunning => Self::ConcurrentEod(err.to_string()),
            PeriodError::NotOpen => Self::ValidationFailed(err.to_string()),
        }
    }
}
