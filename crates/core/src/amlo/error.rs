//! AMLO pipeline errors.

use thiserror::Error;

use satang_shared::AppError;

use super::state::ReservationStatus;

/// Errors raised by the reservation lifecycle and the PDF pipeline.
#[derive(Debug, Error)]
pub enum AmloError {
    /// The requested lifecycle transition is not allowed.
    #[error("Reservation in state {from:?} cannot move to {to:?}")]
    InvalidTransition {
        /// Current status.
        from: ReservationStatus,
        /// Requested status.
        to: ReservationStatus,
    },

    /// Rejections must carry a reason.
    #[error("A rejection requires a reason")]
    MissingRejectionReason,

    /// Unknown report type code in input data.
    #[error("Unknown report type {0}")]
    UnknownReportType(String),

    /// The CSV field map could not be parsed.
    #[error("Field map parse failed: {0}")]
    FieldMapParse(#[from] csv::Error),

    /// A widget named by the field map has no value and no default.
    #[error("No value for widget {0}")]
    MissingFieldValue(String),
}

impl From<AmloError> for AppError {
    fn from(err: AmloError) -> Self {
        match err {
            AmloError::InvalidTransition { .. } => Self::ValidationFailed(err.to_string()),
            AmloError::MissingRejectionReason | AmloError::UnknownReportType(_) => {
                Self::ValidationFailed(err.to_string())
            }
            AmloError::FieldMapParse(_) | AmloError::MissingFieldValue(_) => {
                Self::PdfRenderFailed(err.to_string())
            }
        }
    }
}
