//! Storage error types.

use thiserror::Error;

use satang_shared::AppError;

/// Storage operation errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// File not found in storage.
    #[error("file not found: {key}")]
    NotFound {
        /// Storage key that was not found.
        key: String,
    },

    /// Storage backend configuration error.
    #[error("storage configuration error: {0}")]
    Configuration(String),

    /// OpenDAL operation error.
    #[error("storage operation failed: {0}")]
    Operation(String),
}

impl StorageError {
    /// Create a configuration error.
    #[must_use]
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}

impl From<opendal::Error> for StorageError {
    fn from(err: opendal::Error) -> Self {
        match err.kind() {
            opendal::ErrorKind::NotFound => Self::NotFound {
                key: err.to_string(),
            },
            _ => Self::Operation(err.to_string()),
        }
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { .. } => Self::NotFound(err.to_string()),
            StorageError::Configuration(_) | StorageError::Operation(_) => {
                Self::PdfRenderFailed(err.to_string())
            }
        }
    }
}
