//! Error types for audiodev-core.

use crate::native::BackendError;
use crate::taxonomy::ErrorCode;
use thiserror::Error;

/// Error type for device and stream operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Rejected during negotiation; the backend was never called.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Operation not valid in the current stream state.
    #[error("Invalid use: {0}")]
    InvalidUse(String),

    #[error("{code}: {message}")]
    Backend { code: ErrorCode, message: String },

    #[cfg(feature = "json")]
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::InvalidParameter(_) => ErrorCode::InvalidParameter,
            Error::InvalidUse(_) => ErrorCode::InvalidUse,
            Error::Backend { code, .. } => *code,
            #[cfg(feature = "json")]
            Error::Json(_) => ErrorCode::InvalidParameter,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.code().is_fatal()
    }
}

impl From<BackendError> for Error {
    fn from(e: BackendError) -> Self {
        Error::Backend {
            code: ErrorCode::from_native(e.code),
            message: e.message,
        }
    }
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;
