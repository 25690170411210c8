//! Error types for the OT SDK.

use ot_core::OtError;
use ot_history::HistoryError;
use thiserror::Error;

/// Error type for SDK operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SdkError {
    /// An operation could not be applied, composed or transformed.
    #[error(transparent)]
    Operation(#[from] OtError),

    /// The undo manager rejected a request.
    #[error(transparent)]
    History(#[from] HistoryError),

    /// A call that is only valid in another state, e.g. an ack with nothing
    /// outstanding.
    #[error("Precondition violated: {0}")]
    PreconditionViolation(String),

    /// The editor adapter failed.
    #[error("Editor error: {0}")]
    Editor(String),

    /// The database adapter failed.
    #[error("Database error: {0}")]
    Database(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for SdkError {
    fn from(err: serde_json::Error) -> Self {
        SdkError::Serialization(err.to_string())
    }
}

/// Result type for SDK operations.
pub type Result<T> = std::result::Result<T, SdkError>;
