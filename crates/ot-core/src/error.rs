//! Error types for the operation algebra.

use thiserror::Error;

/// Errors raised by operation construction, application and combination.
///
/// All of them indicate a caller bug or a corrupted operation received from
/// a remote peer. None of them are retryable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OtError {
    /// `apply`/`invert` was handed a string whose length differs from the
    /// operation's base length.
    #[error("Length mismatch: expected {expected} chars, found {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    /// `compose`/`transform` was called on operations whose lengths do not
    /// line up.
    #[error("Incompatible lengths: {left} vs {right}")]
    IncompatibleLengths { left: usize, right: usize },

    /// One op stream ran out before the other while walking both.
    #[error("Malformed operation sequence: {0}")]
    MalformedOperationSequence(String),

    /// The JSON form of an operation could not be decoded.
    #[error("Invalid operation JSON: {0}")]
    InvalidJson(String),
}

impl From<serde_json::Error> for OtError {
    fn from(err: serde_json::Error) -> Self {
        OtError::InvalidJson(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, OtError>;
