//! Error types for the history layer.

use ot_core::OtError;
use std::fmt;
use thiserror::Error;

/// Which of the two undo manager stacks an error refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StackKind {
    Undo,
    Redo,
}

impl fmt::Display for StackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StackKind::Undo => write!(f, "undo"),
            StackKind::Redo => write!(f, "redo"),
        }
    }
}

/// Errors that can occur while recording or replaying history.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HistoryError {
    #[error("Nothing to {0}: stack is empty")]
    EmptyStack(StackKind),

    #[error("Precondition violated: {0}")]
    PreconditionViolation(String),

    #[error(transparent)]
    Operation(#[from] OtError),
}

pub type Result<T> = std::result::Result<T, HistoryError>;
