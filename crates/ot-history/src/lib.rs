//! # ot-history
//!
//! Local edit history for Carnelia OT sessions.
//!
//! This crate provides:
//! - [`OperationMeta`]: cursor positions before and after an edit
//! - [`WrappedOperation`]: an operation travelling with its metadata
//! - [`UndoManager`]: bounded undo/redo stacks that stay valid while remote
//!   edits keep arriving
//!
//! ## Example
//!
//! ```rust
//! use ot_core::Operation;
//! use ot_history::{UndoManager, WrappedOperation};
//!
//! let mut manager = UndoManager::new();
//!
//! // The user typed "hi" into an empty document; record the inverse.
//! let mut inverse = Operation::new();
//! inverse.delete(2);
//! manager.add(WrappedOperation::from(inverse), false).unwrap();
//!
//! // A remote edit prepends "> ".
//! let mut remote = Operation::new();
//! remote.insert("> ").retain(2);
//! manager.transform(&remote).unwrap();
//!
//! let text = manager
//!     .perform_undo(|_, entry| entry.operation().apply("> hi"))
//!     .unwrap()
//!     .unwrap();
//! assert_eq!(text, "> ");
//! ```

pub mod error;
pub mod meta;
pub mod undo;
pub mod wrapped;

pub use error::{HistoryError, Result, StackKind};
pub use meta::OperationMeta;
pub use undo::{UndoManager, DEFAULT_MAX_ITEMS};
pub use wrapped::WrappedOperation;
