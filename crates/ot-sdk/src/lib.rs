//! Carnelia OT SDK - client-side synchronization for collaborative text
//!
//! This crate wires the operation algebra of `ot-core` and the undo history
//! of `ot-history` into an editing session that talks to a shared operation
//! log.
//!
//! # Quick Start
//!
//! ```rust
//! use ot_sdk::{EditorAdapter, EditorClient, MemoryEditor, MemoryServer};
//!
//! let server = MemoryServer::new();
//! let mut alice = EditorClient::new(MemoryEditor::new(), server.connect("alice"));
//! let mut bob = EditorClient::new(MemoryEditor::new(), server.connect("bob"));
//!
//! alice.apply_local(|editor| editor.insert(0, "Hello")).unwrap();
//! bob.apply_local(|editor| editor.insert(0, "Hi! ")).unwrap();
//!
//! // Deliver acks, retries and remote operations until both settle.
//! while !(alice.client().is_synchronized() && bob.client().is_synchronized()) {
//!     alice.sync().unwrap();
//!     bob.sync().unwrap();
//! }
//! alice.sync().unwrap();
//! bob.sync().unwrap();
//!
//! assert_eq!(alice.editor().text(), server.document());
//! assert_eq!(bob.editor().text(), server.document());
//! ```
//!
//! # Architecture
//!
//! - [`client`] - The synchronization state machine (`Synchronized`,
//!   `AwaitingConfirm`, `AwaitingWithBuffer`)
//! - [`adapter`] - Editor and database contracts
//! - [`editor_client`] - Editing session with undo/redo and presence
//! - [`presence`] - Remote users and their cursors
//! - [`memory`] - In-memory server, database and editor
//! - [`error`] - Error types

pub mod adapter;
pub mod client;
pub mod editor_client;
pub mod error;
pub mod memory;
pub mod presence;

// Re-exports for convenience
pub use adapter::{DatabaseAdapter, DatabaseEvent, EditorAdapter};
pub use client::{Client, ClientState, Collaborator};
pub use editor_client::{
    EditorClient, EditorClientConfig, EditorClientConfigBuilder, EditorClientEvent,
};
pub use error::{Result, SdkError};
pub use memory::{MemoryDatabase, MemoryEditor, MemoryServer, OtherCursor};
pub use presence::{color_from_user_id, RemoteClient};

// Re-export commonly used types from the lower layers
pub use ot_core::{attributes::attrs, AttributeValue, Attributes, Cursor, Operation};
pub use ot_history::{OperationMeta, UndoManager, WrappedOperation};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::adapter::{DatabaseAdapter, EditorAdapter};
    pub use crate::client::{Client, ClientState};
    pub use crate::editor_client::{EditorClient, EditorClientConfig, EditorClientEvent};
    pub use crate::error::SdkError;
    pub use crate::memory::{MemoryDatabase, MemoryEditor, MemoryServer};
    pub use ot_core::{Cursor, Operation, OperationalTransform};
}
