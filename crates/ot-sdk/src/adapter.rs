//! Contracts between an editing session and the outside world.
//!
//! An [`EditorAdapter`] wraps a concrete text editor; a [`DatabaseAdapter`]
//! wraps whatever stores the shared operation log. Both are driven by
//! [`EditorClient`](crate::EditorClient).

use crate::error::Result;
use ot_core::{Cursor, Operation, OperationalTransform};
use ot_history::WrappedOperation;
use serde::{Deserialize, Serialize};

/// A text editor the session can read from and write to.
pub trait EditorAdapter {
    /// Apply an operation (remote, or an undo/redo step) to the buffer.
    fn apply_operation(&mut self, operation: &Operation) -> Result<()>;

    /// Current buffer contents.
    fn text(&self) -> String;

    /// The local user's cursor, if the editor has one.
    fn cursor(&self) -> Option<Cursor>;

    fn set_cursor(&mut self, cursor: Cursor);

    /// Show another user's cursor or selection.
    fn set_other_cursor(
        &mut self,
        client_id: &str,
        cursor: Cursor,
        color: &str,
        user_name: Option<&str>,
    );

    /// Hide another user's cursor.
    fn remove_other_cursor(&mut self, client_id: &str);

    /// Called once the initial document history has been loaded.
    fn set_initiated(&mut self, initiated: bool);

    /// Inverse of `operation` against the current buffer.
    ///
    /// The default inverts text only. Editors that know the attributes of
    /// their characters should also restore formatting.
    fn invert_operation(&self, operation: &WrappedOperation) -> Result<WrappedOperation> {
        Ok(operation.invert(&self.text())?)
    }
}

/// Something that comes back from the database.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DatabaseEvent {
    /// An operation committed by another client, in log order.
    Operation(Operation),
    /// Our outstanding operation was committed.
    Ack,
    /// Our outstanding operation lost a race and must be sent again.
    Retry,
    /// Another client moved its cursor, or left (`cursor: None`).
    #[serde(rename_all = "camelCase")]
    Cursor {
        client_id: String,
        cursor: Option<Cursor>,
        color: Option<String>,
        user_name: Option<String>,
    },
    /// The existing history has been delivered.
    InitialRevision,
    /// The database reported a failure.
    Error(String),
}

/// The shared operation log.
pub trait DatabaseAdapter {
    /// Try to append an operation. The outcome arrives later as
    /// [`DatabaseEvent::Ack`] or [`DatabaseEvent::Retry`].
    fn send_operation(&mut self, operation: &Operation) -> Result<()>;

    /// Publish the local cursor (`None` when the editor lost focus).
    fn send_cursor(&mut self, cursor: Option<Cursor>) -> Result<()>;

    /// Whether `client_id` is this session's own user.
    fn is_current_user(&self, client_id: &str) -> bool;

    /// Take every event that arrived since the last call, in order.
    fn poll(&mut self) -> Result<Vec<DatabaseEvent>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_wire_form() {
        let mut op = Operation::new();
        op.retain(2).insert("x");

        assert_eq!(
            serde_json::to_value(DatabaseEvent::Operation(op)).unwrap(),
            json!({ "operation": [2, "x"] })
        );
        assert_eq!(serde_json::to_value(DatabaseEvent::Ack).unwrap(), json!("ack"));

        let cursor: DatabaseEvent = serde_json::from_value(json!({
            "cursor": {
                "clientId": "bob",
                "cursor": { "position": 1, "selectionEnd": 3 },
                "color": null,
                "userName": "Bob"
            }
        }))
        .unwrap();
        assert_eq!(
            cursor,
            DatabaseEvent::Cursor {
                client_id: "bob".to_string(),
                cursor: Some(Cursor::new(1, 3)),
                color: None,
                user_name: Some("Bob".to_string()),
            }
        );
    }
}
