//! In-memory database and editor, for tests, demos and simulations.

use crate::adapter::{DatabaseAdapter, DatabaseEvent, EditorAdapter};
use crate::error::{Result, SdkError};
use crate::presence::color_from_user_id;
use ot_core::{Attributes, Cursor, Operation};
use ot_history::{OperationMeta, WrappedOperation};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

// ============================================================================
// Server
// ============================================================================

/// One committed log entry, stored in its JSON form.
#[derive(Clone, Debug)]
struct LogEntry {
    user_id: String,
    operation: serde_json::Value,
}

#[derive(Clone, Debug)]
struct CursorRecord {
    cursor: Option<Cursor>,
    color: String,
    user_name: Option<String>,
    version: u64,
}

#[derive(Debug, Default)]
struct ServerLog {
    entries: Vec<LogEntry>,
    document: String,
    cursors: HashMap<String, CursorRecord>,
    cursor_version: u64,
}

/// A shared, totally ordered operation log.
///
/// Cloning gives another handle to the same log.
#[derive(Clone, Debug, Default)]
pub struct MemoryServer {
    log: Arc<RwLock<ServerLog>>,
}

impl MemoryServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A server whose log starts with one operation inserting `text`.
    pub fn with_document(text: &str) -> Self {
        let server = Self::new();
        if !text.is_empty() {
            let mut op = Operation::new();
            op.insert(text);
            {
                let mut log = server.log.write();
                log.entries.push(LogEntry {
                    user_id: String::new(),
                    operation: op.to_json(),
                });
                log.document = text.to_string();
            }
        }
        server
    }

    /// Open a connection for `user_id`.
    pub fn connect(&self, user_id: impl Into<String>) -> MemoryDatabase {
        MemoryDatabase::new(self.clone(), user_id.into(), None)
    }

    /// Open a connection for `user_id` announcing a display name.
    pub fn connect_as(
        &self,
        user_id: impl Into<String>,
        user_name: impl Into<String>,
    ) -> MemoryDatabase {
        MemoryDatabase::new(self.clone(), user_id.into(), Some(user_name.into()))
    }

    /// The document obtained by applying the whole log.
    pub fn document(&self) -> String {
        self.log.read().document.clone()
    }

    /// Number of committed operations.
    pub fn revision(&self) -> usize {
        self.log.read().entries.len()
    }

    /// The committed operations in their JSON form, with their authors.
    pub fn history(&self) -> Vec<(String, serde_json::Value)> {
        self.log
            .read()
            .entries
            .iter()
            .map(|e| (e.user_id.clone(), e.operation.clone()))
            .collect()
    }
}

// ============================================================================
// Database
// ============================================================================

/// One client's connection to a [`MemoryServer`].
///
/// An operation is committed only if the client has seen the whole log;
/// otherwise a [`DatabaseEvent::Retry`] is queued and delivered after the
/// entries the client missed.
#[derive(Debug)]
pub struct MemoryDatabase {
    server: MemoryServer,
    user_id: String,
    user_name: Option<String>,
    color: String,
    /// Log entries delivered so far.
    revision: usize,
    retry_pending: bool,
    cursors_seen: u64,
    initiated: bool,
}

impl MemoryDatabase {
    fn new(server: MemoryServer, user_id: String, user_name: Option<String>) -> Self {
        let color = color_from_user_id(&user_id);
        Self {
            server,
            user_id,
            user_name,
            color,
            revision: 0,
            retry_pending: false,
            cursors_seen: 0,
            initiated: false,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn server(&self) -> &MemoryServer {
        &self.server
    }

    /// Log entries delivered to this client so far.
    pub fn revision(&self) -> usize {
        self.revision
    }
}

impl DatabaseAdapter for MemoryDatabase {
    fn send_operation(&mut self, operation: &Operation) -> Result<()> {
        let mut log = self.server.log.write();

        if log.entries.len() != self.revision {
            self.retry_pending = true;
            return Ok(());
        }

        let document = operation
            .apply(&log.document)
            .map_err(|e| SdkError::Database(format!("rejected operation: {}", e)))?;

        log.entries.push(LogEntry {
            user_id: self.user_id.clone(),
            operation: operation.to_json(),
        });
        log.document = document;
        Ok(())
    }

    fn send_cursor(&mut self, cursor: Option<Cursor>) -> Result<()> {
        let mut log = self.server.log.write();
        log.cursor_version += 1;
        let version = log.cursor_version;
        log.cursors.insert(
            self.user_id.clone(),
            CursorRecord {
                cursor,
                color: self.color.clone(),
                user_name: self.user_name.clone(),
                version,
            },
        );
        Ok(())
    }

    fn is_current_user(&self, client_id: &str) -> bool {
        client_id == self.user_id
    }

    fn poll(&mut self) -> Result<Vec<DatabaseEvent>> {
        let log = self.server.log.read();
        let mut events = Vec::new();

        for entry in &log.entries[self.revision..] {
            self.revision += 1;
            if entry.user_id == self.user_id {
                // Stop here so the ack is handled before anything newer.
                events.push(DatabaseEvent::Ack);
                break;
            }
            let operation = Operation::from_json(entry.operation.clone())?;
            events.push(DatabaseEvent::Operation(operation));
        }

        if !self.initiated && self.revision == log.entries.len() {
            self.initiated = true;
            events.push(DatabaseEvent::InitialRevision);
        }

        if self.retry_pending && self.revision == log.entries.len() {
            self.retry_pending = false;
            events.push(DatabaseEvent::Retry);
        }

        let mut cursors: Vec<(&String, &CursorRecord)> = log
            .cursors
            .iter()
            .filter(|(id, record)| record.version > self.cursors_seen && **id != self.user_id)
            .collect();
        cursors.sort_by_key(|(_, record)| record.version);
        for (id, record) in cursors {
            events.push(DatabaseEvent::Cursor {
                client_id: id.clone(),
                cursor: record.cursor,
                color: Some(record.color.clone()),
                user_name: record.user_name.clone(),
            });
        }
        self.cursors_seen = log.cursor_version;

        Ok(events)
    }
}

// ============================================================================
// Editor
// ============================================================================

/// Another user's cursor as displayed by [`MemoryEditor`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OtherCursor {
    pub cursor: Cursor,
    pub color: String,
    pub user_name: Option<String>,
}

/// A text buffer with per-character attributes and cursor marks.
///
/// The edit helpers (`insert`, `delete`, `format`) act like a user typing:
/// they change the buffer, move the cursor and return the
/// `(operation, inverse)` pair a real editor binding would report.
#[derive(Clone, Debug, Default)]
pub struct MemoryEditor {
    text: String,
    attributes: Vec<Attributes>,
    cursor: Option<Cursor>,
    other_cursors: BTreeMap<String, OtherCursor>,
    initiated: bool,
}

impl MemoryEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(text: &str) -> Self {
        Self {
            text: text.to_string(),
            attributes: vec![Attributes::new(); text.chars().count()],
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Attributes of every character, in order.
    pub fn attributes(&self) -> &[Attributes] {
        &self.attributes
    }

    pub fn other_cursor(&self, client_id: &str) -> Option<&OtherCursor> {
        self.other_cursors.get(client_id)
    }

    pub fn other_cursors(&self) -> impl Iterator<Item = (&str, &OtherCursor)> {
        self.other_cursors.iter().map(|(id, c)| (id.as_str(), c))
    }

    pub fn is_initiated(&self) -> bool {
        self.initiated
    }

    /// Type `text` at `at`.
    pub fn insert(&mut self, at: usize, text: &str) -> Result<(Operation, Operation)> {
        self.insert_with(at, text, Attributes::new())
    }

    /// Type `text` carrying `attributes` at `at`.
    pub fn insert_with(
        &mut self,
        at: usize,
        text: &str,
        attributes: Attributes,
    ) -> Result<(Operation, Operation)> {
        let len = self.len();
        if at > len {
            return Err(SdkError::Editor(format!(
                "insert position {} is past the end ({})",
                at, len
            )));
        }

        let mut op = Operation::new();
        op.retain(at).insert_with(text, attributes).retain(len - at);

        let inverse = self.commit(&op)?;
        self.cursor = Some(Cursor::collapsed(at + text.chars().count()));
        Ok((op, inverse))
    }

    /// Delete `n` characters starting at `at`.
    pub fn delete(&mut self, at: usize, n: usize) -> Result<(Operation, Operation)> {
        let len = self.len();
        if at + n > len {
            return Err(SdkError::Editor(format!(
                "cannot delete {}..{} from {} characters",
                at,
                at + n,
                len
            )));
        }

        let mut op = Operation::new();
        op.retain(at).delete(n).retain(len - at - n);

        let inverse = self.commit(&op)?;
        self.cursor = Some(Cursor::collapsed(at));
        Ok((op, inverse))
    }

    /// Set `attributes` on `n` characters starting at `at`.
    pub fn format(
        &mut self,
        at: usize,
        n: usize,
        attributes: Attributes,
    ) -> Result<(Operation, Operation)> {
        let len = self.len();
        if at + n > len {
            return Err(SdkError::Editor(format!(
                "cannot format {}..{} of {} characters",
                at,
                at + n,
                len
            )));
        }

        let mut op = Operation::new();
        op.retain(at).retain_with(n, attributes).retain(len - at - n);

        let inverse = self.commit(&op)?;
        self.cursor = Some(Cursor::new(at + n, at));
        Ok((op, inverse))
    }

    /// Apply a local edit and return its full inverse.
    fn commit(&mut self, op: &Operation) -> Result<Operation> {
        let inverse = op.invert_with_attributes(&self.text, &self.attributes)?;
        let (text, attributes) = op.apply_with_attributes(&self.text, &self.attributes)?;
        self.text = text;
        self.attributes = attributes;
        Ok(inverse)
    }
}

impl EditorAdapter for MemoryEditor {
    fn apply_operation(&mut self, operation: &Operation) -> Result<()> {
        let (text, attributes) = operation.apply_with_attributes(&self.text, &self.attributes)?;
        self.text = text;
        self.attributes = attributes;

        self.cursor = self.cursor.map(|c| c.transform(operation));
        for mark in self.other_cursors.values_mut() {
            mark.cursor = mark.cursor.transform(operation);
        }
        Ok(())
    }

    fn text(&self) -> String {
        self.text.clone()
    }

    fn cursor(&self) -> Option<Cursor> {
        self.cursor
    }

    fn set_cursor(&mut self, cursor: Cursor) {
        self.cursor = Some(cursor);
    }

    fn set_other_cursor(
        &mut self,
        client_id: &str,
        cursor: Cursor,
        color: &str,
        user_name: Option<&str>,
    ) {
        self.other_cursors.insert(
            client_id.to_string(),
            OtherCursor {
                cursor,
                color: color.to_string(),
                user_name: user_name.map(str::to_string),
            },
        );
    }

    fn remove_other_cursor(&mut self, client_id: &str) {
        self.other_cursors.remove(client_id);
    }

    fn set_initiated(&mut self, initiated: bool) {
        self.initiated = initiated;
    }

    fn invert_operation(&self, operation: &WrappedOperation) -> Result<WrappedOperation> {
        let inverse = operation
            .operation()
            .invert_with_attributes(&self.text, &self.attributes)?;
        let meta = operation.meta().map(OperationMeta::invert);
        Ok(WrappedOperation::new(inverse, meta))
    }
}
