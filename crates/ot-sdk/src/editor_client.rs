//! Editing session: ties an editor and a database to the client state
//! machine and the undo manager.

use crate::adapter::{DatabaseAdapter, DatabaseEvent, EditorAdapter};
use crate::client::{Client, Collaborator};
use crate::error::{Result, SdkError};
use crate::presence::RemoteClient;
use ot_core::{Cursor, Operation, OtError};
use ot_history::{OperationMeta, UndoManager, WrappedOperation, DEFAULT_MAX_ITEMS};
use std::collections::HashMap;
use tokio::sync::broadcast;
use tracing::{debug, trace, warn};
use ulid::Ulid;

/// Configuration for an editing session.
#[derive(Clone, Debug)]
pub struct EditorClientConfig {
    /// Undo/redo stack capacity.
    pub max_undo_items: usize,
    /// Merge consecutive typing into one undo step.
    pub coalesce_undo: bool,
    /// Capacity of the event broadcast channel.
    pub event_capacity: usize,
}

impl Default for EditorClientConfig {
    fn default() -> Self {
        Self {
            max_undo_items: DEFAULT_MAX_ITEMS,
            coalesce_undo: true,
            event_capacity: 100,
        }
    }
}

/// Builder for session configuration.
pub struct EditorClientConfigBuilder {
    config: EditorClientConfig,
}

impl EditorClientConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: EditorClientConfig::default(),
        }
    }

    pub fn max_undo_items(mut self, items: usize) -> Self {
        self.config.max_undo_items = items;
        self
    }

    pub fn coalesce_undo(mut self, enabled: bool) -> Self {
        self.config.coalesce_undo = enabled;
        self
    }

    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.config.event_capacity = capacity;
        self
    }

    pub fn build(self) -> EditorClientConfig {
        self.config
    }
}

impl Default for EditorClientConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Events emitted by an editing session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EditorClientEvent {
    /// An undo step was applied; carries the applied operation.
    Undo(String),
    /// A redo step was applied; carries the applied operation.
    Redo(String),
    /// Sync status after an ack or a remote operation.
    Synced(bool),
    /// The database reported an error.
    Error(String),
}

/// Routes the state machine's requests to the adapters.
struct Bridge<'a, E, D> {
    editor: &'a mut E,
    database: &'a mut D,
    applied: Option<Operation>,
}

impl<E: EditorAdapter, D: DatabaseAdapter> Collaborator<Operation> for Bridge<'_, E, D> {
    fn send_operation(&mut self, operation: &Operation) -> Result<()> {
        self.database.send_operation(operation)
    }

    fn apply_operation(&mut self, operation: &Operation) -> Result<()> {
        self.editor.apply_operation(operation)?;
        self.applied = Some(operation.clone());
        Ok(())
    }
}

/// One user's editing session on a shared document.
///
/// Local edits go through [`on_change`](Self::on_change) (or
/// [`apply_local`](Self::apply_local)); everything coming back from the
/// database goes through [`handle_database_event`](Self::handle_database_event)
/// or [`sync`](Self::sync).
pub struct EditorClient<E: EditorAdapter, D: DatabaseAdapter> {
    client_id: String,
    config: EditorClientConfig,
    client: Client<Operation>,
    undo_manager: UndoManager,
    editor: E,
    database: D,
    remote_clients: HashMap<String, RemoteClient>,
    cursor: Option<Cursor>,
    focused: bool,
    event_tx: broadcast::Sender<EditorClientEvent>,
}

impl<E: EditorAdapter, D: DatabaseAdapter> EditorClient<E, D> {
    /// Create a session with the default configuration.
    pub fn new(editor: E, database: D) -> Self {
        Self::build(editor, database, EditorClientConfig::default(), UndoManager::new())
    }

    /// Create a session with a custom configuration.
    pub fn with_config(editor: E, database: D, config: EditorClientConfig) -> Result<Self> {
        let undo_manager = UndoManager::with_max_items(config.max_undo_items)?;
        Ok(Self::build(editor, database, config, undo_manager))
    }

    fn build(
        editor: E,
        database: D,
        config: EditorClientConfig,
        undo_manager: UndoManager,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(config.event_capacity.max(1));
        let cursor = editor.cursor();
        Self {
            client_id: Ulid::new().to_string(),
            config,
            client: Client::new(),
            undo_manager,
            editor,
            database,
            remote_clients: HashMap::new(),
            cursor,
            focused: false,
            event_tx,
        }
    }

    /// Generated id of this session.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn config(&self) -> &EditorClientConfig {
        &self.config
    }

    pub fn client(&self) -> &Client<Operation> {
        &self.client
    }

    pub fn undo_manager(&self) -> &UndoManager {
        &self.undo_manager
    }

    pub fn editor(&self) -> &E {
        &self.editor
    }

    pub fn database(&self) -> &D {
        &self.database
    }

    pub fn cursor(&self) -> Option<Cursor> {
        self.cursor
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn remote_client(&self, client_id: &str) -> Option<&RemoteClient> {
        self.remote_clients.get(client_id)
    }

    pub fn remote_clients(&self) -> impl Iterator<Item = &RemoteClient> {
        self.remote_clients.values()
    }

    /// Subscribe to session events.
    pub fn subscribe(&self) -> broadcast::Receiver<EditorClientEvent> {
        self.event_tx.subscribe()
    }

    pub fn can_undo(&self) -> bool {
        self.undo_manager.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.undo_manager.can_redo()
    }

    /// Record a change the user made in the editor.
    ///
    /// `inverse` must undo `operation` against the text after the change.
    pub fn on_change(&mut self, operation: Operation, inverse: Operation) -> Result<()> {
        let cursor_before = self.cursor;
        self.update_cursor();

        let meta = OperationMeta::new(self.cursor, cursor_before);
        let inverse = WrappedOperation::new(inverse, Some(meta));
        let compose = self.config.coalesce_undo
            && self
                .undo_manager
                .last()
                .map_or(false, |last| inverse.should_be_composed_with_inverted(last));

        let mut bridge = Bridge {
            editor: &mut self.editor,
            database: &mut self.database,
            applied: None,
        };
        self.client.apply_client(&mut bridge, operation)?;
        self.undo_manager.add(inverse, compose)?;
        Ok(())
    }

    /// Run an edit against the editor and record it.
    pub fn apply_local<F>(&mut self, edit: F) -> Result<()>
    where
        F: FnOnce(&mut E) -> Result<(Operation, Operation)>,
    {
        let (operation, inverse) = edit(&mut self.editor)?;
        self.on_change(operation, inverse)
    }

    /// Undo the newest undo entry. Does nothing when there is none.
    pub fn undo(&mut self) -> Result<()> {
        if !self.undo_manager.can_undo() {
            return Ok(());
        }

        let Self {
            undo_manager,
            editor,
            database,
            client,
            cursor,
            ..
        } = &mut *self;
        let applied = undo_manager.try_perform_undo(|manager, entry| {
            replay(manager, entry, editor, database, client, cursor)
        })?;

        debug!(operation = %applied, "undo");
        let _ = self.event_tx.send(EditorClientEvent::Undo(applied));
        Ok(())
    }

    /// Redo the newest redo entry. Does nothing when there is none.
    pub fn redo(&mut self) -> Result<()> {
        if !self.undo_manager.can_redo() {
            return Ok(());
        }

        let Self {
            undo_manager,
            editor,
            database,
            client,
            cursor,
            ..
        } = &mut *self;
        let applied = undo_manager.try_perform_redo(|manager, entry| {
            replay(manager, entry, editor, database, client, cursor)
        })?;

        debug!(operation = %applied, "redo");
        let _ = self.event_tx.send(EditorClientEvent::Redo(applied));
        Ok(())
    }

    pub fn clear_undo_redo_stack(&mut self) -> Result<()> {
        Ok(self.undo_manager.dispose()?)
    }

    /// Poll the database and handle everything it returned.
    ///
    /// Returns the number of events handled.
    pub fn sync(&mut self) -> Result<usize> {
        let events = self.database.poll()?;
        let count = events.len();
        for event in events {
            self.handle_database_event(event)?;
        }
        Ok(count)
    }

    pub fn handle_database_event(&mut self, event: DatabaseEvent) -> Result<()> {
        match event {
            DatabaseEvent::Ack => self.server_ack(),
            DatabaseEvent::Retry => {
                debug!(client_id = %self.client_id, "server retry");
                let mut bridge = Bridge {
                    editor: &mut self.editor,
                    database: &mut self.database,
                    applied: None,
                };
                self.client.server_retry(&mut bridge)
            }
            DatabaseEvent::Operation(operation) => self.apply_server(&operation),
            DatabaseEvent::Cursor {
                client_id,
                cursor,
                color,
                user_name,
            } => {
                self.remote_cursor(&client_id, cursor, color, user_name);
                Ok(())
            }
            DatabaseEvent::InitialRevision => {
                self.editor.set_initiated(true);
                Ok(())
            }
            DatabaseEvent::Error(message) => {
                warn!(client_id = %self.client_id, %message, "database error");
                let _ = self.event_tx.send(EditorClientEvent::Error(message));
                Ok(())
            }
        }
    }

    /// The editor's cursor moved.
    pub fn on_cursor_activity(&mut self) -> Result<()> {
        let old = self.cursor;
        self.update_cursor();
        if old.is_none() && self.cursor.is_none() {
            return Ok(());
        }
        self.send_cursor(self.cursor)
    }

    pub fn on_focus(&mut self) -> Result<()> {
        self.focused = true;
        self.on_cursor_activity()
    }

    pub fn on_blur(&mut self) -> Result<()> {
        self.cursor = None;
        self.focused = false;
        self.send_cursor(None)
    }

    /// Release everything held by the session.
    pub fn dispose(mut self) -> Result<(E, D)> {
        self.undo_manager.dispose()?;
        for remote in self.remote_clients.values_mut() {
            remote.remove_cursor(&mut self.editor);
        }
        Ok((self.editor, self.database))
    }

    fn server_ack(&mut self) -> Result<()> {
        debug!(client_id = %self.client_id, "server ack");
        let mut bridge = Bridge {
            editor: &mut self.editor,
            database: &mut self.database,
            applied: None,
        };
        self.client.server_ack(&mut bridge)?;

        // A cursor held back while buffering goes out with the first ack that
        // leaves nothing buffered.
        if self.focused {
            self.update_cursor();
            self.send_cursor(self.cursor)?;
        }
        let _ = self
            .event_tx
            .send(EditorClientEvent::Synced(self.client.is_synchronized()));
        Ok(())
    }

    fn apply_server(&mut self, operation: &Operation) -> Result<()> {
        // The server's document is what the editor shows minus pending edits.
        let expected = match self.client.state().outstanding() {
            Some(outstanding) => outstanding.base_length(),
            None => self.editor.text().chars().count(),
        };
        if operation.base_length() != expected {
            warn!(
                client_id = %self.client_id,
                expected,
                actual = operation.base_length(),
                "rejected remote operation"
            );
            return Err(SdkError::Operation(OtError::IncompatibleLengths {
                left: expected,
                right: operation.base_length(),
            }));
        }

        let mut bridge = Bridge {
            editor: &mut self.editor,
            database: &mut self.database,
            applied: None,
        };
        self.client.apply_server(&mut bridge, operation)?;

        if let Some(applied) = bridge.applied {
            trace!(client_id = %self.client_id, operation = %applied, "applied remote operation");
            self.undo_manager.transform(&applied)?;
        }
        self.update_cursor();

        let _ = self
            .event_tx
            .send(EditorClientEvent::Synced(self.client.is_synchronized()));
        Ok(())
    }

    fn remote_cursor(
        &mut self,
        client_id: &str,
        cursor: Option<Cursor>,
        color: Option<String>,
        user_name: Option<String>,
    ) {
        if self.database.is_current_user(client_id) {
            return;
        }
        if !self.client.is_synchronized() {
            warn!(
                client_id = %self.client_id,
                remote = client_id,
                "dropped remote cursor while not synchronized"
            );
            return;
        }

        let remote = self
            .remote_clients
            .entry(client_id.to_string())
            .or_insert_with(|| RemoteClient::new(client_id));

        match cursor {
            Some(cursor) => {
                if let Some(color) = color {
                    remote.set_color(color);
                }
                if let Some(user_name) = user_name {
                    remote.set_user_name(user_name);
                }
                remote.update_cursor(&mut self.editor, cursor);
            }
            None => remote.remove_cursor(&mut self.editor),
        }
    }

    fn update_cursor(&mut self) {
        self.cursor = self.editor.cursor();
    }

    fn send_cursor(&mut self, cursor: Option<Cursor>) -> Result<()> {
        if self.client.is_awaiting_with_buffer() {
            debug!(client_id = %self.client_id, "cursor update deferred until ack");
            return Ok(());
        }
        self.database.send_cursor(cursor)
    }
}

/// Send a popped undo/redo entry, then apply it and record its inverse on
/// the other stack. A failed send leaves the editor and both stacks as they
/// were.
fn replay<E: EditorAdapter, D: DatabaseAdapter>(
    manager: &mut UndoManager,
    entry: &WrappedOperation,
    editor: &mut E,
    database: &mut D,
    client: &mut Client<Operation>,
    cursor: &mut Option<Cursor>,
) -> Result<String> {
    let inverse = editor.invert_operation(entry)?;

    let mut bridge = Bridge {
        editor: &mut *editor,
        database,
        applied: None,
    };
    client.apply_client(&mut bridge, entry.operation().clone())?;

    editor.apply_operation(entry.operation())?;
    manager.add(inverse, false)?;

    if let Some(restored) = entry.cursor() {
        editor.set_cursor(restored);
    }
    *cursor = editor.cursor();
    Ok(entry.operation().to_string())
}
