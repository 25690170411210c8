//! Undo/Redo System - bounded undo and redo stacks of inverse operations.
//!
//! Provides collaborative undo functionality:
//! - Local undo/redo (only the local user's edits are stacked)
//! - Coalescing of consecutive edits into one undo step
//! - Stacks kept valid against concurrent remote edits via transform

use crate::error::{HistoryError, Result, StackKind};
use crate::wrapped::WrappedOperation;
use ot_core::{Operation, OperationalTransform};
use std::collections::VecDeque;

/// Default number of entries kept on each stack.
pub const DEFAULT_MAX_ITEMS: usize = 50;

/// What `add` currently records into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum UndoState {
    /// Regular editing: adds go to the undo stack.
    Normal,
    /// Inside `perform_undo`: adds go to the redo stack.
    Undoing,
    /// Inside `perform_redo`: adds go back to the undo stack.
    Redoing,
}

/// An undo manager for a single editing session.
///
/// Both stacks hold inverse operations: applying the top of the undo stack to
/// the current document reverts the user's latest edit.
#[derive(Clone, Debug)]
pub struct UndoManager {
    /// Maximum entries per stack.
    max_items: usize,
    /// Gates which stack `add` affects.
    state: UndoState,
    /// Whether the next normal edit may be merged into the top entry.
    compose: bool,
    /// Oldest at the front, newest at the back.
    undo_stack: VecDeque<WrappedOperation>,
    redo_stack: VecDeque<WrappedOperation>,
}

impl Default for UndoManager {
    fn default() -> Self {
        Self::new()
    }
}

impl UndoManager {
    /// Create an undo manager keeping up to 50 entries per stack.
    pub fn new() -> Self {
        Self {
            max_items: DEFAULT_MAX_ITEMS,
            state: UndoState::Normal,
            compose: true,
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
        }
    }

    /// Create an undo manager with a custom capacity. Zero is rejected.
    pub fn with_max_items(max_items: usize) -> Result<Self> {
        if max_items == 0 {
            return Err(HistoryError::PreconditionViolation(
                "undo manager needs room for at least one item".to_string(),
            ));
        }
        Ok(Self {
            max_items,
            ..Self::new()
        })
    }

    pub fn max_items(&self) -> usize {
        self.max_items
    }

    /// Record an inverse operation.
    ///
    /// In normal editing, `compose` asks for the operation to be merged into
    /// the top of the undo stack so both revert as one step; the redo stack
    /// is cleared. While undoing the operation lands on the redo stack, and
    /// while redoing back on the undo stack.
    pub fn add(&mut self, operation: WrappedOperation, compose: bool) -> Result<()> {
        match self.state {
            UndoState::Undoing => {
                push_bounded(&mut self.redo_stack, operation, self.max_items);
                self.compose = false;
            }
            UndoState::Redoing => {
                push_bounded(&mut self.undo_stack, operation, self.max_items);
                self.compose = true;
            }
            UndoState::Normal => {
                let to_push = match self.undo_stack.pop_back() {
                    Some(top) if self.compose && compose => match operation.compose(&top) {
                        Ok(composed) => composed,
                        Err(err) => {
                            self.undo_stack.push_back(top);
                            return Err(err.into());
                        }
                    },
                    Some(top) => {
                        self.undo_stack.push_back(top);
                        operation
                    }
                    None => operation,
                };

                push_bounded(&mut self.undo_stack, to_push, self.max_items);
                self.compose = true;
                self.redo_stack.clear();
            }
        }
        Ok(())
    }

    /// The entry `perform_undo` would hand out next.
    pub fn last(&self) -> Option<&WrappedOperation> {
        self.undo_stack.back()
    }

    /// Rewrite both stacks so they apply after the concurrent `operation`.
    ///
    /// Entries are transformed newest first; entries made moot by the remote
    /// edit (transformed into no-ops) are dropped.
    pub fn transform(&mut self, operation: &Operation) -> Result<()> {
        let undo_stack = transform_stack(&self.undo_stack, operation)?;
        let redo_stack = transform_stack(&self.redo_stack, operation)?;
        self.undo_stack = undo_stack;
        self.redo_stack = redo_stack;
        Ok(())
    }

    /// Pop the newest undo entry and hand it to `callback`.
    ///
    /// The callback is expected to apply the entry and `add` its inverse,
    /// which then lands on the redo stack.
    pub fn perform_undo<T, F>(&mut self, callback: F) -> Result<T>
    where
        F: FnOnce(&mut UndoManager, WrappedOperation) -> T,
    {
        let entry = self
            .undo_stack
            .pop_back()
            .ok_or(HistoryError::EmptyStack(StackKind::Undo))?;

        self.state = UndoState::Undoing;
        let result = callback(self, entry);
        self.state = UndoState::Normal;
        Ok(result)
    }

    /// Pop the newest redo entry and hand it to `callback`.
    ///
    /// The callback is expected to apply the entry and `add` its inverse,
    /// which then lands on the undo stack.
    pub fn perform_redo<T, F>(&mut self, callback: F) -> Result<T>
    where
        F: FnOnce(&mut UndoManager, WrappedOperation) -> T,
    {
        let entry = self
            .redo_stack
            .pop_back()
            .ok_or(HistoryError::EmptyStack(StackKind::Redo))?;

        self.state = UndoState::Redoing;
        let result = callback(self, entry);
        self.state = UndoState::Normal;
        Ok(result)
    }

    /// Like [`perform_undo`](Self::perform_undo), but the entry is only lent
    /// to `callback` and goes back on the undo stack if it returns an error.
    ///
    /// The callback must finish its fallible work before it `add`s the
    /// inverse.
    pub fn try_perform_undo<T, E, F>(&mut self, callback: F) -> std::result::Result<T, E>
    where
        E: From<HistoryError>,
        F: FnOnce(&mut UndoManager, &WrappedOperation) -> std::result::Result<T, E>,
    {
        self.try_perform(StackKind::Undo, callback)
    }

    /// Like [`perform_redo`](Self::perform_redo), but the entry goes back on
    /// the redo stack if `callback` returns an error.
    pub fn try_perform_redo<T, E, F>(&mut self, callback: F) -> std::result::Result<T, E>
    where
        E: From<HistoryError>,
        F: FnOnce(&mut UndoManager, &WrappedOperation) -> std::result::Result<T, E>,
    {
        self.try_perform(StackKind::Redo, callback)
    }

    fn try_perform<T, E, F>(&mut self, kind: StackKind, callback: F) -> std::result::Result<T, E>
    where
        E: From<HistoryError>,
        F: FnOnce(&mut UndoManager, &WrappedOperation) -> std::result::Result<T, E>,
    {
        let (stack, state) = match kind {
            StackKind::Undo => (&mut self.undo_stack, UndoState::Undoing),
            StackKind::Redo => (&mut self.redo_stack, UndoState::Redoing),
        };
        let entry = stack.pop_back().ok_or(HistoryError::EmptyStack(kind))?;

        self.state = state;
        let result = callback(self, &entry);
        self.state = UndoState::Normal;

        if result.is_err() {
            match kind {
                StackKind::Undo => self.undo_stack.push_back(entry),
                StackKind::Redo => self.redo_stack.push_back(entry),
            }
        }
        result
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn is_undoing(&self) -> bool {
        self.state == UndoState::Undoing
    }

    pub fn is_redoing(&self) -> bool {
        self.state == UndoState::Redoing
    }

    /// Get the undo stack size.
    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    /// Get the redo stack size.
    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    /// Clear both stacks. Not allowed from inside an undo/redo callback.
    pub fn dispose(&mut self) -> Result<()> {
        if self.state != UndoState::Normal {
            return Err(HistoryError::PreconditionViolation(
                "cannot dispose the undo manager while an undo/redo is in progress".to_string(),
            ));
        }
        self.undo_stack.clear();
        self.redo_stack.clear();
        Ok(())
    }
}

fn push_bounded(stack: &mut VecDeque<WrappedOperation>, entry: WrappedOperation, max: usize) {
    stack.push_back(entry);
    while stack.len() > max {
        stack.pop_front();
    }
}

fn transform_stack(
    stack: &VecDeque<WrappedOperation>,
    operation: &Operation,
) -> Result<VecDeque<WrappedOperation>> {
    let mut transformed = VecDeque::with_capacity(stack.len());
    let mut remote = operation.clone();

    for entry in stack.iter().rev() {
        let (entry_prime, remote_prime) = entry.transform_operation(&remote)?;
        if !entry_prime.is_noop() {
            transformed.push_front(entry_prime);
        }
        remote = remote_prime;
    }

    Ok(transformed)
}
