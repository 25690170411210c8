//! Cursor and selection positions, kept in sync with operations.

use crate::operation::Operation;
use crate::text_op::{char_len, TextOp};
use serde::{Deserialize, Serialize};

/// A caret or a selection inside a document.
///
/// `position == selection_end` means a plain caret. Otherwise `position` is
/// the end of the selection that moves when the user presses an arrow key.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cursor {
    pub position: usize,
    pub selection_end: usize,
}

impl Cursor {
    pub fn new(position: usize, selection_end: usize) -> Self {
        Self {
            position,
            selection_end,
        }
    }

    /// A caret with nothing selected.
    pub fn collapsed(position: usize) -> Self {
        Self::new(position, position)
    }

    pub fn is_collapsed(&self) -> bool {
        self.position == self.selection_end
    }

    /// Lower and upper bound of the selection, regardless of direction.
    pub fn range(&self) -> (usize, usize) {
        (
            self.position.min(self.selection_end),
            self.position.max(self.selection_end),
        )
    }

    /// Combine with a later cursor update. The later one always wins.
    pub fn compose(&self, other: &Cursor) -> Cursor {
        *other
    }

    /// Move the cursor through `operation`.
    ///
    /// Inserts before the cursor push it forward, including an insert exactly
    /// at the cursor index. Deletes before it pull it back, and a delete
    /// spanning the cursor collapses it onto the start of the deleted range.
    pub fn transform(&self, operation: &Operation) -> Cursor {
        let position = transform_index(operation, self.position);
        if self.is_collapsed() {
            return Cursor::collapsed(position);
        }
        Cursor::new(position, transform_index(operation, self.selection_end))
    }
}

fn transform_index(operation: &Operation, index: usize) -> usize {
    let mut remaining = index as isize;
    let mut new_index = index as isize;

    for op in operation.ops() {
        match op {
            TextOp::Retain { count, .. } => remaining -= *count as isize,
            TextOp::Insert { text, .. } => new_index += char_len(text) as isize,
            TextOp::Delete { count } => {
                new_index -= remaining.min(*count as isize);
                remaining -= *count as isize;
            }
        }
        if remaining < 0 {
            break;
        }
    }

    new_index.max(0) as usize
}
