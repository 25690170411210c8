//! Cursor state recorded alongside an operation.

use ot_core::{Cursor, Operation};
use serde::{Deserialize, Serialize};

/// Where the local cursor was before and after an edit.
///
/// Travels with the edit through compose, transform and invert so that
/// undoing it can put the cursor back where the user expects.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationMeta {
    pub cursor_before: Option<Cursor>,
    pub cursor_after: Option<Cursor>,
}

impl OperationMeta {
    pub fn new(cursor_before: Option<Cursor>, cursor_after: Option<Cursor>) -> Self {
        Self {
            cursor_before,
            cursor_after,
        }
    }

    /// Metadata of the inverse edit: before and after swap.
    pub fn invert(&self) -> Self {
        Self::new(self.cursor_after, self.cursor_before)
    }

    /// Metadata of `self` followed by `other`.
    pub fn compose(&self, other: &OperationMeta) -> Self {
        Self::new(self.cursor_before, other.cursor_after)
    }

    /// Move both cursors through a concurrent operation.
    pub fn transform(&self, operation: &Operation) -> Self {
        Self::new(
            self.cursor_before.map(|c| c.transform(operation)),
            self.cursor_after.map(|c| c.transform(operation)),
        )
    }

    /// The cursor to restore once the edit has been applied.
    pub fn cursor(&self) -> Option<Cursor> {
        self.cursor_after
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invert_swaps() {
        let meta = OperationMeta::new(Some(Cursor::collapsed(1)), Some(Cursor::collapsed(4)));
        let inverted = meta.invert();

        assert_eq!(inverted.cursor_before, Some(Cursor::collapsed(4)));
        assert_eq!(inverted.cursor(), Some(Cursor::collapsed(1)));
    }

    #[test]
    fn test_compose_keeps_outer_cursors() {
        let first = OperationMeta::new(Some(Cursor::collapsed(0)), Some(Cursor::collapsed(1)));
        let second = OperationMeta::new(Some(Cursor::collapsed(1)), Some(Cursor::collapsed(2)));

        assert_eq!(
            first.compose(&second),
            OperationMeta::new(Some(Cursor::collapsed(0)), Some(Cursor::collapsed(2)))
        );
    }

    #[test]
    fn test_transform_moves_both() {
        let mut op = Operation::new();
        op.insert("ab").retain(5);

        let meta = OperationMeta::new(Some(Cursor::collapsed(1)), None);
        let moved = meta.transform(&op);

        assert_eq!(moved.cursor_before, Some(Cursor::collapsed(3)));
        assert_eq!(moved.cursor_after, None);
    }

    #[test]
    fn test_json_form() {
        let meta = OperationMeta::new(None, Some(Cursor::new(2, 3)));
        let json = serde_json::to_value(meta).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "cursorBefore": null,
                "cursorAfter": {"position": 2, "selectionEnd": 3}
            })
        );
    }
}
