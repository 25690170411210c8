//! The primitive steps an [`Operation`](crate::Operation) is made of.
//!
//! Lengths are counted in `char`s (Unicode scalar values), never in bytes.

use crate::attributes::Attributes;
use std::fmt;

/// A single retain, insert or delete step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TextOp {
    /// Keep `count` characters, optionally changing their attributes.
    Retain { count: usize, attributes: Attributes },
    /// Insert `text` carrying `attributes`.
    Insert { text: String, attributes: Attributes },
    /// Remove the next `count` characters.
    Delete { count: usize },
}

impl TextOp {
    pub fn is_retain(&self) -> bool {
        matches!(self, TextOp::Retain { .. })
    }

    pub fn is_insert(&self) -> bool {
        matches!(self, TextOp::Insert { .. })
    }

    pub fn is_delete(&self) -> bool {
        matches!(self, TextOp::Delete { .. })
    }

    /// Number of characters this op covers: retained, inserted or deleted.
    pub fn len(&self) -> usize {
        match self {
            TextOp::Retain { count, .. } | TextOp::Delete { count } => *count,
            TextOp::Insert { text, .. } => char_len(text),
        }
    }

    /// Whether the op covers no characters at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The op's attributes. Deletes never carry any.
    pub fn attributes(&self) -> Option<&Attributes> {
        match self {
            TextOp::Retain { attributes, .. } | TextOp::Insert { attributes, .. } => {
                Some(attributes)
            }
            TextOp::Delete { .. } => None,
        }
    }

    /// Whether the op has no attributes (always true for deletes).
    pub fn has_empty_attributes(&self) -> bool {
        self.attributes().map_or(true, |a| a.is_empty())
    }

    /// Split into the first `n` characters and the remainder, if any.
    pub(crate) fn split(self, n: usize) -> (TextOp, Option<TextOp>) {
        let len = self.len();
        if n >= len {
            return (self, None);
        }
        match self {
            TextOp::Retain { count, attributes } => (
                TextOp::Retain {
                    count: n,
                    attributes: attributes.clone(),
                },
                Some(TextOp::Retain {
                    count: count - n,
                    attributes,
                }),
            ),
            TextOp::Insert { text, attributes } => {
                let (head, tail) = split_chars(&text, n);
                (
                    TextOp::Insert {
                        text: head.to_string(),
                        attributes: attributes.clone(),
                    },
                    Some(TextOp::Insert {
                        text: tail.to_string(),
                        attributes,
                    }),
                )
            }
            TextOp::Delete { count } => (
                TextOp::Delete { count: n },
                Some(TextOp::Delete { count: count - n }),
            ),
        }
    }
}

impl fmt::Display for TextOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextOp::Retain { count, .. } => write!(f, "Retain {}", count)?,
            TextOp::Insert { text, .. } => write!(f, "Insert {:?}", text)?,
            TextOp::Delete { count } => write!(f, "Delete {}", count)?,
        }
        if let Some(attributes) = self.attributes().filter(|a| !a.is_empty()) {
            let rendered: Vec<String> = attributes
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            write!(f, " {{{}}}", rendered.join(", "))?;
        }
        Ok(())
    }
}

/// Length of `s` in chars.
pub(crate) fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Split `s` after its first `n` chars.
pub(crate) fn split_chars(s: &str, n: usize) -> (&str, &str) {
    match s.char_indices().nth(n) {
        Some((idx, _)) => s.split_at(idx),
        None => (s, ""),
    }
}
