//! Text operations - canonical sequences of retain/insert/delete steps.
//!
//! Applying an operation can be pictured as an imaginary cursor running over
//! the input string: it skips (retains) some characters, deletes some and
//! inserts new text at its current position.
//!
//! Every operation declares two lengths:
//!  - `base_length`: the length of every string it can be applied to
//!  - `target_length`: the length of every string it produces
//!
//! The builder methods keep the op list canonical at all times: adjacent ops
//! of the same kind with equal attributes are merged, and an insert directly
//! following a delete is moved in front of it. Equality is therefore a plain
//! structural comparison.

use crate::attributes::{
    apply_attributes, compose_attributes, insert_attributes, invert_attributes,
    transform_attributes, Attributes,
};
use crate::error::{OtError, Result};
use crate::text_op::{char_len, TextOp};
use std::fmt;

/// An edit to a document of fixed length.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Operation {
    ops: Vec<TextOp>,
    base_length: usize,
    target_length: usize,
}

impl Operation {
    /// Create an empty operation (a no-op on the empty document).
    pub fn new() -> Self {
        Self::default()
    }

    /// The canonical op list.
    pub fn ops(&self) -> &[TextOp] {
        &self.ops
    }

    /// Length of the strings this operation can be applied to.
    pub fn base_length(&self) -> usize {
        self.base_length
    }

    /// Length of the strings this operation produces.
    pub fn target_length(&self) -> usize {
        self.target_length
    }

    // ------------------------------------------------------------------
    // Builders
    // ------------------------------------------------------------------

    /// Skip over `n` characters.
    pub fn retain(&mut self, n: usize) -> &mut Self {
        self.retain_with(n, Attributes::new())
    }

    /// Skip over `n` characters, applying `attributes` to them.
    pub fn retain_with(&mut self, n: usize, attributes: Attributes) -> &mut Self {
        if n == 0 {
            return self;
        }

        self.base_length += n;
        self.target_length += n;

        let merged = match self.ops.last_mut() {
            Some(TextOp::Retain {
                count,
                attributes: prev,
            }) if *prev == attributes => {
                *count += n;
                true
            }
            _ => false,
        };

        if !merged {
            self.ops.push(TextOp::Retain {
                count: n,
                attributes,
            });
        }
        self
    }

    /// Insert `text` at the current position.
    pub fn insert(&mut self, text: impl AsRef<str>) -> &mut Self {
        self.insert_with(text, Attributes::new())
    }

    /// Insert `text` carrying `attributes` at the current position.
    pub fn insert_with(&mut self, text: impl AsRef<str>, attributes: Attributes) -> &mut Self {
        let text = text.as_ref();
        if text.is_empty() {
            return self;
        }

        self.target_length += char_len(text);

        // delete(3).insert("x") and insert("x").delete(3) have the same
        // effect; the insert always goes first so both compare equal.
        let insert_at = match self.ops.last() {
            Some(TextOp::Delete { .. }) => self.ops.len() - 1,
            _ => self.ops.len(),
        };

        let merged = match insert_at.checked_sub(1).and_then(|i| self.ops.get_mut(i)) {
            Some(TextOp::Insert {
                text: prev,
                attributes: prev_attrs,
            }) if *prev_attrs == attributes => {
                prev.push_str(text);
                true
            }
            _ => false,
        };

        if !merged {
            self.ops.insert(
                insert_at,
                TextOp::Insert {
                    text: text.to_string(),
                    attributes,
                },
            );
        }
        self
    }

    /// Delete the next `n` characters.
    pub fn delete(&mut self, n: usize) -> &mut Self {
        if n == 0 {
            return self;
        }

        self.base_length += n;

        match self.ops.last_mut() {
            Some(TextOp::Delete { count }) => *count += n,
            _ => self.ops.push(TextOp::Delete { count: n }),
        }
        self
    }

    /// Delete as many characters as `text` has.
    pub fn delete_str(&mut self, text: &str) -> &mut Self {
        self.delete(char_len(text))
    }

    /// Append a single op through the canonicalizing builders.
    pub fn push(&mut self, op: TextOp) -> &mut Self {
        match op {
            TextOp::Retain { count, attributes } => self.retain_with(count, attributes),
            TextOp::Insert { text, attributes } => self.insert_with(text, attributes),
            TextOp::Delete { count } => self.delete(count),
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// True if applying the operation changes nothing: it only retains,
    /// without attribute changes.
    pub fn is_noop(&self) -> bool {
        self.ops
            .iter()
            .all(|op| op.is_retain() && op.has_empty_attributes())
    }

    /// Whether `other` can follow this operation, i.e. `compose` accepts it.
    pub fn can_merge_with(&self, other: &Operation) -> bool {
        self.target_length == other.base_length
    }

    // ------------------------------------------------------------------
    // Apply / invert
    // ------------------------------------------------------------------

    /// Apply the operation to `input`.
    pub fn apply(&self, input: &str) -> Result<String> {
        let input_length = char_len(input);
        if input_length != self.base_length {
            return Err(OtError::LengthMismatch {
                expected: self.base_length,
                actual: input_length,
            });
        }

        let mut chars = input.chars();
        let mut output = String::with_capacity(input.len());
        let mut consumed = 0;

        for op in &self.ops {
            match op {
                TextOp::Retain { count, .. } => {
                    output.extend(chars.by_ref().take(*count));
                    consumed += count;
                }
                TextOp::Insert { text, .. } => output.push_str(text),
                TextOp::Delete { count } => {
                    chars.by_ref().take(*count).for_each(drop);
                    consumed += count;
                }
            }
        }

        if consumed != input_length {
            return Err(OtError::LengthMismatch {
                expected: input_length,
                actual: consumed,
            });
        }

        Ok(output)
    }

    /// Apply the operation to `input` whose characters carry
    /// `input_attributes` (missing entries count as empty), returning the
    /// output text and the attributes of every output character.
    ///
    /// Retained characters keep their attributes, overridden by the
    /// retain's own (`false` clears a key). Inserted characters get the
    /// insert's attributes.
    pub fn apply_with_attributes(
        &self,
        input: &str,
        input_attributes: &[Attributes],
    ) -> Result<(String, Vec<Attributes>)> {
        let input_length = char_len(input);
        if input_length != self.base_length {
            return Err(OtError::LengthMismatch {
                expected: self.base_length,
                actual: input_length,
            });
        }

        let empty = Attributes::new();
        let mut chars = input.chars();
        let mut position = 0;
        let mut output = String::with_capacity(input.len());
        let mut output_attributes = Vec::with_capacity(self.target_length);

        for op in &self.ops {
            match op {
                TextOp::Retain { count, attributes } => {
                    for ch in chars.by_ref().take(*count) {
                        let current = input_attributes.get(position).unwrap_or(&empty);
                        output.push(ch);
                        output_attributes.push(apply_attributes(current, attributes));
                        position += 1;
                    }
                }
                TextOp::Insert { text, attributes } => {
                    output.push_str(text);
                    let inserted = insert_attributes(attributes);
                    output_attributes.extend(std::iter::repeat(inserted).take(char_len(text)));
                }
                TextOp::Delete { count } => {
                    position += chars.by_ref().take(*count).count();
                }
            }
        }

        if position != input_length {
            return Err(OtError::LengthMismatch {
                expected: input_length,
                actual: position,
            });
        }

        Ok((output, output_attributes))
    }

    /// Compute the operation that undoes this one, given the content this
    /// operation was applied to (not its result).
    ///
    /// Retains keep their own attributes: this primitive has no knowledge of
    /// the attributes the text had before, so an attribute-only change is not
    /// reverted. Callers that track attribute spans should use
    /// [`invert_with_attributes`](Self::invert_with_attributes).
    pub fn invert(&self, content: &str) -> Result<Operation> {
        let content_length = char_len(content);
        if content_length != self.base_length {
            return Err(OtError::LengthMismatch {
                expected: self.base_length,
                actual: content_length,
            });
        }

        let mut chars = content.chars();
        let mut inverse = Operation::new();

        for op in &self.ops {
            match op {
                TextOp::Retain { count, attributes } => {
                    inverse.retain_with(*count, attributes.clone());
                    chars.by_ref().take(*count).for_each(drop);
                }
                TextOp::Insert { text, .. } => {
                    inverse.delete(char_len(text));
                }
                TextOp::Delete { count } => {
                    let deleted: String = chars.by_ref().take(*count).collect();
                    inverse.insert(deleted);
                }
            }
        }

        Ok(inverse)
    }

    /// Full inverse for callers that know the attributes of every character
    /// of `content`.
    ///
    /// Deleted text is re-inserted with its recorded attributes, and every
    /// attribute changed by a retain is restored to its previous value (or
    /// cleared if it was absent).
    pub fn invert_with_attributes(
        &self,
        content: &str,
        content_attributes: &[Attributes],
    ) -> Result<Operation> {
        let content_length = char_len(content);
        if content_length != self.base_length {
            return Err(OtError::LengthMismatch {
                expected: self.base_length,
                actual: content_length,
            });
        }

        let empty = Attributes::new();
        let mut chars = content.chars();
        let mut position = 0;
        let mut inverse = Operation::new();

        for op in &self.ops {
            match op {
                TextOp::Retain { count, attributes } if attributes.is_empty() => {
                    inverse.retain(*count);
                    chars.by_ref().take(*count).for_each(drop);
                    position += count;
                }
                TextOp::Retain { count, attributes } => {
                    for _ in chars.by_ref().take(*count) {
                        let before = content_attributes.get(position).unwrap_or(&empty);
                        inverse.retain_with(1, invert_attributes(before, attributes));
                        position += 1;
                    }
                }
                TextOp::Insert { text, .. } => {
                    inverse.delete(char_len(text));
                }
                TextOp::Delete { count } => {
                    for ch in chars.by_ref().take(*count) {
                        let before = content_attributes.get(position).unwrap_or(&empty);
                        let mut buf = [0u8; 4];
                        inverse.insert_with(ch.encode_utf8(&mut buf), before.clone());
                        position += 1;
                    }
                }
            }
        }

        Ok(inverse)
    }

    // ------------------------------------------------------------------
    // Compose / transform
    // ------------------------------------------------------------------

    /// Combine this operation with `other`, which must apply to this
    /// operation's output, into one operation with the same effect:
    /// `apply(S, a.compose(b)) == apply(apply(S, a), b)`.
    pub fn compose(&self, other: &Operation) -> Result<Operation> {
        if !self.can_merge_with(other) {
            return Err(OtError::IncompatibleLengths {
                left: self.target_length,
                right: other.base_length,
            });
        }

        let mut composed = Operation::new();
        let mut ops1 = self.ops.iter().cloned();
        let mut ops2 = other.ops.iter().cloned();
        let mut op1 = ops1.next();
        let mut op2 = ops2.next();

        loop {
            match (op1.take(), op2.take()) {
                (None, None) => break,
                // Deletes of the first operation always survive.
                (Some(TextOp::Delete { count }), b) => {
                    composed.delete(count);
                    op1 = ops1.next();
                    op2 = b;
                }
                // Inserts of the second operation always survive.
                (a, Some(TextOp::Insert { text, attributes })) => {
                    composed.insert_with(text, attributes);
                    op1 = a;
                    op2 = ops2.next();
                }
                (None, Some(b)) => {
                    return Err(OtError::MalformedOperationSequence(format!(
                        "cannot compose: first operation is too short at {}",
                        b
                    )));
                }
                (Some(a), None) => {
                    return Err(OtError::MalformedOperationSequence(format!(
                        "cannot compose: first operation is too long at {}",
                        a
                    )));
                }
                (Some(a), Some(b)) => {
                    let n = a.len().min(b.len());
                    let (a_head, a_rest) = a.split(n);
                    let (b_head, b_rest) = b.split(n);

                    match (a_head, b_head) {
                        (
                            TextOp::Retain {
                                attributes: first, ..
                            },
                            TextOp::Retain {
                                attributes: second, ..
                            },
                        ) => {
                            composed.retain_with(n, compose_attributes(&first, &second, false));
                        }
                        (TextOp::Insert { .. }, TextOp::Delete { .. }) => {}
                        (
                            TextOp::Insert { text, attributes },
                            TextOp::Retain {
                                attributes: second, ..
                            },
                        ) => {
                            composed.insert_with(
                                text,
                                compose_attributes(&attributes, &second, true),
                            );
                        }
                        (TextOp::Retain { .. }, TextOp::Delete { .. }) => {
                            composed.delete(n);
                        }
                        (a, b) => {
                            return Err(OtError::MalformedOperationSequence(format!(
                                "cannot compose {} with {}",
                                a, b
                            )));
                        }
                    }

                    op1 = a_rest.or_else(|| ops1.next());
                    op2 = b_rest.or_else(|| ops2.next());
                }
            }
        }

        Ok(composed)
    }

    /// Transform two concurrent operations on the same document into
    /// `(self', other')` such that
    /// `apply(apply(S, self), other') == apply(apply(S, other), self')`.
    ///
    /// Ties are broken in favour of `self`: concurrent inserts at the same
    /// position place `self`'s text first, and when both sides set the same
    /// attribute to different values on the same span, only `self'` keeps
    /// its value.
    pub fn transform(&self, other: &Operation) -> Result<(Operation, Operation)> {
        if self.base_length != other.base_length {
            return Err(OtError::IncompatibleLengths {
                left: self.base_length,
                right: other.base_length,
            });
        }

        let mut self_prime = Operation::new();
        let mut other_prime = Operation::new();
        let mut ops1 = self.ops.iter().cloned();
        let mut ops2 = other.ops.iter().cloned();
        let mut op1 = ops1.next();
        let mut op2 = ops2.next();

        loop {
            match (op1.take(), op2.take()) {
                (None, None) => break,
                (Some(TextOp::Insert { text, attributes }), b) => {
                    other_prime.retain_with(char_len(&text), attributes.clone());
                    self_prime.insert_with(text, attributes);
                    op1 = ops1.next();
                    op2 = b;
                }
                (a, Some(TextOp::Insert { text, attributes })) => {
                    self_prime.retain_with(char_len(&text), attributes.clone());
                    other_prime.insert_with(text, attributes);
                    op1 = a;
                    op2 = ops2.next();
                }
                (None, Some(b)) => {
                    return Err(OtError::MalformedOperationSequence(format!(
                        "cannot transform: first operation is too short at {}",
                        b
                    )));
                }
                (Some(a), None) => {
                    return Err(OtError::MalformedOperationSequence(format!(
                        "cannot transform: first operation is too long at {}",
                        a
                    )));
                }
                (Some(a), Some(b)) => {
                    let n = a.len().min(b.len());
                    let (a_head, a_rest) = a.split(n);
                    let (b_head, b_rest) = b.split(n);

                    match (a_head, b_head) {
                        (
                            TextOp::Retain {
                                attributes: left, ..
                            },
                            TextOp::Retain {
                                attributes: right, ..
                            },
                        ) => {
                            let (left_prime, right_prime) = transform_attributes(&left, &right);
                            self_prime.retain_with(n, left_prime);
                            other_prime.retain_with(n, right_prime);
                        }
                        // Both delete the same text; nothing left to do.
                        (TextOp::Delete { .. }, TextOp::Delete { .. }) => {}
                        (TextOp::Delete { .. }, TextOp::Retain { .. }) => {
                            self_prime.delete(n);
                        }
                        (TextOp::Retain { .. }, TextOp::Delete { .. }) => {
                            other_prime.delete(n);
                        }
                        (a, b) => {
                            return Err(OtError::MalformedOperationSequence(format!(
                                "cannot transform {} against {}",
                                a, b
                            )));
                        }
                    }

                    op1 = a_rest.or_else(|| ops1.next());
                    op2 = b_rest.or_else(|| ops2.next());
                }
            }
        }

        Ok((self_prime, other_prime))
    }

    // ------------------------------------------------------------------
    // Undo coalescing heuristics
    // ------------------------------------------------------------------

    /// The single non-trivial op of a "simple" operation: one op, optionally
    /// surrounded by retains.
    fn simple_op(&self) -> Option<&TextOp> {
        match self.ops.as_slice() {
            [op] => Some(op),
            [first, second] if first.is_retain() => Some(second),
            [first, second] if second.is_retain() => Some(first),
            [first, op, last] if first.is_retain() && last.is_retain() => Some(op),
            _ => None,
        }
    }

    /// Index at which the operation starts changing the document.
    fn start_index(&self) -> usize {
        match self.ops.first() {
            Some(TextOp::Retain { count, .. }) => *count,
            _ => 0,
        }
    }

    /// Whether `other`, typed right after this operation, should be merged
    /// with it into a single undo step: consecutive typing, or consecutive
    /// backspace / forward-delete presses.
    pub fn should_be_composed_with(&self, other: &Operation) -> bool {
        if self.is_noop() || other.is_noop() {
            return true;
        }

        let start_a = self.start_index();
        let start_b = other.start_index();

        match (self.simple_op(), other.simple_op()) {
            (Some(TextOp::Insert { text, .. }), Some(TextOp::Insert { .. })) => {
                start_a + char_len(text) == start_b
            }
            (Some(TextOp::Delete { .. }), Some(TextOp::Delete { count })) => {
                start_b + count == start_a || start_a == start_b
            }
            _ => false,
        }
    }

    /// Same as [`should_be_composed_with`](Self::should_be_composed_with),
    /// but for inverse operations as they sit on an undo stack.
    pub fn should_be_composed_with_inverted(&self, other: &Operation) -> bool {
        if self.is_noop() || other.is_noop() {
            return true;
        }

        let start_a = self.start_index();
        let start_b = other.start_index();

        match (self.simple_op(), other.simple_op()) {
            (Some(TextOp::Insert { text, .. }), Some(TextOp::Insert { .. })) => {
                start_a + char_len(text) == start_b || start_a == start_b
            }
            (Some(TextOp::Delete { .. }), Some(TextOp::Delete { count })) => {
                start_b + count == start_a
            }
            _ => false,
        }
    }
}

impl FromIterator<TextOp> for Operation {
    fn from_iter<I: IntoIterator<Item = TextOp>>(iter: I) -> Self {
        let mut operation = Operation::new();
        for op in iter {
            operation.push(op);
        }
        operation
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, op) in self.ops.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", op)?;
        }
        Ok(())
    }
}
