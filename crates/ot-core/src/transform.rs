//! The operational-transform trait - what the sync and history layers need
//! from an operation type.
//!
//! For any implementation and a document `S`:
//!  - Compose: `apply(S, a.compose(b)) == apply(apply(S, a), b)`
//! - Transform: with `(a', b') = a.transform(b)`,
//!   `apply(apply(S, a), b') == apply(apply(S, b), a')`
//!  - Invert: `apply(apply(S, a), a.invert(S)) == S`

use crate::error::Result;
use crate::operation::Operation;

/// An operation type that can be composed, transformed and inverted.
///
/// The client state machine is generic over this trait so that it can carry
/// plain [`Operation`]s as well as operations wrapped with cursor metadata.
pub trait OperationalTransform: Clone + PartialEq {
    /// Sequential composition: `self` followed by `other`.
    fn compose(&self, other: &Self) -> Result<Self>;

    /// Transform two concurrent operations against each other.
    /// `self` wins ties.
    fn transform(&self, other: &Self) -> Result<(Self, Self)>;

    /// The operation undoing `self`, given the document it applies to.
    fn invert(&self, content: &str) -> Result<Self>;

    /// Apply to a document.
    fn apply(&self, content: &str) -> Result<String>;

    /// Whether applying the operation changes nothing.
    fn is_noop(&self) -> bool;

    /// Whether `other` can follow `self` in a composition.
    fn can_merge_with(&self, other: &Self) -> bool;
}

impl OperationalTransform for Operation {
    fn compose(&self, other: &Self) -> Result<Self> {
        Operation::compose(self, other)
    }

    fn transform(&self, other: &Self) -> Result<(Self, Self)> {
        Operation::transform(self, other)
    }

    fn invert(&self, content: &str) -> Result<Self> {
        Operation::invert(self, content)
    }

    fn apply(&self, content: &str) -> Result<String> {
        Operation::apply(self, content)
    }

    fn is_noop(&self) -> bool {
        Operation::is_noop(self)
    }

    fn can_merge_with(&self, other: &Self) -> bool {
        Operation::can_merge_with(self, other)
    }
}
