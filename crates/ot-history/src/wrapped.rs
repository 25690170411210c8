//! Operations bundled with their cursor metadata.

use crate::meta::OperationMeta;
use ot_core::{Cursor, Operation, OperationalTransform};

/// An [`Operation`] carrying optional [`OperationMeta`].
///
/// Behaves exactly like the inner operation; the metadata is composed,
/// transformed and inverted alongside it. Two wrapped operations are equal
/// when their operations are equal, whatever their metadata.
#[derive(Clone, Debug, Default)]
pub struct WrappedOperation {
    operation: Operation,
    meta: Option<OperationMeta>,
}

impl WrappedOperation {
    pub fn new(operation: Operation, meta: Option<OperationMeta>) -> Self {
        Self { operation, meta }
    }

    pub fn operation(&self) -> &Operation {
        &self.operation
    }

    pub fn into_operation(self) -> Operation {
        self.operation
    }

    pub fn meta(&self) -> Option<&OperationMeta> {
        self.meta.as_ref()
    }

    /// The cursor to restore after applying this operation, if recorded.
    pub fn cursor(&self) -> Option<Cursor> {
        self.meta.and_then(|m| m.cursor())
    }

    fn compose_meta(&self, other: &WrappedOperation) -> Option<OperationMeta> {
        match (&self.meta, &other.meta) {
            (Some(mine), Some(theirs)) => Some(mine.compose(theirs)),
            (Some(mine), None) => Some(*mine),
            (None, theirs) => *theirs,
        }
    }

    /// Transform against a plain concurrent operation, returning this
    /// operation's counterpart and the other operation moved past it.
    pub fn transform_operation(
        &self,
        other: &Operation,
    ) -> ot_core::Result<(WrappedOperation, Operation)> {
        let (pair0, pair1) = self.operation.transform(other)?;
        let meta = self.meta.map(|m| m.transform(other));
        Ok((WrappedOperation::new(pair0, meta), pair1))
    }

    pub fn should_be_composed_with(&self, other: &WrappedOperation) -> bool {
        self.operation.should_be_composed_with(&other.operation)
    }

    pub fn should_be_composed_with_inverted(&self, other: &WrappedOperation) -> bool {
        self.operation
            .should_be_composed_with_inverted(&other.operation)
    }
}

impl From<Operation> for WrappedOperation {
    fn from(operation: Operation) -> Self {
        Self::new(operation, None)
    }
}

impl PartialEq for WrappedOperation {
    fn eq(&self, other: &Self) -> bool {
        self.operation == other.operation
    }
}

impl Eq for WrappedOperation {}

impl OperationalTransform for WrappedOperation {
    fn compose(&self, other: &Self) -> ot_core::Result<Self> {
        Ok(WrappedOperation::new(
            self.operation.compose(&other.operation)?,
            self.compose_meta(other),
        ))
    }

    fn transform(&self, other: &Self) -> ot_core::Result<(Self, Self)> {
        let (pair0, pair1) = self.operation.transform(&other.operation)?;
        Ok((
            WrappedOperation::new(pair0, self.meta.map(|m| m.transform(&other.operation))),
            WrappedOperation::new(pair1, other.meta.map(|m| m.transform(&self.operation))),
        ))
    }

    fn invert(&self, content: &str) -> ot_core::Result<Self> {
        Ok(WrappedOperation::new(
            self.operation.invert(content)?,
            self.meta.map(|m| m.invert()),
        ))
    }

    fn apply(&self, content: &str) -> ot_core::Result<String> {
        self.operation.apply(content)
    }

    fn is_noop(&self) -> bool {
        self.operation.is_noop()
    }

    fn can_merge_with(&self, other: &Self) -> bool {
        self.operation.can_merge_with(&other.operation)
    }
}
