//! Formatting attributes carried by retain and insert ops.
//!
//! An attribute map says which formatting keys an op sets. A key mapped to
//! `false` explicitly clears that key, while an absent key means the op has
//! no opinion about it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single attribute value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Number(serde_json::Number),
    String(String),
}

impl AttributeValue {
    /// The sentinel that removes a key when applied.
    pub const CLEAR: AttributeValue = AttributeValue::Bool(false);

    /// Whether this value is the explicit "clear" sentinel.
    pub fn is_clear(&self) -> bool {
        matches!(self, AttributeValue::Bool(false))
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Number(value.into())
    }
}

impl From<u64> for AttributeValue {
    fn from(value: u64) -> Self {
        AttributeValue::Number(value.into())
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::String(value)
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Bool(b) => write!(f, "{}", b),
            AttributeValue::Number(n) => write!(f, "{}", n),
            AttributeValue::String(s) => write!(f, "{:?}", s),
        }
    }
}

/// Attribute map keyed by attribute name. Ordered so that equality and
/// serialization are deterministic.
pub type Attributes = BTreeMap<String, AttributeValue>;

/// Build an attribute map from `(key, value)` pairs.
///
/// ```
/// use ot_core::attributes::{attrs, AttributeValue};
///
/// let bold = attrs([("bold", true)]);
/// assert_eq!(bold.get("bold"), Some(&AttributeValue::Bool(true)));
/// ```
pub fn attrs<K, V, I>(pairs: I) -> Attributes
where
    K: Into<String>,
    V: Into<AttributeValue>,
    I: IntoIterator<Item = (K, V)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// Merge the attributes of two sequential ops (`first` then `second`).
///
/// `second` overlays `first`. When `first` belongs to an insert, a `false`
/// in `second` removes the key instead of being kept, so freshly inserted
/// text never carries a dangling clear marker.
pub fn compose_attributes(
    first: &Attributes,
    second: &Attributes,
    first_is_insert: bool,
) -> Attributes {
    let mut merged = first.clone();
    for (key, value) in second {
        if first_is_insert && value.is_clear() {
            merged.remove(key);
        } else {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged
}

/// Transform the attributes of two concurrent retains over the same span.
///
/// A key touched by one side only passes through to that side. A key set to
/// the same value by both sides is dropped from both. A key set differently
/// by both sides is kept on the left side only, so the left operand wins.
pub fn transform_attributes(left: &Attributes, right: &Attributes) -> (Attributes, Attributes) {
    let mut left_prime = Attributes::new();
    let mut right_prime = Attributes::new();

    for (key, value) in left {
        match right.get(key) {
            None => {
                left_prime.insert(key.clone(), value.clone());
            }
            Some(other) if other == value => {}
            Some(_) => {
                left_prime.insert(key.clone(), value.clone());
            }
        }
    }

    for (key, value) in right {
        if !left.contains_key(key) {
            right_prime.insert(key.clone(), value.clone());
        }
    }

    (left_prime, right_prime)
}

/// Apply a retain's attributes to one character's current attributes.
pub(crate) fn apply_attributes(current: &Attributes, changes: &Attributes) -> Attributes {
    let mut updated = current.clone();
    for (key, value) in changes {
        if value.is_clear() {
            updated.remove(key);
        } else {
            updated.insert(key.clone(), value.clone());
        }
    }
    updated
}

/// Attributes recorded for a freshly inserted character. Clear markers have
/// nothing to clear on new text and are left out.
pub(crate) fn insert_attributes(changes: &Attributes) -> Attributes {
    changes
        .iter()
        .filter(|(_, value)| !value.is_clear())
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// The attribute changes that restore `before` after `changes` were applied
/// to it. Keys that were absent before are cleared.
pub(crate) fn invert_attributes(before: &Attributes, changes: &Attributes) -> Attributes {
    changes
        .keys()
        .map(|key| {
            let restored = before.get(key).cloned().unwrap_or(AttributeValue::CLEAR);
            (key.clone(), restored)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_overlays_second() {
        let first = attrs([("bold", true)]);
        let second = attrs([("bold", AttributeValue::CLEAR), ("color", "red".into())]);

        let merged = compose_attributes(&first, &second, false);
        assert_eq!(merged.get("bold"), Some(&AttributeValue::CLEAR));
        assert_eq!(merged.get("color"), Some(&AttributeValue::from("red")));
    }

    #[test]
    fn test_compose_onto_insert_drops_clear() {
        let first = attrs([("bold", true), ("italic", true)]);
        let second = attrs([("bold", false)]);

        let merged = compose_attributes(&first, &second, true);
        assert!(!merged.contains_key("bold"));
        assert_eq!(merged.get("italic"), Some(&AttributeValue::Bool(true)));
    }

    #[test]
    fn test_transform_rules() {
        let left = attrs([
            ("only_left", AttributeValue::from(true)),
            ("same", AttributeValue::from("x")),
            ("conflict", AttributeValue::from("left")),
        ]);
        let right = attrs([
            ("only_right", AttributeValue::from(1i64)),
            ("same", AttributeValue::from("x")),
            ("conflict", AttributeValue::from("right")),
        ]);

        let (l, r) = transform_attributes(&left, &right);

        assert_eq!(
            l,
            attrs([
                ("conflict", AttributeValue::from("left")),
                ("only_left", AttributeValue::from(true)),
            ])
        );
        assert_eq!(r, attrs([("only_right", 1i64)]));
    }

    #[test]
    fn test_apply_and_invert() {
        let before = attrs([("bold", true)]);
        let changes = attrs([("bold", AttributeValue::CLEAR), ("size", 12i64.into())]);

        let after = apply_attributes(&before, &changes);
        assert_eq!(after, attrs([("size", 12i64)]));

        let inverse = invert_attributes(&before, &changes);
        assert_eq!(apply_attributes(&after, &inverse), before);
    }

    #[test]
    fn test_untagged_json() {
        let parsed: Attributes =
            serde_json::from_str(r#"{"b":true,"size":3,"font":"mono"}"#).unwrap();
        assert_eq!(parsed.get("b"), Some(&AttributeValue::Bool(true)));
        assert_eq!(parsed.get("size"), Some(&AttributeValue::from(3i64)));
        assert_eq!(parsed.get("font"), Some(&AttributeValue::from("mono")));
    }
}
