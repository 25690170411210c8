//! Compact JSON form of an [`Operation`].
//!
//! An operation is a flat array: a positive integer is a retain, a negative
//! integer a delete and a string an insert. A non-empty attributes object
//! directly precedes the retain or insert it belongs to. The empty operation
//! is written as `[0]` so storage layers that drop empty arrays keep it.
//!
//! ```
//! use ot_core::Operation;
//!
//! let op = Operation::from_json(serde_json::json!([5, {"bold": true}, "hi", -2])).unwrap();
//! assert_eq!(op.base_length(), 7);
//! assert_eq!(op.to_json(), serde_json::json!([5, {"bold": true}, "hi", -2]));
//! ```

use crate::attributes::Attributes;
use crate::error::{OtError, Result};
use crate::operation::Operation;
use crate::text_op::TextOp;
use serde::de::Error as _;
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// One element of the flat array.
#[derive(Deserialize)]
#[serde(untagged)]
enum JsonElement {
    Count(i64),
    Text(String),
    Attributes(Attributes),
}

impl Serialize for Operation {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        if self.ops().is_empty() {
            let mut seq = serializer.serialize_seq(Some(1))?;
            seq.serialize_element(&0)?;
            return seq.end();
        }

        let mut seq = serializer.serialize_seq(None)?;
        for op in self.ops() {
            if let Some(attributes) = op.attributes().filter(|a| !a.is_empty()) {
                seq.serialize_element(attributes)?;
            }
            match op {
                TextOp::Retain { count, .. } => seq.serialize_element(count)?,
                TextOp::Insert { text, .. } => seq.serialize_element(text)?,
                TextOp::Delete { count } => seq.serialize_element(&-(*count as i64))?,
            }
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for Operation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let elements = Vec::<JsonElement>::deserialize(deserializer)?;
        from_elements(elements).map_err(D::Error::custom)
    }
}

fn from_elements(elements: Vec<JsonElement>) -> Result<Operation> {
    let mut operation = Operation::new();
    let mut pending = Attributes::new();
    let mut base_length = 0usize;
    let mut target_length = 0usize;

    for element in elements {
        match element {
            JsonElement::Attributes(attributes) => pending = attributes,
            JsonElement::Text(text) => {
                target_length = grow(target_length, text.chars().count())?;
                operation.insert_with(text, std::mem::take(&mut pending));
            }
            JsonElement::Count(n) if n < 0 => {
                if !pending.is_empty() {
                    return Err(OtError::InvalidJson(format!(
                        "delete {} cannot carry attributes",
                        n.unsigned_abs()
                    )));
                }
                let count = to_count(n.unsigned_abs())?;
                base_length = grow(base_length, count)?;
                operation.delete(count);
            }
            JsonElement::Count(n) => {
                let count = to_count(n.unsigned_abs())?;
                base_length = grow(base_length, count)?;
                target_length = grow(target_length, count)?;
                operation.retain_with(count, std::mem::take(&mut pending));
            }
        }
    }

    Ok(operation)
}

fn to_count(n: u64) -> Result<usize> {
    usize::try_from(n).map_err(|_| OtError::InvalidJson(format!("count {} is too large", n)))
}

fn grow(length: usize, by: usize) -> Result<usize> {
    length
        .checked_add(by)
        .ok_or_else(|| OtError::InvalidJson("operation length overflows".into()))
}

impl Operation {
    /// Encode into the flat JSON array form.
    pub fn to_json(&self) -> serde_json::Value {
        let mut elements = Vec::with_capacity(self.ops().len() + 1);
        for op in self.ops() {
            if let Some(attributes) = op.attributes().filter(|a| !a.is_empty()) {
                elements.push(serde_json::json!(attributes));
            }
            elements.push(match op {
                TextOp::Retain { count, .. } => serde_json::json!(count),
                TextOp::Insert { text, .. } => serde_json::json!(text),
                TextOp::Delete { count } => serde_json::json!(-(*count as i64)),
            });
        }
        if elements.is_empty() {
            elements.push(serde_json::json!(0));
        }
        serde_json::Value::Array(elements)
    }

    /// Decode from the flat JSON array form.
    ///
    /// Non-integer numbers, nested arrays and nulls are rejected, as are
    /// counts whose running base or target length would overflow `usize`.
    ///
    /// Attributes in front of a delete are rejected with
    /// [`OtError::InvalidJson`] instead of being dropped; a delete has nothing
    /// to format, so such input is treated as corrupt. Trailing attributes
    /// with no op to attach to are ignored.
    pub fn from_json(value: serde_json::Value) -> Result<Operation> {
        let elements: Vec<JsonElement> = serde_json::from_value(value)?;
        from_elements(elements)
    }
}
