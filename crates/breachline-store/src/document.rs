//! Document keys, field paths, snapshots, and sparse updates.

use std::fmt;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::StoreError;

// ---------------------------------------------------------------------------
// DocKey
// ---------------------------------------------------------------------------

/// Identifies one document: a collection name plus a document id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocKey {
    collection: String,
    id: String,
}

impl DocKey {
    pub fn new(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for DocKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

// ---------------------------------------------------------------------------
// FieldPath
// ---------------------------------------------------------------------------

/// A path to a (possibly nested) field, e.g. `gameData.<uid>.loadout`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath(Vec<String>);

impl FieldPath {
    /// Builds a path from its segments.
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// A top-level field.
    pub fn field(name: impl Into<String>) -> Self {
        Self(vec![name.into()])
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// A document as read at one version.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub key: DocKey,
    /// Store-wide commit version of the last write to this document.
    /// Never 0 for an existing document.
    pub version: u64,
    pub data: Value,
}

impl Snapshot {
    /// Deserializes the document into a typed value.
    ///
    /// # Errors
    /// Returns [`StoreError::Decode`] if the document does not have the
    /// shape of `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, StoreError> {
        T::deserialize(&self.data).map_err(|source| StoreError::Decode {
            key: self.key.clone(),
            source,
        })
    }
}

/// Serializes a value for use in [`Update::set`] or a full-document write.
///
/// # Errors
/// Returns [`StoreError::Encode`] if `value` cannot be represented as JSON.
pub fn to_value<T: Serialize>(value: &T) -> Result<Value, StoreError> {
    serde_json::to_value(value).map_err(StoreError::Encode)
}

// ---------------------------------------------------------------------------
// Update
// ---------------------------------------------------------------------------

/// One field-level mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldOp {
    /// Replace the field's value, creating intermediate maps as needed.
    Set(Value),
    /// Add to an integer field atomically. A missing field counts as 0.
    Increment(i64),
    /// Append each element not already present (by value) to an array
    /// field. A missing field counts as an empty array.
    ArrayUnion(Vec<Value>),
}

/// A sparse update: only the named fields change, everything else in the
/// document is left as committed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    ops: Vec<(FieldPath, FieldOp)>,
}

impl Update {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, path: FieldPath, value: Value) -> Self {
        self.ops.push((path, FieldOp::Set(value)));
        self
    }

    pub fn increment(mut self, path: FieldPath, delta: i64) -> Self {
        self.ops.push((path, FieldOp::Increment(delta)));
        self
    }

    pub fn array_union(mut self, path: FieldPath, elements: Vec<Value>) -> Self {
        self.ops.push((path, FieldOp::ArrayUnion(elements)));
        self
    }

    /// Applies every op, in order, to `doc`.
    ///
    /// `doc` is only partially modified if an error is returned, so
    /// callers apply updates to a staged copy.
    ///
    /// # Errors
    /// Returns [`StoreError::InvalidUpdate`] if a path runs through a
    /// non-map value, an increment targets a non-integer or overflows, or
    /// a union targets a non-array.
    pub fn apply_to(&self, key: &DocKey, doc: &mut Value) -> Result<(), StoreError> {
        for (path, op) in &self.ops {
            let invalid = |reason: &str| StoreError::InvalidUpdate {
                key: key.clone(),
                path: path.to_string(),
                reason: reason.to_string(),
            };
            let slot = resolve_slot(doc, path).ok_or_else(|| invalid("path crosses a non-map value"))?;

            match op {
                FieldOp::Set(value) => *slot = value.clone(),
                FieldOp::Increment(delta) => {
                    let current = match &*slot {
                        Value::Null => 0_i128,
                        Value::Number(n) => n
                            .as_i64()
                            .map(i128::from)
                            .or_else(|| n.as_u64().map(i128::from))
                            .ok_or_else(|| invalid("increment of a non-integer number"))?,
                        _ => return Err(invalid("increment of a non-number")),
                    };
                    let next = current + i128::from(*delta);
                    *slot = if let Ok(v) = i64::try_from(next) {
                        Value::from(v)
                    } else if let Ok(v) = u64::try_from(next) {
                        Value::from(v)
                    } else {
                        return Err(invalid("increment overflows"));
                    };
                }
                FieldOp::ArrayUnion(elements) => {
                    if slot.is_null() {
                        *slot = Value::Array(Vec::new());
                    }
                    let Value::Array(items) = slot else {
                        return Err(invalid("union into a non-array"));
                    };
                    for element in elements {
                        if !items.contains(element) {
                            items.push(element.clone());
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

/// Walks `path` from the document root, creating missing maps on the way,
/// and returns the slot for the last segment (inserting `null` if absent).
///
/// Returns `None` if the path runs through a value that is not a map.
fn resolve_slot<'v>(doc: &'v mut Value, path: &FieldPath) -> Option<&'v mut Value> {
    let mut current = doc;
    for segment in path.segments() {
        if current.is_null() {
            *current = Value::Object(Map::new());
        }
        current = current
            .as_object_mut()?
            .entry(segment.clone())
            .or_insert(Value::Null);
    }
    Some(current)
}
