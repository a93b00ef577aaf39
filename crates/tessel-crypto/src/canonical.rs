//! Canonical JSON: compact encoding with object keys in ascending order.
//!
//! Struct fields serialize in declaration order, so anything that is hashed
//! goes through [`canonicalize`] first. Keys are re-inserted in sorted order,
//! which holds whether or not `serde_json` preserves insertion order.

use serde::Serialize;
use serde_json::{Map, Value};

/// Errors from canonical encoding.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CanonicalError {
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Recursively sort every object's keys.
pub fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut sorted = Map::new();
            for (key, inner) in entries {
                sorted.insert(key, canonicalize(inner));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

/// Encode a value as canonical JSON bytes.
pub fn to_canonical_vec<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, CanonicalError> {
    let value = serde_json::to_value(value).map_err(|e| CanonicalError::Serialization(e.to_string()))?;
    serde_json::to_vec(&canonicalize(value)).map_err(|e| CanonicalError::Serialization(e.to_string()))
}

/// Encode a value as a canonical JSON string.
pub fn to_canonical_string<T: Serialize + ?Sized>(value: &T) -> Result<String, CanonicalError> {
    let value = serde_json::to_value(value).map_err(|e| CanonicalError::Serialization(e.to_string()))?;
    serde_json::to_string(&canonicalize(value)).map_err(|e| CanonicalError::Serialization(e.to_string()))
}
