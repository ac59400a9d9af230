use aleph_types::ContentRef;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// sha2-256 multihash content hasher.
///
/// Raw bytes are hashed as-is. Structured values are first reduced to their
/// canonical encoding (compact JSON, object keys in lexicographic order) so
/// that two logically equal values always share a [`ContentRef`].
pub struct ContentHasher;

impl ContentHasher {
    /// Hash raw bytes.
    pub fn hash(data: &[u8]) -> ContentRef {
        ContentRef::from_sha2_256(Sha256::digest(data).into())
    }

    /// Canonical byte encoding of a structured value.
    pub fn canonical_bytes(value: &Value) -> Result<Vec<u8>, HasherError> {
        serde_json::to_vec(&canonicalize(value)).map_err(|e| HasherError::Serialization(e.to_string()))
    }

    /// Hash a structured value through its canonical encoding.
    pub fn hash_json(value: &Value) -> Result<ContentRef, HasherError> {
        let data = Self::canonical_bytes(value)?;
        Ok(Self::hash(&data))
    }

    /// Verify that data produces the expected reference.
    pub fn verify(data: &[u8], expected: &ContentRef) -> bool {
        Self::hash(data) == *expected
    }
}

// Rebuild objects in sorted key order, independent of serde_json's map backing.
fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut out = Map::new();
            for key in keys {
                out.insert(key.clone(), canonicalize(&map[key]));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

/// Errors from hashing operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum HasherError {
    #[error("serialization error: {0}")]
    Serialization(String),
}
