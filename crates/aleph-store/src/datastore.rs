use std::path::PathBuf;
use std::sync::Arc;

use aleph_crypto::ContentHasher;
use aleph_types::ContentRef;
use base64::Engine;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{StoreError, StoreResult};
use crate::fs::FsBackend;
use crate::memory::MemoryBackend;
use crate::traits::KvBackend;

/// Backend selection for [`Datastore::open`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Memory,
    Filesystem,
}

/// Options for opening a datastore.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DatastoreOptions {
    pub backend: BackendKind,
    /// Root directory for the filesystem backend.
    pub location: Option<PathBuf>,
}

/// A value accepted by [`Datastore::put`].
#[derive(Clone, Debug, PartialEq)]
pub enum StoreValue {
    /// Bytes stored verbatim.
    Raw(Bytes),
    /// A structured value, stored in its canonical encoding.
    Structured(Value),
}

impl From<Vec<u8>> for StoreValue {
    fn from(v: Vec<u8>) -> Self {
        Self::Raw(Bytes::from(v))
    }
}

impl From<&[u8]> for StoreValue {
    fn from(v: &[u8]) -> Self {
        Self::Raw(Bytes::copy_from_slice(v))
    }
}

impl From<Bytes> for StoreValue {
    fn from(v: Bytes) -> Self {
        Self::Raw(v)
    }
}

impl From<Value> for StoreValue {
    fn from(v: Value) -> Self {
        Self::Structured(v)
    }
}

/// Options for [`Datastore::get`].
#[derive(Clone, Copy, Debug, Default)]
pub struct GetOptions {
    /// Return the stored bytes without decoding.
    pub raw_buffer: bool,
}

impl GetOptions {
    pub fn raw() -> Self {
        Self { raw_buffer: true }
    }
}

/// Result of a [`Datastore::get`].
#[derive(Clone, Debug, PartialEq)]
pub enum Fetched {
    /// The stored bytes decoded as a structured value.
    Structured(Value),
    /// The stored bytes as requested with [`GetOptions::raw_buffer`].
    Raw(Bytes),
    /// The stored bytes did not decode; base64 text of the raw bytes.
    Undecodable(String),
}

impl Fetched {
    /// The structured value, if the bytes decoded.
    pub fn into_value(self) -> Option<Value> {
        match self {
            Self::Structured(v) => Some(v),
            _ => None,
        }
    }
}

/// Content-addressed datastore.
///
/// Keys are sha2-256 multihashes of the stored bytes, base58 encoded.
/// Structured values are canonically encoded before hashing, so logically
/// equal values share a key. Cloning a `Datastore` shares the backend.
#[derive(Clone)]
pub struct Datastore {
    backend: Arc<dyn KvBackend>,
}

impl Datastore {
    /// A datastore over the given backend.
    pub fn new(backend: Arc<dyn KvBackend>) -> Self {
        Self { backend }
    }

    /// A datastore over a fresh in-memory backend.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    /// Open a datastore according to `options`.
    pub fn open(options: &DatastoreOptions) -> StoreResult<Self> {
        match options.backend {
            BackendKind::Memory => Ok(Self::in_memory()),
            BackendKind::Filesystem => {
                let location = options.location.clone().ok_or_else(|| {
                    StoreError::Backend("filesystem backend requires a location".into())
                })?;
                Ok(Self::new(Arc::new(FsBackend::open(location)?)))
            }
        }
    }

    /// Store a value and return its content reference.
    ///
    /// Idempotent: storing the same content again returns the same reference
    /// and leaves the store unchanged.
    pub async fn put(&self, value: impl Into<StoreValue>) -> StoreResult<ContentRef> {
        let bytes = match value.into() {
            StoreValue::Raw(bytes) => bytes,
            StoreValue::Structured(v) => Bytes::from(
                ContentHasher::canonical_bytes(&v)
                    .map_err(|e| StoreError::Serialization(e.to_string()))?,
            ),
        };
        let key = ContentHasher::hash(&bytes);
        let key_str = key.to_b58();
        if !self.backend.contains(&key_str).await? {
            self.backend.put(&key_str, bytes).await?;
        }
        Ok(key)
    }

    /// Store structured values, returning one reference per value in order.
    pub async fn put_many(&self, values: &[Value]) -> StoreResult<Vec<ContentRef>> {
        let mut keys = Vec::with_capacity(values.len());
        for value in values {
            keys.push(self.put(value.clone()).await?);
        }
        Ok(keys)
    }

    /// Read a value.
    ///
    /// By default the stored bytes are decoded as a structured value. Bytes
    /// that do not decode come back as [`Fetched::Undecodable`] with their
    /// base64 text rather than as an error.
    pub async fn get(&self, key: &ContentRef, options: GetOptions) -> StoreResult<Fetched> {
        let bytes = self.get_raw(key).await?;
        if options.raw_buffer {
            return Ok(Fetched::Raw(bytes));
        }
        match serde_json::from_slice::<Value>(&bytes) {
            Ok(value) => Ok(Fetched::Structured(value)),
            Err(e) => {
                tracing::debug!(key = %key, error = %e, "stored bytes did not decode, returning base64");
                Ok(Fetched::Undecodable(
                    base64::engine::general_purpose::STANDARD.encode(&bytes),
                ))
            }
        }
    }

    /// Read the raw stored bytes.
    pub async fn get_raw(&self, key: &ContentRef) -> StoreResult<Bytes> {
        self.backend
            .get(&key.to_b58())
            .await?
            .ok_or_else(|| StoreError::NotFound(key.to_b58()))
    }

    /// Check whether a reference is present.
    pub async fn contains(&self, key: &ContentRef) -> StoreResult<bool> {
        self.backend.contains(&key.to_b58()).await
    }

    /// Number of stored objects.
    pub async fn len(&self) -> StoreResult<usize> {
        self.backend.len().await
    }

    /// Returns `true` if nothing is stored.
    pub async fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len().await? == 0)
    }
}

impl std::fmt::Debug for Datastore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Datastore").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    // -----------------------------------------------------------------------
    // Content addressing
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn put_structured_and_get_decoded() {
        let store = Datastore::in_memory();
        let value = json!({"id": "abc", "foo": "bar"});
        let key = store.put(value.clone()).await.unwrap();
        let fetched = store.get(&key, GetOptions::default()).await.unwrap();
        assert_eq!(fetched, Fetched::Structured(value));
    }

    #[tokio::test]
    async fn duplicate_put_returns_same_key() {
        let store = Datastore::in_memory();
        let k1 = store.put(json!({"a": 1})).await.unwrap();
        let k2 = store.put(json!({"a": 1})).await.unwrap();
        assert_eq!(k1, k2);
        assert_eq!(store.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn structured_key_matches_canonical_bytes() {
        let store = Datastore::in_memory();
        let key = store.put(json!({"b": 2, "a": 1})).await.unwrap();
        assert_eq!(key, ContentHasher::hash(br#"{"a":1,"b":2}"#));
    }

    #[tokio::test]
    async fn raw_bytes_key_is_plain_hash() {
        let store = Datastore::in_memory();
        let key = store.put(b"hello world".as_slice()).await.unwrap();
        assert_eq!(key.to_b58(), "QmaozNR7DZHQK1ZcU9p7QdrshMvXqWK6gpu5rmrkPdT3L4");
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn get_unknown_key_is_not_found() {
        let store = Datastore::in_memory();
        let key = ContentHasher::hash(b"never stored");
        let err = store.get(&key, GetOptions::default()).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(k) if k == key.to_b58()));
    }

    #[tokio::test]
    async fn raw_buffer_returns_stored_bytes() {
        let store = Datastore::in_memory();
        let key = store.put(json!([1, 2, 3])).await.unwrap();
        let fetched = store.get(&key, GetOptions::raw()).await.unwrap();
        assert_eq!(fetched, Fetched::Raw(Bytes::from_static(b"[1,2,3]")));
    }

    #[tokio::test]
    async fn undecodable_bytes_come_back_as_base64() {
        let store = Datastore::in_memory();
        let key = store.put(vec![0xff, 0x00, 0xfe]).await.unwrap();
        let fetched = store.get(&key, GetOptions::default()).await.unwrap();
        assert_eq!(fetched, Fetched::Undecodable("/wD+".into()));
    }

    // -----------------------------------------------------------------------
    // Backends
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn filesystem_datastore_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let options = DatastoreOptions {
            backend: BackendKind::Filesystem,
            location: Some(dir.path().to_path_buf()),
        };
        let store = Datastore::open(&options).unwrap();
        let key = store.put(json!({"durable": true})).await.unwrap();

        let reopened = Datastore::open(&options).unwrap();
        let fetched = reopened.get(&key, GetOptions::default()).await.unwrap();
        assert_eq!(fetched.into_value(), Some(json!({"durable": true})));
    }

    #[test]
    fn filesystem_requires_location() {
        let options = DatastoreOptions {
            backend: BackendKind::Filesystem,
            location: None,
        };
        assert!(Datastore::open(&options).is_err());
    }

    #[tokio::test]
    async fn put_many_preserves_order() {
        let store = Datastore::in_memory();
        let values = vec![json!({"n": 1}), json!({"n": 2}), json!({"n": 1})];
        let keys = store.put_many(&values).await.unwrap();
        assert_eq!(keys.len(), 3);
        assert_eq!(keys[0], keys[2]);
        assert_ne!(keys[0], keys[1]);
        assert_eq!(store.len().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn concurrent_puts_of_same_value() {
        let store = Datastore::in_memory();
        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..8 {
            let store = store.clone();
            tasks.spawn(async move { store.put(json!({"shared": "value"})).await.unwrap() });
        }
        let mut keys = Vec::new();
        while let Some(res) = tasks.join_next().await {
            keys.push(res.unwrap());
        }
        keys.dedup();
        assert_eq!(keys.len(), 1);
        assert_eq!(store.len().await.unwrap(), 1);
    }

    // -----------------------------------------------------------------------
    // Properties
    // -----------------------------------------------------------------------

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread().build().unwrap()
    }

    proptest! {
        #[test]
        fn raw_roundtrip(data in proptest::collection::vec(any::<u8>(), 0..256)) {
            let rt = runtime();
            let store = Datastore::in_memory();
            let fetched = rt.block_on(async {
                let key = store.put(data.clone()).await.unwrap();
                store.get(&key, GetOptions::raw()).await.unwrap()
            });
            prop_assert_eq!(fetched, Fetched::Raw(Bytes::from(data)));
        }

        #[test]
        fn put_is_deterministic(data in proptest::collection::vec(any::<u8>(), 0..256)) {
            let rt = runtime();
            let store = Datastore::in_memory();
            let (k1, k2, len) = rt.block_on(async {
                let k1 = store.put(data.clone()).await.unwrap();
                let k2 = store.put(data.clone()).await.unwrap();
                (k1, k2, store.len().await.unwrap())
            });
            prop_assert_eq!(k1, k2);
            prop_assert_eq!(len, 1);
        }
    }
}
