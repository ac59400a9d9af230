use async_trait::async_trait;
use bytes::Bytes;

use crate::error::StoreResult;

/// Key/value backend underneath a [`Datastore`](crate::Datastore).
///
/// Implementations must satisfy these invariants:
/// - A completed `put` is atomic: readers see either nothing or the full value.
/// - Writing an existing key is allowed and leaves the stored value intact;
///   keys are content digests, so the value cannot differ.
/// - All I/O errors are propagated, never silently ignored.
#[async_trait]
pub trait KvBackend: Send + Sync {
    /// Store `value` under `key`.
    async fn put(&self, key: &str, value: Bytes) -> StoreResult<()>;

    /// Read the value under `key`. Returns `Ok(None)` if absent.
    async fn get(&self, key: &str) -> StoreResult<Option<Bytes>>;

    /// Check whether `key` exists.
    ///
    /// Default implementation reads the value. Backends may override with a
    /// cheaper existence check.
    async fn contains(&self, key: &str) -> StoreResult<bool> {
        Ok(self.get(key).await?.is_some())
    }

    /// Number of stored entries.
    async fn len(&self) -> StoreResult<usize>;
}
