use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{StoreError, StoreResult};
use crate::traits::KvBackend;

/// In-memory, HashMap-based backend.
///
/// Intended for tests and embedding. Values are held behind a `RwLock` and
/// are lost when the backend is dropped. `Bytes` values are reference
/// counted, so reads do not copy payloads.
pub struct MemoryBackend {
    entries: RwLock<HashMap<String, Bytes>>,
}

impl MemoryBackend {
    /// Create a new empty backend.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Total bytes across all stored values.
    pub fn total_bytes(&self) -> StoreResult<u64> {
        let map = self.entries.read().map_err(poisoned)?;
        Ok(map.values().map(|v| v.len() as u64).sum())
    }

    /// Sorted list of all keys.
    pub fn keys(&self) -> StoreResult<Vec<String>> {
        let map = self.entries.read().map_err(poisoned)?;
        let mut keys: Vec<String> = map.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(e: std::sync::PoisonError<T>) -> StoreError {
    StoreError::Backend(format!("lock poisoned: {e}"))
}

#[async_trait]
impl KvBackend for MemoryBackend {
    async fn put(&self, key: &str, value: Bytes) -> StoreResult<()> {
        let mut map = self.entries.write().map_err(poisoned)?;
        map.entry(key.to_string()).or_insert(value);
        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<Option<Bytes>> {
        let map = self.entries.read().map_err(poisoned)?;
        Ok(map.get(key).cloned())
    }

    async fn contains(&self, key: &str) -> StoreResult<bool> {
        let map = self.entries.read().map_err(poisoned)?;
        Ok(map.contains_key(key))
    }

    async fn len(&self) -> StoreResult<usize> {
        let map = self.entries.read().map_err(poisoned)?;
        Ok(map.len())
    }
}

impl std::fmt::Debug for MemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.entries.read().map(|m| m.len()).unwrap_or(0);
        f.debug_struct("MemoryBackend")
            .field("entry_count", &count)
            .finish()
    }
}
