use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::{StoreError, StoreResult};
use crate::traits::KvBackend;

/// Durable backend storing one file per object.
///
/// Objects live at `<root>/<shard>/<key>` where the shard is two characters
/// taken after the common multihash prefix. Writes go to a temporary file
/// that is synced and renamed into place, so a crash never leaves a
/// partially written object under its final name.
#[derive(Debug)]
pub struct FsBackend {
    root: PathBuf,
    temp_counter: AtomicU64,
}

impl FsBackend {
    /// Open (creating if needed) a backend rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            temp_counter: AtomicU64::new(0),
        })
    }

    /// Root directory of this backend.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, key: &str) -> StoreResult<PathBuf> {
        if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        let shard: String = key.chars().skip(2).take(2).collect();
        let shard = if shard.is_empty() { "_".to_string() } else { shard };
        Ok(self.root.join(shard).join(key))
    }
}

#[async_trait]
impl KvBackend for FsBackend {
    async fn put(&self, key: &str, value: Bytes) -> StoreResult<()> {
        let path = self.object_path(key)?;
        if fs::try_exists(&path).await? {
            return Ok(());
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Unique per write so concurrent puts of one key never share a temp file.
        let n = self.temp_counter.fetch_add(1, Ordering::Relaxed);
        let temp_path = path.with_extension(format!("tmp-{}-{n}", std::process::id()));
        write_atomic(&temp_path, &path, &value).await?;

        tracing::debug!(key, bytes = value.len(), "stored object");
        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<Option<Bytes>> {
        let path = self.object_path(key)?;
        match fs::read(&path).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn contains(&self, key: &str) -> StoreResult<bool> {
        let path = self.object_path(key)?;
        Ok(fs::try_exists(&path).await?)
    }

    async fn len(&self) -> StoreResult<usize> {
        let mut count = 0;
        let mut shards = fs::read_dir(&self.root).await?;
        while let Some(shard) = shards.next_entry().await? {
            if !shard.file_type().await?.is_dir() {
                continue;
            }
            let mut objects = fs::read_dir(shard.path()).await?;
            while let Some(object) = objects.next_entry().await? {
                let name = object.file_name();
                if !name.to_string_lossy().contains(".tmp-") {
                    count += 1;
                }
            }
        }
        Ok(count)
    }
}

// Write `value` to `temp`, sync, and rename onto `path`. The temp file is
// removed if any step fails.
async fn write_atomic(temp: &Path, path: &Path, value: &[u8]) -> std::io::Result<()> {
    let written = async {
        let mut file = fs::File::create(temp).await?;
        file.write_all(value).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(temp, path).await
    }
    .await;
    if written.is_err() {
        if let Err(e) = fs::remove_file(temp).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %temp.display(), error = %e, "could not remove temp file");
            }
        }
    }
    written
}
