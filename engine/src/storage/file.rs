//! JSON file backed object store
//!
//! Keeps a [`MemoryStore`] and rewrites the whole snapshot file after every
//! successful write. The file is written next to the target and renamed over
//! it, so a crash mid-write leaves the previous snapshot intact. A write whose
//! snapshot cannot be saved is undone in memory as well.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use shared::models::Collection;

use super::memory::{MemoryStore, Snapshot, Table};
use super::{Store, StoreResult};

#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    inner: MemoryStore,
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Open the snapshot at `path`, starting empty when the file does not exist
    pub async fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let inner = match tokio::fs::read(&path).await {
            Ok(bytes) if !bytes.is_empty() => {
                let snapshot: Snapshot = serde_json::from_slice(&bytes)?;
                MemoryStore::from_snapshot(snapshot)?
            }
            Ok(_) => MemoryStore::new(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => MemoryStore::new(),
            Err(e) => return Err(e.into()),
        };
        tracing::debug!(path = %path.display(), "Opened data file");
        Ok(Self {
            path,
            inner,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self) -> StoreResult<()> {
        let snapshot = self.inner.snapshot().await;
        let bytes = serde_json::to_vec_pretty(&snapshot)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let staging = self.path.with_extension("json.tmp");
        tokio::fs::write(&staging, bytes).await?;
        tokio::fs::rename(&staging, &self.path).await?;
        Ok(())
    }

    /// Save the snapshot, or put `collection` back to `saved` when that fails
    async fn commit<T>(&self, collection: Collection, saved: Option<Table>, outcome: T) -> StoreResult<T> {
        match self.persist().await {
            Ok(()) => Ok(outcome),
            Err(e) => {
                self.inner.restore_table(collection, saved).await;
                tracing::error!(path = %self.path.display(), %collection, error = %e, "Data file write failed, change undone");
                Err(e)
            }
        }
    }
}

#[async_trait]
impl Store for FileStore {
    async fn add(&self, collection: Collection, record: Value) -> StoreResult<i64> {
        let _guard = self.write_lock.lock().await;
        let saved = self.inner.table(collection).await;
        let id = self.inner.add(collection, record).await?;
        self.commit(collection, saved, id).await
    }

    async fn update(&self, collection: Collection, record: Value) -> StoreResult<i64> {
        let _guard = self.write_lock.lock().await;
        let saved = self.inner.table(collection).await;
        let id = self.inner.update(collection, record).await?;
        self.commit(collection, saved, id).await
    }

    async fn get(&self, collection: Collection, id: i64) -> StoreResult<Option<Value>> {
        self.inner.get(collection, id).await
    }

    async fn get_all(&self, collection: Collection) -> StoreResult<Vec<Value>> {
        self.inner.get_all(collection).await
    }

    async fn get_by_index(&self, collection: Collection, field: &str, value: &Value) -> StoreResult<Vec<Value>> {
        self.inner.get_by_index(collection, field, value).await
    }

    async fn delete(&self, collection: Collection, id: i64) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        let saved = self.inner.table(collection).await;
        self.inner.delete(collection, id).await?;
        self.commit(collection, saved, ()).await
    }

    async fn clear(&self, collection: Collection) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        let saved = self.inner.table(collection).await;
        self.inner.clear(collection).await?;
        self.commit(collection, saved, ()).await
    }
}
