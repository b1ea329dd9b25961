//! Storage collaborator
//!
//! The engine only ever talks to storage through [`Store`]: a keyed object
//! store per [`Collection`] holding JSON records, with secondary index lookups
//! on the fields each collection declares. [`Repository`] layers typed access
//! on top.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::{MemoryStore, Snapshot};

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use shared::models::{Collection, Record};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Key {id} already exists in {collection}")]
    ConstraintViolation { collection: Collection, id: i64 },

    #[error("{collection} has no index on {field}")]
    UnknownIndex { collection: Collection, field: String },

    #[error("Record in {collection} is not an object")]
    InvalidRecord { collection: Collection },

    #[error("Stored record could not be converted: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Keyed record storage, one object store per collection
///
/// Records are JSON objects whose `id` field is the key. A missing or zero id
/// asks the store to assign the next free key.
#[async_trait]
pub trait Store: Send + Sync {
    /// Insert a new record; fails if its id is already taken
    async fn add(&self, collection: Collection, record: Value) -> StoreResult<i64>;

    /// Insert or replace a record by id
    async fn update(&self, collection: Collection, record: Value) -> StoreResult<i64>;

    async fn get(&self, collection: Collection, id: i64) -> StoreResult<Option<Value>>;

    /// All records in key order
    async fn get_all(&self, collection: Collection) -> StoreResult<Vec<Value>>;

    /// Records whose indexed `field` equals `value`, in key order
    async fn get_by_index(&self, collection: Collection, field: &str, value: &Value) -> StoreResult<Vec<Value>>;

    /// Remove a record; removing a missing key is not an error
    async fn delete(&self, collection: Collection, id: i64) -> StoreResult<()>;

    async fn clear(&self, collection: Collection) -> StoreResult<()>;
}

/// Typed access to a [`Store`]
#[derive(Clone)]
pub struct Repository {
    store: Arc<dyn Store>,
}

impl Repository {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Insert a new record and write the assigned id back into it
    pub async fn add<T: Record>(&self, record: &mut T) -> StoreResult<i64> {
        let id = self.store.add(T::COLLECTION, serde_json::to_value(&*record)?).await?;
        record.set_id(id);
        Ok(id)
    }

    /// Insert or replace a record and write the id back into it
    pub async fn put<T: Record>(&self, record: &mut T) -> StoreResult<i64> {
        let id = self.store.update(T::COLLECTION, serde_json::to_value(&*record)?).await?;
        record.set_id(id);
        Ok(id)
    }

    pub async fn get<T: Record>(&self, id: i64) -> StoreResult<Option<T>> {
        match self.store.get(T::COLLECTION, id).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    pub async fn all<T: Record>(&self) -> StoreResult<Vec<T>> {
        decode_all(self.store.get_all(T::COLLECTION).await?)
    }

    pub async fn by_index<T: Record>(&self, field: &str, value: impl Serialize + Send) -> StoreResult<Vec<T>> {
        let value = serde_json::to_value(value)?;
        decode_all(self.store.get_by_index(T::COLLECTION, field, &value).await?)
    }

    pub async fn delete<T: Record>(&self, id: i64) -> StoreResult<()> {
        self.store.delete(T::COLLECTION, id).await
    }
}

fn decode_all<T: Record>(values: Vec<Value>) -> StoreResult<Vec<T>> {
    values
        .into_iter()
        .map(|value| serde_json::from_value(value).map_err(StoreError::from))
        .collect()
}

/// Key of a JSON record; absent, null or non-positive ids read as unassigned
pub(crate) fn record_id(record: &Value) -> Option<i64> {
    record.get("id").and_then(Value::as_i64).filter(|id| *id > 0)
}
