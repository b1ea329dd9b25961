//! In-memory object store

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use shared::models::Collection;

use super::{record_id, Store, StoreError, StoreResult};

/// Every collection's records, keyed by store name when serialised
pub type Snapshot = BTreeMap<Collection, Vec<Value>>;

#[derive(Debug, Clone)]
pub(super) struct Table {
    next_id: i64,
    rows: BTreeMap<i64, Value>,
}

impl Default for Table {
    fn default() -> Self {
        Self {
            next_id: 1,
            rows: BTreeMap::new(),
        }
    }
}

impl Table {
    /// Give the record its key, assigning the next one when it has none
    fn key(&mut self, collection: Collection, record: &mut Value) -> StoreResult<i64> {
        let object = record
            .as_object_mut()
            .ok_or(StoreError::InvalidRecord { collection })?;
        let id = object
            .get("id")
            .and_then(Value::as_i64)
            .filter(|id| *id > 0)
            .unwrap_or(self.next_id);
        object.insert("id".to_string(), Value::from(id));
        self.next_id = self.next_id.max(id + 1);
        Ok(id)
    }
}

/// Object store held in process memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<Collection, Table>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store holding exactly the given records, keys preserved
    pub fn from_snapshot(snapshot: Snapshot) -> StoreResult<Self> {
        let mut tables = HashMap::new();
        for (collection, records) in snapshot {
            let table: &mut Table = tables.entry(collection).or_default();
            for mut record in records {
                let id = table.key(collection, &mut record)?;
                table.rows.insert(id, record);
            }
        }
        Ok(Self {
            tables: RwLock::new(tables),
        })
    }

    /// Copy of every non-empty collection
    pub async fn snapshot(&self) -> Snapshot {
        let tables = self.tables.read().await;
        tables
            .iter()
            .filter(|(_, table)| !table.rows.is_empty())
            .map(|(collection, table)| (*collection, table.rows.values().cloned().collect()))
            .collect()
    }

    /// Copy of one collection, keys and id counter included
    pub(super) async fn table(&self, collection: Collection) -> Option<Table> {
        self.tables.read().await.get(&collection).cloned()
    }

    /// Put a collection back exactly as [`MemoryStore::table`] returned it
    pub(super) async fn restore_table(&self, collection: Collection, table: Option<Table>) {
        let mut tables = self.tables.write().await;
        match table {
            Some(table) => {
                tables.insert(collection, table);
            }
            None => {
                tables.remove(&collection);
            }
        }
    }

    pub async fn len(&self, collection: Collection) -> usize {
        let tables = self.tables.read().await;
        tables.get(&collection).map_or(0, |table| table.rows.len())
    }

    pub async fn is_empty(&self) -> bool {
        let tables = self.tables.read().await;
        tables.values().all(|table| table.rows.is_empty())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn add(&self, collection: Collection, mut record: Value) -> StoreResult<i64> {
        let mut tables = self.tables.write().await;
        let table = tables.entry(collection).or_default();
        if let Some(id) = record_id(&record) {
            if table.rows.contains_key(&id) {
                return Err(StoreError::ConstraintViolation { collection, id });
            }
        }
        let id = table.key(collection, &mut record)?;
        table.rows.insert(id, record);
        Ok(id)
    }

    async fn update(&self, collection: Collection, mut record: Value) -> StoreResult<i64> {
        let mut tables = self.tables.write().await;
        let table = tables.entry(collection).or_default();
        let id = table.key(collection, &mut record)?;
        table.rows.insert(id, record);
        Ok(id)
    }

    async fn get(&self, collection: Collection, id: i64) -> StoreResult<Option<Value>> {
        let tables = self.tables.read().await;
        Ok(tables
            .get(&collection)
            .and_then(|table| table.rows.get(&id))
            .cloned())
    }

    async fn get_all(&self, collection: Collection) -> StoreResult<Vec<Value>> {
        let tables = self.tables.read().await;
        Ok(tables
            .get(&collection)
            .map(|table| table.rows.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn get_by_index(&self, collection: Collection, field: &str, value: &Value) -> StoreResult<Vec<Value>> {
        if !collection.has_index(field) {
            return Err(StoreError::UnknownIndex {
                collection,
                field: field.to_string(),
            });
        }
        let tables = self.tables.read().await;
        Ok(tables
            .get(&collection)
            .map(|table| {
                table
                    .rows
                    .values()
                    .filter(|record| record.get(field) == Some(value))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn delete(&self, collection: Collection, id: i64) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if let Some(table) = tables.get_mut(&collection) {
            table.rows.remove(&id);
        }
        Ok(())
    }

    async fn clear(&self, collection: Collection) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if let Some(table) = tables.get_mut(&collection) {
            table.rows.clear();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_add_assigns_increasing_ids() {
        let store = MemoryStore::new();
        let first = store.add(Collection::Cycles, json!({"name": "Cycle 1"})).await.unwrap();
        let second = store.add(Collection::Cycles, json!({"id": 0, "name": "Cycle 2"})).await.unwrap();
        assert_eq!((first, second), (1, 2));

        let stored = store.get(Collection::Cycles, 2).await.unwrap().unwrap();
        assert_eq!(stored["id"], 2);
        assert_eq!(stored["name"], "Cycle 2");
    }

    #[tokio::test]
    async fn test_add_existing_key_is_rejected() {
        let store = MemoryStore::new();
        store.add(Collection::Cages, json!({"id": 5, "name": "A1"})).await.unwrap();
        let err = store.add(Collection::Cages, json!({"id": 5, "name": "A2"})).await.unwrap_err();
        assert!(matches!(err, StoreError::ConstraintViolation { id: 5, .. }));

        // Explicit keys move the counter past them
        let next = store.add(Collection::Cages, json!({"name": "A3"})).await.unwrap();
        assert_eq!(next, 6);
    }

    #[tokio::test]
    async fn test_update_replaces_in_place() {
        let store = MemoryStore::new();
        let id = store.add(Collection::Sales, json!({"customer": "Market"})).await.unwrap();
        store.update(Collection::Sales, json!({"id": id, "customer": "Shop"})).await.unwrap();
        assert_eq!(store.len(Collection::Sales).await, 1);
        let stored = store.get(Collection::Sales, id).await.unwrap().unwrap();
        assert_eq!(stored["customer"], "Shop");
    }

    #[tokio::test]
    async fn test_index_lookup() {
        let store = MemoryStore::new();
        store.add(Collection::Cages, json!({"cycleId": 1, "name": "A1"})).await.unwrap();
        store.add(Collection::Cages, json!({"cycleId": 2, "name": "B1"})).await.unwrap();
        store.add(Collection::Cages, json!({"cycleId": 1, "name": "A2"})).await.unwrap();

        let cages = store.get_by_index(Collection::Cages, "cycleId", &json!(1)).await.unwrap();
        let names: Vec<&str> = cages.iter().filter_map(|c| c["name"].as_str()).collect();
        assert_eq!(names, vec!["A1", "A2"]);

        let err = store.get_by_index(Collection::Cages, "breed", &json!("Mixed")).await.unwrap_err();
        assert!(matches!(err, StoreError::UnknownIndex { .. }));
    }

    #[tokio::test]
    async fn test_snapshot_round_trip_keeps_ids() {
        let store = MemoryStore::new();
        store.add(Collection::Cycles, json!({"id": 7, "name": "Cycle 7"})).await.unwrap();
        store.add(Collection::FeedLogs, json!({"date": "2025-07-21", "amount": 25.5})).await.unwrap();

        let snapshot = store.snapshot().await;
        let json = serde_json::to_value(&snapshot).unwrap();
        assert!(json.get("feedLogs").is_some());

        let restored = MemoryStore::from_snapshot(serde_json::from_value(json).unwrap()).unwrap();
        assert!(restored.get(Collection::Cycles, 7).await.unwrap().is_some());
        assert_eq!(restored.add(Collection::Cycles, json!({"name": "next"})).await.unwrap(), 8);
    }

    #[tokio::test]
    async fn test_delete_and_clear() {
        let store = MemoryStore::new();
        let id = store.add(Collection::Expenses, json!({"amount": "10"})).await.unwrap();
        store.add(Collection::Expenses, json!({"amount": "20"})).await.unwrap();
        store.delete(Collection::Expenses, id).await.unwrap();
        store.delete(Collection::Expenses, 99).await.unwrap();
        assert_eq!(store.len(Collection::Expenses).await, 1);

        store.clear(Collection::Expenses).await.unwrap();
        assert!(store.is_empty().await);
    }
}
