use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::ids::EntityKind;

/// Access control hook that can deny writes or reads on a partition.
pub trait AccessControl {
    fn can_write(&self, kind: EntityKind) -> Result<()>;
    fn can_read(&self, kind: EntityKind) -> Result<()>;
}

/// Allows unrestricted access.
#[derive(Clone, Copy, Debug, Default)]
pub struct AllowAllAccess;

impl AccessControl for AllowAllAccess {
    fn can_write(&self, _kind: EntityKind) -> Result<()> {
        Ok(())
    }

    fn can_read(&self, _kind: EntityKind) -> Result<()> {
        Ok(())
    }
}

/// String key/value persistence, the shape of browser local storage.
pub trait KeyValueStore {
    fn get_item(&self, key: &str) -> Result<Option<String>>;
    fn set_item(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove_item(&mut self, key: &str) -> Result<()>;
}

/// Collections of JSON documents addressed by string ids.
pub trait DocumentStore {
    /// Every document of `collection` as `(id, fields)`, in id order.
    fn list(&self, collection: &str) -> Result<Vec<(String, Map<String, Value>)>>;
    fn get(&self, collection: &str, id: &str) -> Result<Option<Map<String, Value>>>;
    /// Create or overwrite a document.
    fn set(&mut self, collection: &str, id: &str, fields: Map<String, Value>) -> Result<()>;
    /// Merge `fields` into an existing document.
    fn update(&mut self, collection: &str, id: &str, fields: Map<String, Value>) -> Result<()>;
    fn delete(&mut self, collection: &str, id: &str) -> Result<()>;
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| Error::Storage("in-memory store lock poisoned".into()))
}

/// In-memory key/value store. Clones share the same map, so a store can be reopened over the
/// data an earlier instance left behind.
#[derive(Clone, Debug, Default)]
pub struct MemoryKeyValueStore {
    items: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.lock().map(|items| items.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(lock(&self.items)?.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<()> {
        lock(&self.items)?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> Result<()> {
        lock(&self.items)?.remove(key);
        Ok(())
    }
}

type Collections = BTreeMap<String, BTreeMap<String, Map<String, Value>>>;

/// In-memory document store, shared between clones like [`MemoryKeyValueStore`].
#[derive(Clone, Debug, Default)]
pub struct MemoryDocumentStore {
    collections: Arc<Mutex<Collections>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn list(&self, collection: &str) -> Result<Vec<(String, Map<String, Value>)>> {
        let collections = lock(&self.collections)?;
        Ok(collections
            .get(collection)
            .map(|docs| docs.iter().map(|(id, doc)| (id.clone(), doc.clone())).collect())
            .unwrap_or_default())
    }

    fn get(&self, collection: &str, id: &str) -> Result<Option<Map<String, Value>>> {
        let collections = lock(&self.collections)?;
        Ok(collections.get(collection).and_then(|docs| docs.get(id)).cloned())
    }

    fn set(&mut self, collection: &str, id: &str, fields: Map<String, Value>) -> Result<()> {
        lock(&self.collections)?
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), fields);
        Ok(())
    }

    fn update(&mut self, collection: &str, id: &str, fields: Map<String, Value>) -> Result<()> {
        let mut collections = lock(&self.collections)?;
        let doc = collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| Error::Storage(format!("no document {collection}/{id} to update")))?;
        doc.extend(fields);
        Ok(())
    }

    fn delete(&mut self, collection: &str, id: &str) -> Result<()> {
        if let Some(docs) = lock(&self.collections)?.get_mut(collection) {
            docs.remove(id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn fields(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn clones_share_key_value_data() {
        let mut store = MemoryKeyValueStore::new();
        let reopened = store.clone();
        store.set_item("Partitions", "{}").unwrap();
        assert_eq!(reopened.get_item("Partitions").unwrap().as_deref(), Some("{}"));
        store.remove_item("Partitions").unwrap();
        assert!(reopened.is_empty());
    }

    #[test]
    fn update_merges_and_requires_existing_document() {
        let mut store = MemoryDocumentStore::new();
        assert!(store.update("tasks", "a", fields(json!({"name": "x"}))).is_err());
        store
            .set("tasks", "a", fields(json!({"name": "x", "status": "Не начата"})))
            .unwrap();
        store.update("tasks", "a", fields(json!({"name": "y"}))).unwrap();
        let doc = store.get("tasks", "a").unwrap().unwrap();
        assert_eq!(doc["name"], "y");
        assert_eq!(doc["status"], "Не начата");
        store.delete("tasks", "a").unwrap();
        assert!(store.list("tasks").unwrap().is_empty());
    }
}
