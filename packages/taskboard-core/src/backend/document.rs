//! Backend over a document database: one collection per kind, documents keyed by a random
//! client-chosen id. The id is the document key and is not repeated inside the document.

use serde_json::{Map, Value};
use tracing::debug;

use super::{Backend, BackendKind};
use crate::allocator::{IdAllocator, RandomAllocator};
use crate::entity::Entity;
use crate::error::Result;
use crate::ids::{EntityId, EntityKind};
use crate::partition::{Partition, PartitionList};
use crate::traits::DocumentStore;

pub struct DocumentBackend<D> {
    store: D,
    allocator: RandomAllocator,
}

impl<D: DocumentStore> DocumentBackend<D> {
    pub fn new(store: D) -> Self {
        Self {
            store,
            allocator: RandomAllocator,
        }
    }

    pub fn store(&self) -> &D {
        &self.store
    }
}

fn document(entity: &Entity) -> Result<Map<String, Value>> {
    let mut fields = entity.to_payload()?;
    fields.remove("id");
    Ok(fields)
}

fn from_document(kind: EntityKind, id: String, mut fields: Map<String, Value>) -> Result<Entity> {
    fields.insert("id".into(), Value::String(id));
    Entity::from_payload(kind, fields)
}

impl<D: DocumentStore> Backend for DocumentBackend<D> {
    fn kind(&self) -> BackendKind {
        BackendKind::Document
    }

    fn reconciles(&self) -> bool {
        true
    }

    fn load(&mut self) -> Result<PartitionList> {
        let mut graph = PartitionList::default();
        for kind in EntityKind::ALL {
            let entities = self.get_all(kind)?;
            graph.partition_mut(kind).set_entities(entities)?;
        }
        Ok(graph)
    }

    fn next_id(&mut self, partition: &Partition) -> Result<EntityId> {
        self.allocator.next_id(partition)
    }

    fn create(&mut self, entity: &Entity) -> Result<()> {
        debug!(entity = %entity.entity_ref(), "set document");
        self.store.set(
            entity.kind().partition_key(),
            entity.id().as_str(),
            document(entity)?,
        )
    }

    fn update(&mut self, id: &EntityId, entity: &Entity) -> Result<()> {
        debug!(entity = %entity.entity_ref(), "update document");
        self.store
            .update(entity.kind().partition_key(), id.as_str(), document(entity)?)
    }

    fn delete(&mut self, kind: EntityKind, id: &EntityId) -> Result<()> {
        debug!(%kind, %id, "delete document");
        self.store.delete(kind.partition_key(), id.as_str())
    }

    fn get_all(&mut self, kind: EntityKind) -> Result<Vec<Entity>> {
        self.store
            .list(kind.partition_key())?
            .into_iter()
            .map(|(id, fields)| from_document(kind, id, fields))
            .collect()
    }

    fn get(&mut self, kind: EntityKind, id: &EntityId) -> Result<Option<Entity>> {
        self.store
            .get(kind.partition_key(), id.as_str())?
            .map(|fields| from_document(kind, id.to_string(), fields))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Task;
    use crate::traits::MemoryDocumentStore;

    #[test]
    fn documents_keep_labels_and_omit_id_and_type() {
        let docs = MemoryDocumentStore::new();
        let mut backend = DocumentBackend::new(docs.clone());
        let task = Entity::Task(Task {
            id: "abc".into(),
            name: "Print".into(),
            ..Task::default()
        });
        backend.create(&task).unwrap();

        let stored = docs.get("tasks", "abc").unwrap().unwrap();
        assert!(stored.get("id").is_none());
        assert!(stored.get("type").is_none());
        assert_eq!(stored["status"], "Не начата");
        assert_eq!(backend.get(EntityKind::Task, &"abc".into()).unwrap(), Some(task));
    }
}
