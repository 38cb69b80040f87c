//! Backend over a string key/value store laid out like browser local storage.
//!
//! Three blobs are kept: the whole graph under [`PARTITIONS_KEY`], the selected partition under
//! [`CURRENT_PARTITION_KEY`] and the issued-id index under [`IDS_KEY`]. Each is read and written
//! as a single unit; there are no per-entity keys.

use tracing::{debug, info};

use super::{Backend, BackendKind};
use crate::allocator::{CountingAllocator, IdAllocator, IdIndex};
use crate::entity::Entity;
use crate::error::{Error, Result};
use crate::ids::{EntityId, EntityKind};
use crate::migration::load_snapshot;
use crate::partition::{Partition, PartitionList};
use crate::traits::KeyValueStore;

pub const PARTITIONS_KEY: &str = "Partitions";
pub const CURRENT_PARTITION_KEY: &str = "CurrentPartition";
pub const IDS_KEY: &str = "IDs";

/// Partition shown when nothing was selected yet, and after an upgrade.
const DEFAULT_PARTITION: EntityKind = EntityKind::Project;

pub struct LocalBackend<K> {
    store: K,
}

impl<K: KeyValueStore> LocalBackend<K> {
    pub fn new(store: K) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &K {
        &self.store
    }

    pub fn into_inner(self) -> K {
        self.store
    }

    /// The partition that was selected when the graph was last flushed.
    pub fn current_partition(&self) -> Result<EntityKind> {
        match self.store.get_item(CURRENT_PARTITION_KEY)? {
            Some(text) => Ok(serde_json::from_str(&text)?),
            None => Ok(DEFAULT_PARTITION),
        }
    }

    pub fn id_index(&self) -> Result<IdIndex> {
        match self.store.get_item(IDS_KEY)? {
            Some(text) => Ok(serde_json::from_str(&text)?),
            None => Ok(IdIndex::default()),
        }
    }

    fn read_graph(&self) -> Result<PartitionList> {
        let text = self
            .store
            .get_item(PARTITIONS_KEY)?
            .ok_or_else(|| Error::Storage(format!("no {PARTITIONS_KEY} snapshot; load first")))?;
        Ok(load_snapshot(&text)?.graph)
    }

    fn write_graph(&mut self, graph: &PartitionList) -> Result<()> {
        let text = serde_json::to_string(graph)?;
        self.store.set_item(PARTITIONS_KEY, &text)
    }

    fn write_current(&mut self, current: EntityKind) -> Result<()> {
        let text = serde_json::to_string(&current)?;
        self.store.set_item(CURRENT_PARTITION_KEY, &text)
    }

    fn write_ids(&mut self, index: &IdIndex) -> Result<()> {
        let text = serde_json::to_string(index)?;
        self.store.set_item(IDS_KEY, &text)
    }

    /// Read the graph, apply `change` and write it back whole.
    fn modify(&mut self, change: impl FnOnce(&mut PartitionList) -> Result<()>) -> Result<()> {
        let mut graph = self.read_graph()?;
        change(&mut graph)?;
        self.write_graph(&graph)
    }
}

impl<K: KeyValueStore> Backend for LocalBackend<K> {
    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    fn reconciles(&self) -> bool {
        false
    }

    fn load(&mut self) -> Result<PartitionList> {
        let Some(text) = self.store.get_item(PARTITIONS_KEY)? else {
            info!("no stored partitions; seeding defaults");
            let graph = PartitionList::default();
            self.write_graph(&graph)?;
            self.write_current(DEFAULT_PARTITION)?;
            self.write_ids(&IdIndex::default())?;
            return Ok(graph);
        };

        let loaded = load_snapshot(&text)?;
        if loaded.migrated {
            self.write_graph(&loaded.graph)?;
            self.write_current(DEFAULT_PARTITION)?;
        }
        Ok(loaded.graph)
    }

    fn next_id(&mut self, partition: &Partition) -> Result<EntityId> {
        let mut allocator = CountingAllocator::new(self.id_index()?);
        let id = allocator.next_id(partition)?;
        self.write_ids(allocator.index())?;
        debug!(kind = %partition.kind(), %id, "allocated local id");
        Ok(id)
    }

    fn create(&mut self, entity: &Entity) -> Result<()> {
        self.modify(|graph| graph.insert(entity.clone()))
    }

    fn update(&mut self, id: &EntityId, entity: &Entity) -> Result<()> {
        if entity.id() != id {
            return Err(Error::InvalidOperation(format!(
                "entity {} stored under id {id}",
                entity.id()
            )));
        }
        self.modify(|graph| graph.partition_mut(entity.kind()).replace(entity.clone()))
    }

    fn delete(&mut self, kind: EntityKind, id: &EntityId) -> Result<()> {
        self.modify(|graph| {
            graph
                .partition_mut(kind)
                .remove(id)
                .map(|_| ())
                .ok_or_else(|| Error::NotFound {
                    kind,
                    id: id.clone(),
                })
        })
    }

    fn get_all(&mut self, kind: EntityKind) -> Result<Vec<Entity>> {
        Ok(self.read_graph()?.partition(kind).entities().to_vec())
    }

    fn get(&mut self, kind: EntityKind, id: &EntityId) -> Result<Option<Entity>> {
        Ok(self.read_graph()?.get(kind, id).cloned())
    }

    fn flush(&mut self, graph: &PartitionList, current: EntityKind) -> Result<()> {
        self.write_graph(graph)?;
        self.write_current(current)?;
        debug!(%current, "flushed partitions");
        Ok(())
    }
}
