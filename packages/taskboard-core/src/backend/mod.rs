//! Persistence backends.
//!
//! Exactly one backend is active for a store. Each owns its identifier scheme and its wire
//! format; the store only ever hands it typed entities.

pub mod document;
pub mod local;
pub mod rest;

use std::fmt;

use crate::entity::Entity;
use crate::error::Result;
use crate::ids::{EntityId, EntityKind};
use crate::partition::{Partition, PartitionList};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BackendKind {
    Local,
    Rest,
    Document,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BackendKind::Local => "local",
            BackendKind::Rest => "rest",
            BackendKind::Document => "document",
        };
        f.write_str(name)
    }
}

pub trait Backend {
    fn kind(&self) -> BackendKind;

    /// Whether the store must re-fetch affected collections after each mutation.
    fn reconciles(&self) -> bool;

    /// Seed the whole graph at startup.
    fn load(&mut self) -> Result<PartitionList>;

    /// An id not currently used in `partition`.
    fn next_id(&mut self, partition: &Partition) -> Result<EntityId>;

    fn create(&mut self, entity: &Entity) -> Result<()>;
    fn update(&mut self, id: &EntityId, entity: &Entity) -> Result<()>;
    fn delete(&mut self, kind: EntityKind, id: &EntityId) -> Result<()>;
    fn get_all(&mut self, kind: EntityKind) -> Result<Vec<Entity>>;
    fn get(&mut self, kind: EntityKind, id: &EntityId) -> Result<Option<Entity>>;

    /// Write the whole in-memory graph and the selected partition to durable storage.
    /// Remote backends persist on every call and have nothing to flush.
    fn flush(&mut self, _graph: &PartitionList, _current: EntityKind) -> Result<()> {
        Ok(())
    }
}

/// Lets a store hold whichever backend the configuration picked.
impl<B: Backend + ?Sized> Backend for Box<B> {
    fn kind(&self) -> BackendKind {
        (**self).kind()
    }

    fn reconciles(&self) -> bool {
        (**self).reconciles()
    }

    fn load(&mut self) -> Result<PartitionList> {
        (**self).load()
    }

    fn next_id(&mut self, partition: &Partition) -> Result<EntityId> {
        (**self).next_id(partition)
    }

    fn create(&mut self, entity: &Entity) -> Result<()> {
        (**self).create(entity)
    }

    fn update(&mut self, id: &EntityId, entity: &Entity) -> Result<()> {
        (**self).update(id, entity)
    }

    fn delete(&mut self, kind: EntityKind, id: &EntityId) -> Result<()> {
        (**self).delete(kind, id)
    }

    fn get_all(&mut self, kind: EntityKind) -> Result<Vec<Entity>> {
        (**self).get_all(kind)
    }

    fn get(&mut self, kind: EntityKind, id: &EntityId) -> Result<Option<Entity>> {
        (**self).get(kind, id)
    }

    fn flush(&mut self, graph: &PartitionList, current: EntityKind) -> Result<()> {
        (**self).flush(graph, current)
    }
}
