//! The partition store: the in-memory graph kept in step with one backend.
//!
//! Every mutation is applied to the graph first and then sent to the backend. Backends that
//! report [`Backend::reconciles`] have the affected partitions re-fetched afterwards, so the
//! graph ends up as the backend sees it. A failing backend call is returned as is; whatever was
//! already applied in memory stays applied.

use tracing::{debug, info, trace, warn};

use crate::backend::Backend;
use crate::entity::Entity;
use crate::error::{Error, Result};
use crate::ids::{EntityId, EntityKind};
use crate::integrity::{plan_removal, DeleteOutcome, Removal, RemovalStep};
use crate::partition::PartitionList;
use crate::traits::{AccessControl, AllowAllAccess};
use crate::validation::validate;

pub struct PartitionStore<B, A = AllowAllAccess> {
    backend: B,
    access: A,
    graph: PartitionList,
}

impl<B, A> PartitionStore<B, A>
where
    B: Backend,
    A: AccessControl,
{
    /// Seed the graph from `backend`. Local snapshots are migrated on the way in.
    pub fn open(mut backend: B, access: A) -> Result<Self> {
        let graph = backend.load()?;
        info!(
            backend = %backend.kind(),
            members = graph.members.len(),
            projects = graph.projects.len(),
            tasks = graph.tasks.len(),
            activities = graph.activities.len(),
            "partition store ready"
        );
        Ok(Self {
            backend,
            access,
            graph,
        })
    }

    pub fn graph(&self) -> &PartitionList {
        &self.graph
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn access(&self) -> &A {
        &self.access
    }

    pub fn get_all(&self, kind: EntityKind) -> Result<&[Entity]> {
        self.access.can_read(kind)?;
        Ok(self.graph.partition(kind).entities())
    }

    pub fn get(&self, kind: EntityKind, id: &EntityId) -> Result<Option<&Entity>> {
        self.access.can_read(kind)?;
        Ok(self.graph.get(kind, id))
    }

    /// Store a new entity and return the id it was given. The entity must not carry an id yet.
    pub fn create(&mut self, mut entity: Entity) -> Result<EntityId> {
        let kind = entity.kind();
        self.access.can_write(kind)?;
        if !entity.is_new() {
            return Err(Error::InvalidOperation(format!(
                "new {kind} already has id {}",
                entity.id()
            )));
        }
        validate(&entity, &self.graph)?;

        let id = self.backend.next_id(self.graph.partition(kind))?;
        entity.set_id(id.clone());
        self.graph.insert(entity.clone())?;
        debug!(%kind, %id, "created");
        self.backend.create(&entity)?;
        self.reconcile(&[kind])?;
        Ok(id)
    }

    /// Replace the stored entity `id` with `entity`. A new entity is taken to mean `id`.
    pub fn update(&mut self, id: &EntityId, mut entity: Entity) -> Result<()> {
        let kind = entity.kind();
        self.access.can_write(kind)?;
        if entity.is_new() {
            entity.set_id(id.clone());
        } else if entity.id() != id {
            return Err(Error::InvalidOperation(format!(
                "cannot store {kind} {} under id {id}",
                entity.id()
            )));
        }
        if !self.graph.contains(kind, id) {
            return Err(Error::NotFound {
                kind,
                id: id.clone(),
            });
        }
        validate(&entity, &self.graph)?;

        self.graph.partition_mut(kind).replace(entity.clone())?;
        debug!(%kind, %id, "updated");
        self.backend.update(id, &entity)?;
        self.reconcile(&[kind])
    }

    /// Delete an entity after repairing or cascading every reference to it.
    ///
    /// Reference repairs and cascaded deletes reach the backend before the entity's own delete.
    /// A blocked delete changes nothing and is not an error.
    pub fn delete(&mut self, kind: EntityKind, id: &EntityId) -> Result<DeleteOutcome> {
        self.access.can_write(kind)?;
        let plan = match plan_removal(&self.graph, kind, id)? {
            Removal::Blocked(blocked) => {
                warn!(%blocked, "delete blocked");
                return Ok(DeleteOutcome::Blocked(blocked));
            }
            Removal::Ready(plan) => plan,
        };

        let backend = &mut self.backend;
        let report = plan.apply_with(&mut self.graph, |step| match step {
            RemovalStep::Update(entity) => backend.update(entity.id(), entity),
            RemovalStep::Delete(target) => backend.delete(target.kind, &target.id),
        })?;
        debug!(
            %kind,
            %id,
            updated = report.updated.len(),
            cascaded = report.cascaded.len(),
            "deleted"
        );

        self.reconcile(&report.touched_kinds())?;
        Ok(DeleteOutcome::Deleted(report))
    }

    /// Replace one partition with the backend's copy.
    pub fn refresh(&mut self, kind: EntityKind) -> Result<()> {
        self.access.can_read(kind)?;
        let entities = self.backend.get_all(kind)?;
        trace!(%kind, count = entities.len(), "refreshed partition");
        self.graph.partition_mut(kind).set_entities(entities)
    }

    pub fn refresh_all(&mut self) -> Result<()> {
        EntityKind::ALL.into_iter().try_for_each(|kind| self.refresh(kind))
    }

    /// Persist the whole graph together with the selected partition.
    pub fn flush(&mut self, current: EntityKind) -> Result<()> {
        self.backend.flush(&self.graph, current)
    }

    fn reconcile(&mut self, kinds: &[EntityKind]) -> Result<()> {
        if !self.backend.reconciles() {
            return Ok(());
        }
        kinds.iter().try_for_each(|&kind| self.refresh(kind))
    }
}
