//! Referential integrity on delete.
//!
//! Removing an entity first produces a [`RemovalPlan`] from an immutable view of the graph. A
//! plan is either blocked, in which case nothing is touched, or lists the surviving entities that
//! lose a reference, the dependents that are deleted with the target, and the target itself.
//! Steps are applied in that order so no surviving entity ever points at a missing id.

use std::fmt;

use crate::entity::Entity;
use crate::error::{Error, Result};
use crate::ids::{EntityId, EntityKind, EntityRef};
use crate::partition::PartitionList;

/// The entity whose last remaining link prevents a delete.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockedBy {
    pub target: EntityRef,
    pub owner: EntityRef,
}

impl fmt::Display for BlockedBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} cannot be deleted: it is the only participant of {}",
            self.target, self.owner
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Removal {
    Ready(RemovalPlan),
    Blocked(BlockedBy),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemovalPlan {
    pub target: EntityRef,
    /// Surviving entities with the reference to `target` stripped.
    pub updates: Vec<Entity>,
    /// Dependents deleted together with `target`.
    pub cascade: Vec<EntityRef>,
}

/// One persisted step of a removal, in execution order.
#[derive(Clone, Copy, Debug)]
pub enum RemovalStep<'a> {
    Update(&'a Entity),
    Delete(&'a EntityRef),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RemovalReport {
    pub updated: Vec<EntityRef>,
    pub cascaded: Vec<EntityRef>,
    pub removed: Option<EntityRef>,
}

impl RemovalReport {
    /// Kinds whose partitions changed.
    pub fn touched_kinds(&self) -> Vec<EntityKind> {
        let mut kinds: Vec<EntityKind> = self
            .updated
            .iter()
            .chain(&self.cascaded)
            .chain(&self.removed)
            .map(|r| r.kind)
            .collect();
        kinds.sort();
        kinds.dedup();
        kinds
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted(RemovalReport),
    Blocked(BlockedBy),
}

impl DeleteOutcome {
    pub fn is_blocked(&self) -> bool {
        matches!(self, DeleteOutcome::Blocked(_))
    }
}

impl RemovalPlan {
    /// Apply the plan to `graph` only.
    pub fn apply(self, graph: &mut PartitionList) -> Result<RemovalReport> {
        self.apply_with(graph, |_| Ok(()))
    }

    /// Apply the plan to `graph`, calling `persist` after each step has been applied in memory.
    ///
    /// A failing `persist` stops the removal; steps already applied stay applied.
    pub fn apply_with(
        self,
        graph: &mut PartitionList,
        mut persist: impl FnMut(RemovalStep<'_>) -> Result<()>,
    ) -> Result<RemovalReport> {
        let mut report = RemovalReport::default();

        for entity in &self.updates {
            graph.partition_mut(entity.kind()).replace(entity.clone())?;
            persist(RemovalStep::Update(entity))?;
            report.updated.push(entity.entity_ref());
        }

        for dependent in &self.cascade {
            graph.partition_mut(dependent.kind).remove(&dependent.id);
            persist(RemovalStep::Delete(dependent))?;
            report.cascaded.push(dependent.clone());
        }

        graph
            .partition_mut(self.target.kind)
            .remove(&self.target.id)
            .ok_or_else(|| Error::NotFound {
                kind: self.target.kind,
                id: self.target.id.clone(),
            })?;
        persist(RemovalStep::Delete(&self.target))?;
        report.removed = Some(self.target);
        Ok(report)
    }
}

/// Work out what deleting `kind`/`id` requires without touching the graph.
pub fn plan_removal(graph: &PartitionList, kind: EntityKind, id: &EntityId) -> Result<Removal> {
    if !graph.contains(kind, id) {
        return Err(Error::NotFound {
            kind,
            id: id.clone(),
        });
    }

    let target = EntityRef::new(kind, id.clone());
    let plan = match kind {
        EntityKind::Member => return Ok(plan_member(graph, target)),
        EntityKind::Project => plan_project(graph, target),
        EntityKind::Task | EntityKind::Activity => RemovalPlan {
            target,
            updates: Vec::new(),
            cascade: Vec::new(),
        },
    };
    Ok(Removal::Ready(plan))
}

fn plan_member(graph: &PartitionList, target: EntityRef) -> Removal {
    let id = &target.id;
    let mut updates = Vec::new();

    // A task has a single executor field; clearing it never blocks.
    for task in graph.tasks().filter(|t| &t.employee_id == id) {
        let mut task = task.clone();
        task.employee_id = EntityId::EMPTY;
        updates.push(Entity::Task(task));
    }

    for project in graph.projects() {
        if !project.participant_list.iter().any(|p| &p.id == id) {
            continue;
        }
        let mut project = project.clone();
        project.participant_list.retain(|p| &p.id != id);
        if project.participant_list.is_empty() {
            return Removal::Blocked(BlockedBy {
                target,
                owner: EntityRef::new(EntityKind::Project, project.id),
            });
        }
        updates.push(Entity::Project(project));
    }

    for activity in graph.activities() {
        if !activity.participant_list.iter().any(|p| &p.id == id) {
            continue;
        }
        let mut activity = activity.clone();
        activity.participant_list.retain(|p| &p.id != id);
        if activity.participant_list.is_empty() {
            return Removal::Blocked(BlockedBy {
                target,
                owner: EntityRef::new(EntityKind::Activity, activity.id),
            });
        }
        updates.push(Entity::Activity(activity));
    }

    Removal::Ready(RemovalPlan {
        target,
        updates,
        cascade: Vec::new(),
    })
}

fn plan_project(graph: &PartitionList, target: EntityRef) -> RemovalPlan {
    let id = &target.id;

    let cascade = graph
        .tasks()
        .filter(|t| &t.project_id == id)
        .map(|t| EntityRef::new(EntityKind::Task, t.id.clone()))
        .collect();

    let updates = graph
        .activities()
        .filter(|a| a.project_list.iter().any(|p| &p.id == id))
        .map(|a| {
            let mut activity = a.clone();
            activity.project_list.retain(|p| &p.id != id);
            Entity::Activity(activity)
        })
        .collect();

    RemovalPlan {
        target,
        updates,
        cascade,
    }
}

fn remove(graph: &mut PartitionList, kind: EntityKind, id: &EntityId) -> Result<DeleteOutcome> {
    match plan_removal(graph, kind, id)? {
        Removal::Blocked(blocked) => Ok(DeleteOutcome::Blocked(blocked)),
        Removal::Ready(plan) => plan.apply(graph).map(DeleteOutcome::Deleted),
    }
}

/// Delete a member, clearing it as task executor and stripping it from participant lists.
/// Blocked when the member is the only participant of some project or activity.
pub fn remove_member(id: &EntityId, graph: &mut PartitionList) -> Result<DeleteOutcome> {
    remove(graph, EntityKind::Member, id)
}

/// Delete a project together with its tasks and strip it from activity project lists.
pub fn remove_project(id: &EntityId, graph: &mut PartitionList) -> Result<DeleteOutcome> {
    remove(graph, EntityKind::Project, id)
}

pub fn remove_task(id: &EntityId, graph: &mut PartitionList) -> Result<DeleteOutcome> {
    remove(graph, EntityKind::Task, id)
}

pub fn remove_activity(id: &EntityId, graph: &mut PartitionList) -> Result<DeleteOutcome> {
    remove(graph, EntityKind::Activity, id)
}
