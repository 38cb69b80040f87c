use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::entity::{Activity, Entity, Member, Project, Task};
use crate::error::{Error, Result};
use crate::ids::{EntityId, EntityKind, EntityRef};

/// A named collection of one entity kind.
///
/// Entities are kept in insertion order. The partition enforces that every entity has the
/// partition's kind and that ids are unique; the UI focus ("current entity") is not stored here.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Partition {
    pub id: EntityKind,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    entity_list: Vec<Entity>,
}

impl Partition {
    pub fn new(kind: EntityKind) -> Self {
        Self {
            id: kind,
            title: kind.title().to_string(),
            entity_list: Vec::new(),
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.id
    }

    /// Template used to populate new records; also the "nothing selected" marker.
    pub fn default_entity(&self) -> Entity {
        Entity::empty(self.id)
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entity_list
    }

    pub fn len(&self) -> usize {
        self.entity_list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entity_list.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &EntityId> {
        self.entity_list.iter().map(Entity::id)
    }

    pub fn get(&self, id: &EntityId) -> Option<&Entity> {
        self.entity_list.iter().find(|e| e.id() == id)
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.get(id).is_some()
    }

    pub fn last(&self) -> Option<&Entity> {
        self.entity_list.last()
    }

    /// Append a persisted entity.
    pub fn insert(&mut self, entity: Entity) -> Result<()> {
        self.check_kind(&entity)?;
        if entity.is_new() {
            return Err(Error::InvalidOperation(format!(
                "{} without an id cannot be stored",
                entity.kind()
            )));
        }
        if self.contains(entity.id()) {
            return Err(Error::DuplicateId {
                kind: self.id,
                id: entity.id().clone(),
            });
        }
        self.entity_list.push(entity);
        Ok(())
    }

    /// Replace the entity with the same id in place, keeping its position.
    pub fn replace(&mut self, entity: Entity) -> Result<()> {
        self.check_kind(&entity)?;
        let slot = self
            .entity_list
            .iter_mut()
            .find(|e| e.id() == entity.id())
            .ok_or_else(|| Error::NotFound {
                kind: self.id,
                id: entity.id().clone(),
            })?;
        *slot = entity;
        Ok(())
    }

    pub fn remove(&mut self, id: &EntityId) -> Option<Entity> {
        let index = self.entity_list.iter().position(|e| e.id() == id)?;
        Some(self.entity_list.remove(index))
    }

    /// Replace the whole entity list, e.g. with a freshly fetched backend copy.
    pub fn set_entities(&mut self, entities: Vec<Entity>) -> Result<()> {
        let mut next = Partition {
            id: self.id,
            title: String::new(),
            entity_list: Vec::with_capacity(entities.len()),
        };
        for entity in entities {
            next.insert(entity)?;
        }
        self.entity_list = next.entity_list;
        Ok(())
    }

    fn check_kind(&self, entity: &Entity) -> Result<()> {
        if entity.kind() != self.id {
            return Err(Error::KindMismatch {
                expected: self.id,
                found: entity.kind(),
            });
        }
        Ok(())
    }

    fn check_shape(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for entity in &self.entity_list {
            self.check_kind(entity)?;
            if !seen.insert(entity.id()) {
                return Err(Error::DuplicateId {
                    kind: self.id,
                    id: entity.id().clone(),
                });
            }
        }
        Ok(())
    }
}

/// A cross-reference that does not resolve to an existing entity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DanglingReference {
    pub owner: EntityRef,
    pub target: EntityRef,
}

/// The complete entity graph: one partition per kind.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionList {
    #[serde(alias = "employees")]
    pub members: Partition,
    pub projects: Partition,
    pub tasks: Partition,
    #[serde(default = "default_activities")]
    pub activities: Partition,
}

fn default_activities() -> Partition {
    Partition::new(EntityKind::Activity)
}

impl Default for PartitionList {
    fn default() -> Self {
        Self {
            members: Partition::new(EntityKind::Member),
            projects: Partition::new(EntityKind::Project),
            tasks: Partition::new(EntityKind::Task),
            activities: Partition::new(EntityKind::Activity),
        }
    }
}

impl PartitionList {
    pub fn partition(&self, kind: EntityKind) -> &Partition {
        match kind {
            EntityKind::Member => &self.members,
            EntityKind::Project => &self.projects,
            EntityKind::Task => &self.tasks,
            EntityKind::Activity => &self.activities,
        }
    }

    pub fn partition_mut(&mut self, kind: EntityKind) -> &mut Partition {
        match kind {
            EntityKind::Member => &mut self.members,
            EntityKind::Project => &mut self.projects,
            EntityKind::Task => &mut self.tasks,
            EntityKind::Activity => &mut self.activities,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Partition> {
        EntityKind::ALL.into_iter().map(move |kind| self.partition(kind))
    }

    pub fn get(&self, kind: EntityKind, id: &EntityId) -> Option<&Entity> {
        self.partition(kind).get(id)
    }

    pub fn contains(&self, kind: EntityKind, id: &EntityId) -> bool {
        self.partition(kind).contains(id)
    }

    /// Insert into the partition matching the entity's kind.
    pub fn insert(&mut self, entity: Entity) -> Result<()> {
        self.partition_mut(entity.kind()).insert(entity)
    }

    pub fn members(&self) -> impl Iterator<Item = &Member> {
        self.members.entities().iter().filter_map(Entity::as_member)
    }

    pub fn projects(&self) -> impl Iterator<Item = &Project> {
        self.projects.entities().iter().filter_map(Entity::as_project)
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.entities().iter().filter_map(Entity::as_task)
    }

    pub fn activities(&self) -> impl Iterator<Item = &Activity> {
        self.activities.entities().iter().filter_map(Entity::as_activity)
    }

    /// Check that each partition holds only its own kind, with unique ids. Decoded snapshots go
    /// through this before use since serde cannot enforce it.
    pub fn check_shape(&self) -> Result<()> {
        for kind in EntityKind::ALL {
            let partition = self.partition(kind);
            if partition.id != kind {
                return Err(Error::KindMismatch {
                    expected: kind,
                    found: partition.id,
                });
            }
            partition.check_shape()?;
        }
        Ok(())
    }

    /// Every reference that fails to resolve. Empty references are allowed and skipped.
    pub fn dangling_references(&self) -> Vec<DanglingReference> {
        let mut dangling = Vec::new();
        let mut check = |owner: &Entity, kind: EntityKind, id: &EntityId| {
            if !id.is_empty() && !self.contains(kind, id) {
                dangling.push(DanglingReference {
                    owner: owner.entity_ref(),
                    target: EntityRef::new(kind, id.clone()),
                });
            }
        };

        for entity in self.iter().flat_map(|p| p.entities()) {
            match entity {
                Entity::Member(_) => {}
                Entity::Project(project) => {
                    for participant in &project.participant_list {
                        check(entity, EntityKind::Member, &participant.id);
                    }
                }
                Entity::Task(task) => {
                    check(entity, EntityKind::Project, &task.project_id);
                    check(entity, EntityKind::Member, &task.employee_id);
                }
                Entity::Activity(activity) => {
                    for participant in &activity.participant_list {
                        check(entity, EntityKind::Member, &participant.id);
                    }
                    for project in &activity.project_list {
                        check(entity, EntityKind::Project, &project.id);
                    }
                }
            }
        }
        dangling
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(id: &str) -> Entity {
        Entity::Member(Member {
            id: id.into(),
            last_name: format!("Member {id}"),
            ..Member::default()
        })
    }

    #[test]
    fn insert_rejects_duplicates_and_foreign_kinds() {
        let mut partition = Partition::new(EntityKind::Member);
        partition.insert(member("1")).unwrap();
        assert!(matches!(partition.insert(member("1")), Err(Error::DuplicateId { .. })));
        let task = Entity::Task(Task {
            id: "1".into(),
            ..Task::default()
        });
        assert!(matches!(partition.insert(task), Err(Error::KindMismatch { .. })));
        assert!(matches!(
            partition.insert(Entity::empty(EntityKind::Member)),
            Err(Error::InvalidOperation(_))
        ));
    }

    #[test]
    fn failed_set_entities_keeps_previous_list() {
        let mut partition = Partition::new(EntityKind::Member);
        partition.insert(member("1")).unwrap();
        let err = partition.set_entities(vec![member("2"), member("2")]);
        assert!(err.is_err());
        assert_eq!(partition.ids().collect::<Vec<_>>(), vec![&EntityId::new("1")]);
        assert_eq!(partition.title, EntityKind::Member.title());
    }

    #[test]
    fn dangling_references_are_reported() {
        let mut graph = PartitionList::default();
        graph.insert(member("1")).unwrap();
        graph
            .insert(Entity::Task(Task {
                id: "5".into(),
                employee_id: "1".into(),
                project_id: "9".into(),
                ..Task::default()
            }))
            .unwrap();
        let dangling = graph.dangling_references();
        assert_eq!(dangling.len(), 1);
        assert_eq!(dangling[0].target, EntityRef::new(EntityKind::Project, "9"));
    }
}
