//! Identifier allocation.
//!
//! Each backend owns one allocator; the store only ever sees an opaque id that is guaranteed not
//! to be in use in the target partition at the moment it is issued.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::ids::{EntityId, EntityKind};
use crate::partition::Partition;

pub trait IdAllocator {
    fn next_id(&mut self, partition: &Partition) -> Result<EntityId>;
}

/// Side index of every id ever issued per collection, persisted next to the snapshot.
///
/// Field names follow the stored layout; `employees` holds member ids.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdIndex {
    #[serde(default)]
    pub employees: Vec<EntityId>,
    #[serde(default)]
    pub tasks: Vec<EntityId>,
    #[serde(default)]
    pub projects: Vec<EntityId>,
    #[serde(default)]
    pub activities: Vec<EntityId>,
}

impl IdIndex {
    pub fn issued(&self, kind: EntityKind) -> &[EntityId] {
        match kind {
            EntityKind::Member => &self.employees,
            EntityKind::Task => &self.tasks,
            EntityKind::Project => &self.projects,
            EntityKind::Activity => &self.activities,
        }
    }

    fn issued_mut(&mut self, kind: EntityKind) -> &mut Vec<EntityId> {
        match kind {
            EntityKind::Member => &mut self.employees,
            EntityKind::Task => &mut self.tasks,
            EntityKind::Project => &mut self.projects,
            EntityKind::Activity => &mut self.activities,
        }
    }
}

/// Local-storage scheme: dense integers per collection, driven by how many ids were ever issued
/// rather than by the surviving entities, so a deleted id is never handed out again.
#[derive(Clone, Debug, Default)]
pub struct CountingAllocator {
    index: IdIndex,
}

impl CountingAllocator {
    pub fn new(index: IdIndex) -> Self {
        Self { index }
    }

    pub fn index(&self) -> &IdIndex {
        &self.index
    }

    pub fn into_index(self) -> IdIndex {
        self.index
    }
}

impl IdAllocator for CountingAllocator {
    fn next_id(&mut self, partition: &Partition) -> Result<EntityId> {
        let issued = self.index.issued_mut(partition.kind());
        let mut counter = issued.len();
        // Snapshots migrated from elsewhere may already hold ids beyond the counter.
        let id = loop {
            let candidate = EntityId::new(counter.to_string());
            if !partition.contains(&candidate) && !issued.contains(&candidate) {
                break candidate;
            }
            counter += 1;
        };
        issued.push(id.clone());
        Ok(id)
    }
}

/// REST scheme: one past the last entity of the collection, `"1"` for an empty one.
///
/// Ids of deleted trailing entities can be issued again.
#[derive(Clone, Debug, Default)]
pub struct SequentialAllocator;

impl IdAllocator for SequentialAllocator {
    fn next_id(&mut self, partition: &Partition) -> Result<EntityId> {
        let mut next = match partition.last() {
            None => 1,
            Some(last) => match last.id().as_str().parse::<u64>() {
                Ok(n) => n + 1,
                Err(_) => partition.len() as u64 + 1,
            },
        };
        while partition.contains(&EntityId::new(next.to_string())) {
            next += 1;
        }
        Ok(EntityId::new(next.to_string()))
    }
}

/// Document-store scheme: a random v4 UUID chosen on the client.
#[derive(Clone, Debug, Default)]
pub struct RandomAllocator;

impl IdAllocator for RandomAllocator {
    fn next_id(&mut self, partition: &Partition) -> Result<EntityId> {
        loop {
            let candidate = EntityId::new(Uuid::new_v4().to_string());
            if !partition.contains(&candidate) {
                return Ok(candidate);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Entity, Task};

    fn task(id: &str) -> Entity {
        Entity::Task(Task {
            id: id.into(),
            ..Task::default()
        })
    }

    #[test]
    fn counting_never_reissues_after_delete() {
        let mut partition = Partition::new(EntityKind::Task);
        let mut allocator = CountingAllocator::default();

        let first = allocator.next_id(&partition).unwrap();
        partition.insert(task(first.as_str())).unwrap();
        let second = allocator.next_id(&partition).unwrap();
        partition.insert(task(second.as_str())).unwrap();
        partition.remove(&second);

        let third = allocator.next_id(&partition).unwrap();
        assert_eq!(first, "0");
        assert_eq!(second, "1");
        assert_eq!(third, "2");
        assert_eq!(allocator.index().issued(EntityKind::Task).len(), 3);
    }

    #[test]
    fn counting_skips_ids_already_present() {
        let mut partition = Partition::new(EntityKind::Task);
        partition.insert(task("0")).unwrap();
        partition.insert(task("1")).unwrap();
        let mut allocator = CountingAllocator::default();
        assert_eq!(allocator.next_id(&partition).unwrap(), "2");
    }

    #[test]
    fn sequential_follows_last_entity() {
        let mut partition = Partition::new(EntityKind::Project);
        assert_eq!(SequentialAllocator.next_id(&partition).unwrap(), "1");
        let mut project = Entity::empty(EntityKind::Project);
        project.set_id("7".into());
        partition.insert(project).unwrap();
        assert_eq!(SequentialAllocator.next_id(&partition).unwrap(), "8");
    }

    #[test]
    fn random_ids_are_unique_tokens() {
        let partition = Partition::new(EntityKind::Member);
        let a = RandomAllocator.next_id(&partition).unwrap();
        let b = RandomAllocator.next_id(&partition).unwrap();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 36);
    }
}
