use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Opaque entity identifier.
///
/// Depending on the backend this is a dense sequential number rendered as a string or a random
/// token; callers must not rely on either scheme. The empty string is reserved for "not yet
/// persisted" and for a cleared reference.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub const EMPTY: EntityId = EntityId(String::new());

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl PartialEq<str> for EntityId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for EntityId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

// Older snapshots and some backends hand out numeric ids, and REST payloads use `null` for a
// cleared reference. All of them normalize to the string form.
impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(serde_json::Number),
        }

        Ok(match Option::<Raw>::deserialize(deserializer)? {
            Some(Raw::Text(text)) => EntityId(text),
            Some(Raw::Number(number)) => EntityId(number.to_string()),
            None => EntityId::EMPTY,
        })
    }
}

/// The closed set of entity kinds; each kind owns exactly one partition.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum EntityKind {
    #[serde(rename = "members", alias = "employees")]
    Member,
    #[serde(rename = "projects")]
    Project,
    #[serde(rename = "tasks")]
    Task,
    #[serde(rename = "activities")]
    Activity,
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Member,
        EntityKind::Project,
        EntityKind::Task,
        EntityKind::Activity,
    ];

    /// Key of the partition holding this kind inside a snapshot.
    pub fn partition_key(self) -> &'static str {
        match self {
            EntityKind::Member => "members",
            EntityKind::Project => "projects",
            EntityKind::Task => "tasks",
            EntityKind::Activity => "activities",
        }
    }

    /// Value of the `type` discriminant carried by every persisted entity.
    pub fn type_tag(self) -> &'static str {
        match self {
            EntityKind::Member => "Member",
            EntityKind::Project => "Project",
            EntityKind::Task => "Task",
            EntityKind::Activity => "Activity",
        }
    }

    /// Display title of the partition.
    pub fn title(self) -> &'static str {
        match self {
            EntityKind::Member => "Участники",
            EntityKind::Project => "Проекты",
            EntityKind::Task => "Задачи",
            EntityKind::Activity => "События",
        }
    }

    pub fn from_partition_key(key: &str) -> Option<Self> {
        match key {
            "members" | "employees" => Some(EntityKind::Member),
            "projects" => Some(EntityKind::Project),
            "tasks" => Some(EntityKind::Task),
            "activities" => Some(EntityKind::Activity),
            _ => None,
        }
    }

    pub fn from_type_tag(tag: &str) -> Option<Self> {
        match tag {
            "Member" | "Employee" => Some(EntityKind::Member),
            "Project" => Some(EntityKind::Project),
            "Task" => Some(EntityKind::Task),
            "Activity" => Some(EntityKind::Activity),
            _ => None,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_tag())
    }
}

/// A `(kind, id)` pair naming one entity anywhere in the graph.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: EntityId,
}

impl EntityRef {
    pub fn new(kind: EntityKind, id: impl Into<EntityId>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.id)
    }
}
