//! Upgrade of persisted snapshots written by older versions of the application.
//!
//! Migration works on the raw JSON tree before it is decoded into typed partitions, since a
//! legacy snapshot does not decode as-is. A snapshot is legacy when any entity lacks its `type`
//! discriminant or carries a numeric id.

use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::ids::EntityKind;
use crate::partition::PartitionList;

const LEGACY_MEMBERS_KEY: &str = "employees";

/// Field renames applied per kind, as `(old, new)`.
const MEMBER_RENAMES: &[(&str, &str)] = &[("post", "position")];
const TASK_RENAMES: &[(&str, &str)] = &[
    ("work", "executionTime"),
    ("endDate", "finishDate"),
    ("executorID", "employeeId"),
    ("projectID", "projectId"),
];

pub fn is_legacy(snapshot: &Value) -> bool {
    let Some(partitions) = snapshot.as_object() else {
        return false;
    };
    if partitions.contains_key(LEGACY_MEMBERS_KEY) {
        return true;
    }
    partitions
        .values()
        .filter_map(|partition| partition.get("entityList").and_then(Value::as_array))
        .flatten()
        .any(|entity| entity.get("type").is_none() || entity.get("id").is_some_and(Value::is_number))
}

/// Rewrite a snapshot into the current shape. Applying it to an already current snapshot
/// changes nothing.
pub fn migrate(snapshot: Value) -> Result<Value> {
    let Value::Object(mut partitions) = snapshot else {
        return Err(Error::Serialization("snapshot is not a JSON object".into()));
    };

    if let Some(legacy) = partitions.remove(LEGACY_MEMBERS_KEY) {
        match partitions.get_mut(EntityKind::Member.partition_key()) {
            None => {
                partitions.insert(EntityKind::Member.partition_key().into(), legacy);
            }
            Some(members) => merge_legacy_members(members, legacy)?,
        }
    }

    for kind in EntityKind::ALL {
        let partition = partitions
            .entry(kind.partition_key())
            .or_insert_with(|| Value::Object(Map::new()));
        let Value::Object(partition) = partition else {
            return Err(Error::Serialization(format!(
                "partition {} is not a JSON object",
                kind.partition_key()
            )));
        };
        migrate_partition(kind, partition)?;
    }

    Ok(Value::Object(partitions))
}

/// Fold a stray `employees` partition into `members`. Ids already present in `members` win.
fn merge_legacy_members(members: &mut Value, legacy: Value) -> Result<()> {
    let Some(Value::Array(legacy)) = legacy.get("entityList").cloned() else {
        return Ok(());
    };
    let Value::Object(members) = members else {
        return Err(Error::Serialization("partition members is not a JSON object".into()));
    };
    let list = members
        .entry("entityList")
        .or_insert_with(|| Value::Array(Vec::new()));
    let Value::Array(list) = list else {
        return Err(Error::Serialization("entity list of members is not an array".into()));
    };

    let mut merged = 0;
    let mut dropped = 0;
    for entity in legacy {
        let id = id_key(entity.get("id"));
        if list.iter().any(|existing| id_key(existing.get("id")) == id) {
            dropped += 1;
        } else {
            list.push(entity);
            merged += 1;
        }
    }
    warn!(
        merged,
        dropped,
        "snapshot holds both members and employees; merged employees into members"
    );
    Ok(())
}

fn id_key(id: Option<&Value>) -> Option<String> {
    match id? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn migrate_partition(kind: EntityKind, partition: &mut Map<String, Value>) -> Result<()> {
    partition.remove("entityType");
    partition.insert("id".into(), Value::String(kind.partition_key().into()));
    partition
        .entry("title")
        .or_insert_with(|| Value::String(kind.title().into()));

    let entities = partition
        .entry("entityList")
        .or_insert_with(|| Value::Array(Vec::new()));
    let Value::Array(entities) = entities else {
        return Err(Error::Serialization(format!(
            "entity list of {} is not an array",
            kind.partition_key()
        )));
    };

    for entity in entities.iter_mut() {
        let Value::Object(entity) = entity else {
            return Err(Error::Serialization(format!(
                "entity in {} is not a JSON object",
                kind.partition_key()
            )));
        };
        migrate_entity(kind, entity);
    }
    Ok(())
}

fn migrate_entity(kind: EntityKind, entity: &mut Map<String, Value>) {
    stringify(entity, "id");
    entity.insert("type".into(), Value::String(kind.type_tag().into()));
    // Old forms saved an unset status as an empty string.
    if entity.get("status").and_then(Value::as_str) == Some("") {
        entity.remove("status");
    }

    match kind {
        EntityKind::Member => rename_all(entity, MEMBER_RENAMES),
        EntityKind::Task => {
            rename_all(entity, TASK_RENAMES);
            stringify(entity, "employeeId");
            stringify(entity, "projectId");
            stringify(entity, "executionTime");
        }
        EntityKind::Project => {
            if !entity.contains_key("shortName") {
                let name = entity.get("name").cloned().unwrap_or(Value::String(String::new()));
                entity.insert("shortName".into(), name);
            }
            stringify_list(entity, "participantList");
        }
        EntityKind::Activity => {
            stringify_list(entity, "participantList");
            stringify_list(entity, "projectList");
        }
    }
}

fn rename_all(entity: &mut Map<String, Value>, renames: &[(&str, &str)]) {
    for (old, new) in renames {
        if let Some(value) = entity.remove(*old) {
            entity.entry(*new).or_insert(value);
        }
    }
}

fn stringify(entity: &mut Map<String, Value>, field: &str) {
    if let Some(value) = entity.get_mut(field) {
        match value {
            Value::Number(n) => *value = Value::String(n.to_string()),
            Value::Null => *value = Value::String(String::new()),
            _ => {}
        }
    }
}

fn stringify_list(entity: &mut Map<String, Value>, field: &str) {
    if let Some(Value::Array(refs)) = entity.get_mut(field) {
        for reference in refs.iter_mut().filter_map(Value::as_object_mut) {
            stringify(reference, "id");
        }
    }
}

/// A decoded snapshot and whether it had to be upgraded on the way.
#[derive(Clone, Debug)]
pub struct LoadedSnapshot {
    pub graph: PartitionList,
    pub migrated: bool,
}

/// Parse a persisted snapshot, migrating it first when it is legacy.
pub fn load_snapshot(text: &str) -> Result<LoadedSnapshot> {
    let mut value: Value = serde_json::from_str(text)?;
    let migrated = is_legacy(&value);
    if migrated {
        info!("legacy partition snapshot detected; migrating to the current schema");
        value = migrate(value)?;
    }
    let graph: PartitionList = serde_json::from_value(value)?;
    graph.check_shape()?;
    Ok(LoadedSnapshot { graph, migrated })
}
