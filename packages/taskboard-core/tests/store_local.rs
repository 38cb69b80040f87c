use serde_json::json;
use taskboard_core::{
    AccessLevel, AllowAllAccess, DeleteOutcome, Entity, EntityId, EntityKind, Error,
    KeyValueStore, LocalBackend, Member, MemoryKeyValueStore, Participant, PartitionStore,
    Project, Task, IDS_KEY, PARTITIONS_KEY,
};

type Store = PartitionStore<LocalBackend<MemoryKeyValueStore>>;

/// Route store logs to the test harness; `RUST_LOG=taskboard_core=debug` shows them.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn open(kv: &MemoryKeyValueStore) -> Store {
    init_tracing();
    PartitionStore::open(LocalBackend::new(kv.clone()), AllowAllAccess).unwrap()
}

fn new_member(last: &str) -> Entity {
    Entity::Member(Member {
        last_name: last.into(),
        first_name: "Test".into(),
        ..Member::default()
    })
}

#[test]
fn created_entities_survive_a_reopen() {
    let kv = MemoryKeyValueStore::new();
    let mut store = open(&kv);
    let id = store.create(new_member("Ivanov")).unwrap();
    assert_eq!(id, "0");

    let reopened = open(&kv);
    let member = reopened.get(EntityKind::Member, &id).unwrap().unwrap();
    assert_eq!(member.display_name(), "Ivanov Test");
}

#[test]
fn deleted_ids_are_never_reissued() {
    let kv = MemoryKeyValueStore::new();
    let mut store = open(&kv);
    let a = store.create(new_member("A")).unwrap();
    let b = store.create(new_member("B")).unwrap();
    store.delete(EntityKind::Member, &b).unwrap();

    let mut reopened = open(&kv);
    let c = reopened.create(new_member("C")).unwrap();
    assert_eq!((a.as_str(), b.as_str(), c.as_str()), ("0", "1", "2"));

    let ids: serde_json::Value = serde_json::from_str(&kv.get_item(IDS_KEY).unwrap().unwrap()).unwrap();
    assert_eq!(ids["employees"], json!(["0", "1", "2"]));
}

#[test]
fn creating_with_an_id_is_rejected() {
    let kv = MemoryKeyValueStore::new();
    let mut store = open(&kv);
    let mut member = new_member("Ivanov");
    member.set_id("7".into());
    assert!(matches!(store.create(member), Err(Error::InvalidOperation(_))));
}

#[test]
fn invalid_entity_never_reaches_storage() {
    let kv = MemoryKeyValueStore::new();
    let mut store = open(&kv);
    let snapshot = kv.get_item(PARTITIONS_KEY).unwrap();

    let err = store.create(Entity::Task(Task::default())).unwrap_err();

    assert!(matches!(err, Error::Validation(_)));
    assert_eq!(kv.get_item(PARTITIONS_KEY).unwrap(), snapshot);
    assert!(store.graph().tasks.is_empty());
}

#[test]
fn blocked_delete_keeps_storage_unchanged() {
    let kv = MemoryKeyValueStore::new();
    let mut store = open(&kv);
    let member = store.create(new_member("Solo")).unwrap();
    store
        .create(Entity::Project(Project {
            name: "Apollo".into(),
            participant_list: vec![Participant::new(member.clone(), "Lead")],
            ..Project::default()
        }))
        .unwrap();
    let snapshot = kv.get_item(PARTITIONS_KEY).unwrap();

    let outcome = store.delete(EntityKind::Member, &member).unwrap();

    assert!(outcome.is_blocked());
    assert_eq!(kv.get_item(PARTITIONS_KEY).unwrap(), snapshot);
}

#[test]
fn cascade_is_persisted() {
    let kv = MemoryKeyValueStore::new();
    let mut store = open(&kv);
    let member = store.create(new_member("Lead")).unwrap();
    let project = store
        .create(Entity::Project(Project {
            name: "Apollo".into(),
            participant_list: vec![Participant::new(member.clone(), "Lead")],
            ..Project::default()
        }))
        .unwrap();
    store
        .create(Entity::Task(Task {
            name: "Draft".into(),
            project_id: project.clone(),
            employee_id: member,
            ..Task::default()
        }))
        .unwrap();

    let outcome = store.delete(EntityKind::Project, &project).unwrap();
    assert!(matches!(outcome, DeleteOutcome::Deleted(_)));

    let reopened = open(&kv);
    assert!(reopened.graph().projects.is_empty());
    assert!(reopened.graph().tasks.is_empty());
    assert_eq!(reopened.graph(), store.graph());
}

#[test]
fn legacy_snapshot_is_upgraded_on_open() {
    let mut kv = MemoryKeyValueStore::new();
    let legacy = json!({
        "employees": { "id": "employees", "entityList": [
            { "id": 0, "lastName": "Ivanov", "firstName": "Ivan", "post": "Engineer" }
        ]},
        "projects": { "id": "projects", "entityList": [] },
        "tasks": { "id": "tasks", "entityList": [
            { "id": 0, "name": "Draft", "executorID": 0, "projectID": null, "work": 2 }
        ]}
    });
    kv.set_item(PARTITIONS_KEY, &legacy.to_string()).unwrap();
    kv.set_item("CurrentPartition", "\"tasks\"").unwrap();

    let store = open(&kv);
    let task = store.get(EntityKind::Task, &"0".into()).unwrap().unwrap();
    assert_eq!(task.as_task().unwrap().employee_id, EntityId::new("0"));

    let stored: serde_json::Value =
        serde_json::from_str(&kv.get_item(PARTITIONS_KEY).unwrap().unwrap()).unwrap();
    assert_eq!(stored["members"]["entityList"][0]["type"], "Member");
    assert_eq!(store.backend().current_partition().unwrap(), EntityKind::Project);
}

#[test]
fn update_rewrites_in_place() {
    let kv = MemoryKeyValueStore::new();
    let mut store = open(&kv);
    let id = store.create(new_member("Old")).unwrap();
    store.create(new_member("Other")).unwrap();

    let mut edited = store.get(EntityKind::Member, &id).unwrap().unwrap().clone();
    if let Entity::Member(m) = &mut edited {
        m.last_name = "New".into();
    }
    store.update(&id, edited).unwrap();

    let reopened = open(&kv);
    let first = &reopened.graph().members.entities()[0];
    assert_eq!(first.id(), &id);
    assert_eq!(first.display_name(), "New Test");
}

#[test]
fn updating_a_missing_entity_is_not_found() {
    let kv = MemoryKeyValueStore::new();
    let mut store = open(&kv);
    let err = store.update(&"3".into(), new_member("Ghost")).unwrap_err();
    assert!(matches!(err, Error::NotFound { .. }));
}

#[test]
fn viewer_cannot_write() {
    let kv = MemoryKeyValueStore::new();
    let mut store = PartitionStore::open(LocalBackend::new(kv), AccessLevel::Viewer).unwrap();
    let err = store.create(new_member("Ivanov")).unwrap_err();
    assert!(matches!(err, Error::AccessDenied(_)));
    assert!(store.get_all(EntityKind::Member).unwrap().is_empty());
}

#[test]
fn flush_records_current_partition() {
    let kv = MemoryKeyValueStore::new();
    let mut store = open(&kv);
    store.flush(EntityKind::Activity).unwrap();
    assert_eq!(store.backend().current_partition().unwrap(), EntityKind::Activity);
}
