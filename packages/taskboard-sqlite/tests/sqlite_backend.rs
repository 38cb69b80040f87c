use taskboard_core::{
    AllowAllAccess, BackendConfig, Config, Entity, EntityKind, KeyValueStore, LocalBackend,
    Member, MemoryDocumentStore, PartitionStore, CURRENT_PARTITION_KEY, IDS_KEY, PARTITIONS_KEY,
};
use taskboard_sqlite::SqliteKeyValueStore;
use taskboard_test_support::run_backend_conformance;

#[test]
fn sqlite_local_backend_conforms() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("taskboard.db");
    run_backend_conformance(|| LocalBackend::new(SqliteKeyValueStore::open(&path).unwrap()));
}

#[test]
fn set_item_overwrites_and_remove_item_deletes() {
    let mut kv = SqliteKeyValueStore::open_in_memory().unwrap();
    assert_eq!(kv.get_item("IDs").unwrap(), None);
    kv.set_item("IDs", "{}").unwrap();
    kv.set_item("IDs", r#"{"tasks":["0"]}"#).unwrap();
    assert_eq!(kv.get_item("IDs").unwrap().as_deref(), Some(r#"{"tasks":["0"]}"#));
    kv.remove_item("IDs").unwrap();
    assert!(kv.keys().unwrap().is_empty());
}

#[test]
fn local_backend_keeps_three_blobs() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("blobs.db");
    {
        let backend = LocalBackend::new(SqliteKeyValueStore::open(&path).unwrap());
        let mut store = PartitionStore::open(backend, AllowAllAccess).unwrap();
        store
            .create(Entity::Member(Member {
                last_name: "Ivanov".into(),
                first_name: "Ivan".into(),
                ..Member::default()
            }))
            .unwrap();
        store.flush(EntityKind::Member).unwrap();
    }

    let kv = SqliteKeyValueStore::open(&path).unwrap();
    let mut keys = vec![CURRENT_PARTITION_KEY, IDS_KEY, PARTITIONS_KEY];
    keys.sort();
    assert_eq!(kv.keys().unwrap(), keys);
    assert_eq!(kv.get_item(CURRENT_PARTITION_KEY).unwrap().as_deref(), Some("\"members\""));
}

#[test]
fn configured_local_backend_opens_the_sqlite_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        backend: BackendConfig::Local {
            path: Some(dir.path().join("configured.db")),
        },
        ..Config::default()
    };
    let open_sqlite = |path: Option<&std::path::Path>| match path {
        Some(path) => SqliteKeyValueStore::open(path),
        None => SqliteKeyValueStore::open_in_memory(),
    };
    let no_documents = |_: Option<&str>| Ok(MemoryDocumentStore::new());

    let id = {
        let mut store = config.open_store(open_sqlite, no_documents).unwrap();
        store
            .create(Entity::Member(Member {
                last_name: "Ivanov".into(),
                first_name: "Ivan".into(),
                ..Member::default()
            }))
            .unwrap()
    };

    let reopened = config.open_store(open_sqlite, no_documents).unwrap();
    assert!(reopened.graph().contains(EntityKind::Member, &id));
}
