use taskboard_core::{
    AllowAllAccess, EditOrigin, Entity, EntityKind, Error, KeyValueStore, LocalBackend, Member,
    MemoryKeyValueStore, MemoryTransport, PartitionStore, RestBackend, SessionState, SyncSession,
    CURRENT_PARTITION_KEY,
};

fn local_store(kv: &MemoryKeyValueStore) -> PartitionStore<LocalBackend<MemoryKeyValueStore>> {
    PartitionStore::open(LocalBackend::new(kv.clone()), AllowAllAccess).unwrap()
}

fn fill_member(session: &mut SyncSession, last: &str) {
    let Some(Entity::Member(member)) = session.buffer_mut() else {
        panic!("a member buffer should be open");
    };
    member.last_name = last.into();
    member.first_name = "Test".into();
}

#[test]
fn create_edit_and_commit_round_trip() {
    let kv = MemoryKeyValueStore::new();
    let mut store = local_store(&kv);
    let mut session = SyncSession::new(EntityKind::Member);

    session.begin_create(&store).unwrap();
    assert!(matches!(
        session.state(),
        SessionState::Editing { origin: EditOrigin::New, .. }
    ));
    fill_member(&mut session, "Ivanov");
    let id = session.commit(&mut store).unwrap();

    session.begin_edit(&store, &id).unwrap();
    fill_member(&mut session, "Petrov");
    // Field edits stay in the buffer until commit.
    assert_eq!(
        store.get(EntityKind::Member, &id).unwrap().unwrap().display_name(),
        "Ivanov Test"
    );
    assert_eq!(session.commit(&mut store).unwrap(), id);
    assert_eq!(
        store.get(EntityKind::Member, &id).unwrap().unwrap().display_name(),
        "Petrov Test"
    );
}

#[test]
fn cancel_discards_the_buffer() {
    let kv = MemoryKeyValueStore::new();
    let store = local_store(&kv);
    let mut session = SyncSession::new(EntityKind::Member);
    session.begin_create(&store).unwrap();
    fill_member(&mut session, "Discarded");
    session.cancel().unwrap();

    assert_eq!(session.state(), &SessionState::Browsing);
    assert!(store.graph().members.is_empty());
    assert!(matches!(session.cancel(), Err(Error::InvalidTransition(_))));
}

#[test]
fn unload_flushes_only_while_editing() {
    let mut kv = MemoryKeyValueStore::new();
    let mut store = local_store(&kv);
    let mut session = SyncSession::new(EntityKind::Task);
    kv.remove_item(CURRENT_PARTITION_KEY).unwrap();

    assert!(!session.before_unload(&mut store).unwrap());
    assert!(kv.get_item(CURRENT_PARTITION_KEY).unwrap().is_none());

    session.begin_create(&store).unwrap();
    assert!(session.before_unload(&mut store).unwrap());
    assert_eq!(
        kv.get_item(CURRENT_PARTITION_KEY).unwrap().as_deref(),
        Some("\"tasks\"")
    );
}

#[test]
fn editing_a_missing_entity_stays_browsing() {
    let kv = MemoryKeyValueStore::new();
    let store = local_store(&kv);
    let mut session = SyncSession::new(EntityKind::Member);
    let err = session.begin_edit(&store, &"9".into()).unwrap_err();
    assert!(matches!(err, Error::NotFound { .. }));
    assert!(!session.is_editing());
}

#[test]
fn failed_remote_save_keeps_the_edit_open() {
    let transport = MemoryTransport::new();
    let mut store =
        PartitionStore::open(RestBackend::new(transport.clone()), AllowAllAccess).unwrap();
    let mut session = SyncSession::new(EntityKind::Member);
    session.begin_create(&store).unwrap();
    fill_member(&mut session, "Offline");
    transport.set_offline(true).unwrap();

    assert!(matches!(session.commit(&mut store), Err(Error::Transport(_))));
    assert!(session.is_editing());
    assert_eq!(
        session.current_entity(),
        Some(&Entity::Member(Member {
            last_name: "Offline".into(),
            first_name: "Test".into(),
            ..Member::default()
        }))
    );
}
