//! Behavior every persistence backend must share, run against a fresh, empty backend.
//!
//! `open` is called once per store instance and must return a backend over the same underlying
//! data each time, so the suite can check that every step survives a reopen.

use taskboard_core::{
    Activity, AllowAllAccess, Backend, DeleteOutcome, Entity, EntityId, EntityKind, Member,
    Participant, PartitionList, PartitionStore, Project, ProjectRef, Task,
};

/// Entities sorted by kind and id; backends are free to return collections in any order.
pub fn canonical(graph: &PartitionList) -> Vec<Entity> {
    let mut entities: Vec<Entity> = graph
        .iter()
        .flat_map(|p| p.entities().iter().cloned())
        .collect();
    entities.sort_by(|a, b| a.entity_ref().cmp(&b.entity_ref()));
    entities
}

fn assert_survives_reopen<B: Backend>(
    store: &PartitionStore<B>,
    open: &mut impl FnMut() -> B,
    step: &str,
) {
    let reopened = PartitionStore::open(open(), AllowAllAccess)
        .unwrap_or_else(|e| panic!("{step}: reopen failed: {e}"));
    assert_eq!(
        canonical(reopened.graph()),
        canonical(store.graph()),
        "{step}: reopened graph differs"
    );
    assert!(
        reopened.graph().dangling_references().is_empty(),
        "{step}: dangling references after reopen"
    );
}

fn member(last: &str) -> Entity {
    Entity::Member(Member {
        last_name: last.into(),
        first_name: "Test".into(),
        ..Member::default()
    })
}

pub fn run_backend_conformance<B: Backend>(mut open: impl FnMut() -> B) {
    let mut store = PartitionStore::open(open(), AllowAllAccess).expect("open empty backend");
    assert!(
        canonical(store.graph()).is_empty(),
        "conformance suite needs an empty backend"
    );

    let lead = store.create(member("Lead")).expect("create lead");
    let dev = store.create(member("Dev")).expect("create dev");
    assert_ne!(lead, dev, "ids must be unique within a collection");
    assert!(!lead.is_empty() && !dev.is_empty());

    let project = store
        .create(Entity::Project(Project {
            name: "Apollo".into(),
            participant_list: vec![
                Participant::new(lead.clone(), "Lead"),
                Participant::new(dev.clone(), "Dev"),
            ],
            ..Project::default()
        }))
        .expect("create project");
    let task = store
        .create(Entity::Task(Task {
            name: "Draft".into(),
            project_id: project.clone(),
            employee_id: dev.clone(),
            execution_time: "4".into(),
            start_date: "2023-03-01".into(),
            finish_date: "2023-03-05".into(),
            ..Task::default()
        }))
        .expect("create task");
    let activity = store
        .create(Entity::Activity(Activity {
            name: "Kickoff".into(),
            date_start: "2023-03-01".into(),
            time_start: "10:00".into(),
            participant_list: vec![Participant::new(lead.clone(), "Host")],
            project_list: vec![ProjectRef::new(project.clone())],
            ..Activity::default()
        }))
        .expect("create activity");
    assert_survives_reopen(&store, &mut open, "create");

    let mut renamed = store
        .get(EntityKind::Task, &task)
        .expect("read task")
        .cloned()
        .expect("task exists");
    if let Entity::Task(t) = &mut renamed {
        t.name = "Final draft".into();
    }
    store.update(&task, renamed).expect("update task");
    assert_eq!(
        store
            .get(EntityKind::Task, &task)
            .expect("read task")
            .map(Entity::display_name)
            .as_deref(),
        Some("Final draft")
    );
    assert_survives_reopen(&store, &mut open, "update");

    // The lead is the only host of the activity.
    let outcome = store.delete(EntityKind::Member, &lead).expect("delete lead");
    assert!(outcome.is_blocked(), "sole participant delete must block");
    assert!(store.graph().contains(EntityKind::Member, &lead));
    assert_survives_reopen(&store, &mut open, "blocked delete");

    let outcome = store.delete(EntityKind::Member, &dev).expect("delete dev");
    assert!(matches!(outcome, DeleteOutcome::Deleted(_)));
    let task_now = store
        .get(EntityKind::Task, &task)
        .expect("read task")
        .and_then(Entity::as_task)
        .cloned()
        .expect("task survives");
    assert_eq!(task_now.employee_id, EntityId::EMPTY);
    assert_survives_reopen(&store, &mut open, "member delete");

    store.delete(EntityKind::Project, &project).expect("delete project");
    assert!(store.graph().tasks.is_empty(), "tasks cascade with their project");
    let activity_now = store
        .get(EntityKind::Activity, &activity)
        .expect("read activity")
        .and_then(Entity::as_activity)
        .cloned()
        .expect("activity survives");
    assert!(activity_now.project_list.is_empty());
    assert_survives_reopen(&store, &mut open, "project delete");

    store.delete(EntityKind::Activity, &activity).expect("delete activity");
    let outcome = store.delete(EntityKind::Member, &lead).expect("delete lead");
    assert!(!outcome.is_blocked());
    assert!(canonical(store.graph()).is_empty());
    assert_survives_reopen(&store, &mut open, "final delete");
}
