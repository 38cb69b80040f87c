//! Read-side projections used by list and preview screens.

use serde::Serialize;

use crate::entity::{Entity, Participant, ProjectRef, Task};
use crate::ids::{EntityId, EntityKind};
use crate::partition::{Partition, PartitionList};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantView {
    pub id: EntityId,
    pub full_name: String,
    pub role: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProjectView {
    pub id: EntityId,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskView {
    pub id: EntityId,
    pub name: String,
    pub status: &'static str,
    pub project_name: String,
    pub executor: String,
    pub execution_time: String,
    pub start_date: String,
    pub finish_date: String,
}

/// Entities whose name contains `filter`, ignoring case. Members match on any name part.
pub fn filter_entities<'a>(partition: &'a Partition, filter: &str) -> Vec<&'a Entity> {
    let needle = filter.to_lowercase();
    partition
        .entities()
        .iter()
        .filter(|entity| match entity {
            Entity::Member(m) => [&m.last_name, &m.first_name, &m.middle_name]
                .iter()
                .any(|part| part.to_lowercase().contains(&needle)),
            other => other.display_name().to_lowercase().contains(&needle),
        })
        .collect()
}

/// Resolve participant references to display rows; unresolved references are skipped.
pub fn resolve_participants(graph: &PartitionList, refs: &[Participant]) -> Vec<ParticipantView> {
    refs.iter()
        .filter_map(|participant| {
            let member = graph.get(EntityKind::Member, &participant.id)?.as_member()?;
            Some(ParticipantView {
                id: participant.id.clone(),
                full_name: member.full_name(),
                role: participant.role.clone(),
            })
        })
        .collect()
}

pub fn resolve_projects(graph: &PartitionList, refs: &[ProjectRef]) -> Vec<ProjectView> {
    refs.iter()
        .filter_map(|reference| {
            let project = graph.get(EntityKind::Project, &reference.id)?.as_project()?;
            Some(ProjectView {
                id: project.id.clone(),
                name: project.name.clone(),
            })
        })
        .collect()
}

/// Task row with its project and executor dereferenced. Missing references render empty.
pub fn resolve_task(graph: &PartitionList, task: &Task) -> TaskView {
    let name_of = |kind, id: &EntityId| {
        graph
            .get(kind, id)
            .map(Entity::display_name)
            .unwrap_or_default()
    };
    TaskView {
        id: task.id.clone(),
        name: task.name.clone(),
        status: task.status.label(),
        project_name: name_of(EntityKind::Project, &task.project_id),
        executor: name_of(EntityKind::Member, &task.employee_id),
        execution_time: task.execution_time.clone(),
        start_date: task.start_date.clone(),
        finish_date: task.finish_date.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Member, Project};

    fn graph() -> PartitionList {
        let mut graph = PartitionList::default();
        for (id, last, first) in [("1", "Yarosh", "Daria"), ("2", "Ivanov", "Ivan")] {
            graph
                .insert(Entity::Member(Member {
                    id: id.into(),
                    last_name: last.into(),
                    first_name: first.into(),
                    ..Member::default()
                }))
                .unwrap();
        }
        graph
            .insert(Entity::Project(Project {
                id: "9".into(),
                name: "Open Day".into(),
                ..Project::default()
            }))
            .unwrap();
        graph
    }

    #[test]
    fn filter_matches_any_name_part() {
        let graph = graph();
        let hits = filter_entities(&graph.members, "IVA");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id(), &EntityId::new("2"));
        assert_eq!(filter_entities(&graph.projects, "open").len(), 1);
    }

    #[test]
    fn unresolved_participants_are_skipped() {
        let graph = graph();
        let views = resolve_participants(
            &graph,
            &[Participant::new("1", "Lead"), Participant::new("404", "Ghost")],
        );
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].full_name, "Yarosh Daria");
    }

    #[test]
    fn task_view_dereferences_names() {
        let graph = graph();
        let task = Task {
            id: "5".into(),
            name: "Posters".into(),
            project_id: "9".into(),
            employee_id: "2".into(),
            ..Task::default()
        };
        let view = resolve_task(&graph, &task);
        assert_eq!(view.project_name, "Open Day");
        assert_eq!(view.executor, "Ivanov Ivan");
        assert_eq!(view.status, "Не начата");
    }
}
