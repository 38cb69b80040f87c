//! Checks run on an edited entity before any storage call.

use std::fmt;

use chrono::{NaiveDate, NaiveTime};

use crate::entity::{Activity, Entity, Member, Participant, Project, Task};
use crate::error::{Error, Result};
use crate::ids::{EntityId, EntityKind};
use crate::partition::PartitionList;

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M";

/// One offending field of an entity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub reason: &'static str,
}

impl FieldError {
    fn new(field: &'static str, reason: &'static str) -> Self {
        Self { field, reason }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.field, self.reason)
    }
}

/// Validate `entity` against the graph it is about to be stored in. All offending fields are
/// reported at once.
pub fn validate(entity: &Entity, graph: &PartitionList) -> Result<()> {
    let mut errors = Vec::new();
    match entity {
        Entity::Member(member) => check_member(member, &mut errors),
        Entity::Project(project) => check_project(project, graph, &mut errors),
        Entity::Task(task) => check_task(task, graph, &mut errors),
        Entity::Activity(activity) => check_activity(activity, graph, &mut errors),
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(Error::Validation(errors))
    }
}

fn check_member(member: &Member, errors: &mut Vec<FieldError>) {
    required("lastName", &member.last_name, errors);
    required("firstName", &member.first_name, errors);
}

fn check_project(project: &Project, graph: &PartitionList, errors: &mut Vec<FieldError>) {
    required("name", &project.name, errors);
    check_participants(&project.participant_list, graph, errors);
}

fn check_task(task: &Task, graph: &PartitionList, errors: &mut Vec<FieldError>) {
    required("name", &task.name, errors);

    if task.project_id.is_empty() {
        errors.push(FieldError::new("projectId", "a project must be selected"));
    } else if !graph.contains(EntityKind::Project, &task.project_id) {
        errors.push(FieldError::new("projectId", "unknown project"));
    }
    reference("employeeId", EntityKind::Member, &task.employee_id, graph, errors);

    if !task.execution_time.is_empty() {
        match task.execution_time.trim().parse::<u32>() {
            Ok(hours) if hours > 0 => {}
            _ => errors.push(FieldError::new("executionTime", "expected a positive number of hours")),
        }
    }

    let start = date("startDate", &task.start_date, errors);
    let finish = date("finishDate", &task.finish_date, errors);
    if let (Some(start), Some(finish)) = (start, finish) {
        if start > finish {
            errors.push(FieldError::new("finishDate", "must not precede the start date"));
        }
    }
}

fn check_activity(activity: &Activity, graph: &PartitionList, errors: &mut Vec<FieldError>) {
    required("name", &activity.name, errors);
    date("dataStart", &activity.date_start, errors);
    time("timeStart", &activity.time_start, errors);
    date("dataEnd", &activity.date_end, errors);
    time("timeEnd", &activity.time_end, errors);
    check_participants(&activity.participant_list, graph, errors);
    for project in &activity.project_list {
        if project.id.is_empty() {
            errors.push(FieldError::new("projectList", "a project must be selected"));
        } else {
            reference("projectList", EntityKind::Project, &project.id, graph, errors);
        }
    }
}

fn check_participants(participants: &[Participant], graph: &PartitionList, errors: &mut Vec<FieldError>) {
    for participant in participants {
        if participant.id.is_empty() {
            errors.push(FieldError::new("participantList", "a member must be selected"));
        } else {
            reference("participantList", EntityKind::Member, &participant.id, graph, errors);
        }
        if participant.role.trim().is_empty() {
            errors.push(FieldError::new("participantList", "a role must be given"));
        }
    }
}

fn required(field: &'static str, value: &str, errors: &mut Vec<FieldError>) {
    if value.trim().is_empty() {
        errors.push(FieldError::new(field, "must not be empty"));
    }
}

fn reference(
    field: &'static str,
    kind: EntityKind,
    id: &EntityId,
    graph: &PartitionList,
    errors: &mut Vec<FieldError>,
) {
    if !id.is_empty() && !graph.contains(kind, id) {
        errors.push(FieldError::new(field, "refers to a missing entity"));
    }
}

fn date(field: &'static str, value: &str, errors: &mut Vec<FieldError>) -> Option<NaiveDate> {
    if value.is_empty() {
        return None;
    }
    match NaiveDate::parse_from_str(value, DATE_FORMAT) {
        Ok(date) => Some(date),
        Err(_) => {
            errors.push(FieldError::new(field, "expected YYYY-MM-DD"));
            None
        }
    }
}

fn time(field: &'static str, value: &str, errors: &mut Vec<FieldError>) {
    if !value.is_empty() && NaiveTime::parse_from_str(value, TIME_FORMAT).is_err() {
        errors.push(FieldError::new(field, "expected HH:MM"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::ProjectRef;

    fn graph() -> PartitionList {
        let mut graph = PartitionList::default();
        graph
            .insert(Entity::Member(Member {
                id: "1".into(),
                last_name: "Ivanov".into(),
                first_name: "Ivan".into(),
                ..Member::default()
            }))
            .unwrap();
        graph
            .insert(Entity::Project(Project {
                id: "9".into(),
                name: "Apollo".into(),
                participant_list: vec![Participant::new("1", "Lead")],
                ..Project::default()
            }))
            .unwrap();
        graph
    }

    #[test]
    fn reports_every_offending_field() {
        let task = Entity::Task(Task {
            execution_time: "0".into(),
            start_date: "2023-02-30".into(),
            employee_id: "42".into(),
            ..Task::default()
        });
        let Err(Error::Validation(fields)) = validate(&task, &graph()) else {
            panic!("expected a validation error");
        };
        let names: Vec<_> = fields.iter().map(|f| f.field).collect();
        assert_eq!(
            names,
            vec!["name", "projectId", "employeeId", "executionTime", "startDate"]
        );
    }

    #[test]
    fn finish_before_start_is_rejected() {
        let task = Entity::Task(Task {
            name: "Plan".into(),
            project_id: "9".into(),
            start_date: "2023-05-10".into(),
            finish_date: "2023-05-01".into(),
            ..Task::default()
        });
        assert!(matches!(validate(&task, &graph()), Err(Error::Validation(_))));
    }

    #[test]
    fn complete_activity_passes() {
        let activity = Entity::Activity(Activity {
            name: "Open day".into(),
            date_start: "2023-04-01".into(),
            time_start: "10:00".into(),
            participant_list: vec![Participant::new("1", "Organizer")],
            project_list: vec![ProjectRef::new("9")],
            ..Activity::default()
        });
        validate(&activity, &graph()).unwrap();
    }

    #[test]
    fn participant_needs_a_role() {
        let project = Entity::Project(Project {
            name: "Gemini".into(),
            participant_list: vec![Participant::new("1", " ")],
            ..Project::default()
        });
        let Err(Error::Validation(fields)) = validate(&project, &graph()) else {
            panic!("expected a validation error");
        };
        assert_eq!(fields, vec![FieldError::new("participantList", "a role must be given")]);
    }
}
