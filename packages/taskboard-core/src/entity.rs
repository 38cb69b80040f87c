use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::ids::{EntityId, EntityKind, EntityRef};
use crate::status::{ActivityStatus, MemberStatus, ProjectStatus, TaskStatus};

/// Reference to a member from a project or activity, with the role they play there.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Participant {
    pub id: EntityId,
    pub role: String,
}

impl Participant {
    pub fn new(id: impl Into<EntityId>, role: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: role.into(),
        }
    }
}

/// Reference to a project from an activity.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectRef {
    pub id: EntityId,
}

impl ProjectRef {
    pub fn new(id: impl Into<EntityId>) -> Self {
        Self { id: id.into() }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Member {
    pub id: EntityId,
    pub last_name: String,
    pub first_name: String,
    pub middle_name: String,
    pub position: String,
    pub status: MemberStatus,
    pub mobile_number: String,
    pub mail: String,
    pub address: String,
}

impl Member {
    pub fn full_name(&self) -> String {
        [&self.last_name, &self.first_name, &self.middle_name]
            .iter()
            .filter(|part| !part.is_empty())
            .map(|part| part.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Project {
    pub id: EntityId,
    pub name: String,
    pub short_name: String,
    pub description: String,
    pub status: ProjectStatus,
    pub participant_list: Vec<Participant>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Task {
    pub id: EntityId,
    pub name: String,
    pub status: TaskStatus,
    pub project_id: EntityId,
    /// Hours of work, kept as entered; empty when unknown.
    pub execution_time: String,
    /// Executor; `EntityId::EMPTY` when nobody is assigned.
    pub employee_id: EntityId,
    pub start_date: String,
    pub finish_date: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Activity {
    pub id: EntityId,
    pub name: String,
    pub description: String,
    pub status: ActivityStatus,
    pub location: String,
    #[serde(rename = "dataStart")]
    pub date_start: String,
    pub time_start: String,
    #[serde(rename = "dataEnd")]
    pub date_end: String,
    pub time_end: String,
    pub participant_list: Vec<Participant>,
    pub project_list: Vec<ProjectRef>,
}

/// One record of any kind, tagged by its `type` discriminant when serialized.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Entity {
    #[serde(alias = "Employee")]
    Member(Member),
    Project(Project),
    Task(Task),
    Activity(Activity),
}

impl Entity {
    /// Template for a new, not yet persisted record of `kind`.
    pub fn empty(kind: EntityKind) -> Self {
        match kind {
            EntityKind::Member => Entity::Member(Member::default()),
            EntityKind::Project => Entity::Project(Project::default()),
            EntityKind::Task => Entity::Task(Task::default()),
            EntityKind::Activity => Entity::Activity(Activity::default()),
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Member(_) => EntityKind::Member,
            Entity::Project(_) => EntityKind::Project,
            Entity::Task(_) => EntityKind::Task,
            Entity::Activity(_) => EntityKind::Activity,
        }
    }

    pub fn id(&self) -> &EntityId {
        match self {
            Entity::Member(m) => &m.id,
            Entity::Project(p) => &p.id,
            Entity::Task(t) => &t.id,
            Entity::Activity(a) => &a.id,
        }
    }

    pub fn set_id(&mut self, id: EntityId) {
        match self {
            Entity::Member(m) => m.id = id,
            Entity::Project(p) => p.id = id,
            Entity::Task(t) => t.id = id,
            Entity::Activity(a) => a.id = id,
        }
    }

    pub fn entity_ref(&self) -> EntityRef {
        EntityRef::new(self.kind(), self.id().clone())
    }

    pub fn is_new(&self) -> bool {
        self.id().is_empty()
    }

    /// Human readable name: the full name for members, the name for everything else.
    pub fn display_name(&self) -> String {
        match self {
            Entity::Member(m) => m.full_name(),
            Entity::Project(p) => p.name.clone(),
            Entity::Task(t) => t.name.clone(),
            Entity::Activity(a) => a.name.clone(),
        }
    }

    /// Backend token of the entity's status.
    pub fn status_token(&self) -> &'static str {
        match self {
            Entity::Member(m) => m.status.token(),
            Entity::Project(p) => p.status.token(),
            Entity::Task(t) => t.status.token(),
            Entity::Activity(a) => a.status.token(),
        }
    }

    /// Serialized form handed to remote backends: the record's own fields without the `type`
    /// discriminant.
    pub fn to_payload(&self) -> Result<Map<String, Value>> {
        let Value::Object(mut fields) = serde_json::to_value(self)? else {
            return Err(Error::Serialization("entity did not serialize to an object".into()));
        };
        fields.remove("type");
        Ok(fields)
    }

    /// Inverse of [`Entity::to_payload`]: restores the discriminant for `kind` and decodes.
    pub fn from_payload(kind: EntityKind, mut fields: Map<String, Value>) -> Result<Self> {
        fields.insert("type".into(), Value::String(kind.type_tag().into()));
        let entity: Entity = serde_json::from_value(Value::Object(fields))?;
        Ok(entity)
    }

    pub fn as_member(&self) -> Option<&Member> {
        match self {
            Entity::Member(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_project(&self) -> Option<&Project> {
        match self {
            Entity::Project(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_task(&self) -> Option<&Task> {
        match self {
            Entity::Task(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_activity(&self) -> Option<&Activity> {
        match self {
            Entity::Activity(a) => Some(a),
            _ => None,
        }
    }
}

impl From<Member> for Entity {
    fn from(member: Member) -> Self {
        Entity::Member(member)
    }
}

impl From<Project> for Entity {
    fn from(project: Project) -> Self {
        Entity::Project(project)
    }
}

impl From<Task> for Entity {
    fn from(task: Task) -> Self {
        Entity::Task(task)
    }
}

impl From<Activity> for Entity {
    fn from(activity: Activity) -> Self {
        Entity::Activity(activity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entities_carry_their_type_tag() {
        let task = Entity::Task(Task {
            id: "5".into(),
            name: "Write report".into(),
            employee_id: "1".into(),
            ..Task::default()
        });
        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value["type"], "Task");
        assert_eq!(value["employeeId"], "1");
        assert_eq!(value["status"], "Не начата");
    }

    #[test]
    fn payload_drops_and_restores_the_tag() {
        let member = Entity::Member(Member {
            id: "3".into(),
            last_name: "Ivanov".into(),
            ..Member::default()
        });
        let payload = member.to_payload().unwrap();
        assert!(!payload.contains_key("type"));
        let back = Entity::from_payload(EntityKind::Member, payload).unwrap();
        assert_eq!(back, member);
    }

    #[test]
    fn legacy_employee_tag_decodes_as_member() {
        let entity: Entity =
            serde_json::from_str(r#"{"type":"Employee","id":0,"lastName":"Ivanov"}"#).unwrap();
        assert_eq!(entity.kind(), EntityKind::Member);
        assert_eq!(entity.id(), &EntityId::new("0"));
    }

    #[test]
    fn full_name_skips_empty_parts() {
        let member = Member {
            last_name: "Ivanov".into(),
            first_name: "Ivan".into(),
            ..Member::default()
        };
        assert_eq!(member.full_name(), "Ivanov Ivan");
    }
}
