//! Backend over a paged JSON REST service.
//!
//! Collections live under `/api/{employees,projects,tasks,activities}/`. Listing a collection
//! returns a page `{ content, totalElements }`; the backend reads the total first and then asks
//! for a single page of that size. Statuses travel as tokens, and cleared optional fields as
//! `null`.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::{json, Map, Number, Value};
use tracing::{debug, trace};

use super::{Backend, BackendKind};
use crate::allocator::{IdAllocator, SequentialAllocator};
use crate::entity::Entity;
use crate::error::{Error, Result};
use crate::ids::{EntityId, EntityKind};
use crate::partition::{Partition, PartitionList};
use crate::status::{ActivityStatus, MemberStatus, ProjectStatus, TaskStatus};

/// Page size the service uses when the request does not name one.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// JSON request/response plumbing for one service. Paths are relative to the service root.
pub trait Transport {
    /// `Ok(None)` when the resource does not exist.
    fn get(&self, path: &str) -> Result<Option<Value>>;
    fn post(&self, path: &str, body: &Value) -> Result<()>;
    fn put(&self, path: &str, body: &Value) -> Result<()>;
    fn delete(&self, path: &str) -> Result<()>;
}

pub fn collection_path(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Member => "/api/employees/",
        EntityKind::Project => "/api/projects/",
        EntityKind::Task => "/api/tasks/",
        EntityKind::Activity => "/api/activities/",
    }
}

fn entity_path(kind: EntityKind, id: &EntityId) -> String {
    format!("{}{id}", collection_path(kind))
}

pub struct RestBackend<T> {
    transport: T,
    allocator: SequentialAllocator,
}

impl<T: Transport> RestBackend<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            allocator: SequentialAllocator,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn fetch_page(&self, path: &str) -> Result<Map<String, Value>> {
        match self.transport.get(path)? {
            Some(Value::Object(page)) => Ok(page),
            Some(_) => Err(Error::Serialization(format!("page at {path} is not an object"))),
            None => Err(Error::Transport(format!("collection {path} not found"))),
        }
    }
}

impl<T: Transport> Backend for RestBackend<T> {
    fn kind(&self) -> BackendKind {
        BackendKind::Rest
    }

    fn reconciles(&self) -> bool {
        true
    }

    fn load(&mut self) -> Result<PartitionList> {
        let mut graph = PartitionList::default();
        for kind in EntityKind::ALL {
            let entities = self.get_all(kind)?;
            graph.partition_mut(kind).set_entities(entities)?;
        }
        Ok(graph)
    }

    fn next_id(&mut self, partition: &Partition) -> Result<EntityId> {
        self.allocator.next_id(partition)
    }

    fn create(&mut self, entity: &Entity) -> Result<()> {
        let body = encode(entity)?;
        debug!(entity = %entity.entity_ref(), "POST");
        self.transport.post(collection_path(entity.kind()), &body)
    }

    fn update(&mut self, id: &EntityId, entity: &Entity) -> Result<()> {
        let body = encode(entity)?;
        debug!(entity = %entity.entity_ref(), "PUT");
        self.transport.put(&entity_path(entity.kind(), id), &body)
    }

    fn delete(&mut self, kind: EntityKind, id: &EntityId) -> Result<()> {
        debug!(%kind, %id, "DELETE");
        self.transport.delete(&entity_path(kind, id))
    }

    fn get_all(&mut self, kind: EntityKind) -> Result<Vec<Entity>> {
        let base = collection_path(kind);
        let total = self
            .fetch_page(base)?
            .get("totalElements")
            .and_then(Value::as_u64)
            .unwrap_or(0);
        if total == 0 {
            return Ok(Vec::new());
        }

        let page = self.fetch_page(&format!("{base}?size={total}"))?;
        let content = match page.get("content") {
            Some(Value::Array(items)) => items.clone(),
            _ => return Err(Error::Serialization(format!("page at {base} has no content"))),
        };
        trace!(%kind, total, fetched = content.len(), "fetched collection");
        content.into_iter().map(|item| decode(kind, item)).collect()
    }

    fn get(&mut self, kind: EntityKind, id: &EntityId) -> Result<Option<Entity>> {
        self.transport
            .get(&entity_path(kind, id))?
            .map(|item| decode(kind, item))
            .transpose()
    }
}

/// Wire form of `entity`: no type tag, status as token, cleared optionals as `null`.
pub fn encode(entity: &Entity) -> Result<Value> {
    let mut fields = entity.to_payload()?;
    fields.insert("status".into(), Value::String(entity.status_token().into()));

    match entity {
        Entity::Member(member) => {
            if member.middle_name.is_empty() {
                fields.insert("middleName".into(), Value::Null);
            }
        }
        Entity::Task(task) => {
            let hours = match task.execution_time.trim() {
                "" => Value::Null,
                text => hours_number(text)?,
            };
            fields.insert("executionTime".into(), hours);
            if task.employee_id.is_empty() {
                fields.insert("employeeId".into(), Value::Null);
            }
        }
        Entity::Project(_) | Entity::Activity(_) => {}
    }
    Ok(Value::Object(fields))
}

/// Whole hours stay integers on the wire; the service may also hand out fractions.
fn hours_number(text: &str) -> Result<Value> {
    if let Ok(whole) = text.parse::<u64>() {
        return Ok(Value::from(whole));
    }
    text.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .ok_or_else(|| Error::Serialization(format!("execution time {text:?} is not a number")))
}

/// Inverse of [`encode`]. Unknown status tokens are rejected.
pub fn decode(kind: EntityKind, item: Value) -> Result<Entity> {
    let Value::Object(mut fields) = item else {
        return Err(Error::Serialization(format!("{kind} item is not an object")));
    };
    fields.retain(|_, value| !value.is_null());

    if let Some(Value::String(token)) = fields.get("status") {
        let label = status_label(kind, token)?;
        fields.insert("status".into(), Value::String(label.into()));
    }

    match kind {
        EntityKind::Task => {
            if let Some(Value::Number(hours)) = fields.get("executionTime") {
                let hours = hours.to_string();
                fields.insert("executionTime".into(), Value::String(hours));
            }
        }
        EntityKind::Project => {
            if !fields.contains_key("shortName") {
                let name = fields.get("name").cloned().unwrap_or_else(|| json!(""));
                fields.insert("shortName".into(), name);
            }
        }
        EntityKind::Member | EntityKind::Activity => {}
    }

    Entity::from_payload(kind, fields)
}

fn status_label(kind: EntityKind, token: &str) -> Result<&'static str> {
    Ok(match kind {
        EntityKind::Member => MemberStatus::from_token(token)?.label(),
        EntityKind::Project => ProjectStatus::from_token(token)?.label(),
        EntityKind::Task => TaskStatus::from_token(token)?.label(),
        EntityKind::Activity => ActivityStatus::from_token(token)?.label(),
    })
}

#[derive(Debug, Default)]
struct ServiceState {
    collections: BTreeMap<String, Vec<Value>>,
    requests: Vec<String>,
    offline: bool,
}

/// In-process stand-in for the REST service, honoring the paging contract. Clones share state.
#[derive(Clone, Debug, Default)]
pub struct MemoryTransport {
    state: Arc<Mutex<ServiceState>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following request fail as if the network were down.
    pub fn set_offline(&self, offline: bool) -> Result<()> {
        self.lock()?.offline = offline;
        Ok(())
    }

    /// Every request seen so far, as `"METHOD path"`.
    pub fn requests(&self) -> Result<Vec<String>> {
        Ok(self.lock()?.requests.clone())
    }

    /// Put a raw item into a collection, bypassing encoding.
    pub fn seed(&self, kind: EntityKind, item: Value) -> Result<()> {
        self.lock()?
            .collections
            .entry(collection_path(kind).to_string())
            .or_default()
            .push(item);
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, ServiceState>> {
        self.state
            .lock()
            .map_err(|_| Error::Transport("memory transport lock poisoned".into()))
    }

    fn begin(&self, method: &str, path: &str) -> Result<MutexGuard<'_, ServiceState>> {
        let mut state = self.lock()?;
        state.requests.push(format!("{method} {path}"));
        if state.offline {
            return Err(Error::Transport(format!("{method} {path}: service unreachable")));
        }
        Ok(state)
    }
}

fn split_item_path(path: &str) -> Result<(&str, &str)> {
    let cut = path
        .rfind('/')
        .ok_or_else(|| Error::Transport(format!("malformed path {path}")))?;
    Ok((&path[..=cut], &path[cut + 1..]))
}

fn item_id(item: &Value) -> String {
    match item.get("id") {
        Some(Value::String(id)) => id.clone(),
        Some(Value::Number(id)) => id.to_string(),
        _ => String::new(),
    }
}

fn page_size(query: &str) -> Result<usize> {
    query
        .split('&')
        .find_map(|pair| pair.strip_prefix("size="))
        .map(|size| {
            size.parse()
                .map_err(|_| Error::Transport(format!("bad page size {size:?}")))
        })
        .unwrap_or(Ok(DEFAULT_PAGE_SIZE))
}

impl Transport for MemoryTransport {
    fn get(&self, path: &str) -> Result<Option<Value>> {
        let state = self.begin("GET", path)?;
        let (path, query) = path.split_once('?').unwrap_or((path, ""));
        let (collection, id) = split_item_path(path)?;
        let items = state.collections.get(collection).map(Vec::as_slice).unwrap_or(&[]);

        if id.is_empty() {
            let size = page_size(query)?;
            let content: Vec<Value> = items.iter().take(size).cloned().collect();
            return Ok(Some(json!({
                "content": content,
                "totalElements": items.len(),
                "size": size,
            })));
        }
        Ok(items.iter().find(|item| item_id(item) == id).cloned())
    }

    fn post(&self, path: &str, body: &Value) -> Result<()> {
        let mut state = self.begin("POST", path)?;
        let items = state.collections.entry(path.to_string()).or_default();
        let id = item_id(body);
        if items.iter().any(|item| item_id(item) == id) {
            return Err(Error::Transport(format!("POST {path}: 409 conflict on id {id}")));
        }
        items.push(body.clone());
        Ok(())
    }

    fn put(&self, path: &str, body: &Value) -> Result<()> {
        let mut state = self.begin("PUT", path)?;
        let (collection, id) = split_item_path(path)?;
        let slot = state
            .collections
            .get_mut(collection)
            .and_then(|items| items.iter_mut().find(|item| item_id(item) == id))
            .ok_or_else(|| Error::Transport(format!("PUT {path}: 404 not found")))?;
        *slot = body.clone();
        Ok(())
    }

    fn delete(&self, path: &str) -> Result<()> {
        let mut state = self.begin("DELETE", path)?;
        let (collection, id) = split_item_path(path)?;
        let items = state
            .collections
            .get_mut(collection)
            .ok_or_else(|| Error::Transport(format!("DELETE {path}: 404 not found")))?;
        let before = items.len();
        items.retain(|item| item_id(item) != id);
        if items.len() == before {
            return Err(Error::Transport(format!("DELETE {path}: 404 not found")));
        }
        Ok(())
    }
}

#[cfg(feature = "http")]
pub use http::HttpTransport;

#[cfg(feature = "http")]
mod http {
    use reqwest::blocking::{Client, Response};
    use reqwest::StatusCode;
    use serde_json::Value;

    use super::Transport;
    use crate::error::{Error, Result};

    /// Blocking HTTP transport for a service rooted at `base_url`.
    pub struct HttpTransport {
        client: Client,
        base_url: String,
    }

    impl HttpTransport {
        pub fn new(base_url: impl Into<String>) -> Self {
            Self {
                client: Client::new(),
                base_url: base_url.into().trim_end_matches('/').to_string(),
            }
        }

        fn url(&self, path: &str) -> String {
            format!("{}{path}", self.base_url)
        }
    }

    fn check(method: &str, path: &str, resp: Response) -> Result<Response> {
        if !resp.status().is_success() {
            return Err(Error::Transport(format!("{method} {path}: {}", resp.status())));
        }
        Ok(resp)
    }

    fn send_failed(method: &str, path: &str, e: reqwest::Error) -> Error {
        Error::Transport(format!("{method} {path}: {e}"))
    }

    impl Transport for HttpTransport {
        fn get(&self, path: &str) -> Result<Option<Value>> {
            let resp = self
                .client
                .get(self.url(path))
                .send()
                .map_err(|e| send_failed("GET", path, e))?;
            if resp.status() == StatusCode::NOT_FOUND {
                return Ok(None);
            }
            let body = check("GET", path, resp)?
                .json::<Value>()
                .map_err(|e| send_failed("GET", path, e))?;
            Ok(Some(body))
        }

        fn post(&self, path: &str, body: &Value) -> Result<()> {
            let resp = self
                .client
                .post(self.url(path))
                .json(body)
                .send()
                .map_err(|e| send_failed("POST", path, e))?;
            check("POST", path, resp).map(|_| ())
        }

        fn put(&self, path: &str, body: &Value) -> Result<()> {
            let resp = self
                .client
                .put(self.url(path))
                .json(body)
                .send()
                .map_err(|e| send_failed("PUT", path, e))?;
            check("PUT", path, resp).map(|_| ())
        }

        fn delete(&self, path: &str) -> Result<()> {
            let resp = self
                .client
                .delete(self.url(path))
                .send()
                .map_err(|e| send_failed("DELETE", path, e))?;
            check("DELETE", path, resp).map(|_| ())
        }
    }
}
