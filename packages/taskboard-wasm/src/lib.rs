#![forbid(unsafe_code)]
//! WASM bridge for the taskboard store.
//!
//! The browser host owns `localStorage`: it hands the three stored blobs in at startup and writes
//! back whatever [`WasmBoard::export_blobs`] returns, typically from its `beforeunload` handler.
//! Everything else runs in Rust against an in-memory copy of those blobs.

use serde::{Deserialize, Serialize};
use serde_wasm_bindgen::{from_value, to_value};
use taskboard_core::{
    filter_entities, resolve_task, AccessLevel, BackendConfig, Config, DeleteOutcome, Entity,
    EntityId, EntityKind, KeyValueStore, LocalBackend, MemoryKeyValueStore, PartitionStore, SyncSession,
    TaskView, CURRENT_PARTITION_KEY, IDS_KEY, PARTITIONS_KEY,
};
use wasm_bindgen::prelude::*;

/// The three local-storage blobs, keyed as the host stores them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blobs {
    #[serde(rename = "Partitions")]
    pub partitions: Option<String>,
    #[serde(rename = "CurrentPartition")]
    pub current_partition: Option<String>,
    #[serde(rename = "IDs")]
    pub ids: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DeleteResult {
    pub blocked: bool,
    pub message: Option<String>,
}

fn parse_kind(key: &str) -> Result<EntityKind, String> {
    EntityKind::from_partition_key(key).ok_or_else(|| format!("unknown partition {key:?}"))
}

fn describe(e: taskboard_core::Error) -> String {
    e.to_string()
}

/// Target-independent half of the bridge.
pub struct Board {
    kv: MemoryKeyValueStore,
    store: PartitionStore<LocalBackend<MemoryKeyValueStore>, AccessLevel>,
    session: SyncSession,
}

impl Board {
    /// The browser keeps its data in local storage, so only a local backend can be configured;
    /// its `path` has no meaning here and is ignored.
    pub fn open(blobs: Blobs, config: &Config) -> Result<Self, String> {
        if !matches!(config.backend, BackendConfig::Local { .. }) {
            return Err(format!(
                "the browser board only runs the local backend, not {}",
                config.backend.kind()
            ));
        }
        let mut kv = MemoryKeyValueStore::new();
        let entries = [
            (PARTITIONS_KEY, &blobs.partitions),
            (CURRENT_PARTITION_KEY, &blobs.current_partition),
            (IDS_KEY, &blobs.ids),
        ];
        for (key, value) in entries {
            if let Some(value) = value {
                kv.set_item(key, value).map_err(describe)?;
            }
        }

        let store =
            PartitionStore::open(LocalBackend::new(kv.clone()), config.access).map_err(describe)?;
        let current = store.backend().current_partition().map_err(describe)?;
        Ok(Self {
            kv,
            store,
            session: SyncSession::new(current),
        })
    }

    pub fn export_blobs(&self) -> Result<Blobs, String> {
        let get = |key: &str| self.kv.get_item(key).map_err(describe);
        Ok(Blobs {
            partitions: get(PARTITIONS_KEY)?,
            current_partition: get(CURRENT_PARTITION_KEY)?,
            ids: get(IDS_KEY)?,
        })
    }

    pub fn current_partition(&self) -> EntityKind {
        self.session.current_partition()
    }

    pub fn select_partition(&mut self, key: &str) -> Result<(), String> {
        let kind = parse_kind(key)?;
        self.session.select_partition(kind).map_err(describe)?;
        self.store.flush(kind).map_err(describe)
    }

    pub fn entities(&self, key: &str, filter: Option<&str>) -> Result<Vec<Entity>, String> {
        let kind = parse_kind(key)?;
        self.store.get_all(kind).map_err(describe)?;
        let partition = self.store.graph().partition(kind);
        Ok(filter_entities(partition, filter.unwrap_or(""))
            .into_iter()
            .cloned()
            .collect())
    }

    pub fn task_view(&self, id: &str) -> Result<Option<TaskView>, String> {
        let graph = self.store.graph();
        Ok(graph
            .get(EntityKind::Task, &EntityId::new(id))
            .and_then(Entity::as_task)
            .map(|task| resolve_task(graph, task)))
    }

    pub fn begin_create(&mut self) -> Result<(), String> {
        self.session.begin_create(&self.store).map_err(describe)
    }

    pub fn begin_edit(&mut self, id: &str) -> Result<(), String> {
        self.session
            .begin_edit(&self.store, &EntityId::new(id))
            .map_err(describe)
    }

    pub fn buffer(&self) -> Option<&Entity> {
        self.session.buffer()
    }

    /// Replace the edit buffer wholesale; the record must keep its kind and id.
    pub fn set_buffer(&mut self, entity: Entity) -> Result<(), String> {
        let buffer = self
            .session
            .buffer_mut()
            .ok_or_else(|| "nothing is being edited".to_string())?;
        if buffer.kind() != entity.kind() || buffer.id() != entity.id() {
            return Err(format!(
                "buffer holds {}, got {}",
                buffer.entity_ref(),
                entity.entity_ref()
            ));
        }
        *buffer = entity;
        Ok(())
    }

    pub fn commit(&mut self) -> Result<String, String> {
        self.session
            .commit(&mut self.store)
            .map(|id| id.to_string())
            .map_err(describe)
    }

    pub fn cancel(&mut self) -> Result<(), String> {
        self.session.cancel().map_err(describe)
    }

    pub fn delete(&mut self, key: &str, id: &str) -> Result<DeleteResult, String> {
        let kind = parse_kind(key)?;
        match self.store.delete(kind, &EntityId::new(id)).map_err(describe)? {
            DeleteOutcome::Blocked(blocked) => Ok(DeleteResult {
                blocked: true,
                message: Some(blocked.to_string()),
            }),
            DeleteOutcome::Deleted(_) => Ok(DeleteResult {
                blocked: false,
                message: None,
            }),
        }
    }

    pub fn before_unload(&mut self) -> Result<bool, String> {
        self.session
            .before_unload(&mut self.store)
            .map_err(describe)
    }
}

fn js_err(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

#[wasm_bindgen]
pub struct WasmBoard {
    inner: Board,
}

#[wasm_bindgen]
impl WasmBoard {
    /// `blobs` is `{ Partitions, CurrentPartition, IDs }` as read from local storage; `config` is
    /// the text of the application's configuration file, local admin when absent.
    #[wasm_bindgen(constructor)]
    pub fn new(blobs: JsValue, config: Option<String>) -> Result<WasmBoard, JsValue> {
        let blobs: Blobs = if blobs.is_undefined() || blobs.is_null() {
            Blobs::default()
        } else {
            from_value(blobs).map_err(js_err)?
        };
        let config = match config {
            Some(text) => Config::from_json_str(&text).map_err(js_err)?,
            None => Config::default(),
        };
        let inner = Board::open(blobs, &config).map_err(js_err)?;
        Ok(WasmBoard { inner })
    }

    #[wasm_bindgen(js_name = exportBlobs)]
    pub fn export_blobs(&self) -> Result<JsValue, JsValue> {
        let blobs = self.inner.export_blobs().map_err(js_err)?;
        to_value(&blobs).map_err(js_err)
    }

    #[wasm_bindgen(js_name = currentPartition)]
    pub fn current_partition(&self) -> String {
        self.inner.current_partition().partition_key().to_string()
    }

    #[wasm_bindgen(js_name = selectPartition)]
    pub fn select_partition(&mut self, key: String) -> Result<(), JsValue> {
        self.inner.select_partition(&key).map_err(js_err)
    }

    pub fn entities(&self, key: String, filter: Option<String>) -> Result<JsValue, JsValue> {
        let entities = self
            .inner
            .entities(&key, filter.as_deref())
            .map_err(js_err)?;
        to_value(&entities).map_err(js_err)
    }

    #[wasm_bindgen(js_name = taskView)]
    pub fn task_view(&self, id: String) -> Result<JsValue, JsValue> {
        let view = self.inner.task_view(&id).map_err(js_err)?;
        to_value(&view).map_err(js_err)
    }

    #[wasm_bindgen(js_name = beginCreate)]
    pub fn begin_create(&mut self) -> Result<(), JsValue> {
        self.inner.begin_create().map_err(js_err)
    }

    #[wasm_bindgen(js_name = beginEdit)]
    pub fn begin_edit(&mut self, id: String) -> Result<(), JsValue> {
        self.inner.begin_edit(&id).map_err(js_err)
    }

    pub fn buffer(&self) -> Result<JsValue, JsValue> {
        to_value(&self.inner.buffer()).map_err(js_err)
    }

    #[wasm_bindgen(js_name = setBuffer)]
    pub fn set_buffer(&mut self, entity: JsValue) -> Result<(), JsValue> {
        let entity: Entity = from_value(entity).map_err(js_err)?;
        self.inner.set_buffer(entity).map_err(js_err)
    }

    pub fn commit(&mut self) -> Result<String, JsValue> {
        self.inner.commit().map_err(js_err)
    }

    pub fn cancel(&mut self) -> Result<(), JsValue> {
        self.inner.cancel().map_err(js_err)
    }

    #[wasm_bindgen(js_name = deleteEntity)]
    pub fn delete_entity(&mut self, key: String, id: String) -> Result<JsValue, JsValue> {
        let result = self.inner.delete(&key, &id).map_err(js_err)?;
        to_value(&result).map_err(js_err)
    }

    #[wasm_bindgen(js_name = beforeUnload)]
    pub fn before_unload(&mut self) -> Result<bool, JsValue> {
        self.inner.before_unload().map_err(js_err)
    }
}
