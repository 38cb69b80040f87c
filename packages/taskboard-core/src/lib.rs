#![forbid(unsafe_code)]
//! Core of the taskboard partition store: the entity graph for members, projects, tasks and
//! activities, plus the logic that keeps it consistent with exactly one persistence backend.
//! This crate stays independent of concrete storage engines so it can be embedded in a browser
//! via WASM, or backed by SQLite, PostgreSQL or a REST service through the traits defined here.

pub mod allocator;
pub mod backend;
pub mod config;
pub mod entity;
pub mod error;
pub mod ids;
pub mod integrity;
pub mod migration;
pub mod partition;
pub mod session;
pub mod status;
pub mod store;
pub mod traits;
pub mod validation;
pub mod views;

pub use allocator::{CountingAllocator, IdAllocator, IdIndex, RandomAllocator, SequentialAllocator};
#[cfg(feature = "http")]
pub use backend::rest::HttpTransport;
pub use backend::{
    document::DocumentBackend,
    local::{LocalBackend, CURRENT_PARTITION_KEY, IDS_KEY, PARTITIONS_KEY},
    rest::{MemoryTransport, RestBackend, Transport},
    Backend, BackendKind,
};
pub use config::{AccessLevel, BackendConfig, Config, ConfiguredStore};
pub use entity::{Activity, Entity, Member, Participant, Project, ProjectRef, Task};
pub use error::{Error, Result};
pub use ids::{EntityId, EntityKind, EntityRef};
pub use integrity::{
    plan_removal, remove_activity, remove_member, remove_project, remove_task, BlockedBy,
    DeleteOutcome, Removal, RemovalPlan, RemovalReport, RemovalStep,
};
pub use migration::{is_legacy, load_snapshot, migrate, LoadedSnapshot};
pub use partition::{DanglingReference, Partition, PartitionList};
pub use session::{EditOrigin, SessionState, SyncSession};
pub use status::{ActivityStatus, MemberStatus, ProjectStatus, TaskStatus};
pub use store::PartitionStore;
pub use traits::{
    AccessControl, AllowAllAccess, DocumentStore, KeyValueStore, MemoryDocumentStore,
    MemoryKeyValueStore,
};
pub use validation::{validate, FieldError};
pub use views::{
    filter_entities, resolve_participants, resolve_projects, resolve_task, ParticipantView,
    ProjectView, TaskView,
};
