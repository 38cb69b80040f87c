#![forbid(unsafe_code)]
//! PostgreSQL-backed document store for `taskboard-core`.
//!
//! Documents live in a single JSONB table keyed by `(workspace, collection, doc_id)`, so several
//! independent boards can share one database.

mod schema;
mod store;

pub use schema::{ensure_schema, reset_workspace_for_tests};
pub use store::PostgresDocumentStore;
