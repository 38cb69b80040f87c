#![forbid(unsafe_code)]
//! SQLite-backed key/value store, the native stand-in for browser local storage.
//!
//! Each key is one row; the local backend keeps its three snapshot blobs here and rewrites each
//! one whole, so no per-entity schema is needed.

mod store;

pub use store::SqliteKeyValueStore;
