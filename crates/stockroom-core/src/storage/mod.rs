//! # Storage Backends
//!
//! Persistent record storage for the catalog.

mod redb_store;

pub use redb_store::RedbStore;
