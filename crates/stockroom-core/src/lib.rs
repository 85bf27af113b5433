//! # stockroom-core
//!
//! The deterministic catalog engine for Stockroom - THE LOGIC.
//!
//! This crate implements the category-taxonomy consistency engine of the
//! inventory catalog: the rules that keep the two-level category relation
//! symmetric and free of dangling references across create, attach/detach,
//! promote/demote, and cascade-delete operations.
//!
//! ## Invariants
//!
//! - Symmetry: every id in a main category's child set resolves to an
//!   existing sub-category. Parents are discovered via the store's reverse
//!   index, never stored on the child.
//! - No nesting: the taxonomy is exactly two levels; a sub-category cannot
//!   own children (enforced by the `CategoryKind` variant).
//! - No self-reference: a category's id never appears in its own child set.
//! - Orphan tolerance: a parentless sub-category and a childless main
//!   category are both valid states.
//!
//! ## Architectural Constraints
//!
//! The core is pure Rust: no async, no network dependencies, `BTreeMap`
//! collections only. Consistency across records is re-established at the
//! end of each multi-step operation, not transactionally; the store
//! contract only guarantees atomicity per record.

// =============================================================================
// MODULES
// =============================================================================

pub mod cascade;
pub mod catalog;
pub mod engine;
pub mod inventory;
pub mod limits;
pub mod storage;
pub mod store;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    CatalogError, Category, CategoryId, CategoryKind, Image, Instrument, InstrumentId, KindName,
    NewInstrument,
};

// =============================================================================
// RE-EXPORTS: Engine & Stores
// =============================================================================

pub use cascade::{DeleteOutcome, DeletePlan};
pub use catalog::{Catalog, CatalogCounts, StoreBackend};
pub use engine::{Demotion, TaxonomyEngine};
pub use storage::RedbStore;
pub use store::{MemoryStore, RecordStore};
