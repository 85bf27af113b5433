//! # Catalog
//!
//! The high-level handle combining a store backend with the engine
//! operations. This is what the app layer holds; each call re-reads the
//! records it needs at invocation time — no in-process caching.
//!
//! ## Storage Backends
//!
//! - `InMemory`: `MemoryStore` (fast, volatile)
//! - `Persistent`: `RedbStore` (disk-backed, ACID)

use crate::cascade::{self, DeleteOutcome, DeletePlan};
use crate::engine::{Demotion, TaxonomyEngine};
use crate::inventory;
use crate::storage::RedbStore;
use crate::store::{MemoryStore, RecordStore};
use crate::types::{
    CatalogError, Category, CategoryId, Instrument, InstrumentId, NewInstrument,
};
use std::path::Path;

/// Storage backend for a Catalog.
#[derive(Debug)]
pub enum StoreBackend {
    /// In-memory records (fast, volatile).
    InMemory(MemoryStore),
    /// Disk-backed records using redb (ACID, persistent).
    Persistent(RedbStore),
}

impl Default for StoreBackend {
    fn default() -> Self {
        Self::InMemory(MemoryStore::new())
    }
}

// NOTE: StoreBackend does NOT implement Clone.
// RedbStore (database handle) cannot be safely cloned.

/// Catalog totals for status output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogCounts {
    pub categories: usize,
    pub instruments: usize,
}

/// A Catalog wraps a record store behind the engine operations.
#[derive(Debug, Default)]
pub struct Catalog {
    backend: StoreBackend,
}

impl Catalog {
    /// Create a new empty catalog with in-memory storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a catalog over an existing in-memory store.
    #[must_use]
    pub fn with_store(store: MemoryStore) -> Self {
        Self {
            backend: StoreBackend::InMemory(store),
        }
    }

    /// Create a catalog with persistent redb storage.
    ///
    /// Opens or creates a redb database at the given path; all changes are
    /// persisted to disk.
    pub fn with_redb(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let store = RedbStore::open(path)?;
        Ok(Self {
            backend: StoreBackend::Persistent(store),
        })
    }

    /// Check if using persistent storage.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        matches!(self.backend, StoreBackend::Persistent(_))
    }

    fn store(&self) -> &dyn RecordStore {
        match &self.backend {
            StoreBackend::InMemory(s) => s,
            StoreBackend::Persistent(s) => s,
        }
    }

    fn store_mut(&mut self) -> &mut dyn RecordStore {
        match &mut self.backend {
            StoreBackend::InMemory(s) => s,
            StoreBackend::Persistent(s) => s,
        }
    }

    // =========================================================================
    // TAXONOMY OPERATIONS
    // =========================================================================

    /// Create a main category with a selected child set.
    pub fn create_main(
        &mut self,
        name: &str,
        description: &str,
        children: &[CategoryId],
    ) -> Result<Category, CatalogError> {
        TaxonomyEngine::create_main(self.store_mut(), name, description, children)
    }

    /// Create a sub-category attached to a selected parent set.
    pub fn create_sub(
        &mut self,
        name: &str,
        description: &str,
        parents: &[CategoryId],
    ) -> Result<Category, CatalogError> {
        TaxonomyEngine::create_sub(self.store_mut(), name, description, parents)
    }

    /// Attach a sub-category to an additional parent (idempotent).
    pub fn attach_child(
        &mut self,
        parent: CategoryId,
        child: CategoryId,
    ) -> Result<Category, CatalogError> {
        TaxonomyEngine::attach_child(self.store_mut(), parent, child)
    }

    /// Detach a sub-category from a parent (idempotent).
    pub fn detach_child(
        &mut self,
        parent: CategoryId,
        child: CategoryId,
    ) -> Result<Category, CatalogError> {
        TaxonomyEngine::detach_child(self.store_mut(), parent, child)
    }

    /// Replace the full child set of a main category atomically.
    pub fn replace_children(
        &mut self,
        main: CategoryId,
        children: &[CategoryId],
    ) -> Result<Category, CatalogError> {
        TaxonomyEngine::replace_children(self.store_mut(), main, children)
    }

    /// Promote a sub-category to a main category.
    pub fn promote_to_main(
        &mut self,
        id: CategoryId,
        initial_children: &[CategoryId],
    ) -> Result<Category, CatalogError> {
        TaxonomyEngine::promote_to_main(self.store_mut(), id, initial_children)
    }

    /// Demote a main category to a sub-category. The discarded child set is
    /// returned for audit logging; it is not restored by a later promotion.
    pub fn demote_to_sub(
        &mut self,
        id: CategoryId,
        new_parents: &[CategoryId],
    ) -> Result<Demotion, CatalogError> {
        TaxonomyEngine::demote_to_sub(self.store_mut(), id, new_parents)
    }

    /// Compute the deletion set for a category without mutating anything.
    pub fn plan_delete(&self, id: CategoryId) -> Result<DeletePlan, CatalogError> {
        cascade::plan_delete(self.store(), id)
    }

    /// Execute a deletion under the two-phase confirm protocol.
    pub fn execute_delete(
        &mut self,
        id: CategoryId,
        confirmed: bool,
    ) -> Result<DeleteOutcome, CatalogError> {
        cascade::execute_delete(self.store_mut(), id, confirmed)
    }

    // =========================================================================
    // READS
    // =========================================================================

    /// Fetch a category by id.
    pub fn category(&self, id: CategoryId) -> Result<Option<Category>, CatalogError> {
        self.store().category(id)
    }

    /// All categories in id order.
    pub fn categories(&self) -> Result<Vec<Category>, CatalogError> {
        self.store().categories()
    }

    /// The main categories currently listing `child`.
    pub fn parents_of(&self, child: CategoryId) -> Result<Vec<CategoryId>, CatalogError> {
        self.store().parents_of(child)
    }

    /// Every main category with its instrument count.
    pub fn category_counts(&self) -> Result<Vec<(Category, u64)>, CatalogError> {
        inventory::category_counts(self.store())
    }

    /// Count instruments filed under a category (main or sub).
    pub fn count_instruments_in(&self, id: CategoryId) -> Result<u64, CatalogError> {
        inventory::count_in(self.store(), id)
    }

    /// Catalog totals.
    pub fn counts(&self) -> Result<CatalogCounts, CatalogError> {
        Ok(CatalogCounts {
            categories: self.store().category_count()?,
            instruments: self.store().instrument_count()?,
        })
    }

    // =========================================================================
    // INSTRUMENTS
    // =========================================================================

    /// Create an instrument, validating its category references.
    pub fn create_instrument(&mut self, new: NewInstrument) -> Result<Instrument, CatalogError> {
        inventory::create_instrument(self.store_mut(), new)
    }

    /// Fetch an instrument, surfacing a missing record as an error.
    pub fn instrument(&self, id: InstrumentId) -> Result<Instrument, CatalogError> {
        inventory::instrument_detail(self.store(), id)
    }

    /// All instruments in id order.
    pub fn instruments(&self) -> Result<Vec<Instrument>, CatalogError> {
        self.store().instruments()
    }

    /// Instruments filed under a category, main or sub.
    pub fn instruments_in(&self, id: CategoryId) -> Result<Vec<Instrument>, CatalogError> {
        inventory::instruments_in(self.store(), id)
    }
}

// =============================================================================
// TESTS
// =============================================================================
