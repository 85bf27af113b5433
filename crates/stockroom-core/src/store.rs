//! # Record Store
//!
//! The capability contract the taxonomy engine is written against, plus the
//! in-memory implementation.
//!
//! The engine never mutates category records by direct field overwrite; it
//! goes through these operations, each of which is atomic at the
//! single-record level. `add_child` / `remove_child` are set-membership
//! primitives (add-to-set / pull-from-set), not read-modify-write of the
//! whole list, so concurrent attach/detach on the same parent cannot lose
//! updates in a backend that honors the contract.

use crate::types::{
    CatalogError, Category, CategoryId, CategoryKind, Instrument, InstrumentId, KindName,
    NewInstrument,
};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// RECORDSTORE TRAIT
// =============================================================================

/// Abstract record store for categories and instruments.
///
/// All fallible operations return `Result<T, CatalogError>` so that the
/// in-memory and persistent backends are interchangeable. Implementations
/// must keep the reverse child-to-parents index consistent with the forward
/// child sets across every mutation.
pub trait RecordStore {
    /// Fetch a category by id.
    fn category(&self, id: CategoryId) -> Result<Option<Category>, CatalogError>;

    /// All categories in deterministic (id) order.
    fn categories(&self) -> Result<Vec<Category>, CatalogError>;

    /// Insert a new category; the store assigns the id.
    fn insert_category(
        &mut self,
        name: String,
        description: String,
        kind: CategoryKind,
    ) -> Result<Category, CatalogError>;

    /// Add `child` to the child set of `parent` (idempotent add-to-set).
    /// Fails with `NotFound` if the parent does not resolve, or
    /// `InvalidReference` if it is not a main category.
    fn add_child(&mut self, parent: CategoryId, child: CategoryId) -> Result<(), CatalogError>;

    /// Remove `child` from the child set of `parent` (idempotent
    /// pull-from-set; removing an absent id is a no-op).
    fn remove_child(&mut self, parent: CategoryId, child: CategoryId) -> Result<(), CatalogError>;

    /// Atomically replace the full child set of a main category. Concurrent
    /// readers see either the old set or the new set, never a partial one.
    fn replace_children(
        &mut self,
        id: CategoryId,
        children: BTreeSet<CategoryId>,
    ) -> Result<(), CatalogError>;

    /// Overwrite the kind of a category (promote/demote primitive).
    fn set_kind(&mut self, id: CategoryId, kind: CategoryKind) -> Result<(), CatalogError>;

    /// Delete a category record. Returns `false` when the id was already
    /// gone (idempotent delete).
    fn delete_category(&mut self, id: CategoryId) -> Result<bool, CatalogError>;

    /// All main categories currently listing `child`, via the reverse index.
    fn parents_of(&self, child: CategoryId) -> Result<Vec<CategoryId>, CatalogError>;

    /// Total number of category records.
    fn category_count(&self) -> Result<usize, CatalogError>;

    /// Insert a new instrument; the store assigns the id.
    fn insert_instrument(&mut self, new: NewInstrument) -> Result<Instrument, CatalogError>;

    /// Fetch an instrument by id.
    fn instrument(&self, id: InstrumentId) -> Result<Option<Instrument>, CatalogError>;

    /// All instruments in deterministic (id) order.
    fn instruments(&self) -> Result<Vec<Instrument>, CatalogError>;

    /// Instruments whose main category is `id`.
    fn instruments_by_category(&self, id: CategoryId) -> Result<Vec<Instrument>, CatalogError>;

    /// Instruments whose sub-category is `id`.
    fn instruments_by_sub_category(&self, id: CategoryId)
    -> Result<Vec<Instrument>, CatalogError>;

    /// Count instruments whose main category is `id`.
    fn count_by_category(&self, id: CategoryId) -> Result<u64, CatalogError>;

    /// Count instruments whose sub-category is `id`.
    fn count_by_sub_category(&self, id: CategoryId) -> Result<u64, CatalogError>;

    /// Total number of instrument records.
    fn instrument_count(&self) -> Result<usize, CatalogError>;
}

// =============================================================================
// MEMORYSTORE IMPLEMENTATION
// =============================================================================

/// In-memory record store.
///
/// Uses `BTreeMap` exclusively for deterministic ordering. Maintains an
/// explicit reverse index from child id to parent ids alongside the forward
/// child sets, so `parents_of` is a lookup instead of a scan over all main
/// categories.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    categories: BTreeMap<CategoryId, Category>,
    instruments: BTreeMap<InstrumentId, Instrument>,

    /// Reverse index: child id -> set of parent ids.
    parent_index: BTreeMap<CategoryId, BTreeSet<CategoryId>>,

    next_category_id: u64,
    next_instrument_id: u64,
}

impl MemoryStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn index_link(&mut self, child: CategoryId, parent: CategoryId) {
        self.parent_index.entry(child).or_default().insert(parent);
    }

    fn index_unlink(&mut self, child: CategoryId, parent: CategoryId) {
        if let Some(parents) = self.parent_index.get_mut(&child) {
            parents.remove(&parent);
            if parents.is_empty() {
                self.parent_index.remove(&child);
            }
        }
    }
}

impl RecordStore for MemoryStore {
    fn category(&self, id: CategoryId) -> Result<Option<Category>, CatalogError> {
        Ok(self.categories.get(&id).cloned())
    }

    fn categories(&self) -> Result<Vec<Category>, CatalogError> {
        Ok(self.categories.values().cloned().collect())
    }

    fn insert_category(
        &mut self,
        name: String,
        description: String,
        kind: CategoryKind,
    ) -> Result<Category, CatalogError> {
        let id = CategoryId(self.next_category_id);
        self.next_category_id = self.next_category_id.saturating_add(1);

        if let CategoryKind::Main { children } = &kind {
            for &child in children {
                self.index_link(child, id);
            }
        }

        let category = Category {
            id,
            name,
            description,
            kind,
        };
        self.categories.insert(id, category.clone());
        Ok(category)
    }

    fn add_child(&mut self, parent: CategoryId, child: CategoryId) -> Result<(), CatalogError> {
        let record = self
            .categories
            .get_mut(&parent)
            .ok_or(CatalogError::NotFound(parent))?;
        match &mut record.kind {
            CategoryKind::Main { children } => {
                children.insert(child);
            }
            CategoryKind::Sub => {
                return Err(CatalogError::InvalidReference {
                    id: parent,
                    expected: KindName::Main,
                    found: KindName::Sub,
                });
            }
        }
        self.index_link(child, parent);
        Ok(())
    }

    fn remove_child(&mut self, parent: CategoryId, child: CategoryId) -> Result<(), CatalogError> {
        let record = self
            .categories
            .get_mut(&parent)
            .ok_or(CatalogError::NotFound(parent))?;
        match &mut record.kind {
            CategoryKind::Main { children } => {
                children.remove(&child);
            }
            CategoryKind::Sub => {
                return Err(CatalogError::InvalidReference {
                    id: parent,
                    expected: KindName::Main,
                    found: KindName::Sub,
                });
            }
        }
        self.index_unlink(child, parent);
        Ok(())
    }

    fn replace_children(
        &mut self,
        id: CategoryId,
        children: BTreeSet<CategoryId>,
    ) -> Result<(), CatalogError> {
        let record = self
            .categories
            .get_mut(&id)
            .ok_or(CatalogError::NotFound(id))?;
        let old = match &mut record.kind {
            CategoryKind::Main { children: old } => std::mem::replace(old, children.clone()),
            CategoryKind::Sub => {
                return Err(CatalogError::InvalidReference {
                    id,
                    expected: KindName::Main,
                    found: KindName::Sub,
                });
            }
        };
        for &child in old.difference(&children) {
            self.index_unlink(child, id);
        }
        for &child in &children {
            self.index_link(child, id);
        }
        Ok(())
    }

    fn set_kind(&mut self, id: CategoryId, kind: CategoryKind) -> Result<(), CatalogError> {
        let record = self
            .categories
            .get_mut(&id)
            .ok_or(CatalogError::NotFound(id))?;
        let old_children = match std::mem::replace(&mut record.kind, kind.clone()) {
            CategoryKind::Main { children } => children,
            CategoryKind::Sub => BTreeSet::new(),
        };
        for &child in &old_children {
            self.index_unlink(child, id);
        }
        if let CategoryKind::Main { children } = &kind {
            for &child in children {
                self.index_link(child, id);
            }
        }
        Ok(())
    }

    fn delete_category(&mut self, id: CategoryId) -> Result<bool, CatalogError> {
        let Some(record) = self.categories.remove(&id) else {
            return Ok(false);
        };
        // Drop index entries in both directions: entries where this record
        // was the parent, and entries where it was the child.
        if let CategoryKind::Main { children } = &record.kind {
            for &child in children {
                self.index_unlink(child, id);
            }
        }
        self.parent_index.remove(&id);
        Ok(true)
    }

    fn parents_of(&self, child: CategoryId) -> Result<Vec<CategoryId>, CatalogError> {
        Ok(self
            .parent_index
            .get(&child)
            .map(|parents| parents.iter().copied().collect())
            .unwrap_or_default())
    }

    fn category_count(&self) -> Result<usize, CatalogError> {
        Ok(self.categories.len())
    }

    fn insert_instrument(&mut self, new: NewInstrument) -> Result<Instrument, CatalogError> {
        let id = InstrumentId(self.next_instrument_id);
        self.next_instrument_id = self.next_instrument_id.saturating_add(1);

        let instrument = Instrument {
            id,
            name: new.name,
            brand: new.brand,
            description: new.description,
            price_cents: new.price_cents,
            stock: new.stock,
            category: new.category,
            sub_category: new.sub_category,
            image: new.image,
        };
        self.instruments.insert(id, instrument.clone());
        Ok(instrument)
    }

    fn instrument(&self, id: InstrumentId) -> Result<Option<Instrument>, CatalogError> {
        Ok(self.instruments.get(&id).cloned())
    }

    fn instruments(&self) -> Result<Vec<Instrument>, CatalogError> {
        Ok(self.instruments.values().cloned().collect())
    }

    fn instruments_by_category(&self, id: CategoryId) -> Result<Vec<Instrument>, CatalogError> {
        Ok(self
            .instruments
            .values()
            .filter(|i| i.category == id)
            .cloned()
            .collect())
    }

    fn instruments_by_sub_category(
        &self,
        id: CategoryId,
    ) -> Result<Vec<Instrument>, CatalogError> {
        Ok(self
            .instruments
            .values()
            .filter(|i| i.sub_category == Some(id))
            .cloned()
            .collect())
    }

    fn count_by_category(&self, id: CategoryId) -> Result<u64, CatalogError> {
        Ok(self.instruments.values().filter(|i| i.category == id).count() as u64)
    }

    fn count_by_sub_category(&self, id: CategoryId) -> Result<u64, CatalogError> {
        Ok(self
            .instruments
            .values()
            .filter(|i| i.sub_category == Some(id))
            .count() as u64)
    }

    fn instrument_count(&self) -> Result<usize, CatalogError> {
        Ok(self.instruments.len())
    }
}

// =============================================================================
// TESTS
// =============================================================================
