//! # redb-backed Record Store
//!
//! A disk-backed record store using the redb embedded database.
//!
//! Every `RecordStore` operation runs in a single redb transaction, so each
//! list mutation (add-to-set, pull-from-set, whole-set replace) is atomic
//! at the record level — the §add/remove primitives the engine relies on to
//! avoid lost updates under concurrent attach/detach.
//!
//! The reverse child-to-parents relation is a dedicated table keyed
//! `(child, parent)`, so `parents_of` is a range scan instead of a walk
//! over every main category.

use crate::store::RecordStore;
use crate::types::{
    CatalogError, Category, CategoryId, CategoryKind, Instrument, InstrumentId, KindName,
    NewInstrument,
};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::collections::BTreeSet;
use std::path::Path;

/// Table for categories: CategoryId(u64) -> postcard-serialized Category
const CATEGORIES: TableDefinition<u64, &[u8]> = TableDefinition::new("categories");

/// Table for instruments: InstrumentId(u64) -> postcard-serialized Instrument
const INSTRUMENTS: TableDefinition<u64, &[u8]> = TableDefinition::new("instruments");

/// Reverse index: (child_id, parent_id) -> ()
const CHILD_INDEX: TableDefinition<(u64, u64), ()> = TableDefinition::new("child_index");

/// Table for metadata: key string -> value u64 (next-id counters)
const META: TableDefinition<&str, u64> = TableDefinition::new("meta");

/// Map a redb error into the catalog error taxonomy.
fn io<E: std::fmt::Display>(e: E) -> CatalogError {
    CatalogError::Storage(e.to_string())
}

fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, CatalogError> {
    postcard::to_stdvec(value).map_err(|e| CatalogError::Serialization(e.to_string()))
}

fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T, CatalogError> {
    postcard::from_bytes(bytes).map_err(|e| CatalogError::Serialization(e.to_string()))
}

/// A disk-backed record store using redb.
pub struct RedbStore {
    /// The redb database handle.
    db: Database,
    /// Next available category id.
    next_category_id: u64,
    /// Next available instrument id.
    next_instrument_id: u64,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore")
            .field("next_category_id", &self.next_category_id)
            .field("next_instrument_id", &self.next_instrument_id)
            .finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Open or create a catalog database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let db = Database::create(path.as_ref()).map_err(io)?;

        // Initialize tables if they don't exist
        {
            let write_txn = db.begin_write().map_err(io)?;
            let _ = write_txn.open_table(CATEGORIES).map_err(io)?;
            let _ = write_txn.open_table(INSTRUMENTS).map_err(io)?;
            let _ = write_txn.open_table(CHILD_INDEX).map_err(io)?;
            let _ = write_txn.open_table(META).map_err(io)?;
            write_txn.commit().map_err(io)?;
        }

        // Load counters
        let read_txn = db.begin_read().map_err(io)?;
        let (next_category_id, next_instrument_id) = {
            let table = read_txn.open_table(META).map_err(io)?;
            let cat = table
                .get("next_category_id")
                .map_err(io)?
                .map(|v| v.value())
                .unwrap_or(0);
            let inst = table
                .get("next_instrument_id")
                .map_err(io)?
                .map(|v| v.value())
                .unwrap_or(0);
            (cat, inst)
        };

        Ok(Self {
            db,
            next_category_id,
            next_instrument_id,
        })
    }

    /// Compact the database (optional maintenance).
    pub fn compact(&mut self) -> Result<(), CatalogError> {
        self.db.compact().map_err(io)?;
        Ok(())
    }

    fn read_category(
        table: &impl ReadableTable<u64, &'static [u8]>,
        id: CategoryId,
    ) -> Result<Option<Category>, CatalogError> {
        let Some(guard) = table.get(id.0).map_err(io)? else {
            return Ok(None);
        };
        decode(guard.value()).map(Some)
    }
}

impl RecordStore for RedbStore {
    fn category(&self, id: CategoryId) -> Result<Option<Category>, CatalogError> {
        let read_txn = self.db.begin_read().map_err(io)?;
        let table = read_txn.open_table(CATEGORIES).map_err(io)?;
        Self::read_category(&table, id)
    }

    fn categories(&self) -> Result<Vec<Category>, CatalogError> {
        let read_txn = self.db.begin_read().map_err(io)?;
        let table = read_txn.open_table(CATEGORIES).map_err(io)?;
        let mut out = Vec::new();
        for entry in table.iter().map_err(io)? {
            let (_, value) = entry.map_err(io)?;
            out.push(decode(value.value())?);
        }
        Ok(out)
    }

    fn insert_category(
        &mut self,
        name: String,
        description: String,
        kind: CategoryKind,
    ) -> Result<Category, CatalogError> {
        let id = CategoryId(self.next_category_id);
        let category = Category {
            id,
            name,
            description,
            kind,
        };
        let bytes = encode(&category)?;

        let write_txn = self.db.begin_write().map_err(io)?;
        {
            let mut table = write_txn.open_table(CATEGORIES).map_err(io)?;
            table.insert(id.0, bytes.as_slice()).map_err(io)?;

            if let CategoryKind::Main { children } = &category.kind {
                let mut index = write_txn.open_table(CHILD_INDEX).map_err(io)?;
                for child in children {
                    index.insert((child.0, id.0), ()).map_err(io)?;
                }
            }

            let mut meta = write_txn.open_table(META).map_err(io)?;
            meta.insert("next_category_id", id.0.saturating_add(1))
                .map_err(io)?;
        }
        write_txn.commit().map_err(io)?;

        self.next_category_id = self.next_category_id.saturating_add(1);
        Ok(category)
    }

    fn add_child(&mut self, parent: CategoryId, child: CategoryId) -> Result<(), CatalogError> {
        let write_txn = self.db.begin_write().map_err(io)?;
        {
            let mut table = write_txn.open_table(CATEGORIES).map_err(io)?;
            let mut record =
                Self::read_category(&table, parent)?.ok_or(CatalogError::NotFound(parent))?;
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
            let bytes = encode(&record)?;
            table.insert(parent.0, bytes.as_slice()).map_err(io)?;

            let mut index = write_txn.open_table(CHILD_INDEX).map_err(io)?;
            index.insert((child.0, parent.0), ()).map_err(io)?;
        }
        write_txn.commit().map_err(io)?;
        Ok(())
    }

    fn remove_child(&mut self, parent: CategoryId, child: CategoryId) -> Result<(), CatalogError> {
        let write_txn = self.db.begin_write().map_err(io)?;
        {
            let mut table = write_txn.open_table(CATEGORIES).map_err(io)?;
            let mut record =
                Self::read_category(&table, parent)?.ok_or(CatalogError::NotFound(parent))?;
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
            let bytes = encode(&record)?;
            table.insert(parent.0, bytes.as_slice()).map_err(io)?;

            let mut index = write_txn.open_table(CHILD_INDEX).map_err(io)?;
            index.remove((child.0, parent.0)).map_err(io)?;
        }
        write_txn.commit().map_err(io)?;
        Ok(())
    }

    fn replace_children(
        &mut self,
        id: CategoryId,
        children: BTreeSet<CategoryId>,
    ) -> Result<(), CatalogError> {
        let write_txn = self.db.begin_write().map_err(io)?;
        {
            let mut table = write_txn.open_table(CATEGORIES).map_err(io)?;
            let mut record =
                Self::read_category(&table, id)?.ok_or(CatalogError::NotFound(id))?;
            let old = match &mut record.kind {
                CategoryKind::Main { children: old } => {
                    std::mem::replace(old, children.clone())
                }
                CategoryKind::Sub => {
                    return Err(CatalogError::InvalidReference {
                        id,
                        expected: KindName::Main,
                        found: KindName::Sub,
                    });
                }
            };
            let bytes = encode(&record)?;
            table.insert(id.0, bytes.as_slice()).map_err(io)?;

            let mut index = write_txn.open_table(CHILD_INDEX).map_err(io)?;
            for child in old.difference(&children) {
                index.remove((child.0, id.0)).map_err(io)?;
            }
            for child in &children {
                index.insert((child.0, id.0), ()).map_err(io)?;
            }
        }
        write_txn.commit().map_err(io)?;
        Ok(())
    }

    fn set_kind(&mut self, id: CategoryId, kind: CategoryKind) -> Result<(), CatalogError> {
        let write_txn = self.db.begin_write().map_err(io)?;
        {
            let mut table = write_txn.open_table(CATEGORIES).map_err(io)?;
            let mut record =
                Self::read_category(&table, id)?.ok_or(CatalogError::NotFound(id))?;
            let old_children = match std::mem::replace(&mut record.kind, kind.clone()) {
                CategoryKind::Main { children } => children,
                CategoryKind::Sub => BTreeSet::new(),
            };
            let bytes = encode(&record)?;
            table.insert(id.0, bytes.as_slice()).map_err(io)?;

            let mut index = write_txn.open_table(CHILD_INDEX).map_err(io)?;
            for child in &old_children {
                index.remove((child.0, id.0)).map_err(io)?;
            }
            if let CategoryKind::Main { children } = &kind {
                for child in children {
                    index.insert((child.0, id.0), ()).map_err(io)?;
                }
            }
        }
        write_txn.commit().map_err(io)?;
        Ok(())
    }

    fn delete_category(&mut self, id: CategoryId) -> Result<bool, CatalogError> {
        let write_txn = self.db.begin_write().map_err(io)?;
        let existed;
        {
            let mut table = write_txn.open_table(CATEGORIES).map_err(io)?;
            let record = Self::read_category(&table, id)?;
            table.remove(id.0).map_err(io)?;
            existed = record.is_some();

            let mut index = write_txn.open_table(CHILD_INDEX).map_err(io)?;
            // Entries where this record was the parent
            if let Some(Category {
                kind: CategoryKind::Main { children },
                ..
            }) = record
            {
                for child in &children {
                    index.remove((child.0, id.0)).map_err(io)?;
                }
            }
            // Entries where this record was the child
            let stale: Vec<(u64, u64)> = index
                .range((id.0, 0)..=(id.0, u64::MAX))
                .map_err(io)?
                .map(|entry| entry.map(|(key, _)| key.value()).map_err(io))
                .collect::<Result<_, _>>()?;
            for key in stale {
                index.remove(key).map_err(io)?;
            }
        }
        write_txn.commit().map_err(io)?;
        Ok(existed)
    }

    fn parents_of(&self, child: CategoryId) -> Result<Vec<CategoryId>, CatalogError> {
        let read_txn = self.db.begin_read().map_err(io)?;
        let index = read_txn.open_table(CHILD_INDEX).map_err(io)?;
        let mut parents = Vec::new();
        for entry in index
            .range((child.0, 0)..=(child.0, u64::MAX))
            .map_err(io)?
        {
            let (key, _) = entry.map_err(io)?;
            parents.push(CategoryId(key.value().1));
        }
        Ok(parents)
    }

    fn category_count(&self) -> Result<usize, CatalogError> {
        let read_txn = self.db.begin_read().map_err(io)?;
        let table = read_txn.open_table(CATEGORIES).map_err(io)?;
        let mut count = 0usize;
        for entry in table.iter().map_err(io)? {
            entry.map_err(io)?;
            count = count.saturating_add(1);
        }
        Ok(count)
    }

    fn insert_instrument(&mut self, new: NewInstrument) -> Result<Instrument, CatalogError> {
        let id = InstrumentId(self.next_instrument_id);
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
        let bytes = encode(&instrument)?;

        let write_txn = self.db.begin_write().map_err(io)?;
        {
            let mut table = write_txn.open_table(INSTRUMENTS).map_err(io)?;
            table.insert(id.0, bytes.as_slice()).map_err(io)?;

            let mut meta = write_txn.open_table(META).map_err(io)?;
            meta.insert("next_instrument_id", id.0.saturating_add(1))
                .map_err(io)?;
        }
        write_txn.commit().map_err(io)?;

        self.next_instrument_id = self.next_instrument_id.saturating_add(1);
        Ok(instrument)
    }

    fn instrument(&self, id: InstrumentId) -> Result<Option<Instrument>, CatalogError> {
        let read_txn = self.db.begin_read().map_err(io)?;
        let table = read_txn.open_table(INSTRUMENTS).map_err(io)?;
        let Some(guard) = table.get(id.0).map_err(io)? else {
            return Ok(None);
        };
        decode(guard.value()).map(Some)
    }

    fn instruments(&self) -> Result<Vec<Instrument>, CatalogError> {
        let read_txn = self.db.begin_read().map_err(io)?;
        let table = read_txn.open_table(INSTRUMENTS).map_err(io)?;
        let mut out = Vec::new();
        for entry in table.iter().map_err(io)? {
            let (_, value) = entry.map_err(io)?;
            out.push(decode(value.value())?);
        }
        Ok(out)
    }

    fn instruments_by_category(&self, id: CategoryId) -> Result<Vec<Instrument>, CatalogError> {
        Ok(self
            .instruments()?
            .into_iter()
            .filter(|i| i.category == id)
            .collect())
    }

    fn instruments_by_sub_category(
        &self,
        id: CategoryId,
    ) -> Result<Vec<Instrument>, CatalogError> {
        Ok(self
            .instruments()?
            .into_iter()
            .filter(|i| i.sub_category == Some(id))
            .collect())
    }

    fn count_by_category(&self, id: CategoryId) -> Result<u64, CatalogError> {
        Ok(self.instruments_by_category(id)?.len() as u64)
    }

    fn count_by_sub_category(&self, id: CategoryId) -> Result<u64, CatalogError> {
        Ok(self.instruments_by_sub_category(id)?.len() as u64)
    }

    fn instrument_count(&self) -> Result<usize, CatalogError> {
        let read_txn = self.db.begin_read().map_err(io)?;
        let table = read_txn.open_table(INSTRUMENTS).map_err(io)?;
        let mut count = 0usize;
        for entry in table.iter().map_err(io)? {
            entry.map_err(io)?;
            count = count.saturating_add(1);
        }
        Ok(count)
    }
}

// =============================================================================
// TESTS
// =============================================================================
