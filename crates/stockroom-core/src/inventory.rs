//! # Inventory Operations
//!
//! Single-record instrument CRUD. No cross-record invariants live here;
//! instruments hold foreign references into the taxonomy and are read-only
//! inputs to the engine's dependency counting.

use crate::engine::TaxonomyEngine;
use crate::limits::{MAX_DESCRIPTION_LENGTH, MAX_IMAGE_BYTES, MAX_NAME_LENGTH};
use crate::store::RecordStore;
use crate::types::{
    CatalogError, Category, CategoryId, CategoryKind, Instrument, InstrumentId, KindName,
    NewInstrument,
};

/// Create an instrument, validating its category references.
///
/// `category` must resolve to a main category and `sub_category` (when
/// given) to a sub-category. An image missing either its payload or MIME
/// type is dropped rather than stored.
pub fn create_instrument<S: RecordStore + ?Sized>(
    store: &mut S,
    mut new: NewInstrument,
) -> Result<Instrument, CatalogError> {
    if new.name.is_empty() {
        return Err(CatalogError::EmptyField("name"));
    }
    if new.name.len() > MAX_NAME_LENGTH {
        return Err(CatalogError::FieldTooLarge {
            field: "name",
            len: new.name.len(),
            max: MAX_NAME_LENGTH,
        });
    }
    if new.description.is_empty() {
        return Err(CatalogError::EmptyField("description"));
    }
    if new.description.len() > MAX_DESCRIPTION_LENGTH {
        return Err(CatalogError::FieldTooLarge {
            field: "description",
            len: new.description.len(),
            max: MAX_DESCRIPTION_LENGTH,
        });
    }
    if let Some(image) = &new.image {
        if image.bytes.len() > MAX_IMAGE_BYTES {
            return Err(CatalogError::FieldTooLarge {
                field: "image",
                len: image.bytes.len(),
                max: MAX_IMAGE_BYTES,
            });
        }
        if !image.is_complete() {
            new.image = None;
        }
    }

    require_kind(store, new.category, KindName::Main)?;
    if let Some(sub) = new.sub_category {
        require_kind(store, sub, KindName::Sub)?;
    }

    store.insert_instrument(new)
}

fn require_kind<S: RecordStore + ?Sized>(
    store: &S,
    id: CategoryId,
    expected: KindName,
) -> Result<(), CatalogError> {
    let category = store.category(id)?.ok_or(CatalogError::NotFound(id))?;
    let found = category.kind.name();
    if found != expected {
        return Err(CatalogError::InvalidReference {
            id,
            expected,
            found,
        });
    }
    Ok(())
}

/// Fetch an instrument by id, surfacing a missing record as an error.
pub fn instrument_detail<S: RecordStore + ?Sized>(
    store: &S,
    id: InstrumentId,
) -> Result<Instrument, CatalogError> {
    store
        .instrument(id)?
        .ok_or(CatalogError::InstrumentNotFound(id))
}

/// Instruments filed under a category, main or sub.
///
/// Dispatches on the category's kind: a main category lists by the
/// instruments' `category` reference, a sub-category by `sub_category`.
pub fn instruments_in<S: RecordStore + ?Sized>(
    store: &S,
    id: CategoryId,
) -> Result<Vec<Instrument>, CatalogError> {
    let category = store.category(id)?.ok_or(CatalogError::NotFound(id))?;
    match category.kind {
        CategoryKind::Main { .. } => store.instruments_by_category(id),
        CategoryKind::Sub => store.instruments_by_sub_category(id),
    }
}

/// Every main category paired with its instrument count, for the catalog
/// listing. Counts are by the instruments' main-category reference.
pub fn category_counts<S: RecordStore + ?Sized>(
    store: &S,
) -> Result<Vec<(Category, u64)>, CatalogError> {
    let mut out = Vec::new();
    for category in store.categories()? {
        if category.is_main() {
            let count = store.count_by_category(category.id)?;
            out.push((category, count));
        }
    }
    Ok(out)
}

/// Count the instruments filed under a category, main or sub.
pub fn count_in<S: RecordStore + ?Sized>(
    store: &S,
    id: CategoryId,
) -> Result<u64, CatalogError> {
    TaxonomyEngine::count_instruments_in(store, id)
}

// =============================================================================
// TESTS
// =============================================================================
