//! # Taxonomy Engine
//!
//! Consolidates the category-graph mutation operations.
//!
//! The taxonomy is a two-level relation: main categories own sets of
//! sub-category children; a sub-category may be attached to any number of
//! mains. The engine keeps that relation symmetric and free of dangling
//! references across create, attach/detach, replace, and promote/demote.
//!
//! All membership mutations are idempotent: attaching an already-present
//! child, or detaching an absent one, succeeds and leaves state unchanged.
//!
//! There is no cross-record transaction. Multi-step operations
//! (create-sub-with-parents, promote, demote) re-establish symmetry at the
//! end of the sequence; a mid-sequence store failure surfaces as
//! `PartialUpdate` with the applied and remaining ids, and the caller owns
//! the remediation policy.

use crate::limits::{MAX_CHILD_SET, MAX_DESCRIPTION_LENGTH, MAX_NAME_LENGTH};
use crate::store::RecordStore;
use crate::types::{CatalogError, Category, CategoryId, CategoryKind, KindName};
use std::collections::BTreeSet;

/// Result of a Main→Sub demotion.
///
/// The prior child set is discarded, not restored on a later promotion;
/// it is returned here so the caller can log it for audit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Demotion {
    /// The demoted category, re-read after the mutation sequence.
    pub category: Category,
    /// The children that were orphaned by the demotion.
    pub discarded_children: BTreeSet<CategoryId>,
}

/// The TaxonomyEngine consolidates all category mutation operations.
///
/// Category records are mutated ONLY through these operations, never by
/// direct field overwrite; every operation re-reads the records it needs
/// at invocation time (no in-process caching).
pub struct TaxonomyEngine;

impl TaxonomyEngine {
    /// Resolve `id` and require it to be of `expected` kind.
    ///
    /// `NotFound` when the id does not resolve, `InvalidReference` when it
    /// resolves to the other kind.
    fn require_kind<S: RecordStore + ?Sized>(
        store: &S,
        id: CategoryId,
        expected: KindName,
    ) -> Result<Category, CatalogError> {
        let category = store.category(id)?.ok_or(CatalogError::NotFound(id))?;
        let found = category.kind.name();
        if found != expected {
            return Err(CatalogError::InvalidReference {
                id,
                expected,
                found,
            });
        }
        Ok(category)
    }

    fn validate_text(field: &'static str, value: &str, max: usize) -> Result<(), CatalogError> {
        if value.is_empty() {
            return Err(CatalogError::EmptyField(field));
        }
        if value.len() > max {
            return Err(CatalogError::FieldTooLarge {
                field,
                len: value.len(),
                max,
            });
        }
        Ok(())
    }

    /// Deduplicate a caller-supplied id list into a set, bounding its size.
    /// Duplicates are silently collapsed, not an error.
    fn to_id_set(ids: &[CategoryId]) -> Result<BTreeSet<CategoryId>, CatalogError> {
        let set: BTreeSet<CategoryId> = ids.iter().copied().collect();
        if set.len() > MAX_CHILD_SET {
            return Err(CatalogError::FieldTooLarge {
                field: "children",
                len: set.len(),
                max: MAX_CHILD_SET,
            });
        }
        Ok(set)
    }

    /// Append `child` to each parent's set in order, translating a
    /// mid-sequence store failure into `PartialUpdate`.
    fn attach_to_parents<S: RecordStore + ?Sized>(
        store: &mut S,
        child: CategoryId,
        parents: &BTreeSet<CategoryId>,
    ) -> Result<(), CatalogError> {
        let mut applied = Vec::new();
        for &parent in parents {
            if let Err(cause) = store.add_child(parent, child) {
                let remaining = parents
                    .iter()
                    .copied()
                    .filter(|p| *p > parent)
                    .collect();
                return Err(CatalogError::PartialUpdate {
                    applied,
                    failed: parent,
                    remaining,
                    cause: cause.to_string(),
                });
            }
            applied.push(parent);
        }
        Ok(())
    }

    /// Pull `child` from each listed parent in order, translating a
    /// mid-sequence store failure into `PartialUpdate`.
    fn detach_from_parents<S: RecordStore + ?Sized>(
        store: &mut S,
        child: CategoryId,
        parents: &[CategoryId],
    ) -> Result<(), CatalogError> {
        let mut applied = Vec::new();
        for (i, &parent) in parents.iter().enumerate() {
            if let Err(cause) = store.remove_child(parent, child) {
                return Err(CatalogError::PartialUpdate {
                    applied,
                    failed: parent,
                    remaining: parents[i.saturating_add(1)..].to_vec(),
                    cause: cause.to_string(),
                });
            }
            applied.push(parent);
        }
        Ok(())
    }

    /// Create a main category with a selected child set.
    ///
    /// Every child must currently be a sub-category. Only the new record is
    /// written; children do not store parent pointers.
    pub fn create_main<S: RecordStore + ?Sized>(
        store: &mut S,
        name: &str,
        description: &str,
        children: &[CategoryId],
    ) -> Result<Category, CatalogError> {
        Self::validate_text("name", name, MAX_NAME_LENGTH)?;
        Self::validate_text("description", description, MAX_DESCRIPTION_LENGTH)?;

        let children = Self::to_id_set(children)?;
        for &child in &children {
            Self::require_kind(store, child, KindName::Sub)?;
        }

        store.insert_category(
            name.to_string(),
            description.to_string(),
            CategoryKind::Main { children },
        )
    }

    /// Create a sub-category attached to a selected parent set.
    ///
    /// Parents are validated BEFORE the insert; the new id is then appended
    /// to every parent (idempotent union). A failure after the insert
    /// leaves the record in place and reports `PartialUpdate`.
    pub fn create_sub<S: RecordStore + ?Sized>(
        store: &mut S,
        name: &str,
        description: &str,
        parents: &[CategoryId],
    ) -> Result<Category, CatalogError> {
        Self::validate_text("name", name, MAX_NAME_LENGTH)?;
        Self::validate_text("description", description, MAX_DESCRIPTION_LENGTH)?;

        let parents = Self::to_id_set(parents)?;
        for &parent in &parents {
            Self::require_kind(store, parent, KindName::Main)?;
        }

        let category = store.insert_category(
            name.to_string(),
            description.to_string(),
            CategoryKind::Sub,
        )?;
        Self::attach_to_parents(store, category.id, &parents)?;
        Ok(category)
    }

    /// Attach a sub-category to an additional parent (idempotent).
    ///
    /// A self-attachment cannot succeed: if `parent == child` the record is
    /// a main category where a sub was required, or vice versa.
    pub fn attach_child<S: RecordStore + ?Sized>(
        store: &mut S,
        parent: CategoryId,
        child: CategoryId,
    ) -> Result<Category, CatalogError> {
        Self::require_kind(store, parent, KindName::Main)?;
        Self::require_kind(store, child, KindName::Sub)?;
        store.add_child(parent, child)?;
        store.category(parent)?.ok_or(CatalogError::NotFound(parent))
    }

    /// Detach a sub-category from a parent (idempotent; detaching an absent
    /// id is a no-op, not an error). The child id need not resolve.
    pub fn detach_child<S: RecordStore + ?Sized>(
        store: &mut S,
        parent: CategoryId,
        child: CategoryId,
    ) -> Result<Category, CatalogError> {
        Self::require_kind(store, parent, KindName::Main)?;
        store.remove_child(parent, child)?;
        store.category(parent)?.ok_or(CatalogError::NotFound(parent))
    }

    /// Replace the full child set of a main category in one atomic write.
    pub fn replace_children<S: RecordStore + ?Sized>(
        store: &mut S,
        main: CategoryId,
        children: &[CategoryId],
    ) -> Result<Category, CatalogError> {
        Self::require_kind(store, main, KindName::Main)?;
        let children = Self::to_id_set(children)?;
        for &child in &children {
            Self::require_kind(store, child, KindName::Sub)?;
        }
        store.replace_children(main, children)?;
        store.category(main)?.ok_or(CatalogError::NotFound(main))
    }

    /// Promote a sub-category to a main category.
    ///
    /// The kind flips to `Main` with the caller-supplied initial child set
    /// (empty by default), then the id is pulled from every main category
    /// that still lists it — a parent cannot also be a child.
    pub fn promote_to_main<S: RecordStore + ?Sized>(
        store: &mut S,
        id: CategoryId,
        initial_children: &[CategoryId],
    ) -> Result<Category, CatalogError> {
        Self::require_kind(store, id, KindName::Sub)?;

        let children = Self::to_id_set(initial_children)?;
        for &child in &children {
            if child == id {
                // A category cannot parent itself (post-promotion it is Main).
                return Err(CatalogError::InvalidReference {
                    id: child,
                    expected: KindName::Sub,
                    found: KindName::Main,
                });
            }
            Self::require_kind(store, child, KindName::Sub)?;
        }

        let former_parents = store.parents_of(id)?;
        store.set_kind(id, CategoryKind::Main { children })?;
        Self::detach_from_parents(store, id, &former_parents)?;

        store.category(id)?.ok_or(CatalogError::NotFound(id))
    }

    /// Demote a main category to a sub-category.
    ///
    /// The prior child set is discarded (children become parentless unless
    /// separately reattached) and returned in the `Demotion` for audit
    /// logging. The now-sub-category is then optionally attached to
    /// caller-chosen new parents.
    pub fn demote_to_sub<S: RecordStore + ?Sized>(
        store: &mut S,
        id: CategoryId,
        new_parents: &[CategoryId],
    ) -> Result<Demotion, CatalogError> {
        let category = Self::require_kind(store, id, KindName::Main)?;
        let discarded_children = match category.kind {
            CategoryKind::Main { children } => children,
            CategoryKind::Sub => BTreeSet::new(),
        };

        let parents = Self::to_id_set(new_parents)?;
        for &parent in &parents {
            if parent == id {
                // Cannot become a child of itself (pre-demotion it is Main
                // and would pass the kind check).
                return Err(CatalogError::InvalidReference {
                    id: parent,
                    expected: KindName::Main,
                    found: KindName::Sub,
                });
            }
            Self::require_kind(store, parent, KindName::Main)?;
        }

        store.set_kind(id, CategoryKind::Sub)?;
        Self::attach_to_parents(store, id, &parents)?;

        let category = store.category(id)?.ok_or(CatalogError::NotFound(id))?;
        Ok(Demotion {
            category,
            discarded_children,
        })
    }

    /// Count the instruments filed under a category.
    ///
    /// A main category counts by the instruments' `category` reference, a
    /// sub-category by their `sub_category` reference.
    pub fn count_instruments_in<S: RecordStore + ?Sized>(
        store: &S,
        id: CategoryId,
    ) -> Result<u64, CatalogError> {
        let category = store.category(id)?.ok_or(CatalogError::NotFound(id))?;
        match category.kind {
            CategoryKind::Main { .. } => store.count_by_category(id),
            CategoryKind::Sub => store.count_by_sub_category(id),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
