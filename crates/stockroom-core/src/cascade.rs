//! # Cascade-Delete Analyzer
//!
//! Computes the set of categories that must be deleted together with a
//! target, and enforces the two-phase confirm protocol before anything is
//! removed.
//!
//! A sub-category, or a main category with no children, deletes alone. A
//! main category with children pulls in every child that would be orphaned
//! by the deletion (no other main still lists it); children with another
//! surviving parent are left untouched.

use crate::store::RecordStore;
use crate::types::{CatalogError, CategoryId, CategoryKind};
use std::collections::BTreeSet;

/// The computed deletion set for a target category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletePlan {
    /// The category the caller asked to delete.
    pub target: CategoryId,
    /// Everything that will be removed, target included (≥ 1 members).
    pub members: BTreeSet<CategoryId>,
    /// True when the set has more than one member; execution then requires
    /// an explicit confirmed flag.
    pub needs_confirmation: bool,
}

/// Outcome of an execute-delete call.
///
/// `NeedsConfirmation` is a deliberate result variant, not an error: the
/// caller must be shown the full set and re-invoke with `confirmed = true`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// All members of the plan were removed.
    Deleted { removed: BTreeSet<CategoryId> },
    /// The plan has dependents and the caller has not confirmed yet.
    NeedsConfirmation(DeletePlan),
}

/// Compute the deletion set for `target` without mutating anything.
///
/// A child id that fails to resolve is skipped, not fatal (treated as
/// already gone). An unresolvable target is `NotFound`.
pub fn plan_delete<S: RecordStore + ?Sized>(
    store: &S,
    target: CategoryId,
) -> Result<DeletePlan, CatalogError> {
    let category = store
        .category(target)?
        .ok_or(CatalogError::NotFound(target))?;

    let mut members = BTreeSet::from([target]);

    if let CategoryKind::Main { children } = &category.kind {
        for &child in children {
            if store.category(child)?.is_none() {
                continue;
            }
            let other_parents = store
                .parents_of(child)?
                .into_iter()
                .filter(|p| *p != target)
                .count();
            if other_parents == 0 {
                members.insert(child);
            }
        }
    }

    let needs_confirmation = members.len() > 1;
    Ok(DeletePlan {
        target,
        members,
        needs_confirmation,
    })
}

/// Execute the deletion of `target`, honoring the confirm protocol.
///
/// For every sub-category in the set, its id is first pulled from the child
/// list of any surviving main category (symmetry is preserved through the
/// whole sequence), then the record is deleted. No member of the set can be
/// a parent of another, so order within the set is unconstrained.
pub fn execute_delete<S: RecordStore + ?Sized>(
    store: &mut S,
    target: CategoryId,
    confirmed: bool,
) -> Result<DeleteOutcome, CatalogError> {
    let plan = plan_delete(store, target)?;

    if plan.needs_confirmation && !confirmed {
        return Ok(DeleteOutcome::NeedsConfirmation(plan));
    }

    for &member in &plan.members {
        let Some(category) = store.category(member)? else {
            continue;
        };
        if category.is_sub() {
            for parent in store.parents_of(member)? {
                if !plan.members.contains(&parent) {
                    store.remove_child(parent, member)?;
                }
            }
        }
        store.delete_category(member)?;
    }

    Ok(DeleteOutcome::Deleted {
        removed: plan.members,
    })
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::engine::TaxonomyEngine;
    use crate::store::MemoryStore;

    fn sub(store: &mut MemoryStore, name: &str) -> CategoryId {
        TaxonomyEngine::create_sub(store, name, "desc", &[])
            .expect("create sub")
            .id
    }

    fn main_with(store: &mut MemoryStore, name: &str, children: &[CategoryId]) -> CategoryId {
        TaxonomyEngine::create_main(store, name, "desc", children)
            .expect("create main")
            .id
    }

    #[test]
    fn sub_category_deletes_alone() {
        let mut store = MemoryStore::new();
        let s = sub(&mut store, "Strings");
        let m = main_with(&mut store, "Guitars", &[s]);

        let plan = plan_delete(&store, s).expect("plan");
        assert_eq!(plan.members, BTreeSet::from([s]));
        assert!(!plan.needs_confirmation);

        let outcome = execute_delete(&mut store, s, false).expect("execute");
        assert!(matches!(outcome, DeleteOutcome::Deleted { .. }));

        // Symmetry preserved: the surviving parent no longer lists it
        let parent = store.category(m).expect("get").expect("some");
        assert!(!parent.children().expect("children").contains(&s));
    }

    #[test]
    fn childless_main_needs_no_confirmation() {
        let mut store = MemoryStore::new();
        let m = main_with(&mut store, "Guitars", &[]);

        let plan = plan_delete(&store, m).expect("plan");
        assert_eq!(plan.members, BTreeSet::from([m]));
        assert!(!plan.needs_confirmation);
    }

    #[test]
    fn shared_child_survives_exclusive_child_cascades() {
        let mut store = MemoryStore::new();
        let x = sub(&mut store, "x");
        let y = sub(&mut store, "y");
        let a = main_with(&mut store, "A", &[x, y]);
        let _b = main_with(&mut store, "B", &[y]);

        let plan = plan_delete(&store, a).expect("plan");
        assert_eq!(plan.members, BTreeSet::from([a, x]));
        assert!(plan.needs_confirmation);
    }

    #[test]
    fn unconfirmed_cascade_removes_nothing() {
        let mut store = MemoryStore::new();
        let x = sub(&mut store, "x");
        let a = main_with(&mut store, "A", &[x]);

        let outcome = execute_delete(&mut store, a, false).expect("execute");
        let DeleteOutcome::NeedsConfirmation(plan) = outcome else {
            panic!("expected NeedsConfirmation");
        };
        assert_eq!(plan.members, BTreeSet::from([a, x]));

        // Nothing was touched
        assert!(store.category(a).expect("get").is_some());
        assert!(store.category(x).expect("get").is_some());
    }

    #[test]
    fn confirmed_cascade_removes_set_and_preserves_survivors() {
        let mut store = MemoryStore::new();
        let x = sub(&mut store, "x");
        let y = sub(&mut store, "y");
        let a = main_with(&mut store, "A", &[x, y]);
        let b = main_with(&mut store, "B", &[y]);

        let outcome = execute_delete(&mut store, a, true).expect("execute");
        let DeleteOutcome::Deleted { removed } = outcome else {
            panic!("expected Deleted");
        };
        assert_eq!(removed, BTreeSet::from([a, x]));

        assert!(store.category(a).expect("get").is_none());
        assert!(store.category(x).expect("get").is_none());
        // y survives with its other parent intact
        let surviving = store.category(b).expect("get").expect("some");
        assert!(surviving.children().expect("children").contains(&y));
    }

    #[test]
    fn missing_target_is_not_found() {
        let store = MemoryStore::new();
        let result = plan_delete(&store, CategoryId(42));
        assert!(matches!(result, Err(CatalogError::NotFound(_))));
    }

    #[test]
    fn dangling_child_reference_is_skipped() {
        let mut store = MemoryStore::new();
        let x = sub(&mut store, "x");
        let a = main_with(&mut store, "A", &[x]);

        // Forcibly remove the child record, leaving the reference dangling
        store.delete_category(x).expect("delete");

        let plan = plan_delete(&store, a).expect("plan");
        assert_eq!(plan.members, BTreeSet::from([a]));
        assert!(!plan.needs_confirmation);
    }
}
