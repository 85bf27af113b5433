//! # Core Type Definitions
//!
//! This module contains all record types for the Stockroom catalog:
//! - Identifiers (`CategoryId`, `InstrumentId`)
//! - Category records and their kind (`Category`, `CategoryKind`)
//! - Instrument records (`Instrument`, `NewInstrument`, `Image`)
//! - Error types (`CatalogError`)
//!
//! ## Kind as a tagged variant
//!
//! The category kind is an explicit enum rather than a nullable child list:
//! a `Sub` category structurally cannot carry children, and a `Main` with an
//! empty set is a distinct, valid state ("main with zero children").

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Unique identifier for a category record.
/// Assigned by the record store at insertion, immutable afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CategoryId(pub u64);

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for an instrument record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InstrumentId(pub u64);

impl fmt::Display for InstrumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// CATEGORY
// =============================================================================

/// The kind of a category node in the two-level taxonomy.
///
/// `Main` owns a set of sub-category children (possibly empty).
/// `Sub` owns nothing; its parents are discovered through the store's
/// reverse index, never stored on the record itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CategoryKind {
    /// A main category with its attached sub-category children.
    Main { children: BTreeSet<CategoryId> },
    /// A sub-category. Cannot itself have children.
    Sub,
}

impl CategoryKind {
    /// A main category with zero children.
    #[must_use]
    pub const fn main_empty() -> Self {
        Self::Main {
            children: BTreeSet::new(),
        }
    }

    /// The name of this kind, for error reporting and API output.
    #[must_use]
    pub const fn name(&self) -> KindName {
        match self {
            Self::Main { .. } => KindName::Main,
            Self::Sub => KindName::Sub,
        }
    }
}

/// Kind label used in error details and JSON output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KindName {
    Main,
    Sub,
}

impl fmt::Display for KindName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Main => write!(f, "main"),
            Self::Sub => write!(f, "sub"),
        }
    }
}

/// A category record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Store-assigned identifier.
    pub id: CategoryId,
    /// Display name. Non-empty; lookups by name assume uniqueness.
    pub name: String,
    /// Non-empty description.
    pub description: String,
    /// Main (with children) or Sub.
    pub kind: CategoryKind,
}

impl Category {
    /// True if this is a main category.
    #[must_use]
    pub const fn is_main(&self) -> bool {
        matches!(self.kind, CategoryKind::Main { .. })
    }

    /// True if this is a sub-category.
    #[must_use]
    pub const fn is_sub(&self) -> bool {
        matches!(self.kind, CategoryKind::Sub)
    }

    /// The child set, if this is a main category.
    #[must_use]
    pub const fn children(&self) -> Option<&BTreeSet<CategoryId>> {
        match &self.kind {
            CategoryKind::Main { children } => Some(children),
            CategoryKind::Sub => None,
        }
    }
}

// =============================================================================
// INSTRUMENT
// =============================================================================

/// A binary image attachment on an instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl Image {
    /// An image is only stored when both the payload and MIME type are set.
    /// Incomplete images are silently dropped at creation.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.bytes.is_empty() && !self.mime_type.is_empty()
    }
}

/// An inventory item. Instruments reference exactly one main category and
/// optionally one sub-category; they are never mutated by the taxonomy
/// engine and are read-only inputs to dependency counting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument {
    pub id: InstrumentId,
    pub name: String,
    pub brand: Option<String>,
    pub description: String,
    /// Price in integer cents. The core does no float arithmetic.
    pub price_cents: u64,
    pub stock: u64,
    /// Main category this instrument belongs to.
    pub category: CategoryId,
    /// Optional sub-category.
    pub sub_category: Option<CategoryId>,
    pub image: Option<Image>,
}

/// Instrument fields supplied at creation; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewInstrument {
    pub name: String,
    pub brand: Option<String>,
    pub description: String,
    pub price_cents: u64,
    pub stock: u64,
    pub category: CategoryId,
    pub sub_category: Option<CategoryId>,
    pub image: Option<Image>,
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors surfaced by the catalog engine and record stores.
///
/// The engine recovers nothing automatically; every failure carries enough
/// structured detail for the caller to decide remediation. The unconfirmed
/// cascade case is deliberately NOT here — it is the
/// `DeleteOutcome::NeedsConfirmation` result variant, not an error path.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// A referenced category id does not resolve.
    #[error("category not found: {0}")]
    NotFound(CategoryId),

    /// A referenced instrument id does not resolve.
    #[error("instrument not found: {0}")]
    InstrumentNotFound(InstrumentId),

    /// A supplied id resolves but has the wrong kind (e.g. a main id where
    /// a sub id was required).
    #[error("invalid reference: category {id} is {found}, expected {expected}")]
    InvalidReference {
        id: CategoryId,
        expected: KindName,
        found: KindName,
    },

    /// A required text field was empty.
    #[error("field must not be empty: {0}")]
    EmptyField(&'static str),

    /// A field exceeded its size limit.
    #[error("field too large: {field} ({len} > {max} bytes)")]
    FieldTooLarge {
        field: &'static str,
        len: usize,
        max: usize,
    },

    /// A multi-step mutation failed after some but not all steps applied.
    /// The graph is left partially updated; no rollback is attempted.
    #[error(
        "partial update: applied to {applied:?}, failed on {failed}, remaining {remaining:?}: {cause}"
    )]
    PartialUpdate {
        applied: Vec<CategoryId>,
        failed: CategoryId,
        remaining: Vec<CategoryId>,
        cause: String,
    },

    /// A record store I/O failure.
    #[error("storage error: {0}")]
    Storage(String),

    /// A record (de)serialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_kind_has_no_children() {
        let cat = Category {
            id: CategoryId(1),
            name: "Strings".to_string(),
            description: "Replacement string sets".to_string(),
            kind: CategoryKind::Sub,
        };
        assert!(cat.is_sub());
        assert!(cat.children().is_none());
    }

    #[test]
    fn main_with_empty_children_is_still_main() {
        let cat = Category {
            id: CategoryId(1),
            name: "Guitars".to_string(),
            description: "Acoustic and electric".to_string(),
            kind: CategoryKind::main_empty(),
        };
        assert!(cat.is_main());
        assert_eq!(cat.children().map(BTreeSet::len), Some(0));
    }

    #[test]
    fn kind_names_display() {
        assert_eq!(KindName::Main.to_string(), "main");
        assert_eq!(KindName::Sub.to_string(), "sub");
    }

    #[test]
    fn incomplete_image_detected() {
        let no_mime = Image {
            bytes: vec![1, 2, 3],
            mime_type: String::new(),
        };
        let no_bytes = Image {
            bytes: vec![],
            mime_type: "image/png".to_string(),
        };
        let complete = Image {
            bytes: vec![1],
            mime_type: "image/png".to_string(),
        };
        assert!(!no_mime.is_complete());
        assert!(!no_bytes.is_complete());
        assert!(complete.is_complete());
    }
}
