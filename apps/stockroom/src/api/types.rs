//! # API Request/Response Types
//!
//! This module defines the JSON structures for the HTTP API, plus the
//! mapping from `CatalogError` to HTTP status codes.

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use stockroom_core::{
    CatalogError, Category, CategoryId, CategoryKind, DeletePlan, Image, Instrument, NewInstrument,
    limits::MAX_IMAGE_BYTES,
};

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// =============================================================================
// STATUS RESPONSE
// =============================================================================

/// Catalog status response (the storefront index page).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub category_count: usize,
    pub instrument_count: usize,
    pub persistent: bool,
}

// =============================================================================
// CATEGORY JSON
// =============================================================================

/// A category record as exposed over the API.
///
/// `children` is present for main categories (possibly empty, never null);
/// `parents` is present for sub-categories. The kind tag makes the two
/// shapes unambiguous.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryJson {
    pub id: u64,
    pub kind: String,
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub children: Option<Vec<u64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub parents: Option<Vec<u64>>,
}

impl CategoryJson {
    /// Build from a record without parent information (list output).
    #[must_use]
    pub fn from_category(category: &Category) -> Self {
        let children = match &category.kind {
            CategoryKind::Main { children } => Some(children.iter().map(|c| c.0).collect()),
            CategoryKind::Sub => None,
        };
        Self {
            id: category.id.0,
            kind: category.kind.name().to_string(),
            name: category.name.clone(),
            description: category.description.clone(),
            children,
            parents: None,
        }
    }

    /// Build a detail view: sub-categories carry their resolved parents.
    #[must_use]
    pub fn with_parents(category: &Category, parents: &[CategoryId]) -> Self {
        let mut json = Self::from_category(category);
        if category.is_sub() {
            json.parents = Some(parents.iter().map(|p| p.0).collect());
        }
        json
    }
}

/// List entry for `GET /categories`: a main category with its instrument count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorySummary {
    pub id: u64,
    pub name: String,
    pub description: String,
    pub instrument_count: u64,
}

// =============================================================================
// CATEGORY REQUESTS
// =============================================================================

/// Create a main category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMainRequest {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub children: Vec<u64>,
}

/// Create a sub-category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSubRequest {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub parents: Vec<u64>,
}

/// Attach or detach one child from a main category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChildRequest {
    pub child: u64,
}

/// Replace the full child set of a main category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplaceChildrenRequest {
    pub children: Vec<u64>,
}

/// Promote a sub-category, with an optional initial child set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromoteRequest {
    #[serde(default)]
    pub children: Vec<u64>,
}

/// Demote a main category, with an optional set of new parents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DemoteRequest {
    #[serde(default)]
    pub parents: Vec<u64>,
}

/// Demotion result: the former child set is reported for audit, it is not
/// restored by a later promotion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoteResponse {
    pub category: CategoryJson,
    pub discarded_children: Vec<u64>,
}

// =============================================================================
// DELETE PLAN / EXECUTION
// =============================================================================

/// Delete execution request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeleteRequest {
    #[serde(default)]
    pub confirmed: bool,
}

/// The computed deletion set for a category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletePlanJson {
    pub target: u64,
    pub members: Vec<u64>,
    pub needs_confirmation: bool,
}

impl From<&DeletePlan> for DeletePlanJson {
    fn from(plan: &DeletePlan) -> Self {
        Self {
            target: plan.target.0,
            members: plan.members.iter().map(|m| m.0).collect(),
            needs_confirmation: plan.needs_confirmation,
        }
    }
}

/// Response for a completed deletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub deleted: bool,
    pub removed: Vec<u64>,
}

/// 409 body when a cascade requires explicit confirmation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmationRequired {
    pub error: String,
    pub plan: DeletePlanJson,
}

impl ConfirmationRequired {
    #[must_use]
    pub fn new(plan: &DeletePlan) -> Self {
        Self {
            error: format!(
                "deleting category {} removes {} categories; re-submit with confirmed=true",
                plan.target,
                plan.members.len()
            ),
            plan: plan.into(),
        }
    }
}

/// Instrument count for one category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountResponse {
    pub id: u64,
    pub instrument_count: u64,
}

// =============================================================================
// INSTRUMENT JSON
// =============================================================================

/// Image payload as carried over JSON (base64-encoded bytes).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageJson {
    pub mime_type: String,
    pub data: String,
}

impl ImageJson {
    #[must_use]
    pub fn from_image(image: &Image) -> Self {
        Self {
            mime_type: image.mime_type.clone(),
            data: base64::Engine::encode(&base64::engine::general_purpose::STANDARD, &image.bytes),
        }
    }

    /// Decode to the stored form, rejecting invalid base64 and oversized
    /// payloads before they reach the store.
    pub fn to_image(&self) -> Result<Image, CatalogError> {
        let bytes = base64::Engine::decode(&base64::engine::general_purpose::STANDARD, &self.data)
            .map_err(|e| CatalogError::Serialization(format!("invalid base64 image: {}", e)))?;
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(CatalogError::FieldTooLarge {
                field: "image",
                len: bytes.len(),
                max: MAX_IMAGE_BYTES,
            });
        }
        Ok(Image {
            bytes,
            mime_type: self.mime_type.clone(),
        })
    }
}

/// An instrument record as exposed over the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentJson {
    pub id: u64,
    pub name: String,
    pub brand: Option<String>,
    pub description: String,
    pub price_cents: u64,
    pub stock: u64,
    pub category: u64,
    pub sub_category: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub image: Option<ImageJson>,
}

impl InstrumentJson {
    #[must_use]
    pub fn from_instrument(instrument: &Instrument) -> Self {
        Self {
            id: instrument.id.0,
            name: instrument.name.clone(),
            brand: instrument.brand.clone(),
            description: instrument.description.clone(),
            price_cents: instrument.price_cents,
            stock: instrument.stock,
            category: instrument.category.0,
            sub_category: instrument.sub_category.map(|s| s.0),
            image: instrument.image.as_ref().map(ImageJson::from_image),
        }
    }
}

/// Create an instrument.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateInstrumentRequest {
    pub name: String,
    #[serde(default)]
    pub brand: Option<String>,
    pub description: String,
    pub price_cents: u64,
    pub stock: u64,
    pub category: u64,
    #[serde(default)]
    pub sub_category: Option<u64>,
    #[serde(default)]
    pub image: Option<ImageJson>,
}

impl CreateInstrumentRequest {
    /// Convert to the core creation type, decoding the image payload.
    pub fn to_new_instrument(&self) -> Result<NewInstrument, CatalogError> {
        let image = self.image.as_ref().map(ImageJson::to_image).transpose()?;
        Ok(NewInstrument {
            name: self.name.clone(),
            brand: self.brand.clone(),
            description: self.description.clone(),
            price_cents: self.price_cents,
            stock: self.stock,
            category: CategoryId(self.category),
            sub_category: self.sub_category.map(CategoryId),
            image,
        })
    }
}

// =============================================================================
// ERROR RESPONSE
// =============================================================================

/// Structured error body.
///
/// `applied`/`remaining` are only present for partial-update failures, so
/// callers can see exactly which parents were already mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub applied: Option<Vec<u64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub remaining: Option<Vec<u64>>,
}

impl ErrorResponse {
    fn simple(kind: &str, err: &CatalogError) -> Self {
        Self {
            error: err.to_string(),
            kind: kind.to_string(),
            applied: None,
            remaining: None,
        }
    }
}

/// Map a catalog error to an HTTP status and structured body.
#[must_use]
pub fn error_to_response(err: &CatalogError) -> (StatusCode, ErrorResponse) {
    match err {
        CatalogError::NotFound(_) | CatalogError::InstrumentNotFound(_) => {
            (StatusCode::NOT_FOUND, ErrorResponse::simple("not_found", err))
        }
        CatalogError::InvalidReference { .. } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            ErrorResponse::simple("invalid_reference", err),
        ),
        CatalogError::EmptyField(_) | CatalogError::FieldTooLarge { .. } => (
            StatusCode::BAD_REQUEST,
            ErrorResponse::simple("invalid_field", err),
        ),
        CatalogError::PartialUpdate {
            applied, remaining, ..
        } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorResponse {
                error: err.to_string(),
                kind: "partial_update".to_string(),
                applied: Some(applied.iter().map(|id| id.0).collect()),
                remaining: Some(remaining.iter().map(|id| id.0).collect()),
            },
        ),
        CatalogError::Storage(_) | CatalogError::Serialization(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorResponse::simple("internal", err),
        ),
    }
}

/// Convenience: ids from raw u64s.
#[must_use]
pub fn category_ids(raw: &[u64]) -> Vec<CategoryId> {
    raw.iter().copied().map(CategoryId).collect()
}
