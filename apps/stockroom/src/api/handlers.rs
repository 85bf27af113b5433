//! # API Endpoint Handlers
//!
//! This module implements the actual HTTP endpoint handlers.
//!
//! Write handlers take the catalog write lock for the duration of one
//! engine operation; read handlers share the read lock.

use super::{
    AppState,
    types::{
        CategoryJson, CategorySummary, ChildRequest, ConfirmationRequired, CountResponse,
        CreateInstrumentRequest, CreateMainRequest, CreateSubRequest, DeletePlanJson,
        DeleteRequest, DeleteResponse, DemoteRequest, DemoteResponse, HealthResponse,
        InstrumentJson, PromoteRequest, ReplaceChildrenRequest, StatusResponse, category_ids,
        error_to_response,
    },
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use stockroom_core::{CatalogError, CategoryId, DeleteOutcome, InstrumentId};

/// Render a catalog error as its mapped HTTP response.
fn catalog_error(err: &CatalogError) -> Response {
    let (status, body) = error_to_response(err);
    (status, Json(body)).into_response()
}

// =============================================================================
// HEALTH / STATUS HANDLERS
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

/// Catalog totals (the storefront index page).
pub async fn status_handler(State(state): State<AppState>) -> Response {
    let catalog = state.catalog.read().await;
    match catalog.counts() {
        Ok(counts) => (
            StatusCode::OK,
            Json(StatusResponse {
                category_count: counts.categories,
                instrument_count: counts.instruments,
                persistent: catalog.is_persistent(),
            }),
        )
            .into_response(),
        Err(e) => catalog_error(&e),
    }
}

// =============================================================================
// CATEGORY READ HANDLERS
// =============================================================================

/// List main categories with their instrument counts.
pub async fn list_categories_handler(State(state): State<AppState>) -> Response {
    let catalog = state.catalog.read().await;
    match catalog.category_counts() {
        Ok(counts) => {
            let summaries: Vec<CategorySummary> = counts
                .iter()
                .map(|(category, count)| CategorySummary {
                    id: category.id.0,
                    name: category.name.clone(),
                    description: category.description.clone(),
                    instrument_count: *count,
                })
                .collect();
            (StatusCode::OK, Json(summaries)).into_response()
        }
        Err(e) => catalog_error(&e),
    }
}

/// Category detail: children for mains, resolved parents for subs.
pub async fn get_category_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Response {
    let catalog = state.catalog.read().await;
    let id = CategoryId(id);
    match catalog.category(id) {
        Ok(Some(category)) => match catalog.parents_of(id) {
            Ok(parents) => (
                StatusCode::OK,
                Json(CategoryJson::with_parents(&category, &parents)),
            )
                .into_response(),
            Err(e) => catalog_error(&e),
        },
        Ok(None) => catalog_error(&CatalogError::NotFound(id)),
        Err(e) => catalog_error(&e),
    }
}

/// Instrument count under a category, main or sub.
pub async fn count_handler(State(state): State<AppState>, Path(id): Path<u64>) -> Response {
    let catalog = state.catalog.read().await;
    match catalog.count_instruments_in(CategoryId(id)) {
        Ok(count) => (
            StatusCode::OK,
            Json(CountResponse {
                id,
                instrument_count: count,
            }),
        )
            .into_response(),
        Err(e) => catalog_error(&e),
    }
}

// =============================================================================
// CATEGORY WRITE HANDLERS
// =============================================================================

/// Create a main category.
pub async fn create_main_handler(
    State(state): State<AppState>,
    Json(request): Json<CreateMainRequest>,
) -> Response {
    let mut catalog = state.catalog.write().await;
    match catalog.create_main(
        &request.name,
        &request.description,
        &category_ids(&request.children),
    ) {
        Ok(category) => (
            StatusCode::CREATED,
            Json(CategoryJson::from_category(&category)),
        )
            .into_response(),
        Err(e) => catalog_error(&e),
    }
}

/// Create a sub-category.
pub async fn create_sub_handler(
    State(state): State<AppState>,
    Json(request): Json<CreateSubRequest>,
) -> Response {
    let mut catalog = state.catalog.write().await;
    match catalog.create_sub(
        &request.name,
        &request.description,
        &category_ids(&request.parents),
    ) {
        Ok(category) => (
            StatusCode::CREATED,
            Json(CategoryJson::from_category(&category)),
        )
            .into_response(),
        Err(e) => catalog_error(&e),
    }
}

/// Attach a sub-category to a main category.
pub async fn attach_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(request): Json<ChildRequest>,
) -> Response {
    let mut catalog = state.catalog.write().await;
    match catalog.attach_child(CategoryId(id), CategoryId(request.child)) {
        Ok(category) => (StatusCode::OK, Json(CategoryJson::from_category(&category)))
            .into_response(),
        Err(e) => catalog_error(&e),
    }
}

/// Detach a sub-category from a main category.
pub async fn detach_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(request): Json<ChildRequest>,
) -> Response {
    let mut catalog = state.catalog.write().await;
    match catalog.detach_child(CategoryId(id), CategoryId(request.child)) {
        Ok(category) => (StatusCode::OK, Json(CategoryJson::from_category(&category)))
            .into_response(),
        Err(e) => catalog_error(&e),
    }
}

/// Replace the full child set of a main category.
pub async fn replace_children_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(request): Json<ReplaceChildrenRequest>,
) -> Response {
    let mut catalog = state.catalog.write().await;
    match catalog.replace_children(CategoryId(id), &category_ids(&request.children)) {
        Ok(category) => (StatusCode::OK, Json(CategoryJson::from_category(&category)))
            .into_response(),
        Err(e) => catalog_error(&e),
    }
}

/// Promote a sub-category to a main category.
pub async fn promote_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(request): Json<PromoteRequest>,
) -> Response {
    let mut catalog = state.catalog.write().await;
    match catalog.promote_to_main(CategoryId(id), &category_ids(&request.children)) {
        Ok(category) => (StatusCode::OK, Json(CategoryJson::from_category(&category)))
            .into_response(),
        Err(e) => catalog_error(&e),
    }
}

/// Demote a main category to a sub-category. The discarded child set is
/// reported in the response and logged for audit.
pub async fn demote_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(request): Json<DemoteRequest>,
) -> Response {
    let mut catalog = state.catalog.write().await;
    match catalog.demote_to_sub(CategoryId(id), &category_ids(&request.parents)) {
        Ok(demotion) => {
            if !demotion.discarded_children.is_empty() {
                tracing::info!(
                    category = %demotion.category.id,
                    discarded = ?demotion.discarded_children,
                    "demotion discarded former child set"
                );
            }
            (
                StatusCode::OK,
                Json(DemoteResponse {
                    category: CategoryJson::from_category(&demotion.category),
                    discarded_children: demotion.discarded_children.iter().map(|c| c.0).collect(),
                }),
            )
                .into_response()
        }
        Err(e) => catalog_error(&e),
    }
}

// =============================================================================
// DELETE HANDLERS
// =============================================================================

/// Compute the deletion set without mutating anything.
pub async fn delete_plan_handler(State(state): State<AppState>, Path(id): Path<u64>) -> Response {
    let catalog = state.catalog.read().await;
    match catalog.plan_delete(CategoryId(id)) {
        Ok(plan) => (StatusCode::OK, Json(DeletePlanJson::from(&plan))).into_response(),
        Err(e) => catalog_error(&e),
    }
}

/// Execute a deletion under the two-phase confirm protocol.
///
/// An unconfirmed cascade answers 409 with the full plan; the caller
/// re-submits with `confirmed: true` to proceed.
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(request): Json<DeleteRequest>,
) -> Response {
    let mut catalog = state.catalog.write().await;
    match catalog.execute_delete(CategoryId(id), request.confirmed) {
        Ok(DeleteOutcome::Deleted { removed }) => (
            StatusCode::OK,
            Json(DeleteResponse {
                deleted: true,
                removed: removed.iter().map(|m| m.0).collect(),
            }),
        )
            .into_response(),
        Ok(DeleteOutcome::NeedsConfirmation(plan)) => {
            (StatusCode::CONFLICT, Json(ConfirmationRequired::new(&plan))).into_response()
        }
        Err(e) => catalog_error(&e),
    }
}

// =============================================================================
// INSTRUMENT HANDLERS
// =============================================================================

/// List all instruments.
pub async fn list_instruments_handler(State(state): State<AppState>) -> Response {
    let catalog = state.catalog.read().await;
    match catalog.instruments() {
        Ok(instruments) => {
            let json: Vec<InstrumentJson> =
                instruments.iter().map(InstrumentJson::from_instrument).collect();
            (StatusCode::OK, Json(json)).into_response()
        }
        Err(e) => catalog_error(&e),
    }
}

/// Create an instrument.
pub async fn create_instrument_handler(
    State(state): State<AppState>,
    Json(request): Json<CreateInstrumentRequest>,
) -> Response {
    // Payload decode failures are client errors regardless of how the core
    // classifies them
    let new = match request.to_new_instrument() {
        Ok(n) => n,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(super::types::ErrorResponse {
                    error: e.to_string(),
                    kind: "invalid_request".to_string(),
                    applied: None,
                    remaining: None,
                }),
            )
                .into_response();
        }
    };

    let mut catalog = state.catalog.write().await;
    match catalog.create_instrument(new) {
        Ok(instrument) => (
            StatusCode::CREATED,
            Json(InstrumentJson::from_instrument(&instrument)),
        )
            .into_response(),
        Err(e) => catalog_error(&e),
    }
}

/// Instrument detail.
pub async fn get_instrument_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Response {
    let catalog = state.catalog.read().await;
    match catalog.instrument(InstrumentId(id)) {
        Ok(instrument) => (
            StatusCode::OK,
            Json(InstrumentJson::from_instrument(&instrument)),
        )
            .into_response(),
        Err(e) => catalog_error(&e),
    }
}

/// Instruments filed under a category, main or sub.
pub async fn instruments_in_handler(
    State(state): State<AppState>,
    Path(category_id): Path<u64>,
) -> Response {
    let catalog = state.catalog.read().await;
    match catalog.instruments_in(CategoryId(category_id)) {
        Ok(instruments) => {
            let json: Vec<InstrumentJson> =
                instruments.iter().map(InstrumentJson::from_instrument).collect();
            (StatusCode::OK, Json(json)).into_response()
        }
        Err(e) => catalog_error(&e),
    }
}
