//! # Stockroom HTTP API Module
//!
//! This module implements the HTTP REST API server using axum.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /status` - Catalog totals
//! - `GET /categories` - Main categories with instrument counts
//! - `GET /categories/{id}` - Category detail (children or parents)
//! - `POST /categories/main` - Create a main category
//! - `POST /categories/sub` - Create a sub-category
//! - `POST /categories/{id}/attach` - Attach a child
//! - `POST /categories/{id}/detach` - Detach a child
//! - `PUT /categories/{id}/children` - Replace the child set
//! - `POST /categories/{id}/promote` - Promote a sub to main
//! - `POST /categories/{id}/demote` - Demote a main to sub
//! - `GET /categories/{id}/delete-plan` - Compute the deletion set
//! - `POST /categories/{id}/delete` - Execute a deletion
//! - `GET /categories/{id}/count` - Instrument count under a category
//! - `GET /instruments` - List instruments
//! - `POST /instruments` - Create an instrument (image as base64)
//! - `GET /instruments/{id}` - Instrument detail
//! - `GET /instruments/in/{category_id}` - Instruments under a category
//!
//! ## Security Configuration (Environment Variables)
//!
//! - `STOCKROOM_CORS_ORIGINS`: Comma-separated list of allowed origins, or "*" for all (default: localhost only)
//! - `STOCKROOM_RATE_LIMIT`: Requests per second (default: 100, 0 to disable)
//! - `STOCKROOM_ADMIN_TOKEN`: If set, mutating requests require this Bearer token

mod auth;
mod handlers;
mod middleware;
mod types;

// Re-exports for external use
pub use auth::get_admin_token_from_env;
pub use middleware::{create_rate_limiter, get_rate_limit_from_env};
// Re-export handlers and types for integration tests (via `stockroom::api::*`)
#[allow(unused_imports)]
pub use handlers::{
    attach_handler, count_handler, create_instrument_handler, create_main_handler,
    create_sub_handler, delete_handler, delete_plan_handler, demote_handler, detach_handler,
    get_category_handler, get_instrument_handler, health_handler, instruments_in_handler,
    list_categories_handler, list_instruments_handler, promote_handler, replace_children_handler,
    status_handler,
};
#[allow(unused_imports)]
pub use types::{
    CategoryJson, CategorySummary, ChildRequest, ConfirmationRequired, CountResponse,
    CreateInstrumentRequest, CreateMainRequest, CreateSubRequest, DeletePlanJson, DeleteRequest,
    DeleteResponse, DemoteRequest, DemoteResponse, ErrorResponse, HealthResponse, ImageJson,
    InstrumentJson, PromoteRequest, ReplaceChildrenRequest, StatusResponse,
};

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{get, post, put},
};
use std::sync::Arc;
use stockroom_core::{Catalog, CatalogError};
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state containing the catalog.
#[derive(Clone)]
pub struct AppState {
    /// The catalog behind a read-write lock.
    pub catalog: Arc<RwLock<Catalog>>,
}

impl AppState {
    /// Create new app state with a catalog.
    #[must_use]
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog: Arc::new(RwLock::new(catalog)),
        }
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

/// Build CORS layer from environment configuration.
///
/// Reads `STOCKROOM_CORS_ORIGINS` environment variable:
/// - If "*": allows all origins (development mode - use with caution!)
/// - If not set: defaults to localhost only (restrictive default)
/// - Otherwise: parses comma-separated list of allowed origins
fn build_cors_layer() -> CorsLayer {
    let origins_env = std::env::var("STOCKROOM_CORS_ORIGINS").ok();

    match origins_env.as_deref() {
        Some("*") => {
            tracing::warn!(
                "CORS: Allowing ALL origins (STOCKROOM_CORS_ORIGINS=*). This is insecure for production!"
            );
            CorsLayer::permissive()
        }
        Some(origins) => {
            let allowed_origins: Vec<HeaderValue> = origins
                .split(',')
                .filter_map(|s| {
                    let trimmed = s.trim();
                    match trimmed.parse::<HeaderValue>() {
                        Ok(hv) => {
                            tracing::info!("CORS: Allowing origin: {}", trimmed);
                            Some(hv)
                        }
                        Err(e) => {
                            tracing::warn!("CORS: Invalid origin '{}': {}", trimmed, e);
                            None
                        }
                    }
                })
                .collect();

            if allowed_origins.is_empty() {
                tracing::warn!(
                    "CORS: No valid origins in STOCKROOM_CORS_ORIGINS, defaulting to localhost only"
                );
                build_localhost_cors()
            } else {
                CorsLayer::new()
                    .allow_origin(allowed_origins)
                    .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
                    .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
            }
        }
        None => {
            tracing::info!("CORS: No STOCKROOM_CORS_ORIGINS set, defaulting to localhost only");
            build_localhost_cors()
        }
    }
}

/// Build a restrictive CORS layer that only allows localhost origins.
fn build_localhost_cors() -> CorsLayer {
    let localhost_origins = vec![
        "http://localhost:3000".parse::<HeaderValue>().ok(),
        "http://localhost:8080".parse::<HeaderValue>().ok(),
        "http://127.0.0.1:3000".parse::<HeaderValue>().ok(),
        "http://127.0.0.1:8080".parse::<HeaderValue>().ok(),
    ];
    let origins: Vec<HeaderValue> = localhost_origins.into_iter().flatten().collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner):
/// 1. CORS - handles preflight requests
/// 2. Tracing - logs all requests
/// 3. Rate Limiting - protects against DoS (if enabled)
/// 4. Admin token - gates mutating routes (if configured)
pub fn create_router(state: AppState) -> Router {
    let cors = build_cors_layer();

    // Check if rate limiting is enabled
    let rate_limit = get_rate_limit_from_env();
    let rate_limiter = if rate_limit > 0 {
        tracing::info!("Rate limiting enabled: {} requests/second", rate_limit);
        Some(create_rate_limiter(rate_limit))
    } else {
        tracing::info!("Rate limiting disabled");
        None
    };

    // Check if the admin token gate is enabled
    let has_auth = get_admin_token_from_env().is_some();
    if has_auth {
        tracing::info!("Admin token authentication enabled for mutating routes");
    } else {
        tracing::warn!(
            "⚠️  Admin token authentication DISABLED - mutating routes are publicly accessible! \
             Set STOCKROOM_ADMIN_TOKEN environment variable to enable authentication."
        );
    }

    // Build base router with routes
    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/status", get(handlers::status_handler))
        .route("/categories", get(handlers::list_categories_handler))
        .route("/categories/main", post(handlers::create_main_handler))
        .route("/categories/sub", post(handlers::create_sub_handler))
        .route("/categories/{id}", get(handlers::get_category_handler))
        .route("/categories/{id}/attach", post(handlers::attach_handler))
        .route("/categories/{id}/detach", post(handlers::detach_handler))
        .route(
            "/categories/{id}/children",
            put(handlers::replace_children_handler),
        )
        .route("/categories/{id}/promote", post(handlers::promote_handler))
        .route("/categories/{id}/demote", post(handlers::demote_handler))
        .route(
            "/categories/{id}/delete-plan",
            get(handlers::delete_plan_handler),
        )
        .route("/categories/{id}/delete", post(handlers::delete_handler))
        .route("/categories/{id}/count", get(handlers::count_handler))
        .route(
            "/instruments",
            get(handlers::list_instruments_handler).post(handlers::create_instrument_handler),
        )
        .route("/instruments/{id}", get(handlers::get_instrument_handler))
        .route(
            "/instruments/in/{category_id}",
            get(handlers::instruments_in_handler),
        );

    // Apply authentication middleware (innermost - runs last on request)
    if has_auth {
        router = router.layer(axum_middleware::from_fn(auth::admin_token_middleware));
    }

    // Apply rate limiting middleware
    if let Some(limiter) = rate_limiter {
        router = router.layer(axum_middleware::from_fn_with_state(
            limiter,
            middleware::rate_limit_middleware,
        ));
    }

    // Apply CORS, body limit, and tracing (outermost layers)
    router
        .layer(axum::extract::DefaultBodyLimit::max(4 * 1024 * 1024))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Start the HTTP server.
pub async fn run_server(addr: &str, catalog: Catalog) -> Result<(), CatalogError> {
    let state = AppState::new(catalog);
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| CatalogError::Storage(format!("Bind failed: {}", e)))?;

    tracing::info!("Stockroom HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .await
        .map_err(|e| CatalogError::Storage(format!("Server error: {}", e)))
}
