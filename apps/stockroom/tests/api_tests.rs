//! Integration tests for the Stockroom HTTP API.
//!
//! Uses axum-test to test the API handlers without starting a real server.

// Allow unwrap and panic in tests - these are standard for test code
// Allow holding MutexGuard across await in auth tests - tests are serialized
// intentionally to avoid env var conflicts
#![allow(clippy::unwrap_used, clippy::panic, clippy::await_holding_lock)]

use axum_test::TestServer;
use serde_json::json;
use std::sync::Mutex;
use stockroom::api::{
    AppState, CategoryJson, CategorySummary, ConfirmationRequired, CountResponse,
    CreateMainRequest, CreateSubRequest, DeletePlanJson, DeleteResponse, DemoteResponse,
    ErrorResponse, HealthResponse, InstrumentJson, StatusResponse, create_router,
};
use stockroom_core::{Catalog, CategoryId, NewInstrument};

/// Mutex to serialize tests since the router reads env vars at build time.
static AUTH_TEST_MUTEX: Mutex<()> = Mutex::new(());

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Guard wrapper that holds the mutex and ensures cleanup on drop.
struct TestGuard {
    _guard: std::sync::MutexGuard<'static, ()>,
}

impl Drop for TestGuard {
    fn drop(&mut self) {
        // SAFETY: Tests run sequentially under AUTH_TEST_MUTEX, so no concurrent env access.
        unsafe { std::env::remove_var("STOCKROOM_ADMIN_TOKEN") };
    }
}

/// Create a test server with a fresh in-memory catalog.
/// Returns a guard that must be kept alive during the test.
fn create_test_server() -> (TestServer, TestGuard) {
    let guard = AUTH_TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    // SAFETY: Tests run sequentially under AUTH_TEST_MUTEX, so no concurrent env access.
    unsafe { std::env::remove_var("STOCKROOM_ADMIN_TOKEN") };
    let state = AppState::new(Catalog::new());
    let router = create_router(state);
    (
        TestServer::new(router).unwrap(),
        TestGuard { _guard: guard },
    )
}

/// Create a test server over a small pre-populated catalog:
/// main "Guitars" with sub "Strings", plus one filed instrument.
/// Returns the server, the guard, and the (main, sub) ids.
fn create_populated_test_server() -> (TestServer, TestGuard, CategoryId, CategoryId) {
    let guard = AUTH_TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    // SAFETY: Tests run sequentially under AUTH_TEST_MUTEX, so no concurrent env access.
    unsafe { std::env::remove_var("STOCKROOM_ADMIN_TOKEN") };

    let mut catalog = Catalog::new();
    let sub = catalog.create_sub("Strings", "String sets", &[]).unwrap();
    let main = catalog
        .create_main("Guitars", "Acoustic and electric", &[sub.id])
        .unwrap();
    catalog
        .create_instrument(NewInstrument {
            name: "Stratocaster".to_string(),
            brand: Some("Fender".to_string()),
            description: "Classic solid body".to_string(),
            price_cents: 129_999,
            stock: 2,
            category: main.id,
            sub_category: Some(sub.id),
            image: None,
        })
        .unwrap();

    let state = AppState::new(catalog);
    let router = create_router(state);
    (
        TestServer::new(router).unwrap(),
        TestGuard { _guard: guard },
        main.id,
        sub.id,
    )
}

// =============================================================================
// HEALTH / STATUS ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let (server, _guard) = create_test_server();

    let response = server.get("/health").await;

    response.assert_status_ok();
    let health: HealthResponse = response.json();
    assert_eq!(health.status, "ok");
    assert_eq!(health.version, env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_status_empty_catalog() {
    let (server, _guard) = create_test_server();

    let response = server.get("/status").await;

    response.assert_status_ok();
    let status: StatusResponse = response.json();
    assert_eq!(status.category_count, 0);
    assert_eq!(status.instrument_count, 0);
    assert!(!status.persistent);
}

#[tokio::test]
async fn test_status_populated_catalog() {
    let (server, _guard, _main, _sub) = create_populated_test_server();

    let response = server.get("/status").await;

    response.assert_status_ok();
    let status: StatusResponse = response.json();
    assert_eq!(status.category_count, 2);
    assert_eq!(status.instrument_count, 1);
}

// =============================================================================
// CATEGORY READ TESTS
// =============================================================================

#[tokio::test]
async fn test_list_categories_with_counts() {
    let (server, _guard, main, _sub) = create_populated_test_server();

    let response = server.get("/categories").await;

    response.assert_status_ok();
    let categories: Vec<CategorySummary> = response.json();
    assert_eq!(categories.len(), 1);
    assert_eq!(categories[0].id, main.0);
    assert_eq!(categories[0].name, "Guitars");
    assert_eq!(categories[0].instrument_count, 1);
}

#[tokio::test]
async fn test_main_category_detail_lists_children() {
    let (server, _guard, main, sub) = create_populated_test_server();

    let response = server.get(&format!("/categories/{}", main.0)).await;

    response.assert_status_ok();
    let category: CategoryJson = response.json();
    assert_eq!(category.kind, "main");
    assert_eq!(category.children, Some(vec![sub.0]));
    assert!(category.parents.is_none());
}

#[tokio::test]
async fn test_sub_category_detail_lists_parents() {
    let (server, _guard, main, sub) = create_populated_test_server();

    let response = server.get(&format!("/categories/{}", sub.0)).await;

    response.assert_status_ok();
    let category: CategoryJson = response.json();
    assert_eq!(category.kind, "sub");
    assert!(category.children.is_none());
    assert_eq!(category.parents, Some(vec![main.0]));
}

#[tokio::test]
async fn test_missing_category_is_404() {
    let (server, _guard) = create_test_server();

    let response = server.get("/categories/999").await;

    response.assert_status_not_found();
    let error: ErrorResponse = response.json();
    assert_eq!(error.kind, "not_found");
}

#[tokio::test]
async fn test_count_endpoint() {
    let (server, _guard, main, sub) = create_populated_test_server();

    let response = server.get(&format!("/categories/{}/count", main.0)).await;
    response.assert_status_ok();
    let count: CountResponse = response.json();
    assert_eq!(count.instrument_count, 1);

    let response = server.get(&format!("/categories/{}/count", sub.0)).await;
    response.assert_status_ok();
    let count: CountResponse = response.json();
    assert_eq!(count.instrument_count, 1);
}

// =============================================================================
// CATEGORY WRITE TESTS
// =============================================================================

#[tokio::test]
async fn test_create_main_category() {
    let (server, _guard) = create_test_server();

    let request = CreateMainRequest {
        name: "Keyboards".to_string(),
        description: "Pianos and synths".to_string(),
        children: vec![],
    };
    let response = server.post("/categories/main").json(&request).await;

    response.assert_status(axum::http::StatusCode::CREATED);
    let category: CategoryJson = response.json();
    assert_eq!(category.kind, "main");
    assert_eq!(category.children, Some(vec![]));
}

#[tokio::test]
async fn test_create_sub_with_unknown_parent_is_404() {
    let (server, _guard) = create_test_server();

    let request = CreateSubRequest {
        name: "Pedals".to_string(),
        description: "Effects pedals".to_string(),
        parents: vec![999],
    };
    let response = server.post("/categories/sub").json(&request).await;

    response.assert_status_not_found();
}

#[tokio::test]
async fn test_create_with_empty_name_is_400() {
    let (server, _guard) = create_test_server();

    let request = json!({ "name": "", "description": "d" });
    let response = server.post("/categories/main").json(&request).await;

    response.assert_status_bad_request();
    let error: ErrorResponse = response.json();
    assert_eq!(error.kind, "invalid_field");
}

#[tokio::test]
async fn test_attach_main_as_child_is_422() {
    let (server, _guard, main, _sub) = create_populated_test_server();

    // Create a second main category
    let request = CreateMainRequest {
        name: "Basses".to_string(),
        description: "Bass guitars".to_string(),
        children: vec![],
    };
    let created: CategoryJson = server
        .post("/categories/main")
        .json(&request)
        .await
        .json();

    let response = server
        .post(&format!("/categories/{}/attach", main.0))
        .json(&json!({ "child": created.id }))
        .await;

    response.assert_status(axum::http::StatusCode::UNPROCESSABLE_ENTITY);
    let error: ErrorResponse = response.json();
    assert_eq!(error.kind, "invalid_reference");
}

#[tokio::test]
async fn test_detach_then_reattach() {
    let (server, _guard, main, sub) = create_populated_test_server();

    let response = server
        .post(&format!("/categories/{}/detach", main.0))
        .json(&json!({ "child": sub.0 }))
        .await;
    response.assert_status_ok();
    let category: CategoryJson = response.json();
    assert_eq!(category.children, Some(vec![]));

    let response = server
        .post(&format!("/categories/{}/attach", main.0))
        .json(&json!({ "child": sub.0 }))
        .await;
    response.assert_status_ok();
    let category: CategoryJson = response.json();
    assert_eq!(category.children, Some(vec![sub.0]));
}

#[tokio::test]
async fn test_replace_children() {
    let (server, _guard, main, sub) = create_populated_test_server();

    let other: CategoryJson = server
        .post("/categories/sub")
        .json(&CreateSubRequest {
            name: "Picks".to_string(),
            description: "Plectrums".to_string(),
            parents: vec![],
        })
        .await
        .json();

    let response = server
        .put(&format!("/categories/{}/children", main.0))
        .json(&json!({ "children": [other.id] }))
        .await;

    response.assert_status_ok();
    let category: CategoryJson = response.json();
    assert_eq!(category.children, Some(vec![other.id]));

    // The former child now has no parents
    let detail: CategoryJson = server.get(&format!("/categories/{}", sub.0)).await.json();
    assert_eq!(detail.parents, Some(vec![]));
}

#[tokio::test]
async fn test_demote_reports_discarded_children() {
    let (server, _guard, main, sub) = create_populated_test_server();

    let response = server
        .post(&format!("/categories/{}/demote", main.0))
        .json(&json!({}))
        .await;

    response.assert_status_ok();
    let result: DemoteResponse = response.json();
    assert_eq!(result.category.kind, "sub");
    assert_eq!(result.discarded_children, vec![sub.0]);
}

#[tokio::test]
async fn test_promote_sub_to_main() {
    let (server, _guard, _main, sub) = create_populated_test_server();

    // Promotion pulls the id out of its former parents automatically
    let response = server
        .post(&format!("/categories/{}/promote", sub.0))
        .json(&json!({}))
        .await;

    response.assert_status_ok();
    let category: CategoryJson = response.json();
    assert_eq!(category.kind, "main");
    assert_eq!(category.children, Some(vec![]));
}

// =============================================================================
// DELETE TESTS
// =============================================================================

#[tokio::test]
async fn test_delete_plan_is_read_only() {
    let (server, _guard, main, sub) = create_populated_test_server();

    let response = server
        .get(&format!("/categories/{}/delete-plan", main.0))
        .await;

    response.assert_status_ok();
    let plan: DeletePlanJson = response.json();
    assert_eq!(plan.target, main.0);
    assert!(plan.members.contains(&sub.0));
    assert!(plan.needs_confirmation);

    // Nothing was deleted
    let status: StatusResponse = server.get("/status").await.json();
    assert_eq!(status.category_count, 2);
}

#[tokio::test]
async fn test_unconfirmed_cascade_is_409() {
    let (server, _guard, main, _sub) = create_populated_test_server();

    let response = server
        .post(&format!("/categories/{}/delete", main.0))
        .json(&json!({ "confirmed": false }))
        .await;

    response.assert_status(axum::http::StatusCode::CONFLICT);
    let body: ConfirmationRequired = response.json();
    assert_eq!(body.plan.target, main.0);
    assert_eq!(body.plan.members.len(), 2);

    let status: StatusResponse = server.get("/status").await.json();
    assert_eq!(status.category_count, 2);
}

#[tokio::test]
async fn test_confirmed_cascade_removes_set() {
    let (server, _guard, main, sub) = create_populated_test_server();

    let response = server
        .post(&format!("/categories/{}/delete", main.0))
        .json(&json!({ "confirmed": true }))
        .await;

    response.assert_status_ok();
    let result: DeleteResponse = response.json();
    assert!(result.deleted);
    assert_eq!(result.removed.len(), 2);
    assert!(result.removed.contains(&main.0));
    assert!(result.removed.contains(&sub.0));

    let status: StatusResponse = server.get("/status").await.json();
    assert_eq!(status.category_count, 0);
}

#[tokio::test]
async fn test_delete_childless_main_needs_no_confirmation() {
    let (server, _guard) = create_test_server();

    let created: CategoryJson = server
        .post("/categories/main")
        .json(&CreateMainRequest {
            name: "Empty".to_string(),
            description: "No children".to_string(),
            children: vec![],
        })
        .await
        .json();

    let response = server
        .post(&format!("/categories/{}/delete", created.id))
        .json(&json!({}))
        .await;

    response.assert_status_ok();
    let result: DeleteResponse = response.json();
    assert_eq!(result.removed, vec![created.id]);
}

// =============================================================================
// INSTRUMENT TESTS
// =============================================================================

#[tokio::test]
async fn test_create_and_fetch_instrument_with_image() {
    let (server, _guard, main, sub) = create_populated_test_server();

    let request = json!({
        "name": "Telecaster",
        "brand": "Fender",
        "description": "Twangy",
        "price_cents": 99999,
        "stock": 1,
        "category": main.0,
        "sub_category": sub.0,
        "image": { "mime_type": "image/png", "data": "aGVsbG8=" }
    });
    let response = server.post("/instruments").json(&request).await;

    response.assert_status(axum::http::StatusCode::CREATED);
    let created: InstrumentJson = response.json();
    let image = created.image.expect("image stored");
    assert_eq!(image.mime_type, "image/png");
    assert_eq!(image.data, "aGVsbG8=");

    let detail: InstrumentJson = server
        .get(&format!("/instruments/{}", created.id))
        .await
        .json();
    assert_eq!(detail.name, "Telecaster");
}

#[tokio::test]
async fn test_create_instrument_with_bad_base64_is_400() {
    let (server, _guard, main, _sub) = create_populated_test_server();

    let request = json!({
        "name": "Broken",
        "description": "Bad image payload",
        "price_cents": 100,
        "stock": 1,
        "category": main.0,
        "image": { "mime_type": "image/png", "data": "not base64!!!" }
    });
    let response = server.post("/instruments").json(&request).await;

    response.assert_status_bad_request();
    let error: ErrorResponse = response.json();
    assert_eq!(error.kind, "invalid_request");
}

#[tokio::test]
async fn test_instruments_in_category() {
    let (server, _guard, main, sub) = create_populated_test_server();

    let response = server.get(&format!("/instruments/in/{}", main.0)).await;
    response.assert_status_ok();
    let instruments: Vec<InstrumentJson> = response.json();
    assert_eq!(instruments.len(), 1);

    let response = server.get(&format!("/instruments/in/{}", sub.0)).await;
    response.assert_status_ok();
    let instruments: Vec<InstrumentJson> = response.json();
    assert_eq!(instruments.len(), 1);
}

#[tokio::test]
async fn test_missing_instrument_is_404() {
    let (server, _guard) = create_test_server();

    let response = server.get("/instruments/999").await;
    response.assert_status_not_found();
}

// =============================================================================
// ADMIN TOKEN TESTS
// =============================================================================

/// Create a test server with the admin token gate enabled.
fn create_auth_test_server(token: &str) -> (TestServer, TestGuard) {
    let guard = AUTH_TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    // SAFETY: Tests run sequentially under AUTH_TEST_MUTEX, so no concurrent env access.
    unsafe { std::env::set_var("STOCKROOM_ADMIN_TOKEN", token) };
    let state = AppState::new(Catalog::new());
    let router = create_router(state);
    (
        TestServer::new(router).unwrap(),
        TestGuard { _guard: guard },
    )
}

#[tokio::test]
async fn test_reads_are_open_with_auth_enabled() {
    let (server, _guard) = create_auth_test_server("secret-token");

    server.get("/health").await.assert_status_ok();
    server.get("/status").await.assert_status_ok();
    server.get("/categories").await.assert_status_ok();
}

#[tokio::test]
async fn test_mutation_without_token_is_401() {
    let (server, _guard) = create_auth_test_server("secret-token");

    let request = json!({ "name": "Guitars", "description": "d" });
    let response = server.post("/categories/main").json(&request).await;

    response.assert_status_unauthorized();
}

#[tokio::test]
async fn test_mutation_with_wrong_token_is_401() {
    let (server, _guard) = create_auth_test_server("secret-token");

    let request = json!({ "name": "Guitars", "description": "d" });
    let response = server
        .post("/categories/main")
        .add_header(
            axum::http::header::AUTHORIZATION,
            axum::http::HeaderValue::from_static("Bearer wrong-token"),
        )
        .json(&request)
        .await;

    response.assert_status_unauthorized();
}

#[tokio::test]
async fn test_mutation_with_valid_token_succeeds() {
    let (server, _guard) = create_auth_test_server("secret-token");

    let request = json!({ "name": "Guitars", "description": "d" });
    let response = server
        .post("/categories/main")
        .add_header(
            axum::http::header::AUTHORIZATION,
            axum::http::HeaderValue::from_static("Bearer secret-token"),
        )
        .json(&request)
        .await;

    response.assert_status(axum::http::StatusCode::CREATED);
}
