//! Unit tests for API types serialization/deserialization.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use stockroom::api::{
    CategoryJson, CreateInstrumentRequest, DeleteRequest, HealthResponse, ImageJson,
    StatusResponse,
};
use stockroom_core::{CatalogError, Category, CategoryId, CategoryKind};
use std::collections::BTreeSet;

// =============================================================================
// HEALTH RESPONSE TESTS
// =============================================================================

#[test]
fn test_health_response_default() {
    let health = HealthResponse::default();
    assert_eq!(health.status, "ok");
    assert!(!health.version.is_empty());
}

#[test]
fn test_health_response_serialization() {
    let health = HealthResponse {
        status: "ok".to_string(),
        version: "0.3.0".to_string(),
    };

    let json = serde_json::to_string(&health).unwrap();
    assert!(json.contains("\"status\":\"ok\""));
    assert!(json.contains("\"version\":\"0.3.0\""));
}

// =============================================================================
// STATUS RESPONSE TESTS
// =============================================================================

#[test]
fn test_status_response_roundtrip() {
    let json = r#"{"category_count":4,"instrument_count":12,"persistent":true}"#;
    let status: StatusResponse = serde_json::from_str(json).unwrap();

    assert_eq!(status.category_count, 4);
    assert_eq!(status.instrument_count, 12);
    assert!(status.persistent);
}

// =============================================================================
// CATEGORY JSON TESTS
// =============================================================================

fn main_category(id: u64, children: &[u64]) -> Category {
    Category {
        id: CategoryId(id),
        name: "Guitars".to_string(),
        description: "All guitars".to_string(),
        kind: CategoryKind::Main {
            children: children.iter().copied().map(CategoryId).collect::<BTreeSet<_>>(),
        },
    }
}

#[test]
fn test_main_category_serializes_children_even_when_empty() {
    let json_value =
        serde_json::to_value(CategoryJson::from_category(&main_category(1, &[]))).unwrap();

    // An empty child set is an empty array, never null and never absent
    assert_eq!(json_value["kind"], "main");
    assert_eq!(json_value["children"], serde_json::json!([]));
}

#[test]
fn test_sub_category_omits_children_field() {
    let sub = Category {
        id: CategoryId(2),
        name: "Strings".to_string(),
        description: "String sets".to_string(),
        kind: CategoryKind::Sub,
    };
    let json_value = serde_json::to_value(CategoryJson::from_category(&sub)).unwrap();

    assert_eq!(json_value["kind"], "sub");
    assert!(json_value.get("children").is_none());
}

#[test]
fn test_sub_detail_carries_parents() {
    let sub = Category {
        id: CategoryId(2),
        name: "Strings".to_string(),
        description: "String sets".to_string(),
        kind: CategoryKind::Sub,
    };
    let json = CategoryJson::with_parents(&sub, &[CategoryId(7), CategoryId(9)]);
    assert_eq!(json.parents, Some(vec![7, 9]));
}

#[test]
fn test_main_detail_never_carries_parents() {
    let json = CategoryJson::with_parents(&main_category(1, &[5]), &[CategoryId(9)]);
    assert!(json.parents.is_none());
    assert_eq!(json.children, Some(vec![5]));
}

// =============================================================================
// DELETE REQUEST TESTS
// =============================================================================

#[test]
fn test_delete_request_defaults_to_unconfirmed() {
    let request: DeleteRequest = serde_json::from_str("{}").unwrap();
    assert!(!request.confirmed);
}

// =============================================================================
// IMAGE JSON TESTS
// =============================================================================

#[test]
fn test_image_decode_roundtrip() {
    let json = ImageJson {
        mime_type: "image/png".to_string(),
        data: "aGVsbG8=".to_string(),
    };
    let image = json.to_image().unwrap();
    assert_eq!(image.bytes, b"hello");
    assert_eq!(ImageJson::from_image(&image).data, "aGVsbG8=");
}

#[test]
fn test_invalid_base64_is_rejected() {
    let json = ImageJson {
        mime_type: "image/png".to_string(),
        data: "!!! not base64 !!!".to_string(),
    };
    assert!(matches!(
        json.to_image(),
        Err(CatalogError::Serialization(_))
    ));
}

// =============================================================================
// CREATE INSTRUMENT REQUEST TESTS
// =============================================================================

#[test]
fn test_create_instrument_request_decodes_image() {
    let request: CreateInstrumentRequest = serde_json::from_str(
        r#"{
            "name": "Telecaster",
            "description": "Twangy",
            "price_cents": 99999,
            "stock": 1,
            "category": 1,
            "sub_category": 2,
            "image": { "mime_type": "image/jpeg", "data": "aGk=" }
        }"#,
    )
    .unwrap();

    let new = request.to_new_instrument().unwrap();
    assert_eq!(new.category, CategoryId(1));
    assert_eq!(new.sub_category, Some(CategoryId(2)));
    assert_eq!(new.image.unwrap().bytes, b"hi");
}

#[test]
fn test_create_instrument_request_optional_fields_default() {
    let request: CreateInstrumentRequest = serde_json::from_str(
        r#"{
            "name": "Shaker",
            "description": "Percussion",
            "price_cents": 500,
            "stock": 10,
            "category": 3
        }"#,
    )
    .unwrap();

    let new = request.to_new_instrument().unwrap();
    assert!(new.brand.is_none());
    assert!(new.sub_category.is_none());
    assert!(new.image.is_none());
}
