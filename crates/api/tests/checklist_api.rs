//! Integration tests for the `/api/v1/checklists` endpoints.

mod common;

use axum::http::StatusCode;
use common::{body_json, build_test_app, post_json};
use recon_core::migration::MigrationFlags;
use serde_json::json;

fn submit_body(status: &str) -> serde_json::Value {
    json!({
        "vehicle_id": "V-1",
        "quote_id": "Q-1",
        "partner_id": "partner-1",
        "items": [
            { "item_key": "brakes", "status": status, "notes": "checked" },
            { "item_key": "lights", "status": "ok" }
        ],
        "evidences": {
            "front": { "storage_path": "uploads/V-1/front.jpg", "media_type": "image/jpeg" }
        }
    })
}

fn load_body() -> serde_json::Value {
    json!({ "vehicle_id": "V-1", "quote_id": "Q-1" })
}

// ---------------------------------------------------------------------------
// Happy paths
// ---------------------------------------------------------------------------

#[tokio::test]
async fn init_is_idempotent_per_context_and_vehicle() {
    let app = build_test_app(MigrationFlags::default());
    let body = json!({ "vehicle_id": "V-1", "inspection_id": "I-1", "partner_id": "p" });

    let first = body_json(post_json(&app.router, "/api/v1/checklists/init", body.clone()).await).await;
    let second = body_json(post_json(&app.router, "/api/v1/checklists/init", body).await).await;

    assert_eq!(first["success"], true);
    assert_eq!(first["data"]["created"], true);
    assert_eq!(first["data"]["status"], "draft");
    assert_eq!(second["data"]["created"], false);
    assert_eq!(first["data"]["checklist_id"], second["data"]["checklist_id"]);
}

#[tokio::test]
async fn submit_then_load_on_aggregate_path() {
    let app = build_test_app(MigrationFlags::all_enabled());

    let response = post_json(&app.router, "/api/v1/checklists/submit", submit_body("needs_repair")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let submitted = body_json(response).await;
    assert_eq!(submitted["data"]["status"], "submitted");
    assert_eq!(submitted["data"]["items_saved"], 2);
    assert_eq!(submitted["data"]["evidences_saved"], 1);
    assert_eq!(submitted["data"]["needs_attention"], true);

    let loaded = body_json(post_json(&app.router, "/api/v1/checklists/load", load_body()).await).await;
    let data = &loaded["data"];
    assert_eq!(data["checklist"]["id"], submitted["data"]["checklist_id"]);
    assert_eq!(data["checklist"]["quote_id"], "Q-1");
    assert_eq!(data["items"].as_array().unwrap().len(), 2);
    assert_eq!(data["stats"]["items_needing_attention"], 1);
    assert_eq!(
        data["evidences"][0]["signed_url"],
        "memory://uploads/V-1/front.jpg?expires_in=3600"
    );
}

#[tokio::test]
async fn load_of_unknown_checklist_returns_null_data() {
    let app = build_test_app(MigrationFlags::default());
    let response = post_json(&app.router, "/api/v1/checklists/load", load_body()).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert!(json["data"].is_null());
}

#[tokio::test]
async fn flags_route_each_api_independently() {
    // Submit goes to the aggregate path, load stays on legacy, and the two
    // paths do not share storage in the test wiring.
    let app = build_test_app(MigrationFlags {
        submit: true,
        ..MigrationFlags::default()
    });

    post_json(&app.router, "/api/v1/checklists/submit", submit_body("ok")).await;
    let loaded = body_json(post_json(&app.router, "/api/v1/checklists/load", load_body()).await).await;
    assert!(loaded["data"].is_null());

    let usage = &app.metrics.snapshot().usage;
    assert_eq!(usage.ddd.submit_checklist, 1);
    assert_eq!(usage.legacy.load_checklist, 1);
}

#[tokio::test]
async fn anomalies_are_saved_as_items_with_photos() {
    let app = build_test_app(MigrationFlags::all_enabled());
    let body = json!({
        "vehicle_id": "V-1",
        "quote_id": "Q-1",
        "partner_id": "partner-1",
        "anomalies": [
            { "description": "Scratch on door", "photos": ["uploads/a1.jpg", "uploads/a2.jpg"] },
            { "description": "Cracked mirror" }
        ]
    });

    let json = body_json(post_json(&app.router, "/api/v1/checklists/anomalies", body).await).await;
    assert_eq!(json["data"]["anomalies_saved"], 2);
    assert_eq!(json["data"]["photos_saved"], 2);

    let loaded = body_json(post_json(&app.router, "/api/v1/checklists/load", load_body()).await).await;
    assert_eq!(loaded["data"]["checklist"]["status"], "draft");
    assert_eq!(loaded["data"]["items"].as_array().unwrap().len(), 2);
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[tokio::test]
async fn blank_required_field_is_validation_error() {
    let app = build_test_app(MigrationFlags::default());
    let body = json!({ "vehicle_id": "", "quote_id": "Q-1", "partner_id": "p" });

    let response = post_json(&app.router, "/api/v1/checklists/init", body).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn missing_context_is_validation_error() {
    let app = build_test_app(MigrationFlags::all_enabled());
    let body = json!({ "vehicle_id": "V-1", "partner_id": "p", "quote_id": "  " });

    let response = post_json(&app.router, "/api/v1/checklists/init", body).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn malformed_body_is_bad_request() {
    let app = build_test_app(MigrationFlags::default());
    let response = post_json(&app.router, "/api/v1/checklists/submit", json!({ "items": 3 })).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "BAD_REQUEST");
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn resubmission_is_refused_without_fallback() {
    let app = build_test_app(MigrationFlags::all_enabled());
    post_json(&app.router, "/api/v1/checklists/submit", submit_body("ok")).await;

    let response = post_json(&app.router, "/api/v1/checklists/submit", submit_body("ok")).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], "INVALID_STATE");

    let snapshot = app.metrics.snapshot();
    assert_eq!(snapshot.usage.ddd.submit_checklist, 2);
    assert_eq!(snapshot.fallbacks.submit_checklist, 0);
    assert_eq!(snapshot.errors.ddd.submit_checklist, 0);
    assert_eq!(snapshot.usage.legacy.submit_checklist, 0);
}

#[tokio::test]
async fn repeated_bad_requests_raise_no_alerts() {
    let app = build_test_app(MigrationFlags::all_enabled());
    let mut body = submit_body("ok");
    body["items"] = json!([]);

    for _ in 0..12 {
        let response = post_json(&app.router, "/api/v1/checklists/submit", body.clone()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    assert_eq!(app.metrics.snapshot().fallbacks.submit_checklist, 0);
    assert!(app.metrics.active_alerts().is_empty());
}
