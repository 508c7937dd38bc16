//! Integration tests for the direct-SQL checklist path.
//!
//! Besides the happy paths, these pin down that the legacy path refuses the
//! same requests as the aggregate path: resubmission, empty submissions,
//! anomalies on a submitted checklist and free-form `anomaly:` keys.

use std::collections::BTreeMap;
use std::sync::Arc;

use assert_matches::assert_matches;
use recon_core::checklist::aggregate::ChecklistStatus;
use recon_core::checklist::api::{
    AnomalyInput, ChecklistApi, EvidenceInput, InitChecklistRequest, ItemInput,
    LoadChecklistRequest, SaveAnomaliesRequest, SubmitChecklistRequest,
};
use recon_core::checklist::context::LegacyContext;
use recon_core::checklist::memory::InMemoryObjectStore;
use recon_core::error::CoreError;
use recon_db::legacy::LegacyChecklistApi;
use recon_db::repositories::{TimelineRepo, VehicleRepo};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn legacy(pool: PgPool) -> LegacyChecklistApi {
    LegacyChecklistApi::new(pool, Arc::new(InMemoryObjectStore::new()))
}

fn quote(id: &str) -> LegacyContext {
    LegacyContext::new(Some(id), None)
}

fn item(key: &str, status: &str) -> ItemInput {
    ItemInput {
        item_key: key.to_string(),
        status: status.to_string(),
        notes: None,
    }
}

fn submit_request(items: Vec<ItemInput>) -> SubmitChecklistRequest {
    let mut evidences = BTreeMap::new();
    evidences.insert(
        "front".to_string(),
        EvidenceInput {
            storage_path: "uploads/V-1/front.jpg".to_string(),
            media_type: Some("image/jpeg".to_string()),
            description: None,
        },
    );
    SubmitChecklistRequest {
        vehicle_id: "V-1".to_string(),
        context: quote("Q-1"),
        partner_id: "partner-1".to_string(),
        items,
        evidences,
    }
}

fn load_request() -> LoadChecklistRequest {
    LoadChecklistRequest {
        vehicle_id: "V-1".to_string(),
        context: quote("Q-1"),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn submit_writes_rows_timeline_and_vehicle_status(pool: PgPool) {
    VehicleRepo::create(&pool, "V-1", "pending").await.unwrap();
    let api = legacy(pool.clone());

    let response = api
        .submit_checklist(submit_request(vec![
            item("brakes", "needs_repair"),
            item("lights", "ok"),
        ]))
        .await
        .unwrap();
    assert_eq!(response.status, ChecklistStatus::Submitted);
    assert_eq!(response.items_saved, 2);
    assert_eq!(response.evidences_saved, 1);
    assert!(response.needs_attention);

    let vehicle = VehicleRepo::find_by_id(&pool, "V-1").await.unwrap().unwrap();
    assert_eq!(vehicle.status, "needs_attention");

    let timeline = TimelineRepo::list_by_vehicle(&pool, "V-1").await.unwrap();
    assert_eq!(timeline.len(), 1);
    assert_eq!(timeline[0].event_type, "checklist.submitted");
    assert_eq!(
        timeline[0].payload["checklist_id"],
        response.checklist_id.to_string()
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn resubmission_is_refused_and_keeps_rows(pool: PgPool) {
    let api = legacy(pool);

    api.submit_checklist(submit_request(vec![item("brakes", "ok"), item("lights", "ok")]))
        .await
        .unwrap();
    let err = api
        .submit_checklist(submit_request(vec![item("tyres", "not_applicable")]))
        .await
        .unwrap_err();
    assert_matches!(err, CoreError::InvalidState(_));

    let details = api.load_checklist(load_request()).await.unwrap().unwrap();
    let mut keys: Vec<&str> = details.items.iter().map(|i| i.item_key.as_str()).collect();
    keys.sort_unstable();
    assert_eq!(keys, vec!["brakes", "lights"]);
    assert_eq!(details.checklist.status, ChecklistStatus::Submitted);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn submit_without_items_is_refused_before_any_write(pool: PgPool) {
    let api = legacy(pool);

    let err = api.submit_checklist(submit_request(Vec::new())).await.unwrap_err();
    assert_matches!(err, CoreError::Validation(_));
    assert!(api.load_checklist(load_request()).await.unwrap().is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn submit_refuses_free_form_anomaly_keys(pool: PgPool) {
    let api = legacy(pool);

    let err = api
        .submit_checklist(submit_request(vec![item("brakes", "ok"), item("anomaly:x", "ok")]))
        .await
        .unwrap_err();
    assert_matches!(err, CoreError::Validation(_));

    let mut request = submit_request(vec![item("brakes", "ok")]);
    request.evidences.insert(
        "anomaly:1:front".to_string(),
        EvidenceInput {
            storage_path: "uploads/V-1/extra.jpg".to_string(),
            media_type: None,
            description: None,
        },
    );
    let err = api.submit_checklist(request).await.unwrap_err();
    assert_matches!(err, CoreError::Validation(_));
    assert!(api.load_checklist(load_request()).await.unwrap().is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn submit_rejects_unknown_status_and_missing_context(pool: PgPool) {
    let api = legacy(pool);

    let err = api
        .submit_checklist(submit_request(vec![item("brakes", "broken")]))
        .await
        .unwrap_err();
    assert_matches!(err, CoreError::Validation(_));

    let mut request = submit_request(vec![item("brakes", "ok")]);
    request.context = LegacyContext::default();
    let err = api.submit_checklist(request).await.unwrap_err();
    assert_matches!(err, CoreError::Validation(_));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn init_is_idempotent(pool: PgPool) {
    let api = legacy(pool);
    let request = InitChecklistRequest {
        vehicle_id: "V-1".to_string(),
        context: LegacyContext::new(None, Some("I-1")),
        partner_id: "partner-1".to_string(),
    };

    let first = api.init_checklist(request.clone()).await.unwrap();
    let second = api.init_checklist(request).await.unwrap();
    assert!(first.created);
    assert!(!second.created);
    assert_eq!(first.checklist_id, second.checklist_id);
    assert_eq!(second.status, ChecklistStatus::Draft);
}

fn anomalies(descriptions: &[&str]) -> SaveAnomaliesRequest {
    SaveAnomaliesRequest {
        vehicle_id: "V-1".to_string(),
        context: quote("Q-1"),
        partner_id: "partner-1".to_string(),
        anomalies: descriptions
            .iter()
            .map(|d| AnomalyInput {
                description: d.to_string(),
                photos: vec![format!("uploads/{d}.jpg")],
            })
            .collect(),
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn anomalies_replace_earlier_anomalies_and_survive_submit(pool: PgPool) {
    let api = legacy(pool);

    api.save_anomalies(anomalies(&["scratch", "dent"])).await.unwrap();
    let response = api.save_anomalies(anomalies(&["rust"])).await.unwrap();
    assert_eq!(response.anomalies_saved, 1);
    assert_eq!(response.photos_saved, 1);

    let details = api.load_checklist(load_request()).await.unwrap().unwrap();
    let keys: Vec<&str> = details.items.iter().map(|i| i.item_key.as_str()).collect();
    assert_eq!(keys, vec!["anomaly:1"]);
    let anomaly = &details.items[0];
    assert_eq!(anomaly.status, "needs_repair");
    assert_eq!(anomaly.notes.as_deref(), Some("rust"));

    // A full submit resends the generated rows along with the regular ones.
    let mut request = submit_request(vec![item("brakes", "ok"), item("anomaly:1", "needs_repair")]);
    request.evidences.insert(
        "anomaly:1:photo:1".to_string(),
        EvidenceInput {
            storage_path: "uploads/rust.jpg".to_string(),
            media_type: None,
            description: None,
        },
    );
    api.submit_checklist(request).await.unwrap();

    let details = api.load_checklist(load_request()).await.unwrap().unwrap();
    let mut keys: Vec<&str> = details.items.iter().map(|i| i.item_key.as_str()).collect();
    keys.sort_unstable();
    assert_eq!(keys, vec!["anomaly:1", "brakes"]);
    let mut evidence_keys: Vec<&str> = details
        .evidences
        .iter()
        .map(|e| e.evidence_key.as_str())
        .collect();
    evidence_keys.sort_unstable();
    assert_eq!(evidence_keys, vec!["anomaly:1:photo:1", "front"]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn anomalies_on_submitted_checklist_are_refused(pool: PgPool) {
    let api = legacy(pool);
    api.submit_checklist(submit_request(vec![item("brakes", "ok")]))
        .await
        .unwrap();

    let err = api.save_anomalies(anomalies(&["scratch"])).await.unwrap_err();
    assert_matches!(err, CoreError::InvalidState(_));

    let details = api.load_checklist(load_request()).await.unwrap().unwrap();
    let keys: Vec<&str> = details.items.iter().map(|i| i.item_key.as_str()).collect();
    assert_eq!(keys, vec!["brakes"]);
    assert_eq!(details.evidences.len(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn load_signs_evidence_urls_and_returns_none_when_missing(pool: PgPool) {
    let api = legacy(pool);
    assert!(api.load_checklist(load_request()).await.unwrap().is_none());

    api.submit_checklist(submit_request(vec![item("brakes", "ok")]))
        .await
        .unwrap();
    let details = api.load_checklist(load_request()).await.unwrap().unwrap();
    assert_eq!(details.checklist.quote_id.as_deref(), Some("Q-1"));
    assert_eq!(
        details.evidences[0].signed_url.as_deref(),
        Some("memory://uploads/V-1/front.jpg?expires_in=3600")
    );
    assert_eq!(details.stats.total_evidences, 1);
    assert_eq!(details.stats.completion_percentage, 100);
}
