#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use recon_core::checklist::memory::{
    InMemoryChecklistItemRepository, InMemoryChecklistRepository, InMemoryChecklistUnitOfWork,
    InMemoryEvidenceRepository, InMemoryObjectStore, RecordingTimelinePublisher,
    RecordingVehicleStatusWriter,
};
use recon_core::checklist::service::{ChecklistPorts, ChecklistService};
use recon_core::migration::{ChecklistApiRouter, MigrationFlags, MigrationMetrics};
use tower::ServiceExt;

use recon_api::config::{LogFormat, ServerConfig};
use recon_api::router::build_app_router;
use recon_api::state::AppState;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        database_url: None,
        db_max_connections: 1,
        signed_url_ttl_secs: 3600,
        log_format: LogFormat::Pretty,
    }
}

/// In-memory wiring of one checklist path.
pub fn memory_service() -> ChecklistService {
    let store = Arc::new(InMemoryObjectStore::new());
    let checklists = Arc::new(InMemoryChecklistRepository::new());
    let items = Arc::new(InMemoryChecklistItemRepository::new());
    let evidences = Arc::new(InMemoryEvidenceRepository::new());
    let unit_of_work = InMemoryChecklistUnitOfWork::new(
        Arc::clone(&checklists),
        Arc::clone(&items),
        Arc::clone(&evidences),
    );
    ChecklistService::new(ChecklistPorts {
        checklists,
        items,
        evidences,
        unit_of_work: Arc::new(unit_of_work),
        timeline: Arc::new(RecordingTimelinePublisher::new()),
        vehicles: Arc::new(RecordingVehicleStatusWriter::new()),
        signer: store.clone(),
        uploader: store,
    })
}

pub struct TestApp {
    pub router: Router,
    pub metrics: Arc<MigrationMetrics>,
}

/// Build the full application with both checklist paths on separate
/// in-memory stores, so tests can tell which path served a request.
pub fn build_test_app(flags: MigrationFlags) -> TestApp {
    let config = test_config();
    let metrics = Arc::new(MigrationMetrics::new());
    let checklists = ChecklistApiRouter::new(
        Arc::new(memory_service()),
        Arc::new(memory_service()),
        flags,
        Arc::clone(&metrics),
    );

    let state = AppState {
        pool: None,
        config: Arc::new(config.clone()),
        checklists: Arc::new(checklists),
    };

    TestApp {
        router: build_app_router(state, &config),
        metrics,
    }
}

pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

pub async fn post_json(app: &Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
