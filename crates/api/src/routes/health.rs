use axum::extract::State;
use axum::{routing::get, Json, Router};
use recon_core::migration::MigrationFlags;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// `None` when no database is wired in.
    pub db_healthy: Option<bool>,
    pub flags: MigrationFlags,
    pub active_alerts: usize,
}

/// GET /health -- service, database and migration health.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let db_healthy = match &state.pool {
        Some(pool) => Some(recon_db::health_check(pool).await.is_ok()),
        None => None,
    };

    let status = if db_healthy == Some(false) { "degraded" } else { "ok" };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        db_healthy,
        flags: state.checklists.flags(),
        active_alerts: state.metrics().active_alerts().len(),
    })
}

/// Mount health check routes at the root, outside `/api/v1`.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
