//! Read-only monitoring of the checklist migration, plus alert resolution.

use axum::extract::{Path, Query, State};
use axum::Json;
use recon_core::alert::MigrationAlert;
use recon_core::error::CoreError;
use recon_core::migration::metrics::{MetricsSnapshot, MigrationStats};
use recon_core::migration::MigrationFlags;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct MetricsResponse {
    pub flags: MigrationFlags,
    pub metrics: MetricsSnapshot,
}

#[derive(Debug, Default, Deserialize)]
pub struct AlertsQuery {
    /// Include resolved alerts.
    #[serde(default)]
    pub all: bool,
}

#[derive(Debug, Serialize)]
pub struct ResolveAlertResponse {
    pub id: Uuid,
    pub resolved: bool,
}

/// GET /migration/metrics
pub async fn get_metrics(State(state): State<AppState>) -> Json<DataResponse<MetricsResponse>> {
    Json(DataResponse::new(MetricsResponse {
        flags: state.checklists.flags(),
        metrics: state.metrics().snapshot(),
    }))
}

/// GET /migration/stats
pub async fn get_stats(State(state): State<AppState>) -> Json<DataResponse<MigrationStats>> {
    Json(DataResponse::new(state.metrics().migration_stats()))
}

/// GET /migration/alerts?all=true
pub async fn list_alerts(
    State(state): State<AppState>,
    Query(query): Query<AlertsQuery>,
) -> Json<DataResponse<Vec<MigrationAlert>>> {
    let alerts = if query.all {
        state.metrics().all_alerts()
    } else {
        state.metrics().active_alerts()
    };
    Json(DataResponse::new(alerts))
}

/// POST /migration/alerts/{id}/resolve
pub async fn resolve_alert(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<DataResponse<ResolveAlertResponse>>> {
    let metrics = state.metrics();
    // Resolving twice is a no-op; only unknown ids are an error.
    let known = metrics.resolve_alert(id) || metrics.all_alerts().iter().any(|a| a.id == id);
    if !known {
        return Err(CoreError::not_found("alert", id).into());
    }
    Ok(Json(DataResponse::new(ResolveAlertResponse { id, resolved: true })))
}
