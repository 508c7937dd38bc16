use axum::routing::{get, post};
use axum::Router;

use crate::handlers::migration;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/metrics", get(migration::get_metrics))
        .route("/stats", get(migration::get_stats))
        .route("/alerts", get(migration::list_alerts))
        .route("/alerts/{id}/resolve", post(migration::resolve_alert))
}
