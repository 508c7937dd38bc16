pub mod checklists;
pub mod health;
pub mod migration;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /checklists/init                      find or create a draft (POST)
/// /checklists/submit                    replace items/evidences and submit (POST)
/// /checklists/anomalies                 replace anomaly items and photos (POST)
/// /checklists/load                      checklist with items, evidences, stats (POST)
///
/// /migration/metrics                    counters, samples, error rates, flags
/// /migration/stats                      adoption and performance summary
/// /migration/alerts                     active alerts (?all=true for every alert)
/// /migration/alerts/{id}/resolve        mark an alert resolved (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/checklists", checklists::router())
        .nest("/migration", migration::router())
}
