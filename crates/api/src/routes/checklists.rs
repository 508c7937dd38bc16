use axum::routing::post;
use axum::Router;

use crate::handlers::checklists;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/init", post(checklists::init_checklist))
        .route("/submit", post(checklists::submit_checklist))
        .route("/anomalies", post(checklists::save_anomalies))
        .route("/load", post(checklists::load_checklist))
}
