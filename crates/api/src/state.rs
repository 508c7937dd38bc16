use std::sync::Arc;

use recon_core::migration::{ChecklistApiRouter, MigrationMetrics};

use crate::config::ServerConfig;

/// Shared application state available to handlers via `State<AppState>`.
#[derive(Clone)]
pub struct AppState {
    /// `None` when the checklist paths run on in-memory adapters.
    pub pool: Option<recon_db::DbPool>,
    pub config: Arc<ServerConfig>,
    /// Flag-driven dispatcher between the aggregate and legacy paths.
    pub checklists: Arc<ChecklistApiRouter>,
}

impl AppState {
    pub fn metrics(&self) -> &Arc<MigrationMetrics> {
        self.checklists.metrics()
    }
}
