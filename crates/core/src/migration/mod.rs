//! Strangler-fig migration from the direct-SQL checklist path to the
//! aggregate-backed service: feature flags, metrics, alerts and the router
//! that ties them together.

pub mod flags;
pub mod metrics;
pub mod router;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::metric_names::{
    API_INIT_CHECKLIST, API_LOAD_CHECKLIST, API_SAVE_ANOMALIES, API_SUBMIT_CHECKLIST,
};

pub use flags::MigrationFlags;
pub use metrics::MigrationMetrics;
pub use router::ChecklistApiRouter;

/// The checklist operations tracked during the migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ApiName {
    SubmitChecklist,
    SaveAnomalies,
    InitChecklist,
    LoadChecklist,
}

impl ApiName {
    pub const ALL: [ApiName; 4] = [
        ApiName::SubmitChecklist,
        ApiName::SaveAnomalies,
        ApiName::InitChecklist,
        ApiName::LoadChecklist,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::SubmitChecklist => API_SUBMIT_CHECKLIST,
            Self::SaveAnomalies => API_SAVE_ANOMALIES,
            Self::InitChecklist => API_INIT_CHECKLIST,
            Self::LoadChecklist => API_LOAD_CHECKLIST,
        }
    }
}

impl fmt::Display for ApiName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which implementation served (or should serve) a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    Ddd,
    Legacy,
}

impl Variant {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ddd => "ddd",
            Self::Legacy => "legacy",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
