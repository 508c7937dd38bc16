//! Well-known API names and feature-flag environment variables for the
//! checklist migration.
//!
//! The API names are the keys used in metrics snapshots and alert messages;
//! the flag names are read by [`crate::migration::flags::MigrationFlags`].

/// Full checklist submission.
pub const API_SUBMIT_CHECKLIST: &str = "submitChecklist";

/// Replacement of the anomaly item set.
pub const API_SAVE_ANOMALIES: &str = "saveAnomalies";

/// Find-or-create of a draft checklist.
pub const API_INIT_CHECKLIST: &str = "initChecklist";

/// Checklist read with items, evidences and signed URLs.
pub const API_LOAD_CHECKLIST: &str = "loadChecklist";

pub const FLAG_USE_DDD_CHECKLIST_SUBMIT: &str = "USE_DDD_CHECKLIST_SUBMIT";
pub const FLAG_USE_DDD_CHECKLIST_ANOMALIES: &str = "USE_DDD_CHECKLIST_ANOMALIES";
pub const FLAG_USE_DDD_CHECKLIST_INIT: &str = "USE_DDD_CHECKLIST_INIT";
pub const FLAG_USE_DDD_CHECKLIST_LOAD: &str = "USE_DDD_CHECKLIST_LOAD";

/// The only flag value that enables the DDD path. Anything else, including
/// `"TRUE"` or `"1"`, leaves the legacy path active.
pub const FLAG_ENABLED_VALUE: &str = "true";

/// Event type published to the timeline when a checklist is submitted.
pub const EVENT_CHECKLIST_SUBMITTED: &str = "checklist.submitted";
