//! Vehicle timeline row model and insert DTO.

use recon_core::types::Timestamp;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `vehicle_timeline` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TimelineEntry {
    pub id: i64,
    pub vehicle_id: String,
    /// Dot-separated event name, e.g. `checklist.submitted`.
    pub event_type: String,
    pub payload: serde_json::Value,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTimelineEntry {
    pub vehicle_id: String,
    pub event_type: String,
    pub payload: serde_json::Value,
}
