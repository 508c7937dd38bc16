//! Vehicle row model.

use recon_core::types::Timestamp;
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `vehicles` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Vehicle {
    pub id: String,
    pub status: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
