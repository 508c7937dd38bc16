//! Repository for the `vehicle_timeline` table.

use sqlx::PgPool;

use crate::models::timeline::{CreateTimelineEntry, TimelineEntry};

pub(crate) const COLUMNS: &str = "id, vehicle_id, event_type, payload, created_at";

pub struct TimelineRepo;

impl TimelineRepo {
    pub async fn insert(
        pool: &PgPool,
        input: &CreateTimelineEntry,
    ) -> Result<TimelineEntry, sqlx::Error> {
        let query = format!(
            "INSERT INTO vehicle_timeline (vehicle_id, event_type, payload) \
             VALUES ($1, $2, $3) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, TimelineEntry>(&query)
            .bind(&input.vehicle_id)
            .bind(&input.event_type)
            .bind(&input.payload)
            .fetch_one(pool)
            .await
    }

    /// Timeline of a vehicle, oldest first.
    pub async fn list_by_vehicle(
        pool: &PgPool,
        vehicle_id: &str,
    ) -> Result<Vec<TimelineEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM vehicle_timeline \
             WHERE vehicle_id = $1 ORDER BY created_at ASC, id ASC"
        );
        sqlx::query_as::<_, TimelineEntry>(&query)
            .bind(vehicle_id)
            .fetch_all(pool)
            .await
    }
}
