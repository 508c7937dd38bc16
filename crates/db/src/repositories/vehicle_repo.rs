//! Repository for the `vehicles` table.

use sqlx::PgPool;

use crate::models::vehicle::Vehicle;

const COLUMNS: &str = "id, status, created_at, updated_at";

pub struct VehicleRepo;

impl VehicleRepo {
    /// Insert a vehicle, leaving an existing row untouched.
    pub async fn create(pool: &PgPool, id: &str, status: &str) -> Result<Vehicle, sqlx::Error> {
        let query = format!(
            "INSERT INTO vehicles (id, status) VALUES ($1, $2) \
             ON CONFLICT (id) DO UPDATE SET id = EXCLUDED.id \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Vehicle>(&query)
            .bind(id)
            .bind(status)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Vehicle>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM vehicles WHERE id = $1");
        sqlx::query_as::<_, Vehicle>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Set a vehicle's status. Returns `false` when the vehicle does not exist.
    pub async fn update_status(pool: &PgPool, id: &str, status: &str) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE vehicles SET status = $2, updated_at = now() WHERE id = $1")
                .bind(id)
                .bind(status)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }
}
