//! Repository for the `vehicle_checklists` table.

use recon_core::checklist::context::ContextKind;
use chrono::{DateTime, Utc};
use recon_core::types::EntityId;
use sqlx::{Executor, PgPool, Postgres};

use crate::models::checklist::{ChecklistRow, CreateChecklist};

/// Column list for `vehicle_checklists` queries.
pub(crate) const COLUMNS: &str = "\
    id, vehicle_id, quote_id, inspection_id, partner_id, \
    status, created_at, updated_at";

/// Provides queries over checklist headers.
pub struct ChecklistRepo;

impl ChecklistRepo {
    /// Insert a checklist header.
    ///
    /// Fails with a unique violation on `uq_vehicle_checklists_*` when a
    /// checklist already exists for the same context and vehicle.
    pub async fn create(pool: &PgPool, input: &CreateChecklist) -> Result<ChecklistRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO vehicle_checklists \
                 (id, vehicle_id, quote_id, inspection_id, partner_id, status, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ChecklistRow>(&query)
            .bind(input.id)
            .bind(&input.vehicle_id)
            .bind(&input.quote_id)
            .bind(&input.inspection_id)
            .bind(&input.partner_id)
            .bind(&input.status)
            .bind(input.created_at)
            .bind(input.updated_at)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: EntityId) -> Result<Option<ChecklistRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM vehicle_checklists WHERE id = $1");
        sqlx::query_as::<_, ChecklistRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find the checklist for a context and vehicle.
    ///
    /// The column name comes from [`ContextKind::column`], never from input.
    pub async fn find_by_context(
        pool: &PgPool,
        kind: ContextKind,
        context_id: &str,
        vehicle_id: &str,
    ) -> Result<Option<ChecklistRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM vehicle_checklists \
             WHERE {column} = $1 AND vehicle_id = $2",
            column = kind.column()
        );
        sqlx::query_as::<_, ChecklistRow>(&query)
            .bind(context_id)
            .bind(vehicle_id)
            .fetch_optional(pool)
            .await
    }

    /// List every checklist of a vehicle, newest first.
    pub async fn list_by_vehicle(
        pool: &PgPool,
        vehicle_id: &str,
    ) -> Result<Vec<ChecklistRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM vehicle_checklists \
             WHERE vehicle_id = $1 ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, ChecklistRow>(&query)
            .bind(vehicle_id)
            .fetch_all(pool)
            .await
    }

    /// Load a checklist and hold a row lock on it until the surrounding
    /// transaction ends.
    pub async fn find_by_id_for_update<'e, E>(
        executor: E,
        id: EntityId,
    ) -> Result<Option<ChecklistRow>, sqlx::Error>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let query = format!("SELECT {COLUMNS} FROM vehicle_checklists WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, ChecklistRow>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Write the mutable header fields. Returns `true` if a row changed.
    pub async fn update_header<'e, E>(
        executor: E,
        id: EntityId,
        status: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            "UPDATE vehicle_checklists SET status = $2, updated_at = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(status)
        .bind(updated_at)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
