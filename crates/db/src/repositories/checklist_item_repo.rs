//! Repository for the `checklist_items` table.

use recon_core::types::EntityId;
use sqlx::{Executor, PgConnection, PgPool, Postgres};

use crate::models::checklist::{ChecklistItemRow, CreateChecklistItem};

/// Column list for `checklist_items` queries.
pub(crate) const COLUMNS: &str = "id, checklist_id, item_key, status, notes, created_at";

pub struct ChecklistItemRepo;

impl ChecklistItemRepo {
    /// Items of a checklist in insertion order.
    pub async fn list_by_checklist(
        pool: &PgPool,
        checklist_id: EntityId,
    ) -> Result<Vec<ChecklistItemRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM checklist_items \
             WHERE checklist_id = $1 ORDER BY created_at ASC, id ASC"
        );
        sqlx::query_as::<_, ChecklistItemRow>(&query)
            .bind(checklist_id)
            .fetch_all(pool)
            .await
    }

    /// Insert a batch of items within a transaction.
    ///
    /// Returns the number of rows inserted.
    pub async fn create_many(
        pool: &PgPool,
        items: &[CreateChecklistItem],
    ) -> Result<u64, sqlx::Error> {
        if items.is_empty() {
            return Ok(0);
        }
        let mut tx = pool.begin().await?;
        let inserted = Self::insert_many(&mut tx, items).await?;
        tx.commit().await?;
        Ok(inserted)
    }

    /// Insert a batch on a connection the caller controls, usually an open
    /// transaction.
    pub async fn insert_many(
        conn: &mut PgConnection,
        items: &[CreateChecklistItem],
    ) -> Result<u64, sqlx::Error> {
        let mut inserted = 0;
        for item in items {
            let result = sqlx::query(
                "INSERT INTO checklist_items \
                     (id, checklist_id, item_key, status, notes, created_at) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(item.id)
            .bind(item.checklist_id)
            .bind(&item.item_key)
            .bind(&item.status)
            .bind(&item.notes)
            .bind(item.created_at)
            .execute(&mut *conn)
            .await?;
            inserted += result.rows_affected();
        }
        Ok(inserted)
    }

    /// Delete every item of a checklist. Returns the number of rows deleted.
    pub async fn delete_by_checklist<'e, E>(
        executor: E,
        checklist_id: EntityId,
    ) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM checklist_items WHERE checklist_id = $1")
            .bind(checklist_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}
