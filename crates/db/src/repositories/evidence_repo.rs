//! Repository for the `checklist_evidences` table.

use recon_core::types::EntityId;
use sqlx::{Executor, PgConnection, PgPool, Postgres};

use crate::models::checklist::{CreateEvidence, EvidenceRow};

/// Column list for `checklist_evidences` queries.
pub(crate) const COLUMNS: &str = "\
    id, checklist_id, evidence_key, storage_path, media_type, description, created_at";

pub struct EvidenceRepo;

impl EvidenceRepo {
    pub async fn list_by_checklist(
        pool: &PgPool,
        checklist_id: EntityId,
    ) -> Result<Vec<EvidenceRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM checklist_evidences \
             WHERE checklist_id = $1 ORDER BY created_at ASC, id ASC"
        );
        sqlx::query_as::<_, EvidenceRow>(&query)
            .bind(checklist_id)
            .fetch_all(pool)
            .await
    }

    /// Insert a batch of evidences within a transaction.
    pub async fn create_many(
        pool: &PgPool,
        evidences: &[CreateEvidence],
    ) -> Result<u64, sqlx::Error> {
        if evidences.is_empty() {
            return Ok(0);
        }
        let mut tx = pool.begin().await?;
        let inserted = Self::insert_many(&mut tx, evidences).await?;
        tx.commit().await?;
        Ok(inserted)
    }

    /// Insert a batch on a connection the caller controls, usually an open
    /// transaction.
    pub async fn insert_many(
        conn: &mut PgConnection,
        evidences: &[CreateEvidence],
    ) -> Result<u64, sqlx::Error> {
        let mut inserted = 0;
        for evidence in evidences {
            let result = sqlx::query(
                "INSERT INTO checklist_evidences \
                     (id, checklist_id, evidence_key, storage_path, media_type, description, created_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(evidence.id)
            .bind(evidence.checklist_id)
            .bind(&evidence.evidence_key)
            .bind(&evidence.storage_path)
            .bind(&evidence.media_type)
            .bind(&evidence.description)
            .bind(evidence.created_at)
            .execute(&mut *conn)
            .await?;
            inserted += result.rows_affected();
        }
        Ok(inserted)
    }

    pub async fn delete_by_checklist<'e, E>(
        executor: E,
        checklist_id: EntityId,
    ) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM checklist_evidences WHERE checklist_id = $1")
            .bind(checklist_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}
