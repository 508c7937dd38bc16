//! The direct-SQL checklist path.
//!
//! This is the pre-aggregate implementation that the migration router falls
//! back to. It writes rows straight into the tables inside one transaction
//! per call. The checklist row is locked with `FOR UPDATE` before any write,
//! so the status check and the rewrite cannot interleave with another
//! request. It refuses the same cases the aggregate path refuses:
//!
//! - a submitted checklist is never rewritten (`InvalidState`);
//! - a submission needs at least one item (`Validation`);
//! - `anomaly:` keys are reserved for generated anomaly rows (`Validation`).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use recon_core::checklist::aggregate::{
    ChecklistStats, ChecklistStatus, CHECKLIST_STATUS_DRAFT, CHECKLIST_STATUS_SUBMITTED,
};
use recon_core::checklist::api::{
    anomaly_item_key, anomaly_photo_key, ensure_submittable_evidence_key,
    ensure_submittable_item_key, require_context, ChecklistApi, ChecklistDetails, ChecklistView,
    EvidenceView, InitChecklistRequest, InitChecklistResponse, ItemView, LoadChecklistRequest,
    SaveAnomaliesRequest, SaveAnomaliesResponse, SubmitChecklistRequest, SubmitChecklistResponse,
    ANOMALY_KEY_PREFIX,
};
use recon_core::checklist::context::ContextId;
use recon_core::checklist::item::{ItemStatus, ITEM_STATUS_NEEDS_REPAIR};
use recon_core::checklist::ports::{StorageSigner, VEHICLE_STATUS_NEEDS_ATTENTION};
use recon_core::error::{CoreError, CoreResult};
use recon_core::metric_names::EVENT_CHECKLIST_SUBMITTED;
use recon_core::types::{new_entity_id, EntityId};
use serde_json::json;
use sqlx::PgConnection;

use crate::models::checklist::ChecklistRow;
use crate::repositories::checklist_repo::COLUMNS;
use crate::repositories::{ChecklistItemRepo, ChecklistRepo, EvidenceRepo};
use crate::{map_db_error, DbPool};

/// Default lifetime of evidence read URLs.
const SIGNED_URL_TTL: Duration = Duration::from_secs(60 * 60);

pub struct LegacyChecklistApi {
    pool: DbPool,
    signer: Arc<dyn StorageSigner>,
    signed_url_ttl: Duration,
}

impl LegacyChecklistApi {
    pub fn new(pool: DbPool, signer: Arc<dyn StorageSigner>) -> Self {
        Self {
            pool,
            signer,
            signed_url_ttl: SIGNED_URL_TTL,
        }
    }

    pub fn with_signed_url_ttl(mut self, ttl: Duration) -> Self {
        self.signed_url_ttl = ttl;
        self
    }
}

// ---------------------------------------------------------------------------
// SQL helpers
// ---------------------------------------------------------------------------

async fn find_checklist(
    conn: &mut PgConnection,
    context: &ContextId,
    vehicle_id: &str,
) -> Result<Option<ChecklistRow>, sqlx::Error> {
    let query = format!(
        "SELECT {COLUMNS} FROM vehicle_checklists WHERE {column} = $1 AND vehicle_id = $2",
        column = context.kind().column()
    );
    sqlx::query_as::<_, ChecklistRow>(&query)
        .bind(context.id())
        .bind(vehicle_id)
        .fetch_optional(conn)
        .await
}

/// Insert a draft checklist unless one exists; returns the row and whether
/// it was inserted.
async fn find_or_insert_checklist(
    conn: &mut PgConnection,
    context: &ContextId,
    vehicle_id: &str,
    partner_id: &str,
) -> CoreResult<(ChecklistRow, bool)> {
    let column = context.kind().column();
    let query = format!(
        "INSERT INTO vehicle_checklists (id, vehicle_id, {column}, partner_id, status) \
         VALUES ($1, $2, $3, $4, $5) \
         ON CONFLICT ({column}, vehicle_id) WHERE {column} IS NOT NULL DO NOTHING \
         RETURNING {COLUMNS}"
    );
    let inserted = sqlx::query_as::<_, ChecklistRow>(&query)
        .bind(new_entity_id())
        .bind(vehicle_id)
        .bind(context.id())
        .bind(partner_id)
        .bind(CHECKLIST_STATUS_DRAFT)
        .fetch_optional(&mut *conn)
        .await
        .map_err(map_db_error)?;
    if let Some(row) = inserted {
        return Ok((row, true));
    }

    let existing = find_checklist(conn, context, vehicle_id)
        .await
        .map_err(map_db_error)?
        .ok_or_else(|| {
            CoreError::Internal(format!("checklist for {context} not found after conflict"))
        })?;
    Ok((existing, false))
}

/// Find or create the checklist, then lock its row for the rest of the
/// transaction and refuse to touch it once submitted.
async fn lock_draft_checklist(
    conn: &mut PgConnection,
    context: &ContextId,
    vehicle_id: &str,
    partner_id: &str,
    action: &str,
) -> CoreResult<ChecklistRow> {
    let (row, _) = find_or_insert_checklist(conn, context, vehicle_id, partner_id).await?;
    let row = ChecklistRepo::find_by_id_for_update(&mut *conn, row.id)
        .await
        .map_err(map_db_error)?
        .ok_or_else(|| CoreError::not_found("checklist", row.id))?;
    if row.status == CHECKLIST_STATUS_SUBMITTED {
        return Err(CoreError::InvalidState(format!(
            "cannot {action} a submitted checklist"
        )));
    }
    Ok(row)
}

async fn insert_item(
    conn: &mut PgConnection,
    checklist_id: EntityId,
    item_key: &str,
    status: &str,
    notes: Option<&str>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO checklist_items (id, checklist_id, item_key, status, notes) \
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(new_entity_id())
    .bind(checklist_id)
    .bind(item_key)
    .bind(status)
    .bind(notes)
    .execute(conn)
    .await?;
    Ok(())
}

async fn insert_evidence(
    conn: &mut PgConnection,
    checklist_id: EntityId,
    evidence_key: &str,
    storage_path: &str,
    media_type: Option<&str>,
    description: Option<&str>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO checklist_evidences \
             (id, checklist_id, evidence_key, storage_path, media_type, description) \
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(new_entity_id())
    .bind(checklist_id)
    .bind(evidence_key)
    .bind(storage_path)
    .bind(media_type)
    .bind(description)
    .execute(conn)
    .await?;
    Ok(())
}

fn non_blank(value: &str, field: &str) -> CoreResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

fn blank_to_none(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

// ---------------------------------------------------------------------------
// ChecklistApi
// ---------------------------------------------------------------------------

#[async_trait]
impl ChecklistApi for LegacyChecklistApi {
    async fn submit_checklist(
        &self,
        request: SubmitChecklistRequest,
    ) -> CoreResult<SubmitChecklistResponse> {
        let context = require_context(&request.context)?;
        let vehicle_id = non_blank(&request.vehicle_id, "vehicle_id")?;
        let partner_id = non_blank(&request.partner_id, "partner_id")?;
        if request.items.is_empty() {
            return Err(CoreError::Validation(
                "cannot submit a checklist without items".into(),
            ));
        }
        let statuses = request
            .items
            .iter()
            .map(|item| {
                ensure_submittable_item_key(&item.item_key)?;
                ItemStatus::parse(&item.status)
            })
            .collect::<CoreResult<Vec<_>>>()?;
        for key in request.evidences.keys() {
            ensure_submittable_evidence_key(key)?;
        }
        let needs_attention = statuses.iter().any(|s| s.needs_attention());

        let mut tx = self.pool.begin().await.map_err(map_db_error)?;
        let row = lock_draft_checklist(&mut tx, &context, &vehicle_id, &partner_id, "submit").await?;

        sqlx::query("DELETE FROM checklist_items WHERE checklist_id = $1")
            .bind(row.id)
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;
        sqlx::query("DELETE FROM checklist_evidences WHERE checklist_id = $1")
            .bind(row.id)
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;

        for (item, status) in request.items.iter().zip(&statuses) {
            insert_item(
                &mut tx,
                row.id,
                item.item_key.trim(),
                status.as_str(),
                blank_to_none(item.notes.as_deref()),
            )
            .await
            .map_err(map_db_error)?;
        }
        for (key, evidence) in &request.evidences {
            insert_evidence(
                &mut tx,
                row.id,
                key.trim(),
                evidence.storage_path.trim(),
                blank_to_none(evidence.media_type.as_deref()),
                blank_to_none(evidence.description.as_deref()),
            )
            .await
            .map_err(map_db_error)?;
        }

        sqlx::query("UPDATE vehicle_checklists SET status = $2, updated_at = now() WHERE id = $1")
            .bind(row.id)
            .bind(CHECKLIST_STATUS_SUBMITTED)
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;

        sqlx::query(
            "INSERT INTO vehicle_timeline (vehicle_id, event_type, payload) VALUES ($1, $2, $3)",
        )
        .bind(&vehicle_id)
        .bind(EVENT_CHECKLIST_SUBMITTED)
        .bind(json!({ "checklist_id": row.id, "context": context }))
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        if needs_attention {
            sqlx::query("UPDATE vehicles SET status = $2, updated_at = now() WHERE id = $1")
                .bind(&vehicle_id)
                .bind(VEHICLE_STATUS_NEEDS_ATTENTION)
                .execute(&mut *tx)
                .await
                .map_err(map_db_error)?;
        }

        tx.commit().await.map_err(map_db_error)?;
        tracing::info!(
            checklist_id = %row.id,
            vehicle_id = %vehicle_id,
            items = request.items.len(),
            "Legacy checklist submitted",
        );

        Ok(SubmitChecklistResponse {
            checklist_id: row.id,
            status: ChecklistStatus::Submitted,
            items_saved: request.items.len(),
            evidences_saved: request.evidences.len(),
            needs_attention,
        })
    }

    async fn save_anomalies(
        &self,
        request: SaveAnomaliesRequest,
    ) -> CoreResult<SaveAnomaliesResponse> {
        let context = require_context(&request.context)?;
        let vehicle_id = non_blank(&request.vehicle_id, "vehicle_id")?;
        let partner_id = non_blank(&request.partner_id, "partner_id")?;
        for (index, anomaly) in request.anomalies.iter().enumerate() {
            if anomaly.description.trim().is_empty() {
                return Err(CoreError::Validation(format!(
                    "anomaly {} needs a description",
                    index + 1
                )));
            }
        }

        let mut tx = self.pool.begin().await.map_err(map_db_error)?;
        let row = lock_draft_checklist(
            &mut tx,
            &context,
            &vehicle_id,
            &partner_id,
            "save anomalies on",
        )
        .await?;

        let pattern = format!("{ANOMALY_KEY_PREFIX}%");
        sqlx::query("DELETE FROM checklist_items WHERE checklist_id = $1 AND item_key LIKE $2")
            .bind(row.id)
            .bind(&pattern)
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;
        sqlx::query(
            "DELETE FROM checklist_evidences WHERE checklist_id = $1 AND evidence_key LIKE $2",
        )
        .bind(row.id)
        .bind(&pattern)
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        let mut photos_saved = 0;
        for (index, anomaly) in request.anomalies.iter().enumerate() {
            let n = index + 1;
            insert_item(
                &mut tx,
                row.id,
                &anomaly_item_key(n),
                ITEM_STATUS_NEEDS_REPAIR,
                Some(anomaly.description.trim()),
            )
            .await
            .map_err(map_db_error)?;
            for (photo_index, path) in anomaly.photos.iter().enumerate() {
                insert_evidence(
                    &mut tx,
                    row.id,
                    &anomaly_photo_key(n, photo_index + 1),
                    path.trim(),
                    None,
                    None,
                )
                .await
                .map_err(map_db_error)?;
                photos_saved += 1;
            }
        }

        sqlx::query("UPDATE vehicle_checklists SET updated_at = now() WHERE id = $1")
            .bind(row.id)
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;

        tx.commit().await.map_err(map_db_error)?;
        Ok(SaveAnomaliesResponse {
            checklist_id: row.id,
            anomalies_saved: request.anomalies.len(),
            photos_saved,
        })
    }

    async fn init_checklist(
        &self,
        request: InitChecklistRequest,
    ) -> CoreResult<InitChecklistResponse> {
        let context = require_context(&request.context)?;
        let vehicle_id = non_blank(&request.vehicle_id, "vehicle_id")?;
        let partner_id = non_blank(&request.partner_id, "partner_id")?;

        let mut conn = self.pool.acquire().await.map_err(map_db_error)?;
        let (row, created) =
            find_or_insert_checklist(&mut conn, &context, &vehicle_id, &partner_id).await?;
        let record = row.into_record()?;
        Ok(InitChecklistResponse {
            checklist_id: record.id,
            status: record.status,
            created,
        })
    }

    async fn load_checklist(
        &self,
        request: LoadChecklistRequest,
    ) -> CoreResult<Option<ChecklistDetails>> {
        let context = require_context(&request.context)?;
        let mut conn = self.pool.acquire().await.map_err(map_db_error)?;
        let Some(row) = find_checklist(&mut conn, &context, request.vehicle_id.trim())
            .await
            .map_err(map_db_error)?
        else {
            return Ok(None);
        };
        drop(conn);

        let record = row.into_record()?;
        let items = ChecklistItemRepo::list_by_checklist(&self.pool, record.id)
            .await
            .map_err(map_db_error)?;
        let evidences = EvidenceRepo::list_by_checklist(&self.pool, record.id)
            .await
            .map_err(map_db_error)?;

        let stats = ChecklistStats::compute(
            items
                .iter()
                .filter_map(|item| ItemStatus::parse(&item.status).ok()),
            evidences.len(),
        );

        let mut evidence_views = Vec::with_capacity(evidences.len());
        for evidence in evidences {
            let signed_url = self
                .signer
                .create_signed_url(&evidence.storage_path, self.signed_url_ttl)
                .await
                .map_err(|e| {
                    tracing::warn!(path = %evidence.storage_path, error = %e, "Failed to sign evidence URL");
                })
                .ok();
            evidence_views.push(EvidenceView {
                id: evidence.id,
                evidence_key: evidence.evidence_key,
                storage_path: evidence.storage_path,
                media_type: evidence.media_type,
                description: evidence.description,
                signed_url,
                created_at: evidence.created_at,
            });
        }

        Ok(Some(ChecklistDetails {
            checklist: ChecklistView::from(&record),
            items: items
                .into_iter()
                .map(|item| ItemView {
                    id: item.id,
                    item_key: item.item_key,
                    status: item.status,
                    notes: item.notes,
                    created_at: item.created_at,
                })
                .collect(),
            evidences: evidence_views,
            stats,
        }))
    }
}
