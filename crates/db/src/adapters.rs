//! Postgres implementations of the checklist ports.

use async_trait::async_trait;
use recon_core::checklist::aggregate::{Checklist, ChecklistRecord};
use recon_core::checklist::context::ContextId;
use recon_core::checklist::evidence::Evidence;
use recon_core::checklist::item::ChecklistItem;
use recon_core::checklist::ports::{
    ChecklistItemRepository, ChecklistRepository, ChecklistUnitOfWork, EvidenceRepository,
    VehicleStatusWriter,
};
use recon_core::error::{CoreError, CoreResult};
use recon_core::types::EntityId;

use crate::models::checklist::{CreateChecklist, CreateChecklistItem, CreateEvidence};
use crate::repositories::{ChecklistItemRepo, ChecklistRepo, EvidenceRepo, VehicleRepo};
use crate::{map_db_error, DbPool};

// ---------------------------------------------------------------------------
// Checklists
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct PgChecklistRepository {
    pool: DbPool,
}

impl PgChecklistRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChecklistRepository for PgChecklistRepository {
    async fn find_by_id(&self, id: EntityId) -> CoreResult<Option<ChecklistRecord>> {
        ChecklistRepo::find_by_id(&self.pool, id)
            .await
            .map_err(map_db_error)?
            .map(|row| row.into_record())
            .transpose()
    }

    async fn find_by_context(
        &self,
        context: &ContextId,
        vehicle_id: &str,
    ) -> CoreResult<Option<ChecklistRecord>> {
        ChecklistRepo::find_by_context(&self.pool, context.kind(), context.id(), vehicle_id)
            .await
            .map_err(map_db_error)?
            .map(|row| row.into_record())
            .transpose()
    }

    async fn save(&self, record: &ChecklistRecord) -> CoreResult<ChecklistRecord> {
        ChecklistRepo::create(&self.pool, &CreateChecklist::from(record))
            .await
            .map_err(map_db_error)?
            .into_record()
    }

    async fn update(&self, record: &ChecklistRecord) -> CoreResult<()> {
        let updated = ChecklistRepo::update_header(
            &self.pool,
            record.id,
            record.status.as_str(),
            record.updated_at,
        )
        .await
        .map_err(map_db_error)?;
        if !updated {
            return Err(CoreError::not_found("checklist", record.id));
        }
        Ok(())
    }
}

/// Rewrites a checklist header and its children in one transaction.
#[derive(Clone)]
pub struct PgChecklistUnitOfWork {
    pool: DbPool,
}

impl PgChecklistUnitOfWork {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChecklistUnitOfWork for PgChecklistUnitOfWork {
    async fn replace_contents(&self, checklist: &Checklist) -> CoreResult<()> {
        let id = checklist.id();
        let items: Vec<CreateChecklistItem> =
            checklist.items().iter().map(CreateChecklistItem::from).collect();
        let evidences: Vec<CreateEvidence> =
            checklist.evidences().iter().map(CreateEvidence::from).collect();

        // Dropping the transaction on any early return rolls it back.
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;
        let updated = ChecklistRepo::update_header(
            &mut *tx,
            id,
            checklist.status().as_str(),
            checklist.updated_at(),
        )
        .await
        .map_err(map_db_error)?;
        if !updated {
            return Err(CoreError::not_found("checklist", id));
        }
        ChecklistItemRepo::delete_by_checklist(&mut *tx, id)
            .await
            .map_err(map_db_error)?;
        ChecklistItemRepo::insert_many(&mut tx, &items)
            .await
            .map_err(map_db_error)?;
        EvidenceRepo::delete_by_checklist(&mut *tx, id)
            .await
            .map_err(map_db_error)?;
        EvidenceRepo::insert_many(&mut tx, &evidences)
            .await
            .map_err(map_db_error)?;
        tx.commit().await.map_err(map_db_error)?;

        tracing::debug!(
            checklist_id = %id,
            items = items.len(),
            evidences = evidences.len(),
            "Checklist contents replaced"
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Items and evidences
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct PgChecklistItemRepository {
    pool: DbPool,
}

impl PgChecklistItemRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChecklistItemRepository for PgChecklistItemRepository {
    async fn find_by_checklist_id(&self, checklist_id: EntityId) -> CoreResult<Vec<ChecklistItem>> {
        ChecklistItemRepo::list_by_checklist(&self.pool, checklist_id)
            .await
            .map_err(map_db_error)?
            .into_iter()
            .map(|row| row.into_item())
            .collect()
    }

    async fn save_many(&self, items: &[ChecklistItem]) -> CoreResult<()> {
        let rows: Vec<CreateChecklistItem> = items.iter().map(CreateChecklistItem::from).collect();
        ChecklistItemRepo::create_many(&self.pool, &rows)
            .await
            .map_err(map_db_error)?;
        Ok(())
    }

    async fn delete_by_checklist_id(&self, checklist_id: EntityId) -> CoreResult<u64> {
        ChecklistItemRepo::delete_by_checklist(&self.pool, checklist_id)
            .await
            .map_err(map_db_error)
    }
}

#[derive(Clone)]
pub struct PgEvidenceRepository {
    pool: DbPool,
}

impl PgEvidenceRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EvidenceRepository for PgEvidenceRepository {
    async fn find_by_checklist_id(&self, checklist_id: EntityId) -> CoreResult<Vec<Evidence>> {
        EvidenceRepo::list_by_checklist(&self.pool, checklist_id)
            .await
            .map_err(map_db_error)?
            .into_iter()
            .map(|row| row.into_evidence())
            .collect()
    }

    async fn save_many(&self, evidences: &[Evidence]) -> CoreResult<()> {
        let rows: Vec<CreateEvidence> = evidences.iter().map(CreateEvidence::from).collect();
        EvidenceRepo::create_many(&self.pool, &rows)
            .await
            .map_err(map_db_error)?;
        Ok(())
    }

    async fn delete_by_checklist_id(&self, checklist_id: EntityId) -> CoreResult<u64> {
        EvidenceRepo::delete_by_checklist(&self.pool, checklist_id)
            .await
            .map_err(map_db_error)
    }
}

// ---------------------------------------------------------------------------
// Vehicles
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct PgVehicleStatusWriter {
    pool: DbPool,
}

impl PgVehicleStatusWriter {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VehicleStatusWriter for PgVehicleStatusWriter {
    async fn update_status(&self, vehicle_id: &str, status: &str) -> CoreResult<()> {
        let updated = VehicleRepo::update_status(&self.pool, vehicle_id, status)
            .await
            .map_err(map_db_error)?;
        if !updated {
            return Err(CoreError::not_found("vehicle", vehicle_id));
        }
        Ok(())
    }
}
