//! Checklist application service.
//!
//! Orchestrates the use cases (create, add item, add evidence, submit,
//! upload media) against the repository ports, and exposes the flat
//! legacy-shaped facades used while traffic migrates off the direct-SQL path.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::checklist::aggregate::{Checklist, ChecklistRecord, ChecklistStatus};
use crate::checklist::api::{
    anomaly_item_key, anomaly_photo_key, ensure_regular_key, ensure_submittable_evidence_key,
    ensure_submittable_item_key, is_anomaly_key, require_context, ChecklistApi, ChecklistDetails,
    ChecklistView, EvidenceView, InitChecklistRequest, InitChecklistResponse, ItemView,
    LoadChecklistRequest, SaveAnomaliesRequest, SaveAnomaliesResponse, SubmitChecklistRequest,
    SubmitChecklistResponse,
};
use crate::checklist::context::ContextId;
use crate::checklist::domain_service::{ChecklistDomainService, ChecklistFactory};
use crate::checklist::evidence::Evidence;
use crate::checklist::item::{ChecklistItem, ItemStatus};
use crate::checklist::ports::{
    ChecklistItemRepository, ChecklistRepository, ChecklistUnitOfWork, EvidenceRepository,
    StorageSigner, StorageUploader, TimelinePublisher, VehicleStatusWriter,
    VEHICLE_STATUS_NEEDS_ATTENTION,
};
use crate::checklist::value_objects::{EvidenceKey, ItemKey};
use crate::error::{CoreError, CoreResult};
use crate::types::EntityId;

/// Default lifetime of evidence read URLs.
pub const DEFAULT_SIGNED_URL_TTL: Duration = Duration::from_secs(60 * 60);

/// Everything the service talks to.
#[derive(Clone)]
pub struct ChecklistPorts {
    pub checklists: Arc<dyn ChecklistRepository>,
    pub items: Arc<dyn ChecklistItemRepository>,
    pub evidences: Arc<dyn EvidenceRepository>,
    /// Atomic header + children rewrite used by the flat facades.
    pub unit_of_work: Arc<dyn ChecklistUnitOfWork>,
    pub timeline: Arc<dyn TimelinePublisher>,
    pub vehicles: Arc<dyn VehicleStatusWriter>,
    pub signer: Arc<dyn StorageSigner>,
    pub uploader: Arc<dyn StorageUploader>,
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct CreateChecklistCommand {
    pub vehicle_id: String,
    pub context: Option<ContextId>,
    pub partner_id: String,
}

#[derive(Debug, Clone)]
pub struct AddChecklistItemCommand {
    pub checklist_id: EntityId,
    pub item_key: String,
    pub status: ItemStatus,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AddEvidenceCommand {
    pub checklist_id: EntityId,
    pub evidence_key: String,
    pub storage_path: String,
    pub media_type: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SubmitChecklistCommand {
    pub checklist_id: EntityId,
}

#[derive(Debug, Clone)]
pub struct UploadEvidenceCommand {
    pub checklist_id: EntityId,
    pub evidence_key: String,
    pub bytes: Vec<u8>,
    pub content_type: String,
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct ChecklistService {
    ports: ChecklistPorts,
    signed_url_ttl: Duration,
}

impl ChecklistService {
    pub fn new(ports: ChecklistPorts) -> Self {
        Self {
            ports,
            signed_url_ttl: DEFAULT_SIGNED_URL_TTL,
        }
    }

    pub fn with_signed_url_ttl(mut self, ttl: Duration) -> Self {
        self.signed_url_ttl = ttl;
        self
    }

    // -- use cases ----------------------------------------------------------

    pub async fn create_checklist(&self, cmd: CreateChecklistCommand) -> CoreResult<Checklist> {
        let checklist =
            ChecklistFactory::create_checklist(&cmd.vehicle_id, cmd.context, &cmd.partner_id)?;

        if self
            .ports
            .checklists
            .find_by_context(checklist.context(), checklist.vehicle_id())
            .await?
            .is_some()
        {
            return Err(CoreError::Conflict(format!(
                "checklist already exists for {} and vehicle {}",
                checklist.context(),
                checklist.vehicle_id()
            )));
        }

        self.ports.checklists.save(checklist.record()).await?;
        tracing::info!(
            checklist_id = %checklist.id(),
            vehicle_id = %checklist.vehicle_id(),
            context = %checklist.context(),
            "Checklist created",
        );
        Ok(checklist)
    }

    pub async fn add_checklist_item(&self, cmd: AddChecklistItemCommand) -> CoreResult<ChecklistItem> {
        let mut checklist = self.load_aggregate(cmd.checklist_id).await?;
        let key = ItemKey::create(&cmd.item_key)?;
        ensure_regular_key(key.value())?;
        ChecklistDomainService::can_add_item_to_checklist(&checklist, &key).into_result()?;

        let item = ChecklistFactory::create_item(
            checklist.id(),
            key.value(),
            cmd.status,
            cmd.notes.as_deref(),
        )?;
        checklist.add_item(item.clone())?;
        self.ports.items.save_many(std::slice::from_ref(&item)).await?;
        self.ports.checklists.update(checklist.record()).await?;

        tracing::info!(
            checklist_id = %checklist.id(),
            item_key = %item.item_key(),
            status = item.status().as_str(),
            "Checklist item added",
        );
        Ok(item)
    }

    pub async fn add_evidence(&self, cmd: AddEvidenceCommand) -> CoreResult<Evidence> {
        let mut checklist = self.load_aggregate(cmd.checklist_id).await?;
        let key = EvidenceKey::create(&cmd.evidence_key)?;
        ensure_regular_key(key.value())?;
        ChecklistDomainService::can_add_evidence_to_checklist(&checklist, &key).into_result()?;

        let evidence = ChecklistFactory::create_evidence(
            checklist.id(),
            key.value(),
            &cmd.storage_path,
            cmd.media_type.as_deref(),
            cmd.description.as_deref(),
        )?;
        checklist.add_evidence(evidence.clone())?;
        self.ports
            .evidences
            .save_many(std::slice::from_ref(&evidence))
            .await?;
        self.ports.checklists.update(checklist.record()).await?;

        tracing::info!(
            checklist_id = %checklist.id(),
            evidence_key = %evidence.evidence_key(),
            "Evidence added",
        );
        Ok(evidence)
    }

    pub async fn submit_checklist(&self, cmd: SubmitChecklistCommand) -> CoreResult<Checklist> {
        let mut checklist = self.load_aggregate(cmd.checklist_id).await?;
        // Re-submission is a state error, not a validation refusal.
        checklist.ensure_submittable()?;
        ChecklistDomainService::can_submit_checklist(&checklist).into_result()?;
        checklist.submit()?;

        self.ports.checklists.update(checklist.record()).await?;
        self.after_submit(&checklist).await;
        Ok(checklist)
    }

    /// Store evidence bytes under `checklists/{checklist_id}/{evidence_key}`
    /// and return the storage path. The checklist must still be a draft.
    pub async fn upload_evidence_media(&self, cmd: UploadEvidenceCommand) -> CoreResult<String> {
        let record = self.require_record(cmd.checklist_id).await?;
        if record.status != ChecklistStatus::Draft {
            return Err(CoreError::InvalidState(
                "cannot upload evidence for a submitted checklist".into(),
            ));
        }
        let key = EvidenceKey::create(&cmd.evidence_key)?;
        if cmd.bytes.is_empty() {
            return Err(CoreError::Validation("evidence file is empty".into()));
        }

        let path = format!("checklists/{}/{}", record.id, key);
        let size = cmd.bytes.len();
        let stored = self
            .ports
            .uploader
            .upload(&path, cmd.bytes, &cmd.content_type)
            .await?;

        tracing::info!(
            checklist_id = %record.id,
            path = %stored,
            size,
            "Evidence media uploaded",
        );
        Ok(stored)
    }

    // -- facades ------------------------------------------------------------

    pub async fn load_checklist_with_details(
        &self,
        request: LoadChecklistRequest,
    ) -> CoreResult<Option<ChecklistDetails>> {
        let context = require_context(&request.context)?;
        let Some(record) = self
            .ports
            .checklists
            .find_by_context(&context, request.vehicle_id.trim())
            .await?
        else {
            return Ok(None);
        };

        let checklist = self.hydrate(record).await?;
        let mut evidences = Vec::with_capacity(checklist.evidences().len());
        for evidence in checklist.evidences() {
            let signed_url = match self
                .ports
                .signer
                .create_signed_url(evidence.storage_path().value(), self.signed_url_ttl)
                .await
            {
                Ok(url) => Some(url),
                Err(e) => {
                    tracing::warn!(
                        checklist_id = %checklist.id(),
                        path = %evidence.storage_path(),
                        error = %e,
                        "Failed to sign evidence URL",
                    );
                    None
                }
            };
            evidences.push(EvidenceView::new(evidence, signed_url));
        }

        Ok(Some(ChecklistDetails {
            checklist: ChecklistView::from(checklist.record()),
            items: checklist.items().iter().map(ItemView::from).collect(),
            evidences,
            stats: ChecklistDomainService::calculate_checklist_stats(&checklist),
        }))
    }

    /// Find or create the checklist, replace its items and evidences with the
    /// request's set, and submit it.
    pub async fn submit_checklist_flat(
        &self,
        request: SubmitChecklistRequest,
    ) -> CoreResult<SubmitChecklistResponse> {
        let context = require_context(&request.context)?;
        let (record, _) = self
            .find_or_create(&request.vehicle_id, context, &request.partner_id)
            .await?;
        if record.status == ChecklistStatus::Submitted {
            return Err(CoreError::InvalidState(format!(
                "checklist {} has already been submitted",
                record.id
            )));
        }

        let mut checklist = Checklist::reconstruct(record, Vec::new(), Vec::new())?;
        for input in &request.items {
            ensure_submittable_item_key(&input.item_key)?;
            let status = ItemStatus::parse(&input.status)?;
            let item = ChecklistFactory::create_item(
                checklist.id(),
                &input.item_key,
                status,
                input.notes.as_deref(),
            )?;
            ChecklistDomainService::can_add_item_to_checklist(&checklist, item.item_key())
                .into_result()?;
            checklist.add_item(item)?;
        }
        for (key, input) in &request.evidences {
            ensure_submittable_evidence_key(key)?;
            let evidence = ChecklistFactory::create_evidence(
                checklist.id(),
                key,
                &input.storage_path,
                input.media_type.as_deref(),
                input.description.as_deref(),
            )?;
            checklist.add_evidence(evidence)?;
        }

        ChecklistDomainService::can_submit_checklist(&checklist).into_result()?;
        checklist.submit()?;

        self.ports.unit_of_work.replace_contents(&checklist).await?;
        self.after_submit(&checklist).await;

        Ok(SubmitChecklistResponse {
            checklist_id: checklist.id(),
            status: checklist.status(),
            items_saved: checklist.items().len(),
            evidences_saved: checklist.evidences().len(),
            needs_attention: !checklist.items_needing_attention().is_empty(),
        })
    }

    /// Replace the anomaly items and photos of a draft checklist. Regular
    /// items and evidences are kept.
    pub async fn save_anomalies(
        &self,
        request: SaveAnomaliesRequest,
    ) -> CoreResult<SaveAnomaliesResponse> {
        let context = require_context(&request.context)?;
        let (record, _) = self
            .find_or_create(&request.vehicle_id, context, &request.partner_id)
            .await?;
        let existing = self.hydrate(record).await?;
        if !existing.is_draft() {
            return Err(CoreError::InvalidState(
                "cannot save anomalies on a submitted checklist".into(),
            ));
        }

        let mut checklist = existing.emptied();
        for item in existing.items() {
            if !is_anomaly_key(item.item_key().value()) {
                checklist.add_item(item.clone())?;
            }
        }
        for evidence in existing.evidences() {
            if !is_anomaly_key(evidence.evidence_key().value()) {
                checklist.add_evidence(evidence.clone())?;
            }
        }

        let mut photos_saved = 0;
        for (index, anomaly) in request.anomalies.iter().enumerate() {
            let n = index + 1;
            if anomaly.description.trim().is_empty() {
                return Err(CoreError::Validation(format!(
                    "anomaly {n} needs a description"
                )));
            }
            let item = ChecklistFactory::create_item(
                checklist.id(),
                &anomaly_item_key(n),
                ItemStatus::NeedsRepair,
                Some(&anomaly.description),
            )?;
            checklist.add_item(item)?;

            for (photo_index, path) in anomaly.photos.iter().enumerate() {
                let evidence = ChecklistFactory::create_evidence(
                    checklist.id(),
                    &anomaly_photo_key(n, photo_index + 1),
                    path,
                    None,
                    None,
                )?;
                checklist.add_evidence(evidence)?;
                photos_saved += 1;
            }
        }

        self.ports.unit_of_work.replace_contents(&checklist).await?;
        tracing::info!(
            checklist_id = %checklist.id(),
            anomalies = request.anomalies.len(),
            photos = photos_saved,
            "Anomalies saved",
        );

        Ok(SaveAnomaliesResponse {
            checklist_id: checklist.id(),
            anomalies_saved: request.anomalies.len(),
            photos_saved,
        })
    }

    /// Find or create a draft checklist for the context and vehicle.
    pub async fn init_checklist(
        &self,
        request: InitChecklistRequest,
    ) -> CoreResult<InitChecklistResponse> {
        let context = require_context(&request.context)?;
        let (record, created) = self
            .find_or_create(&request.vehicle_id, context, &request.partner_id)
            .await?;
        Ok(InitChecklistResponse {
            checklist_id: record.id,
            status: record.status,
            created,
        })
    }

    // -- helpers ------------------------------------------------------------

    async fn require_record(&self, id: EntityId) -> CoreResult<ChecklistRecord> {
        self.ports
            .checklists
            .find_by_id(id)
            .await?
            .ok_or_else(|| CoreError::not_found("checklist", id))
    }

    async fn load_aggregate(&self, id: EntityId) -> CoreResult<Checklist> {
        let record = self.require_record(id).await?;
        self.hydrate(record).await
    }

    async fn hydrate(&self, record: ChecklistRecord) -> CoreResult<Checklist> {
        let items = self.ports.items.find_by_checklist_id(record.id).await?;
        let evidences = self.ports.evidences.find_by_checklist_id(record.id).await?;
        Checklist::reconstruct(record, items, evidences)
    }

    /// Returns the record and whether it was created by this call. A
    /// concurrent creator winning the insert race is resolved by re-reading.
    async fn find_or_create(
        &self,
        vehicle_id: &str,
        context: ContextId,
        partner_id: &str,
    ) -> CoreResult<(ChecklistRecord, bool)> {
        let vehicle_id = vehicle_id.trim();
        if let Some(existing) = self
            .ports
            .checklists
            .find_by_context(&context, vehicle_id)
            .await?
        {
            return Ok((existing, false));
        }

        let checklist = ChecklistFactory::create_checklist(vehicle_id, Some(context), partner_id)?;
        match self.ports.checklists.save(checklist.record()).await {
            Ok(saved) => {
                tracing::info!(
                    checklist_id = %saved.id,
                    vehicle_id = %saved.vehicle_id,
                    context = %saved.context,
                    "Checklist created",
                );
                Ok((saved, true))
            }
            Err(CoreError::Conflict(_)) => {
                let existing = self
                    .ports
                    .checklists
                    .find_by_context(checklist.context(), vehicle_id)
                    .await?
                    .ok_or_else(|| {
                        CoreError::Internal(format!(
                            "checklist for {} vanished after a conflicting insert",
                            checklist.context()
                        ))
                    })?;
                Ok((existing, false))
            }
            Err(e) => Err(e),
        }
    }

    /// Timeline publication and vehicle status update. The submitted status
    /// is already persisted, so failures here are logged and swallowed.
    async fn after_submit(&self, checklist: &Checklist) {
        if let Err(e) = self
            .ports
            .timeline
            .publish_checklist_submitted(checklist.id(), checklist.context(), checklist.vehicle_id())
            .await
        {
            tracing::warn!(
                checklist_id = %checklist.id(),
                error = %e,
                "Failed to publish checklist submission to timeline",
            );
        }

        let attention = checklist.items_needing_attention().len();
        if attention > 0 {
            if let Err(e) = self
                .ports
                .vehicles
                .update_status(checklist.vehicle_id(), VEHICLE_STATUS_NEEDS_ATTENTION)
                .await
            {
                tracing::warn!(
                    vehicle_id = %checklist.vehicle_id(),
                    error = %e,
                    "Failed to mark vehicle as needing attention",
                );
            }
        }

        tracing::info!(
            checklist_id = %checklist.id(),
            vehicle_id = %checklist.vehicle_id(),
            items = checklist.items().len(),
            items_needing_attention = attention,
            "Checklist submitted",
        );
    }
}

#[async_trait]
impl ChecklistApi for ChecklistService {
    async fn submit_checklist(
        &self,
        request: SubmitChecklistRequest,
    ) -> CoreResult<SubmitChecklistResponse> {
        self.submit_checklist_flat(request).await
    }

    async fn save_anomalies(
        &self,
        request: SaveAnomaliesRequest,
    ) -> CoreResult<SaveAnomaliesResponse> {
        ChecklistService::save_anomalies(self, request).await
    }

    async fn init_checklist(
        &self,
        request: InitChecklistRequest,
    ) -> CoreResult<InitChecklistResponse> {
        ChecklistService::init_checklist(self, request).await
    }

    async fn load_checklist(
        &self,
        request: LoadChecklistRequest,
    ) -> CoreResult<Option<ChecklistDetails>> {
        self.load_checklist_with_details(request).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
