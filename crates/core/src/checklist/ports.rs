//! Ports consumed by the checklist application service.
//!
//! Implemented by infrastructure adapters (`recon-db`, `recon-events`,
//! `recon-storage`) and by the in-memory adapters in
//! [`crate::checklist::memory`].

use std::time::Duration;

use async_trait::async_trait;

use crate::checklist::aggregate::{Checklist, ChecklistRecord};
use crate::checklist::context::ContextId;
use crate::checklist::evidence::Evidence;
use crate::checklist::item::ChecklistItem;
use crate::error::CoreResult;
use crate::types::EntityId;

/// Vehicle status written when a submitted checklist has items needing attention.
pub const VEHICLE_STATUS_NEEDS_ATTENTION: &str = "needs_attention";

#[async_trait]
pub trait ChecklistRepository: Send + Sync {
    async fn find_by_id(&self, id: EntityId) -> CoreResult<Option<ChecklistRecord>>;

    async fn find_by_context(
        &self,
        context: &ContextId,
        vehicle_id: &str,
    ) -> CoreResult<Option<ChecklistRecord>>;

    /// Persist a new checklist header.
    ///
    /// Fails with `CoreError::Conflict` when a checklist already exists for
    /// the same context and vehicle.
    async fn save(&self, record: &ChecklistRecord) -> CoreResult<ChecklistRecord>;

    /// Persist the mutable header fields (`status`, `updated_at`).
    ///
    /// Fails with `CoreError::NotFound` when the checklist does not exist.
    async fn update(&self, record: &ChecklistRecord) -> CoreResult<()>;
}

/// Item persistence. `save_many` appends; callers replacing a set delete first.
#[async_trait]
pub trait ChecklistItemRepository: Send + Sync {
    async fn find_by_checklist_id(&self, checklist_id: EntityId) -> CoreResult<Vec<ChecklistItem>>;

    async fn save_many(&self, items: &[ChecklistItem]) -> CoreResult<()>;

    async fn delete_by_checklist_id(&self, checklist_id: EntityId) -> CoreResult<u64>;
}

#[async_trait]
pub trait EvidenceRepository: Send + Sync {
    async fn find_by_checklist_id(&self, checklist_id: EntityId) -> CoreResult<Vec<Evidence>>;

    async fn save_many(&self, evidences: &[Evidence]) -> CoreResult<()>;

    async fn delete_by_checklist_id(&self, checklist_id: EntityId) -> CoreResult<u64>;
}

/// Atomic write of a whole aggregate: its header plus the complete item and
/// evidence sets. Either everything is stored or nothing changes.
#[async_trait]
pub trait ChecklistUnitOfWork: Send + Sync {
    async fn replace_contents(&self, checklist: &Checklist) -> CoreResult<()>;
}

/// External event timeline sink.
#[async_trait]
pub trait TimelinePublisher: Send + Sync {
    async fn publish_checklist_submitted(
        &self,
        checklist_id: EntityId,
        context: &ContextId,
        vehicle_id: &str,
    ) -> CoreResult<()>;
}

/// External vehicle record mutator.
#[async_trait]
pub trait VehicleStatusWriter: Send + Sync {
    async fn update_status(&self, vehicle_id: &str, status: &str) -> CoreResult<()>;
}

/// Produces time-limited URLs for reading stored evidence.
#[async_trait]
pub trait StorageSigner: Send + Sync {
    async fn create_signed_url(&self, path: &str, expires_in: Duration) -> CoreResult<String>;
}

/// Writes evidence bytes to object storage and returns the stored path.
#[async_trait]
pub trait StorageUploader: Send + Sync {
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> CoreResult<String>;
}
