//! In-memory implementations of the checklist ports.
//!
//! Used by tests and by local wiring without a database. Each store keeps
//! its state behind a single mutex, so the context + vehicle uniqueness check
//! in [`InMemoryChecklistRepository::save`] is atomic.
//! [`InMemoryChecklistUnitOfWork`] holds all three store locks while it
//! writes, which gives it the same all-or-nothing behaviour as a transaction.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::checklist::aggregate::{Checklist, ChecklistRecord};
use crate::checklist::context::ContextId;
use crate::checklist::evidence::Evidence;
use crate::checklist::item::ChecklistItem;
use crate::checklist::ports::{
    ChecklistItemRepository, ChecklistRepository, ChecklistUnitOfWork, EvidenceRepository,
    StorageSigner, StorageUploader, TimelinePublisher, VehicleStatusWriter,
};
use crate::error::{CoreError, CoreResult};
use crate::types::EntityId;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// Repositories
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct InMemoryChecklistRepository {
    records: Mutex<HashMap<EntityId, ChecklistRecord>>,
}

impl InMemoryChecklistRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        lock(&self.records).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ChecklistRepository for InMemoryChecklistRepository {
    async fn find_by_id(&self, id: EntityId) -> CoreResult<Option<ChecklistRecord>> {
        Ok(lock(&self.records).get(&id).cloned())
    }

    async fn find_by_context(
        &self,
        context: &ContextId,
        vehicle_id: &str,
    ) -> CoreResult<Option<ChecklistRecord>> {
        Ok(lock(&self.records)
            .values()
            .find(|r| &r.context == context && r.vehicle_id == vehicle_id)
            .cloned())
    }

    async fn save(&self, record: &ChecklistRecord) -> CoreResult<ChecklistRecord> {
        let mut records = lock(&self.records);
        let duplicate = records
            .values()
            .any(|r| r.context == record.context && r.vehicle_id == record.vehicle_id);
        if duplicate || records.contains_key(&record.id) {
            return Err(CoreError::Conflict(format!(
                "checklist already exists for {} and vehicle {}",
                record.context, record.vehicle_id
            )));
        }
        records.insert(record.id, record.clone());
        Ok(record.clone())
    }

    async fn update(&self, record: &ChecklistRecord) -> CoreResult<()> {
        let mut records = lock(&self.records);
        let stored = records
            .get_mut(&record.id)
            .ok_or_else(|| CoreError::not_found("checklist", record.id))?;
        stored.status = record.status;
        stored.updated_at = record.updated_at;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryChecklistItemRepository {
    items: Mutex<Vec<ChecklistItem>>,
}

impl InMemoryChecklistItemRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChecklistItemRepository for InMemoryChecklistItemRepository {
    async fn find_by_checklist_id(&self, checklist_id: EntityId) -> CoreResult<Vec<ChecklistItem>> {
        Ok(lock(&self.items)
            .iter()
            .filter(|i| i.checklist_id() == checklist_id)
            .cloned()
            .collect())
    }

    async fn save_many(&self, items: &[ChecklistItem]) -> CoreResult<()> {
        let mut stored = lock(&self.items);
        for item in items {
            let clash = stored
                .iter()
                .any(|s| s.checklist_id() == item.checklist_id() && s.item_key() == item.item_key());
            if clash {
                return Err(CoreError::Conflict(format!(
                    "item '{}' already stored for checklist {}",
                    item.item_key(),
                    item.checklist_id()
                )));
            }
        }
        stored.extend_from_slice(items);
        Ok(())
    }

    async fn delete_by_checklist_id(&self, checklist_id: EntityId) -> CoreResult<u64> {
        let mut stored = lock(&self.items);
        let before = stored.len();
        stored.retain(|i| i.checklist_id() != checklist_id);
        Ok((before - stored.len()) as u64)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryEvidenceRepository {
    evidences: Mutex<Vec<Evidence>>,
}

impl InMemoryEvidenceRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EvidenceRepository for InMemoryEvidenceRepository {
    async fn find_by_checklist_id(&self, checklist_id: EntityId) -> CoreResult<Vec<Evidence>> {
        Ok(lock(&self.evidences)
            .iter()
            .filter(|e| e.checklist_id() == checklist_id)
            .cloned()
            .collect())
    }

    async fn save_many(&self, evidences: &[Evidence]) -> CoreResult<()> {
        let mut stored = lock(&self.evidences);
        for evidence in evidences {
            let clash = stored.iter().any(|s| {
                s.checklist_id() == evidence.checklist_id()
                    && s.evidence_key() == evidence.evidence_key()
            });
            if clash {
                return Err(CoreError::Conflict(format!(
                    "evidence '{}' already stored for checklist {}",
                    evidence.evidence_key(),
                    evidence.checklist_id()
                )));
            }
        }
        stored.extend_from_slice(evidences);
        Ok(())
    }

    async fn delete_by_checklist_id(&self, checklist_id: EntityId) -> CoreResult<u64> {
        let mut stored = lock(&self.evidences);
        let before = stored.len();
        stored.retain(|e| e.checklist_id() != checklist_id);
        Ok((before - stored.len()) as u64)
    }
}

/// Replaces a checklist's header and children across the three in-memory
/// stores in one critical section.
#[derive(Debug, Clone)]
pub struct InMemoryChecklistUnitOfWork {
    checklists: Arc<InMemoryChecklistRepository>,
    items: Arc<InMemoryChecklistItemRepository>,
    evidences: Arc<InMemoryEvidenceRepository>,
}

impl InMemoryChecklistUnitOfWork {
    pub fn new(
        checklists: Arc<InMemoryChecklistRepository>,
        items: Arc<InMemoryChecklistItemRepository>,
        evidences: Arc<InMemoryEvidenceRepository>,
    ) -> Self {
        Self {
            checklists,
            items,
            evidences,
        }
    }
}

#[async_trait]
impl ChecklistUnitOfWork for InMemoryChecklistUnitOfWork {
    async fn replace_contents(&self, checklist: &Checklist) -> CoreResult<()> {
        // Lock order: checklists, items, evidences.
        let mut records = lock(&self.checklists.records);
        let mut items = lock(&self.items.items);
        let mut evidences = lock(&self.evidences.evidences);

        let id = checklist.id();
        if !records.contains_key(&id) {
            return Err(CoreError::not_found("checklist", id));
        }
        let mut item_keys = HashSet::new();
        if let Some(dup) = checklist.items().iter().find(|i| !item_keys.insert(i.item_key())) {
            return Err(CoreError::Conflict(format!(
                "item '{}' appears twice for checklist {id}",
                dup.item_key()
            )));
        }
        let mut evidence_keys = HashSet::new();
        if let Some(dup) = checklist
            .evidences()
            .iter()
            .find(|e| !evidence_keys.insert(e.evidence_key()))
        {
            return Err(CoreError::Conflict(format!(
                "evidence '{}' appears twice for checklist {id}",
                dup.evidence_key()
            )));
        }

        if let Some(stored) = records.get_mut(&id) {
            stored.status = checklist.status();
            stored.updated_at = checklist.updated_at();
        }
        items.retain(|i| i.checklist_id() != id);
        items.extend_from_slice(checklist.items());
        evidences.retain(|e| e.checklist_id() != id);
        evidences.extend_from_slice(checklist.evidences());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

/// One `checklist.submitted` publication captured by [`RecordingTimelinePublisher`].
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedSubmission {
    pub checklist_id: EntityId,
    pub context: ContextId,
    pub vehicle_id: String,
}

#[derive(Debug, Default)]
pub struct RecordingTimelinePublisher {
    published: Mutex<Vec<PublishedSubmission>>,
}

impl RecordingTimelinePublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn published(&self) -> Vec<PublishedSubmission> {
        lock(&self.published).clone()
    }
}

#[async_trait]
impl TimelinePublisher for RecordingTimelinePublisher {
    async fn publish_checklist_submitted(
        &self,
        checklist_id: EntityId,
        context: &ContextId,
        vehicle_id: &str,
    ) -> CoreResult<()> {
        lock(&self.published).push(PublishedSubmission {
            checklist_id,
            context: context.clone(),
            vehicle_id: vehicle_id.to_string(),
        });
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct RecordingVehicleStatusWriter {
    updates: Mutex<Vec<(String, String)>>,
}

impl RecordingVehicleStatusWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(vehicle_id, status)` pairs in write order.
    pub fn updates(&self) -> Vec<(String, String)> {
        lock(&self.updates).clone()
    }
}

#[async_trait]
impl VehicleStatusWriter for RecordingVehicleStatusWriter {
    async fn update_status(&self, vehicle_id: &str, status: &str) -> CoreResult<()> {
        lock(&self.updates).push((vehicle_id.to_string(), status.to_string()));
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Object store keeping uploads in memory and handing out `memory://` URLs.
#[derive(Debug, Default)]
pub struct InMemoryObjectStore {
    objects: Mutex<HashMap<String, StoredObject>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &str) -> Option<StoredObject> {
        lock(&self.objects).get(path).cloned()
    }
}

#[async_trait]
impl StorageSigner for InMemoryObjectStore {
    async fn create_signed_url(&self, path: &str, expires_in: Duration) -> CoreResult<String> {
        Ok(format!("memory://{path}?expires_in={}", expires_in.as_secs()))
    }
}

#[async_trait]
impl StorageUploader for InMemoryObjectStore {
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> CoreResult<String> {
        lock(&self.objects).insert(
            path.to_string(),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(path.to_string())
    }
}
