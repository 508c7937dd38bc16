//! Evidence entity: a reference to an externally stored photo or video.

use chrono::Utc;
use serde::Serialize;

use crate::checklist::value_objects::{Description, EvidenceKey, MediaType, StoragePath};
use crate::types::{new_entity_id, EntityId, Timestamp};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evidence {
    id: EntityId,
    checklist_id: EntityId,
    evidence_key: EvidenceKey,
    storage_path: StoragePath,
    media_type: Option<MediaType>,
    description: Option<Description>,
    created_at: Timestamp,
}

impl Evidence {
    pub fn new(
        checklist_id: EntityId,
        evidence_key: EvidenceKey,
        storage_path: StoragePath,
        media_type: Option<MediaType>,
        description: Option<Description>,
    ) -> Self {
        Self {
            id: new_entity_id(),
            checklist_id,
            evidence_key,
            storage_path,
            media_type,
            description,
            created_at: Utc::now(),
        }
    }

    pub fn reconstruct(
        id: EntityId,
        checklist_id: EntityId,
        evidence_key: EvidenceKey,
        storage_path: StoragePath,
        media_type: Option<MediaType>,
        description: Option<Description>,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            checklist_id,
            evidence_key,
            storage_path,
            media_type,
            description,
            created_at,
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn checklist_id(&self) -> EntityId {
        self.checklist_id
    }

    pub fn evidence_key(&self) -> &EvidenceKey {
        &self.evidence_key
    }

    pub fn storage_path(&self) -> &StoragePath {
        &self.storage_path
    }

    pub fn media_type(&self) -> Option<&MediaType> {
        self.media_type.as_ref()
    }

    pub fn description(&self) -> Option<&Description> {
        self.description.as_ref()
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }
}
