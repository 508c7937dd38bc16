//! Row models for `vehicle_checklists`, `checklist_items` and
//! `checklist_evidences`, with conversions into the domain types.
//!
//! Rows hold raw strings; conversion re-validates them through the value
//! objects, so a row that no longer satisfies the domain rules surfaces as
//! an internal error instead of a silently invalid aggregate.

use recon_core::checklist::aggregate::{ChecklistRecord, ChecklistStatus};
use recon_core::checklist::context::{context_to_query_params, normalize_context, LegacyContext};
use recon_core::checklist::evidence::Evidence;
use recon_core::checklist::item::{ChecklistItem, ItemStatus};
use recon_core::checklist::value_objects::{
    Description, EvidenceKey, ItemKey, MediaType, Notes, StoragePath,
};
use recon_core::error::{CoreError, CoreResult};
use recon_core::types::{EntityId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

fn corrupt(table: &str, id: EntityId, err: CoreError) -> CoreError {
    CoreError::Internal(format!("invalid {table} row {id}: {err}"))
}

// ---------------------------------------------------------------------------
// vehicle_checklists
// ---------------------------------------------------------------------------

/// A row from the `vehicle_checklists` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ChecklistRow {
    pub id: EntityId,
    pub vehicle_id: String,
    pub quote_id: Option<String>,
    pub inspection_id: Option<String>,
    pub partner_id: String,
    pub status: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ChecklistRow {
    pub fn into_record(self) -> CoreResult<ChecklistRecord> {
        let context = normalize_context(&LegacyContext {
            quote_id: self.quote_id,
            inspection_id: self.inspection_id,
        })
        .ok_or_else(|| {
            CoreError::Internal(format!("checklist {} has no quote or inspection id", self.id))
        })?;
        let status = ChecklistStatus::parse(&self.status)
            .map_err(|e| corrupt("vehicle_checklists", self.id, e))?;

        Ok(ChecklistRecord {
            id: self.id,
            vehicle_id: self.vehicle_id,
            context,
            partner_id: self.partner_id,
            status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Insert DTO for a checklist header, in the one-column-per-context layout.
#[derive(Debug, Clone)]
pub struct CreateChecklist {
    pub id: EntityId,
    pub vehicle_id: String,
    pub quote_id: Option<String>,
    pub inspection_id: Option<String>,
    pub partner_id: String,
    pub status: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<&ChecklistRecord> for CreateChecklist {
    fn from(record: &ChecklistRecord) -> Self {
        let params = context_to_query_params(&record.context);
        Self {
            id: record.id,
            vehicle_id: record.vehicle_id.clone(),
            quote_id: params.quote_id,
            inspection_id: params.inspection_id,
            partner_id: record.partner_id.clone(),
            status: record.status.as_str().to_string(),
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

// ---------------------------------------------------------------------------
// checklist_items
// ---------------------------------------------------------------------------

/// A row from the `checklist_items` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ChecklistItemRow {
    pub id: EntityId,
    pub checklist_id: EntityId,
    pub item_key: String,
    pub status: String,
    pub notes: Option<String>,
    pub created_at: Timestamp,
}

impl ChecklistItemRow {
    pub fn into_item(self) -> CoreResult<ChecklistItem> {
        let id = self.id;
        let convert = || -> CoreResult<ChecklistItem> {
            Ok(ChecklistItem::reconstruct(
                self.id,
                self.checklist_id,
                ItemKey::create(&self.item_key)?,
                ItemStatus::parse(&self.status)?,
                Notes::create_optional(self.notes.as_deref())?,
                self.created_at,
            ))
        };
        convert().map_err(|e| corrupt("checklist_items", id, e))
    }
}

/// Insert DTO for a batch of items.
#[derive(Debug, Clone)]
pub struct CreateChecklistItem {
    pub id: EntityId,
    pub checklist_id: EntityId,
    pub item_key: String,
    pub status: String,
    pub notes: Option<String>,
    pub created_at: Timestamp,
}

impl From<&ChecklistItem> for CreateChecklistItem {
    fn from(item: &ChecklistItem) -> Self {
        Self {
            id: item.id(),
            checklist_id: item.checklist_id(),
            item_key: item.item_key().value().to_string(),
            status: item.status().as_str().to_string(),
            notes: item.notes().map(|n| n.value().to_string()),
            created_at: item.created_at(),
        }
    }
}

// ---------------------------------------------------------------------------
// checklist_evidences
// ---------------------------------------------------------------------------

/// A row from the `checklist_evidences` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct EvidenceRow {
    pub id: EntityId,
    pub checklist_id: EntityId,
    pub evidence_key: String,
    pub storage_path: String,
    pub media_type: Option<String>,
    pub description: Option<String>,
    pub created_at: Timestamp,
}

impl EvidenceRow {
    pub fn into_evidence(self) -> CoreResult<Evidence> {
        let id = self.id;
        let convert = || -> CoreResult<Evidence> {
            Ok(Evidence::reconstruct(
                self.id,
                self.checklist_id,
                EvidenceKey::create(&self.evidence_key)?,
                StoragePath::create(&self.storage_path)?,
                MediaType::create_optional(self.media_type.as_deref())?,
                Description::create_optional(self.description.as_deref())?,
                self.created_at,
            ))
        };
        convert().map_err(|e| corrupt("checklist_evidences", id, e))
    }
}

/// Insert DTO for a batch of evidences.
#[derive(Debug, Clone)]
pub struct CreateEvidence {
    pub id: EntityId,
    pub checklist_id: EntityId,
    pub evidence_key: String,
    pub storage_path: String,
    pub media_type: Option<String>,
    pub description: Option<String>,
    pub created_at: Timestamp,
}

impl From<&Evidence> for CreateEvidence {
    fn from(evidence: &Evidence) -> Self {
        Self {
            id: evidence.id(),
            checklist_id: evidence.checklist_id(),
            evidence_key: evidence.evidence_key().value().to_string(),
            storage_path: evidence.storage_path().value().to_string(),
            media_type: evidence.media_type().map(|m| m.value().to_string()),
            description: evidence.description().map(|d| d.value().to_string()),
            created_at: evidence.created_at(),
        }
    }
}
