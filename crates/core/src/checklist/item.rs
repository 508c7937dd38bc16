//! Checklist item entity: one inspected component with a status.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::checklist::value_objects::{ItemKey, Notes};
use crate::error::{CoreError, CoreResult};
use crate::types::{new_entity_id, EntityId, Timestamp};

pub const ITEM_STATUS_OK: &str = "ok";
pub const ITEM_STATUS_NEEDS_REPAIR: &str = "needs_repair";
pub const ITEM_STATUS_NEEDS_REPLACEMENT: &str = "needs_replacement";
pub const ITEM_STATUS_NOT_APPLICABLE: &str = "not_applicable";

/// All valid item status strings.
pub const VALID_ITEM_STATUSES: &[&str] = &[
    ITEM_STATUS_OK,
    ITEM_STATUS_NEEDS_REPAIR,
    ITEM_STATUS_NEEDS_REPLACEMENT,
    ITEM_STATUS_NOT_APPLICABLE,
];

/// Outcome recorded for an inspected item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Ok,
    NeedsRepair,
    NeedsReplacement,
    NotApplicable,
}

impl ItemStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => ITEM_STATUS_OK,
            Self::NeedsRepair => ITEM_STATUS_NEEDS_REPAIR,
            Self::NeedsReplacement => ITEM_STATUS_NEEDS_REPLACEMENT,
            Self::NotApplicable => ITEM_STATUS_NOT_APPLICABLE,
        }
    }

    /// Parse a status string as stored in the database or sent by clients.
    pub fn parse(value: &str) -> CoreResult<Self> {
        match value.trim() {
            ITEM_STATUS_OK => Ok(Self::Ok),
            ITEM_STATUS_NEEDS_REPAIR => Ok(Self::NeedsRepair),
            ITEM_STATUS_NEEDS_REPLACEMENT => Ok(Self::NeedsReplacement),
            ITEM_STATUS_NOT_APPLICABLE => Ok(Self::NotApplicable),
            other => Err(CoreError::Validation(format!(
                "Invalid item status '{other}'. Must be one of: {}",
                VALID_ITEM_STATUSES.join(", ")
            ))),
        }
    }

    /// Every status except `not_applicable` counts as completed.
    pub fn is_completed(self) -> bool {
        !matches!(self, Self::NotApplicable)
    }

    pub fn needs_attention(self) -> bool {
        matches!(self, Self::NeedsRepair | Self::NeedsReplacement)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChecklistItem {
    id: EntityId,
    checklist_id: EntityId,
    item_key: ItemKey,
    status: ItemStatus,
    notes: Option<Notes>,
    created_at: Timestamp,
}

impl ChecklistItem {
    /// A new item with a fresh id, stamped now.
    pub fn new(
        checklist_id: EntityId,
        item_key: ItemKey,
        status: ItemStatus,
        notes: Option<Notes>,
    ) -> Self {
        Self {
            id: new_entity_id(),
            checklist_id,
            item_key,
            status,
            notes,
            created_at: Utc::now(),
        }
    }

    /// Rehydrate a persisted item.
    pub fn reconstruct(
        id: EntityId,
        checklist_id: EntityId,
        item_key: ItemKey,
        status: ItemStatus,
        notes: Option<Notes>,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            checklist_id,
            item_key,
            status,
            notes,
            created_at,
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn checklist_id(&self) -> EntityId {
        self.checklist_id
    }

    pub fn item_key(&self) -> &ItemKey {
        &self.item_key
    }

    pub fn status(&self) -> ItemStatus {
        self.status
    }

    pub fn notes(&self) -> Option<&Notes> {
        self.notes.as_ref()
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn is_completed(&self) -> bool {
        self.status.is_completed()
    }

    pub fn needs_attention(&self) -> bool {
        self.status.needs_attention()
    }
}
