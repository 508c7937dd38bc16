//! The `Checklist` aggregate root.
//!
//! A checklist owns its items and evidences. All mutation goes through the
//! aggregate so that its invariants hold:
//!
//! - items and evidences can only be added while the checklist is a draft;
//! - every child references this checklist's id;
//! - item keys and evidence keys are unique within the checklist;
//! - submission needs at least one item and happens exactly once;
//! - `updated_at` moves on every mutation.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::checklist::context::ContextId;
use crate::checklist::evidence::Evidence;
use crate::checklist::item::{ChecklistItem, ItemStatus};
use crate::error::{CoreError, CoreResult};
use crate::types::{new_entity_id, EntityId, Timestamp};

pub const CHECKLIST_STATUS_DRAFT: &str = "draft";
pub const CHECKLIST_STATUS_SUBMITTED: &str = "submitted";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChecklistStatus {
    Draft,
    Submitted,
}

impl ChecklistStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => CHECKLIST_STATUS_DRAFT,
            Self::Submitted => CHECKLIST_STATUS_SUBMITTED,
        }
    }

    pub fn parse(value: &str) -> CoreResult<Self> {
        match value {
            CHECKLIST_STATUS_DRAFT => Ok(Self::Draft),
            CHECKLIST_STATUS_SUBMITTED => Ok(Self::Submitted),
            other => Err(CoreError::Validation(format!(
                "Invalid checklist status '{other}'"
            ))),
        }
    }
}

/// The persisted header of a checklist, without its children.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChecklistRecord {
    pub id: EntityId,
    pub vehicle_id: String,
    pub context: ContextId,
    pub partner_id: String,
    pub status: ChecklistStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Item and evidence counts plus the completion percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChecklistStats {
    pub total_items: usize,
    pub completed_items: usize,
    pub items_needing_attention: usize,
    pub total_evidences: usize,
    pub completion_percentage: u32,
}

impl ChecklistStats {
    /// Stats over a set of item statuses. Shared by the aggregate and by
    /// read paths that only hold flat rows.
    pub fn compute(statuses: impl IntoIterator<Item = ItemStatus>, total_evidences: usize) -> Self {
        let mut total_items = 0;
        let mut completed_items = 0;
        let mut items_needing_attention = 0;
        for status in statuses {
            total_items += 1;
            if status.is_completed() {
                completed_items += 1;
            }
            if status.needs_attention() {
                items_needing_attention += 1;
            }
        }
        Self {
            total_items,
            completed_items,
            items_needing_attention,
            total_evidences,
            completion_percentage: percentage(completed_items, total_items),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Checklist {
    record: ChecklistRecord,
    items: Vec<ChecklistItem>,
    evidences: Vec<Evidence>,
}

impl Checklist {
    /// Start a new draft checklist with a fresh id.
    pub fn create_new(vehicle_id: &str, context: ContextId, partner_id: &str) -> CoreResult<Self> {
        let vehicle_id = vehicle_id.trim();
        let partner_id = partner_id.trim();
        if vehicle_id.is_empty() {
            return Err(CoreError::Validation("vehicle_id cannot be empty".into()));
        }
        if partner_id.is_empty() {
            return Err(CoreError::Validation("partner_id cannot be empty".into()));
        }

        let now = Utc::now();
        Ok(Self {
            record: ChecklistRecord {
                id: new_entity_id(),
                vehicle_id: vehicle_id.to_string(),
                context,
                partner_id: partner_id.to_string(),
                status: ChecklistStatus::Draft,
                created_at: now,
                updated_at: now,
            },
            items: Vec::new(),
            evidences: Vec::new(),
        })
    }

    /// Rehydrate from persistence. Children belonging to another checklist
    /// are rejected.
    pub fn reconstruct(
        record: ChecklistRecord,
        items: Vec<ChecklistItem>,
        evidences: Vec<Evidence>,
    ) -> CoreResult<Self> {
        let foreign_item = items.iter().any(|i| i.checklist_id() != record.id);
        let foreign_evidence = evidences.iter().any(|e| e.checklist_id() != record.id);
        if foreign_item || foreign_evidence {
            return Err(CoreError::Internal(format!(
                "checklist {} loaded with children of another checklist",
                record.id
            )));
        }
        Ok(Self {
            record,
            items,
            evidences,
        })
    }

    /// An empty draft sharing this checklist's header, used when the whole
    /// item/evidence set is being replaced.
    pub fn emptied(&self) -> Self {
        Self {
            record: self.record.clone(),
            items: Vec::new(),
            evidences: Vec::new(),
        }
    }

    pub fn id(&self) -> EntityId {
        self.record.id
    }

    pub fn vehicle_id(&self) -> &str {
        &self.record.vehicle_id
    }

    pub fn context(&self) -> &ContextId {
        &self.record.context
    }

    pub fn partner_id(&self) -> &str {
        &self.record.partner_id
    }

    pub fn status(&self) -> ChecklistStatus {
        self.record.status
    }

    pub fn created_at(&self) -> Timestamp {
        self.record.created_at
    }

    pub fn updated_at(&self) -> Timestamp {
        self.record.updated_at
    }

    pub fn record(&self) -> &ChecklistRecord {
        &self.record
    }

    pub fn items(&self) -> &[ChecklistItem] {
        &self.items
    }

    pub fn evidences(&self) -> &[Evidence] {
        &self.evidences
    }

    pub fn is_draft(&self) -> bool {
        self.record.status == ChecklistStatus::Draft
    }

    pub fn add_item(&mut self, item: ChecklistItem) -> CoreResult<()> {
        self.ensure_draft("add items to")?;
        if item.checklist_id() != self.record.id {
            return Err(CoreError::Validation(
                "item belongs to a different checklist".into(),
            ));
        }
        if self.items.iter().any(|i| i.item_key() == item.item_key()) {
            return Err(CoreError::Validation(format!(
                "item '{}' already exists in this checklist",
                item.item_key()
            )));
        }
        self.items.push(item);
        self.touch();
        Ok(())
    }

    pub fn add_evidence(&mut self, evidence: Evidence) -> CoreResult<()> {
        self.ensure_draft("add evidences to")?;
        if evidence.checklist_id() != self.record.id {
            return Err(CoreError::Validation(
                "evidence belongs to a different checklist".into(),
            ));
        }
        if self
            .evidences
            .iter()
            .any(|e| e.evidence_key() == evidence.evidence_key())
        {
            return Err(CoreError::Validation(format!(
                "evidence '{}' already exists in this checklist",
                evidence.evidence_key()
            )));
        }
        self.evidences.push(evidence);
        self.touch();
        Ok(())
    }

    /// The submission rules: still a draft and at least one item.
    ///
    /// Items marked `not_applicable` do not block submission; they only lower
    /// the completion percentage.
    pub fn ensure_submittable(&self) -> CoreResult<()> {
        if self.record.status == ChecklistStatus::Submitted {
            return Err(CoreError::InvalidState(
                "checklist has already been submitted".into(),
            ));
        }
        if self.items.is_empty() {
            return Err(CoreError::Validation(
                "cannot submit a checklist without items".into(),
            ));
        }
        Ok(())
    }

    pub fn submit(&mut self) -> CoreResult<()> {
        self.ensure_submittable()?;
        self.record.status = ChecklistStatus::Submitted;
        self.touch();
        Ok(())
    }

    pub fn items_needing_attention(&self) -> Vec<&ChecklistItem> {
        self.items.iter().filter(|i| i.needs_attention()).collect()
    }

    pub fn stats(&self) -> ChecklistStats {
        ChecklistStats::compute(self.items.iter().map(|i| i.status()), self.evidences.len())
    }

    /// Rounded share of completed items; `0` for an empty checklist.
    pub fn completion_percentage(&self) -> u32 {
        self.stats().completion_percentage
    }

    fn ensure_draft(&self, action: &str) -> CoreResult<()> {
        if self.record.status != ChecklistStatus::Draft {
            return Err(CoreError::InvalidState(format!(
                "cannot {action} a submitted checklist"
            )));
        }
        Ok(())
    }

    fn touch(&mut self) {
        let now = Utc::now();
        // Never move backwards, even if the clock does.
        if now > self.record.updated_at {
            self.record.updated_at = now;
        }
    }
}

fn percentage(part: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((part as f64 / total as f64) * 100.0).round() as u32
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
