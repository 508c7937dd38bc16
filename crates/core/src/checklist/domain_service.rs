//! Pure validation and construction rules layered over the aggregate.
//!
//! [`ChecklistDomainService`] answers "may I?" questions without throwing,
//! so callers decide whether to surface or swallow a refusal.
//! [`ChecklistFactory`] builds aggregates and children from raw input.

use serde::Serialize;

use crate::checklist::aggregate::{Checklist, ChecklistStats};
use crate::checklist::context::ContextId;
use crate::checklist::evidence::Evidence;
use crate::checklist::item::{ChecklistItem, ItemStatus};
use crate::checklist::value_objects::{
    Description, EvidenceKey, ItemKey, MediaType, Notes, StoragePath,
};
use crate::error::{CoreError, CoreResult};
use crate::types::EntityId;

// ---------------------------------------------------------------------------
// ValidationOutcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationOutcome {
    pub is_valid: bool,
    pub reason: Option<String>,
}

impl ValidationOutcome {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            reason: None,
        }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            reason: Some(reason.into()),
        }
    }

    /// Convert a refusal into `CoreError::Validation`.
    pub fn into_result(self) -> CoreResult<()> {
        if self.is_valid {
            Ok(())
        } else {
            Err(CoreError::Validation(
                self.reason.unwrap_or_else(|| "validation failed".into()),
            ))
        }
    }
}

// ---------------------------------------------------------------------------
// ChecklistDomainService
// ---------------------------------------------------------------------------

pub struct ChecklistDomainService;

impl ChecklistDomainService {
    pub fn can_create_checklist(
        vehicle_id: &str,
        context: Option<&ContextId>,
        partner_id: &str,
    ) -> ValidationOutcome {
        if vehicle_id.trim().is_empty() {
            return ValidationOutcome::invalid("vehicle_id is required");
        }
        if context.is_none() {
            return ValidationOutcome::invalid("quote_id or inspection_id is required");
        }
        if partner_id.trim().is_empty() {
            return ValidationOutcome::invalid("partner_id is required");
        }
        ValidationOutcome::valid()
    }

    pub fn can_add_item_to_checklist(checklist: &Checklist, item_key: &ItemKey) -> ValidationOutcome {
        if !checklist.is_draft() {
            return ValidationOutcome::invalid("cannot add items to a submitted checklist");
        }
        if checklist.items().iter().any(|i| i.item_key() == item_key) {
            return ValidationOutcome::invalid(format!(
                "item '{item_key}' already exists in this checklist"
            ));
        }
        ValidationOutcome::valid()
    }

    pub fn can_add_evidence_to_checklist(
        checklist: &Checklist,
        evidence_key: &EvidenceKey,
    ) -> ValidationOutcome {
        if !checklist.is_draft() {
            return ValidationOutcome::invalid("cannot add evidences to a submitted checklist");
        }
        if checklist
            .evidences()
            .iter()
            .any(|e| e.evidence_key() == evidence_key)
        {
            return ValidationOutcome::invalid(format!(
                "evidence '{evidence_key}' already exists in this checklist"
            ));
        }
        ValidationOutcome::valid()
    }

    /// Delegates to [`Checklist::ensure_submittable`], the single authority
    /// for submission rules.
    pub fn can_submit_checklist(checklist: &Checklist) -> ValidationOutcome {
        match checklist.ensure_submittable() {
            Ok(()) => ValidationOutcome::valid(),
            Err(CoreError::Validation(reason) | CoreError::InvalidState(reason)) => {
                ValidationOutcome::invalid(reason)
            }
            Err(other) => ValidationOutcome::invalid(other.to_string()),
        }
    }

    pub fn calculate_checklist_stats(checklist: &Checklist) -> ChecklistStats {
        checklist.stats()
    }
}

// ---------------------------------------------------------------------------
// ChecklistFactory
// ---------------------------------------------------------------------------

pub struct ChecklistFactory;

impl ChecklistFactory {
    pub fn create_checklist(
        vehicle_id: &str,
        context: Option<ContextId>,
        partner_id: &str,
    ) -> CoreResult<Checklist> {
        ChecklistDomainService::can_create_checklist(vehicle_id, context.as_ref(), partner_id)
            .into_result()?;
        let context = context
            .ok_or_else(|| CoreError::Validation("quote_id or inspection_id is required".into()))?;
        Checklist::create_new(vehicle_id, context, partner_id)
    }

    pub fn create_item(
        checklist_id: EntityId,
        item_key: &str,
        status: ItemStatus,
        notes: Option<&str>,
    ) -> CoreResult<ChecklistItem> {
        Ok(ChecklistItem::new(
            checklist_id,
            ItemKey::create(item_key)?,
            status,
            Notes::create_optional(notes)?,
        ))
    }

    pub fn create_evidence(
        checklist_id: EntityId,
        evidence_key: &str,
        storage_path: &str,
        media_type: Option<&str>,
        description: Option<&str>,
    ) -> CoreResult<Evidence> {
        Ok(Evidence::new(
            checklist_id,
            EvidenceKey::create(evidence_key)?,
            StoragePath::create(storage_path)?,
            MediaType::create_optional(media_type)?,
            Description::create_optional(description)?,
        ))
    }
}
