//! Legacy-compatible request/response shapes and the [`ChecklistApi`] seam.
//!
//! Both the aggregate-backed [`ChecklistService`](crate::checklist::service::ChecklistService)
//! and the direct-SQL legacy path implement [`ChecklistApi`], so the
//! migration router can dispatch to either and fall back from one to the
//! other with the same request value.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::checklist::aggregate::{ChecklistRecord, ChecklistStats, ChecklistStatus};
use crate::checklist::context::{context_to_query_params, normalize_context, ContextId, LegacyContext};
use crate::checklist::evidence::Evidence;
use crate::checklist::item::ChecklistItem;
use crate::error::{CoreError, CoreResult};
use crate::types::{EntityId, Timestamp};

/// Prefix shared by every anomaly item and anomaly photo key.
pub const ANOMALY_KEY_PREFIX: &str = "anomaly:";

/// Item key of the `n`-th anomaly (1-based).
pub fn anomaly_item_key(n: usize) -> String {
    format!("{ANOMALY_KEY_PREFIX}{n}")
}

/// Evidence key of the `m`-th photo of the `n`-th anomaly (both 1-based).
pub fn anomaly_photo_key(n: usize, m: usize) -> String {
    format!("{ANOMALY_KEY_PREFIX}{n}:photo:{m}")
}

pub fn is_anomaly_key(key: &str) -> bool {
    key.trim().starts_with(ANOMALY_KEY_PREFIX)
}

/// Refuse a reserved anomaly key on an operation that adds regular rows.
pub fn ensure_regular_key(key: &str) -> CoreResult<()> {
    if is_anomaly_key(key) {
        return Err(reserved_key(key));
    }
    Ok(())
}

/// Item keys in a full submission: regular keys pass, and a key in the
/// anomaly namespace must be exactly one [`anomaly_item_key`] produces, so a
/// resubmitted anomaly keeps its identity.
pub fn ensure_submittable_item_key(key: &str) -> CoreResult<()> {
    match key.trim().strip_prefix(ANOMALY_KEY_PREFIX) {
        None => Ok(()),
        Some(n) if is_ordinal(n) => Ok(()),
        Some(_) => Err(reserved_key(key)),
    }
}

/// Evidence counterpart of [`ensure_submittable_item_key`], matching
/// [`anomaly_photo_key`].
pub fn ensure_submittable_evidence_key(key: &str) -> CoreResult<()> {
    match key.trim().strip_prefix(ANOMALY_KEY_PREFIX) {
        None => Ok(()),
        Some(rest) => match rest.split_once(":photo:") {
            Some((n, m)) if is_ordinal(n) && is_ordinal(m) => Ok(()),
            _ => Err(reserved_key(key)),
        },
    }
}

/// 1-based decimal without leading zeros.
fn is_ordinal(s: &str) -> bool {
    !s.is_empty() && !s.starts_with('0') && s.bytes().all(|b| b.is_ascii_digit())
}

fn reserved_key(key: &str) -> CoreError {
    CoreError::Validation(format!(
        "key '{}' uses the reserved '{ANOMALY_KEY_PREFIX}' prefix",
        key.trim()
    ))
}

/// Resolve the context of a flat request or fail with a validation error.
pub fn require_context(context: &LegacyContext) -> CoreResult<ContextId> {
    normalize_context(context)
        .ok_or_else(|| CoreError::Validation("quote_id or inspection_id is required".into()))
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ItemInput {
    #[validate(length(min = 1, max = 100))]
    pub item_key: String,
    #[validate(length(min = 1))]
    pub status: String,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct EvidenceInput {
    #[validate(length(min = 1))]
    pub storage_path: String,
    #[serde(default)]
    pub media_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Full checklist submission. `items` and `evidences` replace whatever was
/// stored before; evidences are keyed by evidence key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct SubmitChecklistRequest {
    #[validate(length(min = 1))]
    pub vehicle_id: String,
    #[serde(flatten)]
    pub context: LegacyContext,
    #[validate(length(min = 1))]
    pub partner_id: String,
    #[serde(default)]
    #[validate(nested)]
    pub items: Vec<ItemInput>,
    #[serde(default)]
    #[validate(nested)]
    pub evidences: BTreeMap<String, EvidenceInput>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct AnomalyInput {
    #[validate(length(min = 1, max = 1000))]
    pub description: String,
    /// Storage paths of already uploaded photos.
    #[serde(default)]
    pub photos: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct SaveAnomaliesRequest {
    #[validate(length(min = 1))]
    pub vehicle_id: String,
    #[serde(flatten)]
    pub context: LegacyContext,
    #[validate(length(min = 1))]
    pub partner_id: String,
    #[serde(default)]
    #[validate(nested)]
    pub anomalies: Vec<AnomalyInput>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct InitChecklistRequest {
    #[validate(length(min = 1))]
    pub vehicle_id: String,
    #[serde(flatten)]
    pub context: LegacyContext,
    #[validate(length(min = 1))]
    pub partner_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct LoadChecklistRequest {
    #[validate(length(min = 1))]
    pub vehicle_id: String,
    #[serde(flatten)]
    pub context: LegacyContext,
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitChecklistResponse {
    pub checklist_id: EntityId,
    pub status: ChecklistStatus,
    pub items_saved: usize,
    pub evidences_saved: usize,
    pub needs_attention: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveAnomaliesResponse {
    pub checklist_id: EntityId,
    pub anomalies_saved: usize,
    pub photos_saved: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitChecklistResponse {
    pub checklist_id: EntityId,
    pub status: ChecklistStatus,
    /// `false` when an existing checklist was returned.
    pub created: bool,
}

/// Checklist header in the legacy flat shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChecklistView {
    pub id: EntityId,
    pub vehicle_id: String,
    pub quote_id: Option<String>,
    pub inspection_id: Option<String>,
    pub partner_id: String,
    pub status: ChecklistStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<&ChecklistRecord> for ChecklistView {
    fn from(record: &ChecklistRecord) -> Self {
        let params = context_to_query_params(&record.context);
        Self {
            id: record.id,
            vehicle_id: record.vehicle_id.clone(),
            quote_id: params.quote_id,
            inspection_id: params.inspection_id,
            partner_id: record.partner_id.clone(),
            status: record.status,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemView {
    pub id: EntityId,
    pub item_key: String,
    pub status: String,
    pub notes: Option<String>,
    pub created_at: Timestamp,
}

impl From<&ChecklistItem> for ItemView {
    fn from(item: &ChecklistItem) -> Self {
        Self {
            id: item.id(),
            item_key: item.item_key().value().to_string(),
            status: item.status().as_str().to_string(),
            notes: item.notes().map(|n| n.value().to_string()),
            created_at: item.created_at(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvidenceView {
    pub id: EntityId,
    pub evidence_key: String,
    pub storage_path: String,
    pub media_type: Option<String>,
    pub description: Option<String>,
    /// Time-limited read URL; absent when signing failed.
    pub signed_url: Option<String>,
    pub created_at: Timestamp,
}

impl EvidenceView {
    pub fn new(evidence: &Evidence, signed_url: Option<String>) -> Self {
        Self {
            id: evidence.id(),
            evidence_key: evidence.evidence_key().value().to_string(),
            storage_path: evidence.storage_path().value().to_string(),
            media_type: evidence.media_type().map(|m| m.value().to_string()),
            description: evidence.description().map(|d| d.value().to_string()),
            signed_url,
            created_at: evidence.created_at(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChecklistDetails {
    pub checklist: ChecklistView,
    pub items: Vec<ItemView>,
    pub evidences: Vec<EvidenceView>,
    pub stats: ChecklistStats,
}

// ---------------------------------------------------------------------------
// ChecklistApi
// ---------------------------------------------------------------------------

/// The four checklist operations routed during the migration.
#[async_trait]
pub trait ChecklistApi: Send + Sync {
    async fn submit_checklist(
        &self,
        request: SubmitChecklistRequest,
    ) -> CoreResult<SubmitChecklistResponse>;

    async fn save_anomalies(&self, request: SaveAnomaliesRequest)
        -> CoreResult<SaveAnomaliesResponse>;

    async fn init_checklist(&self, request: InitChecklistRequest)
        -> CoreResult<InitChecklistResponse>;

    /// `Ok(None)` when no checklist exists for the context and vehicle.
    async fn load_checklist(
        &self,
        request: LoadChecklistRequest,
    ) -> CoreResult<Option<ChecklistDetails>>;
}
