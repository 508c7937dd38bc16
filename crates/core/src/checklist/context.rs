//! Normalization of the two legacy parent-record identifiers.
//!
//! Older records point at their parent through either a `quote_id` or an
//! `inspection_id` column. The domain works with a single [`ContextId`];
//! this module translates in both directions. When both identifiers are
//! present the quote wins: a quote supersedes the raw inspection it was
//! produced from.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Legacy column holding a quote reference.
pub const QUOTE_ID_COLUMN: &str = "quote_id";

/// Legacy column holding an inspection reference.
pub const INSPECTION_ID_COLUMN: &str = "inspection_id";

/// Which kind of parent record a checklist belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextKind {
    Quote,
    Inspection,
}

impl ContextKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Quote => "quote",
            Self::Inspection => "inspection",
        }
    }

    /// Legacy column name carrying this kind of identifier.
    pub fn column(self) -> &'static str {
        match self {
            Self::Quote => QUOTE_ID_COLUMN,
            Self::Inspection => INSPECTION_ID_COLUMN,
        }
    }
}

impl fmt::Display for ContextKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed pointer to the parent record (quote or inspection) of a checklist.
///
/// The id is always non-empty; construct through [`ContextId::new`] or
/// [`normalize_context`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawContextId")]
pub struct ContextId {
    #[serde(rename = "type")]
    kind: ContextKind,
    id: String,
}

#[derive(Deserialize)]
struct RawContextId {
    #[serde(rename = "type")]
    kind: ContextKind,
    id: String,
}

impl TryFrom<RawContextId> for ContextId {
    type Error = CoreError;

    fn try_from(raw: RawContextId) -> CoreResult<Self> {
        Self::new(raw.kind, &raw.id)
    }
}

impl ContextId {
    pub fn new(kind: ContextKind, id: &str) -> CoreResult<Self> {
        let id = id.trim();
        if id.is_empty() {
            return Err(CoreError::Validation(format!(
                "{} cannot be empty",
                kind.column()
            )));
        }
        Ok(Self {
            kind,
            id: id.to_string(),
        })
    }

    pub fn quote(id: &str) -> CoreResult<Self> {
        Self::new(ContextKind::Quote, id)
    }

    pub fn inspection(id: &str) -> CoreResult<Self> {
        Self::new(ContextKind::Inspection, id)
    }

    pub fn kind(&self) -> ContextKind {
        self.kind
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// The two raw identifiers as they arrive from legacy request bodies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyContext {
    #[serde(default)]
    pub quote_id: Option<String>,
    #[serde(default)]
    pub inspection_id: Option<String>,
}

impl LegacyContext {
    pub fn new(quote_id: Option<&str>, inspection_id: Option<&str>) -> Self {
        Self {
            quote_id: quote_id.map(str::to_string),
            inspection_id: inspection_id.map(str::to_string),
        }
    }
}

/// Column/value pair in the legacy convention; exactly one field is set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContextQueryParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quote_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inspection_id: Option<String>,
}

/// Resolve legacy identifiers into a [`ContextId`], quote first.
///
/// Blank strings count as absent. Returns `None` when neither identifier
/// is usable.
pub fn normalize_context(legacy: &LegacyContext) -> Option<ContextId> {
    let non_blank = |value: &Option<String>| {
        value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    if let Some(id) = non_blank(&legacy.quote_id) {
        return Some(ContextId {
            kind: ContextKind::Quote,
            id,
        });
    }
    non_blank(&legacy.inspection_id).map(|id| ContextId {
        kind: ContextKind::Inspection,
        id,
    })
}

/// Map a context back to the legacy column convention for persistence adapters.
pub fn context_to_query_params(context: &ContextId) -> ContextQueryParams {
    match context.kind {
        ContextKind::Quote => ContextQueryParams {
            quote_id: Some(context.id.clone()),
            inspection_id: None,
        },
        ContextKind::Inspection => ContextQueryParams {
            quote_id: None,
            inspection_id: Some(context.id.clone()),
        },
    }
}

pub fn is_valid_context(context: Option<&ContextId>) -> bool {
    context.is_some_and(|c| !c.id.trim().is_empty())
}
