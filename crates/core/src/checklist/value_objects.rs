//! Self-validating string wrappers used by checklist entities.
//!
//! Every value object trims its input on construction and rejects values
//! that are empty (when required) or longer than the field's maximum.
//! Instances are immutable; a changed value is a new instance.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Maximum length (in characters) of an item key.
pub const MAX_ITEM_KEY_LENGTH: usize = 100;

/// Maximum length of an evidence key.
pub const MAX_EVIDENCE_KEY_LENGTH: usize = 100;

/// Maximum length of a storage path.
pub const MAX_STORAGE_PATH_LENGTH: usize = 500;

/// Maximum length of item notes.
pub const MAX_NOTES_LENGTH: usize = 1000;

/// Maximum length of a media type.
pub const MAX_MEDIA_TYPE_LENGTH: usize = 100;

/// Maximum length of an evidence description.
pub const MAX_DESCRIPTION_LENGTH: usize = 500;

// ---------------------------------------------------------------------------
// Validation helpers
// ---------------------------------------------------------------------------

fn validate_text(value: &str, field: &str, max: usize, required: bool) -> CoreResult<String> {
    let trimmed = value.trim();
    if required && trimmed.is_empty() {
        return Err(CoreError::Validation(format!("{field} cannot be empty")));
    }
    let length = trimmed.chars().count();
    if length > max {
        return Err(CoreError::Validation(format!(
            "{field} cannot exceed {max} characters, got {length}"
        )));
    }
    Ok(trimmed.to_string())
}

fn no_extra_rules(_value: &str) -> CoreResult<()> {
    Ok(())
}

fn media_type_rules(value: &str) -> CoreResult<()> {
    match value.split_once('/') {
        Some((kind, subtype)) if !kind.is_empty() && !subtype.is_empty() => Ok(()),
        _ => Err(CoreError::Validation(format!(
            "media_type must look like 'type/subtype', got '{value}'"
        ))),
    }
}

macro_rules! string_value_object {
    (
        $(#[$meta:meta])*
        $name:ident {
            field: $field:literal,
            max: $max:expr,
            required: $required:expr,
            rules: $rules:path $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Validate and wrap `value` (trimmed).
            pub fn create(value: &str) -> CoreResult<Self> {
                let value = validate_text(value, $field, $max, $required)?;
                $rules(&value)?;
                Ok(Self(value))
            }

            /// The validated, trimmed value.
            pub fn value(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = CoreError;

            fn try_from(value: String) -> CoreResult<Self> {
                Self::create(&value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Value objects
// ---------------------------------------------------------------------------

string_value_object! {
    /// Identifies an inspected component within a checklist (e.g. `engine`).
    ItemKey {
        field: "item_key",
        max: MAX_ITEM_KEY_LENGTH,
        required: true,
        rules: no_extra_rules,
    }
}

string_value_object! {
    /// Identifies one piece of evidence within a checklist.
    EvidenceKey {
        field: "evidence_key",
        max: MAX_EVIDENCE_KEY_LENGTH,
        required: true,
        rules: no_extra_rules,
    }
}

string_value_object! {
    /// Object key inside external blob storage. Never the bytes themselves.
    StoragePath {
        field: "storage_path",
        max: MAX_STORAGE_PATH_LENGTH,
        required: true,
        rules: no_extra_rules,
    }
}

string_value_object! {
    /// Free-form inspector notes attached to an item.
    Notes {
        field: "notes",
        max: MAX_NOTES_LENGTH,
        required: false,
        rules: no_extra_rules,
    }
}

string_value_object! {
    /// MIME type of an evidence file (e.g. `image/jpeg`).
    MediaType {
        field: "media_type",
        max: MAX_MEDIA_TYPE_LENGTH,
        required: true,
        rules: media_type_rules,
    }
}

string_value_object! {
    /// Free-form caption of an evidence file, such as what a photo shows.
    Description {
        field: "description",
        max: MAX_DESCRIPTION_LENGTH,
        required: false,
        rules: no_extra_rules,
    }
}

impl Notes {
    /// Build optional notes; `None` and blank input both yield `None`.
    pub fn create_optional(value: Option<&str>) -> CoreResult<Option<Self>> {
        match value.map(str::trim) {
            Some(v) if !v.is_empty() => Self::create(v).map(Some),
            _ => Ok(None),
        }
    }
}

impl Description {
    /// Build an optional description; blank input yields `None`.
    pub fn create_optional(value: Option<&str>) -> CoreResult<Option<Self>> {
        match value.map(str::trim) {
            Some(v) if !v.is_empty() => Self::create(v).map(Some),
            _ => Ok(None),
        }
    }
}

impl MediaType {
    /// Build an optional media type; blank input yields `None`.
    pub fn create_optional(value: Option<&str>) -> CoreResult<Option<Self>> {
        match value.map(str::trim) {
            Some(v) if !v.is_empty() => Self::create(v).map(Some),
            _ => Ok(None),
        }
    }

    pub fn is_image(&self) -> bool {
        self.0.starts_with("image/")
    }

    pub fn is_video(&self) -> bool {
        self.0.starts_with("video/")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
