#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result alias threaded through every domain operation and use case.
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Shorthand for a missing entity keyed by any displayable id.
    pub fn not_found(entity: &'static str, id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// A refusal by the checklist rules (bad input, wrong state), as opposed
    /// to a failure of the code path that produced it.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::InvalidState(_))
    }
}
