use thiserror::Error;

use crate::types::{AssignmentId, NodeLevel};

#[derive(Error, Debug)]
pub enum AssignmentError {
    /// Missing or malformed input, or a business rule gate such as
    /// publishing an empty assignment.
    #[error("{0}")]
    Validation(String),

    #[error("{level} not found")]
    NotFound { level: NodeLevel, id: String },

    #[error("{}", .level.duplicate_message())]
    Duplicate { level: NodeLevel, hex: String },

    #[error("Cannot add more than {limit} sub-feelings per main color")]
    LimitExceeded { limit: usize },

    #[error("Body Assignment {id} was modified by another request, reload and retry")]
    Conflict { id: AssignmentId },

    #[error("Persistence error: {0}")]
    Persistence(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl AssignmentError {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub(crate) fn not_found(level: NodeLevel, id: impl ToString) -> Self {
        Self::NotFound {
            level,
            id: id.to_string(),
        }
    }

    pub(crate) fn persistence<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Persistence(Box::new(err))
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, AssignmentError>;
