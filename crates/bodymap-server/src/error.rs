use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bodymap_core::AssignmentError;
use thiserror::Error;

use crate::envelope::Envelope;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Assignment(#[from] AssignmentError),

    /// An extractor rejected the request (malformed JSON, oversized body,
    /// bad query string).
    #[error("Invalid request: {message}")]
    Rejected { status: StatusCode, message: String },

    #[error("Missing or invalid admin token")]
    Unauthorized,

    /// Storage failure whose detail has already been logged.
    #[error("{0}")]
    Internal(String),
}

impl ServerError {
    /// Convert a domain error, hiding persistence detail unless `expose` is set.
    pub fn from_domain(err: AssignmentError, expose: bool) -> Self {
        match err {
            AssignmentError::Persistence(source) => {
                tracing::error!(error = %source, "storage failure");
                if expose {
                    Self::Internal(format!("Persistence error: {source}"))
                } else {
                    Self::Internal("Internal server error".into())
                }
            }
            other => Self::Assignment(other),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::Assignment(err) => match err {
                AssignmentError::Validation(_)
                | AssignmentError::Duplicate { .. }
                | AssignmentError::LimitExceeded { .. } => StatusCode::BAD_REQUEST,
                AssignmentError::NotFound { .. } => StatusCode::NOT_FOUND,
                AssignmentError::Conflict { .. } => StatusCode::CONFLICT,
                AssignmentError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ServerError::Rejected { status, .. } => *status,
            ServerError::Unauthorized => StatusCode::UNAUTHORIZED,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            // Reached only through `?` without `from_domain`.
            ServerError::Assignment(AssignmentError::Persistence(_)) => {
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        if status.is_server_error() {
            tracing::warn!(%status, %message, "request failed");
        } else {
            tracing::debug!(%status, %message, "request rejected");
        }

        (status, axum::Json(Envelope::<()>::error(message))).into_response()
    }
}
