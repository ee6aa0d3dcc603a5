//! Uniform response body: `{"status", "body", "message"}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub status: &'static str,
    pub body: Option<T>,
    pub message: String,
}

impl<T: Serialize> Envelope<T> {
    pub fn success(body: T, message: impl Into<String>) -> Self {
        Self {
            status: "success",
            body: Some(body),
            message: message.into(),
        }
    }
}

impl Envelope<()> {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error",
            body: None,
            message: message.into(),
        }
    }
}

/// A successful reply with its HTTP status.
pub struct Reply<T> {
    status: StatusCode,
    envelope: Envelope<T>,
}

impl<T: Serialize> Reply<T> {
    pub fn ok(body: T, message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            envelope: Envelope::success(body, message),
        }
    }

    pub fn created(body: T, message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::CREATED,
            envelope: Envelope::success(body, message),
        }
    }
}

impl<T: Serialize> IntoResponse for Reply<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self.envelope)).into_response()
    }
}
