//! Error responses for the HTTP layer.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// Title used for request validation failures.
pub const VALIDATION_TITLE: &str = "One or more validation errors occurred.";

/// Errors rejected before reaching the chat orchestrator.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The chat request body failed validation.
    #[error("validation failed: {}", .0.join(", "))]
    Validation(Vec<String>),
    /// A path or query parameter was unusable.
    #[error("bad request: {0}")]
    BadRequest(String),
}

impl ApiError {
    /// HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match self {
            Self::Validation(errors) => json!({
                "title": VALIDATION_TITLE,
                "status": status.as_u16(),
                "errors": { "message": errors },
            }),
            Self::BadRequest(message) => json!({ "message": message }),
        };

        (status, Json(body)).into_response()
    }
}
