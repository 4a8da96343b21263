//! Error types for the remote model client.

use thiserror::Error;

/// Errors produced while calling the remote chat model.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Transport failure, timeout, or undecodable body.
    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),
    /// The API answered with a non-success status.
    #[error("model api returned status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Raw response body, for diagnostics.
        body: String,
    },
    /// The response decoded but lacked the expected fields.
    #[error("malformed model response: {0}")]
    MalformedResponse(String),
    /// Invalid client configuration.
    #[error("invalid model configuration: {0}")]
    InvalidConfig(String),
}

/// Convenience result alias for model operations.
pub type ModelResult<T> = Result<T, ModelError>;
