//! Error types for the conversation store.

use thiserror::Error;

use crate::conversation::ids::ConversationId;

/// Conversation store error type.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Append targeted an identifier that was never created (or was evicted).
    #[error("conversation not found: {0}")]
    NotFound(ConversationId),
}

/// Convenience result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
