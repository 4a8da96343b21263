//! Request and result types for the chat orchestrator.

use serde::{Deserialize, Serialize};

use crate::conversation::ids::ConversationId;

/// Maximum accepted message length, in characters.
pub const MAX_MESSAGE_CHARS: usize = 4000;

/// User-facing text returned for every failed call.
pub const GENERIC_FAILURE_MESSAGE: &str = "An error occurred while processing your request.";

/// Inbound chat message.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    /// User message text.
    #[serde(default)]
    pub message: String,
    /// Conversation to continue; a new one is started when absent.
    #[serde(default)]
    pub conversation_id: Option<String>,
}

impl ChatRequest {
    /// Build a request.
    #[must_use]
    pub fn new(message: impl Into<String>, conversation_id: Option<ConversationId>) -> Self {
        Self {
            message: message.into(),
            conversation_id: conversation_id.map(ConversationId::into_string),
        }
    }

    /// Check the message field, returning one description per violation.
    ///
    /// # Errors
    /// Returns the list of violated rules.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        if self.message.trim().is_empty() {
            errors.push("The message is required.".to_string());
        }
        if self.message.chars().count() > MAX_MESSAGE_CHARS {
            errors.push(format!(
                "The message cannot exceed {MAX_MESSAGE_CHARS} characters."
            ));
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Outcome of a chat call. Always well formed, even on failure.
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResult {
    /// Whether a reply was generated.
    pub success: bool,
    /// Generated reply; empty on failure.
    pub message: String,
    /// Resolved conversation id; absent on failure.
    pub conversation_id: Option<ConversationId>,
    /// Generic failure text; absent on success.
    pub error: Option<String>,
    /// Tokens billed for the call; zero on failure.
    pub tokens_used: u32,
}

impl ChatResult {
    /// Successful reply.
    #[must_use]
    pub const fn success(message: String, conversation_id: ConversationId, tokens_used: u32) -> Self {
        Self {
            success: true,
            message,
            conversation_id: Some(conversation_id),
            error: None,
            tokens_used,
        }
    }

    /// Opaque failure.
    #[must_use]
    pub fn failure() -> Self {
        Self {
            success: false,
            message: String::new(),
            conversation_id: None,
            error: Some(GENERIC_FAILURE_MESSAGE.to_string()),
            tokens_used: 0,
        }
    }
}
