//! Chat orchestration.

pub mod service;
pub mod types;

pub use service::{ChatError, ChatReply, ChatService};
pub use types::{ChatRequest, ChatResult, GENERIC_FAILURE_MESSAGE, MAX_MESSAGE_CHARS};
