//! Chat model abstraction.

use std::future::Future;
use std::pin::Pin;

use crate::conversation::turn::Turn;
use crate::llm::error::ModelResult;

/// Boxed future type for chat model operations.
pub type ModelFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Generated reply and its token usage.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Completion {
    /// Generated assistant text.
    pub text: String,
    /// Prompt plus completion tokens billed for the call.
    pub total_tokens: u32,
}

/// Trait abstraction over remote chat models.
pub trait ChatModel: Send + Sync {
    /// Generate the next assistant reply for an ordered turn history.
    ///
    /// # Errors
    /// Returns an error on any transport or model-side failure.
    fn complete<'a>(&'a self, history: &'a [Turn]) -> ModelFuture<'a, ModelResult<Completion>>;

    /// Model name, for logging.
    fn model_name(&self) -> &str;
}
