//! Chat orchestration: store lookup, remote completion, history update.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, info};

use crate::chat::types::{ChatRequest, ChatResult};
use crate::config::HistoryPolicy;
use crate::conversation::errors::StoreError;
use crate::conversation::ids::ConversationId;
use crate::conversation::store::ConversationStore;
use crate::conversation::turn::Turn;
use crate::llm::error::ModelError;
use crate::llm::model::ChatModel;

/// Failure of a single chat call, before normalization.
#[derive(Debug, Error)]
pub enum ChatError {
    /// Store invariant violation.
    #[error("conversation store error: {0}")]
    Store(#[from] StoreError),
    /// Remote model failure.
    #[error("remote model error: {0}")]
    Model(#[from] ModelError),
}

/// Successful chat call.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ChatReply {
    /// Resolved conversation.
    pub conversation_id: ConversationId,
    /// Generated assistant text.
    pub message: String,
    /// Tokens billed for the call.
    pub tokens_used: u32,
}

impl From<ChatReply> for ChatResult {
    fn from(reply: ChatReply) -> Self {
        Self::success(reply.message, reply.conversation_id, reply.tokens_used)
    }
}

/// Chat orchestrator over a conversation store and a remote model.
pub struct ChatService {
    store: Arc<dyn ConversationStore>,
    model: Arc<dyn ChatModel>,
    history_policy: HistoryPolicy,
}

impl ChatService {
    /// Create a new orchestrator.
    #[must_use]
    pub const fn new(
        store: Arc<dyn ConversationStore>,
        model: Arc<dyn ChatModel>,
        history_policy: HistoryPolicy,
    ) -> Self {
        Self {
            store,
            model,
            history_policy,
        }
    }

    /// Shared conversation store.
    #[must_use]
    pub const fn store(&self) -> &Arc<dyn ConversationStore> {
        &self.store
    }

    /// Send a message and return a well-formed result.
    ///
    /// Failures are logged and reported as [`ChatResult::failure`]; the cause
    /// never reaches the caller.
    pub async fn send_message(&self, request: ChatRequest) -> ChatResult {
        match self.try_send_message(request).await {
            Ok(reply) => reply.into(),
            Err(err) => {
                error!("Error while processing chat message: {err}");
                ChatResult::failure()
            }
        }
    }

    /// Send a message, surfacing the failure cause.
    ///
    /// # Errors
    /// Returns an error if the store or the remote model fails.
    pub async fn try_send_message(&self, request: ChatRequest) -> Result<ChatReply, ChatError> {
        let requested = ConversationId::from_optional(request.conversation_id.as_deref());
        let (conversation_id, conversation) = self.store.get_or_create(requested).await;
        let user_turn = Turn::user(request.message);

        let completion = match self.history_policy {
            HistoryPolicy::CommitOnSuccess => {
                let mut history = conversation.into_turns();
                history.push(user_turn.clone());

                let completion = self.model.complete(&history).await?;
                self.store
                    .append_all(
                        &conversation_id,
                        vec![user_turn, Turn::assistant(completion.text.clone())],
                    )
                    .await?;
                completion
            }
            HistoryPolicy::AppendEagerly => {
                self.store.append(&conversation_id, user_turn).await?;
                // Re-read so turns appended concurrently since lookup are sent too.
                let history = self
                    .store
                    .get(&conversation_id)
                    .await
                    .ok_or_else(|| StoreError::NotFound(conversation_id.clone()))?
                    .into_turns();

                let completion = self.model.complete(&history).await?;
                self.store
                    .append(&conversation_id, Turn::assistant(completion.text.clone()))
                    .await?;
                completion
            }
        };

        debug!(
            "Conversation {conversation_id} answered with {} tokens",
            completion.total_tokens
        );
        info!(
            "Reply generated by {} for conversation {conversation_id}",
            self.model.model_name()
        );

        Ok(ChatReply {
            conversation_id,
            message: completion.text,
            tokens_used: completion.total_tokens,
        })
    }
}
