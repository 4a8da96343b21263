//! Application state shared across all request handlers.

use std::sync::Arc;

use crate::chat::service::ChatService;
use crate::config::ChatbotConfig;
use crate::conversation::store::{ConversationStore, build_store};
use crate::llm::error::ModelResult;
use crate::llm::model::ChatModel;
use crate::llm::openai::OpenAiChatModel;

/// Shared application state.
pub struct AppState {
    /// Chat orchestrator.
    pub chat: ChatService,
    /// Loaded configuration.
    pub config: ChatbotConfig,
}

impl AppState {
    /// Build state with the configured store and the `OpenAI` client.
    ///
    /// # Errors
    /// Returns an error if the model client cannot be created.
    pub fn new(config: ChatbotConfig) -> ModelResult<Arc<Self>> {
        let store = build_store(&config.chat.system_prompt, config.chat.max_conversations);
        let model = Arc::new(OpenAiChatModel::new(&config.openai)?);
        Ok(Self::with_backends(config, store, model))
    }

    /// Build state from explicit backends.
    #[must_use]
    pub fn with_backends(
        config: ChatbotConfig,
        store: Arc<dyn ConversationStore>,
        model: Arc<dyn ChatModel>,
    ) -> Arc<Self> {
        let chat = ChatService::new(store, model, config.chat.history_policy);
        Arc::new(Self { chat, config })
    }
}
