//! Remote chat model client.

pub mod error;
pub mod model;
pub mod openai;

pub use error::{ModelError, ModelResult};
pub use model::{ChatModel, Completion, ModelFuture};
pub use openai::OpenAiChatModel;
