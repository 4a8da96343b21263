//! `OpenAI`-compatible chat completions client.
//!
//! Sends the full turn history to `POST {base_url}/chat/completions` and
//! returns the first choice's text with the reported total token usage.
//! No retries: a failed call is reported once.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::OpenAiConfig;
use crate::conversation::turn::Turn;
use crate::llm::error::{ModelError, ModelResult};
use crate::llm::model::{ChatModel, Completion, ModelFuture};

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    total_tokens: u32,
}

/// Async client for an `OpenAI`-compatible chat completions endpoint.
pub struct OpenAiChatModel {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl OpenAiChatModel {
    /// Create a client from configuration.
    ///
    /// # Errors
    /// Returns an error if the API key is empty or the HTTP client cannot be built.
    pub fn new(config: &OpenAiConfig) -> ModelResult<Self> {
        if config.api_key.trim().is_empty() {
            return Err(ModelError::InvalidConfig("api key is empty".to_string()));
        }

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }

    async fn post_completion(&self, history: &[Turn]) -> ModelResult<Completion> {
        let request = ChatCompletionRequest {
            model: &self.model,
            messages: history
                .iter()
                .map(|turn| WireMessage {
                    role: turn.role().as_str(),
                    content: turn.content(),
                })
                .collect(),
        };

        debug!("Sending {} turns to {}", history.len(), self.endpoint);
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed = response.json::<ChatCompletionResponse>().await?;
        let text = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ModelError::MalformedResponse("no choices returned".to_string()))?
            .message
            .content
            .ok_or_else(|| ModelError::MalformedResponse("choice has no content".to_string()))?;
        let total_tokens = parsed.usage.map_or(0, |usage| usage.total_tokens);

        Ok(Completion { text, total_tokens })
    }
}

impl ChatModel for OpenAiChatModel {
    fn complete<'a>(&'a self, history: &'a [Turn]) -> ModelFuture<'a, ModelResult<Completion>> {
        Box::pin(self.post_completion(history))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::extract::State;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{Value, json};
    use tokio::sync::Mutex;

    #[derive(Clone)]
    struct Fake {
        status: StatusCode,
        reply: Value,
        seen: Arc<Mutex<Vec<(Option<String>, Value)>>>,
    }

    async fn fake_completions(
        State(fake): State<Fake>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> (StatusCode, Json<Value>) {
        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        fake.seen.lock().await.push((auth, body));
        (fake.status, Json(fake.reply.clone()))
    }

    async fn spawn_fake(fake: Fake) -> String {
        let app = Router::new()
            .route("/v1/chat/completions", post(fake_completions))
            .with_state(fake);
        let listener = match tokio::net::TcpListener::bind("127.0.0.1:0").await {
            Ok(listener) => listener,
            Err(err) => panic!("bind failed: {err}"),
        };
        let addr = match listener.local_addr() {
            Ok(addr) => addr,
            Err(err) => panic!("no local addr: {err}"),
        };
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        format!("http://{addr}/v1/")
    }

    fn config(base_url: String) -> OpenAiConfig {
        OpenAiConfig {
            api_key: "sk-test".to_string(),
            base_url,
            ..OpenAiConfig::default()
        }
    }

    fn fake(status: StatusCode, reply: Value) -> Fake {
        Fake {
            status,
            reply,
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    #[test]
    fn test_empty_api_key_is_rejected() {
        let result = OpenAiChatModel::new(&OpenAiConfig::default());
        assert!(matches!(result, Err(ModelError::InvalidConfig(_))));
    }

    #[test]
    fn test_model_name_reports_configured_model() {
        let config = OpenAiConfig {
            model: "gpt-4o".to_string(),
            ..config("http://127.0.0.1:1".to_string())
        };
        let model = match OpenAiChatModel::new(&config) {
            Ok(model) => model,
            Err(err) => panic!("client build failed: {err}"),
        };
        let model: &dyn ChatModel = &model;
        assert_eq!(model.model_name(), "gpt-4o");
    }

    #[tokio::test]
    async fn test_complete_sends_history_and_parses_reply() {
        let fake = fake(
            StatusCode::OK,
            json!({
                "choices": [{"message": {"role": "assistant", "content": "Hi there"}}],
                "usage": {"prompt_tokens": 9, "completion_tokens": 3, "total_tokens": 12}
            }),
        );
        let seen = Arc::clone(&fake.seen);
        let base_url = spawn_fake(fake).await;

        let model = match OpenAiChatModel::new(&config(base_url)) {
            Ok(model) => model,
            Err(err) => panic!("client build failed: {err}"),
        };
        let history = vec![Turn::system("Be helpful."), Turn::user("Hello")];
        let completion = model.complete(&history).await;

        assert!(matches!(
            completion,
            Ok(Completion { ref text, total_tokens: 12 }) if text == "Hi there"
        ));

        let seen = seen.lock().await;
        assert_eq!(seen.len(), 1);
        let (auth, body) = &seen[0];
        assert_eq!(auth.as_deref(), Some("Bearer sk-test"));
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(
            body["messages"],
            json!([
                {"role": "system", "content": "Be helpful."},
                {"role": "user", "content": "Hello"}
            ])
        );
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let fake = fake(
            StatusCode::TOO_MANY_REQUESTS,
            json!({"error": {"message": "quota exceeded"}}),
        );
        let base_url = spawn_fake(fake).await;
        let model = match OpenAiChatModel::new(&config(base_url)) {
            Ok(model) => model,
            Err(err) => panic!("client build failed: {err}"),
        };

        let result = model.complete(&[Turn::user("Hello")]).await;
        match result {
            Err(ModelError::Status { status, body }) => {
                assert_eq!(status, 429);
                assert!(body.contains("quota exceeded"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_choices_is_malformed() {
        let fake = fake(StatusCode::OK, json!({"choices": []}));
        let base_url = spawn_fake(fake).await;
        let model = match OpenAiChatModel::new(&config(base_url)) {
            Ok(model) => model,
            Err(err) => panic!("client build failed: {err}"),
        };

        let result = model.complete(&[Turn::user("Hello")]).await;
        assert!(matches!(result, Err(ModelError::MalformedResponse(_))));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_http_error() {
        let model = match OpenAiChatModel::new(&config("http://127.0.0.1:1".to_string())) {
            Ok(model) => model,
            Err(err) => panic!("client build failed: {err}"),
        };
        let result = model.complete(&[Turn::user("Hello")]).await;
        assert!(matches!(result, Err(ModelError::Http(_))));
    }
}
