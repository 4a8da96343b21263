//! Service configuration.
//!
//! Settings come from environment variables; anything unset falls back to
//! [`Default`]. Only `OPENAI_API_KEY` is mandatory.

use std::collections::HashMap;
use std::hash::BuildHasher;
use std::num::NonZeroUsize;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Default model when `OPENAI_MODEL` is unset.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
/// Default API root when `OPENAI_BASE_URL` is unset.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
/// Default listen port.
pub const DEFAULT_PORT: u16 = 5000;
/// Default CORS origin allowed in production.
pub const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:4200";
/// System framing for new conversations.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful and friendly assistant.";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required variable is missing or blank.
    #[error("missing required setting: {0}")]
    Missing(&'static str),
    /// A variable could not be parsed.
    #[error("invalid value for {name}: {value}")]
    InvalidValue {
        /// Variable name.
        name: &'static str,
        /// Offending value.
        value: String,
    },
    /// Invalid configuration or unsupported values.
    #[error("invalid configuration: {0}")]
    Invalid(String),
    /// URL parse error.
    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),
}

/// Convenience result alias for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Deployment environment.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    /// Verbose logging, permissive CORS.
    #[default]
    Development,
    /// Quiet logging, CORS restricted to the configured origin.
    Production,
}

impl Environment {
    /// Log filter used when `RUST_LOG` is unset.
    #[must_use]
    pub const fn default_log_level(self) -> &'static str {
        match self {
            Self::Development => "info",
            Self::Production => "warn",
        }
    }

    /// Stable string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            _ => Err(value.to_string()),
        }
    }
}

/// When the user turn of a call is committed to the store.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryPolicy {
    /// Commit user and assistant turns together after a successful reply.
    #[default]
    CommitOnSuccess,
    /// Append the user turn before the remote call and keep it on failure.
    AppendEagerly,
}

impl FromStr for HistoryPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "commit_on_success" => Ok(Self::CommitOnSuccess),
            "append_eagerly" => Ok(Self::AppendEagerly),
            _ => Err(value.to_string()),
        }
    }
}

/// Remote model settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// Bearer token.
    #[serde(default, skip_serializing)]
    pub api_key: String,
    /// Model name.
    pub model: String,
    /// API root, without the `/chat/completions` suffix.
    pub base_url: String,
    /// Connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Total request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout_secs: 10,
            request_timeout_secs: 120,
        }
    }
}

/// HTTP server settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen port.
    pub port: u16,
    /// Origin allowed by CORS in production.
    pub allowed_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            allowed_origin: DEFAULT_ALLOWED_ORIGIN.to_string(),
        }
    }
}

/// Conversation handling settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatConfig {
    /// System turn opening every conversation.
    pub system_prompt: String,
    /// Capacity bound; `None` keeps every conversation for the process lifetime.
    pub max_conversations: Option<NonZeroUsize>,
    /// User turn commit policy.
    pub history_policy: HistoryPolicy,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            max_conversations: None,
            history_policy: HistoryPolicy::default(),
        }
    }
}

/// Top-level configuration for the chatbot service.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ChatbotConfig {
    /// Deployment environment.
    pub environment: Environment,
    /// Remote model settings.
    pub openai: OpenAiConfig,
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Conversation settings.
    pub chat: ChatConfig,
}

impl ChatbotConfig {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    /// Returns an error if the API key is missing or a value is malformed.
    pub fn from_env() -> ConfigResult<Self> {
        let vars: HashMap<String, String> = std::env::vars().collect();
        Self::from_vars(&vars)
    }

    /// Load configuration from an explicit variable map.
    ///
    /// # Errors
    /// Returns an error if the API key is missing or a value is malformed.
    pub fn from_vars<S: BuildHasher>(vars: &HashMap<String, String, S>) -> ConfigResult<Self> {
        let get = |name: &str| {
            vars.get(name)
                .map(String::as_str)
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let mut config = Self::default();

        config.openai.api_key = get("OPENAI_API_KEY").ok_or(ConfigError::Missing("OPENAI_API_KEY"))?;
        if let Some(model) = get("OPENAI_MODEL") {
            config.openai.model = model;
        }
        if let Some(base_url) = get("OPENAI_BASE_URL") {
            config.openai.base_url = base_url;
        }
        if let Some(secs) = get("CHATBOT_CONNECT_TIMEOUT_SECS") {
            config.openai.connect_timeout_secs = parse_var("CHATBOT_CONNECT_TIMEOUT_SECS", &secs)?;
        }
        if let Some(secs) = get("CHATBOT_REQUEST_TIMEOUT_SECS") {
            config.openai.request_timeout_secs = parse_var("CHATBOT_REQUEST_TIMEOUT_SECS", &secs)?;
        }

        if let Some(env) = get("CHATBOT_ENV") {
            config.environment = parse_var("CHATBOT_ENV", &env)?;
        }
        if let Some(port) = get("CHATBOT_PORT") {
            config.server.port = parse_var("CHATBOT_PORT", &port)?;
        }
        if let Some(origin) = get("CHATBOT_ALLOWED_ORIGIN") {
            config.server.allowed_origin = origin;
        }

        if let Some(prompt) = get("CHATBOT_SYSTEM_PROMPT") {
            config.chat.system_prompt = prompt;
        }
        if let Some(max) = get("CHATBOT_MAX_CONVERSATIONS") {
            config.chat.max_conversations = Some(parse_var("CHATBOT_MAX_CONVERSATIONS", &max)?);
        }
        if let Some(policy) = get("CHATBOT_HISTORY_POLICY") {
            config.chat.history_policy = parse_var("CHATBOT_HISTORY_POLICY", &policy)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    /// Returns an error if any values are out of range or invalid.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.openai.api_key.trim().is_empty() {
            return Err(ConfigError::Missing("OPENAI_API_KEY"));
        }

        if self.openai.model.trim().is_empty() {
            return Err(ConfigError::Invalid("openai.model must not be empty".to_string()));
        }

        if self.openai.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "openai.request_timeout_secs must be > 0".to_string(),
            ));
        }

        if self.chat.system_prompt.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "chat.system_prompt must not be empty".to_string(),
            ));
        }

        Url::parse(&self.openai.base_url)?;
        Url::parse(&self.server.allowed_origin)?;

        Ok(())
    }
}

fn parse_var<T: FromStr>(name: &'static str, value: &str) -> ConfigResult<T> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        name,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_default_config() {
        let config = ChatbotConfig::default();
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.openai.model, "gpt-4o-mini");
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.chat.history_policy, HistoryPolicy::CommitOnSuccess);
        assert!(config.chat.max_conversations.is_none());
    }

    #[test]
    fn test_missing_api_key() {
        let result = ChatbotConfig::from_vars(&vars(&[("OPENAI_MODEL", "gpt-4o")]));
        assert!(matches!(result, Err(ConfigError::Missing("OPENAI_API_KEY"))));

        let blank = ChatbotConfig::from_vars(&vars(&[("OPENAI_API_KEY", "  ")]));
        assert!(matches!(blank, Err(ConfigError::Missing("OPENAI_API_KEY"))));
    }

    #[test]
    fn test_from_vars_overrides() {
        let config = ChatbotConfig::from_vars(&vars(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_MODEL", "gpt-4o"),
            ("CHATBOT_ENV", "production"),
            ("CHATBOT_PORT", "8080"),
            ("CHATBOT_MAX_CONVERSATIONS", "100"),
            ("CHATBOT_HISTORY_POLICY", "append_eagerly"),
        ]));

        let config = match config {
            Ok(config) => config,
            Err(err) => panic!("expected valid config: {err}"),
        };
        assert_eq!(config.openai.api_key, "sk-test");
        assert_eq!(config.openai.model, "gpt-4o");
        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.chat.max_conversations, NonZeroUsize::new(100));
        assert_eq!(config.chat.history_policy, HistoryPolicy::AppendEagerly);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let port = ChatbotConfig::from_vars(&vars(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("CHATBOT_PORT", "not-a-port"),
        ]));
        assert!(matches!(
            port,
            Err(ConfigError::InvalidValue { name: "CHATBOT_PORT", .. })
        ));

        let zero = ChatbotConfig::from_vars(&vars(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("CHATBOT_MAX_CONVERSATIONS", "0"),
        ]));
        assert!(matches!(zero, Err(ConfigError::InvalidValue { .. })));

        let url = ChatbotConfig::from_vars(&vars(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_BASE_URL", "not a url"),
        ]));
        assert!(matches!(url, Err(ConfigError::Url(_))));
    }

    #[test]
    fn test_environment_log_levels() {
        assert_eq!("prod".parse::<Environment>(), Ok(Environment::Production));
        assert_eq!(Environment::Development.default_log_level(), "info");
        assert_eq!(Environment::Production.default_log_level(), "warn");
    }
}
