//! Startup helpers for the chatbot API server.

use std::process::ExitCode;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::config::{ChatbotConfig, Environment};
use crate::server::{self, AppState};

/// Initialize tracing. `RUST_LOG` wins; otherwise the environment picks the level.
pub fn init_tracing(environment: Environment) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(environment.default_log_level()));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Run the server until Ctrl-C.
///
/// # Returns
/// `ExitCode::SUCCESS` on graceful shutdown, `1` on failure.
#[must_use]
pub fn run() -> ExitCode {
    let environment = std::env::var("CHATBOT_ENV")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or_default();
    init_tracing(environment);

    let state = match initialize() {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to initialize: {e}");
            return ExitCode::from(1);
        }
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to create runtime: {e}");
            return ExitCode::from(1);
        }
    };

    let port = state.config.server.port;
    if let Err(e) = rt.block_on(server::run_server_with_shutdown(state, port, shutdown_signal())) {
        tracing::error!("Server error: {e}");
        return ExitCode::from(1);
    }

    tracing::info!("Chatbot API stopped");
    ExitCode::SUCCESS
}

/// Load configuration and build application state without starting the server.
///
/// # Errors
/// Returns an error if configuration is invalid or state creation fails.
pub fn initialize() -> Result<Arc<AppState>, Box<dyn std::error::Error + Send + Sync>> {
    let config = ChatbotConfig::from_env()?;

    tracing::info!("Starting Chatbot API v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Environment: {}", config.environment.as_str());
    tracing::info!("Model: {} via {}", config.openai.model, config.openai.base_url);
    match config.chat.max_conversations {
        Some(max) => tracing::info!("Conversation store bounded to {max} conversations"),
        None => tracing::info!("Conversation store is unbounded"),
    }

    let state = AppState::new(config).map_err(|e| format!("Failed to create state: {e}"))?;
    Ok(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
