//! HTTP server for the chatbot API.
//!
//! Provides REST endpoints for:
//! - Sending chat messages
//! - Clearing a conversation (acknowledgement only)
//! - Health checks

pub mod error;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, Method};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::{Environment, ServerConfig};

/// Build the CORS policy for an environment.
///
/// Development allows any origin; production only the configured one.
pub fn cors_layer(environment: Environment, server: &ServerConfig) -> CorsLayer {
    match environment {
        Environment::Development => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
        Environment::Production => {
            let origin = match HeaderValue::from_str(&server.allowed_origin) {
                Ok(origin) => AllowOrigin::list([origin]),
                Err(err) => {
                    tracing::warn!(
                        "Invalid allowed origin {:?}: {err}; cross-origin requests will be refused",
                        server.allowed_origin
                    );
                    AllowOrigin::list(std::iter::empty())
                }
            };
            CorsLayer::new()
                .allow_origin(origin)
                .allow_methods([Method::GET, Method::POST, Method::DELETE])
                .allow_headers([CONTENT_TYPE])
                .allow_credentials(true)
        }
    }
}

/// Router with CORS and request tracing applied.
pub fn build_app(state: Arc<AppState>) -> Router {
    let cors = cors_layer(state.config.environment, &state.config.server);

    create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Start the HTTP server.
///
/// # Errors
/// Returns an error if the server fails to start.
pub async fn run_server(state: Arc<AppState>, port: u16) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    run_server_with_shutdown(state, port, std::future::pending()).await
}

/// Start the HTTP server with graceful shutdown support.
///
/// The server will stop accepting new connections when `shutdown_signal` completes.
///
/// # Errors
/// Returns an error if the server fails to start.
pub async fn run_server_with_shutdown<F>(
    state: Arc<AppState>,
    port: u16,
    shutdown_signal: F,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Chatbot API listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::chat::service::tests::MockModel;
    use crate::config::ChatbotConfig;
    use crate::conversation::store::InMemoryConversationStore;

    fn app(environment: Environment) -> Router {
        let config = ChatbotConfig {
            environment,
            ..ChatbotConfig::default()
        };
        let store = Arc::new(InMemoryConversationStore::new("test"));
        build_app(AppState::with_backends(
            config,
            store,
            Arc::new(MockModel::replying("Hi", 1)),
        ))
    }

    fn preflight(origin: &str) -> Request<Body> {
        Request::builder()
            .method("OPTIONS")
            .uri("/api/chat/message")
            .header("origin", origin)
            .header("access-control-request-method", "POST")
            .body(Body::empty())
            .unwrap_or_default()
    }

    async fn allowed_origin(app: Router, request: Request<Body>) -> Option<String> {
        let response = match app.oneshot(request).await {
            Ok(response) => response,
            Err(err) => match err {},
        };
        assert_eq!(response.status(), StatusCode::OK);
        response
            .headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    #[tokio::test]
    async fn test_development_cors_allows_any_origin() {
        let origin = allowed_origin(
            app(Environment::Development),
            preflight("http://example.com"),
        )
        .await;
        assert_eq!(origin.as_deref(), Some("*"));
    }

    #[tokio::test]
    async fn test_production_cors_allows_configured_origin_only() {
        let allowed = allowed_origin(
            app(Environment::Production),
            preflight("http://localhost:4200"),
        )
        .await;
        assert_eq!(allowed.as_deref(), Some("http://localhost:4200"));

        let refused = allowed_origin(
            app(Environment::Production),
            preflight("http://evil.example"),
        )
        .await;
        assert!(refused.is_none());
    }

    #[tokio::test]
    async fn test_production_cors_ignores_origin_prefix_match() {
        let lookalike = allowed_origin(
            app(Environment::Production),
            preflight("http://localhost:42000"),
        )
        .await;
        assert_eq!(lookalike, None);
    }
}
