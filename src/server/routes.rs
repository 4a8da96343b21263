//! HTTP route handlers for the chatbot API.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::Utc;
use tracing::{error, info, warn};

use crate::chat::types::{ChatRequest, ChatResult};

use super::error::ApiError;
use super::state::AppState;

/// Create the API router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/chat/message", post(send_message))
        .route(
            "/api/chat/conversation/{conversation_id}",
            delete(clear_conversation),
        )
        .route("/api/chat/health", get(health_check))
        .with_state(state)
}

/// Send a message to the chatbot and return its reply.
async fn send_message(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ChatResult>), ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        warn!("Rejected chat request body: {rejection}");
        ApiError::Validation(vec![rejection.body_text()])
    })?;

    if let Err(errors) = request.validate() {
        warn!("Invalid chat request: {}", errors.join(", "));
        return Err(ApiError::Validation(errors));
    }

    info!(
        "Received message ({} chars) | conversation: {}",
        request.message.chars().count(),
        request.conversation_id.as_deref().unwrap_or("new conversation")
    );

    let result = state.chat.send_message(request).await;
    if !result.success {
        error!(
            "Failed to process chat message: {}",
            result.error.as_deref().unwrap_or_default()
        );
        return Ok((StatusCode::INTERNAL_SERVER_ERROR, Json(result)));
    }

    info!("Reply generated. Tokens used: {}", result.tokens_used);
    Ok((StatusCode::OK, Json(result)))
}

/// Acknowledge a request to clear a conversation.
///
/// Stored history is left untouched; the store exposes no removal operation.
async fn clear_conversation(Path(conversation_id): Path<String>) -> Result<impl IntoResponse, ApiError> {
    if conversation_id.trim().is_empty() {
        return Err(ApiError::BadRequest("Invalid conversation id.".to_string()));
    }

    info!("Clear requested for conversation {conversation_id}");

    Ok(Json(serde_json::json!({
        "message": "Conversation clear acknowledged; stored history is unchanged.",
        "conversationId": conversation_id,
        "clearedAt": Utc::now(),
    })))
}

/// Health check endpoint.
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "chatbot-api",
        "timestamp": Utc::now(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}
