use crate::api::errors::ApiError;
use crate::api::AppState;
use crate::errors::ErrorKind;
use crate::protocol::{ChatRequest, ChatSuccess, ConversationEnd, HealthResponse};
use crate::utils::preview;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};
use std::any::Any;
use tracing::{debug, error, info, warn};

/// Reports liveness and whether upstream credentials are present
///
/// Never calls the completion API.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let deepseek_api = if state.relay.is_configured() {
        "configured"
    } else {
        "missing"
    };
    Json(HealthResponse {
        status: "healthy".to_string(),
        deepseek_api: deepseek_api.to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// Relays a conversation to the completion API
///
/// # Arguments
/// * `state` - Shared relay state
/// * `body` - Raw JSON body; decoded here so malformed payloads map to `INVALID_REQUEST`
///
/// # Returns
/// * `Result<Json<ChatSuccess>, ApiError>` - Completion, or a failure body carrying a fallback phrase
#[axum::debug_handler]
pub async fn chat(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ChatSuccess>, ApiError> {
    let request = parse_chat_request(body)?;
    let session = request.session_id.as_deref().unwrap_or("anonymous");
    info!(
        "Chat request from session {} with {} messages",
        session,
        request.messages.len()
    );
    if let Some(last) = request.messages.last() {
        debug!("Last {} message: {}", last.role, preview(&last.content, 80));
    }

    let completion = state
        .relay
        .complete(request.messages, request.temperature)
        .await?;

    Ok(Json(ChatSuccess {
        success: true,
        content: completion.content,
        usage: completion.usage,
        timestamp: Utc::now().to_rfc3339(),
    }))
}

/// Decodes a chat body; only `messages` is required to be well formed
///
/// A `temperature` that is not a number or a `sessionId` that is not a
/// string is ignored and the default applies.
fn parse_chat_request(body: Result<Json<Value>, JsonRejection>) -> Result<ChatRequest, ApiError> {
    let Json(mut value) = body.map_err(|e| {
        warn!("Rejected chat body: {}", e);
        ApiError::new(ErrorKind::InvalidRequest).with_message("Request body must be valid JSON")
    })?;

    let Some(messages) = value
        .get_mut("messages")
        .filter(|m| m.is_array())
        .map(Value::take)
    else {
        return Err(ApiError::new(ErrorKind::InvalidRequest)
            .with_message("Invalid request: messages array required"));
    };
    let messages = serde_json::from_value(messages).map_err(|e| {
        warn!("Rejected chat messages: {}", e);
        ApiError::new(ErrorKind::InvalidRequest).with_message(format!("Invalid request: {}", e))
    })?;

    let temperature = value.get("temperature").and_then(Value::as_f64);
    if temperature.is_none() && value.get("temperature").is_some_and(|t| !t.is_null()) {
        debug!("Ignoring non-numeric temperature");
    }
    let session_id = value
        .get("sessionId")
        .and_then(Value::as_str)
        .map(str::to_string);

    Ok(ChatRequest {
        messages,
        temperature,
        session_id,
    })
}

/// Logs a finished conversation; always succeeds
pub async fn conversation_end(body: Result<Json<Value>, JsonRejection>) -> Json<Value> {
    match body.map(|Json(v)| serde_json::from_value::<ConversationEnd>(v)) {
        Ok(Ok(conversation)) => {
            info!(
                "Conversation {} ended with {} messages",
                conversation.session_id,
                conversation.messages.len()
            );
            for message in &conversation.messages {
                debug!(
                    "[{}] {}: {}",
                    conversation.session_id,
                    message.role,
                    preview(&message.content, 200)
                );
            }
        }
        Ok(Err(e)) => warn!("Unreadable conversation log: {}", e),
        Err(e) => warn!("Unreadable conversation log body: {}", e),
    }
    Json(json!({ "success": true }))
}

/// Answers unmatched routes
pub async fn not_found() -> ApiError {
    ApiError::new(ErrorKind::NotFound).with_message("Endpoint not found")
}

/// Turns a handler panic into a `SERVER_ERROR` body
pub fn handle_panic(err: Box<dyn Any + Send + 'static>) -> axum::response::Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!("Handler panicked: {}", detail);
    axum::response::IntoResponse::into_response(ApiError::new(ErrorKind::ServerError))
}
