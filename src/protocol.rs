//! JSON bodies exchanged between the chat front-end and the relay.

use crate::errors::ErrorKind;
use crate::llm::ChatMessage;
use serde::{Deserialize, Serialize};

/// Body of `POST /api/chat`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ChatRequest {
    /// Most recent conversation messages, oldest first
    pub messages: Vec<ChatMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(rename = "sessionId", default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// Token accounting reported by the completion API
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ChatSuccess {
    pub success: bool,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    pub timestamp: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ChatFailure {
    pub success: bool,
    /// Human-readable description of the failure
    pub error: String,
    pub code: ErrorKind,
    /// In-character text the front-end can show instead of the error
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
}

/// Outcome of a chat call as seen on the wire
///
/// A success always carries `content`, a failure never does, which is what
/// tells the two apart when decoding.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum ChatResponse {
    Success(ChatSuccess),
    Failure(ChatFailure),
}

/// Body of `GET /api/health`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct HealthResponse {
    pub status: String,
    pub deepseek_api: String,
    pub timestamp: String,
}

/// Body of `POST /api/conversation/end`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ConversationEnd {
    pub messages: Vec<ChatMessage>,
    #[serde(rename = "sessionId")]
    pub session_id: String,
    pub timestamp: String,
}
