use crate::errors::ErrorKind;
use crate::llm::ChatMessage;
use crate::protocol::Usage;
use async_trait::async_trait;
use std::fmt::Debug;

pub mod deepseek;

/// A single non-streaming completion call
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: f64,
}

/// Text produced by the completion API
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub content: String,
    pub usage: Option<Usage>,
}

/// Failures of a completion call
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("Completion API key is not configured")]
    MissingApiKey,
    #[error("Completion API returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Completion API timed out")]
    Timeout,
    #[error("Completion API unreachable: {0}")]
    Network(String),
    #[error("Unexpected completion API response: {0}")]
    Malformed(String),
}

impl UpstreamError {
    /// Maps the failure onto the stable error taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            UpstreamError::MissingApiKey => ErrorKind::InvalidApiKey,
            UpstreamError::Status { status, .. } => ErrorKind::from_upstream_status(*status),
            UpstreamError::Timeout => ErrorKind::Timeout,
            UpstreamError::Network(_) => ErrorKind::NetworkError,
            UpstreamError::Malformed(_) => ErrorKind::ApiError,
        }
    }
}

impl From<reqwest::Error> for UpstreamError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            UpstreamError::Timeout
        } else if e.is_decode() {
            UpstreamError::Malformed(e.to_string())
        } else {
            UpstreamError::Network(e.to_string())
        }
    }
}

#[async_trait]
pub trait CompletionProvider: Debug + Send + Sync {
    /// Whether credentials for the API are present
    fn is_configured(&self) -> bool;

    async fn complete(&self, request: CompletionRequest) -> Result<Completion, UpstreamError>;
}
