use crate::errors::ErrorKind;
use crate::protocol::{ChatFailure, ChatRequest, ChatResponse, ConversationEnd};
use async_trait::async_trait;
use reqwest::Client;
use std::fmt::Debug;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// The relay could not be reached or gave nothing usable
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Invalid relay URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Relay request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Relay answered with status {0}")]
    Status(u16),
}

/// Calls the front-end makes to the relay
#[async_trait]
pub trait RelayTransport: Debug + Send + Sync {
    /// Lightweight liveness check against `/api/health`
    async fn ping(&self) -> Result<(), TransportError>;

    /// Sends one chat request; relay-side failures come back as `ChatResponse::Failure`
    async fn send_chat(&self, request: &ChatRequest) -> Result<ChatResponse, TransportError>;

    async fn end_conversation(&self, conversation: &ConversationEnd) -> Result<(), TransportError>;
}

/// `RelayTransport` over HTTP
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base: Url,
}

impl HttpTransport {
    /// Creates a transport for the relay at `relay_url`
    ///
    /// # Arguments
    /// * `relay_url` - Base URL of the relay, e.g. `http://localhost:3000`
    pub fn new(relay_url: &str) -> Result<Self, TransportError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()?;
        Ok(HttpTransport {
            client,
            base: Url::parse(relay_url)?,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, TransportError> {
        Ok(self.base.join(path)?)
    }
}

#[async_trait]
impl RelayTransport for HttpTransport {
    async fn ping(&self) -> Result<(), TransportError> {
        let res = self
            .client
            .get(self.endpoint("/api/health")?)
            .timeout(Duration::from_secs(5))
            .send()
            .await?;
        if res.status().is_success() {
            Ok(())
        } else {
            Err(TransportError::Status(res.status().as_u16()))
        }
    }

    async fn send_chat(&self, request: &ChatRequest) -> Result<ChatResponse, TransportError> {
        let res = self
            .client
            .post(self.endpoint("/api/chat")?)
            .json(request)
            .send()
            .await?;
        let status = res.status();
        let body = res.bytes().await?;

        match serde_json::from_slice::<ChatResponse>(&body) {
            Ok(response) => Ok(response),
            Err(e) => {
                debug!("Unreadable relay response ({}): {}", status, e);
                Ok(ChatResponse::Failure(ChatFailure {
                    success: false,
                    error: format!("Relay answered with status {}", status.as_u16()),
                    code: ErrorKind::ServerError,
                    fallback: None,
                }))
            }
        }
    }

    async fn end_conversation(&self, conversation: &ConversationEnd) -> Result<(), TransportError> {
        let res = self
            .client
            .post(self.endpoint("/api/conversation/end")?)
            .json(conversation)
            .send()
            .await?;
        if res.status().is_success() {
            Ok(())
        } else {
            Err(TransportError::Status(res.status().as_u16()))
        }
    }
}
