use super::{Completion, CompletionProvider, CompletionRequest, UpstreamError};
use crate::config::UpstreamConfig;
use crate::constants::{FREQUENCY_PENALTY, MAX_OUTPUT_TOKENS, PRESENCE_PENALTY, TOP_P};
use crate::protocol::Usage;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::debug;

/// Provider implementation for DeepSeek's API
#[derive(Debug)]
pub struct DeepSeekProvider {
    client: Client,
    /// Bearer token; `None` when not configured
    api_key: Option<String>,
    /// Chat completions endpoint
    api_url: String,
    /// Model identifier to use (e.g. "deepseek-chat")
    model: String,
}

impl DeepSeekProvider {
    /// Creates a new DeepSeek provider instance
    ///
    /// # Arguments
    /// * `config` - Upstream settings; the timeout bounds every call
    ///
    /// # Returns
    /// * `Result<Self, reqwest::Error>` - Provider instance or error if the HTTP client cannot be built
    pub fn new(config: &UpstreamConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(DeepSeekProvider {
            client,
            api_key: config.api_key.clone(),
            api_url: config.api_url.clone(),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl CompletionProvider for DeepSeekProvider {
    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Calls DeepSeek's chat completions API
    ///
    /// # Arguments
    /// * `request` - Conversation messages and sampling temperature
    ///
    /// # Returns
    /// * `Result<Completion, UpstreamError>` - Generated response text and usage, or the mapped failure
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, UpstreamError> {
        let api_key = self.api_key.as_ref().ok_or(UpstreamError::MissingApiKey)?;
        let request_body = json!({
          "model": self.model,
          "messages": request.messages,
          "temperature": request.temperature,
          "max_tokens": MAX_OUTPUT_TOKENS,
          "top_p": TOP_P,
          "frequency_penalty": FREQUENCY_PENALTY,
          "presence_penalty": PRESENCE_PENALTY,
          "stream": false
        });

        let res = self
            .client
            .post(&self.api_url)
            .bearer_auth(api_key)
            .json(&request_body)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let json_resp: serde_json::Value = res.json().await?;
        let usage = json_resp
            .get("usage")
            .and_then(|u| serde_json::from_value::<Usage>(u.clone()).ok());
        debug!("DeepSeek usage: {:?}", usage);

        if let Some(content) = json_resp["choices"][0]["message"]["content"].as_str() {
            Ok(Completion {
                content: content.trim().to_string(),
                usage,
            })
        } else {
            Err(UpstreamError::Malformed(
                "No content in DeepSeek LLM response".into(),
            ))
        }
    }
}
