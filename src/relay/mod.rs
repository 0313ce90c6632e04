//! Completion relay: persona injection, the upstream call and failure mapping.

mod fallback;

pub use fallback::pick_fallback;

use crate::constants::{DEFAULT_TEMPERATURE, RELAY_FALLBACKS};
use crate::errors::ErrorKind;
use crate::llm::{ChatMessage, Completion, CompletionProvider, CompletionRequest, Role};
use std::sync::Arc;
use tracing::{debug, warn};

/// A failed relay call, already mapped to something safe to show
#[derive(Debug, Clone, PartialEq)]
pub struct RelayFailure {
    pub kind: ErrorKind,
    pub message: String,
    pub fallback: String,
}

impl RelayFailure {
    pub fn new(kind: ErrorKind) -> Self {
        RelayFailure {
            kind,
            message: kind.user_message().to_string(),
            fallback: pick_fallback(RELAY_FALLBACKS, None).to_string(),
        }
    }
}

/// Forwards conversations to the completion provider under a fixed persona
#[derive(Debug, Clone)]
pub struct Relay {
    provider: Arc<dyn CompletionProvider>,
    persona: String,
}

impl Relay {
    pub fn new(provider: Arc<dyn CompletionProvider>, persona: &str) -> Self {
        Relay {
            provider,
            persona: persona.to_string(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.provider.is_configured()
    }

    /// Returns the messages led by exactly one system message
    ///
    /// A conversation that already opens with a system message is passed
    /// through. Otherwise the persona prompt goes first and system messages
    /// found later in the conversation are dropped. The boolean tells
    /// whether the prompt was injected.
    pub fn ensure_persona(&self, messages: Vec<ChatMessage>) -> (Vec<ChatMessage>, bool) {
        if messages.first().is_some_and(|m| m.role == Role::System) {
            return (messages, false);
        }
        let mut with_persona = Vec::with_capacity(messages.len() + 1);
        with_persona.push(ChatMessage::system(&self.persona));
        let before = messages.len();
        with_persona.extend(messages.into_iter().filter(|m| m.role != Role::System));
        let dropped = before + 1 - with_persona.len();
        if dropped > 0 {
            debug!("Dropped {} non-leading system message(s)", dropped);
        }
        (with_persona, true)
    }

    /// Runs one completion for `messages`
    ///
    /// # Arguments
    /// * `messages` - Conversation as received from the front-end
    /// * `temperature` - Requested sampling temperature, clamped to `[0, 2]`
    ///
    /// # Returns
    /// * `Result<Completion, RelayFailure>` - The completion, or the mapped failure with a fallback phrase
    pub async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        temperature: Option<f64>,
    ) -> Result<Completion, RelayFailure> {
        let (messages, injected) = self.ensure_persona(messages);
        debug!(
            "Relaying {} messages (persona injected: {})",
            messages.len(),
            injected
        );

        let temperature = temperature
            .filter(|t| t.is_finite())
            .unwrap_or(DEFAULT_TEMPERATURE)
            .clamp(0.0, 2.0);

        self.provider
            .complete(CompletionRequest {
                messages,
                temperature,
            })
            .await
            .map_err(|e| {
                let kind = e.kind();
                warn!("Completion failed ({}): {}", kind, e);
                RelayFailure::new(kind)
            })
    }
}
