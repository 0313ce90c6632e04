mod parser;

use std::time::Duration;

pub use parser::{load_relay_config, parse_relay_config};

/// Errors raised while reading configuration values
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be a number, got '{value}'")]
    InvalidNumber { var: &'static str, value: String },
    #[error("{var} must be a duration such as '30s', got '{value}'")]
    InvalidDuration { var: &'static str, value: String },
    #[error("{var} must be greater than zero")]
    Zero { var: &'static str },
}

/// Settings for the completion API the relay forwards to
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    /// Bearer token; `None` when not configured
    pub api_key: Option<String>,
    /// Full URL of the chat-completion endpoint
    pub api_url: String,
    /// Model identifier (e.g. "deepseek-chat")
    pub model: String,
    /// Upper bound on a single completion call
    pub timeout: Duration,
}

/// Fixed-window request budget per client address
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub window: Duration,
    pub max_requests: u32,
}

/// Configuration of the relay server, built once at startup
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub upstream: UpstreamConfig,
    /// CORS origin allowed to call the relay; `*` allows any
    pub allowed_origin: String,
    pub rate_limit: RateLimitConfig,
    pub port: u16,
}

impl RelayConfig {
    /// Whether upstream credentials are present
    pub fn api_configured(&self) -> bool {
        self.upstream.api_key.is_some()
    }
}

/// Configuration of the chat front-end
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the relay, e.g. `http://localhost:3000`
    pub relay_url: String,
    pub temperature: f64,
    pub max_connect_attempts: u32,
    pub retry_delay: Duration,
    /// Number of most recent messages sent per request
    pub history_window: usize,
}
