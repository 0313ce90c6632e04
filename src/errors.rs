use crate::client::TransportError;
use crate::config::ConfigError;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Application-level failures surfaced by the subcommands
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Relay error: {0}")]
    Transport(#[from] TransportError),
    #[error("Relay at {0} is unreachable")]
    Unreachable(String),
}

/// Stable failure taxonomy shared by the relay and its clients
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    InvalidRequest,
    InvalidApiKey,
    RateLimited,
    ServiceUnavailable,
    ApiError,
    Timeout,
    NetworkError,
    ServerError,
    NotFound,
}

impl ErrorKind {
    /// Fixed lookup from an upstream HTTP status to a failure kind
    pub fn from_upstream_status(status: u16) -> Self {
        match status {
            401 => ErrorKind::InvalidApiKey,
            429 => ErrorKind::RateLimited,
            503 | 504 => ErrorKind::ServiceUnavailable,
            _ => ErrorKind::ApiError,
        }
    }

    /// Wire name, as it appears in the `code` field
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::InvalidRequest => "INVALID_REQUEST",
            ErrorKind::InvalidApiKey => "INVALID_API_KEY",
            ErrorKind::RateLimited => "RATE_LIMITED",
            ErrorKind::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            ErrorKind::ApiError => "API_ERROR",
            ErrorKind::Timeout => "TIMEOUT",
            ErrorKind::NetworkError => "NETWORK_ERROR",
            ErrorKind::ServerError => "SERVER_ERROR",
            ErrorKind::NotFound => "NOT_FOUND",
        }
    }

    /// Status the relay answers with for this kind
    pub fn http_status(self) -> StatusCode {
        match self {
            ErrorKind::InvalidRequest => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::ServerError => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::InvalidApiKey
            | ErrorKind::RateLimited
            | ErrorKind::ServiceUnavailable
            | ErrorKind::ApiError
            | ErrorKind::Timeout
            | ErrorKind::NetworkError => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Human-readable description safe to show to the person chatting
    pub fn user_message(self) -> &'static str {
        match self {
            ErrorKind::InvalidRequest => "The request was malformed",
            ErrorKind::InvalidApiKey => "The assistant is not configured correctly",
            ErrorKind::RateLimited => "Too many requests, please slow down",
            ErrorKind::ServiceUnavailable => "The assistant service is temporarily unavailable",
            ErrorKind::ApiError => "The assistant service returned an error",
            ErrorKind::Timeout => "The assistant took too long to answer",
            ErrorKind::NetworkError => "Could not reach the assistant service",
            ErrorKind::ServerError => "Internal server error",
            ErrorKind::NotFound => "Not found",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
