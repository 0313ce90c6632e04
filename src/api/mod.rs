/// API error types and handling
pub mod errors;
/// HTTP handlers for the relay endpoints
pub mod handlers;
/// Per-client request budget
pub mod rate_limit;
/// Routes configuration and setup
pub mod routes;
/// HTTP server implementation
pub mod server;

use crate::relay::Relay;
use rate_limit::RateLimiter;
use std::sync::Arc;

/// Shared state for all axum handlers
#[derive(Clone)]
pub struct AppState {
    pub relay: Relay,
    pub limiter: Arc<RateLimiter>,
}
