//! API routes configuration module

use crate::api::handlers::{chat, conversation_end, handle_panic, health, not_found};
use crate::api::rate_limit::limit_requests;
use crate::api::AppState;
use axum::http::{header, HeaderValue, Method};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::error;

/// Creates and configures the API router with all routes
///
/// # Arguments
/// * `state` - Relay and rate limiter shared across handlers
/// * `allowed_origin` - CORS origin, `*` for any
///
/// # Returns
/// * `Router` - Configured router with all API endpoints and middleware
pub fn app(state: AppState, allowed_origin: &str) -> Router {
    let limited = Router::new()
        .route("/api/chat", post(chat))
        .route("/api/conversation/end", post(conversation_end))
        .route_layer(middleware::from_fn_with_state(state.clone(), limit_requests));

    Router::new()
        .route("/api/health", get(health))
        .merge(limited)
        .fallback(not_found)
        .layer(cors_layer(allowed_origin))
        .layer(CatchPanicLayer::custom(handle_panic))
        .with_state(state)
}

fn cors_layer(allowed_origin: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    if allowed_origin == "*" {
        return layer.allow_origin(AllowOrigin::any());
    }
    match HeaderValue::from_str(allowed_origin) {
        Ok(origin) => layer.allow_origin(origin),
        Err(e) => {
            error!("Invalid ALLOWED_ORIGIN '{}': {}; cross-origin calls disabled", allowed_origin, e);
            layer
        }
    }
}
