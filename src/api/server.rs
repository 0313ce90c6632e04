use crate::api::rate_limit::RateLimiter;
use crate::api::{routes, AppState};
use crate::config::RelayConfig;
use crate::constants::PERSONA_SYSTEM_PROMPT;
use crate::errors::Error;
use crate::llm::DeepSeekProvider;
use crate::relay::Relay;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

/// Starts and runs the relay HTTP server using Axum web framework
///
/// # Arguments
/// * `config` - Relay configuration built at startup
///
/// # Returns
/// * `Result<(), Error>` - Ok once the server shut down gracefully, Error if it could not start
pub async fn launch_server(config: RelayConfig) -> Result<(), Error> {
    let provider = DeepSeekProvider::new(&config.upstream)?;
    let relay = Relay::new(Arc::new(provider), PERSONA_SYSTEM_PROMPT);
    if !relay.is_configured() {
        warn!("DEEPSEEK_API_KEY is not set; chat requests will return fallback replies");
    }

    let state = AppState {
        relay,
        limiter: Arc::new(RateLimiter::new(config.rate_limit)),
    };
    let app = routes::app(state, &config.allowed_origin);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Relay listening on http://{}", listener.local_addr()?);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;
    info!("Relay stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
