use crate::api::errors::ApiError;
use crate::api::AppState;
use crate::config::RateLimitConfig;
use crate::errors::ErrorKind;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::warn;

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Fixed-window request counter keyed by client address
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    windows: Mutex<HashMap<IpAddr, Window>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        RateLimiter {
            config,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Counts one request from `client`
    ///
    /// Returns `Err` with the time left in the current window once the
    /// budget is spent.
    pub fn check(&self, client: IpAddr) -> Result<(), Duration> {
        self.check_at(client, Instant::now())
    }

    fn check_at(&self, client: IpAddr, now: Instant) -> Result<(), Duration> {
        let mut windows = self.windows.lock().unwrap_or_else(|poisoned| {
            warn!("Rate limiter lock poisoned, recovering...");
            poisoned.into_inner()
        });

        windows.retain(|_, w| now.duration_since(w.started) < self.config.window);

        let window = windows.entry(client).or_insert(Window {
            started: now,
            count: 0,
        });
        if window.count >= self.config.max_requests {
            let elapsed = now.duration_since(window.started);
            return Err(self.config.window.saturating_sub(elapsed));
        }
        window.count += 1;
        Ok(())
    }
}

/// Middleware rejecting requests once a client has spent its budget
pub async fn limit_requests(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let client = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

    match state.limiter.check(client) {
        Ok(()) => next.run(request).await,
        Err(retry_after) => {
            warn!("Rate limit exceeded for {}", client);
            let mut response = ApiError::new(ErrorKind::RateLimited)
                .with_message("Too many requests, please try again later")
                .with_status(StatusCode::TOO_MANY_REQUESTS)
                .into_response();
            let secs = retry_after.as_secs().max(1);
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
            response
        }
    }
}
