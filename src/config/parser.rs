use super::{ConfigError, RateLimitConfig, RelayConfig, UpstreamConfig};
use crate::constants::*;
use std::str::FromStr;
use std::time::Duration;

use tracing::info;

/// Loads the relay configuration from the process environment
///
/// # Returns
///
/// * `Result<RelayConfig, ConfigError>` - The parsed configuration, or the first invalid variable
pub fn load_relay_config() -> Result<RelayConfig, ConfigError> {
    let config = parse_relay_config(|key| std::env::var(key).ok())?;
    info!(
        "Loaded relay configuration: model={}, api_configured={}, port={}",
        config.upstream.model,
        config.api_configured(),
        config.port
    );
    Ok(config)
}

/// Builds a relay configuration from an arbitrary key lookup
///
/// # Arguments
///
/// * `lookup` - Returns the raw value of a variable, or `None` when unset
///
/// # Errors
///
/// Returns an error if a numeric or duration variable cannot be parsed, or
/// if a limit that must be positive is zero.
pub fn parse_relay_config<F>(lookup: F) -> Result<RelayConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| {
        lookup(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let timeout = match get("UPSTREAM_TIMEOUT") {
        Some(raw) => humantime::parse_duration(&raw).map_err(|_| ConfigError::InvalidDuration {
            var: "UPSTREAM_TIMEOUT",
            value: raw,
        })?,
        None => humantime::parse_duration(DEFAULT_UPSTREAM_TIMEOUT)
            .unwrap_or(Duration::from_secs(30)),
    };
    if timeout.is_zero() {
        return Err(ConfigError::Zero {
            var: "UPSTREAM_TIMEOUT",
        });
    }

    let window_ms: u64 = parse_number(&get, "RATE_LIMIT_WINDOW_MS", DEFAULT_RATE_LIMIT_WINDOW_MS)?;
    let max_requests: u32 = parse_number(&get, "RATE_LIMIT_MAX_REQUESTS", DEFAULT_RATE_LIMIT_MAX)?;
    if window_ms == 0 {
        return Err(ConfigError::Zero {
            var: "RATE_LIMIT_WINDOW_MS",
        });
    }
    if max_requests == 0 {
        return Err(ConfigError::Zero {
            var: "RATE_LIMIT_MAX_REQUESTS",
        });
    }

    Ok(RelayConfig {
        upstream: UpstreamConfig {
            api_key: get("DEEPSEEK_API_KEY"),
            api_url: get("DEEPSEEK_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            model: get("DEEPSEEK_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            timeout,
        },
        allowed_origin: get("ALLOWED_ORIGIN").unwrap_or_else(|| "*".to_string()),
        rate_limit: RateLimitConfig {
            window: Duration::from_millis(window_ms),
            max_requests,
        },
        port: parse_number(&get, "PORT", DEFAULT_PORT)?,
    })
}

fn parse_number<T, G>(get: &G, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(var) {
        Some(raw) => raw
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { var, value: raw }),
        None => Ok(default),
    }
}
