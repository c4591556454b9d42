//! Application configuration loaded from environment variables.

use std::time::Duration;

use service::RetryPolicy;

const DEFAULT_RECIPIENT: &str = "stock@made.com";

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `json` for structured output, anything else for text
/// - `NOTIFICATION_RECIPIENT`: who hears about stock-outs
///   (default: `"stock@made.com"`)
/// - `RETRY_MAX_ATTEMPTS`: attempts per event handler (default: `3`)
/// - `RETRY_BASE_DELAY_MS`: first backoff pause (default: `100`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub json_logs: bool,
    pub notification_recipient: String,
    pub retry_max_attempts: u32,
    pub retry_base_delay_ms: u64,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("HOST").unwrap_or(defaults.host),
            port: parse_var("PORT").unwrap_or(defaults.port),
            log_level: std::env::var("RUST_LOG").unwrap_or(defaults.log_level),
            json_logs: std::env::var("LOG_FORMAT")
                .map(|f| f.eq_ignore_ascii_case("json"))
                .unwrap_or(defaults.json_logs),
            notification_recipient: std::env::var("NOTIFICATION_RECIPIENT")
                .unwrap_or(defaults.notification_recipient),
            retry_max_attempts: parse_var("RETRY_MAX_ATTEMPTS")
                .unwrap_or(defaults.retry_max_attempts),
            retry_base_delay_ms: parse_var("RETRY_BASE_DELAY_MS")
                .unwrap_or(defaults.retry_base_delay_ms),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns the retry policy for event handlers.
    pub fn retry_policy(&self) -> RetryPolicy {
        let base = Duration::from_millis(self.retry_base_delay_ms);
        let cap = RetryPolicy::default().max_delay().max(base);
        RetryPolicy::new(self.retry_max_attempts, base, cap)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            json_logs: false,
            notification_recipient: DEFAULT_RECIPIENT.to_string(),
            retry_max_attempts: 3,
            retry_base_delay_ms: 100,
        }
    }
}
