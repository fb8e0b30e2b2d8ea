//! Application configuration loaded from environment variables.

use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::lookup::retry::RetryPolicy;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // === Upstream ===
    /// Base URL the identifier is appended to.
    #[serde(default = "default_upstream_base_url")]
    pub upstream_base_url: String,

    /// Per-attempt timeout for upstream calls, in milliseconds.
    #[serde(default = "default_upstream_timeout_ms")]
    pub upstream_timeout_ms: u64,

    // === Retry Policy ===
    /// Total attempts per lookup, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Backoff unit in milliseconds; the wait before attempt n+1 is n units.
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    // === Validation ===
    /// Reject identifiers made only of digits.
    #[serde(default)]
    pub reject_numeric_names: bool,

    // === Server Configuration ===
    /// Address the HTTP server binds to.
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub rust_log: String,

    /// Emit logs as JSON lines.
    #[serde(default)]
    pub log_json: bool,

    /// Install the Prometheus recorder and expose `/metrics`.
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

fn default_upstream_base_url() -> String {
    "https://pokeapi.co/api/v2/pokemon/".to_string()
}

fn default_upstream_timeout_ms() -> u64 {
    10_000
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_base_ms() -> u64 {
    500
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            upstream_base_url: default_upstream_base_url(),
            upstream_timeout_ms: default_upstream_timeout_ms(),
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
            reject_numeric_names: false,
            host: default_host(),
            port: default_port(),
            rust_log: default_log_level(),
            log_json: false,
            metrics_enabled: default_true(),
        }
    }
}

impl Config {
    /// Load configuration from environment, reading .env file first.
    pub fn load() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    /// Check if the configuration is valid.
    pub fn validate(&self) -> Result<(), String> {
        self.upstream_base()?;

        if self.max_attempts == 0 {
            return Err("MAX_ATTEMPTS must be at least 1".to_string());
        }

        if self.upstream_timeout_ms == 0 {
            return Err("UPSTREAM_TIMEOUT_MS must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Parsed upstream base URL, always ending in `/` so identifiers join as a
    /// trailing path segment.
    pub fn upstream_base(&self) -> Result<Url, String> {
        let mut raw = self.upstream_base_url.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }

        let url = Url::parse(&raw)
            .map_err(|e| format!("UPSTREAM_BASE_URL is not a valid URL: {}", e))?;

        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(format!(
                "UPSTREAM_BASE_URL must use http or https, got {}",
                other
            )),
        }
    }

    /// Per-attempt upstream timeout.
    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_millis(self.upstream_timeout_ms)
    }

    /// Retry policy for upstream calls.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::linear(
            self.max_attempts,
            Duration::from_millis(self.backoff_base_ms),
        )
    }
}
