//! PokeAPI client with bounded retries.

use std::time::Duration;

use reqwest::StatusCode;
use tracing::{debug, error, instrument, warn};
use url::Url;

use crate::config::Config;
use crate::error::{AppError, GatewayError};
use crate::metrics;

use super::identifier::{Identifier, ValidationPolicy};
use super::normalize::{normalize_bytes, NormalizedResult};
use super::retry::RetryPolicy;

/// Result of a single upstream attempt.
#[derive(Debug)]
pub enum AttemptOutcome {
    /// Upstream answered 200 with a body we could project.
    Success(NormalizedResult),
    /// Network failure or 5xx; worth another attempt.
    Retryable(String),
    /// Final answer; no further attempts.
    Terminal(GatewayError),
}

impl AttemptOutcome {
    fn label(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::Retryable(_) => "retryable",
            Self::Terminal(_) => "terminal",
        }
    }
}

/// Upstream PokeAPI client.
#[derive(Debug, Clone)]
pub struct PokemonClient {
    /// Pooled HTTP client shared by all requests.
    http: reqwest::Client,
    /// Base URL, ending in `/`.
    base_url: Url,
    /// Retry policy for transient failures.
    retry: RetryPolicy,
    /// Identifier validation policy.
    validation: ValidationPolicy,
}

impl PokemonClient {
    /// Create a client from config.
    pub fn new(config: &Config) -> crate::error::Result<Self> {
        let base_url = config.upstream_base().map_err(AppError::InvalidConfig)?;

        let http = reqwest::Client::builder()
            .timeout(config.upstream_timeout())
            .connect_timeout(config.upstream_timeout().min(Duration::from_secs(5)))
            .tcp_nodelay(true)
            // Redirects are reported as upstream errors, not followed.
            .redirect(reqwest::redirect::Policy::none())
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;

        Ok(Self {
            http,
            base_url,
            retry: config.retry_policy(),
            validation: ValidationPolicy {
                reject_numeric: config.reject_numeric_names,
            },
        })
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Get the retry policy.
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Validate a raw identifier and look it up.
    pub async fn lookup(&self, raw_name: Option<&str>) -> Result<NormalizedResult, GatewayError> {
        let _timer = metrics::timer_lookup();
        let result = match Identifier::parse(raw_name, self.validation) {
            Ok(identifier) => self.fetch(&identifier).await,
            Err(e) => Err(e),
        };

        metrics::inc_lookups(match &result {
            Ok(_) => "ok",
            Err(e) => e.label(),
        });

        result
    }

    /// Fetch a validated identifier, retrying transient failures.
    #[instrument(skip(self, identifier), fields(identifier = %identifier))]
    pub async fn fetch(&self, identifier: &Identifier) -> Result<NormalizedResult, GatewayError> {
        let url = self
            .base_url
            .join(identifier.as_str())
            .map_err(|e| GatewayError::Internal(format!("failed to build upstream url: {}", e)))?;

        let mut attempt = 1;
        loop {
            let outcome = self.attempt(&url).await;
            metrics::inc_upstream_attempts(outcome.label());

            match outcome {
                AttemptOutcome::Success(result) => return Ok(result),
                AttemptOutcome::Terminal(e) => return Err(e),
                AttemptOutcome::Retryable(reason) => match self.retry.delay_after(attempt) {
                    Some(delay) => {
                        warn!(
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            reason = %reason,
                            "Upstream attempt failed, retrying"
                        );
                        metrics::inc_upstream_retries();
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    }
                    None => {
                        error!(attempt, reason = %reason, "Upstream unavailable, giving up");
                        return Err(GatewayError::UpstreamUnavailable {
                            attempts: attempt,
                            last_failure: reason,
                        });
                    }
                },
            }
        }
    }

    /// Perform a single GET and classify the result.
    async fn attempt(&self, url: &Url) -> AttemptOutcome {
        let response = match self.http.get(url.clone()).send().await {
            Ok(response) => response,
            Err(e) => return AttemptOutcome::Retryable(describe_request_error(&e)),
        };

        let status = response.status();
        debug!(status = status.as_u16(), "Upstream responded");

        match status {
            StatusCode::OK => {
                let body = match response.bytes().await {
                    Ok(body) => body,
                    Err(e) => return AttemptOutcome::Retryable(describe_request_error(&e)),
                };
                match normalize_bytes(&body) {
                    Ok(result) => AttemptOutcome::Success(result),
                    Err(e) => {
                        warn!(error = %e, "Upstream returned unexpected data");
                        AttemptOutcome::Terminal(GatewayError::UpstreamShape(e))
                    }
                }
            }
            StatusCode::NOT_FOUND => AttemptOutcome::Terminal(GatewayError::NotFound),
            s if s.is_server_error() => AttemptOutcome::Retryable(format!("HTTP {}", s)),
            s => AttemptOutcome::Terminal(GatewayError::UpstreamUnexpected { status: s.as_u16() }),
        }
    }
}

fn describe_request_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        format!("timeout: {}", e)
    } else if e.is_connect() {
        format!("connection failed: {}", e)
    } else {
        format!("request failed: {}", e)
    }
}
