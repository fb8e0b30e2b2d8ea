//! Prometheus metrics for lookups and upstream calls.

use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::debug;

// === Metric Name Constants ===

/// Lookup latency metric name.
pub const METRIC_LOOKUP_LATENCY: &str = "lookup_latency_ms";
/// Lookups counter metric name, labelled by result.
pub const METRIC_LOOKUPS: &str = "lookups_total";
/// Upstream attempts counter metric name, labelled by outcome.
pub const METRIC_UPSTREAM_ATTEMPTS: &str = "upstream_attempts_total";
/// Upstream retries counter metric name.
pub const METRIC_UPSTREAM_RETRIES: &str = "upstream_retries_total";

/// Initialize all metric descriptions.
/// Call this once at startup to register metrics with descriptions.
pub fn init_metrics() {
    describe_histogram!(
        METRIC_LOOKUP_LATENCY,
        "End-to-end lookup latency in milliseconds, including retries"
    );
    describe_counter!(METRIC_LOOKUPS, "Total number of lookups by result");
    describe_counter!(
        METRIC_UPSTREAM_ATTEMPTS,
        "Total number of upstream attempts by outcome"
    );
    describe_counter!(
        METRIC_UPSTREAM_RETRIES,
        "Total number of upstream retries after a transient failure"
    );

    debug!("Metrics initialized");
}

/// Install the global Prometheus recorder and return a handle for rendering.
pub fn install_prometheus() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    init_metrics();
    Ok(handle)
}

/// Increment lookups counter.
pub fn inc_lookups(result: &'static str) {
    counter!(METRIC_LOOKUPS, "result" => result).increment(1);
}

/// Increment upstream attempts counter.
pub fn inc_upstream_attempts(outcome: &'static str) {
    counter!(METRIC_UPSTREAM_ATTEMPTS, "outcome" => outcome).increment(1);
}

/// Increment upstream retries counter.
pub fn inc_upstream_retries() {
    counter!(METRIC_UPSTREAM_RETRIES).increment(1);
}

/// RAII guard for timing operations.
/// Automatically records latency when dropped.
pub struct LatencyTimer {
    start: Instant,
    metric_name: &'static str,
}

impl LatencyTimer {
    /// Create a new latency timer for the given metric.
    pub fn new(metric_name: &'static str) -> Self {
        Self {
            start: Instant::now(),
            metric_name,
        }
    }

    /// Get elapsed time in milliseconds (without recording).
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Drop for LatencyTimer {
    fn drop(&mut self) {
        histogram!(self.metric_name).record(self.elapsed_ms());
    }
}

/// Create a latency timer for a lookup.
pub fn timer_lookup() -> LatencyTimer {
    LatencyTimer::new(METRIC_LOOKUP_LATENCY)
}
