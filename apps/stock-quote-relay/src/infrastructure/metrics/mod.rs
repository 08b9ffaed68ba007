//! Prometheus Metrics Module
//!
//! Exposes relay metrics via Prometheus format for monitoring.
//!
//! # Metrics Categories
//!
//! - **Pipeline**: bars fetched and records published per ticker
//! - **Errors**: pipeline failures by stage and kind, broker delivery failures
//! - **Cycles**: completed cycles and their duration
//!
//! # Integration
//!
//! Metrics are exposed at `/metrics` on the health server port. Without an
//! installed recorder every call below is a no-op.

use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// Subsequent calls return the handle created by the first one.
///
/// # Errors
///
/// Returns an error if another global recorder is already installed.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    if let Some(handle) = PROMETHEUS_HANDLE.get() {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    register_metrics();

    Ok(PROMETHEUS_HANDLE.get_or_init(|| handle).clone())
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics have not been initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

// =============================================================================
// Metric Registration
// =============================================================================

const BARS_FETCHED: &str = "quote_relay_bars_fetched_total";
const RECORDS_PUBLISHED: &str = "quote_relay_records_published_total";
const PIPELINE_ERRORS: &str = "quote_relay_pipeline_errors_total";
const DELIVERY_FAILURES: &str = "quote_relay_delivery_failures_total";
const CYCLES_COMPLETED: &str = "quote_relay_cycles_completed_total";
const CYCLE_DURATION: &str = "quote_relay_cycle_duration_seconds";

fn register_metrics() {
    describe_counter!(BARS_FETCHED, "Total bars received from the quote provider");
    describe_counter!(
        RECORDS_PUBLISHED,
        "Total quote records handed to the broker client"
    );
    describe_counter!(
        PIPELINE_ERRORS,
        "Total ticker pipeline failures by stage and kind"
    );
    describe_counter!(
        DELIVERY_FAILURES,
        "Total broker delivery reports that came back as failures"
    );
    describe_counter!(CYCLES_COMPLETED, "Total completed polling cycles");
    describe_histogram!(CYCLE_DURATION, "Wall time of one polling cycle");
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Record bars received for a ticker.
pub fn record_bars_fetched(ticker: &str, count: usize) {
    counter!(BARS_FETCHED, "ticker" => ticker.to_string()).increment(count as u64);
}

/// Record a record enqueued for a ticker.
pub fn record_published(ticker: &str) {
    counter!(RECORDS_PUBLISHED, "ticker" => ticker.to_string()).increment(1);
}

/// Record a pipeline failure.
pub fn record_pipeline_error(stage: &'static str, kind: &'static str) {
    counter!(PIPELINE_ERRORS, "stage" => stage, "kind" => kind).increment(1);
}

/// Record a failed delivery report for `topic`.
pub fn record_delivery_failure(topic: &str) {
    counter!(DELIVERY_FAILURES, "topic" => topic.to_string()).increment(1);
}

/// Record a completed cycle and its duration.
pub fn record_cycle(duration: Duration) {
    counter!(CYCLES_COMPLETED).increment(1);
    histogram!(CYCLE_DURATION).record(duration.as_secs_f64());
}

// =============================================================================
// Tests
// =============================================================================
