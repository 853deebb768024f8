//! Prometheus metrics for Sluice.
//!
//! Recording functions are always safe to call: without an installed
//! recorder the `metrics` macros are no-ops.
//!
//! # Example
//!
//! ```rust,ignore
//! use sluice_telemetry::metrics::{record_response, InFlightGuard};
//!
//! let _guard = InFlightGuard::new();
//! record_response(200, Duration::from_millis(4));
//! ```

use crate::error::TelemetryError;
use crate::TelemetryResult;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::sync::OnceLock;
use std::time::Duration;

/// Global metrics handle for rendering.
static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

const RESPONSES_TOTAL: &str = "sluice_responses_total";
const REQUEST_DURATION: &str = "sluice_request_duration_seconds";
const IN_FLIGHT: &str = "sluice_in_flight_requests";
const REJECTIONS_TOTAL: &str = "sluice_rejections_total";
const LIFESPAN_EVENTS_TOTAL: &str = "sluice_lifespan_events_total";

/// Metrics configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsConfig {
    /// Whether metrics are enabled.
    pub enabled: bool,

    /// Address to expose metrics on (e.g., "0.0.0.0:9090").
    pub addr: String,

    /// Histogram buckets for request duration, in seconds.
    pub duration_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            addr: "0.0.0.0:9090".to_string(),
            duration_buckets: vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ],
        }
    }
}

/// Initializes the metrics subsystem and its scrape endpoint.
///
/// # Errors
///
/// Returns `TelemetryError::InvalidAddress` for a bad listen address and
/// `TelemetryError::MetricsInit` if the recorder cannot be installed.
pub fn init_metrics(config: &MetricsConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let addr: SocketAddr = config
        .addr
        .parse()
        .map_err(|e| TelemetryError::InvalidAddress(format!("{}: {e}", config.addr)))?;

    let handle = PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets(&config.duration_buckets)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?
        .install_recorder()
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

    let _ = METRICS_HANDLE.set(handle);
    register_metric_descriptions();

    Ok(())
}

/// Renders metrics in Prometheus format.
///
/// Returns `None` if metrics are not initialized.
#[must_use]
pub fn render_metrics() -> Option<String> {
    METRICS_HANDLE.get().map(PrometheusHandle::render)
}

fn register_metric_descriptions() {
    describe_counter!(RESPONSES_TOTAL, "Responses emitted by the synchronous adapter");
    describe_histogram!(
        REQUEST_DURATION,
        "Time from receiving a scope to sending the response body, in seconds"
    );
    describe_gauge!(IN_FLIGHT, "Requests currently being adapted");
    describe_counter!(
        REJECTIONS_TOTAL,
        "Requests answered without calling the application"
    );
    describe_counter!(LIFESPAN_EVENTS_TOTAL, "Lifespan handshake outcomes");
}

/// Records a response sent by the synchronous adapter.
pub fn record_response(status_code: u16, duration: Duration) {
    counter!(RESPONSES_TOTAL, "status" => status_code.to_string()).increment(1);
    histogram!(REQUEST_DURATION).record(duration.as_secs_f64());
}

/// Records a request answered before the application was called.
///
/// # Arguments
///
/// * `reason` - Short reason label, e.g. `"payload_too_large"`
pub fn record_rejection(reason: &'static str) {
    counter!(REJECTIONS_TOTAL, "reason" => reason).increment(1);
}

/// Records the outcome of a lifespan stage.
///
/// # Arguments
///
/// * `stage` - `"startup"` or `"shutdown"`
/// * `outcome` - e.g. `"complete"`, `"failed"`, `"timeout"`, `"unsupported"`
pub fn record_lifespan_event(stage: &'static str, outcome: &'static str) {
    counter!(LIFESPAN_EVENTS_TOTAL, "stage" => stage, "outcome" => outcome).increment(1);
}

/// Guard that tracks one in-flight request.
///
/// Increments the gauge on creation and decrements it on drop.
#[derive(Debug)]
pub struct InFlightGuard {
    _private: (),
}

impl InFlightGuard {
    /// Creates a new guard and increments the in-flight gauge.
    #[must_use]
    pub fn new() -> Self {
        gauge!(IN_FLIGHT).increment(1.0);
        Self { _private: () }
    }
}

impl Default for InFlightGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        gauge!(IN_FLIGHT).decrement(1.0);
    }
}
