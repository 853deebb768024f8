//! Observability for Sluice.
//!
//! - **Logging**: structured logging through `tracing-subscriber`, JSON or pretty
//! - **Metrics**: Prometheus-format metrics via the `metrics` crate
//!
//! # Standard Metrics
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `sluice_responses_total` | Counter | `status` | Responses emitted by the synchronous adapter |
//! | `sluice_request_duration_seconds` | Histogram | - | Time from scope to response body |
//! | `sluice_in_flight_requests` | Gauge | - | Requests currently being adapted |
//! | `sluice_rejections_total` | Counter | `reason` | Requests answered without calling the application |
//! | `sluice_lifespan_events_total` | Counter | `stage`, `outcome` | Lifespan handshake outcomes |
//!
//! # Example
//!
//! ```rust,ignore
//! use sluice_telemetry::{init_logging, init_metrics, LogConfig, MetricsConfig};
//!
//! init_logging(&LogConfig::development())?;
//! init_metrics(&MetricsConfig::default())?;
//! ```

#![doc(html_root_url = "https://docs.rs/sluice-telemetry/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::TelemetryError;
pub use logging::{init_logging, LogConfig};
pub use metrics::{init_metrics, MetricsConfig};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
