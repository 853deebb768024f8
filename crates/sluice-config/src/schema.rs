//! Configuration schema definitions.
//!
//! Every section rejects unknown fields and fills omitted fields from its
//! defaults, so a partial file is always a valid starting point.

use serde::{Deserialize, Serialize};

/// Default request body limit: 16 MiB.
pub const DEFAULT_MAX_BODY_SIZE: usize = 16 * 1024 * 1024;

/// Listener and request-handling configuration.
///
/// # Example
///
/// ```
/// use sluice_config::ServerSection;
///
/// let server = ServerSection::default();
/// assert_eq!(server.bind, "127.0.0.1:8000");
/// assert_eq!(server.max_body_size, 16 * 1024 * 1024);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    /// Socket address to listen on.
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Mount prefix stripped from request paths.
    #[serde(default)]
    pub root_path: String,

    /// Maximum request body size in bytes for synchronous applications.
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,

    /// Time allowed for in-flight connections to finish after shutdown
    /// begins, in seconds.
    #[serde(default = "default_graceful_timeout")]
    pub graceful_timeout_secs: u64,

    /// Size of the blocking worker pool. `None` picks a size from the
    /// number of available CPUs.
    #[serde(default)]
    pub worker_threads: Option<usize>,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            root_path: String::new(),
            max_body_size: default_max_body_size(),
            graceful_timeout_secs: default_graceful_timeout(),
            worker_threads: None,
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}

fn default_max_body_size() -> usize {
    DEFAULT_MAX_BODY_SIZE
}

fn default_graceful_timeout() -> u64 {
    3
}

/// Lifespan handshake configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LifespanSection {
    /// Seconds to wait for the application to finish startup.
    #[serde(default = "default_lifespan_timeout")]
    pub startup_timeout_secs: u64,

    /// Seconds to wait for the application to finish shutdown.
    #[serde(default = "default_lifespan_timeout")]
    pub shutdown_timeout_secs: u64,

    /// Capacity of the queue feeding lifespan events to the application.
    #[serde(default = "default_max_app_queue_size")]
    pub max_app_queue_size: usize,
}

impl Default for LifespanSection {
    fn default() -> Self {
        Self {
            startup_timeout_secs: default_lifespan_timeout(),
            shutdown_timeout_secs: default_lifespan_timeout(),
            max_app_queue_size: default_max_app_queue_size(),
        }
    }
}

fn default_lifespan_timeout() -> u64 {
    60
}

fn default_max_app_queue_size() -> usize {
    10
}

/// Log format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON formatted logs (production).
    #[default]
    Json,
    /// Human-readable pretty format (development).
    Pretty,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingSection {
    /// Enable logging.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Filter directive (trace, debug, info, warn, error, or per-target).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Include ANSI color codes in output.
    #[serde(default)]
    pub ansi_enabled: bool,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::default(),
            ansi_enabled: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Prometheus metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct MetricsSection {
    /// Enable the metrics exporter.
    #[serde(default)]
    pub enabled: bool,

    /// Address of the scrape endpoint.
    #[serde(default = "default_metrics_addr")]
    pub addr: String,
}

impl Default for MetricsSection {
    fn default() -> Self {
        Self {
            enabled: false,
            addr: default_metrics_addr(),
        }
    }
}

fn default_metrics_addr() -> String {
    "0.0.0.0:9090".to_string()
}

fn default_true() -> bool {
    true
}
