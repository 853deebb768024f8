//! Process bootstrap from a [`SluiceConfig`].

use sluice_config::{ConfigError, LogFormat, LoggingSection, MetricsSection, SluiceConfig};
use sluice_core::Application;
use sluice_server::{Server, ServerConfig, ServerError};
use sluice_telemetry::{init_logging, init_metrics, LogConfig, MetricsConfig, TelemetryError};
use thiserror::Error;

/// Errors raised while bootstrapping or running the server.
#[derive(Debug, Error)]
pub enum InitError {
    /// The configuration failed validation.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Logging or metrics could not be installed.
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),

    /// The server failed to start or stopped with an error.
    #[error(transparent)]
    Server(#[from] ServerError),
}

/// Maps the `[logging]` section onto a subscriber configuration.
///
/// `json` starts from [`LogConfig::production`], `pretty` from
/// [`LogConfig::development`].
#[must_use]
pub fn log_config(section: &LoggingSection) -> LogConfig {
    let base = match section.format {
        LogFormat::Json => LogConfig::production(),
        LogFormat::Pretty => LogConfig::development(),
    };
    LogConfig {
        enabled: section.enabled,
        level: section.level.clone(),
        ansi: section.ansi_enabled,
        ..base
    }
}

/// Maps the `[metrics]` section onto an exporter configuration.
#[must_use]
pub fn metrics_config(section: &MetricsSection) -> MetricsConfig {
    MetricsConfig {
        enabled: section.enabled,
        addr: section.addr.clone(),
        ..MetricsConfig::default()
    }
}

/// Validates `config`, installs logging and metrics, and returns the
/// runtime server configuration.
///
/// Call once per process: a second call fails to install the subscriber.
pub fn init_from_config(config: &SluiceConfig) -> Result<ServerConfig, InitError> {
    config.validate()?;
    init_logging(&log_config(&config.logging))?;
    init_metrics(&metrics_config(&config.metrics))?;

    let server_config = ServerConfig::from(config);
    tracing::debug!(
        bind = server_config.bind(),
        workers = server_config.worker_threads(),
        "Configuration loaded"
    );
    Ok(server_config)
}

/// Bootstraps from `config` and serves `app` until SIGTERM or SIGINT.
pub async fn serve(config: &SluiceConfig, app: impl Application) -> Result<(), InitError> {
    let server_config = init_from_config(config)?;
    Server::new(server_config, app).run().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_config_from_pretty_section() {
        let section = LoggingSection {
            enabled: true,
            level: "sluice_server=trace".to_string(),
            format: LogFormat::Pretty,
            ansi_enabled: false,
        };
        let config = log_config(&section);

        assert!(!config.json_format);
        assert!(!config.ansi);
        assert!(config.thread_ids);
        assert_eq!(config.level, "sluice_server=trace");
    }

    #[test]
    fn test_log_config_from_default_section() {
        let config = log_config(&LoggingSection::default());
        assert!(config.json_format);
        assert_eq!(config.level, "info");
    }

    #[test]
    fn test_metrics_config_keeps_default_buckets() {
        let section = MetricsSection {
            enabled: true,
            addr: "127.0.0.1:9100".to_string(),
        };
        let config = metrics_config(&section);

        assert!(config.enabled);
        assert_eq!(config.addr, "127.0.0.1:9100");
        assert_eq!(
            config.duration_buckets,
            MetricsConfig::default().duration_buckets
        );
    }

    #[test]
    fn test_init_rejects_invalid_config() {
        let mut config = SluiceConfig::default();
        config.server.bind = "nowhere".to_string();

        assert!(matches!(
            init_from_config(&config),
            Err(InitError::Config(_))
        ));
    }

    #[test]
    fn test_init_without_telemetry() {
        let mut config = SluiceConfig::default();
        config.logging.enabled = false;
        config.server.root_path = "/api".to_string();
        config.server.worker_threads = Some(3);

        let server_config = init_from_config(&config).unwrap();
        assert_eq!(server_config.root_path(), "/api");
        assert_eq!(server_config.worker_threads(), 3);
    }
}
