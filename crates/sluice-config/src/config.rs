//! Root configuration type.
//!
//! [`SluiceConfig`] groups every section and owns cross-field validation.

use serde::{Deserialize, Serialize};

use crate::{LifespanSection, LoggingSection, MetricsSection, ServerSection};

/// Complete Sluice server configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to load it from files and
/// environment variables.
///
/// # Example
///
/// ```
/// use sluice_config::SluiceConfig;
///
/// let config = SluiceConfig::default();
/// assert_eq!(config.lifespan.max_app_queue_size, 10);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct SluiceConfig {
    /// Listener and request-handling configuration.
    #[serde(default)]
    pub server: ServerSection,

    /// Lifespan handshake configuration.
    #[serde(default)]
    pub lifespan: LifespanSection,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSection,

    /// Metrics configuration.
    #[serde(default)]
    pub metrics: MetricsSection,
}

impl SluiceConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> SluiceConfigBuilder {
        SluiceConfigBuilder::new()
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if:
    /// - The bind or metrics address is not a socket address
    /// - `root_path` is non-empty without a leading `/`, or ends with `/`
    /// - `max_app_queue_size` or `worker_threads` is zero
    pub fn validate(&self) -> Result<(), crate::ConfigError> {
        if self.server.bind.parse::<std::net::SocketAddr>().is_err() {
            return Err(crate::ConfigError::invalid_value(
                "server.bind",
                format!("invalid socket address: {}", self.server.bind),
            ));
        }

        let root_path = &self.server.root_path;
        if !root_path.is_empty() && (!root_path.starts_with('/') || root_path.ends_with('/')) {
            return Err(crate::ConfigError::invalid_value(
                "server.root_path",
                "must be empty or start with '/' and not end with '/'",
            ));
        }

        if self.server.worker_threads == Some(0) {
            return Err(crate::ConfigError::invalid_value(
                "server.worker_threads",
                "must be at least 1",
            ));
        }

        if self.lifespan.max_app_queue_size == 0 {
            return Err(crate::ConfigError::invalid_value(
                "lifespan.max_app_queue_size",
                "must be at least 1",
            ));
        }

        if self.metrics.enabled && self.metrics.addr.parse::<std::net::SocketAddr>().is_err() {
            return Err(crate::ConfigError::invalid_value(
                "metrics.addr",
                format!("invalid socket address: {}", self.metrics.addr),
            ));
        }

        Ok(())
    }

    /// Create a development configuration preset.
    ///
    /// Pretty, colored debug logs and short lifespan timeouts.
    ///
    /// # Example
    ///
    /// ```
    /// use sluice_config::{LogFormat, SluiceConfig};
    ///
    /// let config = SluiceConfig::development();
    /// assert_eq!(config.logging.format, LogFormat::Pretty);
    /// ```
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();

        config.logging.level = "debug".to_string();
        config.logging.format = crate::LogFormat::Pretty;
        config.logging.ansi_enabled = true;

        config.lifespan.startup_timeout_secs = 10;
        config.lifespan.shutdown_timeout_secs = 10;

        config
    }

    /// Create a production configuration preset.
    ///
    /// JSON logs, all interfaces, metrics exporter enabled.
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();

        config.server.bind = "0.0.0.0:8000".to_string();

        config.logging.level = "info".to_string();
        config.logging.format = crate::LogFormat::Json;
        config.logging.ansi_enabled = false;

        config.metrics.enabled = true;

        config
    }
}

/// Builder for [`SluiceConfig`].
#[derive(Debug, Default)]
pub struct SluiceConfigBuilder {
    server: Option<ServerSection>,
    lifespan: Option<LifespanSection>,
    logging: Option<LoggingSection>,
    metrics: Option<MetricsSection>,
}

impl SluiceConfigBuilder {
    /// Create a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the server section.
    #[must_use]
    pub fn server(mut self, server: ServerSection) -> Self {
        self.server = Some(server);
        self
    }

    /// Set the lifespan section.
    #[must_use]
    pub fn lifespan(mut self, lifespan: LifespanSection) -> Self {
        self.lifespan = Some(lifespan);
        self
    }

    /// Set the logging section.
    #[must_use]
    pub fn logging(mut self, logging: LoggingSection) -> Self {
        self.logging = Some(logging);
        self
    }

    /// Set the metrics section.
    #[must_use]
    pub fn metrics(mut self, metrics: MetricsSection) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Build the configuration, defaulting any unset section.
    #[must_use]
    pub fn build(self) -> SluiceConfig {
        SluiceConfig {
            server: self.server.unwrap_or_default(),
            lifespan: self.lifespan.unwrap_or_default(),
            logging: self.logging.unwrap_or_default(),
            metrics: self.metrics.unwrap_or_default(),
        }
    }

    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if validation fails.
    pub fn build_validated(self) -> Result<SluiceConfig, crate::ConfigError> {
        let config = self.build();
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ConfigError, LogFormat};

    #[test]
    fn test_default_config_is_valid() {
        let config = SluiceConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.bind, "127.0.0.1:8000");
    }

    #[test]
    fn test_builder_keeps_unset_sections_default() {
        let config = SluiceConfig::builder()
            .server(ServerSection {
                root_path: "/app".to_string(),
                ..Default::default()
            })
            .build();

        assert_eq!(config.server.root_path, "/app");
        assert_eq!(config.lifespan, LifespanSection::default());
    }

    #[test]
    fn test_validate_rejects_zero_queue_size() {
        let result = SluiceConfig::builder()
            .lifespan(LifespanSection {
                max_app_queue_size: 0,
                ..Default::default()
            })
            .build_validated();

        match result {
            Err(ConfigError::InvalidValue { field, .. }) => {
                assert_eq!(field, "lifespan.max_app_queue_size");
            }
            other => panic!("expected invalid value, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_rejects_bad_bind() {
        let mut config = SluiceConfig::default();
        config.server.bind = "localhost".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_root_path_shape() {
        let mut config = SluiceConfig::default();
        config.server.root_path = "api".to_string();
        assert!(config.validate().is_err());

        config.server.root_path = "/api/".to_string();
        assert!(config.validate().is_err());

        config.server.root_path = "/api".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_workers() {
        let mut config = SluiceConfig::default();
        config.server.worker_threads = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_metrics_addr_only_checked_when_enabled() {
        let mut config = SluiceConfig::default();
        config.metrics.addr = "nowhere".to_string();
        assert!(config.validate().is_ok());

        config.metrics.enabled = true;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_presets() {
        let dev = SluiceConfig::development();
        assert_eq!(dev.logging.level, "debug");
        assert_eq!(dev.lifespan.startup_timeout_secs, 10);

        let prod = SluiceConfig::production();
        assert_eq!(prod.logging.format, LogFormat::Json);
        assert!(prod.metrics.enabled);
        assert!(prod.validate().is_ok());
    }

    #[test]
    fn test_toml_deserialization() {
        let config: SluiceConfig = toml::from_str(
            r#"
            [server]
            max_body_size = 1024

            [lifespan]
            startup_timeout_secs = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.server.max_body_size, 1024);
        assert_eq!(config.lifespan.startup_timeout_secs, 5);
        assert_eq!(config.lifespan.shutdown_timeout_secs, 60);
    }

    #[test]
    fn test_unknown_section_rejected() {
        let result: Result<SluiceConfig, _> = toml::from_str("[tracing]\nenabled = true");
        assert!(result.is_err());
    }
}
