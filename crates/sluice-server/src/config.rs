//! Runtime server configuration.
//!
//! [`ServerConfig`] is the resolved, duration-typed view of the settings the
//! server loop, the synchronous adapter and the lifespan state machine read.
//! Build it directly with [`ServerConfig::builder()`] or convert a loaded
//! [`SluiceConfig`].
//!
//! # Example
//!
//! ```rust
//! use sluice_server::ServerConfig;
//! use std::time::Duration;
//!
//! let config = ServerConfig::builder()
//!     .bind("127.0.0.1:3000")
//!     .startup_timeout(Duration::from_secs(5))
//!     .build();
//!
//! assert_eq!(config.bind(), "127.0.0.1:3000");
//! assert_eq!(config.max_app_queue_size(), 10);
//! ```

use std::net::SocketAddr;
use std::time::Duration;

use sluice_config::SluiceConfig;

/// Default bind address.
pub const DEFAULT_BIND: &str = "127.0.0.1:8000";

/// Default maximum request body size (16 MiB).
pub const DEFAULT_MAX_BODY_SIZE: usize = sluice_config::DEFAULT_MAX_BODY_SIZE;

/// Default lifespan startup and shutdown timeout in seconds.
pub const DEFAULT_LIFESPAN_TIMEOUT_SECS: u64 = 60;

/// Default capacity of the lifespan event queue.
pub const DEFAULT_MAX_APP_QUEUE_SIZE: usize = 10;

/// Default graceful connection drain timeout in seconds.
pub const DEFAULT_GRACEFUL_TIMEOUT_SECS: u64 = 3;

/// Returns the default blocking worker count: available CPUs plus four,
/// capped at 32.
#[must_use]
pub fn default_worker_threads() -> usize {
    let cpus = std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get);
    (cpus + 4).min(32)
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    bind: String,
    root_path: String,
    max_body_size: usize,
    graceful_timeout: Duration,
    worker_threads: usize,
    startup_timeout: Duration,
    shutdown_timeout: Duration,
    max_app_queue_size: usize,
}

impl ServerConfig {
    /// Creates a new server configuration builder.
    #[must_use]
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }

    /// Returns the bind address.
    #[must_use]
    pub fn bind(&self) -> &str {
        &self.bind
    }

    /// Parses and returns the bind address as a `SocketAddr`.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be parsed.
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        self.bind.parse()
    }

    /// Returns the mount prefix placed in every HTTP scope.
    #[must_use]
    pub fn root_path(&self) -> &str {
        &self.root_path
    }

    /// Returns the maximum request body size in bytes.
    #[must_use]
    pub fn max_body_size(&self) -> usize {
        self.max_body_size
    }

    /// Returns how long in-flight connections may run after shutdown begins.
    #[must_use]
    pub fn graceful_timeout(&self) -> Duration {
        self.graceful_timeout
    }

    /// Returns the blocking worker pool size.
    #[must_use]
    pub fn worker_threads(&self) -> usize {
        self.worker_threads
    }

    /// Returns the lifespan startup timeout.
    #[must_use]
    pub fn startup_timeout(&self) -> Duration {
        self.startup_timeout
    }

    /// Returns the lifespan shutdown timeout.
    #[must_use]
    pub fn shutdown_timeout(&self) -> Duration {
        self.shutdown_timeout
    }

    /// Returns the lifespan event queue capacity.
    #[must_use]
    pub fn max_app_queue_size(&self) -> usize {
        self.max_app_queue_size
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl From<&SluiceConfig> for ServerConfig {
    fn from(config: &SluiceConfig) -> Self {
        let mut builder = Self::builder()
            .bind(config.server.bind.clone())
            .root_path(config.server.root_path.clone())
            .max_body_size(config.server.max_body_size)
            .graceful_timeout(Duration::from_secs(config.server.graceful_timeout_secs))
            .startup_timeout(Duration::from_secs(config.lifespan.startup_timeout_secs))
            .shutdown_timeout(Duration::from_secs(config.lifespan.shutdown_timeout_secs))
            .max_app_queue_size(config.lifespan.max_app_queue_size);
        if let Some(workers) = config.server.worker_threads {
            builder = builder.worker_threads(workers);
        }
        builder.build()
    }
}

/// Builder for [`ServerConfig`].
#[derive(Debug, Clone)]
pub struct ServerConfigBuilder {
    bind: String,
    root_path: String,
    max_body_size: usize,
    graceful_timeout: Duration,
    worker_threads: usize,
    startup_timeout: Duration,
    shutdown_timeout: Duration,
    max_app_queue_size: usize,
}

impl ServerConfigBuilder {
    /// Creates a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            root_path: String::new(),
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            graceful_timeout: Duration::from_secs(DEFAULT_GRACEFUL_TIMEOUT_SECS),
            worker_threads: default_worker_threads(),
            startup_timeout: Duration::from_secs(DEFAULT_LIFESPAN_TIMEOUT_SECS),
            shutdown_timeout: Duration::from_secs(DEFAULT_LIFESPAN_TIMEOUT_SECS),
            max_app_queue_size: DEFAULT_MAX_APP_QUEUE_SIZE,
        }
    }

    /// Sets the bind address (e.g., "0.0.0.0:8000").
    #[must_use]
    pub fn bind(mut self, addr: impl Into<String>) -> Self {
        self.bind = addr.into();
        self
    }

    /// Sets the mount prefix.
    #[must_use]
    pub fn root_path(mut self, root_path: impl Into<String>) -> Self {
        self.root_path = root_path.into();
        self
    }

    /// Sets the maximum request body size in bytes.
    #[must_use]
    pub fn max_body_size(mut self, size: usize) -> Self {
        self.max_body_size = size;
        self
    }

    /// Sets the graceful drain timeout.
    #[must_use]
    pub fn graceful_timeout(mut self, timeout: Duration) -> Self {
        self.graceful_timeout = timeout;
        self
    }

    /// Sets the blocking worker pool size. Zero is raised to one.
    #[must_use]
    pub fn worker_threads(mut self, workers: usize) -> Self {
        self.worker_threads = workers.max(1);
        self
    }

    /// Sets the lifespan startup timeout.
    #[must_use]
    pub fn startup_timeout(mut self, timeout: Duration) -> Self {
        self.startup_timeout = timeout;
        self
    }

    /// Sets the lifespan shutdown timeout.
    #[must_use]
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Sets the lifespan event queue capacity. Zero is raised to one.
    #[must_use]
    pub fn max_app_queue_size(mut self, size: usize) -> Self {
        self.max_app_queue_size = size.max(1);
        self
    }

    /// Builds the [`ServerConfig`].
    #[must_use]
    pub fn build(self) -> ServerConfig {
        ServerConfig {
            bind: self.bind,
            root_path: self.root_path,
            max_body_size: self.max_body_size,
            graceful_timeout: self.graceful_timeout,
            worker_threads: self.worker_threads,
            startup_timeout: self.startup_timeout,
            shutdown_timeout: self.shutdown_timeout,
            max_app_queue_size: self.max_app_queue_size,
        }
    }
}

impl Default for ServerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();

        assert_eq!(config.bind(), DEFAULT_BIND);
        assert_eq!(config.root_path(), "");
        assert_eq!(config.max_body_size(), 16 * 1024 * 1024);
        assert_eq!(config.startup_timeout(), Duration::from_secs(60));
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(60));
        assert_eq!(config.max_app_queue_size(), 10);
        assert_eq!(config.graceful_timeout(), Duration::from_secs(3));
    }

    #[test]
    fn test_default_worker_threads_bounds() {
        let workers = default_worker_threads();
        assert!(workers >= 5);
        assert!(workers <= 32);
    }

    #[test]
    fn test_builder_clamps_zero_sizes() {
        let config = ServerConfig::builder()
            .max_app_queue_size(0)
            .worker_threads(0)
            .build();

        assert_eq!(config.max_app_queue_size(), 1);
        assert_eq!(config.worker_threads(), 1);
    }

    #[test]
    fn test_socket_addr_parsing() {
        let config = ServerConfig::builder().bind("127.0.0.1:8080").build();
        let addr = config.socket_addr().unwrap();
        assert_eq!(addr.port(), 8080);
        assert!(addr.ip().is_loopback());

        let config = ServerConfig::builder().bind("not-an-address").build();
        assert!(config.socket_addr().is_err());
    }

    #[test]
    fn test_from_sluice_config() {
        let mut loaded = SluiceConfig::default();
        loaded.server.root_path = "/app".to_string();
        loaded.server.worker_threads = Some(3);
        loaded.lifespan.startup_timeout_secs = 7;
        loaded.lifespan.max_app_queue_size = 4;

        let config = ServerConfig::from(&loaded);

        assert_eq!(config.root_path(), "/app");
        assert_eq!(config.worker_threads(), 3);
        assert_eq!(config.startup_timeout(), Duration::from_secs(7));
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(60));
        assert_eq!(config.max_app_queue_size(), 4);
    }

    #[test]
    fn test_from_sluice_config_auto_workers() {
        let config = ServerConfig::from(&SluiceConfig::default());
        assert_eq!(config.worker_threads(), default_worker_threads());
    }
}
