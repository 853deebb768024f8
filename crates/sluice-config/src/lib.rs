//! Typed configuration for the Sluice application server.
//!
//! - TOML and JSON configuration files
//! - Environment variable overrides (`PREFIX__SECTION__KEY`)
//! - Strict validation (unknown fields are rejected)
//!
//! # Example
//!
//! ```no_run
//! use sluice_config::ConfigLoader;
//!
//! # fn main() -> Result<(), sluice_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_dotenv()?
//!     .with_optional_file("sluice.toml")?
//!     .with_env_prefix("SLUICE")
//!     .load()?;
//!
//! println!("listening on {}", config.server.bind);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration File Format
//!
//! ```toml
//! [server]
//! bind = "0.0.0.0:8000"
//! root_path = "/api"
//! max_body_size = 16777216
//! graceful_timeout_secs = 3
//!
//! [lifespan]
//! startup_timeout_secs = 60
//! shutdown_timeout_secs = 60
//! max_app_queue_size = 10
//!
//! [logging]
//! level = "info"
//! format = "json"
//!
//! [metrics]
//! enabled = true
//! addr = "0.0.0.0:9090"
//! ```

#![doc(html_root_url = "https://docs.rs/sluice-config/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::{SluiceConfig, SluiceConfigBuilder};
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::{
    LifespanSection, LogFormat, LoggingSection, MetricsSection, ServerSection,
    DEFAULT_MAX_BODY_SIZE,
};
