//! Failures raised while layering `sluice.toml`, `.env` and `SLUICE__*`
//! overrides into a [`SluiceConfig`](crate::SluiceConfig).

use std::path::PathBuf;
use thiserror::Error;

/// Why a [`ConfigLoader`](crate::ConfigLoader) could not produce a config.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// `with_file` was pointed at a path that does not exist.
    #[error("config file {path} does not exist")]
    MissingFile {
        /// Requested path.
        path: PathBuf,
    },

    /// The file exists but could not be read.
    #[error("cannot read config file {path}")]
    Unreadable {
        /// Requested path.
        path: PathBuf,
        /// I/O cause.
        #[source]
        source: std::io::Error,
    },

    /// The TOML layer did not deserialize into the sluice sections.
    #[error("malformed TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    /// The JSON layer did not deserialize into the sluice sections.
    #[error("malformed JSON config: {0}")]
    Json(#[from] serde_json::Error),

    /// A loaded value is out of range, e.g. `lifespan.max_app_queue_size = 0`.
    #[error("`{field}` rejected: {reason}")]
    InvalidValue {
        /// Dotted key, `section.key`.
        field: String,
        /// What the key accepts.
        reason: String,
    },

    /// A `PREFIX__SECTION__KEY` variable names no key or holds an unparsable value.
    #[error("override {var} rejected: {reason}")]
    BadOverride {
        /// Full variable name.
        var: String,
        /// What the key accepts.
        reason: String,
    },

    /// A `.env` file exists but is not valid `KEY=value` lines.
    #[error("unusable .env file: {0}")]
    Dotenv(#[from] dotenvy::Error),

    /// Only `toml` and `json` sources are understood.
    #[error("unsupported config format: {0}")]
    UnsupportedFormat(String),
}

impl ConfigError {
    pub(crate) fn missing_file(path: impl Into<PathBuf>) -> Self {
        Self::MissingFile { path: path.into() }
    }

    pub(crate) fn unreadable(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Unreadable {
            path: path.into(),
            source,
        }
    }

    /// Reject `field` (a dotted `section.key`) with the accepted range.
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn bad_override(var: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::BadOverride {
            var: var.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn unsupported_format(what: impl Into<String>) -> Self {
        Self::UnsupportedFormat(what.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_unreadable_keeps_io_cause() {
        let cause = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = ConfigError::unreadable("/etc/sluice/sluice.toml", cause);

        assert_eq!(err.to_string(), "cannot read config file /etc/sluice/sluice.toml");
        let source = err.source().map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("denied"));
    }

    #[test]
    fn test_root_path_rejection_names_the_key() {
        let err = ConfigError::invalid_value("server.root_path", "must start with '/'");
        assert_eq!(
            err.to_string(),
            "`server.root_path` rejected: must start with '/'"
        );
    }

    #[test]
    fn test_override_names_the_variable() {
        let err = ConfigError::bad_override("SLUICE__LIFESPAN__STARTUP_TIMEOUT_SECS", "expected integer");
        assert_eq!(
            err.to_string(),
            "override SLUICE__LIFESPAN__STARTUP_TIMEOUT_SECS rejected: expected integer"
        );
    }

    #[test]
    fn test_malformed_toml_section_converts() {
        let parse = toml::from_str::<crate::SluiceConfig>("[server]\nmax_body_size = \"big\"")
            .unwrap_err();
        let err: ConfigError = parse.into();
        assert!(matches!(err, ConfigError::Toml(_)));
        assert!(err.to_string().starts_with("malformed TOML config"));
    }
}
