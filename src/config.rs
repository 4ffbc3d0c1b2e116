//! Application configuration, loaded from TOML.
//!
//! Every field has a default, so an empty file is a valid configuration:
//!
//! ```toml
//! [logging]
//! filter = "info"
//!
//! [validation]
//! max_string_length = 2048
//!
//! [session]
//! csrf_key = "csrf_token"
//!
//! [render]
//! pretty = false
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::validate::DEFAULT_MAX_STRING_LENGTH;

/// Failure while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read
    #[error("failed to read config file '{}': {source}", path.display())]
    Io {
        /// Path that was read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
    /// The contents are not valid TOML for [`AppConfig`]
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    /// A value is out of range
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Logging settings.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// `EnvFilter` directives used when `RUST_LOG` is unset.
    #[serde(default = "default_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}

/// Input validation settings.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ValidationConfig {
    /// Upper bound on the length, in characters, of any string parameter.
    #[serde(default = "default_max_string_length")]
    pub max_string_length: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_string_length: default_max_string_length(),
        }
    }
}

/// Session settings.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Session key holding the anti-forgery token.
    #[serde(default = "default_csrf_key")]
    pub csrf_key: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            csrf_key: default_csrf_key(),
        }
    }
}

/// Rendering settings.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderConfig {
    /// Pretty-print JSON responses.
    #[serde(default)]
    pub pretty: bool,
}

/// Top-level configuration.
///
/// # Examples
///
/// ```
/// use action_pipeline::AppConfig;
///
/// let config = AppConfig::from_toml_str("[validation]\nmax_string_length = 64\n").unwrap();
///
/// assert_eq!(config.validation.max_string_length, 64);
/// assert_eq!(config.session.csrf_key, "csrf_token");
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct AppConfig {
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Validation settings.
    #[serde(default)]
    pub validation: ValidationConfig,
    /// Session settings.
    #[serde(default)]
    pub session: SessionConfig,
    /// Rendering settings.
    #[serde(default)]
    pub render: RenderConfig,
}

impl AppConfig {
    /// Loads and validates a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read, parsed or
    /// validated.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Parses and validates configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the string cannot be parsed or validated.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.validation.max_string_length == 0 {
            return Err(ConfigError::Invalid(
                "validation.max_string_length cannot be 0".to_string(),
            ));
        }
        if self.session.csrf_key.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "session.csrf_key cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_filter() -> String {
    "info".to_string()
}

fn default_max_string_length() -> usize {
    DEFAULT_MAX_STRING_LENGTH
}

fn default_csrf_key() -> String {
    "csrf_token".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_gives_defaults() {
        let config = AppConfig::from_toml_str("").unwrap();

        assert_eq!(config, AppConfig::default());
        assert_eq!(config.logging.filter, "info");
        assert_eq!(config.validation.max_string_length, 2048);
        assert_eq!(config.session.csrf_key, "csrf_token");
        assert!(!config.render.pretty);
    }

    #[test]
    fn full_file() {
        let config = AppConfig::from_toml_str(
            r#"
            [logging]
            filter = "action_pipeline=debug"

            [validation]
            max_string_length = 255

            [session]
            csrf_key = "_csrf"

            [render]
            pretty = true
            "#,
        )
        .unwrap();

        assert_eq!(config.logging.filter, "action_pipeline=debug");
        assert_eq!(config.validation.max_string_length, 255);
        assert_eq!(config.session.csrf_key, "_csrf");
        assert!(config.render.pretty);
    }

    #[test]
    fn zero_length_is_invalid() {
        let err = AppConfig::from_toml_str("[validation]\nmax_string_length = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("max_string_length")));
    }

    #[test]
    fn blank_csrf_key_is_invalid() {
        let err = AppConfig::from_toml_str("[session]\ncsrf_key = \" \"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn bad_toml_is_parse_error() {
        let err = AppConfig::from_toml_str("[validation\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn wrong_type_is_parse_error() {
        let err = AppConfig::from_toml_str("[render]\npretty = \"yes\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = AppConfig::from_file("/nonexistent/action-pipeline.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/action-pipeline.toml"));
    }

    #[test]
    fn reads_file_from_disk() {
        let path = std::env::temp_dir().join(format!("action-pipeline-{}.toml", std::process::id()));
        fs::write(&path, "[render]\npretty = true\n").unwrap();

        let config = AppConfig::from_file(&path);
        let _ = fs::remove_file(&path);

        assert!(config.unwrap().render.pretty);
    }
}
