//! Configuration of the global error handler.
//!
//! The main struct in this module is [`ErrorHandlerConfig`]. It can be
//! created with [`ErrorHandlerConfig::builder`], parsed from TOML with
//! [`ErrorHandlerConfig::from_toml`], or read from a file with
//! [`ErrorHandlerConfig::from_file`], and is then passed to
//! [`GlobalErrorHandler::new`](crate::GlobalErrorHandler::new).

// the config might be extended with non-Copy fields in the future
#![allow(missing_copy_implementations)]

use std::path::Path;

use derive_builder::Builder;
use derive_more::with_trait::Debug;
use handwrap_core::error::impl_into_handwrap_error;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The configuration of a [`GlobalErrorHandler`](crate::GlobalErrorHandler).
///
/// # Examples
///
/// ```
/// use handwrap::config::ErrorHandlerConfig;
///
/// let config = ErrorHandlerConfig::builder().is_dev(true).build();
/// assert!(config.is_dev);
///
/// assert!(!ErrorHandlerConfig::default().is_dev);
/// ```
#[derive(Debug, Default, Clone, PartialEq, Eq, Builder, Serialize, Deserialize)]
#[builder(build_fn(skip, error = std::convert::Infallible))]
#[serde(default)]
pub struct ErrorHandlerConfig {
    /// Development mode flag.
    ///
    /// When enabled, responses for unclassified failures include the original
    /// error message and the stack captured when the error was created.
    /// Neither is safe to show to clients, so this must stay disabled in
    /// production. Defaults to `false`.
    ///
    /// # Examples
    ///
    /// ```
    /// use handwrap::config::ErrorHandlerConfig;
    ///
    /// let config = ErrorHandlerConfig::from_toml("is_dev = true")?;
    /// assert!(config.is_dev);
    /// # Ok::<(), handwrap::Error>(())
    /// ```
    pub is_dev: bool,
}

impl ErrorHandlerConfig {
    /// Creates a new [`ErrorHandlerConfigBuilder`].
    #[must_use]
    pub fn builder() -> ErrorHandlerConfigBuilder {
        ErrorHandlerConfigBuilder::default()
    }

    /// Creates a configuration with development mode enabled.
    #[must_use]
    pub fn dev_default() -> Self {
        Self::builder().is_dev(true).build()
    }

    /// Parses a configuration from a TOML string. Missing keys take their
    /// default values.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML fails to parse as an
    /// `ErrorHandlerConfig`.
    ///
    /// # Examples
    ///
    /// ```
    /// use handwrap::config::ErrorHandlerConfig;
    ///
    /// let config = ErrorHandlerConfig::from_toml("")?;
    /// assert!(!config.is_dev);
    /// # Ok::<(), handwrap::Error>(())
    /// ```
    pub fn from_toml(toml_content: &str) -> crate::Result<Self> {
        let config: Self = toml::from_str(toml_content).map_err(ParseConfig)?;
        Ok(config)
    }

    /// Reads a configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or fails to parse as an
    /// `ErrorHandlerConfig`.
    pub fn from_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| LoadConfig {
            path: path.display().to_string(),
            source,
        })?;

        Self::from_toml(&content)
    }
}

impl ErrorHandlerConfigBuilder {
    /// Builds the error handler configuration.
    #[must_use]
    pub fn build(&self) -> ErrorHandlerConfig {
        ErrorHandlerConfig {
            is_dev: self.is_dev.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Error)]
#[error("could not read the config file at `{path}`")]
struct LoadConfig {
    path: String,
    source: std::io::Error,
}
impl_into_handwrap_error!(LoadConfig);

#[derive(Debug, Error)]
#[error("could not parse the config: {0}")]
struct ParseConfig(#[source] toml::de::Error);
impl_into_handwrap_error!(ParseConfig);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults() {
        let config = ErrorHandlerConfig::builder().build();

        assert_eq!(config, ErrorHandlerConfig::default());
        assert!(!config.is_dev);
    }

    #[test]
    fn dev_default() {
        assert!(ErrorHandlerConfig::dev_default().is_dev);
    }

    #[test]
    fn from_toml_valid() {
        let config = ErrorHandlerConfig::from_toml("is_dev = true").unwrap();

        assert!(config.is_dev);
    }

    #[test]
    fn from_toml_empty() {
        let config = ErrorHandlerConfig::from_toml("").unwrap();

        assert!(!config.is_dev);
    }

    #[test]
    fn from_toml_invalid() {
        let error = ErrorHandlerConfig::from_toml("is_dev = \"yes\"").unwrap_err();

        assert!(error.to_string().starts_with("could not parse the config"));
    }

    #[test]
    fn from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("errors.toml");
        std::fs::write(&path, "is_dev = true\n").unwrap();

        let config = ErrorHandlerConfig::from_file(&path).unwrap();

        assert!(config.is_dev);
    }

    #[test]
    fn from_file_missing() {
        let dir = tempfile::tempdir().unwrap();

        let error = ErrorHandlerConfig::from_file(dir.path().join("missing.toml")).unwrap_err();

        assert!(error.to_string().contains("could not read the config file"));
    }

    #[test]
    fn serialize_round_trip_keeps_flag() {
        let config = ErrorHandlerConfig::dev_default();

        let toml = toml::to_string(&config).unwrap();

        assert_eq!(toml.trim(), "is_dev = true");
    }
}
