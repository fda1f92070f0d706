//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading or querying configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required file does not exist.
    #[error("configuration file not found: {path}")]
    FileNotFound {
        /// Requested path.
        path: PathBuf,
    },

    /// The file exists but could not be read.
    #[error("could not read configuration file {path}")]
    ReadError {
        /// File being read.
        path: PathBuf,
        /// I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// Malformed TOML.
    #[error("failed to parse TOML configuration: {0}")]
    TomlError(#[from] toml::de::Error),

    /// Malformed JSON.
    #[error("failed to parse JSON configuration: {0}")]
    JsonError(#[from] serde_json::Error),

    /// File extension or format name is neither TOML nor JSON.
    #[error("unsupported configuration format: {0}")]
    UnsupportedFormat(String),

    /// A value parsed but failed validation.
    #[error("invalid configuration value for {field}: {reason}")]
    InvalidValue {
        /// Dotted field name.
        field: String,
        /// What was wrong with it.
        reason: String,
    },

    /// An override variable could not be interpreted.
    #[error("failed to parse environment variable {var}: {reason}")]
    EnvParseError {
        /// Variable name, prefix included.
        var: String,
        /// Parse failure.
        reason: String,
    },

    /// A stored value could not be converted to the requested type.
    #[error("configuration value at `{path}` has the wrong type: {reason}")]
    TypeMismatch {
        /// Dotted path that was queried.
        path: String,
        /// Conversion failure.
        reason: String,
    },

    /// A required value is absent from every applicable layer.
    #[error("missing configuration value `{0}`")]
    MissingValue(String),

    /// A dotted path was empty or contained an empty segment.
    #[error("invalid configuration path `{0}`")]
    InvalidPath(String),
}

impl ConfigError {
    /// [`ConfigError::FileNotFound`] for `path`.
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// [`ConfigError::ReadError`] wrapping the I/O failure.
    pub fn read_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ReadError {
            path: path.into(),
            source,
        }
    }

    /// [`ConfigError::InvalidValue`] for a dotted field.
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// [`ConfigError::EnvParseError`] for an override variable.
    pub fn env_parse_error(var: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::EnvParseError {
            var: var.into(),
            reason: reason.into(),
        }
    }

    /// [`ConfigError::TypeMismatch`] for a queried path.
    pub fn type_mismatch(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::TypeMismatch {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
