//! Core error types for sprintlens-core.
//!
//! Data-quality problems never surface here: malformed hours, unknown
//! statuses and orphan worklogs are clamped or reported inside the analytics
//! records. Errors are reserved for caller mistakes and configuration I/O.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for sprintlens-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Unknown aggregation dimension key
    #[error("Invalid dimension '{0}': expected one of type, feature, module, client, responsible, status, complexity")]
    InvalidDimension(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseFailed(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
