//! Configuration loading and validation errors

use thiserror::Error;

/// Result type alias for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is missing
    #[error("missing required environment variable: {0}")]
    MissingVar(String),

    /// An environment variable could not be parsed into its target type
    #[error("invalid value for {var}: {reason}")]
    InvalidVar { var: String, reason: String },

    /// A loaded configuration failed a semantic check
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl repomind_common::ErrorClass for ConfigError {
    fn kind(&self) -> repomind_common::ErrorKind {
        repomind_common::ErrorKind::Internal
    }
}
