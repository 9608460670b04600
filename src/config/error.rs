//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid API base URL: {0}")]
    InvalidApiUrl(String),

    #[error("API base URL must use HTTPS in production")]
    ApiUrlMustBeHttps,

    #[error("Invalid request timeout")]
    InvalidTimeout,

    #[error("Page size must be between 1 and 100")]
    InvalidPageSize,

    #[error("Poll interval must be at least 5 seconds")]
    InvalidPollInterval,

    #[error("Backoff base must be positive and not exceed backoff max")]
    InvalidBackoffRange,

    #[error("Backoff multiplier must be at least 1.0")]
    InvalidBackoffMultiplier,

    #[error("Jitter factor must be between 0.0 and 1.0")]
    InvalidJitterFactor,
}
