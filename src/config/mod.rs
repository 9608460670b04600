//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `LOOPFUND_` prefix and nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use loopfund_notify::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Notifications from {}", config.api.base_url);
//! ```

mod api;
mod auth;
mod client;
mod error;
mod realtime;

pub use api::{ApiConfig, FALLBACK_API_URL};
pub use auth::AuthConfig;
pub use client::{ClientConfig, Environment};
pub use error::{ConfigError, ValidationError};
pub use realtime::RealtimeConfig;

use serde::Deserialize;

/// Legacy frontend variable still honoured for the API origin.
const LEGACY_API_URL_VAR: &str = "VITE_API_URL";

/// Root application configuration
///
/// Every section has defaults, so an empty environment yields a working
/// configuration pointed at the fallback API origin.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Client runtime (environment, logging)
    #[serde(default)]
    pub client: ClientConfig,

    /// Notification REST API
    #[serde(default)]
    pub api: ApiConfig,

    /// Push channel and reconnect policy
    #[serde(default)]
    pub realtime: RealtimeConfig,

    /// Bearer credential
    #[serde(default)]
    pub auth: AuthConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Seeds `api.base_url` from `VITE_API_URL`, else the fallback origin
    /// 3. Reads environment variables with `LOOPFUND` prefix
    /// 4. Uses `__` (double underscore) to separate nested values
    ///
    /// # Environment Variable Format
    ///
    /// - `LOOPFUND__API__BASE_URL=...` -> `api.base_url = ...`
    /// - `LOOPFUND__REALTIME__MAX_ATTEMPTS=5` -> `realtime.max_attempts = 5`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let base_url = std::env::var(LEGACY_API_URL_VAR)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| FALLBACK_API_URL.to_string());

        let config = config::Config::builder()
            .set_default("api.base_url", base_url)?
            .add_source(
                config::Environment::default()
                    .prefix("LOOPFUND")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.api.validate(&self.client.environment)?;
        self.realtime.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.client.is_production()
    }
}
