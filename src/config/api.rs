//! Notification REST API configuration

use serde::Deserialize;
use std::time::Duration;
use url::Url;

use super::client::Environment;
use super::error::ValidationError;

/// Base URL used when neither `LOOPFUND__API__BASE_URL` nor `VITE_API_URL` is set.
pub const FALLBACK_API_URL: &str = "https://loopfund.onrender.com/api";

/// REST API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// API origin including the `/api` path prefix
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Page size for the notification list
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Periodic REST refresh; disabled when unset
    #[serde(default)]
    pub poll_interval_secs: Option<u64>,
}

impl ApiConfig {
    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Get poll interval as Duration, if polling is enabled
    pub fn poll_interval(&self) -> Option<Duration> {
        self.poll_interval_secs.map(Duration::from_secs)
    }

    /// Validate API configuration
    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        if self.base_url.is_empty() {
            return Err(ValidationError::MissingRequired("API_BASE_URL"));
        }
        let url = Url::parse(&self.base_url)
            .map_err(|e| ValidationError::InvalidApiUrl(e.to_string()))?;
        match url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(ValidationError::InvalidApiUrl(format!(
                    "unsupported scheme '{}'",
                    other
                )))
            }
        }
        if *environment == Environment::Production && url.scheme() != "https" {
            return Err(ValidationError::ApiUrlMustBeHttps);
        }
        if self.request_timeout_secs == 0 || self.request_timeout_secs > 120 {
            return Err(ValidationError::InvalidTimeout);
        }
        if self.page_size == 0 || self.page_size > 100 {
            return Err(ValidationError::InvalidPageSize);
        }
        if matches!(self.poll_interval_secs, Some(secs) if secs < 5) {
            return Err(ValidationError::InvalidPollInterval);
        }
        Ok(())
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout(),
            page_size: default_page_size(),
            poll_interval_secs: None,
        }
    }
}

fn default_base_url() -> String {
    FALLBACK_API_URL.to_string()
}

fn default_request_timeout() -> u64 {
    15
}

fn default_page_size() -> u32 {
    20
}
