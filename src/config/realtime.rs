//! Real-time (WebSocket) delivery configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Push channel and reconnect policy configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RealtimeConfig {
    /// Open the push channel at all
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// First reconnect delay in milliseconds
    #[serde(default = "default_backoff_base")]
    pub backoff_base_ms: u64,

    /// Upper bound on a single reconnect delay in milliseconds
    #[serde(default = "default_backoff_max")]
    pub backoff_max_ms: u64,

    /// Growth factor between attempts
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Random spread applied to each delay, as a fraction of it
    #[serde(default = "default_jitter_factor")]
    pub jitter_factor: f64,

    /// Consecutive failed attempts before giving up (0 = never)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl RealtimeConfig {
    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    pub fn backoff_max(&self) -> Duration {
        Duration::from_millis(self.backoff_max_ms)
    }

    /// Validate reconnect policy
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.backoff_base_ms == 0 || self.backoff_base_ms > self.backoff_max_ms {
            return Err(ValidationError::InvalidBackoffRange);
        }
        if !(self.backoff_multiplier >= 1.0) {
            return Err(ValidationError::InvalidBackoffMultiplier);
        }
        if !(0.0..=1.0).contains(&self.jitter_factor) {
            return Err(ValidationError::InvalidJitterFactor);
        }
        Ok(())
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            backoff_base_ms: default_backoff_base(),
            backoff_max_ms: default_backoff_max(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter_factor: default_jitter_factor(),
            max_attempts: default_max_attempts(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_backoff_base() -> u64 {
    1_000
}

fn default_backoff_max() -> u64 {
    30_000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_jitter_factor() -> f64 {
    0.3
}

fn default_max_attempts() -> u32 {
    10
}
