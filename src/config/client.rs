//! Client runtime configuration

use serde::Deserialize;

/// Client runtime configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Environment name
    #[serde(default = "default_environment")]
    pub environment: Environment,

    /// Rust log filter directive
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit logs as JSON lines instead of human-readable text
    #[serde(default)]
    pub json_logs: bool,
}

/// Application environment
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl ClientConfig {
    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            log_level: default_log_level(),
            json_logs: false,
        }
    }
}

fn default_environment() -> Environment {
    Environment::Development
}

fn default_log_level() -> String {
    "info,loopfund_notify=debug".to_string()
}
