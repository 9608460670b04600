//! Authentication configuration

use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;

/// Bearer credential for the notification service.
///
/// Normally handed over by the login flow at runtime; configuring it is
/// useful for the standalone binary and for local testing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfig {
    /// Bearer token
    #[serde(default)]
    pub token: Option<Secret<String>>,
}

impl AuthConfig {
    /// The token, if one is configured and non-blank.
    pub fn token(&self) -> Option<&str> {
        self.token
            .as_ref()
            .map(|t| t.expose_secret().as_str())
            .filter(|t| !t.trim().is_empty())
    }
}
