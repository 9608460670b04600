//! Push endpoint derivation from the REST API origin.
//!
//! ```text
//! https://host/api  ->  wss://host/ws?token=<credential>
//! http://host:4000/api  ->  ws://host:4000/ws?token=<credential>
//! ```

use url::Url;

use super::TransportError;

/// WebSocket endpoint for one credential.
#[derive(Clone)]
pub struct WsEndpoint {
    url: Url,
}

impl WsEndpoint {
    /// Derives the push endpoint from the REST base URL.
    ///
    /// The scheme is translated (`https` → `wss`, `http` → `ws`), a trailing
    /// `/api` path segment is dropped and the path becomes `/ws`. The
    /// credential travels as the `token` query parameter.
    pub fn from_api_base(api_base: &str, credential: &str) -> Result<Self, TransportError> {
        let mut url = Url::parse(api_base)
            .map_err(|e| TransportError::InvalidEndpoint(format!("{}: {}", api_base, e)))?;

        let ws_scheme = match url.scheme() {
            "https" => "wss",
            "http" => "ws",
            other => {
                return Err(TransportError::InvalidEndpoint(format!(
                    "unsupported scheme '{}'",
                    other
                )))
            }
        };
        url.set_scheme(ws_scheme)
            .map_err(|_| TransportError::InvalidEndpoint(api_base.to_string()))?;

        let path = url.path().trim_end_matches('/');
        let prefix = path.strip_suffix("/api").unwrap_or(path).to_string();
        url.set_path(&format!("{}/ws", prefix));
        url.set_fragment(None);
        url.set_query(None);
        url.query_pairs_mut().append_pair("token", credential);

        Ok(Self { url })
    }

    /// Full URL including the credential. Do not log.
    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    /// URL with the query removed, safe for logs.
    pub fn redacted(&self) -> String {
        let mut url = self.url.clone();
        url.set_query(None);
        url.to_string()
    }
}

impl std::fmt::Debug for WsEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsEndpoint")
            .field("url", &self.redacted())
            .finish()
    }
}
