//! Application configuration structures

use serde::{Deserialize, Serialize};

/// Backend used when nothing else is configured.
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:3001";

/// Identity provider used when nothing else is configured.
pub const DEFAULT_AUTH_URL: &str = "https://authentik.local";

/// Path the identity provider redirects back to.
pub const DEFAULT_CALLBACK_PATH: &str = "/auth/callback";

/// Upper bound on a single token-endpoint round trip.
pub const DEFAULT_TOKEN_TIMEOUT_SECS: u64 = 30;

/// Client configuration
///
/// Every field has a default so partial TOML/JSON files load. Call
/// [`AppConfig::resolve_redirect_url`] after loading to derive the
/// redirect URL from `port` when it was left empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Backend base URL (token proxy and API)
    pub backend_url: String,

    /// Identity provider application URL (`/authorize/` is appended)
    pub auth_url: String,

    /// OAuth client ID
    pub client_id: String,

    /// OAuth redirect URI; derived from `port` when empty
    pub redirect_url: String,

    /// Local port the client UI is served on
    pub port: Option<u16>,

    /// Identity provider end-session endpoint visited on logout
    pub end_session_url: Option<String>,

    /// Requested OAuth scopes
    pub scopes: Vec<String>,

    /// Token endpoint timeout in seconds
    pub token_timeout_secs: u64,

    /// Path segment that marks the OAuth callback
    pub callback_path: String,

    /// Default tracing filter when `RUST_LOG` is unset
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            auth_url: DEFAULT_AUTH_URL.to_string(),
            client_id: String::new(),
            redirect_url: String::new(),
            port: None,
            end_session_url: None,
            scopes: ["openid", "profile", "email", "groups"]
                .iter()
                .map(ToString::to_string)
                .collect(),
            token_timeout_secs: DEFAULT_TOKEN_TIMEOUT_SECS,
            callback_path: DEFAULT_CALLBACK_PATH.to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Fill an empty `redirect_url` from `port`
    ///
    /// Produces `http://localhost:{port}{callback_path}`. An explicit
    /// redirect URL is never overwritten.
    pub fn resolve_redirect_url(&mut self) {
        if self.redirect_url.is_empty() {
            if let Some(port) = self.port {
                self.redirect_url = format!("http://localhost:{}{}", port, self.callback_path);
            }
        }
    }

    /// Token endpoint timeout as a [`std::time::Duration`]
    #[must_use]
    pub fn token_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.token_timeout_secs)
    }
}
