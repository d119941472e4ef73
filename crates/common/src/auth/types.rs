//! OAuth 2.0 types and structures
//!
//! Session, token-response and configuration types shared by the auth
//! service and its adapters.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Lifetime assumed when the token endpoint omits `expires_in`.
pub const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

/// Longest lifetime accepted from the token endpoint (one year).
pub const MAX_EXPIRES_IN_SECS: i64 = 365 * 24 * 3600;

/// Scopes requested from the identity provider.
pub const DEFAULT_SCOPES: [&str; 4] = ["openid", "profile", "email", "groups"];

/// Authenticated session persisted in client storage
///
/// Serialized with the field names `access_token`, `token_type`,
/// `refresh_token` and `expiry` (RFC 3339).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    /// Bearer token for API calls
    pub access_token: String,

    /// Token type reported by the server (normally "Bearer")
    #[serde(default = "default_token_type")]
    pub token_type: String,

    /// Refresh token, when the provider issued one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Absolute time after which `access_token` is no longer valid
    pub expiry: DateTime<Utc>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl AuthSession {
    /// Create a session with an explicit expiry
    #[must_use]
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expiry: DateTime<Utc>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: default_token_type(),
            refresh_token,
            expiry,
        }
    }

    /// Whether the access token is usable at `now`
    ///
    /// A session is valid strictly before its expiry and only while it
    /// carries a non-empty access token.
    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.access_token.is_empty() && now < self.expiry
    }

    /// Refresh token, if present and non-empty
    #[must_use]
    pub fn usable_refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref().filter(|token| !token.is_empty())
    }

    /// Seconds remaining until expiry (negative once expired)
    #[must_use]
    pub fn seconds_until_expiry(&self, now: DateTime<Utc>) -> i64 {
        (self.expiry - now).num_seconds()
    }
}

/// Token response from the backend token proxy
///
/// Standard OAuth 2.0 token response format (RFC 6749 §5.1).
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    /// Issued access token
    pub access_token: String,
    /// Token type, "Bearer" when omitted
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Refresh token, if issued in this response
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Lifetime in seconds from issue
    #[serde(default)]
    pub expires_in: Option<i64>,
    /// Granted scopes
    #[serde(default)]
    pub scope: Option<String>,
    /// OIDC ID token; accepted but not kept
    #[serde(default)]
    pub id_token: Option<String>,
}

impl TokenResponse {
    /// Build the session to persist, anchoring `expires_in` at `now`.
    ///
    /// Only the refresh token carried by this response is kept.
    /// `expires_in` is capped at [`MAX_EXPIRES_IN_SECS`].
    #[must_use]
    pub fn into_session(self, now: DateTime<Utc>) -> AuthSession {
        let lifetime = self
            .expires_in
            .filter(|secs| *secs > 0)
            .map_or(DEFAULT_EXPIRES_IN_SECS, |secs| secs.min(MAX_EXPIRES_IN_SECS));
        let expiry = now.checked_add_signed(Duration::seconds(lifetime)).unwrap_or(now);

        AuthSession {
            access_token: self.access_token,
            token_type: self.token_type,
            refresh_token: self.refresh_token.filter(|token| !token.is_empty()),
            expiry,
        }
    }
}

/// OAuth error response (RFC 6749 §5.2)
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthErrorBody {
    /// Error code, e.g. `invalid_grant`
    pub error: String,
    /// Human-readable detail
    #[serde(default)]
    pub error_description: Option<String>,
}

impl fmt::Display for OAuthErrorBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error_description {
            Some(desc) => write!(f, "{}: {}", self.error, desc),
            None => write!(f, "{}", self.error),
        }
    }
}

/// State and verifier that must survive the redirect to the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAuthorization {
    /// CSRF state sent to the provider
    pub state: String,
    /// PKCE verifier whose challenge was sent
    pub code_verifier: String,
}

/// Authorization-code exchange parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeExchangeRequest {
    /// Authorization code from the callback
    pub code: String,
    /// Verifier matching the challenge in the authorization request
    pub code_verifier: String,
    /// Redirect URI used in the authorization request
    pub redirect_uri: String,
}

/// Identity provider settings used to build authorization requests
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    /// OAuth client ID registered with the provider
    pub client_id: String,

    /// Provider application base URL; `/authorize/` is appended
    pub auth_url: String,

    /// Where the provider sends the browser back to
    pub redirect_uri: String,

    /// Requested scopes
    pub scopes: Vec<String>,

    /// Provider end-session endpoint, visited on logout when set
    pub end_session_url: Option<String>,
}

impl OAuthConfig {
    /// Create a configuration with the default scope set
    #[must_use]
    pub fn new(
        client_id: impl Into<String>,
        auth_url: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            auth_url: auth_url.into(),
            redirect_uri: redirect_uri.into(),
            scopes: DEFAULT_SCOPES.iter().map(ToString::to_string).collect(),
            end_session_url: None,
        }
    }

    /// Override the requested scopes
    #[must_use]
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Set the provider end-session endpoint
    #[must_use]
    pub fn with_end_session_url(mut self, url: impl Into<String>) -> Self {
        self.end_session_url = Some(url.into());
        self
    }

    /// Authorization endpoint: `{auth_url}/authorize/`
    #[must_use]
    pub fn authorization_endpoint(&self) -> String {
        format!("{}/authorize/", self.auth_url.trim_end_matches('/'))
    }

    /// Scopes joined with single spaces
    #[must_use]
    pub fn scope_string(&self) -> String {
        self.scopes.join(" ")
    }
}
