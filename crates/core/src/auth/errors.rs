//! Auth service error types
//!
//! Four error kinds reach callers: redirect, auth, not-found and refresh.
//! [`AuthFailure`] refines the auth kind so the UI can tell a tampered
//! callback from a rejected exchange.

use nishiki_common::auth::{StorageError, TokenEndpointError};
use nishiki_domain::NishikiError;
use thiserror::Error;

/// Why a callback or token lookup was rejected
#[derive(Debug, Error)]
pub enum AuthFailure {
    /// Callback URL has no `code` parameter
    #[error("Authorization response is missing the code parameter")]
    MissingCode,

    /// Provider redirected back with `error=...`
    #[error("Identity provider denied authorization: {error}{}", describe(.description))]
    ProviderDenied {
        /// OAuth `error` code, e.g. `access_denied`
        error: String,
        /// `error_description`, when the provider sent one
        description: Option<String>,
    },

    /// No pending `auth_state` in storage (never started, or already consumed)
    #[error("No pending authorization state")]
    MissingState,

    /// Returned `state` is absent or differs from the stored one
    #[error("State parameter does not match the pending authorization")]
    StateMismatch,

    /// No pending `code_verifier` in storage
    #[error("No pending code verifier")]
    MissingVerifier,

    /// Current URL could not be read or parsed
    #[error("Invalid callback URL: {0}")]
    InvalidCallbackUrl(String),

    /// Token endpoint rejected the code or could not be reached
    #[error("Code exchange failed: {0}")]
    Exchange(#[source] TokenEndpointError),

    /// Session or pending keys could not be read or written
    #[error("Session storage failed: {0}")]
    Storage(#[source] StorageError),

    /// No session and nothing to refresh
    #[error("Not signed in")]
    NotSignedIn,
}

fn describe(description: &Option<String>) -> String {
    description.as_deref().map(|d| format!(" ({d})")).unwrap_or_default()
}

/// Error type for auth service operations
#[derive(Debug, Error)]
pub enum AuthServiceError {
    /// Navigation to the identity provider could not be performed
    #[error("Redirect failed: {0}")]
    Redirect(String),

    /// Callback, state or verifier validation failed, or the exchange was rejected
    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthFailure),

    /// No usable session is persisted
    #[error("Session not found: {0}")]
    NotFound(String),

    /// Refresh token missing or rejected
    #[error("Token refresh failed: {0}")]
    Refresh(String),
}

impl AuthServiceError {
    /// Whether the caller should send the user back to the login view
    #[must_use]
    pub fn requires_login(&self) -> bool {
        matches!(self, Self::Auth(_) | Self::NotFound(_) | Self::Refresh(_))
    }
}

impl From<AuthServiceError> for NishikiError {
    fn from(err: AuthServiceError) -> Self {
        match err {
            AuthServiceError::Redirect(msg) => Self::Internal(msg),
            AuthServiceError::NotFound(msg) => Self::NotFound(msg),
            AuthServiceError::Auth(AuthFailure::Exchange(TokenEndpointError::Transport(msg))) => {
                Self::Network(msg)
            }
            other => Self::Auth(other.to_string()),
        }
    }
}
