//! Error types raised by the auth ports
//!
//! Each port gets its own error so adapters can report failures precisely
//! and the service layer decides which auth error kind they become.

use std::time::Duration;

use thiserror::Error;

/// Key-value storage failures
#[derive(Debug, Error)]
pub enum StorageError {
    /// Storage backend is not reachable (quota, permissions, missing origin)
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// Backend read or write failed
    #[error("Storage I/O failed: {0}")]
    Io(String),

    /// Persisted data could not be encoded or decoded
    #[error("Storage serialization failed: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Navigation failures (redirects and location lookups)
#[derive(Debug, Error)]
pub enum NavigationError {
    /// Host refused or could not perform the redirect
    #[error("Redirect failed: {0}")]
    RedirectFailed(String),

    /// Current location is not available
    #[error("Current URL unavailable: {0}")]
    LocationUnavailable(String),
}

/// Secure random source failures
#[derive(Debug, Error)]
pub enum EntropyError {
    #[error("Secure random source unavailable: {0}")]
    Unavailable(String),
}

/// Token endpoint (backend proxy) failures
#[derive(Debug, Error)]
pub enum TokenEndpointError {
    /// Endpoint answered with a non-success status
    #[error("Token endpoint rejected request ({status}): {error}{}", describe(.description))]
    Rejected { status: u16, error: String, description: Option<String> },

    /// Request never completed
    #[error("Token endpoint transport error: {0}")]
    Transport(String),

    /// Request exceeded the configured timeout
    #[error("Token endpoint timed out after {0:?}")]
    Timeout(Duration),

    /// Success status but the body was not a token response
    #[error("Invalid token response: {0}")]
    InvalidResponse(String),
}

fn describe(description: &Option<String>) -> String {
    description.as_deref().map(|d| format!(": {d}")).unwrap_or_default()
}
