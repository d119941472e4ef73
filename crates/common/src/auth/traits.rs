//! Ports for the auth flow
//!
//! These traits abstract the host environment (client storage, browser
//! navigation, secure randomness) and the backend token proxy, so the
//! service logic can be driven by real adapters or by test doubles.

use async_trait::async_trait;

use super::errors::{EntropyError, NavigationError, StorageError, TokenEndpointError};
use super::types::{CodeExchangeRequest, TokenResponse};

/// Persistent string key-value storage
///
/// Values survive a full page navigation (the redirect to the identity
/// provider and back).
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a value
    ///
    /// # Returns
    /// `Ok(None)` when the key is absent
    ///
    /// # Errors
    /// Returns error if the backend cannot be read
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a value, replacing any previous one
    ///
    /// # Errors
    /// Returns error if the backend rejects the write
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove a value. Removing an absent key is not an error.
    ///
    /// # Errors
    /// Returns error if the backend cannot be written
    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}

/// Top-level navigation of the host (browser window or webview)
pub trait Navigator: Send + Sync {
    /// Navigate away to `url`
    ///
    /// # Errors
    /// Returns error if the host refuses the navigation
    fn redirect(&self, url: &str) -> Result<(), NavigationError>;

    /// Full URL currently loaded, including the query string
    ///
    /// # Errors
    /// Returns error if the location cannot be determined
    fn current_url(&self) -> Result<String, NavigationError>;
}

/// Cryptographically secure random bytes
pub trait EntropySource: Send + Sync {
    /// Fill `buf` completely with random bytes
    ///
    /// # Errors
    /// Returns error if the source cannot produce secure bytes. Callers
    /// must not fall back to a weaker source.
    fn fill_bytes(&self, buf: &mut [u8]) -> Result<(), EntropyError>;
}

/// Backend token proxy that holds the client credentials
#[async_trait]
pub trait TokenEndpoint: Send + Sync {
    /// Exchange an authorization code plus PKCE verifier for tokens
    ///
    /// # Errors
    /// Returns error on transport failure, timeout, non-success status or
    /// an unparseable body
    async fn exchange_code(
        &self,
        request: &CodeExchangeRequest,
    ) -> Result<TokenResponse, TokenEndpointError>;

    /// Redeem a refresh token for a new access token
    ///
    /// # Errors
    /// Same failure modes as [`TokenEndpoint::exchange_code`]
    async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, TokenEndpointError>;
}
