//! Access token source for API requests

use async_trait::async_trait;
use nishiki_core::AuthService;

use super::errors::ApiError;

/// Trait for providing access tokens
///
/// This trait allows dependency injection and testing with mock providers.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    /// Get a valid access token, refreshing it first if it has expired
    async fn access_token(&self) -> Result<String, ApiError>;
}

#[async_trait]
impl AccessTokenProvider for AuthService {
    async fn access_token(&self) -> Result<String, ApiError> {
        AuthService::access_token(self)
            .await
            .map_err(|e| ApiError::Auth(format!("Failed to get access token: {}", e)))
    }
}
