//! Errors returned by [`ApiClient`](super::ApiClient) calls.

use std::time::Duration;

use nishiki_domain::NishikiError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// No usable access token, or the backend refused the one we sent.
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Client error: {0}")]
    Client(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),
}

impl ApiError {
    /// The session is gone or was rejected; only a new login fixes it.
    ///
    /// The token provider has already tried a refresh by the time this
    /// surfaces, so retrying the call is pointless.
    pub fn requires_sign_in(&self) -> bool {
        matches!(self, Self::Auth(_))
    }

    /// Worth repeating later without any user action.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::RateLimit(_) | Self::Server(_) | Self::Network(_) | Self::Timeout(_))
    }
}

impl From<NishikiError> for ApiError {
    fn from(err: NishikiError) -> Self {
        match err {
            NishikiError::Network(message) => Self::Network(message),
            NishikiError::Auth(message) => Self::Auth(message),
            NishikiError::Config(message) => Self::Config(message),
            NishikiError::NotFound(message) => Self::NotFound(message),
            NishikiError::InvalidInput(message) => Self::Client(message),
            NishikiError::Internal(message) => Self::Server(message),
        }
    }
}

impl From<ApiError> for NishikiError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Auth(message) => Self::Auth(message),
            ApiError::NotFound(message) => Self::NotFound(message),
            ApiError::Client(message) => Self::InvalidInput(message),
            ApiError::Config(message) => Self::Config(message),
            other => Self::Network(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_auth_failures_require_sign_in() {
        assert!(ApiError::Auth("expired".into()).requires_sign_in());
        assert!(!ApiError::Server("boom".into()).requires_sign_in());
        assert!(!ApiError::NotFound("/auth/me".into()).requires_sign_in());
    }

    #[test]
    fn transient_failures_exclude_caller_mistakes() {
        assert!(ApiError::RateLimit("slow down".into()).is_transient());
        assert!(ApiError::Server("502".into()).is_transient());
        assert!(ApiError::Network("reset".into()).is_transient());
        assert!(ApiError::Timeout(Duration::from_secs(5)).is_transient());

        assert!(!ApiError::Auth("expired".into()).is_transient());
        assert!(!ApiError::Client("bad request".into()).is_transient());
        assert!(!ApiError::Config("no base url".into()).is_transient());
    }

    #[test]
    fn conversions_keep_the_failure_kind() {
        let api: ApiError = NishikiError::Auth("expired".to_string()).into();
        assert!(api.requires_sign_in());

        let api: ApiError = NishikiError::InvalidInput("bad".to_string()).into();
        assert!(matches!(api, ApiError::Client(_)));

        let domain: NishikiError = ApiError::Timeout(Duration::from_secs(30)).into();
        assert!(matches!(domain, NishikiError::Network(_)));

        let domain: NishikiError = ApiError::NotFound("/auth/me".into()).into();
        assert!(matches!(domain, NishikiError::NotFound(_)));
    }
}
