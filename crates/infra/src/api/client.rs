//! API client for the Nishiki backend
//!
//! Authenticated calls fetch a token from the [`AccessTokenProvider`] per
//! request; `/health` and `/auth/oidc-config` are public and go out
//! without one.

use std::sync::Arc;
use std::time::Duration;

use nishiki_domain::{AppConfig, AuthInfo, OidcConfiguration, DEFAULT_BACKEND_URL};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument, warn};

use super::auth::AccessTokenProvider;
use super::errors::ApiError;
use crate::http::HttpClient;

/// Configuration for API client
#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    /// Backend base URL (e.g., "http://localhost:3001")
    pub base_url: String,
    /// Timeout for API requests
    pub timeout: Duration,
    /// OAuth client ID sent to `/auth/oidc-config`
    pub client_id: String,
}

impl Default for ApiClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BACKEND_URL.to_string(),
            timeout: Duration::from_secs(30),
            client_id: String::new(),
        }
    }
}

/// Backend API client
pub struct ApiClient {
    http_client: Arc<HttpClient>,
    auth: Arc<dyn AccessTokenProvider>,
    config: ApiClientConfig,
}

impl ApiClient {
    /// Create a new API client
    ///
    /// # Errors
    ///
    /// Returns error if the HttpClient cannot be created
    pub fn new(
        config: ApiClientConfig,
        auth: Arc<dyn AccessTokenProvider>,
    ) -> Result<Self, ApiError> {
        let http_client = HttpClient::builder()
            .timeout(config.timeout)
            .max_attempts(3)
            .build()
            .map_err(|e| ApiError::Config(format!("Failed to build HttpClient: {}", e)))?;

        let base_url = config.base_url.trim_end_matches('/').to_string();
        let config = ApiClientConfig { base_url, ..config };

        Ok(Self { http_client: Arc::new(http_client), auth, config })
    }

    /// Create a builder for fluent configuration
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::default()
    }

    /// Execute an authenticated GET request
    ///
    /// # Errors
    ///
    /// Returns error if no token is available, the request fails, or the
    /// response cannot be deserialized
    #[instrument(skip(self), fields(path = %path))]
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = format!("{}{}", self.config.base_url, path);
        debug!(url = %url, "GET request");

        let token = self.auth.access_token().await?;
        let request = self
            .http_client
            .request(Method::GET, &url)
            .bearer_auth(token)
            .header("Accept", "application/json");

        let response = self.execute(request).await?;
        let result = Self::decode(response, &url).await?;

        info!(path = %path, "GET request successful");
        Ok(result)
    }

    /// Current user and verified claims (`GET /auth/me`)
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Auth`] when signed out or the token is rejected
    pub async fn current_user(&self) -> Result<AuthInfo, ApiError> {
        self.get("/auth/me").await
    }

    /// Identity provider discovery document (`GET /auth/oidc-config`)
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the document is malformed
    #[instrument(skip(self))]
    pub async fn oidc_config(&self) -> Result<OidcConfiguration, ApiError> {
        let url = format!("{}/auth/oidc-config", self.config.base_url);
        debug!(url = %url, "Fetching OIDC configuration");

        let request = self
            .http_client
            .request(Method::GET, &url)
            .query(&[("client_id", self.config.client_id.as_str())]);

        let response = self.execute(request).await?;
        Self::decode(response, &url).await
    }

    /// Health check for API
    ///
    /// # Returns
    ///
    /// `true` if API is reachable and healthy
    ///
    /// # Errors
    ///
    /// Returns error if the backend cannot be reached
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<bool, ApiError> {
        let url = format!("{}/health", self.config.base_url);
        let timeout = Duration::from_secs(5);

        let request = self.http_client.request(Method::GET, &url);
        let response = tokio::time::timeout(timeout, self.http_client.send(request))
            .await
            .map_err(|_| {
                warn!("Health check timeout");
                ApiError::Timeout(timeout)
            })?;

        match response {
            Ok(resp) if resp.status().is_success() => Ok(true),
            Ok(resp) => {
                warn!(status = %resp.status(), "API returned non-success status");
                Ok(false)
            }
            Err(e) => {
                warn!(error = %e, "Health check failed");
                Err(ApiError::from(e))
            }
        }
    }

    async fn execute(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let timeout = self.config.timeout;
        match tokio::time::timeout(timeout, self.http_client.send(request)).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(err)) => Err(ApiError::from(err)),
            Err(_) => Err(ApiError::Timeout(timeout)),
        }
    }

    async fn decode<T: DeserializeOwned>(response: Response, url: &str) -> Result<T, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::map_status_error(status, url, body));
        }

        response
            .json()
            .await
            .map_err(|e| ApiError::Client(format!("Failed to parse response: {}", e)))
    }

    fn map_status_error(status: StatusCode, url: &str, body: String) -> ApiError {
        let message = if body.is_empty() {
            format!("{} returned status {}", url, status)
        } else {
            format!("{} returned status {}: {}", url, status, body)
        };

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ApiError::Auth(message),
            StatusCode::NOT_FOUND => ApiError::NotFound(message),
            StatusCode::TOO_MANY_REQUESTS => ApiError::RateLimit(message),
            s if s.is_server_error() => ApiError::Server(message),
            s if s.is_client_error() => ApiError::Client(message),
            _ => ApiError::Network(message),
        }
    }
}

/// Builder for API client
#[derive(Default)]
pub struct ApiClientBuilder {
    config: Option<ApiClientConfig>,
    auth: Option<Arc<dyn AccessTokenProvider>>,
}

impl ApiClientBuilder {
    /// Set the API configuration
    pub fn config(mut self, config: ApiClientConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the authentication provider
    pub fn auth(mut self, auth: Arc<dyn AccessTokenProvider>) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Build the API client
    ///
    /// # Errors
    ///
    /// Returns error if required fields are missing or client creation fails
    pub fn build(self) -> Result<ApiClient, ApiError> {
        let config = self.config.unwrap_or_default();
        let auth =
            self.auth.ok_or_else(|| ApiError::Config("Auth provider not set".to_string()))?;

        ApiClient::new(config, auth)
    }
}

impl From<&AppConfig> for ApiClientConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            base_url: config.backend_url.clone(),
            timeout: config.token_timeout(),
            client_id: config.client_id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[derive(Clone)]
    struct MockAuthProvider {
        token: Option<String>,
    }

    #[async_trait]
    impl AccessTokenProvider for MockAuthProvider {
        async fn access_token(&self) -> Result<String, ApiError> {
            self.token.clone().ok_or_else(|| ApiError::Auth("not signed in".to_string()))
        }
    }

    fn client(server: &MockServer, token: Option<&str>) -> ApiClient {
        let config = ApiClientConfig {
            base_url: server.uri(),
            client_id: "nishiki".to_string(),
            ..Default::default()
        };
        let auth = Arc::new(MockAuthProvider { token: token.map(ToString::to_string) });
        ApiClient::new(config, auth).unwrap()
    }

    fn auth_info_body() -> serde_json::Value {
        json!({
            "user": {"id": "u1", "name": "Alice", "email": "alice@example.com"},
            "claims": {
                "subject": "sub-1",
                "email": "alice@example.com",
                "username": "alice",
                "groups": ["nishiki-admins"],
                "expires_at": 1700003600,
                "issued_at": 1700000000
            }
        })
    }

    #[tokio::test]
    async fn test_current_user_sends_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/me"))
            .and(header("Authorization", "Bearer tok1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(auth_info_body()))
            .expect(1)
            .mount(&server)
            .await;

        let info = client(&server, Some("tok1")).current_user().await.unwrap();

        assert_eq!(info.user.name, "Alice");
        assert!(info.claims.in_group("nishiki-admins"));
    }

    #[tokio::test]
    async fn test_signed_out_never_reaches_backend() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(auth_info_body()))
            .expect(0)
            .mount(&server)
            .await;

        let result = client(&server, None).current_user().await;
        assert!(matches!(result, Err(ApiError::Auth(_))));
    }

    #[tokio::test]
    async fn test_oidc_config_is_public_and_scoped_to_client() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/oidc-config"))
            .and(query_param("client_id", "nishiki"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "issuer": "https://auth.example.com/application/o/nishiki/",
                "authorization_endpoint": "https://auth.example.com/application/o/authorize/",
                "token_endpoint": "https://auth.example.com/application/o/token/",
                "end_session_endpoint": "https://auth.example.com/application/o/nishiki/end-session/"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let discovery = client(&server, None).oidc_config().await.unwrap();

        assert_eq!(
            discovery.end_session_endpoint.as_deref(),
            Some("https://auth.example.com/application/o/nishiki/end-session/")
        );
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let cases = [
            (401, "auth"),
            (403, "auth"),
            (404, "not_found"),
            (429, "rate_limit"),
            (400, "client"),
        ];

        for (status, expected) in cases {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/auth/me"))
                .respond_with(ResponseTemplate::new(status))
                .mount(&server)
                .await;

            let err = client(&server, Some("tok")).current_user().await.unwrap_err();
            let actual = match err {
                ApiError::Auth(_) => "auth",
                ApiError::NotFound(_) => "not_found",
                ApiError::RateLimit(_) => "rate_limit",
                ApiError::Client(_) => "client",
                other => panic!("unexpected error for {status}: {other:?}"),
            };
            assert_eq!(actual, expected, "status {status}");
        }
    }

    #[tokio::test]
    async fn test_server_error_after_retries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/me"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let config = ApiClientConfig { base_url: server.uri(), ..Default::default() };
        let auth = Arc::new(MockAuthProvider { token: Some("tok".to_string()) });
        let client = ApiClient::new(config, auth).unwrap();

        let err = client.current_user().await.unwrap_err();
        assert!(matches!(err, ApiError::Server(_)));
    }

    #[tokio::test]
    async fn test_health_check() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        assert!(client(&server, None).health_check().await.unwrap());
    }

    #[tokio::test]
    async fn test_builder_missing_auth() {
        let result = ApiClient::builder().build();
        assert!(matches!(result, Err(ApiError::Config(_))));
    }
}
