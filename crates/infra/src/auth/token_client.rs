//! Backend token proxy client
//!
//! The backend holds the client secret, so the browser never talks to the
//! identity provider's token endpoint directly. Both grants go to
//! `POST {backend_url}/auth/token` as form bodies.

use std::time::Duration;

use async_trait::async_trait;
use nishiki_common::auth::{
    CodeExchangeRequest, OAuthErrorBody, TokenEndpoint, TokenEndpointError, TokenResponse,
};
use nishiki_domain::{AppConfig, NishikiError};
use reqwest::Method;
use tracing::{debug, instrument, warn};

use crate::http::{HttpClient, RetryPolicy};

/// [`TokenEndpoint`] adapter for the backend `/auth/token` proxy
pub struct BackendTokenClient {
    http: HttpClient,
    token_url: String,
    client_id: String,
    timeout: Duration,
}

impl BackendTokenClient {
    /// Create a client for `{backend_url}/auth/token`
    ///
    /// # Errors
    /// Returns [`NishikiError::Network`] if the HTTP client cannot be built
    pub fn new(
        backend_url: &str,
        client_id: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, NishikiError> {
        // Single attempt: retrying an exchange would replay a one-time code.
        let http =
            HttpClient::builder().timeout(timeout).retry_policy(RetryPolicy::once()).build()?;

        Ok(Self {
            http,
            token_url: format!("{}/auth/token", backend_url.trim_end_matches('/')),
            client_id: client_id.into(),
            timeout,
        })
    }

    /// Create a client from application configuration
    ///
    /// # Errors
    /// Returns [`NishikiError::Network`] if the HTTP client cannot be built
    pub fn from_config(config: &AppConfig) -> Result<Self, NishikiError> {
        Self::new(&config.backend_url, config.client_id.clone(), config.token_timeout())
    }

    /// Token endpoint URL requests are posted to
    #[must_use]
    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    async fn post_form(&self, form: &[(&str, &str)]) -> Result<TokenResponse, TokenEndpointError> {
        let request = self.http.request(Method::POST, &self.token_url).form(form);

        let response = match tokio::time::timeout(self.timeout, self.http.send(request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => return Err(TokenEndpointError::Transport(err.to_string())),
            Err(_) => {
                warn!(timeout = ?self.timeout, "Token request timed out");
                return Err(TokenEndpointError::Timeout(self.timeout));
            }
        };

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TokenEndpointError::Transport(format!("Failed to read body: {}", e)))?;

        if !status.is_success() {
            return Err(rejection(status.as_u16(), &body));
        }

        serde_json::from_str(&body).map_err(|e| TokenEndpointError::InvalidResponse(e.to_string()))
    }
}

fn rejection(status: u16, body: &str) -> TokenEndpointError {
    match serde_json::from_str::<OAuthErrorBody>(body) {
        Ok(parsed) => TokenEndpointError::Rejected {
            status,
            error: parsed.error,
            description: parsed.error_description,
        },
        Err(_) => {
            let text = body.trim();
            let error =
                if text.is_empty() { format!("HTTP {}", status) } else { text.to_string() };
            TokenEndpointError::Rejected { status, error, description: None }
        }
    }
}

#[async_trait]
impl TokenEndpoint for BackendTokenClient {
    #[instrument(skip_all)]
    async fn exchange_code(
        &self,
        request: &CodeExchangeRequest,
    ) -> Result<TokenResponse, TokenEndpointError> {
        debug!(url = %self.token_url, "Posting authorization_code grant");
        self.post_form(&[
            ("grant_type", "authorization_code"),
            ("code", request.code.as_str()),
            ("code_verifier", request.code_verifier.as_str()),
            ("redirect_uri", request.redirect_uri.as_str()),
            ("client_id", self.client_id.as_str()),
        ])
        .await
    }

    #[instrument(skip_all)]
    async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, TokenEndpointError> {
        debug!(url = %self.token_url, "Posting refresh_token grant");
        self.post_form(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.client_id.as_str()),
        ])
        .await
    }
}
