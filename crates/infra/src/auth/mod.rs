//! Auth adapters and wiring
//!
//! [`BackendTokenClient`] implements the token port against the backend
//! proxy; [`build_auth_service`] assembles an [`AuthService`] from
//! application configuration.

mod token_client;

use std::sync::Arc;

use nishiki_common::auth::{KeyValueStore, Navigator, OAuthConfig};
use nishiki_core::AuthService;
use nishiki_domain::{AppConfig, NishikiError};

pub use token_client::BackendTokenClient;

/// Map application configuration onto the OAuth client settings
pub fn oauth_config(config: &AppConfig) -> OAuthConfig {
    let mut oauth = OAuthConfig::new(
        config.client_id.clone(),
        config.auth_url.clone(),
        config.redirect_url.clone(),
    );
    if !config.scopes.is_empty() {
        oauth = oauth.with_scopes(config.scopes.clone());
    }
    if let Some(url) = config.end_session_url.as_deref().filter(|u| !u.is_empty()) {
        oauth = oauth.with_end_session_url(url);
    }
    oauth
}

/// Build an [`AuthService`] talking to the configured backend
///
/// # Errors
/// Returns [`NishikiError::Network`] if the token client cannot be built
pub fn build_auth_service(
    config: &AppConfig,
    store: Arc<dyn KeyValueStore>,
    navigator: Arc<dyn Navigator>,
) -> Result<AuthService, NishikiError> {
    let tokens = BackendTokenClient::from_config(config)?;
    Ok(AuthService::new(oauth_config(config), store, navigator, Arc::new(tokens)))
}
