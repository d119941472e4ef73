//! OAuth 2.0 Authorization Code + PKCE service
//!
//! Drives the sign-in state machine over the ports in
//! `nishiki_common::auth`:
//!
//! ```text
//! LoggedOut ──initiate_login──► PendingAuthorization
//! PendingAuthorization ──handle_callback ok──► LoggedIn(valid)
//! PendingAuthorization ──handle_callback err──► LoggedOut
//! LoggedIn(valid) ──time passes──► LoggedIn(expired)
//! LoggedIn(expired) ──refresh_token ok──► LoggedIn(valid)
//! LoggedIn(expired) ──refresh_token err──► LoggedOut
//! LoggedIn(*) ──logout──► LoggedOut
//! ```
//!
//! The service holds no session state of its own; every operation reads
//! and writes through [`SessionStore`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use nishiki_common::auth::{
    validate_state, AuthSession, CodeExchangeRequest, EntropySource, KeyValueStore, Navigator,
    OAuthConfig, OsEntropy, PendingAuthorization, PkceChallenge, StorageError, TokenEndpoint,
};
use nishiki_common::time::{Clock, SystemClock};
use tracing::{debug, error, info, warn};
use url::Url;

use super::errors::{AuthFailure, AuthServiceError};
use super::storage::SessionStore;

/// Characters of a code or state that may appear in logs.
const LOG_PREFIX_CHARS: usize = 8;

/// Sign-in service
pub struct AuthService {
    config: OAuthConfig,
    sessions: SessionStore,
    navigator: Arc<dyn Navigator>,
    tokens: Arc<dyn TokenEndpoint>,
    entropy: Arc<dyn EntropySource>,
    clock: Arc<dyn Clock>,
}

impl AuthService {
    /// Create a new auth service
    ///
    /// Uses the OS random source and the system clock; override them with
    /// [`AuthService::with_entropy`] and [`AuthService::with_clock`].
    ///
    /// # Arguments
    /// * `config` - Identity provider settings
    /// * `store` - Client-side storage that survives page reloads
    /// * `navigator` - Host navigation (redirects, current URL)
    /// * `tokens` - Backend token proxy
    pub fn new(
        config: OAuthConfig,
        store: Arc<dyn KeyValueStore>,
        navigator: Arc<dyn Navigator>,
        tokens: Arc<dyn TokenEndpoint>,
    ) -> Self {
        Self {
            config,
            sessions: SessionStore::new(store),
            navigator,
            tokens,
            entropy: Arc::new(OsEntropy),
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the random source
    pub fn with_entropy(mut self, entropy: Arc<dyn EntropySource>) -> Self {
        self.entropy = entropy;
        self
    }

    /// Replace the clock
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Identity provider settings
    #[must_use]
    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    /// Current time according to the service clock
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Whether the host is currently on the OAuth callback route
    ///
    /// True when the path of the current URL contains `callback_path`.
    /// An unreadable or unparseable location counts as not on the callback.
    pub fn is_callback(&self, callback_path: &str) -> bool {
        self.navigator
            .current_url()
            .ok()
            .and_then(|current| Url::parse(&current).ok())
            .is_some_and(|url| url.path().contains(callback_path))
    }

    /// Build the authorization request URL for `challenge`
    ///
    /// `{auth_url}/authorize/?response_type=code&client_id=…&redirect_uri=…
    /// &scope=…&state=…&code_challenge=…&code_challenge_method=S256`
    ///
    /// # Errors
    /// Returns [`AuthServiceError::Redirect`] if the configured
    /// authorization endpoint is not a valid URL
    pub fn authorization_url(&self, challenge: &PkceChallenge) -> Result<String, AuthServiceError> {
        let mut url = Url::parse(&self.config.authorization_endpoint()).map_err(|e| {
            AuthServiceError::Redirect(format!("Invalid authorization endpoint: {e}"))
        })?;

        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.config.redirect_uri)
            .append_pair("scope", &self.config.scope_string())
            .append_pair("state", &challenge.state)
            .append_pair("code_challenge", &challenge.code_challenge)
            .append_pair("code_challenge_method", challenge.challenge_method());

        Ok(url.into())
    }

    /// Start the sign-in flow
    ///
    /// Generates state and verifier, persists them, then navigates the host
    /// to the identity provider. The flow resumes in
    /// [`AuthService::handle_callback`].
    ///
    /// # Errors
    /// Returns [`AuthServiceError::Redirect`] if the random source fails,
    /// the pending authorization cannot be persisted, or navigation fails
    pub async fn initiate_login(&self) -> Result<(), AuthServiceError> {
        let challenge = PkceChallenge::generate(self.entropy.as_ref()).map_err(|e| {
            error!(error = %e, "Cannot start sign-in without a secure random source");
            AuthServiceError::Redirect(e.to_string())
        })?;
        let url = self.authorization_url(&challenge)?;

        let pending = PendingAuthorization {
            state: challenge.state.clone(),
            code_verifier: challenge.code_verifier.clone(),
        };
        if let Err(e) = self.sessions.save_pending(&pending).await {
            if let Err(clear_err) = self.sessions.clear_pending().await {
                warn!(error = %clear_err, "Failed to clear pending authorization");
            }
            return Err(AuthServiceError::Redirect(format!(
                "Failed to persist pending authorization: {e}"
            )));
        }

        info!(state = %log_prefix(&challenge.state), "Redirecting to identity provider");
        if let Err(e) = self.navigator.redirect(&url) {
            if let Err(clear_err) = self.sessions.clear_pending().await {
                warn!(error = %clear_err, "Failed to clear pending authorization");
            }
            return Err(AuthServiceError::Redirect(e.to_string()));
        }

        Ok(())
    }

    /// Complete the sign-in flow on the callback URL
    ///
    /// Validates `code` and `state` against the pending authorization,
    /// consumes it, exchanges the code through the backend and persists the
    /// resulting session. Any failure clears the pending authorization.
    ///
    /// # Errors
    /// Returns [`AuthServiceError::Auth`] on a missing code, provider
    /// error, missing or mismatched state, missing verifier, storage
    /// failure or rejected exchange
    pub async fn handle_callback(&self) -> Result<AuthSession, AuthServiceError> {
        match self.complete_callback().await {
            Ok(session) => {
                info!("Sign-in completed");
                Ok(session)
            }
            Err(failure) => {
                error!(error = %failure, "OAuth callback rejected");
                if let Err(e) = self.sessions.clear_pending().await {
                    warn!(error = %e, "Failed to clear pending authorization");
                }
                Err(failure.into())
            }
        }
    }

    async fn complete_callback(&self) -> Result<AuthSession, AuthFailure> {
        let current = self
            .navigator
            .current_url()
            .map_err(|e| AuthFailure::InvalidCallbackUrl(e.to_string()))?;
        let params = CallbackParams::parse(&current)?;

        if let Some(error) = params.error {
            let description = params.error_description;
            return Err(AuthFailure::ProviderDenied { error, description });
        }
        let code = params.code.ok_or(AuthFailure::MissingCode)?;

        let expected = self
            .sessions
            .pending_state()
            .await
            .map_err(AuthFailure::Storage)?
            .ok_or(AuthFailure::MissingState)?;
        let returned = params.state.unwrap_or_default();
        if !validate_state(&expected, &returned) {
            warn!(
                expected = %log_prefix(&expected),
                returned = %log_prefix(&returned),
                "State mismatch on callback"
            );
            return Err(AuthFailure::StateMismatch);
        }

        let code_verifier = self
            .sessions
            .pending_verifier()
            .await
            .map_err(AuthFailure::Storage)?
            .ok_or(AuthFailure::MissingVerifier)?;

        // Consumed before the exchange so a replay never reaches the backend.
        self.sessions.clear_pending().await.map_err(AuthFailure::Storage)?;

        debug!(code = %log_prefix(&code), "Exchanging authorization code");
        let redirect_uri = self.config.redirect_uri.clone();
        let request = CodeExchangeRequest { code, code_verifier, redirect_uri };
        let response = self.tokens.exchange_code(&request).await.map_err(AuthFailure::Exchange)?;

        let session = response.into_session(self.clock.now());
        self.sessions.save_session(&session).await.map_err(AuthFailure::Storage)?;

        Ok(session)
    }

    /// Read the persisted session
    ///
    /// # Errors
    /// Returns [`AuthServiceError::NotFound`] if no session is stored, it
    /// cannot be parsed, or storage is unreadable
    pub async fn stored_session(&self) -> Result<AuthSession, AuthServiceError> {
        match self.sessions.load_session().await {
            Ok(Some(session)) => Ok(session),
            Ok(None) => Err(AuthServiceError::NotFound("No session stored".to_string())),
            Err(StorageError::Serialization(e)) => {
                warn!(error = %e, "Stored session is unreadable");
                Err(AuthServiceError::NotFound(format!("Stored session is unreadable: {e}")))
            }
            Err(e) => Err(AuthServiceError::NotFound(format!("Session storage unavailable: {e}"))),
        }
    }

    /// Whether a stored session exists and has not expired
    ///
    /// Never fails and never refreshes.
    pub async fn is_token_valid(&self) -> bool {
        match self.stored_session().await {
            Ok(session) => self.is_session_valid(&session),
            Err(_) => false,
        }
    }

    /// Whether `session` is valid at the service clock's current time
    #[must_use]
    pub fn is_session_valid(&self, session: &AuthSession) -> bool {
        session.is_valid_at(self.clock.now())
    }

    /// Redeem the stored refresh token
    ///
    /// The new session replaces the old one entirely; a refresh token is
    /// kept only if the server issued one in this response.
    ///
    /// # Errors
    /// Returns [`AuthServiceError::Refresh`] if no session or refresh token
    /// is stored (no network call is made), the endpoint rejects the
    /// refresh, or the new session cannot be persisted
    pub async fn refresh_token(&self) -> Result<AuthSession, AuthServiceError> {
        let current =
            self.stored_session().await.map_err(|e| AuthServiceError::Refresh(e.to_string()))?;
        let refresh_token = current
            .usable_refresh_token()
            .ok_or_else(|| AuthServiceError::Refresh("No refresh token stored".to_string()))?;

        debug!("Refreshing access token");
        let response = self.tokens.refresh(refresh_token).await.map_err(|e| {
            warn!(error = %e, "Refresh rejected");
            AuthServiceError::Refresh(e.to_string())
        })?;

        let now = self.clock.now();
        let session = response.into_session(now);
        self.sessions.save_session(&session).await.map_err(|e| {
            AuthServiceError::Refresh(format!("Failed to persist refreshed session: {e}"))
        })?;

        info!(expires_in = session.seconds_until_expiry(now), "Access token refreshed");
        Ok(session)
    }

    /// Currently valid access token, refreshing first if it has expired
    ///
    /// Every authenticated API request goes through here.
    ///
    /// # Errors
    /// Returns [`AuthServiceError::Auth`] with [`AuthFailure::NotSignedIn`]
    /// when no session exists, [`AuthServiceError::Refresh`] when the
    /// session expired and cannot be refreshed
    pub async fn access_token(&self) -> Result<String, AuthServiceError> {
        let session = match self.sessions.load_session().await {
            Ok(Some(session)) => session,
            Ok(None) => return Err(AuthFailure::NotSignedIn.into()),
            Err(e) => return Err(AuthFailure::Storage(e).into()),
        };

        if self.is_session_valid(&session) {
            return Ok(session.access_token);
        }

        if session.usable_refresh_token().is_none() {
            return Err(AuthServiceError::Refresh(
                "Session expired and no refresh token is stored".to_string(),
            ));
        }

        debug!("Access token expired");
        let refreshed = self.refresh_token().await?;
        Ok(refreshed.access_token)
    }

    /// Sign out
    ///
    /// Clears the session and any pending authorization, then navigates to
    /// the provider's end-session endpoint when one is configured. Never
    /// fails; problems are logged.
    pub async fn logout(&self) {
        self.clear_session().await;

        if let Some(end_session_url) = &self.config.end_session_url {
            if let Err(e) = self.navigator.redirect(end_session_url) {
                warn!(error = %e, "Failed to redirect to end-session endpoint");
            }
        }

        info!("Signed out");
    }

    /// Clear local auth state without contacting the provider
    pub async fn clear_session(&self) {
        if let Err(e) = self.sessions.clear_session().await {
            warn!(error = %e, "Failed to delete stored session");
        }
        if let Err(e) = self.sessions.clear_pending().await {
            warn!(error = %e, "Failed to delete pending authorization");
        }
    }
}

/// Query parameters the provider appends to the redirect URI
#[derive(Debug, Default)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

impl CallbackParams {
    fn parse(current_url: &str) -> Result<Self, AuthFailure> {
        let url =
            Url::parse(current_url).map_err(|e| AuthFailure::InvalidCallbackUrl(e.to_string()))?;

        let mut params = Self::default();
        for (key, value) in url.query_pairs() {
            if value.is_empty() {
                continue;
            }
            let value = Some(value.into_owned());
            match key.as_ref() {
                "code" => params.code = value,
                "state" => params.state = value,
                "error" => params.error = value,
                "error_description" => params.error_description = value,
                _ => {}
            }
        }

        Ok(params)
    }
}

fn log_prefix(value: &str) -> &str {
    match value.char_indices().nth(LOG_PREFIX_CHARS) {
        Some((idx, _)) => &value[..idx],
        None => value,
    }
}
