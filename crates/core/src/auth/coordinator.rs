//! Startup routing and auth event queue
//!
//! Decides which view the host shows on load and reports sign-in progress
//! as [`AuthEvent`]s over an unbounded channel. The callback exchange runs
//! on its own task so the UI never blocks on the network; its outcome
//! arrives as an event.

use std::sync::Arc;

use nishiki_common::auth::AuthSession;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

use super::errors::AuthServiceError;
use super::service::AuthService;

/// View the host should display after [`AuthCoordinator::initialize`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthView {
    /// No usable session
    Login,
    /// Callback exchange in flight; wait for an event
    CompletingSignIn,
    /// Valid session available
    SignedIn,
}

/// Auth state changes delivered to the host
#[derive(Debug, Clone)]
pub enum AuthEvent {
    /// A valid stored session was found on startup
    SessionRestored(AuthSession),
    /// Callback exchange succeeded
    SignedIn(AuthSession),
    /// Callback exchange failed
    SignInFailed(String),
    /// Expired session was refreshed on startup
    SessionRefreshed(AuthSession),
    /// Expired session could not be refreshed and was cleared
    SessionExpired(String),
    /// User signed out
    SignedOut,
}

/// Routes the host between login, callback and signed-in states
pub struct AuthCoordinator {
    service: Arc<AuthService>,
    callback_path: String,
    events: UnboundedSender<AuthEvent>,
}

impl AuthCoordinator {
    /// Create a coordinator and the receiving end of its event queue
    ///
    /// # Arguments
    /// * `service` - Shared auth service
    /// * `callback_path` - Path segment marking the OAuth callback (e.g.
    ///   `/auth/callback`)
    pub fn new(
        service: Arc<AuthService>,
        callback_path: impl Into<String>,
    ) -> (Self, UnboundedReceiver<AuthEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        (Self { service, callback_path: callback_path.into(), events }, receiver)
    }

    /// Shared auth service
    #[must_use]
    pub fn service(&self) -> &Arc<AuthService> {
        &self.service
    }

    /// Decide the initial view
    ///
    /// On the callback route a still-valid session (page reload after
    /// sign-in) is reused; otherwise the exchange is spawned and
    /// [`AuthView::CompletingSignIn`] returned. Elsewhere a stored session
    /// is restored or refreshed, and cleared if refreshing fails.
    pub async fn initialize(&self) -> AuthView {
        if self.service.is_callback(&self.callback_path) {
            return self.resume_callback().await;
        }

        let session = match self.service.stored_session().await {
            Ok(session) => session,
            Err(e) => {
                debug!(reason = %e, "No stored session");
                return AuthView::Login;
            }
        };

        if self.service.is_session_valid(&session) {
            info!("Stored session restored");
            self.emit(AuthEvent::SessionRestored(session));
            return AuthView::SignedIn;
        }

        match self.service.refresh_token().await {
            Ok(session) => {
                self.emit(AuthEvent::SessionRefreshed(session));
                AuthView::SignedIn
            }
            Err(e) => {
                warn!(error = %e, "Stored session expired and could not be refreshed");
                self.service.clear_session().await;
                self.emit(AuthEvent::SessionExpired(e.to_string()));
                AuthView::Login
            }
        }
    }

    async fn resume_callback(&self) -> AuthView {
        if let Ok(session) = self.service.stored_session().await {
            if self.service.is_session_valid(&session) {
                debug!("Callback route reloaded with a valid session");
                self.emit(AuthEvent::SessionRestored(session));
                return AuthView::SignedIn;
            }
        }

        let service = Arc::clone(&self.service);
        let events = self.events.clone();
        tokio::spawn(async move {
            let event = match service.handle_callback().await {
                Ok(session) => AuthEvent::SignedIn(session),
                Err(e) => AuthEvent::SignInFailed(e.to_string()),
            };
            if events.send(event).is_err() {
                debug!("Auth event receiver dropped");
            }
        });

        AuthView::CompletingSignIn
    }

    /// Start the sign-in redirect
    ///
    /// # Errors
    /// Propagates [`AuthService::initiate_login`] failures
    pub async fn login(&self) -> Result<(), AuthServiceError> {
        self.service.initiate_login().await
    }

    /// Sign out and notify the host
    pub async fn logout(&self) {
        self.service.logout().await;
        self.emit(AuthEvent::SignedOut);
    }

    fn emit(&self, event: AuthEvent) {
        if self.events.send(event).is_err() {
            debug!("Auth event receiver dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for auth::coordinator.
    use chrono::Duration;
    use nishiki_common::auth::{OAuthConfig, TokenEndpointError};
    use nishiki_common::testing::{
        token_response, FixedEntropy, MockClock, MockKeyValueStore, MockNavigator,
        MockTokenEndpoint,
    };
    use nishiki_common::time::Clock;

    use super::*;
    use crate::auth::storage::{SESSION_KEY, STATE_KEY, VERIFIER_KEY};

    const HOME: &str = "http://localhost:8080/";
    const CALLBACK_PATH: &str = "/auth/callback";

    struct Fixture {
        store: MockKeyValueStore,
        navigator: MockNavigator,
        tokens: MockTokenEndpoint,
        clock: MockClock,
        coordinator: AuthCoordinator,
        events: UnboundedReceiver<AuthEvent>,
    }

    fn fixture(current_url: &str) -> Fixture {
        let store = MockKeyValueStore::new();
        let navigator = MockNavigator::at(current_url);
        let tokens = MockTokenEndpoint::new();
        let clock = MockClock::from_timestamp(1_700_000_000);
        let config = OAuthConfig::new(
            "nishiki",
            "https://auth.example.com/application/o",
            "http://localhost:8080/auth/callback",
        );
        let service = AuthService::new(
            config,
            Arc::new(store.clone()),
            Arc::new(navigator.clone()),
            Arc::new(tokens.clone()),
        )
        .with_entropy(Arc::new(FixedEntropy(9)))
        .with_clock(Arc::new(clock.clone()));

        let (coordinator, events) = AuthCoordinator::new(Arc::new(service), CALLBACK_PATH);
        Fixture { store, navigator, tokens, clock, coordinator, events }
    }

    fn seed_session(f: &Fixture, session: &AuthSession) {
        f.store.insert(SESSION_KEY, &serde_json::to_string(session).unwrap());
    }

    /// Validates `AuthCoordinator::initialize` with empty storage.
    ///
    /// Assertions:
    /// - Confirms the login view is shown and no event is emitted.
    #[tokio::test]
    async fn test_no_session_shows_login() {
        let mut f = fixture(HOME);

        assert_eq!(f.coordinator.initialize().await, AuthView::Login);
        assert!(f.events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_valid_session_is_restored() {
        let mut f = fixture(HOME);
        seed_session(&f, &AuthSession::new("tok", None, f.clock.now() + Duration::hours(1)));

        assert_eq!(f.coordinator.initialize().await, AuthView::SignedIn);
        assert!(matches!(f.events.try_recv(), Ok(AuthEvent::SessionRestored(_))));
    }

    /// Validates startup with an expired but refreshable session.
    ///
    /// Assertions:
    /// - Confirms the signed-in view is shown.
    /// - Confirms `SessionRefreshed` carries the new access token.
    #[tokio::test]
    async fn test_expired_session_is_refreshed() {
        let mut f = fixture(HOME);
        seed_session(&f, &AuthSession::new("old", Some("ref".to_string()), f.clock.now()));
        f.tokens.push_refresh(Ok(token_response("new", Some("ref2"), Some(600))));

        assert_eq!(f.coordinator.initialize().await, AuthView::SignedIn);
        match f.events.try_recv() {
            Ok(AuthEvent::SessionRefreshed(session)) => assert_eq!(session.access_token, "new"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    /// Validates startup when the refresh fails.
    ///
    /// Assertions:
    /// - Confirms the login view and a `SessionExpired` event.
    /// - Ensures the stale session is removed from storage.
    #[tokio::test]
    async fn test_failed_refresh_clears_session() {
        let mut f = fixture(HOME);
        seed_session(&f, &AuthSession::new("old", Some("ref".to_string()), f.clock.now()));
        f.tokens.push_refresh(Err(TokenEndpointError::Transport("offline".to_string())));

        assert_eq!(f.coordinator.initialize().await, AuthView::Login);
        assert!(matches!(f.events.try_recv(), Ok(AuthEvent::SessionExpired(_))));
        assert!(!f.store.contains(SESSION_KEY));
    }

    /// Validates that a callback URL shows `CompletingSignIn` immediately and
    /// reports `SignedIn` once the background exchange finishes.
    #[tokio::test]
    async fn test_callback_exchange_runs_in_background() {
        let mut f = fixture("http://localhost:8080/auth/callback?code=AUTHCODE&state=abc");
        f.store.insert(STATE_KEY, "abc");
        f.store.insert(VERIFIER_KEY, "xyz");
        f.tokens.push_exchange(Ok(token_response("tok1", Some("ref1"), Some(3600))));

        assert_eq!(f.coordinator.initialize().await, AuthView::CompletingSignIn);

        match f.events.recv().await {
            Some(AuthEvent::SignedIn(session)) => assert_eq!(session.access_token, "tok1"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    /// Validates that a rejected callback still reports an event.
    ///
    /// Assertions:
    /// - Confirms `SignInFailed` is delivered for a state mismatch.
    /// - Confirms the token endpoint was never called.
    #[tokio::test]
    async fn test_callback_failure_is_reported() {
        let mut f = fixture("http://localhost:8080/auth/callback?code=AUTHCODE&state=WRONG");
        f.store.insert(STATE_KEY, "abc");
        f.store.insert(VERIFIER_KEY, "xyz");

        assert_eq!(f.coordinator.initialize().await, AuthView::CompletingSignIn);
        assert!(matches!(f.events.recv().await, Some(AuthEvent::SignInFailed(_))));
        assert_eq!(f.tokens.call_count(), 0);
    }

    /// Validates that reloading the callback page with a valid session skips
    /// the exchange.
    #[tokio::test]
    async fn test_reloaded_callback_reuses_valid_session() {
        let mut f = fixture("http://localhost:8080/auth/callback?code=AUTHCODE&state=abc");
        seed_session(&f, &AuthSession::new("tok", None, f.clock.now() + Duration::hours(1)));

        assert_eq!(f.coordinator.initialize().await, AuthView::SignedIn);
        assert!(matches!(f.events.try_recv(), Ok(AuthEvent::SessionRestored(_))));
        assert_eq!(f.tokens.call_count(), 0);
    }

    #[tokio::test]
    async fn test_login_and_logout() {
        let mut f = fixture(HOME);

        f.coordinator.login().await.unwrap();
        assert_eq!(f.navigator.redirects().len(), 1);

        f.coordinator.logout().await;
        assert!(f.store.is_empty());
        assert!(matches!(f.events.try_recv(), Ok(AuthEvent::SignedOut)));
    }
}
