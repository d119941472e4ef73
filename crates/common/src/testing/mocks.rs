//! Mock implementations of the auth ports
//!
//! In-memory doubles that record how they were called and can be told to
//! fail, so service tests can check both outcomes and side effects.

// Allow missing error/panic docs for test mocks - they are designed to be simple
// and errors are clearly indicated by their return types
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::auth::{
    CodeExchangeRequest, EntropyError, EntropySource, KeyValueStore, NavigationError, Navigator,
    StorageError, TokenEndpoint, TokenEndpointError, TokenResponse,
};

// Type aliases to reduce complexity
type StorageData = Arc<Mutex<HashMap<String, String>>>;
type TokenQueue = Arc<Mutex<VecDeque<Result<TokenResponse, TokenEndpointError>>>>;

/// Build a bearer token response for scripting [`MockTokenEndpoint`].
#[must_use]
pub fn token_response(
    access_token: &str,
    refresh_token: Option<&str>,
    expires_in: Option<i64>,
) -> TokenResponse {
    TokenResponse {
        access_token: access_token.to_string(),
        token_type: "Bearer".to_string(),
        refresh_token: refresh_token.map(ToString::to_string),
        expires_in,
        scope: None,
        id_token: None,
    }
}

/// In-memory key-value store
///
/// # Examples
///
/// ```
/// # tokio_test::block_on(async {
/// use nishiki_common::auth::KeyValueStore;
/// use nishiki_common::testing::MockKeyValueStore;
///
/// let store = MockKeyValueStore::new();
/// store.set("auth_state", "abc").await.unwrap();
/// assert_eq!(store.get("auth_state").await.unwrap().as_deref(), Some("abc"));
/// # });
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockKeyValueStore {
    data: StorageData,
    fail_reads: Arc<Mutex<bool>>,
    fail_writes: Arc<Mutex<bool>>,
    fail_set_key: Arc<Mutex<Option<String>>>,
}

impl MockKeyValueStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a value without going through the async trait
    pub fn insert(&self, key: &str, value: &str) {
        self.data.lock().unwrap().insert(key.to_string(), value.to_string());
    }

    /// Snapshot a value without going through the async trait
    #[must_use]
    pub fn value(&self, key: &str) -> Option<String> {
        self.data.lock().unwrap().get(key).cloned()
    }

    /// Whether `key` is currently present
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.data.lock().unwrap().contains_key(key)
    }

    /// Number of stored keys
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.lock().unwrap().len()
    }

    /// Whether the store holds no keys
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.lock().unwrap().is_empty()
    }

    /// Make every `get` fail with [`StorageError::Unavailable`]
    pub fn set_fail_reads(&self, fail: bool) {
        *self.fail_reads.lock().unwrap() = fail;
    }

    /// Make every `set` and `delete` fail with [`StorageError::Unavailable`]
    pub fn set_fail_writes(&self, fail: bool) {
        *self.fail_writes.lock().unwrap() = fail;
    }

    /// Make `set` fail for `key` only; other keys and deletes still work
    pub fn fail_set_for(&self, key: &str) {
        *self.fail_set_key.lock().unwrap() = Some(key.to_string());
    }
}

#[async_trait]
impl KeyValueStore for MockKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        if *self.fail_reads.lock().unwrap() {
            return Err(StorageError::Unavailable("mock read failure".to_string()));
        }
        Ok(self.value(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let key_blocked = self.fail_set_key.lock().unwrap().as_deref() == Some(key);
        if key_blocked || *self.fail_writes.lock().unwrap() {
            return Err(StorageError::Unavailable("mock write failure".to_string()));
        }
        self.insert(key, value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        if *self.fail_writes.lock().unwrap() {
            return Err(StorageError::Unavailable("mock write failure".to_string()));
        }
        self.data.lock().unwrap().remove(key);
        Ok(())
    }
}

/// Navigator that records redirects instead of performing them
#[derive(Debug, Clone, Default)]
pub struct MockNavigator {
    current_url: Arc<Mutex<String>>,
    redirects: Arc<Mutex<Vec<String>>>,
    should_fail: Arc<Mutex<bool>>,
}

impl MockNavigator {
    /// Create a navigator sitting on `url`
    pub fn at(url: &str) -> Self {
        let navigator = Self::default();
        navigator.set_current_url(url);
        navigator
    }

    /// Simulate the host landing on `url` (e.g. the provider callback)
    pub fn set_current_url(&self, url: &str) {
        *self.current_url.lock().unwrap() = url.to_string();
    }

    /// Make `redirect` fail with [`NavigationError::RedirectFailed`]
    pub fn set_should_fail(&self, fail: bool) {
        *self.should_fail.lock().unwrap() = fail;
    }

    /// Every URL passed to `redirect`, oldest first
    #[must_use]
    pub fn redirects(&self) -> Vec<String> {
        self.redirects.lock().unwrap().clone()
    }

    /// Most recent redirect target
    #[must_use]
    pub fn last_redirect(&self) -> Option<String> {
        self.redirects.lock().unwrap().last().cloned()
    }
}

impl Navigator for MockNavigator {
    fn redirect(&self, url: &str) -> Result<(), NavigationError> {
        if *self.should_fail.lock().unwrap() {
            return Err(NavigationError::RedirectFailed("mock navigation blocked".to_string()));
        }
        self.redirects.lock().unwrap().push(url.to_string());
        Ok(())
    }

    fn current_url(&self) -> Result<String, NavigationError> {
        let url = self.current_url.lock().unwrap().clone();
        if url.is_empty() {
            return Err(NavigationError::LocationUnavailable("no current url".to_string()));
        }
        Ok(url)
    }
}

/// Scripted token endpoint
///
/// Responses are queued per operation and consumed in order. An empty
/// queue answers with a transport error so unexpected calls fail loudly.
#[derive(Debug, Clone, Default)]
pub struct MockTokenEndpoint {
    exchange_responses: TokenQueue,
    refresh_responses: TokenQueue,
    exchange_requests: Arc<Mutex<Vec<CodeExchangeRequest>>>,
    refresh_requests: Arc<Mutex<Vec<String>>>,
}

impl MockTokenEndpoint {
    /// Create an endpoint with nothing queued
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the next result of `exchange_code`
    pub fn push_exchange(&self, result: Result<TokenResponse, TokenEndpointError>) {
        self.exchange_responses.lock().unwrap().push_back(result);
    }

    /// Queue the next result of `refresh`
    pub fn push_refresh(&self, result: Result<TokenResponse, TokenEndpointError>) {
        self.refresh_responses.lock().unwrap().push_back(result);
    }

    /// Code exchange requests received so far
    #[must_use]
    pub fn exchange_requests(&self) -> Vec<CodeExchangeRequest> {
        self.exchange_requests.lock().unwrap().clone()
    }

    /// Refresh tokens received so far
    #[must_use]
    pub fn refresh_requests(&self) -> Vec<String> {
        self.refresh_requests.lock().unwrap().clone()
    }

    /// Total number of calls across both operations
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.exchange_requests.lock().unwrap().len() + self.refresh_requests.lock().unwrap().len()
    }
}

fn next_response(queue: &TokenQueue) -> Result<TokenResponse, TokenEndpointError> {
    queue
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| {
            Err(TokenEndpointError::Transport("no mock response queued".to_string()))
        })
}

#[async_trait]
impl TokenEndpoint for MockTokenEndpoint {
    async fn exchange_code(
        &self,
        request: &CodeExchangeRequest,
    ) -> Result<TokenResponse, TokenEndpointError> {
        self.exchange_requests.lock().unwrap().push(request.clone());
        next_response(&self.exchange_responses)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, TokenEndpointError> {
        self.refresh_requests.lock().unwrap().push(refresh_token.to_string());
        next_response(&self.refresh_responses)
    }
}

/// Entropy source that fills every buffer with one byte value
#[derive(Debug, Clone, Copy)]
pub struct FixedEntropy(pub u8);

impl EntropySource for FixedEntropy {
    fn fill_bytes(&self, buf: &mut [u8]) -> Result<(), EntropyError> {
        buf.fill(self.0);
        Ok(())
    }
}

/// Entropy source that always fails
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingEntropy;

impl EntropySource for FailingEntropy {
    fn fill_bytes(&self, _buf: &mut [u8]) -> Result<(), EntropyError> {
        Err(EntropyError::Unavailable("mock entropy failure".to_string()))
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for testing::mocks.
    use super::*;

    #[tokio::test]
    async fn test_mock_store_round_trip_and_delete() {
        let store = MockKeyValueStore::new();
        store.set("k", "v").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some("v".to_string()));

        store.delete("k").await.unwrap();
        store.delete("k").await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_mock_store_failure_injection() {
        let store = MockKeyValueStore::new();
        store.set_fail_writes(true);
        assert!(store.set("k", "v").await.is_err());

        store.set_fail_reads(true);
        assert!(matches!(store.get("k").await, Err(StorageError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_mock_store_single_key_write_failure() {
        let store = MockKeyValueStore::new();
        store.fail_set_for("code_verifier");

        store.set("auth_state", "abc").await.unwrap();
        assert!(store.set("code_verifier", "xyz").await.is_err());
        store.delete("auth_state").await.unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_mock_navigator_records_redirects() {
        let navigator = MockNavigator::at("http://localhost:8080/");
        navigator.redirect("https://idp.example.com/authorize/").unwrap();

        assert_eq!(navigator.redirects().len(), 1);
        assert_eq!(navigator.current_url().unwrap(), "http://localhost:8080/");

        navigator.set_should_fail(true);
        assert!(navigator.redirect("https://elsewhere").is_err());
        assert_eq!(navigator.redirects().len(), 1);
    }

    #[tokio::test]
    async fn test_mock_token_endpoint_consumes_queue_in_order() {
        let endpoint = MockTokenEndpoint::new();
        endpoint.push_refresh(Ok(token_response("first", None, Some(60))));

        let first = endpoint.refresh("r1").await.unwrap();
        assert_eq!(first.access_token, "first");

        let second = endpoint.refresh("r2").await;
        assert!(matches!(second, Err(TokenEndpointError::Transport(_))));
        assert_eq!(endpoint.refresh_requests(), vec!["r1".to_string(), "r2".to_string()]);
        assert_eq!(endpoint.call_count(), 2);
    }

    #[test]
    fn test_entropy_doubles() {
        let mut buf = [0u8; 4];
        FixedEntropy(7).fill_bytes(&mut buf).unwrap();
        assert_eq!(buf, [7, 7, 7, 7]);

        assert!(FailingEntropy.fill_bytes(&mut buf).is_err());
    }
}
