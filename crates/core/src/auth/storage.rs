//! Typed access to the persisted auth keys
//!
//! | key | value |
//! |---|---|
//! | `auth_state` | CSRF state of the pending authorization |
//! | `code_verifier` | PKCE verifier of the pending authorization |
//! | `access_token` | JSON-encoded [`AuthSession`] |
//!
//! Nothing is cached in memory: every read goes to the store, so a page
//! reload in the middle of the flow sees exactly what was persisted.

use std::sync::Arc;

use nishiki_common::auth::{AuthSession, KeyValueStore, PendingAuthorization, StorageError};
use tracing::debug;

/// Key holding the pending CSRF state
pub const STATE_KEY: &str = "auth_state";

/// Key holding the pending PKCE verifier
pub const VERIFIER_KEY: &str = "code_verifier";

/// Key holding the serialized session
pub const SESSION_KEY: &str = "access_token";

/// Session and pending-authorization persistence over a [`KeyValueStore`]
#[derive(Clone)]
pub struct SessionStore {
    store: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    /// Wrap a key-value store
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Persist state and verifier ahead of the provider redirect
    ///
    /// # Errors
    /// Returns the first storage failure
    pub async fn save_pending(&self, pending: &PendingAuthorization) -> Result<(), StorageError> {
        self.store.set(STATE_KEY, &pending.state).await?;
        self.store.set(VERIFIER_KEY, &pending.code_verifier).await?;
        debug!("Pending authorization stored");
        Ok(())
    }

    /// Stored CSRF state; empty values count as absent
    ///
    /// # Errors
    /// Returns error if the store cannot be read
    pub async fn pending_state(&self) -> Result<Option<String>, StorageError> {
        self.non_empty(STATE_KEY).await
    }

    /// Stored PKCE verifier; empty values count as absent
    ///
    /// # Errors
    /// Returns error if the store cannot be read
    pub async fn pending_verifier(&self) -> Result<Option<String>, StorageError> {
        self.non_empty(VERIFIER_KEY).await
    }

    /// Delete both pending keys
    ///
    /// Both deletions are attempted even if the first one fails.
    ///
    /// # Errors
    /// Returns the first storage failure
    pub async fn clear_pending(&self) -> Result<(), StorageError> {
        let state = self.store.delete(STATE_KEY).await;
        let verifier = self.store.delete(VERIFIER_KEY).await;
        state.and(verifier)
    }

    /// Overwrite the stored session
    ///
    /// # Errors
    /// Returns error if serialization or the write fails
    pub async fn save_session(&self, session: &AuthSession) -> Result<(), StorageError> {
        let blob = serde_json::to_string(session)?;
        self.store.set(SESSION_KEY, &blob).await
    }

    /// Read the stored session
    ///
    /// # Returns
    /// `Ok(None)` when no session is stored
    ///
    /// # Errors
    /// Returns [`StorageError::Serialization`] when the blob is corrupt and
    /// the backend error when the store cannot be read
    pub async fn load_session(&self) -> Result<Option<AuthSession>, StorageError> {
        match self.non_empty(SESSION_KEY).await? {
            Some(blob) => Ok(Some(serde_json::from_str(&blob)?)),
            None => Ok(None),
        }
    }

    /// Delete the stored session
    ///
    /// # Errors
    /// Returns error if the store cannot be written
    pub async fn clear_session(&self) -> Result<(), StorageError> {
        self.store.delete(SESSION_KEY).await
    }

    async fn non_empty(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.store.get(key).await?.filter(|value| !value.is_empty()))
    }
}
