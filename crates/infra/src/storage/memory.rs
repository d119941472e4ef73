use std::collections::HashMap;

use async_trait::async_trait;
use nishiki_common::auth::{KeyValueStore, StorageError};
use tokio::sync::RwLock;

/// In-memory key-value store
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.write().await.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_delete() {
        let store = MemoryStore::new();

        store.set("auth_state", "abc").await.unwrap();
        assert_eq!(store.get("auth_state").await.unwrap().as_deref(), Some("abc"));

        store.set("auth_state", "def").await.unwrap();
        assert_eq!(store.get("auth_state").await.unwrap().as_deref(), Some("def"));
        assert_eq!(store.len().await, 1);

        store.delete("auth_state").await.unwrap();
        assert!(store.get("auth_state").await.unwrap().is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_delete_missing_key_is_ok() {
        let store = MemoryStore::new();
        assert!(store.delete("code_verifier").await.is_ok());
    }
}
