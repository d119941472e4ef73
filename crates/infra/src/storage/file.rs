//! JSON file backed key-value store
//!
//! The whole map is rewritten on every change. Writes land in a sibling
//! `.tmp` file that is renamed over the target, so a crash mid-write
//! leaves the previous contents intact. A file that no longer parses is
//! an error for reads but is replaced by the next write.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use nishiki_common::auth::{KeyValueStore, StorageError};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Key-value store persisted as a single JSON object
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Open a store at `path`; the file is created on the first write
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), write_lock: Mutex::new(()) }
    }

    /// Backing file location
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_map(&self) -> Result<BTreeMap<String, String>, StorageError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => {
                return Err(StorageError::Io(format!(
                    "Failed to read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        Ok(serde_json::from_str(&contents)?)
    }

    /// Current map for a read-modify-write cycle, and whether the file on
    /// disk was unparsable and must be rewritten.
    async fn map_for_update(&self) -> Result<(BTreeMap<String, String>, bool), StorageError> {
        match self.read_map().await {
            Ok(map) => Ok((map, false)),
            Err(StorageError::Serialization(e)) => {
                warn!(path = %self.path.display(), error = %e, "Discarding unparsable store file");
                Ok((BTreeMap::new(), true))
            }
            Err(e) => Err(e),
        }
    }

    async fn write_map(&self, map: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                StorageError::Unavailable(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }

        let json = serde_json::to_string_pretty(map)?;
        let tmp = self.path.with_extension("tmp");

        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| StorageError::Io(format!("Failed to write {}: {}", tmp.display(), e)))?;

        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            if let Err(cleanup) = tokio::fs::remove_file(&tmp).await {
                warn!(path = %tmp.display(), error = %cleanup, "Failed to remove temp file");
            }
            return Err(StorageError::Io(format!(
                "Failed to replace {}: {}",
                self.path.display(),
                e
            )));
        }

        debug!(path = %self.path.display(), keys = map.len(), "Store written");
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.read_map().await?.remove(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        let (mut map, _) = self.map_for_update().await?;
        map.insert(key.to_string(), value.to_string());
        self.write_map(&map).await
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        let (mut map, corrupt) = self.map_for_update().await?;
        if map.remove(key).is_none() && !corrupt {
            return Ok(());
        }
        self.write_map(&map).await
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for storage::file.
    use tempfile::TempDir;

    use super::*;

    fn store_in(dir: &TempDir) -> FileStore {
        FileStore::new(dir.path().join("nested").join("session.json"))
    }

    #[tokio::test]
    async fn test_missing_file_reads_as_empty() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        assert!(store.get("access_token").await.unwrap().is_none());
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_values_survive_reopen() {
        let dir = TempDir::new().unwrap();
        store_in(&dir).set("auth_state", "abc").await.unwrap();
        store_in(&dir).set("code_verifier", "xyz").await.unwrap();

        let reopened = store_in(&dir);
        assert_eq!(reopened.get("auth_state").await.unwrap().as_deref(), Some("abc"));
        assert_eq!(reopened.get("code_verifier").await.unwrap().as_deref(), Some("xyz"));
        assert!(!reopened.path().with_extension("tmp").exists());
    }

    #[tokio::test]
    async fn test_delete_removes_only_that_key() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.set("auth_state", "abc").await.unwrap();
        store.set("access_token", "{}").await.unwrap();

        store.delete("auth_state").await.unwrap();
        store.delete("auth_state").await.unwrap();

        assert!(store.get("auth_state").await.unwrap().is_none());
        assert_eq!(store.get("access_token").await.unwrap().as_deref(), Some("{}"));
    }

    #[tokio::test]
    async fn test_corrupt_file_is_serialization_error() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), "not json").unwrap();

        let result = store.get("access_token").await;
        assert!(matches!(result, Err(StorageError::Serialization(_))));
    }

    /// Validates that a corrupt backing file does not block future writes.
    ///
    /// Assertions:
    /// - `set` succeeds and replaces the corrupt contents
    /// - `get` afterwards returns the new value
    #[tokio::test]
    async fn test_set_replaces_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), "{not json").unwrap();

        store.set("auth_state", "abc").await.unwrap();

        assert_eq!(store.get("auth_state").await.unwrap().as_deref(), Some("abc"));
        assert!(store.get("access_token").await.unwrap().is_none());
    }

    /// Validates that deleting from a corrupt file (as logout does) resets it.
    ///
    /// Assertions:
    /// - `delete` succeeds even though the key cannot be found
    /// - the file parses again afterwards and reads as empty
    #[tokio::test]
    async fn test_delete_resets_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), "{not json").unwrap();

        store.delete("access_token").await.unwrap();

        assert!(store.get("access_token").await.unwrap().is_none());
        store.set("code_verifier", "xyz").await.unwrap();
        assert_eq!(store.get("code_verifier").await.unwrap().as_deref(), Some("xyz"));
    }
}
