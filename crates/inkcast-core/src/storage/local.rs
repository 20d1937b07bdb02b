//! `window.localStorage` backend for browser builds.

use super::{KeyValueStore, StorageError, StorageResult};
use web_sys::Storage;

/// Key-value store on the origin's `localStorage`.
pub struct LocalStorage {
    storage: Storage,
    prefix: String,
}

impl LocalStorage {
    /// Open `localStorage`, namespacing every key with `prefix`.
    pub fn open(prefix: &str) -> StorageResult<Self> {
        let window = web_sys::window()
            .ok_or_else(|| StorageError::Unavailable("No window".to_string()))?;
        let storage = window
            .local_storage()
            .map_err(|e| StorageError::Unavailable(format!("{:?}", e)))?
            .ok_or_else(|| StorageError::Unavailable("localStorage is disabled".to_string()))?;
        Ok(Self {
            storage,
            prefix: prefix.to_string(),
        })
    }

    fn full_key(&self, key: &str) -> String {
        if self.prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}:{}", self.prefix, key)
        }
    }
}

impl KeyValueStore for LocalStorage {
    fn get(&self, key: &str) -> StorageResult<String> {
        self.storage
            .get_item(&self.full_key(key))
            .map_err(|e| StorageError::Other(format!("{:?}", e)))?
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        // Quota errors surface here.
        self.storage
            .set_item(&self.full_key(key), value)
            .map_err(|e| StorageError::Io(format!("Failed to write {}: {:?}", key, e)))
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.storage
            .remove_item(&self.full_key(key))
            .map_err(|e| StorageError::Other(format!("{:?}", e)))
    }
}
