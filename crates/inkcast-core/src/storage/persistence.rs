//! Best-effort snapshotting of the board into a key-value store.
//!
//! Loading never fails: anything missing or unreadable degrades to an empty
//! document. Saving failures are logged and otherwise ignored, since the
//! in-memory document stays authoritative.

use super::{KeyValueStore, StorageError, StorageResult};
use crate::document::BoardDocument;
use crate::history::{History, HistoryEntry, MAX_HISTORY};
use crate::shapes::Shape;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Key holding the shape list.
pub const SHAPES_KEY: &str = "shapes";
/// Key holding the history list.
pub const HISTORY_KEY: &str = "history";
/// Key holding the user's display name.
pub const USER_KEY: &str = "user";

/// What was recovered from storage at startup.
#[derive(Debug, Clone, Default)]
pub struct LoadedBoard {
    pub document: BoardDocument,
    pub user: Option<String>,
}

/// Reads and writes the board's keys.
pub struct BoardPersistence<S: KeyValueStore + ?Sized> {
    store: Arc<S>,
}

impl<S: KeyValueStore + ?Sized> Clone for BoardPersistence<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: KeyValueStore + ?Sized> BoardPersistence<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Load everything stored for the board.
    pub fn load(&self) -> LoadedBoard {
        LoadedBoard {
            document: self.load_document(),
            user: self.load_user(),
        }
    }

    /// Load shapes and history. Malformed elements are skipped individually;
    /// a malformed list is treated as empty. At most [`MAX_HISTORY`] entries
    /// are kept.
    pub fn load_document(&self) -> BoardDocument {
        let shapes: Vec<Shape> = self.load_list(SHAPES_KEY);
        let entries: Vec<HistoryEntry> = self.load_list(HISTORY_KEY);
        log::info!("Loaded {} shapes and {} history entries", shapes.len(), entries.len());
        let mut history = History::from_entries(entries);
        history.truncate(MAX_HISTORY);
        BoardDocument::from_parts(shapes, history)
    }

    /// Load the stored display name, accepting either a JSON string or a
    /// bare value.
    pub fn load_user(&self) -> Option<String> {
        let raw = self.read(USER_KEY)?;
        let name = serde_json::from_str::<String>(&raw).unwrap_or(raw);
        let name = name.trim();
        (!name.is_empty()).then(|| name.to_string())
    }

    /// Write shapes and history. Returns false (after logging) on failure.
    pub fn save_document(&self, document: &BoardDocument) -> bool {
        let shapes = self.write_json(SHAPES_KEY, &document.shapes());
        let history = self.write_json(HISTORY_KEY, document.history());
        shapes && history
    }

    /// Write the display name. Returns false (after logging) on failure.
    pub fn save_user(&self, user: &str) -> bool {
        self.write_json(USER_KEY, &user)
    }

    /// Remove every board key.
    pub fn clear(&self) -> StorageResult<()> {
        self.store.remove(SHAPES_KEY)?;
        self.store.remove(HISTORY_KEY)?;
        self.store.remove(USER_KEY)
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.store.get(key) {
            Ok(raw) => Some(raw),
            Err(StorageError::NotFound(_)) => {
                log::debug!("No stored {}", key);
                None
            }
            Err(e) => {
                log::warn!("Failed to read {}: {}", key, e);
                None
            }
        }
    }

    fn load_list<T: DeserializeOwned>(&self, key: &str) -> Vec<T> {
        let Some(raw) = self.read(key) else {
            return Vec::new();
        };
        let values: Vec<serde_json::Value> = match serde_json::from_str(&raw) {
            Ok(values) => values,
            Err(e) => {
                log::warn!("Stored {} is not a list, starting empty: {}", key, e);
                return Vec::new();
            }
        };
        values
            .into_iter()
            .filter_map(|value| match serde_json::from_value(value) {
                Ok(item) => Some(item),
                Err(e) => {
                    log::warn!("Skipping unreadable {} element: {}", key, e);
                    None
                }
            })
            .collect()
    }

    fn write_json<T: serde::Serialize + ?Sized>(&self, key: &str, value: &T) -> bool {
        let result = serde_json::to_string(value)
            .map_err(|e| StorageError::Serialization(e.to_string()))
            .and_then(|json| self.store.set(key, &json));
        match result {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Failed to persist {}: {}", key, e);
                false
            }
        }
    }
}
