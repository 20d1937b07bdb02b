//! Activity log of completed board mutations.

use crate::shapes::ShapeId;
use crate::time::now_millis;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default number of entries kept in the log.
pub const MAX_HISTORY: usize = 250;

/// One completed mutation. Entries are never edited after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: String,
    pub timestamp: u64,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub description: String,
    /// Shape this entry refers to, if removing the entry should remove it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape_id: Option<ShapeId>,
}

impl HistoryEntry {
    pub fn new(author: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: now_millis(),
            author: author.into(),
            description: description.into(),
            shape_id: None,
        }
    }

    /// Link the entry to a shape.
    pub fn with_shape(mut self, shape_id: impl Into<ShapeId>) -> Self {
        self.shape_id = Some(shape_id.into());
        self
    }
}

/// Bounded log, most recent entry first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History {
    entries: Vec<HistoryEntry>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a log from entries already ordered most recent first.
    pub fn from_entries(entries: Vec<HistoryEntry>) -> Self {
        Self { entries }
    }

    /// Prepend an entry and drop the oldest ones beyond `limit`.
    pub fn record(&mut self, entry: HistoryEntry, limit: usize) {
        self.entries.insert(0, entry);
        self.truncate(limit);
    }

    pub fn truncate(&mut self, limit: usize) {
        self.entries.truncate(limit.max(1));
    }

    /// Remove an entry by id, returning it.
    pub fn remove(&mut self, entry_id: &str) -> Option<HistoryEntry> {
        let index = self.entries.iter().position(|e| e.id == entry_id)?;
        Some(self.entries.remove(index))
    }

    pub fn get(&self, entry_id: &str) -> Option<&HistoryEntry> {
        self.entries.iter().find(|e| e.id == entry_id)
    }

    pub fn contains(&self, entry_id: &str) -> bool {
        self.get(entry_id).is_some()
    }

    /// Most recent entry linked to `shape_id`.
    pub fn find_by_shape(&self, shape_id: &str) -> Option<&HistoryEntry> {
        self.entries
            .iter()
            .find(|e| e.shape_id.as_deref() == Some(shape_id))
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.first()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
