//! Board configuration.

use crate::geometry::HIT_TOLERANCE;
use crate::history::MAX_HISTORY;
use crate::undo::MAX_UNDO_HISTORY;
use serde::{Deserialize, Serialize};

/// Broadcast channel shared by every context editing the board.
pub const DEFAULT_CHANNEL: &str = "inkcast-board";

/// Display name used until the user picks one.
pub const DEFAULT_USER: &str = "Anonymous";

/// Settings for a [`crate::BoardSession`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BoardConfig {
    pub channel: String,
    pub user_name: String,
    /// Entries kept in the activity log.
    pub history_limit: usize,
    /// Frames kept on each undo/redo stack.
    pub undo_limit: usize,
    /// Pick distance in pixels for hit-testing and erasing.
    pub hit_tolerance: f64,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            channel: DEFAULT_CHANNEL.to_string(),
            user_name: DEFAULT_USER.to_string(),
            history_limit: MAX_HISTORY,
            undo_limit: MAX_UNDO_HISTORY,
            hit_tolerance: HIT_TOLERANCE,
        }
    }
}

impl BoardConfig {
    pub fn with_user(mut self, user_name: impl Into<String>) -> Self {
        self.user_name = user_name.into();
        self
    }

    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = channel.into();
        self
    }

    /// Parse from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
