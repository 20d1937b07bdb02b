//! Core application state and lifecycle.

use inkcast_core::config::BoardConfig;
use inkcast_core::session::BoardSession;
use inkcast_core::storage::{BoardPersistence, KeyValueStore, MemoryStorage};
use inkcast_core::sync::{ReplicationTransport, SyncEvent, open_platform_transport};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[cfg(not(target_arch = "wasm32"))]
use std::path::PathBuf;

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppConfig {
    #[serde(flatten)]
    pub board: BoardConfig,
    /// Directory for board files. `None` uses the platform data dir.
    #[cfg(not(target_arch = "wasm32"))]
    pub storage_dir: Option<PathBuf>,
}

impl AppConfig {
    /// Parse from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// The application: a board session plus its persistence.
pub struct App {
    session: BoardSession,
    persistence: BoardPersistence<dyn KeyValueStore>,
    settled: bool,
}

impl App {
    /// Open the platform store and transport, restore the saved board and
    /// join the channel.
    pub fn new(config: AppConfig) -> Self {
        let store = open_store(&config);
        let transport = open_platform_transport(&config.board.channel);
        Self::with_parts(config.board, store, transport)
    }

    /// Build the app from explicit parts.
    pub fn with_parts(
        mut board: BoardConfig,
        store: Arc<dyn KeyValueStore>,
        transport: Box<dyn ReplicationTransport>,
    ) -> Self {
        let persistence = BoardPersistence::new(store);
        let loaded = persistence.load();
        if let Some(user) = loaded.user {
            board.user_name = user;
        }
        log::info!(
            "Starting board {} as {} with {} shapes",
            board.channel,
            board.user_name,
            loaded.document.len()
        );

        let mut session = BoardSession::with_document(board, loaded.document, transport);
        session.connect();
        Self {
            session,
            persistence,
            settled: false,
        }
    }

    pub fn session(&self) -> &BoardSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut BoardSession {
        &mut self.session
    }

    /// Run a local edit, then persist if it changed anything.
    pub fn edit<T>(&mut self, f: impl FnOnce(&mut BoardSession) -> T) -> T {
        let result = f(&mut self.session);
        self.persist_if_dirty();
        result
    }

    /// One turn of the event loop: apply queued peer messages and persist.
    ///
    /// The first turn also settles a pending join when nobody answered.
    pub fn tick(&mut self) -> Vec<SyncEvent> {
        let events = self.session.poll();
        if !self.settled {
            self.session.settle();
            self.settled = true;
        }
        self.persist_if_dirty();
        events
    }

    /// Persist the document when it changed since the last save.
    pub fn persist_if_dirty(&mut self) -> bool {
        if !self.session.is_dirty() {
            return false;
        }
        self.persist()
    }

    /// Write the document unconditionally.
    pub fn persist(&mut self) -> bool {
        let saved = self.persistence.save_document(self.session.document());
        if saved {
            self.session.mark_clean();
        }
        saved
    }

    /// Rename the local user and remember the name.
    pub fn set_user_name(&mut self, name: &str) -> bool {
        if !self.session.set_user_name(name) {
            return false;
        }
        self.persistence.save_user(self.session.user_name());
        true
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn open_store(config: &AppConfig) -> Arc<dyn KeyValueStore> {
    use inkcast_core::storage::FileStorage;

    let storage = match &config.storage_dir {
        Some(dir) => FileStorage::new(dir.clone()),
        None => FileStorage::default_location(),
    };
    match storage {
        Ok(storage) => {
            log::info!("Storing boards in {}", storage.base_path().display());
            Arc::new(storage)
        }
        Err(e) => {
            log::warn!("File storage unavailable, board will not be saved: {}", e);
            Arc::new(MemoryStorage::new())
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn open_store(config: &AppConfig) -> Arc<dyn KeyValueStore> {
    use inkcast_core::storage::LocalStorage;

    match LocalStorage::open(&config.board.channel) {
        Ok(storage) => Arc::new(storage),
        Err(e) => {
            log::warn!("localStorage unavailable, board will not be saved: {}", e);
            Arc::new(MemoryStorage::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkcast_core::shapes::SerializableColor;
    use inkcast_core::storage::{SHAPES_KEY, USER_KEY};
    use inkcast_core::sync::{BroadcastHub, ChannelState, DetachedTransport};
    use kurbo::Point;

    fn stroke_points() -> Vec<Point> {
        vec![Point::new(0.0, 0.0), Point::new(5.0, 5.0), Point::new(10.0, 0.0)]
    }

    fn memory_store() -> Arc<dyn KeyValueStore> {
        Arc::new(MemoryStorage::new())
    }

    #[test]
    fn test_edits_are_persisted() {
        let store = memory_store();
        let mut app = App::with_parts(BoardConfig::default(), store.clone(), Box::new(DetachedTransport));

        let id = app.edit(|s| s.commit_stroke(stroke_points(), SerializableColor::black(), 2.0));
        assert!(id.is_some());
        assert!(!app.session().is_dirty());
        assert!(store.get(SHAPES_KEY).unwrap().contains("stroke"));

        let reopened = App::with_parts(BoardConfig::default(), store, Box::new(DetachedTransport));
        assert_eq!(reopened.session().document(), app.session().document());
        assert!(!reopened.session().can_undo());
    }

    #[test]
    fn test_stored_user_name_wins() {
        let store = memory_store();
        store.set(USER_KEY, "\"Bo\"").unwrap();
        let app = App::with_parts(BoardConfig::default(), store, Box::new(DetachedTransport));
        assert_eq!(app.session().user_name(), "Bo");
    }

    #[test]
    fn test_set_user_name_is_saved() {
        let store = memory_store();
        let mut app = App::with_parts(BoardConfig::default(), store.clone(), Box::new(DetachedTransport));
        assert!(app.set_user_name("Ana"));
        assert_eq!(store.get(USER_KEY).unwrap(), "\"Ana\"");
        assert!(!app.set_user_name(""));
    }

    #[test]
    fn test_first_tick_settles_join() {
        let hub = BroadcastHub::new();
        let mut app = App::with_parts(BoardConfig::default(), memory_store(), Box::new(hub.subscribe()));
        assert_eq!(app.session().state(), ChannelState::Connecting);
        assert!(app.tick().is_empty());
        assert_eq!(app.session().state(), ChannelState::Synced);
    }

    #[test]
    fn test_tick_applies_and_persists_peer_edits() {
        let hub = BroadcastHub::new();
        let store = memory_store();
        let mut ana = App::with_parts(
            BoardConfig::default().with_user("ana"),
            memory_store(),
            Box::new(hub.subscribe()),
        );
        let mut bo = App::with_parts(
            BoardConfig::default().with_user("bo"),
            store.clone(),
            Box::new(hub.subscribe()),
        );
        ana.tick();
        bo.tick();

        let id = ana
            .edit(|s| s.insert_table(Point::ZERO, 2, 2, SerializableColor::black()))
            .unwrap();
        let events = bo.tick();
        assert_eq!(events, vec![SyncEvent::ShapeAdded(id.clone())]);
        assert!(bo.session().document().contains(&id));
        assert!(store.get(SHAPES_KEY).unwrap().contains(&id));
    }

    #[test]
    fn test_config_from_json() {
        let config = AppConfig::from_json(r#"{"userName":"ana","channel":"team"}"#).unwrap();
        assert_eq!(config.board.user_name, "ana");
        assert_eq!(config.board.channel, "team");
        assert_eq!(config.board.undo_limit, 50);
        assert!(config.storage_dir.is_none());
    }

    #[test]
    fn test_new_with_storage_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            board: BoardConfig::default().with_channel("app-test-board"),
            storage_dir: Some(dir.path().to_path_buf()),
        };
        let mut app = App::new(config);
        app.edit(|s| s.commit_stroke(stroke_points(), SerializableColor::black(), 2.0));
        assert!(dir.path().join("shapes.json").exists());
    }
}
