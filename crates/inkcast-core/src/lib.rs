//! Inkcast Core Library
//!
//! Platform-agnostic data structures and logic for the inkcast shared board:
//! the shape model, the document, undo/redo, peer replication and
//! hit-testing.

pub mod config;
pub mod document;
pub mod geometry;
pub mod handles;
pub mod history;
pub mod sanitize;
pub mod session;
pub mod shapes;
pub mod storage;
pub mod sync;
pub mod time;
pub mod undo;

pub use config::BoardConfig;
pub use document::{BoardDocument, DocumentSnapshot};
pub use geometry::Bounds;
pub use handles::{Handle, HandleKind, apply_manipulation, get_handles, hit_test_handles};
pub use history::{History, HistoryEntry};
pub use session::{BoardSession, CellOptions, UpdateOptions};
pub use shapes::{SerializableColor, Shape, ShapeId, ShapeKind, ShapeTrait};
pub use storage::{BoardPersistence, KeyValueStore, StorageError, StorageResult};
pub use sync::{ChannelState, ReplicationTransport, SyncEvent, SyncMessage, SyncPayload};
pub use undo::UndoManager;
