//! Peer replication protocol.
//!
//! Every local mutation is broadcast as one [`SyncMessage`] on a named
//! channel shared by all contexts editing the same board. Contexts ignore
//! their own messages, apply peers' messages without re-broadcasting, and
//! bootstrap late joiners with a full-state handshake
//! (`sync-request` / `sync-state`).

#[cfg(not(target_arch = "wasm32"))]
mod local;
mod transport;
#[cfg(target_arch = "wasm32")]
mod web;

#[cfg(not(target_arch = "wasm32"))]
pub use local::{BroadcastHub, LocalBroadcast};
pub use transport::{DetachedTransport, ReplicationTransport, TransportError, open_platform_transport};
#[cfg(target_arch = "wasm32")]
pub use web::WasmBroadcastChannel;

use crate::history::{History, HistoryEntry};
use crate::shapes::{Shape, ShapeId};
use serde::{Deserialize, Serialize};

/// Message body, tagged by `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SyncPayload {
    AddShape {
        shape: Shape,
        history: HistoryEntry,
    },
    UpdateShape {
        shape: Shape,
        history: HistoryEntry,
    },
    DeleteShape {
        #[serde(rename = "shapeId")]
        shape_id: ShapeId,
        history: HistoryEntry,
    },
    ClearBoard {
        history: HistoryEntry,
    },
    /// Full state after a peer's undo or redo.
    UndoRedo {
        shapes: Vec<Shape>,
        history: History,
    },
    /// Sent once by a joining context.
    SyncRequest,
    /// Reply to a `sync-request` from a peer holding state.
    SyncState {
        shapes: Vec<Shape>,
        history: History,
    },
}

impl SyncPayload {
    /// Wire name of the message kind.
    pub fn kind(&self) -> &'static str {
        match self {
            SyncPayload::AddShape { .. } => "add-shape",
            SyncPayload::UpdateShape { .. } => "update-shape",
            SyncPayload::DeleteShape { .. } => "delete-shape",
            SyncPayload::ClearBoard { .. } => "clear-board",
            SyncPayload::UndoRedo { .. } => "undo-redo",
            SyncPayload::SyncRequest => "sync-request",
            SyncPayload::SyncState { .. } => "sync-state",
        }
    }
}

/// A payload stamped with the id of the context that sent it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncMessage {
    #[serde(flatten)]
    pub payload: SyncPayload,
    #[serde(rename = "senderId")]
    pub sender_id: String,
}

impl SyncMessage {
    pub fn new(sender_id: impl Into<String>, payload: SyncPayload) -> Self {
        Self {
            payload,
            sender_id: sender_id.into(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Lifecycle of a context's participation in the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// Not yet connected.
    Disconnected,
    /// Channel opened and `sync-request` sent; waiting for a reply.
    Connecting,
    /// Converged: either received a `sync-state` or nobody answered.
    Synced,
    /// Participating normally.
    Active,
}

/// What changed after handling a peer message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    ShapeAdded(ShapeId),
    ShapeUpdated(ShapeId),
    ShapeDeleted(ShapeId),
    BoardCleared,
    /// Shapes and history were replaced wholesale.
    StateReplaced,
    /// We answered a late joiner; local state is unchanged.
    SyncAnswered,
}

impl SyncEvent {
    /// True when the local document changed.
    pub fn changes_document(&self) -> bool {
        !matches!(self, SyncEvent::SyncAnswered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::{SerializableColor, Stroke};
    use kurbo::Point;

    #[test]
    fn test_message_is_flat_with_sender() {
        let msg = SyncMessage::new(
            "ctx-1",
            SyncPayload::DeleteShape {
                shape_id: "s1".to_string(),
                history: HistoryEntry::new("ana", "ana deleted a stroke"),
            },
        );
        let json: serde_json::Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        assert_eq!(json["kind"], "delete-shape");
        assert_eq!(json["shapeId"], "s1");
        assert_eq!(json["senderId"], "ctx-1");
        assert_eq!(json["history"]["description"], "ana deleted a stroke");
    }

    #[test]
    fn test_sync_request_parses() {
        let msg = SyncMessage::from_json(r#"{"kind":"sync-request","senderId":"abc"}"#).unwrap();
        assert_eq!(msg.payload, SyncPayload::SyncRequest);
        assert_eq!(msg.sender_id, "abc");
        assert_eq!(msg.payload.kind(), "sync-request");
    }

    #[test]
    fn test_add_shape_round_trip() {
        let stroke = Stroke::new(
            "ana",
            vec![Point::ZERO, Point::new(3.0, 4.0)],
            SerializableColor::black(),
            2.0,
        );
        let msg = SyncMessage::new(
            "ctx-1",
            SyncPayload::AddShape {
                shape: Shape::Stroke(stroke),
                history: HistoryEntry::new("ana", "ana drew a stroke (2 pts)"),
            },
        );
        let parsed = SyncMessage::from_json(&msg.to_json().unwrap()).unwrap();
        assert_eq!(parsed, msg);
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        assert!(SyncMessage::from_json(r#"{"kind":"cursor","senderId":"x"}"#).is_err());
        assert!(SyncMessage::from_json("not json").is_err());
    }
}
