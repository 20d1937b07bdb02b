//! Transport abstraction for the replication protocol.

use super::SyncMessage;
use thiserror::Error;

/// Errors from a replication transport.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Transport closed")]
    Closed,
    #[error("Encode error: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("Transport unavailable: {0}")]
    Unavailable(String),
}

/// A fire-and-forget broadcast primitive.
///
/// Incoming messages are queued by the transport and drained by the owner
/// with [`ReplicationTransport::poll_messages`]; nothing is dispatched from
/// inside the transport.
pub trait ReplicationTransport {
    /// Broadcast a message to every other participant.
    fn send(&mut self, message: &SyncMessage) -> Result<(), TransportError>;

    /// Drain queued incoming messages (non-blocking).
    fn poll_messages(&mut self) -> Vec<SyncMessage>;

    /// False when messages go nowhere.
    fn is_available(&self) -> bool;

    /// Stop sending and receiving.
    fn close(&mut self) {}
}

/// Inert transport for single-context mode.
#[derive(Debug, Default, Clone, Copy)]
pub struct DetachedTransport;

impl ReplicationTransport for DetachedTransport {
    fn send(&mut self, _message: &SyncMessage) -> Result<(), TransportError> {
        Ok(())
    }

    fn poll_messages(&mut self) -> Vec<SyncMessage> {
        Vec::new()
    }

    fn is_available(&self) -> bool {
        false
    }
}

/// Parse a raw wire message, logging and dropping anything malformed.
pub(crate) fn decode_message(raw: &str) -> Option<SyncMessage> {
    match SyncMessage::from_json(raw) {
        Ok(message) => Some(message),
        Err(e) => {
            log::warn!("Dropping malformed sync message: {}", e);
            None
        }
    }
}

/// Open the broadcast transport for this platform, falling back to
/// [`DetachedTransport`] when the primitive is unavailable.
#[cfg(not(target_arch = "wasm32"))]
pub fn open_platform_transport(channel: &str) -> Box<dyn ReplicationTransport> {
    Box::new(super::BroadcastHub::named(channel).subscribe())
}

/// Open the broadcast transport for this platform, falling back to
/// [`DetachedTransport`] when the primitive is unavailable.
#[cfg(target_arch = "wasm32")]
pub fn open_platform_transport(channel: &str) -> Box<dyn ReplicationTransport> {
    match super::WasmBroadcastChannel::open(channel) {
        Ok(transport) => Box::new(transport),
        Err(e) => {
            log::warn!("Broadcast channel unavailable, working offline: {}", e);
            Box::new(DetachedTransport)
        }
    }
}
