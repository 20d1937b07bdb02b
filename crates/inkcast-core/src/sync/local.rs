//! In-process broadcast hub for native builds and multi-context tests.

use super::transport::decode_message;
use super::{ReplicationTransport, SyncMessage, TransportError};
use std::collections::HashMap;
use std::sync::mpsc::{Receiver, Sender, TryRecvError, channel};
use std::sync::{Arc, Mutex, OnceLock};

/// Hubs shared by name within the process.
static NAMED_HUBS: OnceLock<Mutex<HashMap<String, BroadcastHub>>> = OnceLock::new();

/// A named broadcast topic. Every endpoint receives every message sent on
/// the hub, including its own.
#[derive(Debug, Clone, Default)]
pub struct BroadcastHub {
    subscribers: Arc<Mutex<Vec<Sender<String>>>>,
}

impl BroadcastHub {
    /// Create a private hub.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide hub for `name`, created on first use.
    pub fn named(name: &str) -> Self {
        let hubs = NAMED_HUBS.get_or_init(|| Mutex::new(HashMap::new()));
        match hubs.lock() {
            Ok(mut hubs) => hubs.entry(name.to_string()).or_default().clone(),
            Err(e) => {
                log::warn!("Hub registry lock error ({}), using a private hub", e);
                Self::new()
            }
        }
    }

    /// Open a new endpoint on this hub.
    pub fn subscribe(&self) -> LocalBroadcast {
        let (tx, rx) = channel();
        match self.subscribers.lock() {
            Ok(mut subscribers) => subscribers.push(tx),
            Err(e) => log::warn!("Hub lock error: {}", e),
        }
        LocalBroadcast {
            hub: self.clone(),
            inbox: Some(rx),
        }
    }

    /// Number of endpoints still listening.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().map(|s| s.len()).unwrap_or(0)
    }

    fn publish(&self, raw: String) -> Result<(), TransportError> {
        let mut subscribers = self
            .subscribers
            .lock()
            .map_err(|e| TransportError::Unavailable(format!("Lock error: {}", e)))?;
        // Dropped endpoints are pruned on the way.
        subscribers.retain(|tx| tx.send(raw.clone()).is_ok());
        Ok(())
    }
}

/// One endpoint of a [`BroadcastHub`].
#[derive(Debug)]
pub struct LocalBroadcast {
    hub: BroadcastHub,
    inbox: Option<Receiver<String>>,
}

impl LocalBroadcast {
    pub fn hub(&self) -> &BroadcastHub {
        &self.hub
    }
}

impl ReplicationTransport for LocalBroadcast {
    fn send(&mut self, message: &SyncMessage) -> Result<(), TransportError> {
        if self.inbox.is_none() {
            return Err(TransportError::Closed);
        }
        let raw = message.to_json()?;
        log::debug!("Broadcasting {}", message.payload.kind());
        self.hub.publish(raw)
    }

    fn poll_messages(&mut self) -> Vec<SyncMessage> {
        let Some(inbox) = &self.inbox else {
            return Vec::new();
        };
        let mut messages = Vec::new();
        loop {
            match inbox.try_recv() {
                Ok(raw) => messages.extend(decode_message(&raw)),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        messages
    }

    fn is_available(&self) -> bool {
        self.inbox.is_some()
    }

    fn close(&mut self) {
        // Dropping the receiver makes the hub prune our sender on next publish.
        self.inbox = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::SyncPayload;

    #[test]
    fn test_every_endpoint_receives_including_sender() {
        let hub = BroadcastHub::new();
        let mut a = hub.subscribe();
        let mut b = hub.subscribe();

        a.send(&SyncMessage::new("a", SyncPayload::SyncRequest)).unwrap();
        assert_eq!(a.poll_messages().len(), 1);
        let received = b.poll_messages();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].sender_id, "a");
        assert!(b.poll_messages().is_empty());
    }

    #[test]
    fn test_closed_endpoint_is_pruned() {
        let hub = BroadcastHub::new();
        let mut a = hub.subscribe();
        let mut b = hub.subscribe();
        b.close();
        assert!(!b.is_available());
        assert!(matches!(
            b.send(&SyncMessage::new("b", SyncPayload::SyncRequest)),
            Err(TransportError::Closed)
        ));

        a.send(&SyncMessage::new("a", SyncPayload::SyncRequest)).unwrap();
        assert_eq!(hub.subscriber_count(), 1);
    }

    #[test]
    fn test_named_hubs_are_shared() {
        let mut a = BroadcastHub::named("test-named-hubs-are-shared").subscribe();
        let mut b = BroadcastHub::named("test-named-hubs-are-shared").subscribe();
        a.send(&SyncMessage::new("a", SyncPayload::SyncRequest)).unwrap();
        assert_eq!(b.poll_messages().len(), 1);
        assert!(BroadcastHub::named("test-named-hubs-other").subscriber_count() == 0);
    }
}
