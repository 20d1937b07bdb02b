//! `BroadcastChannel` transport for browser contexts.

use super::transport::decode_message;
use super::{ReplicationTransport, SyncMessage, TransportError};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{BroadcastChannel, MessageEvent};

/// Same-origin broadcast transport.
///
/// Messages arriving through `onmessage` are queued as raw JSON and must be
/// drained via `poll_messages()`.
pub struct WasmBroadcastChannel {
    channel: Option<BroadcastChannel>,
    inbox: Rc<RefCell<Vec<String>>>,
    // Store the closure to prevent it from being dropped
    _on_message: Closure<dyn Fn(MessageEvent)>,
}

impl WasmBroadcastChannel {
    /// Open the channel `name`.
    pub fn open(name: &str) -> Result<Self, TransportError> {
        let channel = BroadcastChannel::new(name)
            .map_err(|e| TransportError::Unavailable(format!("{:?}", e)))?;

        let inbox = Rc::new(RefCell::new(Vec::new()));
        let inbox_msg = inbox.clone();
        let on_message = Closure::wrap(Box::new(move |e: MessageEvent| {
            match e.data().as_string() {
                Some(raw) => inbox_msg.borrow_mut().push(raw),
                None => log::warn!("Ignoring non-string broadcast message"),
            }
        }) as Box<dyn Fn(MessageEvent)>);
        channel.set_onmessage(Some(on_message.as_ref().unchecked_ref()));

        log::info!("Opened broadcast channel {}", name);
        Ok(Self {
            channel: Some(channel),
            inbox,
            _on_message: on_message,
        })
    }
}

impl ReplicationTransport for WasmBroadcastChannel {
    fn send(&mut self, message: &SyncMessage) -> Result<(), TransportError> {
        let channel = self.channel.as_ref().ok_or(TransportError::Closed)?;
        let raw = message.to_json()?;
        log::debug!("Broadcasting {}", message.payload.kind());
        channel
            .post_message(&JsValue::from_str(&raw))
            .map_err(|e| TransportError::Unavailable(format!("Send failed: {:?}", e)))
    }

    fn poll_messages(&mut self) -> Vec<SyncMessage> {
        let raw = std::mem::take(&mut *self.inbox.borrow_mut());
        raw.iter().filter_map(|r| decode_message(r)).collect()
    }

    fn is_available(&self) -> bool {
        self.channel.is_some()
    }

    fn close(&mut self) {
        if let Some(channel) = self.channel.take() {
            channel.set_onmessage(None);
            channel.close();
        }
        self.inbox.borrow_mut().clear();
    }
}

impl Drop for WasmBroadcastChannel {
    fn drop(&mut self) {
        self.close();
    }
}
