//! Simulated connection channel.
//!
//! [`SimChannel`] is a cloneable handle over shared state: the engine owns one
//! clone, the test (or [`crate::SimWorld`]) keeps another to flip
//! connectivity and drain emitted events.

#![allow(clippy::disallowed_types, reason = "Synchronous locking operations only")]

use std::{
    collections::HashSet,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use roomsync_core::{ChannelError, ConnectionChannel};
use roomsync_proto::{EventKind, OutboundEvent};

#[derive(Debug, Default)]
struct SharedState {
    connected: bool,
    closed: bool,
    subscriptions: HashSet<EventKind>,
    outbox: Vec<OutboundEvent>,
    emitted: Vec<OutboundEvent>,
}

/// In-memory channel for deterministic tests.
#[derive(Debug, Clone, Default)]
pub struct SimChannel {
    state: Arc<Mutex<SharedState>>,
}

impl SimChannel {
    /// Create a disconnected channel.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a connected channel.
    pub fn connected() -> Self {
        let channel = Self::new();
        channel.set_connected(true);
        channel
    }

    /// Flip the connectivity flag. The engine observes it on its next
    /// `ConnectivityChanged` event.
    pub fn set_connected(&self, connected: bool) {
        self.lock().connected = connected;
    }

    /// Shut the channel down; further emits fail with
    /// [`ChannelError::Closed`].
    pub fn close(&self) {
        let mut state = self.lock();
        state.closed = true;
        state.connected = false;
    }

    /// Whether the engine is subscribed to `kind`.
    pub fn is_subscribed(&self, kind: EventKind) -> bool {
        self.lock().subscriptions.contains(&kind)
    }

    /// Take events emitted since the last call.
    pub fn take_outgoing(&self) -> Vec<OutboundEvent> {
        std::mem::take(&mut self.lock().outbox)
    }

    /// Every event emitted over the channel's lifetime.
    pub fn emitted(&self) -> Vec<OutboundEvent> {
        self.lock().emitted.clone()
    }

    /// Number of emitted events of `kind`.
    pub fn emitted_count(&self, kind: EventKind) -> usize {
        self.lock().emitted.iter().filter(|e| e.kind() == kind).count()
    }

    fn lock(&self) -> MutexGuard<'_, SharedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ConnectionChannel for SimChannel {
    fn is_connected(&self) -> bool {
        self.lock().connected
    }

    fn subscribe(&mut self, kind: EventKind) {
        self.lock().subscriptions.insert(kind);
    }

    fn unsubscribe(&mut self, kind: EventKind) {
        self.lock().subscriptions.remove(&kind);
    }

    fn emit(&mut self, event: OutboundEvent) -> Result<(), ChannelError> {
        let mut state = self.lock();
        if state.closed {
            return Err(ChannelError::Closed);
        }
        if !state.connected {
            return Err(ChannelError::NotConnected);
        }

        tracing::trace!(event = %event.kind(), room = %event.room_id(), "sim emit");
        state.emitted.push(event.clone());
        state.outbox.push(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use roomsync_proto::{HistoryRequest, RoomId};

    use super::*;

    fn request() -> OutboundEvent {
        OutboundEvent::HistoryRequest(HistoryRequest { room_id: RoomId::new("r") })
    }

    #[test]
    fn clones_share_state() {
        let observer = SimChannel::connected();
        let mut handle = observer.clone();

        handle.subscribe(EventKind::LiveMessage);
        assert!(handle.emit(request()).is_ok());

        assert!(observer.is_subscribed(EventKind::LiveMessage));
        assert_eq!(observer.take_outgoing(), [request()]);
        assert!(observer.take_outgoing().is_empty());
        assert_eq!(observer.emitted_count(EventKind::HistoryRequest), 1);
    }

    #[test]
    fn emit_requires_connectivity() {
        let mut channel = SimChannel::new();
        assert_eq!(channel.emit(request()), Err(ChannelError::NotConnected));

        channel.close();
        assert_eq!(channel.emit(request()), Err(ChannelError::Closed));
    }
}
