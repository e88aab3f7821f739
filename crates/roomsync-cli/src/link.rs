//! Client side of the in-process server link.
//!
//! [`LinkChannel`] implements [`ConnectionChannel`] over a tokio mpsc
//! sender. Outbound events are CBOR-encoded into [`WireEvent`]s; the
//! connectivity flag is owned by the runtime and flipped by `/drop` and
//! `/reconnect`.

use std::collections::HashSet;

use bytes::{Bytes, BytesMut};
use roomsync_core::{
    ChannelError, ConnectionChannel,
    proto::{self, EventKind, InboundEvent, OutboundEvent},
};
use tokio::sync::mpsc;

/// A named, encoded event on the link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireEvent {
    /// Protocol event name.
    pub name: &'static str,
    /// CBOR payload body.
    pub body: Bytes,
}

impl WireEvent {
    /// Encode an outbound event.
    pub fn outbound(event: &OutboundEvent) -> proto::errors::Result<Self> {
        let mut body = BytesMut::new();
        event.encode(&mut body)?;
        Ok(Self { name: event.kind().name(), body: body.freeze() })
    }

    /// Encode an inbound event.
    pub fn inbound(event: &InboundEvent) -> proto::errors::Result<Self> {
        let mut body = BytesMut::new();
        event.encode(&mut body)?;
        Ok(Self { name: event.kind().name(), body: body.freeze() })
    }
}

/// [`ConnectionChannel`] over the in-process link.
#[derive(Debug)]
pub struct LinkChannel {
    to_server: mpsc::UnboundedSender<WireEvent>,
    connected: bool,
    subscriptions: HashSet<EventKind>,
}

impl LinkChannel {
    /// Create a connected channel.
    pub fn new(to_server: mpsc::UnboundedSender<WireEvent>) -> Self {
        Self { to_server, connected: true, subscriptions: HashSet::new() }
    }

    /// Set the connectivity flag.
    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }

    /// Whether inbound events of `kind` should reach the engine.
    pub fn is_subscribed(&self, kind: EventKind) -> bool {
        self.subscriptions.contains(&kind)
    }
}

impl ConnectionChannel for LinkChannel {
    fn is_connected(&self) -> bool {
        self.connected && !self.to_server.is_closed()
    }

    fn subscribe(&mut self, kind: EventKind) {
        self.subscriptions.insert(kind);
    }

    fn unsubscribe(&mut self, kind: EventKind) {
        self.subscriptions.remove(&kind);
    }

    fn emit(&mut self, event: OutboundEvent) -> Result<(), ChannelError> {
        if !self.connected {
            return Err(ChannelError::NotConnected);
        }
        let wire = WireEvent::outbound(&event)?;
        tracing::trace!(event = wire.name, bytes = wire.body.len(), "emit");
        self.to_server.send(wire).map_err(|_| ChannelError::Closed)
    }
}
