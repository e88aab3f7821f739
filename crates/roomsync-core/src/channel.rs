//! Connection channel contract.
//!
//! The transport (connect, retry backoff, authentication) lives outside this
//! crate. The engine only needs a connectivity flag and named
//! subscribe/unsubscribe/emit primitives, captured by [`ConnectionChannel`].
//!
//! Inbound events are not pulled through the trait: whoever owns the
//! transport delivers them to [`crate::SyncEngine::handle`] as they arrive.

use roomsync_proto::{EventKind, OutboundEvent, ProtocolError};
use thiserror::Error;

/// Errors a channel may report when emitting.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// The channel is not connected.
    #[error("channel not connected")]
    NotConnected,

    /// The channel has been shut down.
    #[error("channel closed")]
    Closed,

    /// The event could not be encoded.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

/// Persistent bidirectional event channel.
pub trait ConnectionChannel {
    /// Whether the channel currently reports connectivity.
    fn is_connected(&self) -> bool;

    /// Start delivering events of `kind` to the engine.
    fn subscribe(&mut self, kind: EventKind);

    /// Stop delivering events of `kind`.
    fn unsubscribe(&mut self, kind: EventKind);

    /// Emit an outbound event.
    ///
    /// # Errors
    ///
    /// Returns an error if the event could not be handed to the transport.
    fn emit(&mut self, event: OutboundEvent) -> Result<(), ChannelError>;
}

impl<C: ConnectionChannel + ?Sized> ConnectionChannel for Box<C> {
    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    fn subscribe(&mut self, kind: EventKind) {
        (**self).subscribe(kind);
    }

    fn unsubscribe(&mut self, kind: EventKind) {
        (**self).unsubscribe(kind);
    }

    fn emit(&mut self, event: OutboundEvent) -> Result<(), ChannelError> {
        (**self).emit(event)
    }
}
