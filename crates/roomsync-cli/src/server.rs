//! In-process history server.
//!
//! Runs a [`SimServer`] on a tokio task and speaks [`WireEvent`]s over mpsc
//! channels. No network: every event is still CBOR-encoded and decoded, so
//! the link behaves like a real transport minus latency.

use roomsync_core::proto::{Direction, EventKind, OutboundEvent, ProtocolError};
use roomsync_harness::{ServerAction, SimServer};
use tokio::sync::mpsc;

use crate::WireEvent;

/// Handle to a running in-process server.
#[derive(Debug)]
pub struct ServerHandle {
    /// Send events to the server.
    pub to_server: mpsc::UnboundedSender<WireEvent>,
    /// Receive events from the server.
    pub from_server: mpsc::UnboundedReceiver<WireEvent>,
    abort_handle: tokio::task::AbortHandle,
}

impl ServerHandle {
    /// Stop the server.
    pub fn stop(&self) {
        self.abort_handle.abort();
    }
}

/// Spawn an in-process server keeping `retention` messages per room.
///
/// Must be called from within a tokio runtime. The server runs until every
/// sender is dropped or [`ServerHandle::stop`] is called.
pub fn spawn_server(retention: usize) -> ServerHandle {
    let (client_tx, mut server_rx) = mpsc::unbounded_channel::<WireEvent>();
    let (server_tx, client_rx) = mpsc::unbounded_channel::<WireEvent>();

    let handle = tokio::spawn(async move {
        let mut server = SimServer::new(retention);

        while let Some(wire) = server_rx.recv().await {
            let event = match decode(&wire) {
                Ok(event) => event,
                Err(e) => {
                    tracing::warn!(event = wire.name, error = %e, "server: dropping undecodable event");
                    continue;
                },
            };

            for action in server.handle(event) {
                let (ServerAction::Reply(reply) | ServerAction::Broadcast { event: reply, .. }) =
                    action;
                let encoded = match WireEvent::inbound(&reply) {
                    Ok(encoded) => encoded,
                    Err(e) => {
                        tracing::warn!(error = %e, "server: failed to encode reply");
                        continue;
                    },
                };
                if server_tx.send(encoded).is_err() {
                    tracing::debug!("server: client gone, stopping");
                    return;
                }
            }
        }
    });

    ServerHandle { to_server: client_tx, from_server: client_rx, abort_handle: handle.abort_handle() }
}

fn decode(wire: &WireEvent) -> Result<OutboundEvent, ProtocolError> {
    let kind = EventKind::from_name(wire.name, Direction::Outbound)?;
    OutboundEvent::decode(kind, &wire.body)
}
