//! Multi-client simulation world.
//!
//! [`SimWorld`] wires several engines to one [`SimServer`] through
//! [`SimChannel`]s and queues every server reply and broadcast per client
//! instead of delivering it immediately. [`Operation`]s then decide when each
//! queue is drained, so tests can reproduce any interleaving of history
//! responses, live pushes, room switches and connectivity flips.
//!
//! Inboxes survive disconnects: a response requested before a disconnect can
//! still be delivered afterwards, the way a slow transport would.

use std::collections::VecDeque;

use arbitrary::Arbitrary;
use roomsync_core::{ConnectionChannel, Identity, QUICK_TOKENS, SyncConfig, SyncEngine, SyncEvent};
use roomsync_proto::{EventKind, InboundEvent, RoomId};

use crate::{EngineSnapshot, ServerAction, SimChannel, SimServer, SystemSnapshot};

/// Client index (wrapped modulo the number of clients).
pub type ClientId = u8;

/// Room index (wrapped modulo [`SimWorld::ROOM_COUNT`]).
pub type ModelRoomId = u8;

/// Operations that can be applied to a [`SimWorld`].
#[derive(Debug, Clone, Arbitrary)]
pub enum Operation {
    /// Replace the draft and submit it.
    Submit {
        /// Client submitting.
        client: ClientId,
        /// Draft content.
        text: SmallText,
    },

    /// Append a quick-insert symbol to the draft. Out of range indices are
    /// kept to exercise the no-op path.
    QuickInsert {
        /// Client editing.
        client: ClientId,
        /// Index into the quick-insert list.
        index: u8,
    },

    /// Assign a room, or leave the current one.
    SwitchRoom {
        /// Client switching.
        client: ClientId,
        /// Target room. `None` leaves.
        room: Option<ModelRoomId>,
    },

    /// Drop the client's connection.
    Disconnect {
        /// Client disconnecting.
        client: ClientId,
    },

    /// Restore (or re-confirm) the client's connection.
    Reconnect {
        /// Client reconnecting.
        client: ClientId,
    },

    /// Deliver the oldest queued history response.
    DeliverHistory {
        /// Receiving client.
        client: ClientId,
    },

    /// Deliver the oldest queued live push.
    DeliverLive {
        /// Receiving client.
        client: ClientId,
    },

    /// Route every emitted event to the server and queue its replies.
    Pump,
}

/// Compact draft content.
#[derive(Debug, Clone, Copy, Arbitrary)]
pub struct SmallText {
    /// Content seed.
    pub seed: u8,
    /// 0 empty, 1 whitespace, 2 plain, 3 padded with a symbol.
    pub size_class: u8,
}

impl SmallText {
    /// Expand to draft text.
    pub fn to_text(self) -> String {
        match self.size_class % 4 {
            0 => String::new(),
            1 => "   ".to_string(),
            2 => format!("m{}", self.seed),
            _ => {
                let token = QUICK_TOKENS[usize::from(self.seed) % QUICK_TOKENS.len()];
                format!("  m{} {token}  ", self.seed)
            },
        }
    }
}

/// One engine plus its undelivered inbound traffic.
#[derive(Debug)]
pub struct SimClient {
    engine: SyncEngine<SimChannel>,
    channel: SimChannel,
    history_inbox: VecDeque<InboundEvent>,
    live_inbox: VecDeque<InboundEvent>,
}

impl SimClient {
    /// The client's engine.
    pub fn engine(&self) -> &SyncEngine<SimChannel> {
        &self.engine
    }

    /// Observer handle on the engine's channel.
    pub fn channel(&self) -> &SimChannel {
        &self.channel
    }

    /// Number of queued history responses.
    pub fn pending_history(&self) -> usize {
        self.history_inbox.len()
    }

    /// Number of queued live pushes.
    pub fn pending_live(&self) -> usize {
        self.live_inbox.len()
    }

    fn set_connected(&mut self, connected: bool) {
        self.channel.set_connected(connected);
        self.engine.handle(SyncEvent::ConnectivityChanged);
    }

    fn deliver_history(&mut self) -> bool {
        self.history_inbox.pop_front().is_some_and(|event| {
            self.engine.handle(event.into());
            true
        })
    }

    fn deliver_live(&mut self) -> bool {
        self.live_inbox.pop_front().is_some_and(|event| {
            self.engine.handle(event.into());
            true
        })
    }
}

/// Engines sharing one simulated server.
#[derive(Debug)]
pub struct SimWorld {
    server: SimServer,
    clients: Vec<SimClient>,
}

impl SimWorld {
    /// Number of distinct rooms operations map onto.
    pub const ROOM_COUNT: u8 = 3;

    /// Create `num_clients` connected engines, all in room 0, each with its
    /// first history request emitted but not yet routed.
    pub fn new(num_clients: usize, config: &SyncConfig) -> Self {
        let clients = (0..num_clients.max(1))
            .map(|i| {
                let identity = Identity::new(format!("user-{i}"), Some(format!("User {i}")));
                let mut engine = SyncEngine::new(config.clone(), identity);
                let channel = SimChannel::connected();
                engine.set_room(Some(Self::room_id(0)));
                engine.attach(channel.clone());
                SimClient {
                    engine,
                    channel,
                    history_inbox: VecDeque::new(),
                    live_inbox: VecDeque::new(),
                }
            })
            .collect();

        Self { server: SimServer::new(config.retention), clients }
    }

    /// Wire room id for a model room.
    pub fn room_id(room: ModelRoomId) -> RoomId {
        RoomId::new(format!("room-{}", room % Self::ROOM_COUNT))
    }

    /// All clients.
    pub fn clients(&self) -> &[SimClient] {
        &self.clients
    }

    /// Client by index. Wraps like operations do.
    pub fn client(&self, id: ClientId) -> &SimClient {
        &self.clients[self.index(id)]
    }

    /// The simulated server.
    pub fn server(&self) -> &SimServer {
        &self.server
    }

    /// Mutable access to the server, e.g. to seed history.
    pub fn server_mut(&mut self) -> &mut SimServer {
        &mut self.server
    }

    /// Apply one operation.
    pub fn apply(&mut self, op: &Operation) {
        tracing::trace!(?op, "apply");
        match *op {
            Operation::Submit { client, text } => {
                let client = self.client_mut(client);
                client.engine.set_draft(text.to_text());
                client.engine.submit();
            },
            Operation::QuickInsert { client, index } => {
                self.client_mut(client).engine.append_quick(usize::from(index) % 10);
            },
            Operation::SwitchRoom { client, room } => {
                self.client_mut(client).engine.set_room(room.map(Self::room_id));
            },
            Operation::Disconnect { client } => self.client_mut(client).set_connected(false),
            Operation::Reconnect { client } => self.client_mut(client).set_connected(true),
            Operation::DeliverHistory { client } => {
                self.client_mut(client).deliver_history();
            },
            Operation::DeliverLive { client } => {
                self.client_mut(client).deliver_live();
            },
            Operation::Pump => self.pump(),
        }
    }

    /// Route every client's emitted events through the server.
    ///
    /// Replies are queued for the requesting client. Broadcasts are queued
    /// for every client that is connected and listening for live pushes;
    /// each engine decides for itself whether the room matches.
    pub fn pump(&mut self) {
        for sender in 0..self.clients.len() {
            for event in self.clients[sender].channel.take_outgoing() {
                for action in self.server.handle(event) {
                    match action {
                        ServerAction::Reply(reply) => {
                            self.clients[sender].history_inbox.push_back(reply);
                        },
                        ServerAction::Broadcast { event, .. } => self.broadcast(&event),
                    }
                }
            }
        }
    }

    /// Reconnect everyone and deliver until nothing is in flight.
    pub fn settle(&mut self) {
        for client in &mut self.clients {
            client.set_connected(true);
        }

        loop {
            self.pump();
            let mut delivered = false;
            for client in &mut self.clients {
                while client.deliver_history() {
                    delivered = true;
                }
                while client.deliver_live() {
                    delivered = true;
                }
            }
            if !delivered {
                break;
            }
        }
    }

    /// Snapshot of every engine and the server's logs.
    pub fn snapshot(&self) -> SystemSnapshot {
        let mut snapshot = SystemSnapshot::empty();
        for (i, client) in self.clients.iter().enumerate() {
            snapshot.add_client(EngineSnapshot::from_engine(i, &client.engine));
        }
        for room in self.server.rooms() {
            let ids = self.server.log(room).into_iter().map(|m| m.id).collect();
            snapshot.server_logs.insert(room.clone(), ids);
        }
        snapshot
    }

    fn broadcast(&mut self, event: &InboundEvent) {
        for client in &mut self.clients {
            if client.channel.is_connected() && client.channel.is_subscribed(EventKind::LiveMessage)
            {
                client.live_inbox.push_back(event.clone());
            }
        }
    }

    fn index(&self, id: ClientId) -> usize {
        usize::from(id) % self.clients.len()
    }

    fn client_mut(&mut self, id: ClientId) -> &mut SimClient {
        let index = self.index(id);
        &mut self.clients[index]
    }
}

#[cfg(test)]
mod tests {
    use roomsync_core::SyncState;

    use super::*;

    #[test]
    fn new_world_requests_history() {
        let world = SimWorld::new(2, &SyncConfig::default());

        for client in world.clients() {
            assert_eq!(client.engine().state(), SyncState::ConnectedUnsynced);
            assert_eq!(client.channel().emitted_count(EventKind::HistoryRequest), 1);
        }
    }

    #[test]
    fn submit_reaches_every_listener() {
        let mut world = SimWorld::new(3, &SyncConfig::default());
        world.apply(&Operation::Submit { client: 0, text: SmallText { seed: 7, size_class: 2 } });
        world.pump();

        for client in world.clients() {
            assert_eq!(client.pending_history(), 1);
            assert_eq!(client.pending_live(), 1);
        }
    }

    #[test]
    fn settle_syncs_everyone() {
        let mut world = SimWorld::new(2, &SyncConfig::default());
        world.apply(&Operation::Disconnect { client: 1 });
        world.apply(&Operation::Submit { client: 0, text: SmallText { seed: 1, size_class: 3 } });

        world.settle();

        for client in world.clients() {
            assert_eq!(client.engine().state(), SyncState::ConnectedSynced);
            assert_eq!(client.engine().store().len(), 1);
        }
    }
}
