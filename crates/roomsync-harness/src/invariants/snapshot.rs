//! Observable state snapshots for invariant checking.

use std::collections::HashMap;

use roomsync_core::{ConnectionChannel, SyncEngine, SyncState};
use roomsync_proto::{Message, MessageId, RoomId};

/// Snapshot of every engine in a run, plus the server's logs.
#[derive(Debug, Clone, Default)]
pub struct SystemSnapshot {
    /// Per-engine snapshots.
    pub clients: Vec<EngineSnapshot>,
    /// Server log per room, oldest first.
    pub server_logs: HashMap<RoomId, Vec<MessageId>>,
}

impl SystemSnapshot {
    /// Snapshot with no engines.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Snapshot with a single engine.
    pub fn single(client: EngineSnapshot) -> Self {
        Self { clients: vec![client], server_logs: HashMap::new() }
    }

    /// Add an engine snapshot.
    pub fn add_client(&mut self, client: EngineSnapshot) {
        self.clients.push(client);
    }
}

/// Observable state of one engine.
#[derive(Debug, Clone)]
pub struct EngineSnapshot {
    /// Index of the engine within the run.
    pub id: usize,
    /// Active room.
    pub room: Option<RoomId>,
    /// Reconciliation state.
    pub state: SyncState,
    /// Whether the attached channel reports connected.
    pub channel_connected: bool,
    /// Store capacity.
    pub capacity: usize,
    /// Store contents in display order.
    pub messages: Vec<Message>,
}

impl EngineSnapshot {
    /// Capture the observable state of `engine`.
    pub fn from_engine<C: ConnectionChannel>(id: usize, engine: &SyncEngine<C>) -> Self {
        Self {
            id,
            room: engine.room().cloned(),
            state: engine.state(),
            channel_connected: engine.channel().is_some_and(ConnectionChannel::is_connected),
            capacity: engine.store().capacity(),
            messages: engine.store().iter().cloned().collect(),
        }
    }

    /// Ids of the stored messages in display order.
    pub fn ids(&self) -> Vec<&MessageId> {
        self.messages.iter().map(|m| &m.id).collect()
    }
}
