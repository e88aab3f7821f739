//! In-process history source.
//!
//! [`SimServer`] plays the remote side of the channel: it keeps a bounded
//! per-room log, answers history requests with the log (oldest first), and
//! turns sends into messages with server-assigned ids and timestamps that are
//! broadcast as live pushes. It returns [`ServerAction`]s instead of doing
//! I/O so callers decide how and when events reach clients.

use std::collections::{HashMap, VecDeque};

use roomsync_core::DEFAULT_RETENTION;
use roomsync_proto::{
    HistoryRequest, HistoryResponse, InboundEvent, Message, MessageId, OutboundEvent,
    ParticipantId, RoomId, SendMessage,
};

/// Actions produced by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerAction {
    /// Deliver to the client that sent the request.
    Reply(InboundEvent),
    /// Deliver to every client listening for live messages.
    Broadcast {
        /// Room the event belongs to.
        room_id: RoomId,
        /// Live push.
        event: InboundEvent,
    },
}

/// Simulated history source.
#[derive(Debug, Clone)]
pub struct SimServer {
    rooms: HashMap<RoomId, VecDeque<Message>>,
    retention: usize,
    next_id: u64,
    /// Logical clock in milliseconds; strictly increasing per message.
    clock: u64,
}

impl Default for SimServer {
    fn default() -> Self {
        Self::new(DEFAULT_RETENTION)
    }
}

impl SimServer {
    /// Create a server keeping at most `retention` messages per room.
    pub fn new(retention: usize) -> Self {
        Self { rooms: HashMap::new(), retention: retention.max(1), next_id: 1, clock: 1_000 }
    }

    /// Process an event emitted by a client.
    pub fn handle(&mut self, event: OutboundEvent) -> Vec<ServerAction> {
        match event {
            OutboundEvent::HistoryRequest(HistoryRequest { room_id }) => {
                let messages = self.log(&room_id);
                vec![ServerAction::Reply(InboundEvent::HistoryResponse(HistoryResponse {
                    room_id,
                    messages,
                }))]
            },
            OutboundEvent::SendMessage(send) => {
                if send.text.trim().is_empty() {
                    tracing::debug!(room = %send.room_id, "rejecting empty message");
                    return vec![];
                }
                let message = self.append(send);
                vec![ServerAction::Broadcast {
                    room_id: message.room_id.clone(),
                    event: InboundEvent::LiveMessage(message),
                }]
            },
        }
    }

    /// Append a message directly, as if sent by `sender`. Returns the stored
    /// message; no broadcast is produced.
    pub fn seed(&mut self, room_id: &RoomId, sender: &str, text: &str) -> Message {
        self.append(SendMessage {
            room_id: room_id.clone(),
            sender_id: ParticipantId::new(sender),
            sender_name: None,
            text: text.to_string(),
        })
    }

    /// Current log of `room_id`, oldest first.
    pub fn log(&self, room_id: &RoomId) -> Vec<Message> {
        self.rooms.get(room_id).map(|log| log.iter().cloned().collect()).unwrap_or_default()
    }

    /// Rooms with at least one logged message.
    pub fn rooms(&self) -> impl Iterator<Item = &RoomId> {
        self.rooms.keys()
    }

    fn append(&mut self, send: SendMessage) -> Message {
        self.clock += 1;
        let message = Message {
            id: MessageId::new(format!("srv-{}", self.next_id)),
            room_id: send.room_id,
            sender_id: send.sender_id,
            sender_name: send.sender_name,
            text: send.text,
            created_at: self.clock,
        };
        self.next_id += 1;

        let log = self.rooms.entry(message.room_id.clone()).or_default();
        log.push_back(message.clone());
        while log.len() > self.retention {
            log.pop_front();
        }
        message
    }
}
