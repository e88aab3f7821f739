//! Named channel events.

use std::fmt;

use crate::errors::{ProtocolError, Result};

/// Direction of an event relative to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Client to server.
    Outbound,
    /// Server to client.
    Inbound,
}

/// The four protocol events.
///
/// `SendMessage` and `LiveMessage` share the wire name `chat-message`; the
/// direction disambiguates them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Pull recent messages for a room.
    HistoryRequest,
    /// Snapshot answering a history request.
    HistoryResponse,
    /// Submit a new message.
    SendMessage,
    /// Push of a newly created message.
    LiveMessage,
}

impl EventKind {
    /// All event kinds.
    pub const ALL: [Self; 4] =
        [Self::HistoryRequest, Self::HistoryResponse, Self::SendMessage, Self::LiveMessage];

    /// Protocol event name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::HistoryRequest => "chat-history-request",
            Self::HistoryResponse => "chat-history",
            Self::SendMessage | Self::LiveMessage => "chat-message",
        }
    }

    /// Direction this event travels in.
    pub const fn direction(self) -> Direction {
        match self {
            Self::HistoryRequest | Self::SendMessage => Direction::Outbound,
            Self::HistoryResponse | Self::LiveMessage => Direction::Inbound,
        }
    }

    /// Resolve a protocol event name travelling in `direction`.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::UnknownEvent` if no event with that name travels in
    ///   that direction
    pub fn from_name(name: &str, direction: Direction) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == name && kind.direction() == direction)
            .ok_or_else(|| ProtocolError::UnknownEvent(name.to_string()))
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
