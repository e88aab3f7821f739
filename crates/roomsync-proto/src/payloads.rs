//! CBOR-encoded event payloads.
//!
//! Each [`OutboundEvent`] and [`InboundEvent`] variant maps to exactly one
//! [`EventKind`] (enforced by match exhaustiveness). Only the inner payload
//! is serialized; the event name carried by the channel selects the variant
//! on decode.

use bytes::BufMut;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{
    Direction, EventKind, Message, ParticipantId, RoomId,
    errors::{ProtocolError, Result},
};

/// Maximum accepted payload body (1 MiB).
pub const MAX_PAYLOAD_SIZE: usize = 1024 * 1024;

/// Pull recent messages for a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRequest {
    /// Room to pull.
    pub room_id: RoomId,
}

/// Recent-message snapshot for a room, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResponse {
    /// Room the snapshot was taken from.
    pub room_id: RoomId,
    /// Messages, oldest first.
    #[serde(default)]
    pub messages: Vec<Message>,
}

/// Submit a new message to a room.
///
/// The server assigns the message id and creation time and echoes the result
/// back as a live push.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessage {
    /// Target room.
    pub room_id: RoomId,
    /// Authoring participant.
    #[serde(rename = "userId")]
    pub sender_id: ParticipantId,
    /// Display label of the author.
    #[serde(rename = "userName", default, skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,
    /// Trimmed, non-empty body.
    pub text: String,
}

/// Events the client emits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundEvent {
    /// `chat-history-request`
    HistoryRequest(HistoryRequest),
    /// `chat-message` (outbound)
    SendMessage(SendMessage),
}

/// Events the client receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// `chat-history`
    HistoryResponse(HistoryResponse),
    /// `chat-message` (inbound)
    LiveMessage(Message),
}

impl OutboundEvent {
    /// Event kind of this payload.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::HistoryRequest(_) => EventKind::HistoryRequest,
            Self::SendMessage(_) => EventKind::SendMessage,
        }
    }

    /// Room this event targets.
    pub fn room_id(&self) -> &RoomId {
        match self {
            Self::HistoryRequest(inner) => &inner.room_id,
            Self::SendMessage(inner) => &inner.room_id,
        }
    }

    /// Encode the payload body.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::CborEncode` if serialization fails
    pub fn encode(&self, dst: &mut impl BufMut) -> Result<()> {
        match self {
            Self::HistoryRequest(inner) => encode_body(inner, dst),
            Self::SendMessage(inner) => encode_body(inner, dst),
        }
    }

    /// Decode a payload body received under `kind`.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::UnexpectedDirection` if `kind` is an inbound event
    /// - `ProtocolError::PayloadTooLarge` if `bytes` exceed
    ///   [`MAX_PAYLOAD_SIZE`]
    /// - `ProtocolError::CborDecode` if deserialization fails
    pub fn decode(kind: EventKind, bytes: &[u8]) -> Result<Self> {
        match kind {
            EventKind::HistoryRequest => Ok(Self::HistoryRequest(decode_body(bytes)?)),
            EventKind::SendMessage => Ok(Self::SendMessage(decode_body(bytes)?)),
            EventKind::HistoryResponse | EventKind::LiveMessage => {
                Err(ProtocolError::UnexpectedDirection(kind))
            },
        }
    }
}

impl InboundEvent {
    /// Event kind of this payload.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::HistoryResponse(_) => EventKind::HistoryResponse,
            Self::LiveMessage(_) => EventKind::LiveMessage,
        }
    }

    /// Room this event is tagged with.
    pub fn room_id(&self) -> &RoomId {
        match self {
            Self::HistoryResponse(inner) => &inner.room_id,
            Self::LiveMessage(inner) => &inner.room_id,
        }
    }

    /// Encode the payload body.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::CborEncode` if serialization fails
    pub fn encode(&self, dst: &mut impl BufMut) -> Result<()> {
        match self {
            Self::HistoryResponse(inner) => encode_body(inner, dst),
            Self::LiveMessage(inner) => encode_body(inner, dst),
        }
    }

    /// Decode a payload body received under `kind`.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::UnexpectedDirection` if `kind` is an outbound event
    /// - `ProtocolError::PayloadTooLarge` if `bytes` exceed
    ///   [`MAX_PAYLOAD_SIZE`]
    /// - `ProtocolError::CborDecode` if deserialization fails
    pub fn decode(kind: EventKind, bytes: &[u8]) -> Result<Self> {
        match kind {
            EventKind::HistoryResponse => Ok(Self::HistoryResponse(decode_body(bytes)?)),
            EventKind::LiveMessage => Ok(Self::LiveMessage(decode_body(bytes)?)),
            EventKind::HistoryRequest | EventKind::SendMessage => {
                Err(ProtocolError::UnexpectedDirection(kind))
            },
        }
    }

    /// Decode by protocol event name.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::UnknownEvent` if `name` is not an inbound event
    /// - Any error from [`InboundEvent::decode`]
    pub fn decode_named(name: &str, bytes: &[u8]) -> Result<Self> {
        Self::decode(EventKind::from_name(name, Direction::Inbound)?, bytes)
    }
}

fn encode_body<T: Serialize>(inner: &T, dst: &mut impl BufMut) -> Result<()> {
    ciborium::ser::into_writer(inner, dst.writer())
        .map_err(|e| ProtocolError::CborEncode(e.to_string()))
}

fn decode_body<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    if bytes.len() > MAX_PAYLOAD_SIZE {
        return Err(ProtocolError::PayloadTooLarge { size: bytes.len(), max: MAX_PAYLOAD_SIZE });
    }

    ciborium::de::from_reader(bytes).map_err(|e| ProtocolError::CborDecode(e.to_string()))
}
