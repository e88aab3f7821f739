//! Wire protocol for room-scoped message synchronization.
//!
//! Defines the identifiers, the [`Message`] record, and the four named events
//! exchanged over the connection channel:
//!
//! | Direction | Event                   | Payload             |
//! |-----------|-------------------------|---------------------|
//! | out       | `chat-history-request`  | [`HistoryRequest`]  |
//! | in        | `chat-history`          | [`HistoryResponse`] |
//! | out       | `chat-message`          | [`SendMessage`]     |
//! | in        | `chat-message`          | [`Message`]         |
//!
//! Payload bodies are CBOR. The event name already identifies the payload
//! type, so only the inner struct is serialized.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod errors;
mod event;
mod ids;
mod message;
pub mod payloads;

pub use errors::ProtocolError;
pub use event::{Direction, EventKind};
pub use ids::{MessageId, ParticipantId, RoomId};
pub use message::Message;
pub use payloads::{HistoryRequest, HistoryResponse, InboundEvent, OutboundEvent, SendMessage};
