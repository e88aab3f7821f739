//! Protocol error types.

use thiserror::Error;

use crate::EventKind;

/// Result alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors produced while encoding or decoding channel events.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// CBOR serialization failed.
    #[error("CBOR encode error: {0}")]
    CborEncode(String),

    /// CBOR deserialization failed.
    #[error("CBOR decode error: {0}")]
    CborDecode(String),

    /// Payload body exceeds the maximum accepted size.
    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge {
        /// Size of the rejected body.
        size: usize,
        /// Configured maximum.
        max: usize,
    },

    /// Event kind used in the wrong direction (e.g. decoding a send as
    /// inbound).
    #[error("event {0} is not valid in this direction")]
    UnexpectedDirection(EventKind),

    /// Event name not part of the protocol.
    #[error("unknown event name: {0}")]
    UnknownEvent(String),
}
