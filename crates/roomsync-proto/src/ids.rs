//! Opaque identifiers.
//!
//! All identifiers are strings on the wire. Their internal structure is owned
//! by whoever assigns them (client or server), so they are compared only for
//! equality and never parsed.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a raw identifier.
            pub fn new(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            /// Raw identifier string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                Self::new(raw)
            }
        }

        impl From<String> for $name {
            fn from(raw: String) -> Self {
                Self(raw)
            }
        }
    };
}

opaque_id!(
    /// Identifies a room. All messages and sync state are scoped to one room.
    RoomId
);

opaque_id!(
    /// Identifies a message. Stable across history and live delivery of the
    /// same logical message.
    MessageId
);

opaque_id!(
    /// Identifies a chat participant.
    ParticipantId
);
