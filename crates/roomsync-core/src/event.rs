//! Engine inputs and outputs.

use roomsync_proto::{InboundEvent, RoomId};

/// Events that drive the [`crate::SyncEngine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// The channel's connectivity flag may have changed. The engine re-reads
    /// it from the attached channel.
    ConnectivityChanged,

    /// An event delivered by the channel.
    Inbound(InboundEvent),
}

impl From<InboundEvent> for SyncEvent {
    fn from(event: InboundEvent) -> Self {
        Self::Inbound(event)
    }
}

/// Instructions for the presentation runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncAction {
    /// Store, draft or state changed; re-read the projection.
    Render,

    /// History for the active room has been applied.
    Synced {
        /// Room that became synced.
        room_id: RoomId,
    },
}
