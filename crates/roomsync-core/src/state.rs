//! Observable synchronization state.

use std::fmt;

/// Connection and reconciliation state of the engine.
///
/// ```text
/// Disconnected ──connect──▶ ConnectedUnsynced ──history applied──▶ ConnectedSynced
///      ▲                        ▲      │                                │
///      └──────disconnect────────┼──────┘◀──────────disconnect───────────┘
///                               └────────────room change────────────────┘
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SyncState {
    /// Channel absent or not connected.
    #[default]
    Disconnected,
    /// Connected; history for the current room not yet applied.
    ConnectedUnsynced,
    /// Connected; history for the current room applied.
    ConnectedSynced,
}

impl SyncState {
    /// Whether the channel was connected at the last observation.
    pub fn is_connected(self) -> bool {
        !matches!(self, Self::Disconnected)
    }
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Disconnected => "disconnected",
            Self::ConnectedUnsynced => "connected-unsynced",
            Self::ConnectedSynced => "connected-synced",
        })
    }
}
