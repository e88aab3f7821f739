//! Standard invariant checks.

use std::collections::HashSet;

use roomsync_core::SyncState;

use super::{Invariant, InvariantKind, InvariantResult, SystemSnapshot, Violation};

/// A store never holds the same message id twice.
///
/// Both delivery paths merge through the store, so a message seen via
/// history and again via a live push must collapse into one entry.
pub struct UniqueIds;

impl Invariant for UniqueIds {
    fn kind(&self) -> InvariantKind {
        InvariantKind::UniqueIds
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for client in &state.clients {
            let mut seen = HashSet::new();
            for message in &client.messages {
                if !seen.insert(&message.id) {
                    return Err(Violation {
                        invariant: self.kind(),
                        message: format!("client {}: duplicate id {}", client.id, message.id),
                    });
                }
            }
        }
        Ok(())
    }
}

/// A store never exceeds its capacity.
pub struct RetentionBound;

impl Invariant for RetentionBound {
    fn kind(&self) -> InvariantKind {
        InvariantKind::RetentionBound
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for client in &state.clients {
            if client.messages.len() > client.capacity {
                return Err(Violation {
                    invariant: self.kind(),
                    message: format!(
                        "client {}: {} messages exceed capacity {}",
                        client.id,
                        client.messages.len(),
                        client.capacity
                    ),
                });
            }
        }
        Ok(())
    }
}

/// Every stored message belongs to the active room, and an engine without a
/// room stores nothing.
pub struct RoomIsolation;

impl Invariant for RoomIsolation {
    fn kind(&self) -> InvariantKind {
        InvariantKind::RoomIsolation
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for client in &state.clients {
            let stray = client.messages.iter().find(|m| client.room.as_ref() != Some(&m.room_id));
            if let Some(message) = stray {
                return Err(Violation {
                    invariant: self.kind(),
                    message: format!(
                        "client {}: message {} from room {} while active room is {:?}",
                        client.id,
                        message.id,
                        message.room_id,
                        client.room.as_ref().map(|r| r.as_str())
                    ),
                });
            }
        }
        Ok(())
    }
}

/// `ConnectedSynced` requires an active room and a connected channel.
pub struct SyncedImpliesRoom;

impl Invariant for SyncedImpliesRoom {
    fn kind(&self) -> InvariantKind {
        InvariantKind::SyncedImpliesRoom
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for client in &state.clients {
            if client.state != SyncState::ConnectedSynced {
                continue;
            }
            if client.room.is_none() || !client.channel_connected {
                return Err(Violation {
                    invariant: self.kind(),
                    message: format!(
                        "client {}: synced with room {:?}, channel connected {}",
                        client.id,
                        client.room.as_ref().map(|r| r.as_str()),
                        client.channel_connected
                    ),
                });
            }
        }
        Ok(())
    }
}

/// Synced engines hold exactly the most recent part of the server's log for
/// their room, in the server's order.
///
/// Only meaningful once every request and push has been delivered.
pub struct TimelineConvergence;

impl Invariant for TimelineConvergence {
    fn kind(&self) -> InvariantKind {
        InvariantKind::TimelineConvergence
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for client in &state.clients {
            let (SyncState::ConnectedSynced, Some(room)) = (client.state, client.room.as_ref())
            else {
                continue;
            };

            let log = state.server_logs.get(room).map(Vec::as_slice).unwrap_or_default();
            let expected: Vec<_> = log[log.len().saturating_sub(client.capacity)..].iter().collect();
            let actual = client.ids();

            if actual != expected {
                return Err(Violation {
                    invariant: self.kind(),
                    message: format!(
                        "client {} room {}: store {:?} != server {:?}",
                        client.id, room, actual, expected
                    ),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use roomsync_proto::{Message, MessageId, ParticipantId, RoomId};

    use super::*;
    use crate::invariants::EngineSnapshot;

    fn msg(id: &str, room: &str) -> Message {
        Message {
            id: MessageId::new(id),
            room_id: RoomId::new(room),
            sender_id: ParticipantId::new("u"),
            sender_name: None,
            text: String::new(),
            created_at: 0,
        }
    }

    fn client(room: Option<&str>, state: SyncState, messages: Vec<Message>) -> EngineSnapshot {
        EngineSnapshot {
            id: 0,
            room: room.map(RoomId::new),
            state,
            channel_connected: state.is_connected(),
            capacity: 3,
            messages,
        }
    }

    #[test]
    fn duplicate_ids_detected() {
        let snapshot = SystemSnapshot::single(client(Some("r"), SyncState::Disconnected, vec![
            msg("1", "r"),
            msg("1", "r"),
        ]));
        let err = UniqueIds.check(&snapshot).unwrap_err();
        assert_eq!(err.invariant, InvariantKind::UniqueIds);
    }

    #[test]
    fn over_capacity_detected() {
        let messages = (0..4).map(|i| msg(&i.to_string(), "r")).collect();
        let snapshot = SystemSnapshot::single(client(Some("r"), SyncState::Disconnected, messages));
        assert!(RetentionBound.check(&snapshot).is_err());
    }

    #[test]
    fn foreign_room_detected() {
        let snapshot = SystemSnapshot::single(client(Some("r1"), SyncState::ConnectedSynced, vec![
            msg("1", "r2"),
        ]));
        assert!(RoomIsolation.check(&snapshot).is_err());

        let roomless = SystemSnapshot::single(client(None, SyncState::Disconnected, vec![msg(
            "1", "r1",
        )]));
        assert!(RoomIsolation.check(&roomless).is_err());
    }

    #[test]
    fn synced_without_room_detected() {
        let snapshot = SystemSnapshot::single(client(None, SyncState::ConnectedSynced, vec![]));
        assert!(SyncedImpliesRoom.check(&snapshot).is_err());
    }

    #[test]
    fn convergence_compares_log_tail() {
        let mut snapshot = SystemSnapshot::single(client(Some("r"), SyncState::ConnectedSynced, vec![
            msg("2", "r"),
            msg("3", "r"),
            msg("4", "r"),
        ]));
        snapshot.server_logs = HashMap::from([(
            RoomId::new("r"),
            ["1", "2", "3", "4"].into_iter().map(MessageId::new).collect(),
        )]);
        assert!(TimelineConvergence.check(&snapshot).is_ok());

        snapshot.clients[0].messages.swap(0, 1);
        assert!(TimelineConvergence.check(&snapshot).is_err());
    }
}
