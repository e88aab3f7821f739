//! The chat message record.

use serde::{Deserialize, Serialize};

use crate::{MessageId, ParticipantId, RoomId};

/// A chat message as delivered by history snapshots and live pushes.
///
/// Field names on the wire follow the deployed protocol (`userId`,
/// `userName`, `createdAt`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Unique message identifier.
    pub id: MessageId,
    /// Room the message belongs to.
    pub room_id: RoomId,
    /// Authoring participant.
    #[serde(rename = "userId")]
    pub sender_id: ParticipantId,
    /// Display label of the author. `None` if the sender did not provide one.
    #[serde(rename = "userName", default, skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,
    /// Message body.
    pub text: String,
    /// Creation time in Unix milliseconds (UTC).
    pub created_at: u64,
}

impl Message {
    /// Author label, or `fallback` if the sender did not provide a name.
    ///
    /// Blank names count as absent.
    pub fn display_name<'a>(&'a self, fallback: &'a str) -> &'a str {
        match self.sender_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => fallback,
        }
    }
}
