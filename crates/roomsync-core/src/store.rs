//! Bounded, ordered, deduplicated message collection.
//!
//! [`MessageStore`] is the single source of truth for the active room's
//! timeline. Both delivery paths feed it: live pushes through
//! [`MessageStore::insert_one`] and history snapshots through
//! [`MessageStore::merge_snapshot`].
//!
//! # Invariants
//!
//! - Every retained id is unique. Re-inserting a present id is a no-op; the
//!   first write wins.
//! - At most `capacity` messages are retained. Overflow evicts from the head.
//! - Retained order never changes once established: merges only insert new
//!   messages, they never move or overwrite existing ones.

use std::collections::{HashMap, HashSet, VecDeque, vec_deque};

use roomsync_proto::{Message, MessageId, ParticipantId};

/// Default retention cap.
pub const DEFAULT_RETENTION: usize = 200;

/// Result of merging a history snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Messages that were not present and got inserted.
    pub inserted: usize,
    /// Messages skipped because their id was already present.
    pub duplicates: usize,
    /// Oldest snapshot elements beyond the retention cap, never considered.
    pub skipped: usize,
}

impl MergeOutcome {
    /// Whether the merge changed the store.
    pub fn changed(&self) -> bool {
        self.inserted > 0
    }
}

/// One row of the read projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageView<'a> {
    /// The retained message.
    pub message: &'a Message,
    /// Authored by the local participant.
    pub mine: bool,
    /// Author label with the fallback applied.
    pub author: &'a str,
}

/// Ordered, bounded, deduplicated messages of one room.
#[derive(Debug, Clone)]
pub struct MessageStore {
    messages: VecDeque<Message>,
    ids: HashSet<MessageId>,
    capacity: usize,
}

impl Default for MessageStore {
    fn default() -> Self {
        Self::new(DEFAULT_RETENTION)
    }
}

impl MessageStore {
    /// Create an empty store retaining at most `capacity` messages.
    ///
    /// A zero capacity is clamped to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            messages: VecDeque::with_capacity(capacity),
            ids: HashSet::with_capacity(capacity),
            capacity,
        }
    }

    /// Append `message` unless its id is already present.
    ///
    /// Returns `true` if the message was inserted.
    pub fn insert_one(&mut self, message: Message) -> bool {
        if self.ids.contains(&message.id) {
            return false;
        }

        self.ids.insert(message.id.clone());
        self.messages.push_back(message);
        self.evict_overflow();
        true
    }

    /// Merge a history snapshot (oldest first) without discarding anything
    /// already present.
    ///
    /// Already-present messages act as anchors. A new message is placed after
    /// the previous snapshot element and before the next anchor; within that
    /// window it goes in front of the first message with a strictly later
    /// `created_at`. Snapshot order is kept, live messages received before
    /// the snapshot stay in place, and the result does not depend on whether
    /// a live message arrived before or after the snapshot containing it.
    ///
    /// Only the newest `capacity` snapshot elements are considered; older
    /// ones are counted in [`MergeOutcome::skipped`]. Runs in time linear in
    /// the store plus the considered snapshot.
    pub fn merge_snapshot(&mut self, snapshot: impl IntoIterator<Item = Message>) -> MergeOutcome {
        let mut snapshot: Vec<Message> = snapshot.into_iter().collect();
        let mut outcome = MergeOutcome::default();

        if snapshot.len() > self.capacity {
            outcome.skipped = snapshot.len() - self.capacity;
            snapshot.drain(..outcome.skipped);
        }

        let placements = self.place_snapshot(snapshot, &mut outcome);
        if !placements.is_empty() {
            self.splice(placements);
            self.evict_overflow();
        }
        outcome
    }

    /// Gap of each new snapshot message in the current store, in snapshot
    /// order. Gap `g` means "in front of the message at index `g`".
    ///
    /// Gaps never decrease, so later placements in the same gap go after
    /// earlier ones.
    fn place_snapshot(
        &self,
        snapshot: Vec<Message>,
        outcome: &mut MergeOutcome,
    ) -> Vec<(usize, Message)> {
        let positions: HashMap<&MessageId, usize> =
            self.messages.iter().enumerate().map(|(index, m)| (&m.id, index)).collect();
        let anchors: Vec<(usize, usize)> = snapshot
            .iter()
            .enumerate()
            .filter_map(|(i, m)| positions.get(&m.id).map(|&index| (i, index)))
            .collect();

        let mut placements = Vec::new();
        let mut placed = HashSet::new();
        let mut next_anchor = 0;
        let mut gap = 0;

        for (i, message) in snapshot.into_iter().enumerate() {
            if let Some(&index) = positions.get(&message.id) {
                gap = gap.max(index + 1);
                outcome.duplicates += 1;
                continue;
            }
            if !placed.insert(message.id.clone()) {
                outcome.duplicates += 1;
                continue;
            }

            // Anchors already passed, or sitting behind the gap, never bound
            // a later placement either.
            while anchors.get(next_anchor).is_some_and(|&(at, index)| at <= i || index < gap) {
                next_anchor += 1;
            }
            let upper = anchors.get(next_anchor).map_or(self.messages.len(), |&(_, index)| index);

            while gap < upper && self.messages[gap].created_at <= message.created_at {
                gap += 1;
            }

            tracing::trace!(id = %message.id, gap, "placing snapshot message");
            placements.push((gap, message));
            outcome.inserted += 1;
        }

        placements
    }

    fn splice(&mut self, placements: Vec<(usize, Message)>) {
        let existing = std::mem::take(&mut self.messages);
        let mut merged = VecDeque::with_capacity(existing.len() + placements.len());
        let mut placements = placements.into_iter().peekable();

        for (index, message) in existing.into_iter().enumerate() {
            while let Some((_, new)) = placements.next_if(|(gap, _)| *gap <= index) {
                self.ids.insert(new.id.clone());
                merged.push_back(new);
            }
            merged.push_back(message);
        }
        for (_, new) in placements {
            self.ids.insert(new.id.clone());
            merged.push_back(new);
        }

        self.messages = merged;
    }

    /// Remove every message.
    pub fn clear(&mut self) {
        self.messages.clear();
        self.ids.clear();
    }

    /// Whether a message with `id` is retained.
    pub fn contains(&self, id: &MessageId) -> bool {
        self.ids.contains(id)
    }

    /// Number of retained messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Retention cap.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Retained messages, oldest first.
    pub fn iter(&self) -> vec_deque::Iter<'_, Message> {
        self.messages.iter()
    }

    /// Retained messages as a double-ended queue.
    pub fn messages(&self) -> &VecDeque<Message> {
        &self.messages
    }

    /// Newest retained message. `None` if empty.
    pub fn last(&self) -> Option<&Message> {
        self.messages.back()
    }

    /// Retained message ids, oldest first.
    pub fn ids(&self) -> Vec<&MessageId> {
        self.messages.iter().map(|m| &m.id).collect()
    }

    /// Presentation projection: each message with its ownership flag and
    /// author label.
    pub fn view<'a>(
        &'a self,
        local: &'a ParticipantId,
        fallback_name: &'a str,
    ) -> impl Iterator<Item = MessageView<'a>> + 'a {
        self.messages.iter().map(move |message| MessageView {
            message,
            mine: &message.sender_id == local,
            author: message.display_name(fallback_name),
        })
    }

    fn evict_overflow(&mut self) {
        while self.messages.len() > self.capacity {
            if let Some(evicted) = self.messages.pop_front() {
                self.ids.remove(&evicted.id);
            }
        }
    }
}

impl<'a> IntoIterator for &'a MessageStore {
    type Item = &'a Message;
    type IntoIter = vec_deque::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
