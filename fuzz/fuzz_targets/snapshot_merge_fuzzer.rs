//! Fuzz target for MessageStore merging.
//!
//! # Strategy
//!
//! Interleave live inserts and snapshot merges drawn from a small id and
//! timestamp space so duplicates, ties and overlaps are common.
//!
//! # Invariants
//!
//! - No id is stored twice
//! - Length never exceeds capacity
//! - Re-merging the same snapshot changes nothing

#![no_main]

use std::collections::HashSet;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use roomsync_core::MessageStore;
use roomsync_proto::{Message, MessageId, ParticipantId, RoomId};

#[derive(Debug, Clone, Arbitrary)]
struct Scenario {
    capacity: u8,
    steps: Vec<Step>,
}

#[derive(Debug, Clone, Arbitrary)]
enum Step {
    Live(Entry),
    Snapshot(Vec<Entry>),
}

#[derive(Debug, Clone, Copy, Arbitrary)]
struct Entry {
    id: u8,
    created_at: u8,
}

impl Entry {
    fn message(self) -> Message {
        Message {
            id: MessageId::new(format!("m{}", self.id % 32)),
            room_id: RoomId::new("fuzz"),
            sender_id: ParticipantId::new("u"),
            sender_name: None,
            text: String::new(),
            created_at: u64::from(self.created_at % 16),
        }
    }
}

fuzz_target!(|scenario: Scenario| {
    let capacity = usize::from(scenario.capacity % 16) + 1;
    let mut store = MessageStore::new(capacity);

    for step in scenario.steps {
        match step {
            Step::Live(entry) => {
                store.insert_one(entry.message());
            },
            Step::Snapshot(entries) => {
                let snapshot: Vec<_> = entries.into_iter().map(Entry::message).collect();
                store.merge_snapshot(snapshot.clone());
                let before: Vec<_> = store.iter().cloned().collect();
                let again = store.merge_snapshot(snapshot);
                if before.len() == capacity {
                    // A full store may evict and re-admit older snapshot entries.
                    continue;
                }
                assert_eq!(again.inserted, 0, "re-merge inserted messages");
                assert!(store.iter().eq(before.iter()), "re-merge reordered the store");
            },
        }

        let mut seen = HashSet::new();
        assert!(store.iter().all(|m| seen.insert(m.id.clone())), "duplicate id stored");
        assert!(store.len() <= capacity, "capacity exceeded");
    }
});
