//! Fuzz target for inbound and outbound event decoding.
//!
//! Feeds arbitrary bytes under every event name and direction:
//! - Malformed CBOR
//! - Payloads of the wrong shape for the event
//! - Oversized strings or collections
//!
//! Decoding must NEVER panic. Invalid input returns an error.

#![no_main]

use libfuzzer_sys::fuzz_target;
use roomsync_proto::{Direction, EventKind, InboundEvent, OutboundEvent};

fuzz_target!(|data: &[u8]| {
    for kind in EventKind::ALL {
        let _ = InboundEvent::decode(kind, data);
        let _ = OutboundEvent::decode(kind, data);
    }

    for direction in [Direction::Inbound, Direction::Outbound] {
        if let Ok(name) = std::str::from_utf8(data) {
            let _ = EventKind::from_name(name, direction);
        }
    }
});
