//! Fuzz target for multi-client synchronization.
//!
//! Drives a `SimWorld` with arbitrary operation sequences and checks the
//! safety invariants after every step. Once the world settles, clients whose
//! room log never exceeded retention must hold exactly the server's log.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use roomsync_core::SyncConfig;
use roomsync_harness::{InvariantRegistry, Operation, SimWorld, TimelineConvergence};

const MAX_OPS: usize = 256;

#[derive(Debug, Arbitrary)]
struct Input {
    clients: u8,
    ops: Vec<Operation>,
}

fuzz_target!(|input: Input| {
    let config = SyncConfig { retention: MAX_OPS + 1, ..SyncConfig::default() };
    let mut world = SimWorld::new(usize::from(input.clients % 4) + 1, &config);
    let registry = InvariantRegistry::standard();

    for (step, op) in input.ops.iter().take(MAX_OPS).enumerate() {
        world.apply(op);
        registry.assert_all(&world.snapshot(), &format!("at step {step} ({op:?})"));
    }

    world.settle();

    let mut settled = InvariantRegistry::standard();
    settled.add(TimelineConvergence);
    settled.assert_all(&world.snapshot(), "after settle");
});
