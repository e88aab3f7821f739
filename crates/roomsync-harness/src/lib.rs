//! Deterministic simulation harness for roomsync.
//!
//! In-memory implementations of the external collaborators (the connection
//! channel and the history source) so the synchronization engine can be
//! driven through arbitrary delivery interleavings without a network.
//!
//! # Invariant Testing
//!
//! The `invariants` module checks behavioral properties against snapshots
//! of engine state after every step. Use [`InvariantRegistry::standard()`]
//! for the safety invariants that must hold at all times.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod invariants;
pub mod sim_channel;
pub mod sim_server;
pub mod world;

pub use invariants::{
    EngineSnapshot, Invariant, InvariantKind, InvariantRegistry, InvariantResult, RetentionBound,
    RoomIsolation, SyncedImpliesRoom, SystemSnapshot, TimelineConvergence, UniqueIds, Violation,
};
pub use sim_channel::SimChannel;
pub use sim_server::{ServerAction, SimServer};
pub use world::{ClientId, ModelRoomId, Operation, SimClient, SimWorld, SmallText};
