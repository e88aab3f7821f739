//! Invariant checking for deterministic simulation testing.
//!
//! Invariants are properties that must hold after every step of a run, no
//! matter how deliveries are interleaved. State is extracted from each engine
//! into a [`SystemSnapshot`] and every registered [`Invariant`] is checked
//! against it.
//!
//! # Usage
//!
//! ```ignore
//! let registry = InvariantRegistry::standard();
//! registry.assert_all(&world.snapshot(), "after step 3");
//! ```

mod checks;
mod snapshot;

use std::fmt;

pub use checks::{RetentionBound, RoomIsolation, SyncedImpliesRoom, TimelineConvergence, UniqueIds};
pub use snapshot::{EngineSnapshot, SystemSnapshot};

/// Invariant check result.
pub type InvariantResult = Result<(), Violation>;

/// Identifies an invariant in violation reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvariantKind {
    /// No message id appears twice in a store.
    UniqueIds,
    /// A store never holds more messages than its capacity.
    RetentionBound,
    /// Every stored message belongs to the active room.
    RoomIsolation,
    /// Synced engines are connected and have a room.
    SyncedImpliesRoom,
    /// Settled engines hold the server's log for their room.
    TimelineConvergence,
}

impl InvariantKind {
    /// Name used in reports.
    pub fn name(self) -> &'static str {
        match self {
            Self::UniqueIds => "unique_ids",
            Self::RetentionBound => "retention_bound",
            Self::RoomIsolation => "room_isolation",
            Self::SyncedImpliesRoom => "synced_implies_room",
            Self::TimelineConvergence => "timeline_convergence",
        }
    }
}

impl fmt::Display for InvariantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Invariant violation with context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Violated invariant.
    pub invariant: InvariantKind,
    /// Description of what went wrong.
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.invariant, self.message)
    }
}

impl std::error::Error for Violation {}

/// An invariant that can be checked against system state.
pub trait Invariant: Send + Sync {
    /// Which invariant this is.
    fn kind(&self) -> InvariantKind;

    /// Check the invariant against a snapshot.
    fn check(&self, state: &SystemSnapshot) -> InvariantResult;
}

/// Registry of invariants to check.
pub struct InvariantRegistry {
    invariants: Vec<Box<dyn Invariant>>,
}

impl Default for InvariantRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl InvariantRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self { invariants: Vec::new() }
    }

    /// Registry with the safety invariants that hold after every step.
    ///
    /// Includes:
    /// - [`UniqueIds`]
    /// - [`RetentionBound`]
    /// - [`RoomIsolation`]
    /// - [`SyncedImpliesRoom`]
    ///
    /// [`TimelineConvergence`] only holds once a run has settled and must be
    /// added explicitly.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.add(UniqueIds);
        registry.add(RetentionBound);
        registry.add(RoomIsolation);
        registry.add(SyncedImpliesRoom);
        registry
    }

    /// Add an invariant to the registry.
    pub fn add<I: Invariant + 'static>(&mut self, invariant: I) {
        self.invariants.push(Box::new(invariant));
    }

    /// Check all invariants, collecting every violation.
    pub fn check_all(&self, state: &SystemSnapshot) -> Result<(), Vec<Violation>> {
        let violations: Vec<_> =
            self.invariants.iter().filter_map(|inv| inv.check(state).err()).collect();

        if violations.is_empty() { Ok(()) } else { Err(violations) }
    }

    /// Check all invariants, panicking with every violation found.
    #[allow(clippy::panic, reason = "test assertion helper")]
    pub fn assert_all(&self, state: &SystemSnapshot, context: &str) {
        if let Err(violations) = self.check_all(state) {
            let messages: Vec<_> = violations.iter().map(ToString::to_string).collect();
            panic!("Invariant violation {context}:\n  {}", messages.join("\n  "));
        }
    }

    /// Number of registered invariants.
    pub fn len(&self) -> usize {
        self.invariants.len()
    }

    /// Check if registry is empty.
    pub fn is_empty(&self) -> bool {
        self.invariants.is_empty()
    }
}
