//! Line-oriented demo client for roomsync.
//!
//! Drives a [`roomsync_core::SyncEngine`] from stdin against an in-process
//! history server. Every wire event crosses the link CBOR-encoded, so the
//! binary exercises the same codec a networked deployment would.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod command;
pub mod link;
pub mod runtime;
pub mod server;

pub use command::{Command, CommandError};
pub use link::{LinkChannel, WireEvent};
pub use runtime::{Runtime, RuntimeConfig, RuntimeError};
pub use server::{ServerHandle, spawn_server};
