//! Room-scoped message synchronization.
//!
//! Pure, single-threaded state machines that keep a bounded, ordered,
//! deduplicated view of one room's chat stream consistent across initial
//! load, reconnect and live updates.
//!
//! # Components
//!
//! - [`MessageStore`]: ordered, bounded, deduplicated messages
//! - [`ComposeBuffer`]: outgoing draft text and quick-insert tokens
//! - [`ConnectionChannel`]: contract of the external event channel
//! - [`SyncEngine`]: history reconciliation, live ingest and submit
//!
//! The engine consumes [`SyncEvent`]s and produces [`SyncAction`]s, emitting
//! outbound events through the injected channel. It performs no I/O of its
//! own.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod channel;
mod compose;
mod config;
mod engine;
mod event;
mod state;
mod store;

pub use channel::{ChannelError, ConnectionChannel};
pub use compose::{ComposeBuffer, QUICK_TOKENS};
pub use config::{ConfigError, DEFAULT_FALLBACK_NAME, SyncConfig};
pub use engine::{Identity, SyncEngine};
pub use event::{SyncAction, SyncEvent};
pub use roomsync_proto as proto;
pub use state::SyncState;
pub use store::{DEFAULT_RETENTION, MergeOutcome, MessageStore, MessageView};
