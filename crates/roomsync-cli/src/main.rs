//! roomsync demo client.
//!
//! # Usage
//!
//! ```bash
//! roomsync --user u1 --name Ada --room lobby
//! RUST_LOG=roomsync_core=debug roomsync
//! ```
//!
//! Type text to send it; `/emoji <n>`, `/room <id>`, `/leave`, `/drop`,
//! `/reconnect` and `/quit` control the session.

use clap::Parser;
use roomsync_cli::{Runtime, RuntimeConfig};
use roomsync_core::{DEFAULT_RETENTION, Identity, SyncConfig, proto::RoomId};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// roomsync demo client
#[derive(Parser, Debug)]
#[command(name = "roomsync")]
#[command(about = "Room-scoped chat synchronization demo over an in-process server")]
#[command(version)]
struct Args {
    /// Participant id sent with every message
    #[arg(short, long, default_value = "local")]
    user: String,

    /// Display name sent with every message
    #[arg(short, long)]
    name: Option<String>,

    /// Room to join on startup
    #[arg(short, long, default_value = "lobby")]
    room: String,

    /// Maximum number of retained messages
    #[arg(long, default_value_t = DEFAULT_RETENTION)]
    retention: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let config = RuntimeConfig {
        identity: Identity::new(args.user, args.name),
        room: Some(RoomId::new(args.room)),
        sync: SyncConfig { retention: args.retention, ..SyncConfig::default() },
    };

    tracing::info!(user = %config.identity.id, "roomsync starting");

    let runtime = Runtime::new(config)?;
    runtime.run().await?;

    Ok(())
}
