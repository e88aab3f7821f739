//! Async runtime.
//!
//! Event loop that reads commands from stdin and events from the in-process
//! server concurrently with `tokio::select!`, feeds both into the
//! [`SyncEngine`], and reports the timeline through `tracing` whenever the
//! engine asks for a render.

use std::io;

use roomsync_core::{
    ConfigError, ConnectionChannel, Identity, SyncAction, SyncConfig, SyncEngine, SyncEvent,
    proto::{InboundEvent, RoomId},
};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::{
    Command, LinkChannel, WireEvent,
    server::{self, ServerHandle},
};

/// Runtime errors.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// I/O error reading stdin.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Invalid engine configuration.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Startup configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Local participant.
    pub identity: Identity,
    /// Room joined on startup.
    pub room: Option<RoomId>,
    /// Engine tunables.
    pub sync: SyncConfig,
}

/// Async runtime for the demo client.
pub struct Runtime {
    engine: SyncEngine<LinkChannel>,
    server: ServerHandle,
    /// The draft holds a typed line that could not be sent.
    held_line: bool,
}

impl Runtime {
    /// Validate the configuration, spawn the in-process server and attach
    /// the engine to it. Must be called from within a tokio runtime.
    pub fn new(config: RuntimeConfig) -> Result<Self, RuntimeError> {
        config.sync.validate()?;

        let server = server::spawn_server(config.sync.retention);
        let mut engine = SyncEngine::new(config.sync, config.identity);
        engine.set_room(config.room);
        engine.attach(LinkChannel::new(server.to_server.clone()));

        Ok(Self { engine, server, held_line: false })
    }

    /// Run until `/quit` or end of input.
    pub async fn run(mut self) -> Result<(), RuntimeError> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        self.render();

        loop {
            let should_quit = tokio::select! {
                line = lines.next_line() => match line? {
                    Some(line) => self.handle_line(&line),
                    None => true,
                },

                Some(wire) = self.server.from_server.recv() => {
                    self.handle_wire(&wire);
                    false
                }

                else => true,
            };

            if should_quit {
                break;
            }
        }

        self.server.stop();
        Ok(())
    }

    /// Engine driven by this runtime.
    pub fn engine(&self) -> &SyncEngine<LinkChannel> {
        &self.engine
    }

    /// Apply one line of input. Returns true if the runtime should quit.
    pub fn handle_line(&mut self, line: &str) -> bool {
        let command = match Command::parse(line) {
            Ok(Some(command)) => command,
            Ok(None) => return false,
            Err(e) => {
                tracing::warn!(error = %e, "ignoring input");
                return false;
            },
        };

        let actions = match command {
            Command::Say(text) => {
                let mut actions = Vec::new();
                if self.held_line && !self.engine.draft().is_empty() {
                    actions.extend(self.engine.append_token(" "));
                }
                actions.extend(self.engine.append_token(&text));
                self.held_line = !self.engine.submit();
                if self.held_line {
                    tracing::warn!(state = %self.engine.state(), "message not sent, kept as draft");
                }
                actions
            },
            Command::Emoji(index) => self.engine.append_quick(index),
            Command::Room(room) => self.engine.set_room(Some(room)),
            Command::Leave => self.engine.set_room(None),
            Command::Drop => self.set_link(false),
            Command::Reconnect => self.set_link(true),
            Command::Quit => return true,
        };

        self.process_actions(actions);
        false
    }

    /// Deliver one event from the server.
    ///
    /// Events arriving while the link is down are lost, as they would be on
    /// a dropped connection. Events the engine is not subscribed to are
    /// ignored.
    pub fn handle_wire(&mut self, wire: &WireEvent) {
        let Some(channel) = self.engine.channel() else {
            return;
        };
        if !channel.is_connected() {
            tracing::debug!(event = wire.name, "link down, dropping event");
            return;
        }

        let event = match InboundEvent::decode_named(wire.name, &wire.body) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(event = wire.name, error = %e, "dropping undecodable event");
                return;
            },
        };
        if !channel.is_subscribed(event.kind()) {
            tracing::trace!(event = wire.name, "not subscribed, ignoring");
            return;
        }

        let actions = self.engine.handle(SyncEvent::Inbound(event));
        self.process_actions(actions);
    }

    fn set_link(&mut self, connected: bool) -> Vec<SyncAction> {
        if let Some(channel) = self.engine.channel_mut() {
            channel.set_connected(connected);
        }
        tracing::info!(connected, "link toggled");
        self.engine.handle(SyncEvent::ConnectivityChanged)
    }

    fn process_actions(&mut self, actions: Vec<SyncAction>) {
        let mut render = false;
        for action in actions {
            match action {
                SyncAction::Render => render = true,
                SyncAction::Synced { room_id } => {
                    let messages = self.engine.store().len();
                    tracing::info!(room = %room_id, messages, "history synced");
                },
            }
        }
        if render {
            self.render();
        }
    }

    fn render(&self) {
        let room = self.engine.room().map_or("-", RoomId::as_str);
        tracing::info!(
            room,
            state = %self.engine.state(),
            messages = self.engine.store().len(),
            draft = self.engine.draft(),
            "timeline"
        );
        for row in self.engine.view() {
            tracing::info!(
                at = row.message.created_at,
                author = row.author,
                mine = row.mine,
                "  {}",
                row.message.text
            );
        }
    }
}
