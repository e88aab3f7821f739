//! Synchronization engine.
//!
//! [`SyncEngine`] owns the [`MessageStore`] and [`ComposeBuffer`] of exactly
//! one active room and reconciles the two inbound delivery paths into them:
//!
//! - History: a `chat-history-request` is emitted whenever the engine is
//!   connected and unsynced (connect, reconnect, room change). The matching
//!   `chat-history` response is merged message by message.
//! - Live: `chat-message` pushes for the active room are appended as they
//!   arrive, independent of reconciliation state.
//!
//! Both paths use the store's idempotent merge, so their relative arrival
//! order does not change the final timeline, and duplicate requests or
//! responses are harmless.
//!
//! Nothing here is fatal. Missing channel or room, stale-room deliveries and
//! refused submits all degrade to "no state change".

use roomsync_proto::{
    EventKind, HistoryRequest, HistoryResponse, InboundEvent, Message, OutboundEvent,
    ParticipantId, RoomId, SendMessage,
};

use crate::{
    ComposeBuffer, ConnectionChannel, MessageStore, MessageView, SyncAction, SyncConfig,
    SyncEvent, SyncState,
};

/// Inbound events the engine listens to while a room is assigned.
const SUBSCRIPTIONS: [EventKind; 2] = [EventKind::HistoryResponse, EventKind::LiveMessage];

/// The local participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Stable participant id, sent as `userId`.
    pub id: ParticipantId,
    /// Display name, sent as `userName`.
    pub name: Option<String>,
}

impl Identity {
    /// Create an identity.
    pub fn new(id: impl Into<ParticipantId>, name: Option<String>) -> Self {
        Self { id: id.into(), name }
    }
}

/// Room-scoped synchronization engine.
///
/// Single-threaded and non-blocking: every method reacts to one discrete
/// event and returns immediately. History requests are fire-and-forget; the
/// response arrives later through [`SyncEngine::handle`].
#[derive(Debug)]
pub struct SyncEngine<C: ConnectionChannel> {
    config: SyncConfig,
    identity: Identity,
    channel: Option<C>,
    room: Option<RoomId>,
    state: SyncState,
    /// Room of the last history request still awaiting a response.
    pending_request: Option<RoomId>,
    store: MessageStore,
    draft: ComposeBuffer,
}

impl<C: ConnectionChannel> SyncEngine<C> {
    /// Create a detached engine with no room assigned.
    pub fn new(config: SyncConfig, identity: Identity) -> Self {
        let store = MessageStore::new(config.retention);
        Self {
            config,
            identity,
            channel: None,
            room: None,
            state: SyncState::Disconnected,
            pending_request: None,
            store,
            draft: ComposeBuffer::new(),
        }
    }

    /// Attach the connection channel, replacing any previous one.
    ///
    /// Subscribes if a room is assigned and requests history if the channel
    /// is already connected.
    pub fn attach(&mut self, channel: C) -> Vec<SyncAction> {
        let _ = self.detach();
        self.channel = Some(channel);
        self.subscribe();
        self.refresh_connectivity()
    }

    /// Detach and return the channel.
    ///
    /// Any in-flight history request is abandoned. The store is kept; a
    /// fresh snapshot is merged once a channel is attached again.
    pub fn detach(&mut self) -> Option<C> {
        self.unsubscribe();
        self.pending_request = None;
        if self.state != SyncState::Disconnected {
            tracing::debug!(from = %self.state, "channel detached");
            self.state = SyncState::Disconnected;
        }
        self.channel.take()
    }

    /// Assign the active room. `None` leaves the current room.
    ///
    /// A different room clears the store and draft and restarts
    /// reconciliation from empty. Assigning the current room again is a
    /// no-op.
    pub fn set_room(&mut self, room: Option<RoomId>) -> Vec<SyncAction> {
        if self.room == room {
            return vec![];
        }

        tracing::debug!(
            from = ?self.room.as_ref().map(RoomId::as_str),
            to = ?room.as_ref().map(RoomId::as_str),
            "switching room"
        );

        self.unsubscribe();
        self.store.clear();
        self.draft.clear();
        self.pending_request = None;
        self.room = room;
        self.subscribe();

        if self.state.is_connected() {
            self.state = SyncState::ConnectedUnsynced;
            self.request_history();
        }

        vec![SyncAction::Render]
    }

    /// Process a channel event and return actions for the runtime.
    pub fn handle(&mut self, event: SyncEvent) -> Vec<SyncAction> {
        match event {
            SyncEvent::ConnectivityChanged => self.refresh_connectivity(),
            SyncEvent::Inbound(InboundEvent::HistoryResponse(response)) => {
                self.apply_history(response)
            },
            SyncEvent::Inbound(InboundEvent::LiveMessage(message)) => self.ingest_live(message),
        }
    }

    /// Concatenate `token` onto the draft.
    pub fn append_token(&mut self, token: &str) -> Vec<SyncAction> {
        self.draft.append_token(token);
        vec![SyncAction::Render]
    }

    /// Append the quick-insert symbol at `index`. Out of range is a no-op.
    pub fn append_quick(&mut self, index: usize) -> Vec<SyncAction> {
        if self.draft.append_quick(index) { vec![SyncAction::Render] } else { vec![] }
    }

    /// Replace the draft with raw input.
    pub fn set_draft(&mut self, text: impl Into<String>) -> Vec<SyncAction> {
        self.draft.set_text(text);
        vec![SyncAction::Render]
    }

    /// Whether [`SyncEngine::submit`] would currently emit.
    pub fn can_submit(&self) -> bool {
        !self.draft.is_blank()
            && self.room.is_some()
            && self.state.is_connected()
            && self.channel.as_ref().is_some_and(ConnectionChannel::is_connected)
    }

    /// Send the trimmed draft to the active room.
    ///
    /// Silently refused (returns `false`, draft untouched) when the draft is
    /// blank, no room is assigned, or the channel is absent or disconnected.
    /// On success the draft is cleared. The sent message is not inserted
    /// locally; it arrives back as a live push.
    pub fn submit(&mut self) -> bool {
        if !self.can_submit() {
            return false;
        }
        let (Some(text), Some(room_id), Some(channel)) =
            (self.draft.prepare(), self.room.clone(), self.channel.as_mut())
        else {
            return false;
        };

        let event = OutboundEvent::SendMessage(SendMessage {
            room_id,
            sender_id: self.identity.id.clone(),
            sender_name: self.identity.name.clone(),
            text,
        });

        match channel.emit(event) {
            Ok(()) => {
                self.draft.clear();
                true
            },
            Err(e) => {
                tracing::warn!(error = %e, "failed to send message, keeping draft");
                false
            },
        }
    }

    /// Current state.
    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Active room. `None` if unassigned.
    pub fn room(&self) -> Option<&RoomId> {
        self.room.as_ref()
    }

    /// Room of the in-flight history request. `None` if none is pending.
    pub fn pending_request(&self) -> Option<&RoomId> {
        self.pending_request.as_ref()
    }

    /// Message store of the active room.
    pub fn store(&self) -> &MessageStore {
        &self.store
    }

    /// Presentation projection of the store.
    pub fn view(&self) -> impl Iterator<Item = MessageView<'_>> + '_ {
        self.store.view(&self.identity.id, &self.config.fallback_sender_name)
    }

    /// Current draft text.
    pub fn draft(&self) -> &str {
        self.draft.text()
    }

    /// Local participant.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Engine configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Attached channel. `None` if detached.
    pub fn channel(&self) -> Option<&C> {
        self.channel.as_ref()
    }

    /// Mutable access to the attached channel.
    pub fn channel_mut(&mut self) -> Option<&mut C> {
        self.channel.as_mut()
    }

    /// Re-read the connectivity flag and apply the resulting transition.
    ///
    /// Level-triggered: every confirmation while connected and unsynced
    /// issues a history request, so a request lost to a disconnect is
    /// re-issued by the next confirmation.
    fn refresh_connectivity(&mut self) -> Vec<SyncAction> {
        let connected = self.channel.as_ref().is_some_and(ConnectionChannel::is_connected);
        let previous = self.state;

        match (connected, previous) {
            (false, SyncState::Disconnected) | (true, SyncState::ConnectedSynced) => vec![],
            (false, _) => {
                tracing::debug!(from = %previous, "channel disconnected");
                self.state = SyncState::Disconnected;
                self.pending_request = None;
                vec![SyncAction::Render]
            },
            (true, _) => {
                self.state = SyncState::ConnectedUnsynced;
                self.request_history();
                if previous == SyncState::Disconnected {
                    tracing::debug!("channel connected");
                    vec![SyncAction::Render]
                } else {
                    vec![]
                }
            },
        }
    }

    fn request_history(&mut self) {
        let (Some(channel), Some(room_id)) = (self.channel.as_mut(), self.room.clone()) else {
            return;
        };

        tracing::debug!(room = %room_id, "requesting history");
        match channel.emit(OutboundEvent::HistoryRequest(HistoryRequest { room_id: room_id.clone() }))
        {
            Ok(()) => self.pending_request = Some(room_id),
            Err(e) => {
                tracing::warn!(room = %room_id, error = %e, "history request failed");
                self.pending_request = None;
            },
        }
    }

    fn apply_history(&mut self, response: HistoryResponse) -> Vec<SyncAction> {
        let HistoryResponse { room_id, messages } = response;

        if self.room.as_ref() != Some(&room_id) {
            tracing::debug!(room = %room_id, "discarding history for inactive room");
            return vec![];
        }
        if !self.state.is_connected() {
            tracing::debug!(room = %room_id, "discarding history received while disconnected");
            return vec![];
        }

        let total = messages.len();
        let outcome =
            self.store.merge_snapshot(messages.into_iter().filter(|m| m.room_id == room_id));
        tracing::debug!(
            room = %room_id,
            total,
            inserted = outcome.inserted,
            duplicates = outcome.duplicates,
            skipped = outcome.skipped,
            "merged history"
        );

        self.pending_request = None;
        let newly_synced = self.state != SyncState::ConnectedSynced;
        self.state = SyncState::ConnectedSynced;

        let mut actions = Vec::new();
        if outcome.changed() || newly_synced {
            actions.push(SyncAction::Render);
        }
        if newly_synced {
            actions.push(SyncAction::Synced { room_id });
        }
        actions
    }

    fn ingest_live(&mut self, message: Message) -> Vec<SyncAction> {
        if self.room.as_ref() != Some(&message.room_id) {
            tracing::trace!(room = %message.room_id, id = %message.id, "discarding stale live message");
            return vec![];
        }

        tracing::trace!(id = %message.id, "live message");
        if self.store.insert_one(message) { vec![SyncAction::Render] } else { vec![] }
    }

    fn subscribe(&mut self) {
        if let (Some(channel), Some(_)) = (self.channel.as_mut(), self.room.as_ref()) {
            for kind in SUBSCRIPTIONS {
                channel.subscribe(kind);
            }
        }
    }

    fn unsubscribe(&mut self) {
        if let (Some(channel), Some(_)) = (self.channel.as_mut(), self.room.as_ref()) {
            for kind in SUBSCRIPTIONS {
                channel.unsubscribe(kind);
            }
        }
    }
}

impl<C: ConnectionChannel> Drop for SyncEngine<C> {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

#[cfg(test)]
mod tests {
    use roomsync_proto::MessageId;

    use super::*;
    use crate::ChannelError;

    #[derive(Debug, Default)]
    struct RecordingChannel {
        connected: bool,
        subscriptions: Vec<EventKind>,
        emitted: Vec<OutboundEvent>,
    }

    impl ConnectionChannel for RecordingChannel {
        fn is_connected(&self) -> bool {
            self.connected
        }

        fn subscribe(&mut self, kind: EventKind) {
            self.subscriptions.push(kind);
        }

        fn unsubscribe(&mut self, kind: EventKind) {
            self.subscriptions.retain(|k| *k != kind);
        }

        fn emit(&mut self, event: OutboundEvent) -> Result<(), ChannelError> {
            if !self.connected {
                return Err(ChannelError::NotConnected);
            }
            self.emitted.push(event);
            Ok(())
        }
    }

    fn engine() -> SyncEngine<RecordingChannel> {
        SyncEngine::new(SyncConfig::default(), Identity::new("me", Some("Me".into())))
    }

    fn connected_engine(room: &str) -> SyncEngine<RecordingChannel> {
        let mut engine = engine();
        engine.set_room(Some(RoomId::new(room)));
        engine.attach(RecordingChannel { connected: true, ..Default::default() });
        engine
    }

    fn msg(id: u32, room: &str) -> Message {
        Message {
            id: MessageId::new(id.to_string()),
            room_id: RoomId::new(room),
            sender_id: ParticipantId::new("other"),
            sender_name: None,
            text: format!("m{id}"),
            created_at: u64::from(id),
        }
    }

    fn history(room: &str, ids: &[u32]) -> SyncEvent {
        SyncEvent::Inbound(InboundEvent::HistoryResponse(HistoryResponse {
            room_id: RoomId::new(room),
            messages: ids.iter().map(|id| msg(*id, room)).collect(),
        }))
    }

    fn emitted(engine: &SyncEngine<RecordingChannel>) -> &[OutboundEvent] {
        engine.channel().map_or(&[][..], |c| c.emitted.as_slice())
    }

    #[test]
    fn attach_connected_requests_history() {
        let engine = connected_engine("r1");

        assert_eq!(engine.state(), SyncState::ConnectedUnsynced);
        assert_eq!(emitted(&engine), [OutboundEvent::HistoryRequest(HistoryRequest {
            room_id: RoomId::new("r1")
        })]);
        assert_eq!(engine.pending_request(), Some(&RoomId::new("r1")));
    }

    #[test]
    fn subscribes_only_with_room() {
        let mut engine = engine();
        engine.attach(RecordingChannel::default());
        assert!(engine.channel().is_some_and(|c| c.subscriptions.is_empty()));

        engine.set_room(Some(RoomId::new("r1")));
        assert!(engine.channel().is_some_and(|c| c.subscriptions.len() == 2));

        engine.set_room(None);
        assert!(engine.channel().is_some_and(|c| c.subscriptions.is_empty()));
    }

    #[test]
    fn history_marks_synced() {
        let mut engine = connected_engine("r1");
        let actions = engine.handle(history("r1", &[1, 2]));

        assert_eq!(engine.state(), SyncState::ConnectedSynced);
        assert_eq!(actions, [SyncAction::Render, SyncAction::Synced {
            room_id: RoomId::new("r1")
        }]);
        assert_eq!(engine.pending_request(), None);
    }

    #[test]
    fn stale_history_discarded() {
        let mut engine = connected_engine("r1");
        let actions = engine.handle(history("r0", &[1, 2]));

        assert!(actions.is_empty());
        assert!(engine.store().is_empty());
        assert_eq!(engine.state(), SyncState::ConnectedUnsynced);
    }

    #[test]
    fn history_while_disconnected_discarded() {
        let mut engine = engine();
        engine.set_room(Some(RoomId::new("r1")));

        assert!(engine.handle(history("r1", &[1])).is_empty());
        assert!(engine.store().is_empty());
    }

    #[test]
    fn live_message_for_other_room_discarded() {
        let mut engine = connected_engine("r1");
        let actions = engine.handle(InboundEvent::LiveMessage(msg(9, "r2")).into());

        assert!(actions.is_empty());
        assert!(engine.store().is_empty());
    }

    #[test]
    fn room_switch_clears_store_and_draft() {
        let mut engine = connected_engine("r1");
        engine.handle(history("r1", &[1, 2]));
        engine.set_draft("half typed");

        engine.set_room(Some(RoomId::new("r2")));

        assert!(engine.store().is_empty());
        assert_eq!(engine.draft(), "");
        assert_eq!(engine.state(), SyncState::ConnectedUnsynced);
        assert_eq!(emitted(&engine).last(), Some(&OutboundEvent::HistoryRequest(HistoryRequest {
            room_id: RoomId::new("r2")
        })));
    }

    #[test]
    fn same_room_is_noop() {
        let mut engine = connected_engine("r1");
        engine.handle(history("r1", &[1]));

        assert!(engine.set_room(Some(RoomId::new("r1"))).is_empty());
        assert_eq!(engine.store().len(), 1);
        assert_eq!(emitted(&engine).len(), 1);
    }

    #[test]
    fn submit_emits_and_clears() {
        let mut engine = connected_engine("r1");
        engine.set_draft("  hello  ");

        assert!(engine.submit());
        assert_eq!(engine.draft(), "");
        assert_eq!(emitted(&engine).last(), Some(&OutboundEvent::SendMessage(SendMessage {
            room_id: RoomId::new("r1"),
            sender_id: ParticipantId::new("me"),
            sender_name: Some("Me".into()),
            text: "hello".into(),
        })));
        assert!(engine.store().is_empty());
    }

    #[test]
    fn blank_submit_refused() {
        let mut engine = connected_engine("r1");
        engine.set_draft("   ");

        assert!(!engine.submit());
        assert_eq!(emitted(&engine).len(), 1);
        assert_eq!(engine.draft(), "   ");
    }

    #[test]
    fn submit_without_room_refused() {
        let mut engine = engine();
        engine.attach(RecordingChannel { connected: true, ..Default::default() });
        engine.set_draft("hello");

        assert!(!engine.submit());
        assert!(emitted(&engine).is_empty());
    }

    #[test]
    fn detached_engine_is_inert() {
        let mut engine = engine();
        engine.set_room(Some(RoomId::new("r1")));
        engine.set_draft("hello");

        assert!(!engine.submit());
        assert!(engine.handle(SyncEvent::ConnectivityChanged).is_empty());
        assert_eq!(engine.state(), SyncState::Disconnected);
    }

    #[test]
    fn detach_returns_channel_and_disconnects() {
        let mut engine = connected_engine("r1");
        let channel = engine.detach();

        assert!(channel.is_some_and(|c| c.subscriptions.is_empty()));
        assert_eq!(engine.state(), SyncState::Disconnected);
        assert_eq!(engine.pending_request(), None);
    }

    #[test]
    fn repeated_confirmation_reissues_request() {
        let mut engine = engine();
        engine.set_room(Some(RoomId::new("r1")));
        engine.attach(RecordingChannel::default());

        if let Some(channel) = engine.channel_mut() {
            channel.connected = true;
        }
        engine.handle(SyncEvent::ConnectivityChanged);
        engine.handle(SyncEvent::ConnectivityChanged);

        assert_eq!(engine.state(), SyncState::ConnectedUnsynced);
        assert_eq!(emitted(&engine).len(), 2);
    }

    #[test]
    fn view_uses_fallback_and_ownership() {
        let mut engine = connected_engine("r1");
        let mut own = msg(1, "r1");
        own.sender_id = ParticipantId::new("me");
        engine.handle(InboundEvent::LiveMessage(own).into());
        engine.handle(InboundEvent::LiveMessage(msg(2, "r1")).into());

        let rows: Vec<_> = engine.view().map(|v| (v.mine, v.author)).collect();
        assert_eq!(rows, [(true, "Guest"), (false, "Guest")]);
    }
}
