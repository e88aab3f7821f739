//! End-to-end synchronization scenarios.
//!
//! Each test drives a real [`SyncEngine`] over a [`SimChannel`] and checks
//! the observable timeline, emitted events and state after a specific
//! interleaving of history responses, live pushes and connectivity changes.

use roomsync_core::{Identity, SyncAction, SyncConfig, SyncEngine, SyncEvent, SyncState};
use roomsync_harness::{
    EngineSnapshot, InvariantRegistry, ServerAction, SimChannel, SimServer, SystemSnapshot,
};
use roomsync_proto::{
    EventKind, HistoryResponse, InboundEvent, Message, MessageId, OutboundEvent, ParticipantId,
    RoomId, SendMessage,
};

fn msg(id: &str, room: &str, created_at: u64) -> Message {
    Message {
        id: MessageId::new(id),
        room_id: RoomId::new(room),
        sender_id: ParticipantId::new("peer"),
        sender_name: Some("Peer".into()),
        text: format!("text {id}"),
        created_at,
    }
}

fn history(room: &str, messages: Vec<Message>) -> SyncEvent {
    InboundEvent::HistoryResponse(HistoryResponse { room_id: RoomId::new(room), messages }).into()
}

fn live(message: Message) -> SyncEvent {
    InboundEvent::LiveMessage(message).into()
}

fn ids(engine: &SyncEngine<SimChannel>) -> Vec<&str> {
    engine.store().iter().map(|m| m.id.as_str()).collect()
}

fn engine_in(room: &str, channel: &SimChannel) -> SyncEngine<SimChannel> {
    let mut engine = SyncEngine::new(SyncConfig::default(), Identity::new("me", Some("Me".into())));
    engine.set_room(Some(RoomId::new(room)));
    engine.attach(channel.clone());
    engine
}

fn check(engine: &SyncEngine<SimChannel>, context: &str) {
    let snapshot = SystemSnapshot::single(EngineSnapshot::from_engine(0, engine));
    InvariantRegistry::standard().assert_all(&snapshot, context);
}

#[test]
fn snapshot_live_and_repull_converge() {
    let channel = SimChannel::connected();
    let mut engine = engine_in("r1", &channel);

    engine.handle(history("r1", vec![msg("1", "r1", 10), msg("2", "r1", 20)]));
    assert_eq!(engine.state(), SyncState::ConnectedSynced);
    assert_eq!(ids(&engine), ["1", "2"]);

    engine.handle(live(msg("3", "r1", 30)));
    assert_eq!(ids(&engine), ["1", "2", "3"]);

    // Reconnect pulls a newer, overlapping window.
    channel.set_connected(false);
    engine.handle(SyncEvent::ConnectivityChanged);
    channel.set_connected(true);
    engine.handle(SyncEvent::ConnectivityChanged);
    engine.handle(history("r1", vec![msg("2", "r1", 20), msg("3", "r1", 30), msg("4", "r1", 40)]));

    assert_eq!(ids(&engine), ["1", "2", "3", "4"]);
    assert_eq!(engine.state(), SyncState::ConnectedSynced);
    check(&engine, "after re-pull");
}

#[test]
fn live_before_snapshot_matches_snapshot_before_live() {
    let snapshot = vec![msg("1", "r1", 10), msg("2", "r1", 20), msg("3", "r1", 30)];

    let early = SimChannel::connected();
    let mut live_first = engine_in("r1", &early);
    live_first.handle(live(msg("3", "r1", 30)));
    live_first.handle(live(msg("4", "r1", 40)));
    live_first.handle(history("r1", snapshot.clone()));

    let late = SimChannel::connected();
    let mut history_first = engine_in("r1", &late);
    history_first.handle(history("r1", snapshot));
    history_first.handle(live(msg("3", "r1", 30)));
    history_first.handle(live(msg("4", "r1", 40)));

    assert_eq!(ids(&live_first), ["1", "2", "3", "4"]);
    assert_eq!(ids(&live_first), ids(&history_first));
}

#[test]
fn duplicate_snapshot_leaves_store_unchanged() {
    let channel = SimChannel::connected();
    let mut engine = engine_in("r1", &channel);
    let snapshot = vec![msg("1", "r1", 10), msg("2", "r1", 20)];

    engine.handle(history("r1", snapshot.clone()));
    let actions = engine.handle(history("r1", snapshot));

    assert!(actions.is_empty());
    assert_eq!(ids(&engine), ["1", "2"]);
}

#[test]
fn quick_insert_then_submit_while_disconnected_keeps_draft() {
    let channel = SimChannel::connected();
    let mut engine = engine_in("r1", &channel);
    engine.set_draft("go ");
    engine.append_quick(4);
    assert_eq!(engine.draft(), "go 🚀");

    channel.set_connected(false);
    engine.handle(SyncEvent::ConnectivityChanged);

    assert!(!engine.submit());
    assert_eq!(engine.draft(), "go 🚀");
    assert_eq!(channel.emitted_count(EventKind::SendMessage), 0);

    channel.set_connected(true);
    engine.handle(SyncEvent::ConnectivityChanged);
    assert!(engine.submit());
    assert_eq!(engine.draft(), "");
    assert_eq!(
        channel.emitted().last(),
        Some(&OutboundEvent::SendMessage(SendMessage {
            room_id: RoomId::new("r1"),
            sender_id: ParticipantId::new("me"),
            sender_name: Some("Me".into()),
            text: "go 🚀".into(),
        }))
    );
}

#[test]
fn reconnect_issues_exactly_one_new_request() {
    let channel = SimChannel::connected();
    let mut engine = engine_in("r1", &channel);
    engine.handle(history("r1", vec![msg("1", "r1", 10)]));
    assert_eq!(channel.emitted_count(EventKind::HistoryRequest), 1);

    // Re-confirming a synced connection is a no-op.
    engine.handle(SyncEvent::ConnectivityChanged);
    assert_eq!(channel.emitted_count(EventKind::HistoryRequest), 1);

    channel.set_connected(false);
    engine.handle(SyncEvent::ConnectivityChanged);
    assert_eq!(engine.state(), SyncState::Disconnected);
    assert_eq!(engine.pending_request(), None);

    channel.set_connected(true);
    let actions = engine.handle(SyncEvent::ConnectivityChanged);

    assert_eq!(actions, [SyncAction::Render]);
    assert_eq!(channel.emitted_count(EventKind::HistoryRequest), 2);
    assert_eq!(engine.state(), SyncState::ConnectedUnsynced);
    assert_eq!(ids(&engine), ["1"]);
}

#[test]
fn rooms_stay_isolated() {
    let channel = SimChannel::connected();
    let mut engine = engine_in("r1", &channel);

    engine.handle(history("r1", vec![msg("1", "r1", 10)]));
    engine.handle(live(msg("x", "r2", 15)));
    engine.handle(history("r2", vec![msg("y", "r2", 5)]));

    assert_eq!(ids(&engine), ["1"]);
    check(&engine, "after foreign deliveries");
}

#[test]
fn late_response_after_room_switch_is_discarded() {
    let channel = SimChannel::connected();
    let mut engine = engine_in("r1", &channel);

    engine.set_room(Some(RoomId::new("r2")));
    assert_eq!(engine.pending_request(), Some(&RoomId::new("r2")));

    // The r1 response requested before the switch arrives late.
    let actions = engine.handle(history("r1", vec![msg("1", "r1", 10)]));
    assert!(actions.is_empty());
    assert!(engine.store().is_empty());
    assert_eq!(engine.state(), SyncState::ConnectedUnsynced);

    engine.handle(history("r2", vec![msg("2", "r2", 20)]));
    assert_eq!(ids(&engine), ["2"]);
    assert_eq!(engine.state(), SyncState::ConnectedSynced);
}

#[test]
fn leaving_room_unsubscribes() {
    let channel = SimChannel::connected();
    let mut engine = engine_in("r1", &channel);
    assert!(channel.is_subscribed(EventKind::LiveMessage));

    engine.set_room(None);

    assert!(!channel.is_subscribed(EventKind::LiveMessage));
    assert!(!channel.is_subscribed(EventKind::HistoryResponse));
    assert!(engine.store().is_empty());
    assert_eq!(engine.state(), SyncState::ConnectedUnsynced);
}

#[test]
fn dropping_engine_unsubscribes() {
    let channel = SimChannel::connected();
    let engine = engine_in("r1", &channel);
    assert!(channel.is_subscribed(EventKind::HistoryResponse));

    drop(engine);

    assert!(!channel.is_subscribed(EventKind::HistoryResponse));
}

#[test]
fn own_message_round_trips_through_server() {
    let channel = SimChannel::connected();
    let mut engine = engine_in("r1", &channel);
    let mut server = SimServer::default();
    server.seed(&RoomId::new("r1"), "peer", "earlier");

    engine.set_draft("hello");
    assert!(engine.submit());

    for event in channel.take_outgoing() {
        for action in server.handle(event) {
            let (ServerAction::Reply(event) | ServerAction::Broadcast { event, .. }) = action;
            engine.handle(event.into());
        }
    }

    let rows: Vec<_> = engine.view().map(|v| (v.author, v.mine, v.message.text.as_str())).collect();
    assert_eq!(rows, [("Guest", false, "earlier"), ("Me", true, "hello")]);
}
