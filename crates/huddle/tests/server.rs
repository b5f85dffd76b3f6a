//! Integration tests for the Huddle server, handler, and full connection flow.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use huddle::prelude::*;
use huddle_games::{GameEvent, Party, never_ever};
use huddle_protocol::{RoomSnapshot, RoomState};
use serde_json::{Value, json};
use tokio_tungstenite::tungstenite::Message;

// =========================================================================
// Helpers
// =========================================================================

type ClientWs = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

type Event = ServerEvent<GameEvent>;

/// Starts a server on a random port and returns the address.
async fn start_server() -> String {
    let server = HuddleServerBuilder::new()
        .bind("127.0.0.1:0")
        .room_config(RoomConfig {
            rng_seed: Some(5),
            ..RoomConfig::default()
        })
        .build::<Party>()
        .await
        .expect("server should build");

    let addr = server
        .local_addr()
        .expect("should have local addr")
        .to_string();

    tokio::spawn(async move {
        let _ = server.run().await;
    });

    // Give the accept loop a moment to start.
    tokio::time::sleep(Duration::from_millis(10)).await;
    addr
}

async fn connect(addr: &str) -> ClientWs {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .expect("should connect");
    ws
}

async fn send(ws: &mut ClientWs, frame: Value) {
    ws.send(Message::Text(frame.to_string().into()))
        .await
        .expect("send");
}

/// Receives the next server event, failing after two seconds.
async fn recv(ws: &mut ClientWs) -> Event {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("timed out waiting for an event")
            .expect("stream ended")
            .expect("recv");
        match msg {
            Message::Text(_) | Message::Binary(_) => {
                return serde_json::from_slice(&msg.into_data()).expect("decode");
            }
            _ => continue,
        }
    }
}

/// Skips events until one matches.
async fn recv_until(ws: &mut ClientWs, mut wanted: impl FnMut(&Event) -> bool) -> Event {
    loop {
        let event = recv(ws).await;
        if wanted(&event) {
            return event;
        }
    }
}

async fn recv_error(ws: &mut ClientWs) -> String {
    match recv_until(ws, |e| matches!(e, ServerEvent::Error { .. })).await {
        ServerEvent::Error { message } => message,
        other => panic!("expected Error, got {other:?}"),
    }
}

async fn recv_snapshot(ws: &mut ClientWs) -> RoomSnapshot {
    match recv_until(ws, |e| matches!(e, ServerEvent::RoomUpdate(_))).await {
        ServerEvent::RoomUpdate(snapshot) => snapshot,
        other => panic!("expected RoomUpdate, got {other:?}"),
    }
}

/// Creates a room and returns its code and the host's player id.
async fn create_room(ws: &mut ClientWs, name: &str, game: &str) -> (RoomCode, PlayerId) {
    send(
        ws,
        json!({"event": "create-room", "data": {"player_name": name, "game": game}}),
    )
    .await;
    match recv(ws).await {
        ServerEvent::RoomCreated {
            room_code,
            player_id,
        } => (room_code, player_id),
        other => panic!("expected RoomCreated, got {other:?}"),
    }
}

async fn join_room(ws: &mut ClientWs, code: &RoomCode, name: &str) -> PlayerId {
    send(
        ws,
        json!({"event": "join-room", "data": {"room_code": code.as_str(), "player_name": name}}),
    )
    .await;
    match recv_until(ws, |e| matches!(e, ServerEvent::RoomJoined { .. })).await {
        ServerEvent::RoomJoined { player_id, .. } => player_id,
        other => panic!("expected RoomJoined, got {other:?}"),
    }
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_create_room_makes_sender_host() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;

    let (code, player_id) = create_room(&mut ws, "Ana", "npat").await;
    let snapshot = recv_snapshot(&mut ws).await;

    assert_eq!(snapshot.code, code);
    assert_eq!(snapshot.game, GameKind::Npat);
    assert_eq!(snapshot.state, RoomState::Lobby);
    assert_eq!(snapshot.host, player_id);
    assert_eq!(snapshot.players.len(), 1);
    assert!(snapshot.players[0].is_host);
}

#[tokio::test]
async fn test_join_room_by_code() {
    let addr = start_server().await;
    let mut ana = connect(&addr).await;
    let mut bo = connect(&addr).await;

    let (code, _) = create_room(&mut ana, "Ana", "hot-takes").await;
    recv_snapshot(&mut ana).await;

    // Codes are case-insensitive on input.
    send(
        &mut bo,
        json!({"event": "join-room", "data": {"room_code": code.as_str().to_lowercase(), "player_name": "Bo"}}),
    )
    .await;
    let bo_id = match recv(&mut bo).await {
        ServerEvent::RoomJoined {
            room_code,
            player_id,
        } => {
            assert_eq!(room_code, code);
            player_id
        }
        other => panic!("expected RoomJoined, got {other:?}"),
    };

    let snapshot = recv_snapshot(&mut ana).await;
    assert_eq!(snapshot.players.len(), 2);
    assert!(snapshot.players.iter().any(|p| p.id == bo_id && !p.is_host));
}

#[tokio::test]
async fn test_join_unknown_room_is_an_error() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;

    send(
        &mut ws,
        json!({"event": "join-room", "data": {"room_code": "ABC234", "player_name": "Bo"}}),
    )
    .await;
    assert_eq!(recv_error(&mut ws).await, "Room ABC234 not found");
}

#[tokio::test]
async fn test_join_malformed_code_reads_as_unknown_room() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;

    send(
        &mut ws,
        json!({"event": "join-room", "data": {"room_code": "ABC12", "player_name": "Bo"}}),
    )
    .await;
    assert_eq!(recv_error(&mut ws).await, "Room ABC12 not found");

    // The connection stays usable.
    send(&mut ws, json!({"event": "heartbeat", "data": {"client_time": 2}})).await;
    assert!(matches!(recv(&mut ws).await, ServerEvent::HeartbeatAck { client_time: 2, .. }));
}

#[tokio::test]
async fn test_join_with_taken_name_is_an_error() {
    let addr = start_server().await;
    let mut ana = connect(&addr).await;
    let mut other = connect(&addr).await;

    let (code, _) = create_room(&mut ana, "Ana", "insider").await;
    send(
        &mut other,
        json!({"event": "join-room", "data": {"room_code": code.as_str(), "player_name": "Ana"}}),
    )
    .await;
    assert_eq!(recv_error(&mut other).await, "Name \"Ana\" is already taken");

    // The rejected player is free to try again.
    join_room(&mut other, &code, "Cy").await;
}

#[tokio::test]
async fn test_heartbeat_response() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;

    send(&mut ws, json!({"event": "heartbeat", "data": {"client_time": 12345}})).await;
    match recv(&mut ws).await {
        ServerEvent::HeartbeatAck { client_time, .. } => assert_eq!(client_time, 12345),
        other => panic!("expected HeartbeatAck, got {other:?}"),
    }
}

#[tokio::test]
async fn test_bad_frame_keeps_connection_open() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;

    ws.send(Message::Text("not json".to_string().into())).await.expect("send");
    let message = recv_error(&mut ws).await;
    assert!(message.starts_with("Invalid message"), "{message}");

    send(&mut ws, json!({"event": "create-room", "data": {"player_name": "Ana", "game": "chess"}})).await;
    let message = recv_error(&mut ws).await;
    assert!(message.starts_with("Invalid message"), "{message}");

    send(&mut ws, json!({"event": "heartbeat", "data": {"client_time": 1}})).await;
    assert!(matches!(recv(&mut ws).await, ServerEvent::HeartbeatAck { client_time: 1, .. }));
}

#[tokio::test]
async fn test_game_action_outside_a_room_is_an_error() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;

    send(
        &mut ws,
        json!({"event": "game", "data": {"game": "never-ever", "action": {"type": "answer", "have": true}}}),
    )
    .await;
    let message = recv_error(&mut ws).await;
    assert!(message.ends_with("is not in a room"), "{message}");
}

#[tokio::test]
async fn test_cannot_create_a_second_room() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;

    create_room(&mut ws, "Ana", "npat").await;
    send(
        &mut ws,
        json!({"event": "create-room", "data": {"player_name": "Ana", "game": "wavelength"}}),
    )
    .await;
    let message = recv_error(&mut ws).await;
    assert!(message.ends_with("is already in a room"), "{message}");
}

#[tokio::test]
async fn test_full_never_ever_round() {
    let addr = start_server().await;
    let mut ana = connect(&addr).await;
    let mut bo = connect(&addr).await;
    let mut cy = connect(&addr).await;

    let (code, ana_id) = create_room(&mut ana, "Ana", "never-ever").await;
    join_room(&mut bo, &code, "Bo").await;

    // Only the host may start, and only with enough players.
    send(&mut bo, json!({"event": "start-game"})).await;
    assert_eq!(recv_error(&mut bo).await, "Only the host can start the game");
    send(&mut ana, json!({"event": "start-game"})).await;
    assert_eq!(
        recv_error(&mut ana).await,
        "Need at least 3 players to start (have 2)"
    );

    join_room(&mut cy, &code, "Cy").await;
    send(&mut ana, json!({"event": "start-game"})).await;
    for ws in [&mut ana, &mut bo, &mut cy] {
        let started = recv_until(ws, |e| matches!(e, ServerEvent::GameStarted { .. })).await;
        assert!(matches!(
            started,
            ServerEvent::GameStarted {
                game: GameKind::NeverEver
            }
        ));
    }

    for (ws, have) in [(&mut ana, true), (&mut bo, false), (&mut cy, false)] {
        send(
            ws,
            json!({"event": "game", "data": {"game": "never-ever", "action": {"type": "answer", "have": have}}}),
        )
        .await;
    }

    let results = recv_until(&mut cy, |e| {
        matches!(
            e,
            ServerEvent::Game(GameEvent::NeverEver(never_ever::Event::RoundResults { .. }))
        )
    })
    .await;
    match results {
        ServerEvent::Game(GameEvent::NeverEver(never_ever::Event::RoundResults { award, .. })) => {
            assert_eq!(award.winners, vec![ana_id]);
        }
        other => panic!("expected RoundResults, got {other:?}"),
    }
}

#[tokio::test]
async fn test_leave_room_marks_player_disconnected() {
    let addr = start_server().await;
    let mut ana = connect(&addr).await;
    let mut bo = connect(&addr).await;

    let (code, ana_id) = create_room(&mut ana, "Ana", "npat").await;
    let bo_id = join_room(&mut bo, &code, "Bo").await;
    recv_until(&mut ana, |e| {
        matches!(e, ServerEvent::RoomUpdate(s) if s.players.len() == 2)
    })
    .await;

    send(&mut bo, json!({"event": "leave-room"})).await;
    let snapshot = recv_until(&mut ana, |e| {
        matches!(e, ServerEvent::RoomUpdate(s) if s.players.iter().any(|p| p.id == bo_id && !p.connected))
    })
    .await;
    match snapshot {
        ServerEvent::RoomUpdate(snapshot) => assert_eq!(snapshot.host, ana_id),
        other => panic!("expected RoomUpdate, got {other:?}"),
    }

    // Once out, the player can open a room of their own.
    create_room(&mut bo, "Bo", "wavelength").await;
}

#[tokio::test]
async fn test_closing_socket_hands_host_to_next_player() {
    let addr = start_server().await;
    let mut ana = connect(&addr).await;
    let mut bo = connect(&addr).await;

    let (code, _) = create_room(&mut ana, "Ana", "npat").await;
    let bo_id = join_room(&mut bo, &code, "Bo").await;

    ana.close(None).await.expect("close");
    let snapshot = recv_until(&mut bo, |e| {
        matches!(e, ServerEvent::RoomUpdate(s) if s.host == bo_id)
    })
    .await;
    match snapshot {
        ServerEvent::RoomUpdate(snapshot) => {
            assert!(snapshot.players.iter().any(|p| p.id == bo_id && p.is_host));
        }
        other => panic!("expected RoomUpdate, got {other:?}"),
    }
}
