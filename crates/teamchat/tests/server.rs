//! End-to-end tests: real WebSocket clients against a running server.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use teamchat::prelude::*;
use tokio_tungstenite::tungstenite::Message;

// =========================================================================
// Helpers
// =========================================================================

type ClientWs = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

async fn spawn(server: TeamchatServer) -> String {
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

/// Starts an in-memory server on a random port and returns the address.
async fn start_server() -> String {
    let server = TeamchatServer::builder()
        .bind("127.0.0.1:0")
        .in_memory()
        .build()
        .await
        .expect("server should build");
    spawn(server).await
}

async fn connect(addr: &str) -> ClientWs {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .expect("should connect");
    ws
}

async fn send_json(ws: &mut ClientWs, frame: Value) {
    ws.send(Message::text(frame.to_string()))
        .await
        .expect("send");
}

/// Reads the next server event, failing the test after two seconds.
async fn next_event(ws: &mut ClientWs) -> ServerEvent {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("timed out waiting for an event")
            .expect("stream ended")
            .expect("websocket error");
        if msg.is_text() || msg.is_binary() {
            return serde_json::from_slice(&msg.into_data()).expect("decode");
        }
    }
}

/// Reads events until the ack for `seq`, returning the ack and everything
/// received before it.
async fn ack_for(ws: &mut ClientWs, seq: u64) -> (Ack, Vec<ServerEvent>) {
    let mut before = Vec::new();
    loop {
        match next_event(ws).await {
            ServerEvent::Ack(ack) if ack.reply_to == seq => return (ack, before),
            other => before.push(other),
        }
    }
}

async fn create_team(ws: &mut ClientWs, seq: u64, code: &str) -> Ack {
    send_json(ws, json!({"seq": seq, "type": "create-team", "customCode": code})).await;
    ack_for(ws, seq).await.0
}

async fn join(ws: &mut ClientWs, seq: u64, code: &str, name: &str) -> (Ack, Vec<ServerEvent>) {
    send_json(
        ws,
        json!({"seq": seq, "type": "join-room", "teamCode": code, "name": name}),
    )
    .await;
    ack_for(ws, seq).await
}

fn message(event: &ServerEvent) -> &ChatMessage {
    match event {
        ServerEvent::Message(m) => m,
        other => panic!("expected message, got {other:?}"),
    }
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_create_team_random_code_is_listed() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;

    send_json(&mut ws, json!({"seq": 1, "type": "create-team"})).await;
    let (created, _) = ack_for(&mut ws, 1).await;
    send_json(&mut ws, json!({"seq": 2, "type": "list-teams"})).await;
    let (listed, _) = ack_for(&mut ws, 2).await;

    assert!(created.ok);
    let code = created.team_code.unwrap();
    assert_eq!(code.as_str().len(), 6);
    assert!(listed.teams.unwrap().contains_key(&code));
}

#[tokio::test]
async fn test_create_team_duplicate_custom_code_fails() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;

    assert!(create_team(&mut ws, 1, "TEST01").await.ok);
    let ack = create_team(&mut ws, 2, "test01").await;

    assert!(!ack.ok);
    assert!(ack.error.unwrap().contains("already exists"));
}

#[tokio::test]
async fn test_alice_and_bob_over_websocket() {
    let addr = start_server().await;
    let mut alice = connect(&addr).await;
    let mut bob = connect(&addr).await;
    assert!(create_team(&mut alice, 1, "TEST01").await.ok);

    // Alice joins: empty history, then her own notice, then the ack.
    let (ack, events) = join(&mut alice, 2, "TEST01", "Alice").await;
    assert!(ack.ok);
    assert_eq!(events.len(), 2);
    assert_eq!(events[0], ServerEvent::RoomHistory { messages: vec![] });
    assert_eq!(message(&events[1]).text, "Alice joined");

    // Bob joins: history holds Alice's notice.
    let (ack, events) = join(&mut bob, 1, "TEST01", "Bob").await;
    assert!(ack.ok);
    match &events[0] {
        ServerEvent::RoomHistory { messages } => {
            assert_eq!(messages.len(), 1);
            assert_eq!(messages[0].text, "Alice joined");
        }
        other => panic!("expected room-history, got {other:?}"),
    }
    assert_eq!(message(&events[1]).text, "Bob joined");
    assert_eq!(message(&next_event(&mut alice).await).text, "Bob joined");

    // Alice says hi; both see it.
    send_json(&mut alice, json!({"seq": 3, "type": "send-message", "text": "hi"})).await;
    let (ack, events) = ack_for(&mut alice, 3).await;
    assert!(ack.ok);
    let hi = message(&events[0]).clone();
    assert_eq!(hi.name.as_deref(), Some("Alice"));
    assert_eq!(hi.text, "hi");
    assert_eq!(next_event(&mut bob).await, ServerEvent::Message(hi.clone()));

    // Bob deletes it; both see the deletion.
    send_json(
        &mut bob,
        json!({"seq": 2, "type": "delete-message", "id": hi.id.as_str()}),
    )
    .await;
    let (ack, events) = ack_for(&mut bob, 2).await;
    assert!(ack.ok);
    let deleted = ServerEvent::DeleteMessage { id: hi.id.clone() };
    assert_eq!(events, vec![deleted.clone()]);
    assert_eq!(next_event(&mut alice).await, deleted);

    // Alice leaves; Bob is told.
    alice.close(None).await.expect("close");
    assert_eq!(message(&next_event(&mut bob).await).text, "Alice left");
}

#[tokio::test]
async fn test_send_message_before_join_fails() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;

    send_json(&mut ws, json!({"seq": 5, "type": "send-message", "text": "hi"})).await;
    let (ack, events) = ack_for(&mut ws, 5).await;

    assert!(!ack.ok);
    assert_eq!(ack.error.as_deref(), Some("join a team first"));
    assert!(events.is_empty());
}

#[tokio::test]
async fn test_join_unknown_team_fails() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;

    let (ack, events) = join(&mut ws, 1, "NOPE99", "Alice").await;

    assert!(!ack.ok);
    assert!(ack.error.unwrap().contains("NOPE99"));
    assert!(events.is_empty());
}

#[tokio::test]
async fn test_join_missing_name_reports_field() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;
    assert!(create_team(&mut ws, 1, "TEST01").await.ok);

    send_json(&mut ws, json!({"seq": 2, "type": "join-room", "teamCode": "TEST01"})).await;
    let (ack, _) = ack_for(&mut ws, 2).await;

    assert_eq!(ack.error.as_deref(), Some("name is required"));
}

#[tokio::test]
async fn test_ping_answered_with_pong() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;

    send_json(&mut ws, json!({"seq": 1, "type": "ping", "clientTime": 12345})).await;

    match next_event(&mut ws).await {
        ServerEvent::Pong { client_time, server_time } => {
            assert_eq!(client_time, 12345);
            assert!(server_time > 0);
        }
        other => panic!("expected pong, got {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_frame_gets_error_and_connection_survives() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;

    ws.send(Message::text("not json".to_string())).await.expect("send");
    assert!(matches!(next_event(&mut ws).await, ServerEvent::Error { .. }));

    send_json(&mut ws, json!({"seq": 1, "type": "teleport"})).await;
    assert!(matches!(next_event(&mut ws).await, ServerEvent::Error { .. }));

    send_json(&mut ws, json!({"seq": 2, "type": "list-teams"})).await;
    let (ack, _) = ack_for(&mut ws, 2).await;
    assert!(ack.ok);
}

#[tokio::test]
async fn test_last_leave_clears_room_for_next_joiner() {
    let addr = start_server().await;
    let mut alice = connect(&addr).await;
    assert!(create_team(&mut alice, 1, "TEST01").await.ok);
    join(&mut alice, 2, "TEST01", "Alice").await;
    send_json(&mut alice, json!({"seq": 3, "type": "send-message", "text": "hi"})).await;
    ack_for(&mut alice, 3).await;
    alice.close(None).await.expect("close");
    drop(alice);

    // The disconnect is processed asynchronously; poll until it lands.
    let mut carol_events = Vec::new();
    for attempt in 0..50 {
        let mut carol = connect(&addr).await;
        let (ack, events) = join(&mut carol, 1, "TEST01", "Carol").await;
        assert!(ack.ok);
        if events[0] == (ServerEvent::RoomHistory { messages: vec![] }) {
            carol_events = events;
            break;
        }
        assert!(attempt < 49, "room log was never cleared");
        carol.close(None).await.expect("close");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    assert_eq!(message(&carol_events[1]).text, "Carol joined");
}

#[tokio::test]
async fn test_service_handle_team_is_joinable() {
    let server = TeamchatServer::builder()
        .bind("127.0.0.1:0")
        .in_memory()
        .build()
        .await
        .expect("server should build");
    let service = server.service();
    let addr = spawn(server).await;

    let code = service.create_team(None).await.unwrap();
    let mut ws = connect(&addr).await;
    let (ack, _) = join(&mut ws, 1, code.as_str(), "Alice").await;

    assert!(ack.ok);
    let info = service.room_info(code).await.unwrap().unwrap();
    assert_eq!(info.member_count, 1);
}

#[tokio::test]
async fn test_teams_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("teams.json");

    let first = TeamchatServer::builder()
        .bind("127.0.0.1:0")
        .teams_file(&path)
        .build()
        .await
        .expect("server should build");
    let addr = spawn(first).await;
    let mut ws = connect(&addr).await;
    assert!(create_team(&mut ws, 1, "KEEP22").await.ok);

    let second = TeamchatServer::builder()
        .bind("127.0.0.1:0")
        .teams_file(&path)
        .build()
        .await
        .expect("server should build");
    let teams = second.service().list_teams().await.unwrap();

    assert!(teams.contains_key(&TeamCode::new("KEEP22")));
}

#[tokio::test]
async fn test_idle_timeout_closes_connection() {
    let server = TeamchatServer::builder()
        .bind("127.0.0.1:0")
        .in_memory()
        .idle_timeout(Duration::from_millis(100))
        .build()
        .await
        .expect("server should build");
    let addr = spawn(server).await;
    let mut ws = connect(&addr).await;

    let result = tokio::time::timeout(Duration::from_secs(2), ws.next()).await;

    match result {
        Ok(Some(Ok(Message::Close(_)))) | Ok(None) | Ok(Some(Err(_))) => {}
        other => panic!("expected close, got {other:?}"),
    }
}

#[tokio::test]
async fn test_run_until_stops_service() {
    let server = TeamchatServer::builder()
        .bind("127.0.0.1:0")
        .in_memory()
        .build()
        .await
        .expect("server should build");
    let service = server.service();

    server.run_until(async {}).await.unwrap();

    // Queued behind the shutdown, so the actor drops it unanswered.
    let result = service.list_teams().await;
    assert!(matches!(result, Err(RoomError::Unavailable)));
}

#[tokio::test]
async fn test_stalled_handshake_does_not_block_other_clients() {
    let addr = start_server().await;

    // Opens TCP and never sends the HTTP upgrade.
    let _silent = tokio::net::TcpStream::connect(&addr)
        .await
        .expect("tcp connect");
    tokio::time::sleep(Duration::from_millis(20)).await;

    let mut ws = tokio::time::timeout(Duration::from_secs(3), connect(&addr))
        .await
        .expect("a well-behaved client must still get in");
    send_json(&mut ws, json!({"seq": 1, "type": "list-teams"})).await;
    let (ack, _) = ack_for(&mut ws, 1).await;

    assert!(ack.ok);
}

#[tokio::test]
async fn test_stalled_handshake_is_dropped_after_timeout() {
    let server = TeamchatServer::builder()
        .bind("127.0.0.1:0")
        .in_memory()
        .handshake_timeout(Duration::from_millis(100))
        .build()
        .await
        .expect("server should build");
    let addr = spawn(server).await;
    let mut silent = tokio::net::TcpStream::connect(&addr)
        .await
        .expect("tcp connect");

    let mut buf = [0u8; 1];
    let read = tokio::time::timeout(
        Duration::from_secs(2),
        tokio::io::AsyncReadExt::read(&mut silent, &mut buf),
    )
    .await
    .expect("server should hang up");

    // EOF or reset, either way the socket is gone.
    assert!(matches!(read, Ok(0) | Err(_)));
}

#[tokio::test]
async fn test_run_until_closes_listener() {
    let server = TeamchatServer::builder()
        .bind("127.0.0.1:0")
        .in_memory()
        .build()
        .await
        .expect("server should build");
    let addr = server.local_addr().unwrap();

    server.run_until(async {}).await.unwrap();

    assert!(tokio::net::TcpStream::connect(addr).await.is_err());
}
