//! Integration tests for the Duelroom server, handler, and full connection flow.

use std::time::Duration;

use duelroom::prelude::*;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message;

// =========================================================================
// Helpers
// =========================================================================

type ClientWs = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// Starts a server on a random port and returns the address.
async fn start_server() -> String {
    spawn_server(DuelroomServer::builder().bind("127.0.0.1:0").seed(7)).await
}

async fn spawn_server(builder: DuelroomServerBuilder) -> String {
    let server = builder.build().await.expect("server should build");

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

/// Connects and consumes the session frame every connection starts with.
async fn connect(addr: &str) -> (ClientWs, SessionId) {
    let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .expect("should connect");
    match recv(&mut ws).await {
        ServerMessage::Session { session_id } => (ws, session_id),
        other => panic!("expected Session, got {other:?}"),
    }
}

async fn send(ws: &mut ClientWs, msg: ClientMessage) {
    let envelope = Envelope {
        seq: 0,
        timestamp: 0,
        payload: Payload::Client(msg),
    };
    let json = serde_json::to_string(&envelope).expect("encode");
    ws.send(Message::Text(json.into())).await.expect("send");
}

async fn recv_envelope(ws: &mut ClientWs) -> Envelope {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("frame within 2s")
            .expect("stream open")
            .expect("valid frame");
        if msg.is_text() || msg.is_binary() {
            return serde_json::from_slice(&msg.into_data()).expect("decode");
        }
    }
}

async fn recv(ws: &mut ClientWs) -> ServerMessage {
    match recv_envelope(ws).await.payload {
        Payload::Server(msg) => msg,
        other => panic!("expected server payload, got {other:?}"),
    }
}

/// Skips frames until a room broadcast of one of `kinds` arrives.
async fn recv_room(ws: &mut ClientWs, kinds: &[MessageType]) -> GameMessage {
    loop {
        if let ServerMessage::Room { message, .. } = recv(ws).await {
            if kinds.contains(&message.kind) {
                return message;
            }
        }
    }
}

fn in_room(room_id: &RoomId, message: GameMessage) -> ClientMessage {
    ClientMessage::Room {
        room_id: room_id.clone(),
        message,
    }
}

/// Host creates, guest joins; both sockets are drained up to the JOIN.
async fn seated_pair(addr: &str) -> ((ClientWs, SessionId), (ClientWs, SessionId), RoomId) {
    let (mut host, host_id) = connect(addr).await;
    send(
        &mut host,
        ClientMessage::CreateRoom {
            room_name: "den".into(),
            nickname: "Hana".into(),
        },
    )
    .await;
    let room_id = match recv(&mut host).await {
        ServerMessage::RoomCreated { room } => room.room_id,
        other => panic!("expected RoomCreated, got {other:?}"),
    };

    let (mut guest, guest_id) = connect(addr).await;
    send(
        &mut guest,
        ClientMessage::JoinRoom {
            room_id: room_id.clone(),
            nickname: "Gil".into(),
        },
    )
    .await;
    assert!(matches!(recv(&mut guest).await, ServerMessage::RoomJoined { .. }));
    recv_room(&mut guest, &[MessageType::Join]).await;
    recv_room(&mut host, &[MessageType::Join]).await;

    ((host, host_id), (guest, guest_id), room_id)
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_connect_first_frame_is_session_id() {
    let addr = start_server().await;
    let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .expect("should connect");

    let envelope = recv_envelope(&mut ws).await;
    assert_eq!(envelope.seq, 0);
    match envelope.payload {
        Payload::Server(ServerMessage::Session { session_id }) => {
            assert_eq!(session_id.as_str().len(), 32);
        }
        other => panic!("expected Session, got {other:?}"),
    }
}

#[tokio::test]
async fn test_request_session_id_repeats_same_id() {
    let addr = start_server().await;
    let (mut ws, id) = connect(&addr).await;

    send(&mut ws, ClientMessage::RequestSessionId).await;

    let envelope = recv_envelope(&mut ws).await;
    assert_eq!(envelope.seq, 1);
    assert_eq!(
        envelope.payload,
        Payload::Server(ServerMessage::Session { session_id: id })
    );
}

#[tokio::test]
async fn test_multiple_connections_get_distinct_ids() {
    let addr = start_server().await;
    let (_ws1, a) = connect(&addr).await;
    let (_ws2, b) = connect(&addr).await;
    assert_ne!(a, b);
}

#[tokio::test]
async fn test_list_rooms_shows_created_room() {
    let addr = start_server().await;
    let (mut host, _) = connect(&addr).await;
    let (mut watcher, _) = connect(&addr).await;

    send(&mut watcher, ClientMessage::ListRooms).await;
    assert_eq!(recv(&mut watcher).await, ServerMessage::RoomList { rooms: vec![] });

    send(
        &mut host,
        ClientMessage::CreateRoom {
            room_name: "den".into(),
            nickname: "Hana".into(),
        },
    )
    .await;
    recv(&mut host).await;

    send(&mut watcher, ClientMessage::ListRooms).await;
    match recv(&mut watcher).await {
        ServerMessage::RoomList { rooms } => {
            assert_eq!(rooms.len(), 1);
            assert_eq!(rooms[0].room_name, "den");
            assert_eq!(rooms[0].host_nickname, "Hana");
            assert_eq!(rooms[0].player_count, 1);
        }
        other => panic!("expected RoomList, got {other:?}"),
    }
}

#[tokio::test]
async fn test_join_unknown_room_returns_error() {
    let addr = start_server().await;
    let (mut ws, _) = connect(&addr).await;

    send(
        &mut ws,
        ClientMessage::JoinRoom {
            room_id: RoomId::from("nope"),
            nickname: "Gil".into(),
        },
    )
    .await;

    match recv(&mut ws).await {
        ServerMessage::Error { message } => {
            assert_eq!(message.kind, MessageType::Error);
            assert_eq!(message.content.as_deref(), Some("Room nope does not exist."));
        }
        other => panic!("expected Error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_invalid_frame_reports_error_and_connection_survives() {
    let addr = start_server().await;
    let (mut ws, id) = connect(&addr).await;

    ws.send(Message::Text("not json".into())).await.expect("send");
    match recv(&mut ws).await {
        ServerMessage::Error { message } => {
            assert_eq!(message.content.as_deref(), Some("Invalid message format."));
        }
        other => panic!("expected Error, got {other:?}"),
    }

    send(&mut ws, ClientMessage::RequestSessionId).await;
    assert_eq!(recv(&mut ws).await, ServerMessage::Session { session_id: id });
}

#[tokio::test]
async fn test_server_payload_from_client_is_rejected() {
    let addr = start_server().await;
    let (mut ws, _) = connect(&addr).await;

    let envelope = Envelope {
        seq: 0,
        timestamp: 0,
        payload: Payload::Server(ServerMessage::RoomList { rooms: vec![] }),
    };
    let json = serde_json::to_string(&envelope).expect("encode");
    ws.send(Message::Text(json.into())).await.expect("send");

    assert!(matches!(recv(&mut ws).await, ServerMessage::Error { .. }));
}

#[tokio::test]
async fn test_full_game_over_websocket() {
    let addr = start_server().await;
    let ((mut host, host_id), (mut guest, _), room_id) = seated_pair(&addr).await;

    send(&mut host, in_room(&room_id, GameMessage::new(MessageType::Ready))).await;
    send(&mut guest, in_room(&room_id, GameMessage::new(MessageType::Ready))).await;

    let start = recv_room(&mut host, &[MessageType::GameStart]).await;
    recv_room(&mut guest, &[MessageType::GameStart]).await;
    let game = start
        .room_state
        .and_then(|s| s.game)
        .expect("game view in GAME_START");
    assert_eq!(game.current_turn, game.player_x);

    let x_is_host = game.player_x == host_id;
    let x_nick = if x_is_host { "Hana" } else { "Gil" };

    // X takes the top row while O plays the middle row. Every move is
    // confirmed on the host's socket before the next one goes out.
    let script: [(bool, usize); 5] = [(true, 0), (false, 3), (true, 1), (false, 4), (true, 2)];
    let mut last = None;
    for (x_moves, cell) in script {
        let mover = if x_moves == x_is_host { &mut host } else { &mut guest };
        send(mover, in_room(&room_id, GameMessage::new(MessageType::Move).with_move(cell))).await;
        last = Some(recv_room(&mut host, &[MessageType::GameUpdate, MessageType::GameEnd]).await);
    }

    let end = last.expect("five moves played");
    assert_eq!(end.kind, MessageType::GameEnd);
    assert_eq!(end.content, Some(format!("{x_nick} wins!")));
    assert_eq!(end.room_id.as_ref(), Some(&room_id));
    let snapshot = end.room_state.expect("snapshot");
    assert_eq!(snapshot.game_state, RoomState::Finished);
    assert!(snapshot.ready_session_ids.is_empty());
}

#[tokio::test]
async fn test_out_of_turn_move_errors_only_to_mover() {
    let addr = start_server().await;
    let ((mut host, host_id), (mut guest, _), room_id) = seated_pair(&addr).await;

    send(&mut host, in_room(&room_id, GameMessage::new(MessageType::Ready))).await;
    send(&mut guest, in_room(&room_id, GameMessage::new(MessageType::Ready))).await;
    let game = recv_room(&mut host, &[MessageType::GameStart])
        .await
        .room_state
        .and_then(|s| s.game)
        .expect("game view");
    recv_room(&mut guest, &[MessageType::GameStart]).await;

    let o = if game.player_o == host_id { &mut host } else { &mut guest };
    send(o, in_room(&room_id, GameMessage::new(MessageType::Move).with_move(4))).await;

    match recv(o).await {
        ServerMessage::Error { message } => {
            assert_eq!(
                message.content.as_deref(),
                Some("It is not your turn, or that cell cannot be played.")
            );
        }
        other => panic!("expected Error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_chat_reaches_both_members() {
    let addr = start_server().await;
    let ((mut host, _), (mut guest, _), room_id) = seated_pair(&addr).await;

    send(
        &mut guest,
        in_room(&room_id, GameMessage::new(MessageType::Chat).with_content("gl hf")),
    )
    .await;

    for ws in [&mut host, &mut guest] {
        let chat = recv_room(ws, &[MessageType::Chat]).await;
        assert_eq!(chat.sender.as_deref(), Some("Gil"));
        assert_eq!(chat.sender_role, Some(PlayerRole::Guest));
        assert_eq!(chat.content.as_deref(), Some("gl hf"));
    }
}

#[tokio::test]
async fn test_host_disconnect_closes_room_for_guest() {
    let addr = start_server().await;
    let ((mut host, _), (mut guest, _), _room_id) = seated_pair(&addr).await;

    host.close(None).await.expect("close");

    let leave = recv_room(&mut guest, &[MessageType::Leave]).await;
    assert_eq!(
        leave.content.as_deref(),
        Some("The host left and the room was closed.")
    );

    send(&mut guest, ClientMessage::ListRooms).await;
    assert_eq!(recv(&mut guest).await, ServerMessage::RoomList { rooms: vec![] });
}

#[tokio::test]
async fn test_guest_disconnect_frees_seat() {
    let addr = start_server().await;
    let ((mut host, _), (guest, _), room_id) = seated_pair(&addr).await;

    drop(guest);

    let leave = recv_room(&mut host, &[MessageType::Leave]).await;
    assert_eq!(leave.content.as_deref(), Some("Gil left the room."));
    let snapshot = leave.room_state.expect("snapshot");
    assert_eq!(snapshot.room_id, room_id);
    assert_eq!(snapshot.players.len(), 1);
}

#[tokio::test]
async fn test_idle_connection_is_closed() {
    let addr = spawn_server(
        DuelroomServer::builder()
            .bind("127.0.0.1:0")
            .idle_timeout(Duration::from_millis(200)),
    )
    .await;
    let (mut ws, _) = connect(&addr).await;

    let result = tokio::time::timeout(Duration::from_secs(2), ws.next()).await;

    match result {
        Ok(Some(Ok(Message::Close(_)))) | Ok(None) => {} // expected
        Ok(Some(Err(_))) => {}                           // also fine
        other => panic!("expected close, got {other:?}"),
    }
}

/// A server that drops connections silent for 300 ms, with one open room.
async fn short_idle_room() -> (String, ClientWs, RoomId) {
    let addr = spawn_server(
        DuelroomServer::builder()
            .bind("127.0.0.1:0")
            .idle_timeout(Duration::from_millis(300)),
    )
    .await;
    let (mut host, _) = connect(&addr).await;
    send(
        &mut host,
        ClientMessage::CreateRoom {
            room_name: "den".into(),
            nickname: "Hana".into(),
        },
    )
    .await;
    let room_id = match recv(&mut host).await {
        ServerMessage::RoomCreated { room } => room.room_id,
        other => panic!("expected RoomCreated, got {other:?}"),
    };
    (addr, host, room_id)
}

async fn assert_guest_can_join(addr: &str, room_id: &RoomId) {
    let (mut guest, _) = connect(addr).await;
    send(
        &mut guest,
        ClientMessage::JoinRoom {
            room_id: room_id.clone(),
            nickname: "Gil".into(),
        },
    )
    .await;
    match recv(&mut guest).await {
        ServerMessage::RoomJoined { room } => assert_eq!(&room.room_id, room_id),
        other => panic!("expected RoomJoined, got {other:?}"),
    }
}

#[tokio::test]
async fn test_heartbeat_is_acknowledged() {
    let addr = start_server().await;
    let (mut ws, _) = connect(&addr).await;

    send(&mut ws, ClientMessage::Heartbeat { client_time: 12345 }).await;

    match recv(&mut ws).await {
        ServerMessage::HeartbeatAck { client_time, .. } => {
            assert_eq!(client_time, 12345);
            // server_time is millis since connection start; may be 0 if fast.
        }
        other => panic!("expected HeartbeatAck, got {other:?}"),
    }
}

#[tokio::test]
async fn test_heartbeats_keep_waiting_host_past_idle_timeout() {
    let (addr, mut host, room_id) = short_idle_room().await;

    for tick in 0..6 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        send(&mut host, ClientMessage::Heartbeat { client_time: tick }).await;
        assert!(matches!(recv(&mut host).await, ServerMessage::HeartbeatAck { .. }));
    }

    assert_guest_can_join(&addr, &room_id).await;
}

#[tokio::test]
async fn test_websocket_pings_keep_waiting_host_past_idle_timeout() {
    let (addr, mut host, room_id) = short_idle_room().await;

    for _ in 0..6 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        host.send(Message::Ping(b"alive".to_vec().into()))
            .await
            .expect("ping should reach a live server");
    }

    assert_guest_can_join(&addr, &room_id).await;
}
