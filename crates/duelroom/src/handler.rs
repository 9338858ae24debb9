//! Per-connection handler: session registration and message routing.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Register a session with the hub → the session id is queued
//!   2. Spawn a writer that drains the session's outbound channel
//!   3. Loop: receive envelopes → route lobby and in-room requests; any
//!      frame, heartbeats and WebSocket pings included, resets the idle timer
//!   4. On exit, the guard takes the session out of its room and the hub

use std::sync::Arc;
use std::time::Instant;

use duelroom_protocol::{
    ClientMessage, Codec, Envelope, GameMessage, Payload, ServerMessage, SessionId,
};
use duelroom_session::Outbound;
use duelroom_transport::{Connection, WebSocketConnection};

use crate::server::ServerState;
use crate::DuelroomError;

/// Drop guard that tears a session down when the handler exits.
///
/// This ensures cleanup happens even if the handler panics. Since `Drop`
/// is synchronous, we spawn a fire-and-forget task for the async part.
/// Room cleanup runs first so the final LEAVE broadcast still finds the
/// other member's subscription.
struct SessionGuard<C: Codec> {
    session_id: SessionId,
    state: Arc<ServerState<C>>,
}

impl<C: Codec> Drop for SessionGuard<C> {
    fn drop(&mut self) {
        let session_id = self.session_id.clone();
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            state.rooms.disconnect(&session_id).await;
            if let Err(e) = state.hub.disconnect(&session_id) {
                tracing::debug!(%session_id, error = %e, "session already gone");
            }
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), DuelroomError> {
    let conn_id = conn.id();
    let conn = Arc::new(conn);

    // --- Step 1: Session ---
    let (session_id, outbound) = state.hub.connect();
    let _guard = SessionGuard {
        session_id: session_id.clone(),
        state: Arc::clone(&state),
    };
    tracing::info!(%conn_id, %session_id, "session attached to connection");

    // --- Step 2: Writer ---
    tokio::spawn(write_loop(Arc::clone(&conn), Arc::clone(&state), outbound));

    // --- Step 3: Message loop ---
    let start = Instant::now();

    loop {
        let data = match tokio::time::timeout(state.idle_timeout, conn.recv()).await {
            Ok(Ok(Some(data))) => data,
            Ok(Ok(None)) => {
                tracing::info!(%session_id, "connection closed cleanly");
                break;
            }
            Ok(Err(e)) => {
                tracing::debug!(%session_id, error = %e, "recv error");
                break;
            }
            Err(_) => {
                tracing::info!(%session_id, "connection timed out");
                break;
            }
        };

        // A WebSocket ping: the peer is alive, nothing to route.
        if data.is_empty() {
            continue;
        }

        let envelope: Envelope = match state.codec.decode(&data) {
            Ok(env) => env,
            Err(e) => {
                tracing::debug!(%session_id, error = %e, "failed to decode envelope");
                reject(&state, &session_id, "Invalid message format.");
                continue;
            }
        };

        match envelope.payload {
            Payload::Client(msg) => {
                handle_client_message(&state, &session_id, msg, &start).await
            }
            Payload::Server(_) => {
                tracing::debug!(%session_id, "client sent a server frame");
                reject(&state, &session_id, "Invalid message format.");
            }
        }
    }

    // _guard drops here → room leave and hub disconnect fire; the hub
    // closes the outbound channel, which ends the writer.
    Ok(())
}

/// Routes one client request to the lobby or the caller's room.
async fn handle_client_message<C: Codec>(
    state: &ServerState<C>,
    session_id: &SessionId,
    msg: ClientMessage,
    start: &Instant,
) {
    match msg {
        ClientMessage::Heartbeat { client_time } => {
            let ack = ServerMessage::HeartbeatAck {
                client_time,
                server_time: start.elapsed().as_millis() as u64,
            };
            if let Err(e) = state.hub.send(session_id, ack) {
                tracing::debug!(%session_id, error = %e, "could not answer heartbeat");
            }
        }
        ClientMessage::RequestSessionId => {
            let frame = ServerMessage::Session {
                session_id: session_id.clone(),
            };
            if let Err(e) = state.hub.send(session_id, frame) {
                tracing::debug!(%session_id, error = %e, "could not answer session request");
            }
        }
        ClientMessage::ListRooms => state.rooms.list_rooms(session_id).await,
        ClientMessage::CreateRoom {
            room_name,
            nickname,
        } => {
            state
                .rooms
                .create_room(session_id, &room_name, &nickname)
                .await
        }
        ClientMessage::JoinRoom { room_id, nickname } => {
            state.rooms.join_room(session_id, &room_id, &nickname).await
        }
        ClientMessage::Room { room_id, message } => {
            state
                .rooms
                .handle_room_message(session_id, &room_id, message)
                .await
        }
    }
}

/// Drains a session's outbound channel onto the socket.
///
/// Ends when the hub drops the session or the peer stops accepting
/// frames, then closes the connection.
async fn write_loop<C: Codec>(
    conn: Arc<WebSocketConnection>,
    state: Arc<ServerState<C>>,
    mut outbound: Outbound,
) {
    let mut seq: u64 = 0;
    let start = Instant::now();

    while let Some(frame) = outbound.recv().await {
        let envelope = Envelope {
            seq: next_seq(&mut seq),
            timestamp: start.elapsed().as_millis() as u64,
            payload: Payload::Server(frame),
        };
        let bytes = match state.codec.encode(&envelope) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(error = %e, "failed to encode outbound frame");
                continue;
            }
        };
        if let Err(e) = conn.send(&bytes).await {
            tracing::debug!(conn_id = %conn.id(), error = %e, "send failed, stopping writer");
            break;
        }
    }

    if let Err(e) = conn.close().await {
        tracing::debug!(conn_id = %conn.id(), error = %e, "close failed");
    }
}

/// Queues an ERROR frame for a request that could not be understood.
fn reject<C: Codec>(state: &ServerState<C>, session_id: &SessionId, reason: &str) {
    let frame = ServerMessage::Error {
        message: GameMessage::error(reason),
    };
    if let Err(e) = state.hub.send(session_id, frame) {
        tracing::debug!(%session_id, error = %e, "could not report bad frame");
    }
}

/// Increments and returns the next sequence number.
fn next_seq(seq: &mut u64) -> u64 {
    let current = *seq;
    *seq += 1;
    current
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_seq_counts_up_from_current() {
        let mut seq = 0;
        assert_eq!(next_seq(&mut seq), 0);
        assert_eq!(next_seq(&mut seq), 1);
        assert_eq!(seq, 2);
    }
}
