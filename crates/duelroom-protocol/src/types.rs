//! Core protocol types for Duelroom's wire format.
//!
//! Everything in this module is serialized to JSON and read by browser
//! clients, so the field names follow the client's camelCase convention
//! and enum tags are SCREAMING_SNAKE_CASE.

use rand::Rng;
use serde::{Deserialize, Serialize};

use std::fmt;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Opaque identifier for one connected participant.
///
/// Stable for the lifetime of a connection and never reused after the
/// connection ends. Serialized as a plain string (`#[serde(transparent)]`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    /// Draws a fresh 128-bit id, rendered as 32 lowercase hex characters.
    pub fn generate() -> Self {
        Self(random_hex())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Opaque, unique identifier for a room. Generated at creation and never
/// changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub String);

impl RoomId {
    pub fn generate() -> Self {
        Self(random_hex())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

fn random_hex() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

// ---------------------------------------------------------------------------
// Room lifecycle
// ---------------------------------------------------------------------------

/// The match lifecycle of a room.
///
/// ```text
/// WAITING ──(both ready)──→ PLAYING ──(win/draw/forfeit)──→ FINISHED
///    ↑                                                          │
///    └──────────────(rematch, leave, kick)──────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomState {
    #[default]
    Waiting,
    Playing,
    Finished,
}

impl RoomState {
    /// Returns `true` while a match is running and moves are accepted.
    pub fn is_playing(&self) -> bool {
        matches!(self, Self::Playing)
    }
}

impl fmt::Display for RoomState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Waiting => write!(f, "WAITING"),
            Self::Playing => write!(f, "PLAYING"),
            Self::Finished => write!(f, "FINISHED"),
        }
    }
}

/// A member's standing in a room: the creator is the host, the other
/// member is the guest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlayerRole {
    Host,
    Guest,
}

impl fmt::Display for PlayerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Host => write!(f, "Host"),
            Self::Guest => write!(f, "Guest"),
        }
    }
}

/// A mark placed on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mark {
    X,
    O,
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

/// One member of a room as shown to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerInfo {
    pub session_id: SessionId,
    pub nickname: String,
    pub role: PlayerRole,
}

/// The externally visible state of one match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameView {
    /// Cells 0..9 in row-major order; `null` is an empty cell.
    pub board: [Option<Mark>; 9],
    pub player_x: SessionId,
    pub player_o: SessionId,
    pub current_turn: SessionId,
    /// `None` while the match runs, and after a draw.
    pub winner: Option<SessionId>,
    pub over: bool,
}

/// The full externally visible state of a room, sent on every change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    pub room_id: RoomId,
    pub room_name: String,
    pub host_nickname: String,
    pub players: Vec<PlayerInfo>,
    pub ready_session_ids: Vec<SessionId>,
    #[serde(default)]
    pub game: Option<GameView>,
    pub game_state: RoomState,
}

/// A lobby listing row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomListEntry {
    pub room_id: RoomId,
    pub room_name: String,
    pub player_count: usize,
    pub host_nickname: String,
}

// ---------------------------------------------------------------------------
// GameMessage: in-room traffic
// ---------------------------------------------------------------------------

/// Discriminates a [`GameMessage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    Join,
    Leave,
    Chat,
    Ready,
    Unready,
    Move,
    Kick,
    Error,
    GameStart,
    GameUpdate,
    GameEnd,
}

/// Payload of a MOVE request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovePayload {
    /// Board cell, `0..9`.
    pub index: usize,
}

/// A message sent to a room topic, or a caller-only error.
///
/// Clients use the same shape for in-room requests (CHAT, READY,
/// UNREADY, MOVE, KICK). Absent fields are omitted from the JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameMessage {
    #[serde(rename = "type")]
    pub kind: MessageType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<RoomId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_role: Option<PlayerRole>,
    #[serde(rename = "move", default, skip_serializing_if = "Option::is_none")]
    pub mv: Option<MovePayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_state: Option<RoomSnapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kick_target: Option<SessionId>,
}

impl GameMessage {
    /// Creates a message of the given type with every optional field empty.
    pub fn new(kind: MessageType) -> Self {
        Self {
            kind,
            room_id: None,
            sender: None,
            content: None,
            sender_role: None,
            mv: None,
            room_state: None,
            kick_target: None,
        }
    }

    /// A caller-only ERROR carrying a human-readable reason.
    pub fn error(content: impl Into<String>) -> Self {
        Self::new(MessageType::Error).with_content(content)
    }

    pub fn with_room(mut self, room_id: RoomId) -> Self {
        self.room_id = Some(room_id);
        self
    }

    pub fn with_sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = Some(sender.into());
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_role(mut self, role: PlayerRole) -> Self {
        self.sender_role = Some(role);
        self
    }

    pub fn with_state(mut self, snapshot: RoomSnapshot) -> Self {
        self.room_state = Some(snapshot);
        self
    }

    pub fn with_move(mut self, index: usize) -> Self {
        self.mv = Some(MovePayload { index });
        self
    }

    pub fn with_kick_target(mut self, target: SessionId) -> Self {
        self.kick_target = Some(target);
        self
    }
}

// ---------------------------------------------------------------------------
// Frames
// ---------------------------------------------------------------------------

/// Requests a client may send.
///
/// Internally tagged: `{ "type": "CreateRoom", "roomName": "...", "nickname": "..." }`.
/// Missing strings decode as empty and fail validation downstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    /// "Which session id did the server give me?"
    RequestSessionId,

    /// "Show me the lobby."
    ListRooms,

    /// Keeps an otherwise quiet connection from idling out.
    Heartbeat {
        /// Client clock, echoed back for round-trip measurement.
        #[serde(default)]
        client_time: u64,
    },

    CreateRoom {
        #[serde(default)]
        room_name: String,
        #[serde(default)]
        nickname: String,
    },

    JoinRoom {
        room_id: RoomId,
        #[serde(default)]
        nickname: String,
    },

    /// An in-room request (CHAT, READY, UNREADY, MOVE, KICK).
    Room {
        room_id: RoomId,
        message: GameMessage,
    },
}

/// Frames the server sends.
///
/// Everything except [`ServerMessage::Room`] is addressed to a single
/// session; `Room` is a delivery on a room's broadcast topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    Session { session_id: SessionId },
    /// Reply to [`ClientMessage::Heartbeat`]; `server_time` is milliseconds
    /// since the connection began.
    HeartbeatAck { client_time: u64, server_time: u64 },
    RoomList { rooms: Vec<RoomListEntry> },
    RoomCreated { room: RoomSnapshot },
    RoomJoined { room: RoomSnapshot },
    Error { message: GameMessage },
    Room { room_id: RoomId, message: GameMessage },
}

/// Either direction's frame body.
///
/// Adjacently tagged: `{ "type": "Client", "data": { "type": "ListRooms" } }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Payload {
    Client(ClientMessage),
    Server(ServerMessage),
}

/// The top-level wire wrapper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Per-direction sequence number, starting at 0.
    #[serde(default)]
    pub seq: u64,

    /// Milliseconds since the sender's connection began.
    #[serde(default)]
    pub timestamp: u64,

    pub payload: Payload,
}
