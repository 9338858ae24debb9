//! Error types for the room layer.
//!
//! Every variant is reported back to the caller that triggered it, so the
//! `Display` text is written for players, not operators.

use duelroom_protocol::{MessageType, RoomId};

/// Errors that can occur during room operations.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// Nickname blank or longer than the configured limit.
    #[error("Nickname must be between 1 and {max} characters.")]
    InvalidNickname { max: usize },

    /// Room name blank or longer than the configured limit.
    #[error("Room name must be between 1 and {max} characters.")]
    InvalidRoomName { max: usize },

    /// Chat text missing or longer than the configured limit.
    #[error("Chat messages cannot exceed {max} characters.")]
    InvalidChat { max: usize },

    /// The session is already linked to a room.
    #[error("You are already in a room. Leave it before joining another.")]
    AlreadyInRoom,

    /// The room does not exist (or was closed while the request waited).
    #[error("Room {0} does not exist.")]
    NotFound(RoomId),

    /// Both seats are taken.
    #[error("Room {0} is full.")]
    RoomFull(RoomId),

    /// The game engine refused the move.
    #[error("It is not your turn, or that cell cannot be played.")]
    IllegalMove,

    /// The host tried to kick while a game is running.
    #[error("Players cannot be kicked during a game.")]
    KickDuringGame,

    /// A room message type that clients may not send.
    #[error("Unsupported message type {0:?}.")]
    UnsupportedMessage(MessageType),

    /// A room message missing a field its type requires.
    #[error("Malformed request: {0}")]
    Malformed(&'static str),
}
