//! # Duelroom
//!
//! Session server for two-player, turn-based game rooms.
//!
//! Players connect over WebSocket, pick a nickname, create or join a room,
//! flag themselves ready and play tic-tac-toe. The server owns every rule:
//! who sits where, whose turn it is, who won, and who gets told what.
//!
//! ## Layers
//!
//! - `duelroom-transport` moves frames over WebSocket
//! - `duelroom-protocol` defines the wire types and the JSON codec
//! - `duelroom-session` tracks live sessions and room topics
//! - `duelroom-room` holds the rooms, the game engine and the orchestrator
//!
//! This crate wires them into a runnable server.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use duelroom::prelude::*;
//!
//! # async fn start() -> Result<(), DuelroomError> {
//! let server = DuelroomServer::builder()
//!     .bind("0.0.0.0:8080")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod server;

pub use config::ServerConfig;
pub use error::DuelroomError;
pub use server::{DuelroomServer, DuelroomServerBuilder};

/// Everything needed to run a server or talk to one.
pub mod prelude {
    pub use crate::{DuelroomError, DuelroomServer, DuelroomServerBuilder, ServerConfig};

    pub use duelroom_protocol::{
        ClientMessage, Codec, Envelope, GameMessage, GameView, JsonCodec, Mark, MessageType,
        MovePayload, Payload, PlayerInfo, PlayerRole, RoomId, RoomListEntry, RoomSnapshot,
        RoomState, ServerMessage, SessionId,
    };
    pub use duelroom_room::{MatchOrchestrator, Notifier, RoomConfig, RoomError, TicTacToe, TurnGame};
    pub use duelroom_session::{SessionError, SessionHub};
    pub use duelroom_transport::TransportError;
}
