//! Wire protocol for Duelroom.
//!
//! - **Types** ([`Envelope`], [`ClientMessage`], [`ServerMessage`],
//!   [`GameMessage`], [`RoomSnapshot`]): what travels between browser
//!   and server.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how frames become bytes.
//! - **Errors** ([`ProtocolError`]).
//!
//! The room core builds [`GameMessage`]s and [`RoomSnapshot`]s but never
//! serializes them; that happens at the connection boundary.
//!
//! ```text
//! Transport (bytes) → Protocol (Envelope) → Room core (operations)
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    ClientMessage, Envelope, GameMessage, GameView, Mark, MessageType,
    MovePayload, Payload, PlayerInfo, PlayerRole, RoomId, RoomListEntry,
    RoomSnapshot, RoomState, ServerMessage, SessionId,
};
