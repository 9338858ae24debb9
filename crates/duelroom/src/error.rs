//! Unified error type for the Duelroom server.

use duelroom_protocol::ProtocolError;
use duelroom_room::RoomError;
use duelroom_session::SessionError;
use duelroom_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum DuelroomError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (unknown or closed session).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A room-level error (validation, conflicts, illegal moves).
    #[error(transparent)]
    Room(#[from] RoomError),

    /// Socket-level I/O outside the transport, e.g. reading the bound address.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
