//! Error types for the session layer.

use duelroom_protocol::SessionId;

/// Errors that can occur while delivering to or tearing down a session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No session exists with this id.
    /// It either never connected or has already disconnected.
    #[error("session {0} not found")]
    NotFound(SessionId),

    /// The session's outbound channel is closed: its writer task has
    /// already stopped, so the frame can never reach the socket.
    #[error("session {0} is no longer receiving")]
    Closed(SessionId),
}
