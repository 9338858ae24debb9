//! Transport layer for Duelroom.
//!
//! The room core never touches sockets. This crate turns a listening
//! socket into a stream of [`Connection`]s that move whole frames
//! (one JSON document per frame) in both directions.
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket transport via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnection, WebSocketTransport};

use std::fmt;

/// Process-local identifier for an accepted connection.
///
/// Used only for log correlation; session identity lives in the
/// session layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Accepts new incoming connections.
pub trait Transport: Send + Sync + 'static {
    type Connection: Connection;
    type Error: std::error::Error + Send + Sync;

    /// Waits for the next peer and completes its upgrade handshake.
    async fn accept(&mut self) -> Result<Self::Connection, Self::Error>;
}

/// A bidirectional frame pipe to one peer.
///
/// `send` and `recv` may be called concurrently from different tasks:
/// the connection handler reads frames while room broadcasts triggered
/// by other sessions are being written.
pub trait Connection: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync;

    /// Sends one frame to the peer.
    async fn send(&self, data: &[u8]) -> Result<(), Self::Error>;

    /// Receives the next frame from the peer.
    ///
    /// Returns `Ok(None)` when the peer closed the connection cleanly.
    /// Keepalive control frames come back as an empty frame, so callers
    /// can count them as activity.
    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Closes the connection.
    async fn close(&self) -> Result<(), Self::Error>;

    fn id(&self) -> ConnectionId;
}
