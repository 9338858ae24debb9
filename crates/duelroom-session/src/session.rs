//! Session types: the server's record of one live connection.
//!
//! A "session" lives exactly as long as its connection. It tracks:
//! - WHO the connection is (`SessionId`, issued by the server)
//! - WHERE to deliver frames for it (an unbounded outbound channel)
//! - WHICH room topics it currently listens to

use std::collections::HashSet;

use duelroom_protocol::{RoomId, ServerMessage, SessionId};
use tokio::sync::mpsc;

/// Channel half the connection handler drains into its socket.
pub type Outbound = mpsc::UnboundedReceiver<ServerMessage>;

/// A single connected session.
#[derive(Debug)]
pub struct Session {
    /// Opaque id the client learns from its first frame.
    pub id: SessionId,

    /// Frames queued here are written to the socket by the handler's
    /// writer task, in order.
    ///
    /// The channel is unbounded so a room broadcast never waits on a slow
    /// reader while it holds the room lock.
    pub(crate) outbound: mpsc::UnboundedSender<ServerMessage>,

    /// Room topics this session receives broadcasts for.
    ///
    /// In practice at most one, since a session is in at most one room.
    pub(crate) topics: HashSet<RoomId>,
}

impl Session {
    pub(crate) fn new(id: SessionId) -> (Self, Outbound) {
        let (outbound, rx) = mpsc::unbounded_channel();
        let session = Self {
            id,
            outbound,
            topics: HashSet::new(),
        };
        (session, rx)
    }

    /// Returns `true` if this session listens to `room_id`'s topic.
    pub fn is_subscribed(&self, room_id: &RoomId) -> bool {
        self.topics.contains(room_id)
    }
}
