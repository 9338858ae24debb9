//! The session hub: every live session and the room topics they follow.
//!
//! The hub is the delivery half of the server. The room layer decides
//! *what* to say and to *whom* (one session, or everyone on a room's
//! topic); the hub turns that into frames on per-session channels that
//! the connection handlers drain.
//!
//! # Concurrency note
//!
//! Both maps are `DashMap`s so connection handlers and room operations
//! can touch them from any task. No method holds a guard on one map while
//! locking the other, which rules out lock-order deadlocks between them.

use std::collections::HashSet;

use dashmap::DashMap;
use duelroom_protocol::{GameMessage, RoomId, ServerMessage, SessionId};
use duelroom_room::Notifier;

use crate::session::Outbound;
use crate::{Session, SessionError};

/// Tracks every connected session and every room topic.
///
/// ## Lifecycle
///
/// ```text
/// connect() ──→ subscribe() ──→ unsubscribe() ──→ disconnect()
///     │              │                                  │
///     ▼              ▼                                  ▼
/// [Session frame] [room broadcasts delivered]     [channel closed]
/// ```
#[derive(Default)]
pub struct SessionHub {
    /// All live sessions, keyed by id.
    sessions: DashMap<SessionId, Session>,

    /// Subscribers per room topic. Kept in sync with `Session::topics`;
    /// a topic with no subscribers is removed.
    topics: DashMap<RoomId, HashSet<SessionId>>,
}

impl SessionHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new connection under a fresh random id.
    ///
    /// The first frame on the returned channel is always
    /// [`ServerMessage::Session`], telling the client who it is.
    pub fn connect(&self) -> (SessionId, Outbound) {
        let id = SessionId::generate();
        let (session, rx) = Session::new(id.clone());
        // Cannot fail: we hold the receiver.
        let _ = session.outbound.send(ServerMessage::Session {
            session_id: id.clone(),
        });
        self.sessions.insert(id.clone(), session);
        tracing::info!(session_id = %id, "session connected");
        (id, rx)
    }

    /// Removes a session and all of its topic subscriptions.
    ///
    /// Dropping the session closes its outbound channel, which ends the
    /// handler's writer task once the queued frames are flushed.
    pub fn disconnect(&self, session: &SessionId) -> Result<(), SessionError> {
        let (_, removed) = self
            .sessions
            .remove(session)
            .ok_or_else(|| SessionError::NotFound(session.clone()))?;
        for room_id in &removed.topics {
            self.drop_subscriber(room_id, session);
        }
        tracing::info!(session_id = %session, "session disconnected");
        Ok(())
    }

    /// Queues a frame for one session.
    pub fn send(&self, session: &SessionId, message: ServerMessage) -> Result<(), SessionError> {
        let entry = self
            .sessions
            .get(session)
            .ok_or_else(|| SessionError::NotFound(session.clone()))?;
        entry
            .outbound
            .send(message)
            .map_err(|_| SessionError::Closed(session.clone()))
    }

    /// Queues a room broadcast for every subscriber of `room_id`.
    /// Returns how many sessions it was queued for.
    pub fn publish(&self, room_id: &RoomId, message: GameMessage) -> usize {
        let subscribers = self.subscribers(room_id);
        let mut delivered = 0;
        for session in &subscribers {
            let frame = ServerMessage::Room {
                room_id: room_id.clone(),
                message: message.clone(),
            };
            match self.send(session, frame) {
                Ok(()) => delivered += 1,
                Err(error) => {
                    tracing::debug!(%room_id, %error, "dropping room broadcast");
                }
            }
        }
        delivered
    }

    /// Adds `session` to `room_id`'s topic. Unknown sessions are ignored.
    pub fn add_subscription(&self, session: &SessionId, room_id: &RoomId) {
        let Some(mut entry) = self.sessions.get_mut(session) else {
            return;
        };
        entry.topics.insert(room_id.clone());
        drop(entry);

        self.topics
            .entry(room_id.clone())
            .or_default()
            .insert(session.clone());
        tracing::debug!(session_id = %session, %room_id, "subscribed");
    }

    /// Removes `session` from `room_id`'s topic.
    pub fn remove_subscription(&self, session: &SessionId, room_id: &RoomId) {
        if let Some(mut entry) = self.sessions.get_mut(session) {
            entry.topics.remove(room_id);
        }
        self.drop_subscriber(room_id, session);
        tracing::debug!(session_id = %session, %room_id, "unsubscribed");
    }

    /// Sessions currently following `room_id`.
    pub fn subscribers(&self, room_id: &RoomId) -> Vec<SessionId> {
        self.topics
            .get(room_id)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn is_connected(&self, session: &SessionId) -> bool {
        self.sessions.contains_key(session)
    }

    /// Returns `true` if `session` follows `room_id`'s topic.
    pub fn is_subscribed(&self, session: &SessionId, room_id: &RoomId) -> bool {
        self.sessions
            .get(session)
            .is_some_and(|s| s.is_subscribed(room_id))
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Number of topics with at least one subscriber.
    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }

    fn drop_subscriber(&self, room_id: &RoomId, session: &SessionId) {
        if let Some(mut subscribers) = self.topics.get_mut(room_id) {
            subscribers.remove(session);
        }
        self.topics.remove_if(room_id, |_, subscribers| subscribers.is_empty());
    }
}

impl Notifier for SessionHub {
    fn send_to_session(&self, session: &SessionId, message: ServerMessage) {
        if let Err(error) = self.send(session, message) {
            tracing::debug!(%error, "dropping direct message");
        }
    }

    fn send_to_room(&self, room_id: &RoomId, message: GameMessage) {
        self.publish(room_id, message);
    }

    fn subscribe(&self, session: &SessionId, room_id: &RoomId) {
        self.add_subscription(session, room_id);
    }

    fn unsubscribe(&self, session: &SessionId, room_id: &RoomId) {
        self.remove_subscription(session, room_id);
    }
}

// =========================================================================
// Tests
// =========================================================================
