//! Room registry: the room table plus the session → room index.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use duelroom_protocol::{RoomId, SessionId};
use tokio::sync::Mutex;

use crate::game::{TicTacToe, TurnGame};
use crate::{Room, RoomError};

/// A room shared between concurrent requests.
///
/// Each operation holds the lock for its whole read-modify-write, so two
/// requests against the same room are applied one after the other.
pub type SharedRoom<G = TicTacToe> = Arc<Mutex<Room<G>>>;

/// Tracks every live room and which room each session is in.
///
/// A session is in at most ONE room at a time (key invariant), enforced
/// by [`link_session`](Self::link_session) being an atomic
/// check-and-insert.
pub struct RoomRegistry<G: TurnGame = TicTacToe> {
    rooms: DashMap<RoomId, SharedRoom<G>>,
    sessions: DashMap<SessionId, RoomId>,
}

impl<G: TurnGame> RoomRegistry<G> {
    pub fn new() -> Self {
        Self {
            rooms: DashMap::new(),
            sessions: DashMap::new(),
        }
    }

    /// Registers a room and returns the shared handle to it.
    pub fn create(&self, room: Room<G>) -> SharedRoom<G> {
        let room_id = room.id().clone();
        let shared = Arc::new(Mutex::new(room));
        self.rooms.insert(room_id, Arc::clone(&shared));
        shared
    }

    pub fn get(&self, room_id: &RoomId) -> Option<SharedRoom<G>> {
        self.rooms.get(room_id).map(|r| Arc::clone(r.value()))
    }

    pub fn contains(&self, room_id: &RoomId) -> bool {
        self.rooms.contains_key(room_id)
    }

    /// Handles to every room registered at the time of the call.
    ///
    /// Rooms created or deleted while the caller walks the list are not
    /// reflected, and no map shard stays locked while it does.
    pub fn list_all(&self) -> Vec<SharedRoom<G>> {
        self.rooms.iter().map(|r| Arc::clone(r.value())).collect()
    }

    /// Removes a room. Deleting an unknown room is a no-op.
    pub fn delete(&self, room_id: &RoomId) -> Option<SharedRoom<G>> {
        self.rooms.remove(room_id).map(|(_, room)| room)
    }

    /// Links a session to a room, failing if it is already linked anywhere.
    pub fn link_session(&self, session: SessionId, room_id: RoomId) -> Result<(), RoomError> {
        match self.sessions.entry(session) {
            Entry::Occupied(_) => Err(RoomError::AlreadyInRoom),
            Entry::Vacant(slot) => {
                slot.insert(room_id);
                Ok(())
            }
        }
    }

    /// Removes a session's link, returning the room it pointed at.
    pub fn unlink_session(&self, session: &SessionId) -> Option<RoomId> {
        self.sessions.remove(session).map(|(_, room_id)| room_id)
    }

    /// Removes a session's link only if it still points at `room_id`.
    pub fn unlink_session_from(&self, session: &SessionId, room_id: &RoomId) -> bool {
        self.sessions
            .remove_if(session, |_, linked| linked == room_id)
            .is_some()
    }

    pub fn room_of(&self, session: &SessionId) -> Option<RoomId> {
        self.sessions.get(session).map(|r| r.value().clone())
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

impl<G: TurnGame> Default for RoomRegistry<G> {
    fn default() -> Self {
        Self::new()
    }
}
