//! The room entity: two seats, a ready set, and the match between them.
//!
//! A `Room` holds no locks and does no I/O. The orchestrator wraps each one
//! in a mutex and drives it; everything here is plain state transitions
//! that can be tested synchronously.

use std::collections::BTreeSet;

use duelroom_protocol::{
    PlayerInfo, PlayerRole, RoomId, RoomListEntry, RoomSnapshot, RoomState, SessionId,
};
use rand::rngs::StdRng;

use crate::game::{TicTacToe, TurnGame};

/// Seats per room.
pub const MAX_PLAYERS: usize = 2;

/// The match slot of a room.
///
/// The public [`RoomState`] is derived from this, so a room can never
/// claim to be playing without holding a game.
#[derive(Debug, Clone)]
pub enum Match<G> {
    /// No game yet, or reset after a result or a departure.
    Idle,
    /// A game is running.
    InProgress(G),
    /// The last game ended; its final board stays visible until a rematch.
    Concluded(G),
}

impl<G> Match<G> {
    pub fn state(&self) -> RoomState {
        match self {
            Self::Idle => RoomState::Waiting,
            Self::InProgress(_) => RoomState::Playing,
            Self::Concluded(_) => RoomState::Finished,
        }
    }

    pub fn game(&self) -> Option<&G> {
        match self {
            Self::Idle => None,
            Self::InProgress(g) | Self::Concluded(g) => Some(g),
        }
    }
}

/// What happened to a move forwarded through [`Room::play`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// No game is running; nothing was forwarded.
    NotPlaying,
    /// The engine refused the move.
    Rejected,
    /// The move was applied and the game goes on.
    Continued,
    /// The move ended the game.
    Finished,
}

#[derive(Debug, Clone)]
struct Seat {
    session_id: SessionId,
    nickname: String,
}

/// A two-seat game room.
#[derive(Debug)]
pub struct Room<G = TicTacToe> {
    id: RoomId,
    name: String,
    host_session: SessionId,
    host_nickname: String,
    /// Host first, guest second.
    seats: Vec<Seat>,
    /// Always a subset of the seated sessions.
    ready: BTreeSet<SessionId>,
    game: Match<G>,
    /// Decides who moves first in each game played here.
    rng: StdRng,
    closed: bool,
}

impl<G: TurnGame> Room<G> {
    /// Opens a room with the host already seated.
    pub fn new(
        id: RoomId,
        name: impl Into<String>,
        host_session: SessionId,
        host_nickname: impl Into<String>,
        rng: StdRng,
    ) -> Self {
        let host_nickname = host_nickname.into();
        Self {
            id,
            name: name.into(),
            seats: vec![Seat {
                session_id: host_session.clone(),
                nickname: host_nickname.clone(),
            }],
            host_session,
            host_nickname,
            ready: BTreeSet::new(),
            game: Match::Idle,
            rng,
            closed: false,
        }
    }

    pub fn id(&self) -> &RoomId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn host_session(&self) -> &SessionId {
        &self.host_session
    }

    pub fn host_nickname(&self) -> &str {
        &self.host_nickname
    }

    pub fn state(&self) -> RoomState {
        self.game.state()
    }

    pub fn game(&self) -> Option<&G> {
        self.game.game()
    }

    pub fn player_count(&self) -> usize {
        self.seats.len()
    }

    pub fn is_full(&self) -> bool {
        self.player_count() >= MAX_PLAYERS
    }

    pub fn is_host(&self, session: &SessionId) -> bool {
        *session == self.host_session
    }

    pub fn contains(&self, session: &SessionId) -> bool {
        self.seat(session).is_some()
    }

    pub fn nickname_of(&self, session: &SessionId) -> Option<&str> {
        self.seat(session).map(|s| s.nickname.as_str())
    }

    pub fn role_of(&self, session: &SessionId) -> PlayerRole {
        if self.is_host(session) {
            PlayerRole::Host
        } else {
            PlayerRole::Guest
        }
    }

    /// Seated sessions, host first.
    pub fn members(&self) -> impl Iterator<Item = &SessionId> {
        self.seats.iter().map(|s| &s.session_id)
    }

    pub fn is_ready(&self, session: &SessionId) -> bool {
        self.ready.contains(session)
    }

    /// A closed room has been torn down by its host. It stays reachable
    /// only through handles cloned before the teardown, and every
    /// operation on it must be a no-op.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn close(&mut self) {
        self.closed = true;
    }

    /// Seats a guest. Does nothing if the room is full or the session is
    /// already seated.
    pub fn add_player(&mut self, session: SessionId, nickname: impl Into<String>) -> bool {
        if self.is_full() || self.contains(&session) {
            return false;
        }
        self.seats.push(Seat {
            session_id: session,
            nickname: nickname.into(),
        });
        true
    }

    /// Unseats a session and clears every ready flag. Returns the departed
    /// nickname.
    pub fn remove_player(&mut self, session: &SessionId) -> Option<String> {
        let index = self.seats.iter().position(|s| s.session_id == *session)?;
        let seat = self.seats.remove(index);
        self.ready.clear();
        Some(seat.nickname)
    }

    /// Marks or unmarks a seated session as ready.
    pub fn set_ready(&mut self, session: &SessionId, ready: bool) {
        if !self.contains(session) {
            return;
        }
        if ready {
            self.ready.insert(session.clone());
        } else {
            self.ready.remove(session);
        }
    }

    /// Both seats taken and both occupants ready.
    pub fn all_ready(&self) -> bool {
        self.player_count() == MAX_PLAYERS && self.ready.len() == MAX_PLAYERS
    }

    /// Starts a game if both seats are ready. Ready flags are consumed.
    pub fn try_start_game(&mut self) -> bool {
        if !self.all_ready() {
            return false;
        }
        let first = self.seats[0].session_id.clone();
        let second = self.seats[1].session_id.clone();
        self.game = Match::InProgress(G::start(first, second, &mut self.rng));
        self.ready.clear();
        true
    }

    /// Forwards a move to the running game.
    pub fn play(&mut self, cell: usize, session: &SessionId) -> MoveOutcome {
        let Match::InProgress(game) = &mut self.game else {
            return MoveOutcome::NotPlaying;
        };
        if !game.play(cell, session) {
            return MoveOutcome::Rejected;
        }
        if game.is_over() {
            self.conclude();
            MoveOutcome::Finished
        } else {
            MoveOutcome::Continued
        }
    }

    /// Ends a running game in favour of whoever stays. Returns `false` if
    /// no game was running.
    pub fn forfeit(&mut self, leaver: &SessionId) -> bool {
        let Match::InProgress(game) = &mut self.game else {
            return false;
        };
        game.forfeit(leaver);
        self.conclude();
        true
    }

    /// Drops the game and goes back to waiting.
    pub fn reset_for_rematch(&mut self) {
        self.game = Match::Idle;
    }

    fn conclude(&mut self) {
        if let Match::InProgress(game) = std::mem::replace(&mut self.game, Match::Idle) {
            self.game = Match::Concluded(game);
        }
        self.ready.clear();
    }

    fn seat(&self, session: &SessionId) -> Option<&Seat> {
        self.seats.iter().find(|s| s.session_id == *session)
    }

    /// The full externally visible state of the room.
    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            room_id: self.id.clone(),
            room_name: self.name.clone(),
            host_nickname: self.host_nickname.clone(),
            players: self
                .seats
                .iter()
                .map(|s| PlayerInfo {
                    session_id: s.session_id.clone(),
                    nickname: s.nickname.clone(),
                    role: self.role_of(&s.session_id),
                })
                .collect(),
            ready_session_ids: self.ready.iter().cloned().collect(),
            game: self.game.game().map(G::view),
            game_state: self.state(),
        }
    }

    /// The lobby row for this room.
    pub fn list_entry(&self) -> RoomListEntry {
        RoomListEntry {
            room_id: self.id.clone(),
            room_name: self.name().to_owned(),
            player_count: self.player_count(),
            host_nickname: self.host_nickname.clone(),
        }
    }
}
