//! Match orchestrator: every room operation a session can trigger.
//!
//! The orchestrator validates input, drives the [`Room`] state machine
//! under the room's lock, and decides which notifications go out. It
//! never touches a socket; delivery goes through a [`Notifier`] that the
//! session layer supplies.

use std::sync::{Arc, Mutex, PoisonError};

use duelroom_protocol::{
    GameMessage, MessageType, RoomId, RoomSnapshot, RoomState, ServerMessage, SessionId,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::OwnedMutexGuard;

use crate::game::{TicTacToe, TurnGame};
use crate::{MoveOutcome, Room, RoomConfig, RoomError, RoomRegistry};

/// Sender name on messages the server authors itself.
pub const SYSTEM_SENDER: &str = "SYSTEM";

// ---------------------------------------------------------------------------
// Notifier
// ---------------------------------------------------------------------------

/// Outbound delivery, implemented by whoever owns the connections.
///
/// Both sends are fire-and-forget: a session that has gone away simply
/// misses the message.
pub trait Notifier: Send + Sync + 'static {
    /// Delivers a frame to one session only.
    fn send_to_session(&self, session: &SessionId, message: ServerMessage);

    /// Publishes a message on a room's broadcast topic.
    fn send_to_room(&self, room_id: &RoomId, message: GameMessage);

    /// Called once `session` has been seated in `room_id`, before the
    /// room announces it.
    fn subscribe(&self, _session: &SessionId, _room_id: &RoomId) {}

    /// Called once `session` has left `room_id`, after the last broadcast
    /// it should still see.
    fn unsubscribe(&self, _session: &SessionId, _room_id: &RoomId) {}
}

impl<N: Notifier + ?Sized> Notifier for Arc<N> {
    fn send_to_session(&self, session: &SessionId, message: ServerMessage) {
        (**self).send_to_session(session, message);
    }

    fn send_to_room(&self, room_id: &RoomId, message: GameMessage) {
        (**self).send_to_room(room_id, message);
    }

    fn subscribe(&self, session: &SessionId, room_id: &RoomId) {
        (**self).subscribe(session, room_id);
    }

    fn unsubscribe(&self, session: &SessionId, room_id: &RoomId) {
        (**self).unsubscribe(session, room_id);
    }
}

// ---------------------------------------------------------------------------
// Command
// ---------------------------------------------------------------------------

/// An in-room request, decoded from the message a client sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Chat(String),
    /// `true` for READY, `false` for UNREADY.
    Ready(bool),
    Move(usize),
    Kick(SessionId),
}

impl TryFrom<GameMessage> for Command {
    type Error = RoomError;

    fn try_from(message: GameMessage) -> Result<Self, RoomError> {
        match message.kind {
            MessageType::Chat => message
                .content
                .map(Self::Chat)
                .ok_or(RoomError::Malformed("CHAT requires content")),
            MessageType::Ready => Ok(Self::Ready(true)),
            MessageType::Unready => Ok(Self::Ready(false)),
            MessageType::Move => message
                .mv
                .map(|mv| Self::Move(mv.index))
                .ok_or(RoomError::Malformed("MOVE requires a move index")),
            MessageType::Kick => message
                .kick_target
                .map(Self::Kick)
                .ok_or(RoomError::Malformed("KICK requires a kickTarget")),
            other => Err(RoomError::UnsupportedMessage(other)),
        }
    }
}

// ---------------------------------------------------------------------------
// MatchOrchestrator
// ---------------------------------------------------------------------------

/// Runs rooms on behalf of sessions.
///
/// Operations on one room are serialized by that room's lock; operations
/// on different rooms run in parallel. Rejections the caller should hear
/// about are sent to the caller alone as an ERROR; everything else that
/// does not apply (stale room ids, non-members, non-hosts) is dropped.
pub struct MatchOrchestrator<N, G: TurnGame = TicTacToe> {
    registry: RoomRegistry<G>,
    notifier: N,
    config: RoomConfig,
    /// Seeds each new room's own RNG.
    seeds: Mutex<StdRng>,
}

impl<N: Notifier> MatchOrchestrator<N> {
    /// A tic-tac-toe orchestrator seeded from the OS.
    pub fn new(notifier: N) -> Self {
        Self::from_rng(notifier, StdRng::from_rng(&mut rand::rng()))
    }

    /// A tic-tac-toe orchestrator whose role assignments are reproducible.
    pub fn with_seed(notifier: N, seed: u64) -> Self {
        Self::from_rng(notifier, StdRng::seed_from_u64(seed))
    }
}

impl<N: Notifier, G: TurnGame> MatchOrchestrator<N, G> {
    /// An orchestrator for any turn game, seeded from `seeds`.
    pub fn from_rng(notifier: N, seeds: StdRng) -> Self {
        Self {
            registry: RoomRegistry::new(),
            notifier,
            config: RoomConfig::default(),
            seeds: Mutex::new(seeds),
        }
    }

    pub fn with_config(mut self, config: RoomConfig) -> Self {
        self.config = config;
        self
    }

    pub fn registry(&self) -> &RoomRegistry<G> {
        &self.registry
    }

    /// The room a session is currently linked to.
    pub fn room_of(&self, session: &SessionId) -> Option<RoomId> {
        self.registry.room_of(session)
    }

    /// The current state of a live room.
    pub async fn snapshot(&self, room_id: &RoomId) -> Option<RoomSnapshot> {
        let shared = self.registry.get(room_id)?;
        let room = shared.lock().await;
        (!room.is_closed()).then(|| room.snapshot())
    }

    // -- lobby --------------------------------------------------------------

    /// Sends the caller one lobby row per live room.
    pub async fn list_rooms(&self, caller: &SessionId) {
        let mut rooms = Vec::new();
        for shared in self.registry.list_all() {
            let room = shared.lock().await;
            if !room.is_closed() {
                rooms.push(room.list_entry());
            }
        }
        self.notifier
            .send_to_session(caller, ServerMessage::RoomList { rooms });
    }

    /// Opens a room with the caller as host.
    pub async fn create_room(&self, caller: &SessionId, room_name: &str, nickname: &str) {
        let result = self.try_create_room(caller, room_name, nickname);
        self.report(caller, result);
    }

    fn try_create_room(
        &self,
        caller: &SessionId,
        room_name: &str,
        nickname: &str,
    ) -> Result<(), RoomError> {
        let nickname = self.config.validate_nickname(nickname)?;
        let room_name = self.config.validate_room_name(room_name)?;

        let room_id = RoomId::generate();
        self.registry.link_session(caller.clone(), room_id.clone())?;

        let rng = self.room_rng();
        let room = Room::new(room_id.clone(), room_name, caller.clone(), nickname, rng);
        let snapshot = room.snapshot();
        self.registry.create(room);

        self.notifier.subscribe(caller, &room_id);
        self.notifier
            .send_to_session(caller, ServerMessage::RoomCreated { room: snapshot });
        tracing::info!(%room_id, session_id = %caller, room_name, "room created");
        Ok(())
    }

    /// Seats the caller as guest of an existing room.
    pub async fn join_room(&self, caller: &SessionId, room_id: &RoomId, nickname: &str) {
        let result = self.try_join_room(caller, room_id, nickname).await;
        self.report(caller, result);
    }

    async fn try_join_room(
        &self,
        caller: &SessionId,
        room_id: &RoomId,
        nickname: &str,
    ) -> Result<(), RoomError> {
        let nickname = self.config.validate_nickname(nickname)?;
        let shared = self
            .registry
            .get(room_id)
            .ok_or_else(|| RoomError::NotFound(room_id.clone()))?;
        if self.registry.room_of(caller).is_some() {
            return Err(RoomError::AlreadyInRoom);
        }

        let mut room = shared.lock().await;
        // The host may have closed the room while we waited for the lock.
        if room.is_closed() {
            return Err(RoomError::NotFound(room_id.clone()));
        }
        if room.is_full() {
            return Err(RoomError::RoomFull(room_id.clone()));
        }
        self.registry.link_session(caller.clone(), room_id.clone())?;
        room.add_player(caller.clone(), nickname);

        let snapshot = room.snapshot();
        self.notifier.subscribe(caller, room_id);
        self.notifier.send_to_session(
            caller,
            ServerMessage::RoomJoined {
                room: snapshot.clone(),
            },
        );
        self.broadcast(
            room_id,
            GameMessage::new(MessageType::Join)
                .with_sender(nickname)
                .with_content(format!("{nickname} joined the room."))
                .with_state(snapshot),
        );
        tracing::info!(%room_id, session_id = %caller, nickname, "player joined");
        Ok(())
    }

    // -- in-room requests ---------------------------------------------------

    /// Routes a raw in-room message. Requests naming a room other than the
    /// caller's own are dropped before their payload is looked at.
    pub async fn handle_room_message(
        &self,
        caller: &SessionId,
        room_id: &RoomId,
        message: GameMessage,
    ) {
        if !self.is_linked(caller, room_id) {
            tracing::debug!(%room_id, session_id = %caller, "request for a room the session is not in, ignoring");
            return;
        }
        match Command::try_from(message) {
            Ok(command) => self.dispatch(caller, room_id, command).await,
            Err(error) => self.report(caller, Err(error)),
        }
    }

    pub async fn dispatch(&self, caller: &SessionId, room_id: &RoomId, command: Command) {
        if !self.is_linked(caller, room_id) {
            tracing::debug!(%room_id, session_id = %caller, "request for a room the session is not in, ignoring");
            return;
        }
        match command {
            Command::Chat(text) => self.chat(caller, text).await,
            Command::Ready(ready) => self.set_ready(caller, ready).await,
            Command::Move(cell) => self.make_move(caller, cell).await,
            Command::Kick(target) => self.kick(caller, &target).await,
        }
    }

    /// Flags the caller ready or not, and starts a game once both are.
    pub async fn set_ready(&self, caller: &SessionId, ready: bool) {
        let Some((room_id, mut room)) = self.lock_member_room(caller).await else {
            tracing::debug!(session_id = %caller, "ready toggle outside a room, ignoring");
            return;
        };

        room.set_ready(caller, ready);
        tracing::debug!(%room_id, session_id = %caller, ready = room.is_ready(caller), "ready toggled");
        self.broadcast(
            &room_id,
            GameMessage::new(MessageType::Ready)
                .with_sender(nickname_of(&room, caller))
                .with_state(room.snapshot()),
        );

        // Ready flags set mid-game are kept but cannot restart the game.
        if room.all_ready() && !room.state().is_playing() {
            if room.state() == RoomState::Finished {
                room.reset_for_rematch();
            }
            if room.try_start_game() {
                self.announce_start(&room_id, &room);
            }
        }
    }

    fn announce_start(&self, room_id: &RoomId, room: &Room<G>) {
        let Some(game) = room.game() else {
            return;
        };
        let first = game.current_turn();
        self.broadcast(
            room_id,
            GameMessage::new(MessageType::GameStart)
                .with_sender(SYSTEM_SENDER)
                .with_content(format!(
                    "Game started! [{}] {} moves first.",
                    room.role_of(first),
                    nickname_of(room, first)
                ))
                .with_state(room.snapshot()),
        );
        tracing::info!(%room_id, first_player = %first, "game started");
    }

    /// Plays a cell for the caller.
    pub async fn make_move(&self, caller: &SessionId, cell: usize) {
        let result = self.try_move(caller, cell).await;
        self.report(caller, result);
    }

    async fn try_move(&self, caller: &SessionId, cell: usize) -> Result<(), RoomError> {
        let Some((room_id, mut room)) = self.lock_member_room(caller).await else {
            tracing::debug!(session_id = %caller, cell, "move from a non-member, ignoring");
            return Ok(());
        };

        match room.play(cell, caller) {
            MoveOutcome::NotPlaying => {
                tracing::debug!(%room_id, session_id = %caller, "move with no game running, ignoring");
            }
            MoveOutcome::Rejected => return Err(RoomError::IllegalMove),
            MoveOutcome::Continued => {
                self.broadcast(
                    &room_id,
                    GameMessage::new(MessageType::GameUpdate)
                        .with_sender(nickname_of(&room, caller))
                        .with_move(cell)
                        .with_state(room.snapshot()),
                );
            }
            MoveOutcome::Finished => {
                let content = match room.game().and_then(|g| g.winner()) {
                    Some(winner) => format!("{} wins!", nickname_of(&room, winner)),
                    None => "Draw!".to_owned(),
                };
                tracing::info!(%room_id, result = %content, "game finished");
                self.broadcast(
                    &room_id,
                    GameMessage::new(MessageType::GameEnd)
                        .with_sender(nickname_of(&room, caller))
                        .with_content(content)
                        .with_move(cell)
                        .with_state(room.snapshot()),
                );
            }
        }
        Ok(())
    }

    /// Relays a chat line to the caller's room.
    pub async fn chat(&self, caller: &SessionId, text: String) {
        let result = self.try_chat(caller, text).await;
        self.report(caller, result);
    }

    async fn try_chat(&self, caller: &SessionId, text: String) -> Result<(), RoomError> {
        let Some((room_id, room)) = self.lock_member_room(caller).await else {
            tracing::debug!(session_id = %caller, "chat outside a room, ignoring");
            return Ok(());
        };
        self.config.validate_chat(&text)?;

        self.broadcast(
            &room_id,
            GameMessage::new(MessageType::Chat)
                .with_sender(nickname_of(&room, caller))
                .with_role(room.role_of(caller))
                .with_content(text),
        );
        Ok(())
    }

    /// Removes the guest at the host's request.
    pub async fn kick(&self, caller: &SessionId, target: &SessionId) {
        let result = self.try_kick(caller, target).await;
        self.report(caller, result);
    }

    async fn try_kick(&self, caller: &SessionId, target: &SessionId) -> Result<(), RoomError> {
        let Some((room_id, mut room)) = self.lock_member_room(caller).await else {
            tracing::debug!(session_id = %caller, "kick outside a room, ignoring");
            return Ok(());
        };
        if !room.is_host(caller) {
            tracing::debug!(%room_id, session_id = %caller, "kick from a non-host, ignoring");
            return Ok(());
        }
        if room.state().is_playing() {
            return Err(RoomError::KickDuringGame);
        }
        if target == caller {
            tracing::debug!(%room_id, "host tried to kick themselves, ignoring");
            return Ok(());
        }
        let Some(target_nickname) = room.remove_player(target) else {
            tracing::debug!(%room_id, %target, "kick target not in room, ignoring");
            return Ok(());
        };

        self.registry.unlink_session_from(target, &room_id);
        room.reset_for_rematch();

        self.broadcast(
            &room_id,
            GameMessage::new(MessageType::Kick)
                .with_sender(room.host_nickname())
                .with_content(format!("{target_nickname} was kicked by the host."))
                .with_kick_target(target.clone())
                .with_state(room.snapshot()),
        );
        self.notifier.unsubscribe(target, &room_id);
        tracing::info!(%room_id, %target, "player kicked");
        Ok(())
    }

    // -- departures ---------------------------------------------------------

    /// Cleans up after a session whose connection ended.
    ///
    /// Safe to call more than once: only the first call finds the
    /// session's link and does any work.
    pub async fn disconnect(&self, session: &SessionId) {
        let Some(room_id) = self.registry.unlink_session(session) else {
            return;
        };
        let Some(shared) = self.registry.get(&room_id) else {
            return;
        };
        let mut room = shared.lock().await;
        if room.is_closed() || !room.contains(session) {
            return;
        }

        if room.is_host(session) {
            self.close_room(&room_id, &mut room);
        } else {
            self.leave_room(&room_id, &mut room, session);
        }
    }

    /// The host left: tear the room down and release the guest.
    fn close_room(&self, room_id: &RoomId, room: &mut Room<G>) {
        room.close();
        self.registry.delete(room_id);

        let members: Vec<SessionId> = room.members().cloned().collect();
        for member in &members {
            self.registry.unlink_session_from(member, room_id);
        }

        self.broadcast(
            room_id,
            GameMessage::new(MessageType::Leave)
                .with_sender(SYSTEM_SENDER)
                .with_content("The host left and the room was closed."),
        );
        for member in &members {
            self.notifier.unsubscribe(member, room_id);
        }
        tracing::info!(%room_id, host = %room.host_session(), "host left, room closed");
    }

    /// The guest left: forfeit any running game and reopen the seat.
    fn leave_room(&self, room_id: &RoomId, room: &mut Room<G>, session: &SessionId) {
        if room.forfeit(session) {
            let winner = room.game().and_then(|g| g.winner()).cloned();
            let winner = winner
                .map(|w| nickname_of(room, &w))
                .unwrap_or_default();
            self.broadcast(
                room_id,
                GameMessage::new(MessageType::GameEnd)
                    .with_sender(SYSTEM_SENDER)
                    .with_content(format!("Opponent left. {winner} wins!"))
                    .with_state(room.snapshot()),
            );
            tracing::info!(%room_id, session_id = %session, "game forfeited");
        }

        let nickname = room.remove_player(session).unwrap_or_default();
        room.reset_for_rematch();

        self.broadcast(
            room_id,
            GameMessage::new(MessageType::Leave)
                .with_sender(nickname.as_str())
                .with_content(format!("{nickname} left the room."))
                .with_state(room.snapshot()),
        );
        self.notifier.unsubscribe(session, room_id);
        tracing::info!(%room_id, session_id = %session, "player left");
    }

    // -- helpers ------------------------------------------------------------

    /// Draws a fresh RNG for a new room from the shared seed source.
    fn room_rng(&self) -> StdRng {
        let mut seeds = self.seeds.lock().unwrap_or_else(PoisonError::into_inner);
        StdRng::from_rng(&mut *seeds)
    }

    fn is_linked(&self, caller: &SessionId, room_id: &RoomId) -> bool {
        self.registry.room_of(caller).as_ref() == Some(room_id)
    }

    /// Locks the live room `caller` is seated in.
    async fn lock_member_room(
        &self,
        caller: &SessionId,
    ) -> Option<(RoomId, OwnedMutexGuard<Room<G>>)> {
        let room_id = self.registry.room_of(caller)?;
        let room = self.registry.get(&room_id)?.lock_owned().await;
        (!room.is_closed() && room.contains(caller)).then_some((room_id, room))
    }

    fn broadcast(&self, room_id: &RoomId, message: GameMessage) {
        self.notifier
            .send_to_room(room_id, message.with_room(room_id.clone()));
    }

    fn report(&self, caller: &SessionId, result: Result<(), RoomError>) {
        if let Err(error) = result {
            tracing::debug!(session_id = %caller, %error, "request rejected");
            self.notifier.send_to_session(
                caller,
                ServerMessage::Error {
                    message: GameMessage::error(error.to_string()),
                },
            );
        }
    }
}

fn nickname_of<G: TurnGame>(room: &Room<G>, session: &SessionId) -> String {
    room.nickname_of(session).unwrap_or_default().to_owned()
}
