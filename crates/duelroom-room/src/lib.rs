//! Rooms, matches, and the rules that govern them for Duelroom.
//!
//! A room seats exactly two sessions, a host and a guest. Once both flag
//! themselves ready a game starts; when it ends they can ready up for a
//! rematch. Losing the host closes the room, losing the guest reopens
//! the seat.
//!
//! # Key types
//!
//! - [`TurnGame`]: the seam a two-player turn game implements
//! - [`TicTacToe`]: the built-in 3×3 game
//! - [`Room`]: one room's seats, ready flags, and match
//! - [`RoomRegistry`]: live rooms and the session → room index
//! - [`MatchOrchestrator`]: every operation a session can trigger
//! - [`Notifier`]: how the orchestrator reaches sessions

mod config;
mod error;
mod game;
mod orchestrator;
mod registry;
mod room;

pub use config::RoomConfig;
pub use error::RoomError;
pub use game::{TicTacToe, TurnGame};
pub use orchestrator::{Command, MatchOrchestrator, Notifier, SYSTEM_SENDER};
pub use registry::{RoomRegistry, SharedRoom};
pub use room::{MAX_PLAYERS, Match, MoveOutcome, Room};
