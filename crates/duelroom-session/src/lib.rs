//! Session management for Duelroom.
//!
//! This crate handles the lifecycle of connections:
//!
//! 1. **Identity**: every connection gets a random [`SessionId`] on connect
//! 2. **Delivery**: frames for a session queue on its own channel
//! 3. **Topics**: room broadcasts fan out to the sessions subscribed
//!
//! # How it fits in the stack
//!
//! ```text
//! Server / handler (above)  ← drains each session's channel into its socket
//!     ↕
//! Session Layer (this crate)  ← SessionHub, implements the room Notifier
//!     ↕
//! Room Layer (below)  ← decides what to say and to whom
//! ```
//!
//! [`SessionId`]: duelroom_protocol::SessionId

mod error;
mod hub;
mod session;

pub use error::SessionError;
pub use hub::SessionHub;
pub use session::{Outbound, Session};
