//! Room limits and the input validation built on them.

use serde::{Deserialize, Serialize};

use crate::RoomError;

// ---------------------------------------------------------------------------
// RoomConfig
// ---------------------------------------------------------------------------

/// Length limits applied to everything a player types.
///
/// All lengths are counted in characters, not bytes, so a nickname of
/// fifteen Hangul syllables is as valid as one of fifteen ASCII letters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomConfig {
    /// Longest accepted nickname.
    pub max_nickname_len: usize,

    /// Longest accepted room name.
    pub max_room_name_len: usize,

    /// Longest accepted chat message.
    pub max_chat_len: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            max_nickname_len: 15,
            max_room_name_len: 50,
            max_chat_len: 255,
        }
    }
}

impl RoomConfig {
    /// Accepts a nickname that is not blank and fits the limit.
    pub fn validate_nickname<'a>(&self, nickname: &'a str) -> Result<&'a str, RoomError> {
        if fits(nickname, self.max_nickname_len) {
            Ok(nickname)
        } else {
            Err(RoomError::InvalidNickname {
                max: self.max_nickname_len,
            })
        }
    }

    /// Accepts a room name that is not blank and fits the limit.
    pub fn validate_room_name<'a>(&self, name: &'a str) -> Result<&'a str, RoomError> {
        if fits(name, self.max_room_name_len) {
            Ok(name)
        } else {
            Err(RoomError::InvalidRoomName {
                max: self.max_room_name_len,
            })
        }
    }

    /// Chat may be empty; only the length is bounded.
    pub fn validate_chat<'a>(&self, text: &'a str) -> Result<&'a str, RoomError> {
        if text.chars().count() <= self.max_chat_len {
            Ok(text)
        } else {
            Err(RoomError::InvalidChat {
                max: self.max_chat_len,
            })
        }
    }
}

fn fits(value: &str, max: usize) -> bool {
    !value.trim().is_empty() && value.chars().count() <= max
}
