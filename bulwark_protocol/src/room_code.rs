// Room codes: the human-chosen names that group connections into rooms.
//
// Clients send the raw string in `ClientMessage::JoinRoom`; the relay parses
// it into a `RoomCode` before touching the registry, so every code held by
// the registry is trimmed, non-empty, ASCII alphanumeric, and within the
// configured length. Codes compare case-sensitively ("abcd" and "ABCD" are
// different rooms).

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default maximum room code length, matching the game's room-code field.
pub const DEFAULT_MAX_ROOM_CODE_LEN: usize = 6;

/// Why a raw room code was refused.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RoomCodeError {
    #[error("room code is empty")]
    Empty,
    #[error("room code contains invalid character {0:?}")]
    InvalidCharacter(char),
    #[error("room code is {len} characters long (max {max})")]
    TooLong { len: usize, max: usize },
}

/// A validated room code.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomCode(String);

impl RoomCode {
    /// Validate a raw room code. Surrounding whitespace is ignored.
    pub fn parse(raw: &str, max_len: usize) -> Result<Self, RoomCodeError> {
        let code = raw.trim();
        if code.is_empty() {
            return Err(RoomCodeError::Empty);
        }
        if let Some(bad) = code.chars().find(|c| !c.is_ascii_alphanumeric()) {
            return Err(RoomCodeError::InvalidCharacter(bad));
        }
        // All ASCII at this point, so byte length is character count.
        if code.len() > max_len {
            return Err(RoomCodeError::TooLong {
                len: code.len(),
                max: max_len,
            });
        }
        Ok(Self(code.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
