//! Errors raised by game document operations.

use crate::document::PlayerColor;
use thiserror::Error;

/// Broad class of a [`GameError`], used by callers to pick a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or out-of-policy input
    Validation,
    /// No authenticated user
    Unauthenticated,
    /// Authenticated, but not allowed to do this
    Forbidden,
}

/// Errors that can occur when creating or mutating a game
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    #[error("You must select 3 or 4 players to begin (got {0})")]
    InvalidPlayerCount(usize),

    #[error("Not enough colors for {0} players")]
    ColorsExhausted(usize),

    #[error("Color {0} is used by more than one player")]
    DuplicateColor(PlayerColor),

    #[error("Submitted roll {submitted:?} does not match the server roll")]
    RollMismatch { submitted: Option<u8> },

    #[error("No roll is pending")]
    NoRollPending,

    #[error("No trade offer is open")]
    NoTradeOpen,

    #[error("Malformed game document: {0}")]
    Malformed(String),

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Not your turn")]
    NotYourTurn,

    #[error("Not a player in this game")]
    NotAPlayer,
}

impl GameError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GameError::Unauthenticated => ErrorKind::Unauthenticated,
            GameError::NotYourTurn | GameError::NotAPlayer => ErrorKind::Forbidden,
            _ => ErrorKind::Validation,
        }
    }

    /// HTTP-style status code for this error
    pub fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::Validation => 400,
            ErrorKind::Unauthenticated => 401,
            ErrorKind::Forbidden => 403,
        }
    }
}

impl From<serde_json::Error> for GameError {
    fn from(err: serde_json::Error) -> Self {
        GameError::Malformed(err.to_string())
    }
}
