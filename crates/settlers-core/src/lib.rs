//! Settlers turn tracker - game document and turn state machine
//!
//! Each game lives in one JSON document. This crate types that document and
//! implements the rules that move it forward:
//! - whose turn it is and which stage the game is in
//! - the server-side dice roll a submitted turn has to match
//! - trade offers and responses
//! - seating and color assignment for a new game
//!
//! Persistence, identity and notifications belong to the host application.
//!
//! # Modules
//!
//! - [`document`]: The game document and its invariants
//! - [`stage`]: Stage and active player from the turn count
//! - [`roll`]: Dice and the roll gate
//! - [`trade`]: Trade offers and responses
//! - [`setup`]: Creating a game
//! - [`clock`]: Time sources

pub mod clock;
pub mod document;
pub mod error;
mod legacy;
pub mod roll;
pub mod setup;
pub mod stage;
pub mod trade;
#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use clock::{Clock, FixedClock, SystemClock};
pub use document::{Game, PendingTurn, Player, PlayerColor, Turn, UserId};
pub use error::{ErrorKind, GameError};
pub use roll::{roll_dice, TurnStart};
pub use setup::{assign_colors, new_game, parse_favorite_colors, BoardSetup, Profile};
pub use stage::{active_index, stage, Stage};
pub use trade::{Trade, TradeResponse, TRADE_WINDOW_HOURS};
