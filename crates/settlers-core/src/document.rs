//! The per-game JSON document.
//!
//! A game is stored as a single JSON object. This module gives that object a
//! typed shape and checks it on the way in:
//! - `players`: seating order, fixed at creation
//! - `turns`: append-only history of played turns
//! - `nextRoll`: absent, `null` (placement turn) or the roll the next turn must match
//! - `tradeOffers`: the open trade, if any
//! - `harbors`, `grid`, `layout`: board setup, never touched after creation
//! - `isSync`: client sync flag, carried but not interpreted
//!
//! Keys this crate does not know about are kept as-is so that a load/save
//! cycle never drops data written by the client.

use crate::error::GameError;
use crate::legacy;
use crate::trade::Trade;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use serde_with::rust::double_option;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

/// Identifier of an authenticated user
pub type UserId = i64;

/// Fewest players a stored document may have
pub const MIN_SEATS: usize = 3;

/// Most players a stored document may have (one per color)
pub const MAX_SEATS: usize = 6;

/// Layout used when a document doesn't name one
pub const DEFAULT_LAYOUT: &str = "standard34";

/// Player color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerColor {
    Red,
    Blue,
    Orange,
    White,
    Green,
    Brown,
}

impl PlayerColor {
    /// Colors used for games of up to four players
    pub const BASE: [PlayerColor; 4] = [
        PlayerColor::Red,
        PlayerColor::Blue,
        PlayerColor::Orange,
        PlayerColor::White,
    ];

    /// Extra colors for five and six player games
    pub const EXTENSION: [PlayerColor; 2] = [PlayerColor::Green, PlayerColor::Brown];

    pub fn as_str(&self) -> &'static str {
        match self {
            PlayerColor::Red => "red",
            PlayerColor::Blue => "blue",
            PlayerColor::Orange => "orange",
            PlayerColor::White => "white",
            PlayerColor::Green => "green",
            PlayerColor::Brown => "brown",
        }
    }
}

impl fmt::Display for PlayerColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlayerColor {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "red" => Ok(PlayerColor::Red),
            "blue" => Ok(PlayerColor::Blue),
            "orange" => Ok(PlayerColor::Orange),
            "white" => Ok(PlayerColor::White),
            "green" => Ok(PlayerColor::Green),
            "brown" => Ok(PlayerColor::Brown),
            other => Err(GameError::Malformed(format!("unknown color '{}'", other))),
        }
    }
}

/// A seat at the table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: UserId,
    pub name: String,
    pub color: PlayerColor,
}

/// A turn as submitted by the client, before the server accepts it.
///
/// Everything besides `roll` is the client's action payload and is opaque here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PendingTurn {
    /// Dice total, `null` for placement turns
    #[serde(default)]
    pub roll: Option<u8>,
    #[serde(flatten)]
    pub actions: Map<String, Value>,
}

impl PendingTurn {
    pub fn new(roll: Option<u8>) -> Self {
        Self {
            roll,
            actions: Map::new(),
        }
    }

    /// Attach an action field
    pub fn with_action(mut self, key: impl Into<String>, value: Value) -> Self {
        self.actions.insert(key.into(), value);
        self
    }

    /// Stamp the turn as played
    pub fn into_played(self, played: DateTime<Utc>) -> Turn {
        Turn {
            roll: self.roll,
            played,
            actions: self.actions,
        }
    }
}

/// A turn that has been accepted into the history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    #[serde(default)]
    pub roll: Option<u8>,
    pub played: DateTime<Utc>,
    #[serde(flatten)]
    pub actions: Map<String, Value>,
}

impl Turn {
    /// Placement turns carry no roll
    pub fn is_placement(&self) -> bool {
        self.roll.is_none()
    }
}

/// The complete game document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    /// Players in turn order
    pub players: Vec<Player>,
    /// Played turns, oldest first
    #[serde(default)]
    pub turns: Vec<Turn>,
    /// `None` when absent, `Some(None)` when explicitly `null`
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "double_option"
    )]
    pub next_roll: Option<Option<u8>>,
    /// Open trade offer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trade_offers: Option<Trade>,
    /// Harbor resources keyed by `"<hex><edge>"`
    #[serde(default)]
    pub harbors: BTreeMap<String, Option<String>>,
    /// Board rows of two-character cell codes
    #[serde(default)]
    pub grid: Vec<Vec<String>>,
    #[serde(default = "default_layout")]
    pub layout: String,
    #[serde(default)]
    pub is_sync: bool,
    /// Any keys not modelled above
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_layout() -> String {
    DEFAULT_LAYOUT.to_string()
}

impl Game {
    /// A fresh game with the given seating and board
    pub fn new(
        players: Vec<Player>,
        harbors: BTreeMap<String, Option<String>>,
        grid: Vec<Vec<String>>,
        layout: String,
    ) -> Self {
        Self {
            players,
            turns: Vec::new(),
            next_roll: None,
            trade_offers: None,
            harbors,
            grid,
            layout,
            is_sync: false,
            extra: Map::new(),
        }
    }

    /// Parse and check a stored document, upgrading the legacy `init` layout first
    pub fn from_value(mut value: Value) -> Result<Self, GameError> {
        let object = value
            .as_object_mut()
            .ok_or_else(|| GameError::Malformed("document is not an object".into()))?;
        legacy::upgrade(object);

        let game: Game = serde_json::from_value(value)?;
        game.validate()?;
        Ok(game)
    }

    pub fn from_json(json: &str) -> Result<Self, GameError> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    pub fn to_value(&self) -> Result<Value, GameError> {
        Ok(serde_json::to_value(self)?)
    }

    /// Check the seating invariants
    pub fn validate(&self) -> Result<(), GameError> {
        let count = self.players.len();
        if !(MIN_SEATS..=MAX_SEATS).contains(&count) {
            return Err(GameError::Malformed(format!(
                "expected {}-{} players, found {}",
                MIN_SEATS, MAX_SEATS, count
            )));
        }

        let mut seen = HashSet::new();
        for player in &self.players {
            if !seen.insert(player.color) {
                return Err(GameError::DuplicateColor(player.color));
            }
        }

        Ok(())
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn turn_count(&self) -> usize {
        self.turns.len()
    }

    pub fn player_by_color(&self, color: PlayerColor) -> Option<&Player> {
        self.players.iter().find(|p| p.color == color)
    }

    pub fn player_by_id(&self, id: UserId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn is_player(&self, id: UserId) -> bool {
        self.player_by_id(id).is_some()
    }

    /// Everyone seated except `id`
    pub fn players_other_than(&self, id: UserId) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(move |p| p.id != id)
    }

    pub fn has_trade_offer(&self) -> bool {
        self.trade_offers.is_some()
    }
}
