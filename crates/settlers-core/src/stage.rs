//! Stage and active player, derived from how many turns have been played.
//!
//! Setup takes two placement rounds. The first goes round the table in
//! seating order, the second goes back the other way, so the last player
//! to place in round one places first in round two.

use crate::document::{Game, Player};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Macro phase of a game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// First placement round
    Init1,
    /// Second placement round, reverse seating order
    Init2,
    /// Regular play
    Play,
}

impl Stage {
    /// Whether turns in this stage are placement turns (no dice)
    pub fn is_setup(&self) -> bool {
        !matches!(self, Stage::Play)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Init1 => "init1",
            Stage::Init2 => "init2",
            Stage::Play => "play",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stage for a game with `players` seats after `turns` turns
pub fn stage(players: usize, turns: usize) -> Stage {
    if turns >= players * 2 {
        Stage::Play
    } else if turns >= players {
        Stage::Init2
    } else {
        Stage::Init1
    }
}

/// Seat index of whoever acts next. `None` only for an empty table.
pub fn active_index(players: usize, turns: usize) -> Option<usize> {
    if players == 0 {
        return None;
    }

    let offset = turns % players;
    match stage(players, turns) {
        Stage::Init2 => Some(players - 1 - offset),
        Stage::Init1 | Stage::Play => Some(offset),
    }
}

impl Game {
    pub fn stage(&self) -> Stage {
        stage(self.player_count(), self.turn_count())
    }

    /// The player whose turn it is
    pub fn active_player(&self) -> Option<&Player> {
        active_index(self.player_count(), self.turn_count()).and_then(|i| self.players.get(i))
    }

    pub fn is_active_player(&self, id: crate::document::UserId) -> bool {
        self.active_player().is_some_and(|p| p.id == id)
    }
}
