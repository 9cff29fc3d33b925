//! Dice and the roll gate.
//!
//! The server rolls the dice, not the client. When the active player opens
//! the game, [`Game::start_next_turn`] stores the roll their turn must carry;
//! [`Game::save_next_turn`] then only accepts a turn whose `roll` matches.

use crate::clock::Clock;
use crate::document::{Game, PendingTurn, Turn};
use crate::error::GameError;
use crate::stage::Stage;
use rand::Rng;

/// Roll two six-sided dice and return the total
pub fn roll_dice<R: Rng + ?Sized>(rng: &mut R) -> u8 {
    let die1: u8 = rng.gen_range(1..=6);
    let die2: u8 = rng.gen_range(1..=6);
    die1 + die2
}

/// What [`Game::start_next_turn`] did to the document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStart {
    /// Nothing to do
    Unchanged,
    /// A trade is open, a leftover roll was removed
    ClearedStrayRoll,
    /// Placement turn, `nextRoll` set to `null`
    AwaitingPlacement,
    /// Dice rolled for a play turn
    Rolled(u8),
}

impl TurnStart {
    /// Whether the document needs saving
    pub fn changed(&self) -> bool {
        !matches!(self, TurnStart::Unchanged)
    }
}

impl Game {
    /// The roll a submitted turn has to match, if one is pending.
    /// `Some(None)` means a placement turn with no dice.
    pub fn pending_roll(&self) -> Option<Option<u8>> {
        self.next_roll
    }

    /// The roll a submission has to carry. While a trade is open that is
    /// the roll of the parked turn, otherwise the pending roll.
    pub fn expected_roll(&self) -> Option<Option<u8>> {
        match &self.trade_offers {
            Some(trade) => Some(trade.turn.roll),
            None => self.next_roll,
        }
    }

    /// Check a submitted roll against the expected one
    pub fn check_roll(&self, submitted: Option<u8>) -> Result<(), GameError> {
        match self.expected_roll() {
            Some(expected) if expected == submitted => Ok(()),
            _ => Err(GameError::RollMismatch { submitted }),
        }
    }

    /// Prepare the document for the active player's next turn.
    ///
    /// Calling this again without another mutation in between is a no-op.
    pub fn start_next_turn<R: Rng + ?Sized>(&mut self, rng: &mut R) -> TurnStart {
        if self.trade_offers.is_some() {
            return match self.next_roll.take() {
                Some(_) => TurnStart::ClearedStrayRoll,
                None => TurnStart::Unchanged,
            };
        }

        if self.stage() != Stage::Play {
            if self.next_roll == Some(None) {
                return TurnStart::Unchanged;
            }
            self.next_roll = Some(None);
            return TurnStart::AwaitingPlacement;
        }

        match self.next_roll {
            Some(Some(_)) => TurnStart::Unchanged,
            _ => {
                let roll = roll_dice(rng);
                self.next_roll = Some(Some(roll));
                TurnStart::Rolled(roll)
            }
        }
    }

    /// Accept a turn if its roll matches, stamp it and append it.
    /// Committing a turn closes any open trade.
    ///
    /// On a mismatch the document is left untouched.
    pub fn save_next_turn<C: Clock + ?Sized>(
        &mut self,
        turn: PendingTurn,
        clock: &C,
    ) -> Result<&Turn, GameError> {
        self.check_roll(turn.roll)?;

        self.turns.push(turn.into_played(clock.now()));
        self.next_roll = None;
        self.trade_offers = None;

        self.turns
            .last()
            .ok_or_else(|| GameError::Malformed("turn history is empty".into()))
    }
}
