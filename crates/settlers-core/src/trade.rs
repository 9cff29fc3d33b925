//! Trade offers.
//!
//! Once the dice are rolled the active player may, instead of finishing
//! their turn, put a trade on the table. The turn they intend to play is
//! parked with the offer while everyone else answers. The expiry time is
//! recorded but not enforced here.

use crate::clock::Clock;
use crate::document::{Game, PendingTurn, PlayerColor};
use crate::error::GameError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// How long an offer stays open
pub const TRADE_WINDOW_HOURS: i64 = 12;

/// An open trade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// The turn to commit once trading is done
    pub turn: PendingTurn,
    /// What's on offer, interpreted by the client
    pub offers: Value,
    pub created: DateTime<Utc>,
    /// Newest first, one per color
    #[serde(default)]
    pub responses: Vec<TradeResponse>,
    pub expires: DateTime<Utc>,
}

impl Trade {
    pub fn new(turn: PendingTurn, offers: Value, created: DateTime<Utc>) -> Self {
        Self {
            turn,
            offers,
            created,
            responses: Vec::new(),
            expires: created + Duration::hours(TRADE_WINDOW_HOURS),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires
    }

    pub fn response_from(&self, color: PlayerColor) -> Option<&TradeResponse> {
        self.responses.iter().find(|r| r.color == color)
    }

    /// Replace any earlier answer from the same color and put this one first
    fn record(&mut self, response: TradeResponse) {
        self.responses.retain(|r| r.color != response.color);
        self.responses.insert(0, response);
    }
}

/// A player's answer to an open trade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeResponse {
    pub color: PlayerColor,
    pub created: DateTime<Utc>,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl Game {
    /// Open a trade. The parked turn must carry the pending roll.
    ///
    /// A new offer while one is open replaces it, responses included. The
    /// parked turn has to keep the roll it was parked with.
    pub fn save_trade_offer<C: Clock + ?Sized>(
        &mut self,
        offers: Value,
        turn: PendingTurn,
        clock: &C,
    ) -> Result<&Trade, GameError> {
        if self.expected_roll().is_none() {
            return Err(GameError::NoRollPending);
        }
        self.check_roll(turn.roll)?;

        self.next_roll = None;
        Ok(&*self
            .trade_offers
            .insert(Trade::new(turn, offers, clock.now())))
    }

    /// Record a response to the open trade
    pub fn save_trade_response<C: Clock + ?Sized>(
        &mut self,
        color: PlayerColor,
        mut details: Map<String, Value>,
        clock: &C,
    ) -> Result<&TradeResponse, GameError> {
        let trade = self.trade_offers.as_mut().ok_or(GameError::NoTradeOpen)?;

        details.remove("color");
        details.remove("created");
        trade.record(TradeResponse {
            color,
            created: clock.now(),
            details,
        });

        trade
            .responses
            .first()
            .ok_or_else(|| GameError::Malformed("trade has no responses".into()))
    }
}
