//! Game flow: creating games, opening them, playing turns and trading.
//!
//! Every request loads the document, applies one transition and saves it
//! back against the version it loaded.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::{Map, Value};
use settlers_core::{
    new_game, parse_favorite_colors, BoardSetup, Clock, Game, GameError, PendingTurn, Player,
    UserId,
};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::notify::{Notifier, Recipient, Template, TemplateFields};
use crate::profiles::{Account, ProfileStore};
use crate::protocol::{FormKind, GameSummary, GameView};
use crate::store::{GameId, GameStore, StoreError};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Game(#[from] GameError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("You need a settlers profile to do that")]
    NoProfile,

    #[error("User {0} has no settlers profile")]
    UnknownUser(UserId),

    #[error("User {0} was selected more than once")]
    DuplicatePlayer(UserId),

    #[error("You can't respond to your own trade")]
    OwnTrade,

    #[error("Could not save your trade response")]
    ResponseNotSaved,
}

impl ServiceError {
    /// HTTP-style status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            ServiceError::Game(e) => e.status_code(),
            ServiceError::Store(StoreError::NotFound(_)) => 404,
            ServiceError::Store(StoreError::Conflict { .. }) => 409,
            ServiceError::Store(_) => 500,
            ServiceError::NoProfile | ServiceError::OwnTrade => 403,
            ServiceError::UnknownUser(_)
            | ServiceError::DuplicatePlayer(_)
            | ServiceError::ResponseNotSaved => 400,
        }
    }
}

/// Result of a successful submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub game_id: GameId,
    pub message: String,
    /// Soft failures, e.g. players that couldn't be notified
    pub warnings: Vec<String>,
}

impl Submission {
    fn new(game_id: GameId, message: &str) -> Self {
        Self {
            game_id,
            message: message.to_string(),
            warnings: Vec::new(),
        }
    }
}

pub struct GameService {
    store: Arc<dyn GameStore>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    profiles: Arc<dyn ProfileStore>,
    rng: Mutex<StdRng>,
}

impl GameService {
    pub fn new(
        store: Arc<dyn GameStore>,
        profiles: Arc<dyn ProfileStore>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::with_rng(store, profiles, notifier, clock, StdRng::from_entropy())
    }

    /// Deterministic dice and seating, for tests
    pub fn with_seed(
        store: Arc<dyn GameStore>,
        profiles: Arc<dyn ProfileStore>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        seed: u64,
    ) -> Self {
        Self::with_rng(store, profiles, notifier, clock, StdRng::seed_from_u64(seed))
    }

    fn with_rng(
        store: Arc<dyn GameStore>,
        profiles: Arc<dyn ProfileStore>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        rng: StdRng,
    ) -> Self {
        Self {
            store,
            notifier,
            clock,
            profiles,
            rng: Mutex::new(rng),
        }
    }

    fn rng(&self) -> MutexGuard<'_, StdRng> {
        self.rng.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create or replace the caller's profile
    pub fn save_profile(
        &self,
        user: Option<UserId>,
        name: String,
        email: String,
        favorite_colors: &str,
    ) -> Result<Account, ServiceError> {
        let user_id = user.ok_or(GameError::Unauthenticated)?;
        let account = Account {
            user_id,
            name,
            email,
            favorite_colors: parse_favorite_colors(favorite_colors),
        };
        self.profiles.save(&account)?;
        info!(user_id, name = %account.name, "Profile saved");
        Ok(account)
    }

    /// Games, most recently updated first
    pub fn list_games(&self) -> Result<Vec<GameSummary>, ServiceError> {
        Ok(self
            .store
            .list()?
            .into_iter()
            .map(|record| GameSummary {
                game_id: record.id,
                players: record.game.players.iter().map(|p| p.name.clone()).collect(),
                stage: record.game.stage(),
                turns: record.game.turn_count(),
                updated: record.updated,
            })
            .collect())
    }

    /// Seat the given users in a new game
    pub fn create_game(
        &self,
        user: Option<UserId>,
        player_ids: &[UserId],
        board: BoardSetup,
    ) -> Result<GameId, ServiceError> {
        let user = user.ok_or(GameError::Unauthenticated)?;
        if self.profiles.get(user)?.is_none() {
            return Err(ServiceError::NoProfile);
        }

        let mut seen = HashSet::new();
        let mut profiles = Vec::with_capacity(player_ids.len());
        for &id in player_ids {
            if !seen.insert(id) {
                return Err(ServiceError::DuplicatePlayer(id));
            }
            let account = self.profiles.get(id)?.ok_or(ServiceError::UnknownUser(id))?;
            profiles.push(account.profile());
        }

        let game = new_game(profiles, board, &mut *self.rng())?;
        let record = self.store.create(&game, self.clock.now())?;
        info!(game_id = record.id, creator = user, players = ?player_ids, "Game created");
        Ok(record.id)
    }

    /// What `user` sees when opening a game. Starts the next turn if it's theirs.
    pub fn open_game(&self, user: Option<UserId>, game_id: GameId) -> Result<GameView, ServiceError> {
        let mut record = self.store.load(game_id)?;
        let is_player = user.is_some_and(|u| record.game.is_player(u));
        let is_active = user.is_some_and(|u| record.game.is_active_player(u));

        if is_active {
            let start = record.game.start_next_turn(&mut *self.rng());
            if start.changed() {
                record.version =
                    self.store
                        .save(game_id, &record.game, record.version, self.clock.now())?;
                debug!(game_id, ?start, "Next turn started");
            }
        }

        let form = if is_active {
            Some(FormKind::Turn)
        } else if is_player && record.game.has_trade_offer() {
            Some(FormKind::TradeResponse)
        } else {
            None
        };

        Ok(GameView {
            game_id,
            stage: record.game.stage(),
            active_player: record.game.active_player().cloned(),
            user: user.filter(|_| is_player),
            form,
            game: record.game,
        })
    }

    /// Play a turn, or park it behind a trade offer when `trade` is given
    pub fn submit_turn(
        &self,
        user: Option<UserId>,
        game_id: GameId,
        turn: PendingTurn,
        trade: Option<Value>,
    ) -> Result<Submission, ServiceError> {
        let user = user.ok_or(GameError::Unauthenticated)?;
        let mut record = self.store.load(game_id)?;

        record.game.check_roll(turn.roll)?;
        let actor = active_player(&record.game)?;
        if actor.id != user {
            return Err(GameError::NotYourTurn.into());
        }

        let clock = self.clock.as_ref();
        let (template, message) = match trade.filter(|t| !t.is_null()) {
            Some(offers) => {
                record.game.save_trade_offer(offers, turn, clock)?;
                (Template::Trade, "Your trade offer has been successfully saved.")
            }
            None => {
                record.game.save_next_turn(turn, clock)?;
                (Template::Turn, "Your turn has been successfully saved.")
            }
        };

        self.store
            .save(game_id, &record.game, record.version, clock.now())?;
        info!(
            game_id,
            user_id = user,
            template = template.name(),
            turns = record.game.turn_count(),
            "Submission saved"
        );

        let mut submission = Submission::new(game_id, message);
        submission.warnings = self.notify_others(game_id, &record.game, &actor, template);
        Ok(submission)
    }

    /// Record the caller's answer to the open trade
    pub fn respond_trade(
        &self,
        user: Option<UserId>,
        game_id: GameId,
        response: Map<String, Value>,
    ) -> Result<Submission, ServiceError> {
        let user = user.ok_or(GameError::Unauthenticated)?;
        let mut record = self.store.load(game_id)?;

        let color = record
            .game
            .player_by_id(user)
            .map(|p| p.color)
            .ok_or(GameError::NotAPlayer)?;
        if record.game.is_active_player(user) {
            return Err(ServiceError::OwnTrade);
        }

        match record
            .game
            .save_trade_response(color, response, self.clock.as_ref())
        {
            Ok(_) => {}
            Err(GameError::NoTradeOpen) => return Err(ServiceError::ResponseNotSaved),
            Err(e) => return Err(e.into()),
        }

        self.store
            .save(game_id, &record.game, record.version, self.clock.now())?;
        info!(game_id, user_id = user, %color, "Trade response saved");

        Ok(Submission::new(
            game_id,
            "Your trade response has been successfully saved.",
        ))
    }

    /// The stored document, pretty printed
    pub fn game_document(&self, game_id: GameId) -> Result<String, ServiceError> {
        let record = self.store.load(game_id)?;
        serde_json::to_string_pretty(&record.game)
            .map_err(|e| ServiceError::Store(StoreError::Serialization(e)))
    }

    /// Toggle the client sync flag
    pub fn set_sync(
        &self,
        user: Option<UserId>,
        game_id: GameId,
        is_sync: bool,
    ) -> Result<Submission, ServiceError> {
        let user = user.ok_or(GameError::Unauthenticated)?;
        let mut record = self.store.load(game_id)?;
        if !record.game.is_player(user) {
            return Err(GameError::NotAPlayer.into());
        }

        record.game.is_sync = is_sync;
        self.store
            .save(game_id, &record.game, record.version, self.clock.now())?;
        Ok(Submission::new(game_id, "Sync mode updated."))
    }

    /// Tell everyone but `actor`. Returns a warning per failed delivery.
    fn notify_others(
        &self,
        game_id: GameId,
        game: &Game,
        actor: &Player,
        template: Template,
    ) -> Vec<String> {
        let fields = TemplateFields {
            game_id,
            next_player: game.active_player().map(|p| p.name.clone()),
            expires: game.trade_offers.as_ref().map(|t| t.expires),
        };

        let mut warnings = Vec::new();
        for player in game.players_other_than(actor.id) {
            let recipient = match self.profiles.get(player.id) {
                Ok(Some(account)) => account.recipient(),
                _ => Recipient {
                    user_id: player.id,
                    name: player.name.clone(),
                    email: String::new(),
                },
            };

            if let Err(e) = self
                .notifier
                .notify(&recipient, &actor.name, template, &fields)
            {
                warn!(game_id, user_id = player.id, template = template.name(), "Notification failed: {}", e);
                warnings.push(format!("Unable to notify {} ({})", player.name, e));
            }
        }
        warnings
    }
}

fn active_player(game: &Game) -> Result<Player, GameError> {
    game.active_player()
        .cloned()
        .ok_or_else(|| GameError::Malformed("game has no players".into()))
}
