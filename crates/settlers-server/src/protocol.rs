//! WebSocket protocol messages for the Settlers turn tracker.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use settlers_core::{BoardSetup, Game, PendingTurn, Player, Stage, UserId};
use uuid::Uuid;

use crate::store::GameId;

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ClientMessage {
    /// Identify the user behind this connection. The id is taken on trust;
    /// put the server behind something that authenticates users.
    Authenticate { user_id: UserId },

    /// Create or update the caller's profile
    SaveProfile {
        name: String,
        email: String,
        /// Comma separated, most preferred first
        #[serde(default)]
        favorite_colors: String,
    },

    /// Request the game list
    ListGames,

    /// Start a new game with 3 or 4 players
    NewGame {
        player_ids: Vec<UserId>,
        #[serde(default)]
        board: BoardSetup,
    },

    /// Open a game, starting the next turn if it's the caller's
    OpenGame { game_id: GameId },

    /// Submit a turn, or park it behind a trade offer
    SubmitTurn {
        game_id: GameId,
        turn: PendingTurn,
        #[serde(default)]
        trade: Option<Value>,
    },

    /// Answer the open trade offer
    RespondTrade {
        game_id: GameId,
        response: Map<String, Value>,
    },

    /// Fetch the raw game document
    GetGameData { game_id: GameId },

    /// Toggle the client sync flag
    SetSync { game_id: GameId, is_sync: bool },

    /// Ping for keepalive
    Ping,
}

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ServerMessage {
    /// Welcome message with the connection id
    Welcome { connection_id: Uuid },

    /// Connection is now tied to a user
    Authenticated { user_id: UserId },

    /// Profile stored
    ProfileSaved { user_id: UserId },

    /// Games, most recently updated first
    GameList { games: Vec<GameSummary> },

    /// New game stored
    GameCreated { game_id: GameId },

    /// What the caller sees of a game
    GameView { view: GameView },

    /// A submission was stored
    Saved { game_id: GameId, message: String },

    /// Raw game document, pretty printed
    GameData { game_id: GameId, document: String },

    /// Something happened in a game the user plays in
    Notification {
        game_id: GameId,
        subject: String,
        from: String,
        to: String,
        body: String,
    },

    /// Non fatal problem with the last request
    Warning { message: String },

    /// Request rejected
    Error { status: u16, message: String },

    /// Pong response
    Pong,
}

/// Which form the viewer gets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FormKind {
    /// Submit a turn or offer a trade
    Turn,
    /// Answer the open trade
    TradeResponse,
}

/// A game as one user sees it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameView {
    pub game_id: GameId,
    pub game: Game,
    /// The viewer, if signed in
    pub user: Option<UserId>,
    pub stage: Stage,
    pub active_player: Option<Player>,
    pub form: Option<FormKind>,
}

/// One row of the game list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSummary {
    pub game_id: GameId,
    pub players: Vec<String>,
    pub stage: Stage,
    pub turns: usize,
    pub updated: DateTime<Utc>,
}
