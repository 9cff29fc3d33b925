//! Game document storage.
//!
//! Documents are kept as raw JSON and parsed on every load, so anything that
//! reaches the game logic has passed [`Game::from_value`]. Each record
//! carries a version; a save against a stale version is refused.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use settlers_core::{Game, GameError};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use thiserror::Error;
use tracing::warn;

pub type GameId = u64;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Game {0} not found")]
    NotFound(GameId),

    #[error("Game {id} changed underneath this request (expected version {expected}, found {found})")]
    Conflict {
        id: GameId,
        expected: u64,
        found: u64,
    },

    #[error("Stored game is invalid: {0}")]
    Invalid(#[from] GameError),

    #[error("Storage error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A loaded game with its bookkeeping
#[derive(Debug, Clone)]
pub struct GameRecord {
    pub id: GameId,
    pub game: Game,
    pub version: u64,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

/// Load/save game documents by id
pub trait GameStore: Send + Sync {
    /// Store a new game and assign it an id
    fn create(&self, game: &Game, now: DateTime<Utc>) -> Result<GameRecord, StoreError>;

    fn load(&self, id: GameId) -> Result<GameRecord, StoreError>;

    /// Overwrite a game. Fails if it was saved since `expected_version` was loaded.
    fn save(
        &self,
        id: GameId,
        game: &Game,
        expected_version: u64,
        now: DateTime<Utc>,
    ) -> Result<u64, StoreError>;

    /// All games, most recently updated first
    fn list(&self) -> Result<Vec<GameRecord>, StoreError>;
}

/// On-disk/in-memory form of a record
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredGame {
    id: GameId,
    version: u64,
    created: DateTime<Utc>,
    updated: DateTime<Utc>,
    game: Value,
}

impl StoredGame {
    fn new(id: GameId, game: &Game, now: DateTime<Utc>) -> Result<Self, StoreError> {
        Ok(Self {
            id,
            version: 1,
            created: now,
            updated: now,
            game: game.to_value()?,
        })
    }

    fn update(
        &mut self,
        game: &Game,
        expected_version: u64,
        now: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        if self.version != expected_version {
            return Err(StoreError::Conflict {
                id: self.id,
                expected: expected_version,
                found: self.version,
            });
        }
        self.game = game.to_value()?;
        self.version += 1;
        self.updated = now;
        Ok(self.version)
    }

    fn into_record(self) -> Result<GameRecord, StoreError> {
        Ok(GameRecord {
            id: self.id,
            game: Game::from_value(self.game)?,
            version: self.version,
            created: self.created,
            updated: self.updated,
        })
    }
}

fn newest_first(mut records: Vec<GameRecord>) -> Vec<GameRecord> {
    records.sort_by(|a, b| b.updated.cmp(&a.updated).then(b.id.cmp(&a.id)));
    records
}

/// Games held in memory, lost on restart
#[derive(Debug)]
pub struct MemoryStore {
    games: DashMap<GameId, StoredGame>,
    next_id: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            games: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Insert a raw document, as an import would
    #[cfg(test)]
    pub fn insert_raw(&self, document: Value, now: DateTime<Utc>) -> GameId {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.games.insert(
            id,
            StoredGame {
                id,
                version: 1,
                created: now,
                updated: now,
                game: document,
            },
        );
        id
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl GameStore for MemoryStore {
    fn create(&self, game: &Game, now: DateTime<Utc>) -> Result<GameRecord, StoreError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let stored = StoredGame::new(id, game, now)?;
        self.games.insert(id, stored.clone());
        stored.into_record()
    }

    fn load(&self, id: GameId) -> Result<GameRecord, StoreError> {
        let stored = self
            .games
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or(StoreError::NotFound(id))?;
        stored.into_record()
    }

    fn save(
        &self,
        id: GameId,
        game: &Game,
        expected_version: u64,
        now: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let mut entry = self.games.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        entry.update(game, expected_version, now)
    }

    fn list(&self) -> Result<Vec<GameRecord>, StoreError> {
        let stored: Vec<StoredGame> = self.games.iter().map(|e| e.value().clone()).collect();
        let records = stored
            .into_iter()
            .map(StoredGame::into_record)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(newest_first(records))
    }
}

/// One JSON file per game in a directory
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
    next_id: AtomicU64,
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Open (and create if needed) a store directory
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        let mut highest = 0;
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if let Some(id) = id_from_path(&path) {
                highest = highest.max(id);
            }
        }

        Ok(Self {
            dir,
            next_id: AtomicU64::new(highest + 1),
            write_lock: Mutex::new(()),
        })
    }

    fn path_for(&self, id: GameId) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    fn read(&self, id: GameId) -> Result<StoredGame, StoreError> {
        match fs::read_to_string(self.path_for(id)) {
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::NotFound(id)),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, stored: &StoredGame) -> Result<(), StoreError> {
        let path = self.path_for(stored.id);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(stored)?)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

fn id_from_path(path: &Path) -> Option<GameId> {
    if path.extension()? != "json" {
        return None;
    }
    path.file_stem()?.to_str()?.parse().ok()
}

impl GameStore for FileStore {
    fn create(&self, game: &Game, now: DateTime<Utc>) -> Result<GameRecord, StoreError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let stored = StoredGame::new(id, game, now)?;
        self.write(&stored)?;
        stored.into_record()
    }

    fn load(&self, id: GameId) -> Result<GameRecord, StoreError> {
        self.read(id)?.into_record()
    }

    fn save(
        &self,
        id: GameId,
        game: &Game,
        expected_version: u64,
        now: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut stored = self.read(id)?;
        let version = stored.update(game, expected_version, now)?;
        self.write(&stored)?;
        Ok(version)
    }

    /// Files that can't be read or parsed are left out with a warning
    fn list(&self) -> Result<Vec<GameRecord>, StoreError> {
        let mut records = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let Some(id) = id_from_path(&path) else {
                continue;
            };
            match self.load(id) {
                Ok(record) => records.push(record),
                Err(e) => warn!(game_id = id, path = %path.display(), "Skipping unreadable game: {}", e),
            }
        }
        Ok(newest_first(records))
    }
}
