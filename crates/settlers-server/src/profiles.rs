//! Player profiles.
//!
//! A profile is what a user needs before they can start games: a display
//! name, an address for notifications and their favorite colors. Profiles
//! are kept next to the games so a restart doesn't lose them.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use settlers_core::{PlayerColor, Profile, UserId};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::notify::Recipient;
use crate::store::StoreError;

const PROFILES_FILE: &str = "profiles.json";

/// A registered user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub user_id: UserId,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub favorite_colors: Vec<PlayerColor>,
}

impl Account {
    pub fn profile(&self) -> Profile {
        Profile {
            user_id: self.user_id,
            name: self.name.clone(),
            favorite_colors: self.favorite_colors.clone(),
        }
    }

    pub fn recipient(&self) -> Recipient {
        Recipient {
            user_id: self.user_id,
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }
}

pub trait ProfileStore: Send + Sync {
    /// Create or replace a user's profile
    fn save(&self, account: &Account) -> Result<(), StoreError>;

    fn get(&self, user_id: UserId) -> Result<Option<Account>, StoreError>;
}

/// Profiles held in memory, lost on restart
#[derive(Debug, Default)]
pub struct MemoryProfiles {
    by_id: DashMap<UserId, Account>,
}

impl MemoryProfiles {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProfileStore for MemoryProfiles {
    fn save(&self, account: &Account) -> Result<(), StoreError> {
        self.by_id.insert(account.user_id, account.clone());
        Ok(())
    }

    fn get(&self, user_id: UserId) -> Result<Option<Account>, StoreError> {
        Ok(self.by_id.get(&user_id).map(|a| a.value().clone()))
    }
}

/// All profiles in one `profiles.json`, read once on open and rewritten on
/// every save
#[derive(Debug)]
pub struct FileProfiles {
    path: PathBuf,
    by_id: Mutex<BTreeMap<UserId, Account>>,
}

impl FileProfiles {
    /// Open the profiles kept in `dir`, creating the directory if needed
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        let path = dir.join(PROFILES_FILE);

        let accounts: Vec<Account> = match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text)?,
            Err(e) if e.kind() == ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            by_id: Mutex::new(accounts.into_iter().map(|a| (a.user_id, a)).collect()),
        })
    }

    fn write(&self, by_id: &BTreeMap<UserId, Account>) -> Result<(), StoreError> {
        let accounts: Vec<&Account> = by_id.values().collect();
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(&accounts)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl ProfileStore for FileProfiles {
    fn save(&self, account: &Account) -> Result<(), StoreError> {
        let mut by_id = self.by_id.lock().unwrap_or_else(|e| e.into_inner());
        let previous = by_id.insert(account.user_id, account.clone());
        if let Err(e) = self.write(&by_id) {
            // Keep memory in line with the file
            match previous {
                Some(previous) => by_id.insert(account.user_id, previous),
                None => by_id.remove(&account.user_id),
            };
            return Err(e);
        }
        Ok(())
    }

    fn get(&self, user_id: UserId) -> Result<Option<Account>, StoreError> {
        let by_id = self.by_id.lock().unwrap_or_else(|e| e.into_inner());
        Ok(by_id.get(&user_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn account(user_id: UserId, name: &str) -> Account {
        Account {
            user_id,
            name: name.into(),
            email: format!("{}@example.com", name),
            favorite_colors: vec![PlayerColor::Orange, PlayerColor::Red],
        }
    }

    fn exercise(store: &dyn ProfileStore) {
        assert_eq!(store.get(1).unwrap(), None);

        store.save(&account(1, "ann")).unwrap();
        store.save(&account(2, "bob")).unwrap();
        let mut renamed = account(1, "annie");
        renamed.favorite_colors.clear();
        store.save(&renamed).unwrap();

        assert_eq!(store.get(1).unwrap(), Some(renamed));
        assert_eq!(store.get(2).unwrap().unwrap().name, "bob");
    }

    #[test]
    fn test_memory_profiles() {
        exercise(&MemoryProfiles::new());
    }

    #[test]
    fn test_file_profiles() {
        let dir = tempfile::tempdir().unwrap();
        exercise(&FileProfiles::open(dir.path()).unwrap());
    }

    #[test]
    fn test_file_profiles_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        FileProfiles::open(dir.path())
            .unwrap()
            .save(&account(7, "gus"))
            .unwrap();

        let reopened = FileProfiles::open(dir.path()).unwrap();
        assert_eq!(reopened.get(7).unwrap(), Some(account(7, "gus")));
        assert_eq!(reopened.get(8).unwrap(), None);
    }
}
