//! Creating a game: seating order and colors.

use crate::document::{Game, Player, PlayerColor, UserId, DEFAULT_LAYOUT};
use crate::error::GameError;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Player counts a new game can be started with
pub const NEW_GAME_SIZES: [usize; 2] = [3, 4];

/// A user who can be seated at a game
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: UserId,
    pub name: String,
    /// Ranked, most preferred first
    #[serde(default)]
    pub favorite_colors: Vec<PlayerColor>,
}

impl Profile {
    pub fn new(user_id: UserId, name: impl Into<String>) -> Self {
        Self {
            user_id,
            name: name.into(),
            favorite_colors: Vec::new(),
        }
    }

    pub fn with_favorites(mut self, favorites: &str) -> Self {
        self.favorite_colors = parse_favorite_colors(favorites);
        self
    }
}

/// Parse a comma separated color list such as `"green,red"`. Unknown names are skipped.
pub fn parse_favorite_colors(list: &str) -> Vec<PlayerColor> {
    list.split(',')
        .filter_map(|name| name.parse().ok())
        .collect()
}

/// Static board data supplied when the game is created
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardSetup {
    #[serde(default)]
    pub harbors: BTreeMap<String, Option<String>>,
    #[serde(default)]
    pub grid: Vec<Vec<String>>,
    #[serde(default = "default_layout")]
    pub layout: String,
}

fn default_layout() -> String {
    DEFAULT_LAYOUT.to_string()
}

impl Default for BoardSetup {
    fn default() -> Self {
        Self {
            harbors: BTreeMap::new(),
            grid: Vec::new(),
            layout: default_layout(),
        }
    }
}

/// Give each profile a color, keeping the given order.
///
/// Everyone gets their highest ranked favorite that is still free,
/// otherwise the next color from a shuffled pool.
pub fn assign_colors<R: Rng + ?Sized>(
    profiles: &[Profile],
    rng: &mut R,
) -> Result<Vec<Player>, GameError> {
    let mut pool: Vec<PlayerColor> = PlayerColor::BASE.to_vec();
    if profiles.len() > PlayerColor::BASE.len() {
        pool.extend(PlayerColor::EXTENSION);
    }
    if profiles.len() > pool.len() {
        return Err(GameError::ColorsExhausted(profiles.len()));
    }
    pool.shuffle(rng);

    let mut players = Vec::with_capacity(profiles.len());
    for profile in profiles {
        let position = profile
            .favorite_colors
            .iter()
            .find_map(|fav| pool.iter().position(|c| c == fav))
            .unwrap_or(0);
        let color = pool.remove(position);

        players.push(Player {
            id: profile.user_id,
            name: profile.name.clone(),
            color,
        });
    }

    Ok(players)
}

/// Seat 3 or 4 players in random order and start a fresh game
pub fn new_game<R: Rng + ?Sized>(
    mut profiles: Vec<Profile>,
    board: BoardSetup,
    rng: &mut R,
) -> Result<Game, GameError> {
    if !NEW_GAME_SIZES.contains(&profiles.len()) {
        return Err(GameError::InvalidPlayerCount(profiles.len()));
    }

    profiles.shuffle(rng);
    let players = assign_colors(&profiles, rng)?;

    Ok(Game::new(players, board.harbors, board.grid, board.layout))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::Stage;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn profiles(n: usize) -> Vec<Profile> {
        (0..n)
            .map(|i| Profile::new(i as UserId + 1, format!("player{}", i + 1)))
            .collect()
    }

    #[test]
    fn test_parse_favorites() {
        assert_eq!(
            parse_favorite_colors("green, red,,mauve,Blue"),
            vec![PlayerColor::Green, PlayerColor::Red, PlayerColor::Blue]
        );
        assert!(parse_favorite_colors("").is_empty());
    }

    #[test]
    fn test_rejects_wrong_sizes() {
        let mut rng = StdRng::seed_from_u64(0);
        for n in [0, 1, 2, 5, 6] {
            assert_eq!(
                new_game(profiles(n), BoardSetup::default(), &mut rng).unwrap_err(),
                GameError::InvalidPlayerCount(n)
            );
        }
    }

    #[test]
    fn test_new_game_is_fresh() {
        let mut rng = StdRng::seed_from_u64(42);
        let game = new_game(profiles(4), BoardSetup::default(), &mut rng).unwrap();

        assert_eq!(game.player_count(), 4);
        assert!(game.turns.is_empty());
        assert_eq!(game.next_roll, None);
        assert!(game.trade_offers.is_none());
        assert_eq!(game.stage(), Stage::Init1);
        assert!(game.validate().is_ok());

        let ids: HashSet<UserId> = game.players.iter().map(|p| p.id).collect();
        assert_eq!(ids, (1..=4).collect());
    }

    #[test]
    fn test_colors_distinct_from_base_pool() {
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let game = new_game(profiles(4), BoardSetup::default(), &mut rng).unwrap();
            let colors: HashSet<PlayerColor> = game.players.iter().map(|p| p.color).collect();
            assert_eq!(colors.len(), 4);
            assert!(colors.iter().all(|c| PlayerColor::BASE.contains(c)));
        }
    }

    #[test]
    fn test_six_players_use_extension() {
        let mut rng = StdRng::seed_from_u64(9);
        let players = assign_colors(&profiles(6), &mut rng).unwrap();
        let colors: HashSet<PlayerColor> = players.iter().map(|p| p.color).collect();
        assert_eq!(colors.len(), 6);

        assert_eq!(
            assign_colors(&profiles(7), &mut rng).unwrap_err(),
            GameError::ColorsExhausted(7)
        );
    }

    #[test]
    fn test_top_favorite_honored_when_free() {
        let mut list = profiles(3);
        list[0] = list[0].clone().with_favorites("white,red");
        list[1] = list[1].clone().with_favorites("white,orange");
        list[2] = list[2].clone().with_favorites("green,orange,blue");

        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let players = assign_colors(&list, &mut rng).unwrap();
            assert_eq!(players[0].color, PlayerColor::White);
            assert_eq!(players[1].color, PlayerColor::Orange);
            // green isn't in a 3 player pool
            assert_eq!(players[2].color, PlayerColor::Blue);
        }
    }

    #[test]
    fn test_favorite_outside_pool_falls_back() {
        let list = vec![Profile::new(1, "a").with_favorites("brown")];
        let mut rng = StdRng::seed_from_u64(3);
        let players = assign_colors(&list, &mut rng).unwrap();
        assert!(PlayerColor::BASE.contains(&players[0].color));
    }
}
