//! Integration tests for the Settlers turn tracker.
//!
//! These tests drive a game document from creation through setup and into
//! regular play, trading along the way.

use chrono::{Duration, TimeZone, Utc};
use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::{json, Map, Value};
use settlers_core::*;

fn four_profiles() -> Vec<Profile> {
    vec![
        Profile::new(1, "Alice").with_favorites("blue"),
        Profile::new(2, "Bob"),
        Profile::new(3, "Charlie").with_favorites("orange,white"),
        Profile::new(4, "Diana"),
    ]
}

fn start_clock() -> FixedClock {
    FixedClock::new(Utc.with_ymd_and_hms(2024, 5, 4, 20, 0, 0).unwrap())
}

/// Play one turn as the active player, returning who played it
fn play_turn(game: &mut Game, rng: &mut StdRng, clock: &FixedClock) -> UserId {
    let player = game.active_player().unwrap().id;
    game.start_next_turn(rng);

    let roll = game.pending_roll().expect("a turn should be pending");
    let turn = PendingTurn::new(roll).with_action("actions", json!([{"type": "pass"}]));
    game.save_next_turn(turn, clock).unwrap();
    clock.advance(Duration::minutes(3));

    player
}

/// Run through both placement rounds
fn complete_setup(game: &mut Game, rng: &mut StdRng, clock: &FixedClock) -> Vec<UserId> {
    let mut order = Vec::new();
    while game.stage().is_setup() {
        order.push(play_turn(game, rng, clock));
    }
    order
}

#[test]
fn test_setup_goes_round_and_back() {
    let mut rng = StdRng::seed_from_u64(11);
    let clock = start_clock();
    let mut game = new_game(four_profiles(), BoardSetup::default(), &mut rng).unwrap();
    let seats: Vec<UserId> = game.players.iter().map(|p| p.id).collect();

    let order = complete_setup(&mut game, &mut rng, &clock);

    let mut expected = seats.clone();
    expected.extend(seats.iter().rev());
    assert_eq!(order, expected);
    assert_eq!(game.stage(), Stage::Play);
    assert!(game.turns.iter().all(Turn::is_placement));
    assert_eq!(game.active_player().unwrap().id, seats[0]);
}

#[test]
fn test_play_turns_follow_seating() {
    let mut rng = StdRng::seed_from_u64(12);
    let clock = start_clock();
    let mut game = new_game(four_profiles(), BoardSetup::default(), &mut rng).unwrap();
    complete_setup(&mut game, &mut rng, &clock);

    let seats: Vec<UserId> = game.players.iter().map(|p| p.id).collect();
    for round in 0..2 {
        for seat in &seats {
            let played_by = play_turn(&mut game, &mut rng, &clock);
            assert_eq!(played_by, *seat, "round {}", round);
        }
    }

    assert_eq!(game.turns.len(), 16);
    assert!(game.turns[8..].iter().all(|t| t.roll.is_some()));
    let stamps: Vec<_> = game.turns.iter().map(|t| t.played).collect();
    assert!(stamps.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn test_wrong_roll_is_rejected() {
    let mut rng = StdRng::seed_from_u64(13);
    let clock = start_clock();
    let mut game = new_game(four_profiles(), BoardSetup::default(), &mut rng).unwrap();
    complete_setup(&mut game, &mut rng, &clock);

    game.start_next_turn(&mut rng);
    let rolled = game.pending_roll().flatten().unwrap();
    let wrong = if rolled == 12 { 2 } else { rolled + 1 };
    let before = game.clone();

    let err = game
        .save_next_turn(PendingTurn::new(Some(wrong)), &clock)
        .unwrap_err();
    assert_eq!(err.status_code(), 400);
    assert_eq!(game, before);
}

#[test]
fn test_trade_round() {
    let mut rng = StdRng::seed_from_u64(14);
    let clock = start_clock();
    let mut game = new_game(four_profiles(), BoardSetup::default(), &mut rng).unwrap();
    complete_setup(&mut game, &mut rng, &clock);

    game.start_next_turn(&mut rng);
    let roll = game.pending_roll().flatten().unwrap();
    let active = game.active_player().unwrap().clone();

    let parked = PendingTurn::new(Some(roll)).with_action("actions", json!([]));
    game.save_trade_offer(json!({"give": {"ore": 1}, "want": {"wool": 2}}), parked.clone(), &clock)
        .unwrap();
    assert_eq!(game.pending_roll(), None);

    // Viewing the game again while trading must not roll new dice
    assert_eq!(game.start_next_turn(&mut rng), TurnStart::Unchanged);

    let others: Vec<Player> = game.players_other_than(active.id).cloned().collect();
    for other in &others {
        clock.advance(Duration::minutes(1));
        let mut details = Map::new();
        details.insert("accept".into(), Value::Bool(false));
        game.save_trade_response(other.color, details, &clock).unwrap();
    }

    clock.advance(Duration::minutes(1));
    let mut details = Map::new();
    details.insert("accept".into(), Value::Bool(true));
    game.save_trade_response(others[0].color, details, &clock)
        .unwrap();

    let trade = game.trade_offers.as_ref().unwrap();
    assert_eq!(trade.turn, parked);
    assert_eq!(trade.responses.len(), 3);
    assert_eq!(trade.responses[0].color, others[0].color);
    assert_eq!(trade.responses[0].created, clock.now());
    assert_eq!(
        trade.response_from(others[0].color).unwrap().details["accept"],
        json!(true)
    );
    assert!(!trade.is_expired(clock.now()));

    // Trading done, the parked turn goes in and the trade closes
    let turns_before = game.turn_count();
    game.save_next_turn(parked.clone(), &clock).unwrap();
    assert_eq!(game.turn_count(), turns_before + 1);
    assert!(!game.has_trade_offer());
    assert_ne!(game.active_player().unwrap().id, active.id);
}

#[test]
fn test_document_round_trip() {
    let mut rng = StdRng::seed_from_u64(15);
    let clock = start_clock();
    let board = BoardSetup {
        harbors: [("3c".to_string(), Some("ore".to_string())), ("7a".to_string(), None)]
            .into_iter()
            .collect(),
        grid: vec![vec!["..".into(), "Wo".into()], vec!["Br".into(), "De".into()]],
        layout: "standard34".into(),
    };
    let mut game = new_game(four_profiles(), board, &mut rng).unwrap();
    complete_setup(&mut game, &mut rng, &clock);
    game.start_next_turn(&mut rng);
    let roll = game.pending_roll().flatten();
    game.save_trade_offer(json!({"give": "brick"}), PendingTurn::new(roll), &clock)
        .unwrap();
    let color = game.players[1].color;
    game.save_trade_response(color, Map::new(), &clock).unwrap();
    game.extra.insert("notes".into(), json!("kept"));

    let text = serde_json::to_string(&game).unwrap();
    let reloaded = Game::from_json(&text).unwrap();
    assert_eq!(reloaded, game);

    let value: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value["players"][0]["id"], json!(game.players[0].id));
    assert!(value["turns"][0]["played"].is_string());
    assert!(value["tradeOffers"]["expires"].is_string());
    assert_eq!(value["isSync"], json!(false));
}

#[test]
fn test_null_next_roll_survives_reload() {
    let mut rng = StdRng::seed_from_u64(16);
    let mut game = new_game(four_profiles(), BoardSetup::default(), &mut rng).unwrap();
    game.start_next_turn(&mut rng);

    let value = game.to_value().unwrap();
    assert_eq!(value["nextRoll"], Value::Null);
    let reloaded = Game::from_value(value).unwrap();
    assert_eq!(reloaded.pending_roll(), Some(None));
}

#[test]
fn test_legacy_document_loads() {
    let legacy = json!({
        "players": [
            {"id": 5, "name": "e", "color": "red"},
            {"id": 6, "name": "f", "color": "blue"},
            {"id": 7, "name": "g", "color": "orange"}
        ],
        "turns": [],
        "init": {
            "harbors": [{"hex": 1, "edge": "a", "resource": "grain"}],
            "grid": "..WoBr..OrGr..",
            "name": "standard34"
        }
    });

    let game = Game::from_value(legacy).unwrap();
    assert_eq!(game.harbors.get("1a"), Some(&Some("grain".to_string())));
    assert_eq!(game.grid.len(), 1);
    assert_eq!(game.grid[0].len(), 7);
    assert!(!game.extra.contains_key("init"));
    assert!(!game.is_sync);
}
