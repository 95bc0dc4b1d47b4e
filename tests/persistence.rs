mod common;

use chatgames::games::{GameKind, GameError};
use chatgames::storage::{GameStorage, StorageError};
use common::{engine, t0};
use serde_json::json;
use tempfile::TempDir;

#[test]
fn roulette_blob_survives_a_restart() {
    let dir = TempDir::new().unwrap();
    let storage = GameStorage::new(dir.path(), GameKind::Roulette.slug()).unwrap();

    let mut e = engine(GameKind::Roulette);
    e.handle_chat("ava", "!bet 100 red", t0());
    let deferred = e.spin().unwrap().deferred.unwrap();
    e.resolve(deferred.ticket, t0());
    tokio_test::assert_ok!(storage.save(&e.save_blob()));

    let mut fresh = engine(GameKind::Roulette);
    fresh.restore_blob(storage.load().unwrap().unwrap()).unwrap();
    let before = e.roulette().unwrap();
    let after = fresh.roulette().unwrap();
    assert_eq!(after.players().to_vec(), before.players().to_vec());
    assert_eq!(after.history(), before.history());
    assert_eq!(after.settings(), before.settings());
}

#[test]
fn guess_blob_accepts_legacy_field_names() {
    let mut e = engine(GameKind::NumberGuess);
    let blob = json!({
        "settings": { "minNumber": 5, "maxNumber": 50, "cooldown": 10 },
        "highscores": [
            { "username": "zed", "attempts": 4, "time": 12.5, "date": "2024-01-01T10:00:00Z" },
            { "username": "amy", "attempts": 2, "time": 30.0, "date": "2024-01-02T10:00:00Z" }
        ]
    });
    e.restore_blob(blob).unwrap();
    let g = e.number_guess().unwrap();
    assert_eq!(g.settings().min_number, 5);
    assert_eq!(g.settings().cooldown_seconds, 10);
    assert_eq!(g.highscores()[0].username, "amy");
}

#[test]
fn roulette_blob_accepts_legacy_layout() {
    let mut e = engine(GameKind::Roulette);
    let blob = json!({
        "settings": {
            "channel": "somechannel",
            "startingBalance": 500,
            "redChance": 60,
            "blackChance": 35,
            "greenChance": 5,
            "redMultiplier": 2,
            "blackMultiplier": 2.5,
            "greenMultiplier": 14
        },
        "players": {
            "ann": { "balance": 700, "wins": 2, "losses": 1, "totalWon": 200, "totalLost": 100 },
            "bob": { "balance": 1000, "wins": 0, "losses": 0 }
        },
        "history": [
            { "result": "green", "timestamp": "2024-03-01T18:00:00.000Z",
              "bets": [{ "username": "ann", "amount": 50, "color": "green" }] }
        ]
    });
    e.restore_blob(blob).unwrap();

    let g = e.roulette().unwrap();
    assert_eq!(g.settings().starting_balance, 500);
    assert_eq!(g.settings().red_chance, 60);
    assert_eq!(g.settings().black_multiplier, 2.5);
    let players = g.players().to_vec();
    assert_eq!(players.len(), 2);
    assert_eq!(players[0].name, "ann");
    assert_eq!((players[0].points, players[0].total_won, players[0].total_lost), (700, 200, 100));
    assert_eq!(players[1].name, "bob");
    assert_eq!(g.history().len(), 1);
    assert_eq!(g.history()[0].bets[0].amount, 50);
}

#[test]
fn malformed_blob_changes_nothing() {
    let mut e = engine(GameKind::NumberGuess);
    let before = e.save_blob();
    let bad = json!({ "settings": { "min_number": "one" } });
    assert!(matches!(e.restore_blob(bad), Err(GameError::InvalidSave(_))));
    let inverted = json!({ "settings": { "min_number": 9, "max_number": 3 } });
    assert!(e.restore_blob(inverted).is_err());
    assert_eq!(e.save_blob(), before);
}

#[test]
fn export_then_import_round_trip() {
    let dir = TempDir::new().unwrap();
    let storage = GameStorage::new(dir.path().join("data"), "emote-memory").unwrap();
    let e = engine(GameKind::Memory);
    let out = dir.path().join(storage.default_export_name());
    storage.export_to(&out, &e.save_blob()).unwrap();
    let text = std::fs::read_to_string(&out).unwrap();
    assert!(text.contains('\n'), "export is pretty-printed");

    let imported = storage.import_from(&out).unwrap();
    assert_eq!(imported, e.save_blob());
    assert_eq!(storage.load().unwrap(), Some(imported));
}

#[test]
fn missing_import_is_not_found() {
    let dir = TempDir::new().unwrap();
    let storage = GameStorage::new(dir.path(), "number-guess").unwrap();
    let err = storage.import_from(dir.path().join("nope.json")).unwrap_err();
    assert!(matches!(err, StorageError::NotFound(_)));
    assert!(storage.load().unwrap().is_none());
}
