mod common;

use chatgames::games::roulette::{Color, RouletteSettings};
use chatgames::games::{GameEngine, GameError, GameEvent, GameKind, Phase};
use common::{engine, options, t0};

fn balance(e: &GameEngine, name: &str) -> i64 {
    e.roulette().unwrap().players().get(name).map(|p| p.points).unwrap_or(-1)
}

#[test]
fn bet_debits_and_queues() {
    let mut e = engine(GameKind::Roulette);
    let out = e.handle_chat("ann", "!bet 250 red", t0());
    assert!(out.events.iter().any(|ev| matches!(
        ev,
        GameEvent::BetPlaced { amount: 250, color: Color::Red, balance: 750, .. }
    )));
    assert_eq!(balance(&e, "ann"), 750);
    assert_eq!(e.roulette().unwrap().pending_bets().len(), 1);
}

#[test]
fn spin_without_bets_changes_nothing() {
    let mut e = engine(GameKind::Roulette);
    assert_eq!(e.spin().unwrap_err(), GameError::NoBetsPlaced);
    assert!(e.roulette().unwrap().history().is_empty());
    assert_eq!(e.phase(), Phase::Idle);
}

#[test]
fn forced_black_pays_black_bettors_only() {
    let mut opts = options("4x2");
    opts.roulette.black_multiplier = 2.5;
    let mut e = GameEngine::new(GameKind::Roulette, opts).unwrap();
    e.handle_chat("bea", "!bet 33 black", t0());
    e.handle_chat("rob", "!bet 10 red", t0());
    e.roulette_mut()
        .unwrap()
        .set_segments(vec![Color::Red, Color::Red, Color::Black]);

    let deferred = e.spin_at(2).unwrap().deferred.unwrap();
    let events = e.resolve(deferred.ticket, t0());
    match &events[0] {
        GameEvent::SpinResolved { result, winners, losers } => {
            assert_eq!(*result, Color::Black);
            assert_eq!(winners.len(), 1);
            assert_eq!(winners[0].player, "bea");
            assert_eq!(winners[0].payout, 82);
            assert_eq!(losers[0].player, "rob");
        }
        other => panic!("Expected SpinResolved, got {:?}", other),
    }
    assert_eq!(balance(&e, "bea"), 1000 - 33 + 82);
    assert_eq!(balance(&e, "rob"), 990);
    let bea = e.roulette().unwrap().players().get("bea").unwrap().clone();
    assert_eq!((bea.wins, bea.total_won), (1, 49));
    assert!(e.roulette().unwrap().pending_bets().is_empty());
    assert!(matches!(&events[1], GameEvent::HistoryUpdated { recent } if recent == &vec![Color::Black]));
}

#[test]
fn rejected_bets_leave_balance_alone() {
    let mut e = engine(GameKind::Roulette);
    for text in ["!bet 0 red", "!bet 5000 red", "!bet 10 purple"] {
        let out = e.handle_chat("cat", text, t0());
        assert!(
            out.events.iter().any(|ev| matches!(ev, GameEvent::Notice { .. })),
            "{} should be refused",
            text
        );
    }
    assert_eq!(balance(&e, "cat"), 1000);
    assert!(e.roulette().unwrap().pending_bets().is_empty());
}

#[test]
fn betting_is_locked_while_spinning() {
    let mut e = engine(GameKind::Roulette);
    e.handle_chat("dan", "!bet 10 green", t0());
    let deferred = e.spin().unwrap().deferred.unwrap();
    assert_eq!(e.spin().unwrap_err(), GameError::SpinInProgress);
    let out = e.handle_chat("dan", "!bet 10 red", t0());
    assert!(matches!(&out.events[..], [GameEvent::Notice { .. }]));
    assert_eq!(balance(&e, "dan"), 990);
    e.resolve(deferred.ticket, t0());
    assert_eq!(e.roulette().unwrap().history().len(), 1);
}

#[test]
fn join_is_idempotent_and_never_bets() {
    let mut e = engine(GameKind::Roulette);
    let first = e.handle_chat("eve", "!join", t0());
    assert!(matches!(&first.events[..], [GameEvent::PlayerJoined { points: 1000, .. }]));
    let again = e.handle_chat("eve", "!JOIN", t0());
    assert!(matches!(&again.events[..], [GameEvent::Notice { .. }]));
    assert!(e.roulette().unwrap().pending_bets().is_empty());
    assert_eq!(e.roulette().unwrap().players().len(), 1);
}

#[test]
fn overfull_odds_are_normalized() {
    let mut e = engine(GameKind::Roulette);
    let settings = RouletteSettings {
        red_chance: 70,
        black_chance: 70,
        green_chance: 5,
        ..RouletteSettings::default()
    };
    let events = e.update_roulette_settings(settings).unwrap();
    match &events[0] {
        GameEvent::OddsUpdated { odds, .. } => {
            assert!(odds.green >= 5);
            assert_eq!(odds.red + odds.black + odds.green, 100);
        }
        other => panic!("Expected OddsUpdated, got {:?}", other),
    }
}

#[test]
fn segment_rounding_may_drift_from_nominal() {
    let mut e = engine(GameKind::Roulette);
    let settings = RouletteSettings {
        red_chance: 35,
        black_chance: 35,
        green_chance: 30,
        ..RouletteSettings::default()
    };
    e.update_roulette_settings(settings).unwrap();
    let segments = e.roulette().unwrap().segments();
    assert_eq!(segments.len(), 37);
    assert_eq!(segments.iter().filter(|c| **c == Color::Green).count(), 11);
}

#[test]
fn host_reset_and_top_up() {
    let mut e = engine(GameKind::Roulette);
    e.handle_chat("fay", "!bet 400 red", t0());
    e.add_balance("fay", 500).unwrap();
    assert_eq!(balance(&e, "fay"), 1100);
    e.reset_player("fay").unwrap();
    assert_eq!(balance(&e, "fay"), 1000);
    assert_eq!(
        e.add_balance("ghost", 500).unwrap_err(),
        GameError::UnknownPlayer("ghost".into())
    );
}

#[test]
fn recent_history_is_newest_first_and_bounded() {
    let mut e = engine(GameKind::Roulette);
    e.roulette_mut()
        .unwrap()
        .set_segments(vec![Color::Red, Color::Black]);
    for i in 0..25 {
        e.handle_chat("hal", "!bet 1 red", t0());
        let deferred = e.spin_at(i % 2).unwrap().deferred.unwrap();
        e.resolve(deferred.ticket, t0());
    }
    let r = e.roulette().unwrap();
    assert_eq!(r.history().len(), 25);
    let recent = r.recent_history();
    assert_eq!(recent.len(), 20);
    // spin 24 landed on index 0
    assert_eq!(recent[0].result, Color::Red);
    assert_eq!(recent[1].result, Color::Black);
}

#[test]
fn bet_refused_mid_spin_still_announces_new_player() {
    let mut e = engine(GameKind::Roulette);
    e.handle_chat("a", "!bet 10 red", t0());
    e.spin().unwrap();

    let out = e.handle_chat("newbie", "!bet 10 red", t0());
    assert!(matches!(
        out.events.as_slice(),
        [GameEvent::PlayerJoined { player, points: 1000 }, GameEvent::Notice { .. }] if player == "newbie"
    ));
    assert_eq!(balance(&e, "newbie"), 1000);
    assert_eq!(e.roulette().unwrap().pending_bets().len(), 1);

    // A known player's refused bet is only a notice.
    let out = e.handle_chat("newbie", "!bet 10 red", t0());
    assert!(matches!(out.events.as_slice(), [GameEvent::Notice { .. }]));
}
