mod common;

use chatgames::games::number_guess::HintDirection;
use chatgames::games::{GameEngine, GameError, GameEvent, GameKind, Phase};
use common::{at, engine, options, t0};

fn started() -> (GameEngine, i64) {
    let mut e = engine(GameKind::NumberGuess);
    e.start_round(t0()).unwrap();
    let target = e.number_guess().unwrap().target().unwrap();
    (e, target)
}

fn guess(e: &mut GameEngine, user: &str, value: i64, secs: i64) -> Vec<GameEvent> {
    e.handle_chat(user, &format!("!guess {}", value), at(secs)).events
}

#[test]
fn hints_point_at_the_target() {
    let (mut e, target) = started();
    if target > 1 {
        let ev = guess(&mut e, "ida", target - 1, 1);
        assert!(matches!(ev[0], GameEvent::Hint { direction: HintDirection::Higher, .. }));
    }
    if target < 100 {
        let ev = guess(&mut e, "jon", target + 1, 1);
        assert!(matches!(ev[0], GameEvent::Hint { direction: HintDirection::Lower, .. }));
    }
}

#[test]
fn winning_records_one_highscore_with_attempts() {
    let (mut e, target) = started();
    let wrong = if target == 1 { 2 } else { 1 };
    guess(&mut e, "kim", wrong, 0);
    guess(&mut e, "kim", wrong, 31);
    let ev = guess(&mut e, "kim", target, 62);
    match &ev[0] {
        GameEvent::GuessCorrect { attempts, elapsed_seconds, .. } => {
            assert_eq!(*attempts, 3);
            assert_eq!(*elapsed_seconds, 62.0);
        }
        other => panic!("Expected GuessCorrect, got {:?}", other),
    }
    assert!(matches!(ev[1], GameEvent::HighscoreUpdated { rank: Some(1) }));
    let scores = e.number_guess().unwrap().highscores();
    assert_eq!(scores.len(), 1);
    assert_eq!(scores[0].attempts, 3);
    assert_eq!(e.phase(), Phase::RoundResolved);
    assert!(guess(&mut e, "kim", target, 200).is_empty(), "round is over");
}

#[test]
fn cooldown_blocks_second_guess() {
    let (mut e, target) = started();
    let wrong = if target == 50 { 51 } else { 50 };
    assert!(!guess(&mut e, "lea", wrong, 0).is_empty());
    assert!(guess(&mut e, "lea", wrong, 29).is_empty());
    assert_eq!(e.number_guess().unwrap().attempts("lea"), 1);
    assert!(!guess(&mut e, "lea", wrong, 30).is_empty());
    assert_eq!(e.number_guess().unwrap().attempts("lea"), 2);
}

#[test]
fn out_of_range_guess_is_ignored() {
    let (mut e, _) = started();
    assert!(guess(&mut e, "max", 0, 0).is_empty());
    assert!(guess(&mut e, "max", 101, 0).is_empty());
    assert_eq!(e.number_guess().unwrap().attempts("max"), 0);
    // did not start the cooldown either
    assert!(!guess(&mut e, "max", 50, 1).is_empty());
}

#[test]
fn cooldowns_survive_a_new_round() {
    let (mut e, target) = started();
    guess(&mut e, "ned", target, 0);
    e.start_round(at(1)).unwrap();
    let new_target = e.number_guess().unwrap().target().unwrap();
    assert!(guess(&mut e, "ned", new_target, 10).is_empty());
    assert_eq!(e.session().round_number, 2);
}

#[test]
fn invalid_range_is_rejected() {
    let mut opts = options("4x2");
    opts.number_guess.min_number = 10;
    opts.number_guess.max_number = 10;
    let mut e = GameEngine::new(GameKind::NumberGuess, opts).unwrap();
    assert_eq!(
        e.start_round(t0()).unwrap_err(),
        GameError::InvalidRange { min: 10, max: 10 }
    );
}

#[test]
fn highscores_stay_bounded_and_sorted() {
    let mut e = engine(GameKind::NumberGuess);
    let mut clock = 0;
    for round in 0..12 {
        e.start_round(at(clock)).unwrap();
        let target = e.number_guess().unwrap().target().unwrap();
        let wrong = if target == 1 { 2 } else { 1 };
        let player = format!("p{}", round);
        // rounds alternate between 1 and 2 attempts
        if round % 2 == 1 {
            guess(&mut e, &player, wrong, clock);
            clock += 31;
        }
        guess(&mut e, &player, target, clock + round);
        clock += 100;
    }
    let scores = e.number_guess().unwrap().highscores();
    assert_eq!(scores.len(), 10);
    for w in scores.windows(2) {
        let a = (w[0].attempts, w[0].elapsed_seconds);
        let b = (w[1].attempts, w[1].elapsed_seconds);
        assert!(a <= b, "{:?} before {:?}", a, b);
    }
    assert!(scores.iter().take(6).all(|h| h.attempts == 1));
}
