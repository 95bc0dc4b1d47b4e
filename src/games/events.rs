//! Discrete state-change notifications emitted by the engine.
//!
//! A renderer only has to apply these in order to stay in sync; it never needs
//! to poll engine internals.

use serde::Serialize;
use std::fmt;

use super::number_guess::HintDirection;
use super::roulette::{Color, Odds};

/// One winning or losing stake inside a resolved spin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settlement {
    pub player: String,
    pub amount: i64,
    /// Amount credited back (0 for losers).
    pub payout: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GameEvent {
    RoundStarted {
        round: u32,
    },
    PlayerJoined {
        player: String,
        points: i64,
    },
    PlayerReset {
        player: String,
        points: i64,
    },
    BalanceAdded {
        player: String,
        amount: i64,
        balance: i64,
    },
    TurnChanged {
        player: String,
    },
    CardFlipped {
        player: String,
        index: usize,
        label: String,
        face: String,
    },
    PairMatched {
        player: String,
        pair_key: String,
        face: String,
        score: i64,
    },
    PairMissed {
        player: String,
        first: String,
        second: String,
    },
    RoundEnded {
        round: u32,
        /// Everyone sharing the top score (Memory) or the single solver (NumberGuess).
        winners: Vec<String>,
        top_score: i64,
    },
    BetPlaced {
        player: String,
        amount: i64,
        color: Color,
        balance: i64,
    },
    SpinStarted {
        segment: usize,
    },
    SpinResolved {
        result: Color,
        winners: Vec<Settlement>,
        losers: Vec<Settlement>,
    },
    HistoryUpdated {
        recent: Vec<Color>,
    },
    OddsUpdated {
        odds: Odds,
        segments: usize,
    },
    Hint {
        player: String,
        guess: i64,
        direction: HintDirection,
    },
    GuessCorrect {
        player: String,
        target: i64,
        attempts: u32,
        elapsed_seconds: f64,
    },
    HighscoreUpdated {
        /// 1-based placement of the new row, `None` if it fell off the list.
        rank: Option<usize>,
    },
    /// Soft, non-fatal message for the invoking user (rejected bet, full game, ...).
    Notice {
        player: Option<String>,
        message: String,
    },
}

impl GameEvent {
    pub fn notice(player: Option<&str>, message: impl Into<String>) -> Self {
        GameEvent::Notice {
            player: player.map(str::to_string),
            message: message.into(),
        }
    }
}

fn names(list: &[String]) -> String {
    match list {
        [] => "nobody".to_string(),
        [one] => one.clone(),
        _ => list.join(" & "),
    }
}

/// Chat-style one-liners, as a text renderer would print them.
impl fmt::Display for GameEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameEvent::RoundStarted { round } => write!(f, "Round #{} started!", round),
            GameEvent::PlayerJoined { player, points } => {
                write!(f, "{} joined the game ({} points).", player, points)
            }
            GameEvent::PlayerReset { player, points } => {
                write!(f, "{} was reset to {}.", player, points)
            }
            GameEvent::BalanceAdded {
                player,
                amount,
                balance,
            } => write!(f, "{} received {} (balance {}).", player, amount, balance),
            GameEvent::TurnChanged { player } => write!(f, "It's {}'s turn.", player),
            GameEvent::CardFlipped {
                player, label, face, ..
            } => write!(f, "{} flips {}: {}", player, label, face),
            GameEvent::PairMatched {
                player, face, score, ..
            } => write!(f, "{} found a pair ({})! Score: {}", player, face, score),
            GameEvent::PairMissed { player, .. } => write!(f, "{} found no pair.", player),
            GameEvent::RoundEnded {
                round,
                winners,
                top_score,
            } => write!(
                f,
                "Round #{} over! Winner: {} ({}).",
                round,
                names(winners),
                top_score
            ),
            GameEvent::BetPlaced {
                player,
                amount,
                color,
                balance,
            } => write!(
                f,
                "{} bets {} on {} (balance {}).",
                player, amount, color, balance
            ),
            GameEvent::SpinStarted { .. } => write!(f, "The wheel is spinning..."),
            GameEvent::SpinResolved {
                result,
                winners,
                losers,
            } => {
                write!(f, "The ball lands on {}.", result)?;
                for w in winners {
                    write!(f, " {} wins {}!", w.player, w.payout)?;
                }
                if !losers.is_empty() {
                    let lost: Vec<String> = losers.iter().map(|l| l.player.clone()).collect();
                    write!(f, " Lost: {}.", lost.join(", "))?;
                }
                Ok(())
            }
            GameEvent::HistoryUpdated { recent } => {
                let recent: Vec<String> = recent.iter().map(|c| c.to_string()).collect();
                write!(f, "Last results: {}", recent.join(" "))
            }
            GameEvent::OddsUpdated { odds, segments } => write!(
                f,
                "New odds: red {}%, black {}%, green {}% ({} segments).",
                odds.red, odds.black, odds.green, segments
            ),
            GameEvent::Hint {
                player,
                guess,
                direction,
            } => {
                let dir = match direction {
                    HintDirection::Higher => "Higher",
                    HintDirection::Lower => "Lower",
                };
                write!(f, "{} guesses {}: {}!", player, guess, dir)
            }
            GameEvent::GuessCorrect {
                player,
                target,
                attempts,
                elapsed_seconds,
            } => write!(
                f,
                "Congratulations, {} got it in {} attempts! The number was {}. Time: {:.1} s.",
                player, attempts, target, elapsed_seconds
            ),
            GameEvent::HighscoreUpdated { rank: Some(rank) } => {
                write!(f, "New highscore entry at #{}.", rank)
            }
            GameEvent::HighscoreUpdated { rank: None } => write!(f, "No highscore this time."),
            GameEvent::Notice {
                player: Some(player),
                message,
            } => write!(f, "@{} {}", player, message),
            GameEvent::Notice {
                player: None,
                message,
            } => f.write_str(message),
        }
    }
}
