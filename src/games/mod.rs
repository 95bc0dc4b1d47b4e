//! # Game Engine
//!
//! One command-driven engine shared by the three chat games. Each game is a
//! variant inside [`engine::GameEngine`]; the engine owns the round session,
//! the phase machine and the deferred-resolution bookkeeping, while the
//! variant modules hold the rules.
//!
//! ```text
//! chat line ─► commands (parse) ─► GameEngine ─► variant rules
//!                                      │
//!                                      ├─► GameEvent stream (renderer)
//!                                      └─► Deferred ticket ─► timer ─► resolve()
//! ```
//!
//! ## Components
//!
//! - [`rng`] - uniform integers and Fisher-Yates shuffle over a seedable RNG
//! - [`players`] - join-ordered player registry (score / balance / attempts)
//! - [`commands`] - per-game chat grammar
//! - [`memory`], [`roulette`], [`number_guess`] - rule sets
//! - [`engine`] - session, phases, persistence blobs
//! - [`timer`] - cancellable one-shot resolution timer
//! - [`events`] - renderer-facing notifications
//! - [`errors`] - error taxonomy

pub mod commands;
pub mod engine;
pub mod errors;
pub mod events;
pub mod memory;
pub mod number_guess;
pub mod players;
pub mod rng;
pub mod roulette;
pub mod timer;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use engine::{Deferred, EngineOptions, GameEngine, Outcome, Phase, ResolutionTicket};
pub use errors::{ErrorKind, GameError};
pub use events::GameEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GameKind {
    Memory,
    Roulette,
    NumberGuess,
}

impl GameKind {
    /// Storage id / metrics key.
    pub fn slug(self) -> &'static str {
        match self {
            GameKind::Memory => "emote-memory",
            GameKind::Roulette => "gamba-light",
            GameKind::NumberGuess => "number-guess",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            GameKind::Memory => "Memory",
            GameKind::Roulette => "Roulette",
            GameKind::NumberGuess => "NumberGuess",
        }
    }
}

impl FromStr for GameKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "emote-memory" => Ok(GameKind::Memory),
            "roulette" | "gamba" | "gamba-light" => Ok(GameKind::Roulette),
            "guess" | "number-guess" | "numberguess" => Ok(GameKind::NumberGuess),
            other => Err(format!("unknown game '{}'", other)),
        }
    }
}

impl fmt::Display for GameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn game_kind_aliases() {
        assert_eq!("memory".parse::<GameKind>().unwrap(), GameKind::Memory);
        assert_eq!("GAMBA-LIGHT".parse::<GameKind>().unwrap(), GameKind::Roulette);
        assert_eq!("guess".parse::<GameKind>().unwrap(), GameKind::NumberGuess);
        assert!("chess".parse::<GameKind>().is_err());
        assert_eq!(GameKind::NumberGuess.slug(), "number-guess");
    }
}
