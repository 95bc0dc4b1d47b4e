//! Number guessing: the host picks a secret number, chat guesses with `!guess <n>`.
//!
//! - Guesses outside the round range, outside an active round, or inside a
//!   user's cooldown window are dropped without touching any state.
//! - Each accepted guess stamps the user's cooldown and counts an attempt.
//! - The correct guess ends the round and records a highscore row. The table
//!   keeps the best ten by (attempts, elapsed time).
//! - Cooldowns survive new rounds; they are in-memory only.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

use super::errors::GameError;
use super::events::GameEvent;
use super::players::PlayerRegistry;
use super::rng::random_int;

/// Highscore table length.
pub const MAX_HIGHSCORES: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HintDirection {
    Higher,
    Lower,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Highscore {
    pub username: String,
    pub attempts: u32,
    #[serde(alias = "time")]
    pub elapsed_seconds: f64,
    #[serde(alias = "date")]
    pub timestamp: DateTime<Utc>,
}

impl Highscore {
    fn rank_cmp(&self, other: &Highscore) -> Ordering {
        self.attempts.cmp(&other.attempts).then(
            self.elapsed_seconds
                .partial_cmp(&other.elapsed_seconds)
                .unwrap_or(Ordering::Equal),
        )
    }
}

/// Insert `entry` keeping the table sorted and bounded. Returns the 1-based
/// rank, or `None` if the row did not make the cut. Equal rows keep arrival order.
pub fn insert_highscore(table: &mut Vec<Highscore>, entry: Highscore) -> Option<usize> {
    let pos = table
        .iter()
        .position(|h| h.rank_cmp(&entry) == Ordering::Greater)
        .unwrap_or(table.len());
    table.insert(pos, entry);
    table.truncate(MAX_HIGHSCORES);
    (pos < MAX_HIGHSCORES).then_some(pos + 1)
}

/// Longest accepted guess cooldown (one day).
pub const MAX_COOLDOWN_SECONDS: u64 = 86_400;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberGuessSettings {
    #[serde(default = "default_min", alias = "minNumber")]
    pub min_number: i64,
    #[serde(default = "default_max", alias = "maxNumber")]
    pub max_number: i64,
    #[serde(default = "default_cooldown", alias = "cooldown")]
    pub cooldown_seconds: u64,
}

fn default_min() -> i64 {
    1
}
fn default_max() -> i64 {
    100
}
fn default_cooldown() -> u64 {
    30
}

impl Default for NumberGuessSettings {
    fn default() -> Self {
        Self {
            min_number: default_min(),
            max_number: default_max(),
            cooldown_seconds: default_cooldown(),
        }
    }
}

/// Persisted shape: `{ settings, highscores }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumberGuessSave {
    pub settings: NumberGuessSettings,
    #[serde(default)]
    pub highscores: Vec<Highscore>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GuessOutcome {
    Ignored,
    Hint(HintDirection),
    Correct { attempts: u32, elapsed_seconds: f64 },
}

#[derive(Debug, Clone)]
pub struct NumberGuessGame {
    settings: NumberGuessSettings,
    min: i64,
    max: i64,
    target: Option<i64>,
    active: bool,
    started_at: Option<DateTime<Utc>>,
    players: PlayerRegistry,
    cooldowns: HashMap<String, DateTime<Utc>>,
    highscores: Vec<Highscore>,
}

impl NumberGuessGame {
    pub fn new(settings: NumberGuessSettings) -> Self {
        Self {
            min: settings.min_number,
            max: settings.max_number,
            settings,
            target: None,
            active: false,
            started_at: None,
            players: PlayerRegistry::new(0, None),
            cooldowns: HashMap::new(),
            highscores: Vec::new(),
        }
    }

    /// Pick a new secret in `[min, max]` and clear per-round attempts.
    pub fn start_round<R: Rng + ?Sized>(&mut self, rng: &mut R, min: i64, max: i64, now: DateTime<Utc>) -> Result<(), GameError> {
        if min >= max {
            return Err(GameError::InvalidRange { min, max });
        }
        self.target = Some(random_int(rng, min, max)?);
        self.min = min;
        self.max = max;
        self.active = true;
        self.started_at = Some(now);
        self.players.clear_attempts();
        Ok(())
    }

    pub fn guess(&mut self, name: &str, value: i64, now: DateTime<Utc>, round: u32) -> (GuessOutcome, Vec<GameEvent>) {
        let Some(target) = self.target.filter(|_| self.active) else {
            return (GuessOutcome::Ignored, Vec::new());
        };
        if value < self.min || value > self.max || self.cooling_down(name, now) {
            return (GuessOutcome::Ignored, Vec::new());
        }
        self.cooldowns.insert(name.to_string(), now);
        let attempts = match self.players.join(name) {
            Ok(_) => match self.players.get_mut(name) {
                Some(p) => {
                    p.attempts += 1;
                    p.attempts
                }
                None => 1,
            },
            Err(_) => 1,
        };

        let direction = match value.cmp(&target) {
            Ordering::Less => HintDirection::Higher,
            Ordering::Greater => HintDirection::Lower,
            Ordering::Equal => {
                return self.finish(name, target, attempts, now, round);
            }
        };
        (
            GuessOutcome::Hint(direction),
            vec![GameEvent::Hint {
                player: name.to_string(),
                guess: value,
                direction,
            }],
        )
    }

    fn finish(&mut self, name: &str, target: i64, attempts: u32, now: DateTime<Utc>, round: u32) -> (GuessOutcome, Vec<GameEvent>) {
        let started = self.started_at.unwrap_or(now);
        let tenths = (now - started).num_milliseconds().max(0) as f64 / 100.0;
        let elapsed_seconds = tenths.round() / 10.0;
        self.active = false;
        let rank = insert_highscore(
            &mut self.highscores,
            Highscore {
                username: name.to_string(),
                attempts,
                elapsed_seconds,
                timestamp: now,
            },
        );
        let events = vec![
            GameEvent::GuessCorrect {
                player: name.to_string(),
                target,
                attempts,
                elapsed_seconds,
            },
            GameEvent::HighscoreUpdated { rank },
            GameEvent::RoundEnded {
                round,
                winners: vec![name.to_string()],
                top_score: attempts as i64,
            },
        ];
        (
            GuessOutcome::Correct {
                attempts,
                elapsed_seconds,
            },
            events,
        )
    }

    /// Cooldown as a duration, capped at [`MAX_COOLDOWN_SECONDS`].
    fn cooldown_window(&self) -> ChronoDuration {
        ChronoDuration::seconds(self.settings.cooldown_seconds.min(MAX_COOLDOWN_SECONDS) as i64)
    }

    fn cooling_down(&self, name: &str, now: DateTime<Utc>) -> bool {
        let window = self.cooldown_window();
        self.cooldowns
            .get(name)
            .map(|last| now.signed_duration_since(*last) < window)
            .unwrap_or(false)
    }

    /// Seconds left before `name` may guess again (0 when free).
    pub fn cooldown_remaining(&self, name: &str, now: DateTime<Utc>) -> i64 {
        let window = self.cooldown_window();
        match self.cooldowns.get(name) {
            Some(last) => {
                let left = *last + window - now;
                (left.num_milliseconds().max(0) + 999) / 1000
            }
            None => 0,
        }
    }

    pub fn attempts(&self, name: &str) -> u32 {
        self.players.get(name).map(|p| p.attempts).unwrap_or(0)
    }

    pub fn target(&self) -> Option<i64> {
        self.target
    }

    pub fn range(&self) -> (i64, i64) {
        (self.min, self.max)
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn highscores(&self) -> &[Highscore] {
        &self.highscores
    }

    pub fn settings(&self) -> &NumberGuessSettings {
        &self.settings
    }

    pub fn to_save(&self) -> NumberGuessSave {
        NumberGuessSave {
            settings: self.settings.clone(),
            highscores: self.highscores.clone(),
        }
    }

    pub fn restore(&mut self, save: NumberGuessSave) -> Result<(), GameError> {
        if save.settings.min_number >= save.settings.max_number {
            return Err(GameError::InvalidRange {
                min: save.settings.min_number,
                max: save.settings.max_number,
            });
        }
        if save.settings.cooldown_seconds > MAX_COOLDOWN_SECONDS {
            return Err(GameError::InvalidCooldown {
                seconds: save.settings.cooldown_seconds,
                max: MAX_COOLDOWN_SECONDS,
            });
        }
        let mut table = Vec::with_capacity(MAX_HIGHSCORES);
        for h in save.highscores {
            insert_highscore(&mut table, h);
        }
        self.settings = save.settings;
        self.highscores = table;
        Ok(())
    }
}
