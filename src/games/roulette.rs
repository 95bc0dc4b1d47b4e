//! Mini roulette ("Gamba Light"): viewers bet on red, black or green, the host spins.
//!
//! Overview
//! - `!bet <amount> <color>` debits the stake immediately and queues the bet
//! - `!join` registers a player with the starting balance (no bet)
//! - The host spins; after the spin delay one segment is drawn uniformly from the
//!   wheel and every bet on that color pays `floor(amount * multiplier)`
//! - Losers are not debited again; the queue is cleared after every spin
//!
//! Wheel layout: 36 nominal segments split by the configured chances, each color
//! count rounded independently. The total can drift from 36 (e.g. 50/45/5 gives
//! 18+16+2 = 36 but 35/35/30 gives 13+13+11 = 37); this is accepted as an approximation.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

use super::errors::GameError;
use super::events::{GameEvent, Settlement};
use super::players::{deserialize_players, Player, PlayerRegistry};
use super::rng::shuffle;

/// Number of history rows exposed for display.
pub const RECENT_HISTORY: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Red,
    Black,
    Green,
}

impl FromStr for Color {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "red" => Ok(Color::Red),
            "black" => Ok(Color::Black),
            "green" => Ok(Color::Green),
            _ => Err(GameError::InvalidColor(s.to_string())),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Color::Red => "red",
            Color::Black => "black",
            Color::Green => "green",
        };
        f.write_str(s)
    }
}

/// Percent chances per color; always sums to 100 once normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Odds {
    pub red: u32,
    pub black: u32,
    pub green: u32,
}

/// Integer division rounding halves up.
fn round_div(n: u64, d: u64) -> u64 {
    (2 * n + d) / (2 * d)
}

/// Bring the three chances to a total of 100 while keeping green at or above
/// `green_floor`. Green has priority; red and black share the rest in their
/// requested proportion.
pub fn normalize_odds(red: u32, black: u32, green: u32, green_floor: u32) -> Odds {
    let total = red as u64 + black as u64 + green as u64;
    if total == 100 && green >= green_floor {
        return Odds { red, black, green };
    }
    let green = green.max(green_floor).min(100);
    let remaining = (100 - green) as u64;
    let rb = red as u64 + black as u64;
    let red_share = if rb == 0 {
        round_div(remaining, 2)
    } else {
        round_div(red as u64 * remaining, rb)
    };
    Odds {
        red: red_share as u32,
        black: (remaining - red_share) as u32,
        green,
    }
}

/// Lay out `total` nominal segments by percentage, then shuffle them.
pub fn build_segments<R: Rng + ?Sized>(rng: &mut R, odds: Odds, total: usize) -> Vec<Color> {
    let count = |pct: u32| round_div(total as u64 * pct as u64, 100) as usize;
    let mut segments = Vec::with_capacity(total + 2);
    segments.extend(std::iter::repeat(Color::Red).take(count(odds.red)));
    segments.extend(std::iter::repeat(Color::Black).take(count(odds.black)));
    segments.extend(std::iter::repeat(Color::Green).take(count(odds.green)));
    shuffle(rng, &segments)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouletteSettings {
    #[serde(default = "default_starting_balance", alias = "startingBalance")]
    pub starting_balance: i64,
    #[serde(default = "default_red_chance", alias = "redChance")]
    pub red_chance: u32,
    #[serde(default = "default_black_chance", alias = "blackChance")]
    pub black_chance: u32,
    #[serde(default = "default_green_chance", alias = "greenChance")]
    pub green_chance: u32,
    #[serde(default = "default_even_multiplier", alias = "redMultiplier")]
    pub red_multiplier: f64,
    #[serde(default = "default_even_multiplier", alias = "blackMultiplier")]
    pub black_multiplier: f64,
    #[serde(default = "default_green_multiplier", alias = "greenMultiplier")]
    pub green_multiplier: f64,
    /// Lowest green share normalization may produce.
    #[serde(default = "default_green_floor", alias = "greenFloor")]
    pub green_floor: u32,
    #[serde(default = "default_total_segments", alias = "totalSegments")]
    pub total_segments: usize,
    #[serde(default = "default_spin_duration_ms", alias = "spinDurationMs")]
    pub spin_duration_ms: u64,
}

fn default_starting_balance() -> i64 {
    1000
}
fn default_red_chance() -> u32 {
    50
}
fn default_black_chance() -> u32 {
    45
}
fn default_green_chance() -> u32 {
    5
}
fn default_even_multiplier() -> f64 {
    2.0
}
fn default_green_multiplier() -> f64 {
    14.0
}
fn default_green_floor() -> u32 {
    5
}
fn default_total_segments() -> usize {
    36
}
fn default_spin_duration_ms() -> u64 {
    8000
}

impl Default for RouletteSettings {
    fn default() -> Self {
        Self {
            starting_balance: default_starting_balance(),
            red_chance: default_red_chance(),
            black_chance: default_black_chance(),
            green_chance: default_green_chance(),
            red_multiplier: default_even_multiplier(),
            black_multiplier: default_even_multiplier(),
            green_multiplier: default_green_multiplier(),
            green_floor: default_green_floor(),
            total_segments: default_total_segments(),
            spin_duration_ms: default_spin_duration_ms(),
        }
    }
}

impl RouletteSettings {
    pub fn multiplier(&self, color: Color) -> f64 {
        match color {
            Color::Red => self.red_multiplier,
            Color::Black => self.black_multiplier,
            Color::Green => self.green_multiplier,
        }
    }

    pub fn odds(&self) -> Odds {
        normalize_odds(
            self.red_chance,
            self.black_chance,
            self.green_chance,
            self.green_floor,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bet {
    pub username: String,
    pub amount: i64,
    pub color: Color,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpinRecord {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub result: Color,
    pub timestamp: DateTime<Utc>,
    pub bets: Vec<Bet>,
}

/// Persisted shape: `{ settings, players, history }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouletteSave {
    pub settings: RouletteSettings,
    #[serde(default, deserialize_with = "deserialize_players")]
    pub players: Vec<Player>,
    #[serde(default)]
    pub history: Vec<SpinRecord>,
}

/// A spin that has been drawn but not yet applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingSpin {
    pub segment: usize,
    pub result: Color,
    pub delay: Duration,
}

#[derive(Debug, Clone)]
pub struct RouletteGame {
    settings: RouletteSettings,
    segments: Vec<Color>,
    players: PlayerRegistry,
    bets: Vec<Bet>,
    history: Vec<SpinRecord>,
    pending: Option<PendingSpin>,
}

impl RouletteGame {
    pub fn new<R: Rng + ?Sized>(mut settings: RouletteSettings, rng: &mut R) -> Self {
        let odds = settings.odds();
        settings.red_chance = odds.red;
        settings.black_chance = odds.black;
        settings.green_chance = odds.green;
        let segments = build_segments(rng, odds, settings.total_segments);
        let players = PlayerRegistry::new(settings.starting_balance, None);
        Self {
            settings,
            segments,
            players,
            bets: Vec::new(),
            history: Vec::new(),
            pending: None,
        }
    }

    /// `!join`: register with the starting balance, or report the current one.
    pub fn join(&mut self, name: &str) -> Vec<GameEvent> {
        if let Some(p) = self.players.get(name) {
            return vec![GameEvent::notice(
                Some(name),
                format!("{} is already playing with a balance of {}", name, p.points),
            )];
        }
        match self.players.join(name) {
            Ok(p) => vec![GameEvent::PlayerJoined {
                player: p.name.clone(),
                points: p.points,
            }],
            Err(e) => vec![GameEvent::notice(Some(name), e.to_string())],
        }
    }

    /// Register an unknown bettor. Returns the join event, or nothing when
    /// `name` is already seated.
    pub fn register_bettor(&mut self, name: &str) -> Result<Vec<GameEvent>, GameError> {
        if self.players.contains(name) {
            return Ok(Vec::new());
        }
        let p = self.players.join(name)?;
        Ok(vec![GameEvent::PlayerJoined {
            player: p.name.clone(),
            points: p.points,
        }])
    }

    /// `!bet`. Unknown bettors are registered first, and stay registered even
    /// when the bet itself is refused. On success the stake is debited and
    /// the bet queued.
    pub fn place_bet(&mut self, name: &str, amount: i64, color: &str) -> Result<Vec<GameEvent>, GameError> {
        let mut events = self.register_bettor(name)?;
        if self.pending.is_some() {
            return Err(GameError::SpinInProgress);
        }
        if amount <= 0 {
            return Err(GameError::InvalidAmount(amount));
        }
        let balance = self.players.get(name).map(|p| p.points).unwrap_or(0);
        if amount > balance {
            return Err(GameError::InsufficientBalance {
                wanted: amount,
                balance,
            });
        }
        let color: Color = color.parse()?;
        let balance = self.players.adjust(name, -amount)?;
        self.bets.push(Bet {
            username: name.to_string(),
            amount,
            color,
        });
        events.push(GameEvent::BetPlaced {
            player: name.to_string(),
            amount,
            color,
            balance,
        });
        Ok(events)
    }

    /// Draw a segment uniformly and lock the table until [`Self::resolve_spin`].
    pub fn begin_spin<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<PendingSpin, GameError> {
        self.check_can_spin()?;
        let idx = rng.gen_range(0..self.segments.len());
        self.begin_spin_at(idx)
    }

    /// Same as [`Self::begin_spin`] with a fixed segment index.
    pub fn begin_spin_at(&mut self, segment: usize) -> Result<PendingSpin, GameError> {
        self.check_can_spin()?;
        let result = *self
            .segments
            .get(segment)
            .ok_or(GameError::InvalidRange {
                min: 0,
                max: self.segments.len() as i64 - 1,
            })?;
        let pending = PendingSpin {
            segment,
            result,
            delay: Duration::from_millis(self.settings.spin_duration_ms),
        };
        self.pending = Some(pending);
        Ok(pending)
    }

    fn check_can_spin(&self) -> Result<(), GameError> {
        if self.pending.is_some() {
            return Err(GameError::SpinInProgress);
        }
        if self.bets.is_empty() {
            return Err(GameError::NoBetsPlaced);
        }
        if self.segments.is_empty() {
            return Err(GameError::EmptyWheel);
        }
        Ok(())
    }

    /// Pay winners, record history and clear the queue. No-op without a pending spin.
    pub fn resolve_spin(&mut self, now: DateTime<Utc>) -> Vec<GameEvent> {
        let Some(pending) = self.pending.take() else {
            return Vec::new();
        };
        let result = pending.result;
        let multiplier = self.settings.multiplier(result);
        let bets = std::mem::take(&mut self.bets);
        let mut winners = Vec::new();
        let mut losers = Vec::new();

        for bet in &bets {
            let Some(player) = self.players.get_mut(&bet.username) else {
                continue;
            };
            if bet.color == result {
                let payout = (bet.amount as f64 * multiplier).floor() as i64;
                player.points = player.points.saturating_add(payout);
                player.total_won = player.total_won.saturating_add(payout - bet.amount);
                player.wins += 1;
                winners.push(Settlement {
                    player: bet.username.clone(),
                    amount: bet.amount,
                    payout,
                });
            } else {
                player.total_lost = player.total_lost.saturating_add(bet.amount);
                player.losses += 1;
                losers.push(Settlement {
                    player: bet.username.clone(),
                    amount: bet.amount,
                    payout: 0,
                });
            }
        }

        self.history.push(SpinRecord {
            id: Uuid::new_v4(),
            result,
            timestamp: now,
            bets,
        });

        vec![
            GameEvent::SpinResolved {
                result,
                winners,
                losers,
            },
            GameEvent::HistoryUpdated {
                recent: self.recent_history().iter().map(|r| r.result).collect(),
            },
        ]
    }

    /// Abandon a drawn spin; queued bets stay queued for the next spin.
    pub fn cancel_spin(&mut self) {
        self.pending = None;
    }

    /// Change chances/multipliers, renormalize and rebuild the wheel.
    pub fn update_settings<R: Rng + ?Sized>(&mut self, mut settings: RouletteSettings, rng: &mut R) -> Result<Vec<GameEvent>, GameError> {
        if self.pending.is_some() {
            return Err(GameError::SpinInProgress);
        }
        let odds = settings.odds();
        settings.red_chance = odds.red;
        settings.black_chance = odds.black;
        settings.green_chance = odds.green;
        self.segments = build_segments(rng, odds, settings.total_segments);
        self.players.set_default_points(settings.starting_balance);
        self.settings = settings;
        Ok(vec![GameEvent::OddsUpdated {
            odds,
            segments: self.segments.len(),
        }])
    }

    /// Replace the wheel layout as-is (no normalization, no shuffle).
    pub fn set_segments(&mut self, segments: Vec<Color>) {
        self.segments = segments;
    }

    pub fn reset_player(&mut self, name: &str) -> Vec<GameEvent> {
        if !self.players.contains(name) {
            return Vec::new();
        }
        self.players.reset(name);
        vec![GameEvent::PlayerReset {
            player: name.to_string(),
            points: self.players.default_points(),
        }]
    }

    pub fn add_balance(&mut self, name: &str, amount: i64) -> Result<Vec<GameEvent>, GameError> {
        let balance = self.players.adjust(name, amount)?;
        Ok(vec![GameEvent::BalanceAdded {
            player: name.to_string(),
            amount,
            balance,
        }])
    }

    /// Last [`RECENT_HISTORY`] spins, newest first.
    pub fn recent_history(&self) -> Vec<&SpinRecord> {
        self.history.iter().rev().take(RECENT_HISTORY).collect()
    }

    pub fn history(&self) -> &[SpinRecord] {
        &self.history
    }

    pub fn segments(&self) -> &[Color] {
        &self.segments
    }

    pub fn pending_bets(&self) -> &[Bet] {
        &self.bets
    }

    pub fn is_spinning(&self) -> bool {
        self.pending.is_some()
    }

    pub fn players(&self) -> &PlayerRegistry {
        &self.players
    }

    pub fn settings(&self) -> &RouletteSettings {
        &self.settings
    }

    pub fn to_save(&self) -> RouletteSave {
        RouletteSave {
            settings: self.settings.clone(),
            players: self.players.to_vec(),
            history: self.history.clone(),
        }
    }

    pub fn restore<R: Rng + ?Sized>(&mut self, save: RouletteSave, rng: &mut R) -> Result<(), GameError> {
        if self.pending.is_some() {
            return Err(GameError::SpinInProgress);
        }
        self.update_settings(save.settings, rng)?;
        self.players.replace_all(save.players);
        self.history = save.history;
        Ok(())
    }
}
