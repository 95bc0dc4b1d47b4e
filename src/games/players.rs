//! Player registry shared by all three games.
//!
//! Players are kept in join order; that order drives Memory's turn rotation.
//! A player is never removed, only reset. `points` is the score in Memory and
//! the coin balance in Roulette.

use serde::de::{MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use super::errors::GameError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Username exactly as received from chat (case-sensitive). Filled from
    /// the map key when players are saved as an object keyed by username.
    #[serde(default)]
    pub name: String,
    #[serde(alias = "balance", alias = "score")]
    pub points: i64,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub wins: u32,
    #[serde(default)]
    pub losses: u32,
    /// Net winnings (payout minus stake) across all winning bets.
    #[serde(default, alias = "totalWon")]
    pub total_won: i64,
    #[serde(default, alias = "totalLost")]
    pub total_lost: i64,
}

fn default_active() -> bool {
    true
}

impl Player {
    fn new(name: &str, points: i64) -> Self {
        Player {
            name: name.to_string(),
            points,
            attempts: 0,
            active: true,
            wins: 0,
            losses: 0,
            total_won: 0,
            total_lost: 0,
        }
    }
}

/// Read players either as a list or as an object keyed by username, in the
/// order the deserializer yields them. Use with `#[serde(deserialize_with = ...)]`.
pub fn deserialize_players<'de, D>(deserializer: D) -> Result<Vec<Player>, D::Error>
where
    D: Deserializer<'de>,
{
    struct PlayersVisitor;

    impl<'de> Visitor<'de> for PlayersVisitor {
        type Value = Vec<Player>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a list of players or a map of username to player")
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut players = Vec::new();
            while let Some(p) = seq.next_element::<Player>()? {
                players.push(p);
            }
            Ok(players)
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut players = Vec::new();
            while let Some((name, mut p)) = map.next_entry::<String, Player>()? {
                p.name = name;
                players.push(p);
            }
            Ok(players)
        }
    }

    deserializer.deserialize_any(PlayersVisitor)
}

#[derive(Debug, Clone)]
pub struct PlayerRegistry {
    players: Vec<Player>,
    default_points: i64,
    max_players: Option<usize>,
}

impl PlayerRegistry {
    pub fn new(default_points: i64, max_players: Option<usize>) -> Self {
        Self {
            players: Vec::new(),
            default_points,
            max_players,
        }
    }

    pub fn default_points(&self) -> i64 {
        self.default_points
    }

    pub fn set_default_points(&mut self, points: i64) {
        self.default_points = points;
    }

    pub fn set_max_players(&mut self, max: Option<usize>) {
        self.max_players = max;
    }

    /// Register `name`, or return the existing record. Fails only when a new
    /// player would exceed the configured limit.
    pub fn join(&mut self, name: &str) -> Result<&Player, GameError> {
        if let Some(idx) = self.position(name) {
            return Ok(&self.players[idx]);
        }
        if let Some(max) = self.max_players {
            if self.players.len() >= max {
                return Err(GameError::CapacityExceeded { max });
            }
        }
        self.players.push(Player::new(name, self.default_points));
        Ok(&self.players[self.players.len() - 1])
    }

    /// Restore default points and clear attempts; unknown names are ignored.
    pub fn reset(&mut self, name: &str) {
        let default_points = self.default_points;
        if let Some(p) = self.get_mut(name) {
            p.points = default_points;
            p.attempts = 0;
        }
    }

    /// Add `delta` (may be negative) and return the new total.
    pub fn adjust(&mut self, name: &str, delta: i64) -> Result<i64, GameError> {
        let p = self
            .get_mut(name)
            .ok_or_else(|| GameError::UnknownPlayer(name.to_string()))?;
        p.points = p.points.saturating_add(delta);
        Ok(p.points)
    }

    pub fn get(&self, name: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.players.iter().position(|p| p.name == name)
    }

    /// Next active player after `current` in join order, wrapping around.
    /// With no current player (or an unknown one) the first active player is returned.
    pub fn next_active_after(&self, current: Option<&str>) -> Option<&str> {
        let active: Vec<&Player> = self.players.iter().filter(|p| p.active).collect();
        if active.is_empty() {
            return None;
        }
        let next = current
            .and_then(|c| active.iter().position(|p| p.name == c))
            .map(|i| (i + 1) % active.len())
            .unwrap_or(0);
        Some(active[next].name.as_str())
    }

    pub fn clear_attempts(&mut self) {
        for p in &mut self.players {
            p.attempts = 0;
        }
    }

    pub fn clear(&mut self) {
        self.players.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.players.iter()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn to_vec(&self) -> Vec<Player> {
        self.players.clone()
    }

    pub fn replace_all(&mut self, players: Vec<Player>) {
        self.players = players;
    }

    /// Players sorted by points, highest first (scoreboard order).
    pub fn ranked(&self) -> Vec<&Player> {
        let mut v: Vec<&Player> = self.players.iter().collect();
        v.sort_by(|a, b| b.points.cmp(&a.points));
        v
    }
}
