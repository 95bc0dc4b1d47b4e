//! Memory match: players take turns revealing two cards with `!memory A1`.
//!
//! Protocol
//! - `!play` joins the running round (first joiner gets the first turn).
//! - Only the current-turn player may flip; invalid flips are ignored silently.
//! - The second flip puts the board into a pending resolution. The host waits
//!   the reveal delay and then calls [`MemoryGame::resolve_pending`].
//! - Match: cards stay face up, scorer +1 and keeps the turn.
//!   Miss: both cards turn back, turn passes to the next player in join order.
//! - The round ends when every pair is matched. All players sharing the top
//!   score are reported as winners.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use super::errors::GameError;
use super::events::GameEvent;
use super::players::PlayerRegistry;
use super::rng::shuffle;

/// Largest column count addressable with a single letter.
pub const MAX_COLUMNS: usize = 26;

/// One picture that can appear on a pair of cards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Face {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Numbered stand-in faces used when no catalogue is configured.
pub fn placeholder_faces(count: usize) -> Vec<Face> {
    (1..=count)
        .map(|i| Face {
            id: format!("face-{:02}", i),
            name: format!("Face{:02}", i),
            url: None,
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardSize {
    pub cols: usize,
    pub rows: usize,
}

impl BoardSize {
    pub fn cells(self) -> usize {
        self.cols * self.rows
    }

    pub fn pairs_needed(self) -> usize {
        self.cells() / 2
    }

    /// `A1`-style label for a row-major index.
    pub fn label(self, index: usize) -> String {
        let col = (b'A' + (index % self.cols) as u8) as char;
        format!("{}{}", col, index / self.cols + 1)
    }

    /// Row-major index for zero-based coordinates, `None` when off the board.
    pub fn index_of(self, col: i64, row: i64) -> Option<usize> {
        if col < 0 || row < 0 || col as usize >= self.cols || row as usize >= self.rows {
            return None;
        }
        Some(row as usize * self.cols + col as usize)
    }
}

impl FromStr for BoardSize {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || GameError::InvalidBoardSize(s.to_string());
        let (c, r) = s.trim().split_once(['x', 'X']).ok_or_else(bad)?;
        let cols: usize = c.trim().parse().map_err(|_| bad())?;
        let rows: usize = r.trim().parse().map_err(|_| bad())?;
        if cols == 0 || rows == 0 || cols > MAX_COLUMNS || (cols * rows) % 2 != 0 {
            return Err(bad());
        }
        Ok(BoardSize { cols, rows })
    }
}

impl fmt::Display for BoardSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.cols, self.rows)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub pair_key: String,
    pub face_value: String,
    pub flipped: bool,
    pub matched: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemorySettings {
    #[serde(default = "default_max_players")]
    pub max_players: usize,
    #[serde(default = "default_board_size")]
    pub board_size: String,
    #[serde(default = "default_match_reveal_ms")]
    pub match_reveal_ms: u64,
    #[serde(default = "default_miss_reveal_ms")]
    pub miss_reveal_ms: u64,
}

fn default_max_players() -> usize {
    10
}
fn default_board_size() -> String {
    "6x4".to_string()
}
fn default_match_reveal_ms() -> u64 {
    1000
}
fn default_miss_reveal_ms() -> u64 {
    2000
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self {
            max_players: default_max_players(),
            board_size: default_board_size(),
            match_reveal_ms: default_match_reveal_ms(),
            miss_reveal_ms: default_miss_reveal_ms(),
        }
    }
}

/// Persisted shape: `{ settings, faces }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemorySave {
    pub settings: MemorySettings,
    #[serde(default)]
    pub faces: Vec<Face>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlipResult {
    /// Nothing changed (wrong turn, bad index, card already up, pending resolution...).
    Ignored,
    /// First card of the pair is up.
    Flipped,
    /// Second card is up; the host must resolve after `delay`.
    PairPending { is_match: bool, delay: Duration },
}

/// Build a shuffled board with exactly two cards per pair key.
pub fn generate_board<R: Rng + ?Sized>(rng: &mut R, faces: &[Face], size: BoardSize) -> Result<Vec<Card>, GameError> {
    let needed = size.pairs_needed();
    if faces.len() < needed {
        return Err(GameError::NotEnoughFaces {
            needed,
            available: faces.len(),
        });
    }
    let chosen = shuffle(rng, faces);
    let mut cards = Vec::with_capacity(needed * 2);
    for face in chosen.iter().take(needed) {
        for _ in 0..2 {
            cards.push(Card {
                pair_key: face.id.clone(),
                face_value: face.name.clone(),
                flipped: false,
                matched: false,
            });
        }
    }
    Ok(shuffle(rng, &cards))
}

#[derive(Debug, Clone)]
pub struct MemoryGame {
    settings: MemorySettings,
    size: BoardSize,
    faces: Vec<Face>,
    /// `faces` are generated stand-ins sized to the board, not a catalogue.
    placeholders: bool,
    board: Vec<Card>,
    players: PlayerRegistry,
    current_turn: Option<String>,
    flipped: Vec<usize>,
    matched_pairs: usize,
    active: bool,
    resolving: bool,
}

impl MemoryGame {
    pub fn new(settings: MemorySettings, faces: Vec<Face>) -> Result<Self, GameError> {
        let size: BoardSize = settings.board_size.parse()?;
        let placeholders = faces.is_empty();
        let faces = if placeholders {
            placeholder_faces(size.pairs_needed())
        } else {
            faces
        };
        let players = PlayerRegistry::new(0, Some(settings.max_players));
        Ok(Self {
            settings,
            size,
            faces,
            placeholders,
            board: Vec::new(),
            players,
            current_turn: None,
            flipped: Vec::new(),
            matched_pairs: 0,
            active: false,
            resolving: false,
        })
    }

    /// Deal a fresh board and clear players, turn and any pending resolution.
    pub fn start_round<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<(), GameError> {
        let size: BoardSize = self.settings.board_size.parse()?;
        if self.placeholders {
            self.faces = placeholder_faces(size.pairs_needed());
        }
        let board = generate_board(rng, &self.faces, size)?;
        self.size = size;
        self.board = board;
        self.players.set_max_players(Some(self.settings.max_players));
        self.players.clear();
        self.current_turn = None;
        self.flipped.clear();
        self.matched_pairs = 0;
        self.resolving = false;
        self.active = true;
        Ok(())
    }

    /// `!play`. Ignored (empty events) while no round runs or for existing players.
    pub fn join(&mut self, name: &str) -> Result<Vec<GameEvent>, GameError> {
        if !self.active || self.players.contains(name) {
            return Ok(Vec::new());
        }
        let player = self.players.join(name)?;
        let mut events = vec![GameEvent::PlayerJoined {
            player: player.name.clone(),
            points: player.points,
        }];
        if self.current_turn.is_none() {
            self.current_turn = Some(name.to_string());
            events.push(GameEvent::TurnChanged {
                player: name.to_string(),
            });
        }
        Ok(events)
    }

    /// `!memory <col><row>` with zero-based coordinates.
    pub fn flip_at(&mut self, name: &str, col: i64, row: i64) -> (FlipResult, Vec<GameEvent>) {
        match self.size.index_of(col, row) {
            Some(index) => self.flip(index, name),
            None => (FlipResult::Ignored, Vec::new()),
        }
    }

    pub fn flip(&mut self, index: usize, name: &str) -> (FlipResult, Vec<GameEvent>) {
        if !self.active
            || self.resolving
            || !self.players.contains(name)
            || self.current_turn.as_deref() != Some(name)
        {
            return (FlipResult::Ignored, Vec::new());
        }
        let Some(card) = self.board.get_mut(index) else {
            return (FlipResult::Ignored, Vec::new());
        };
        if card.flipped || card.matched {
            return (FlipResult::Ignored, Vec::new());
        }
        card.flipped = true;
        let face = card.face_value.clone();
        self.flipped.push(index);
        let events = vec![GameEvent::CardFlipped {
            player: name.to_string(),
            index,
            label: self.size.label(index),
            face,
        }];
        if self.flipped.len() < 2 {
            return (FlipResult::Flipped, events);
        }
        self.resolving = true;
        let is_match = self.board[self.flipped[0]].pair_key == self.board[self.flipped[1]].pair_key;
        let delay = if is_match {
            Duration::from_millis(self.settings.match_reveal_ms)
        } else {
            Duration::from_millis(self.settings.miss_reveal_ms)
        };
        (FlipResult::PairPending { is_match, delay }, events)
    }

    /// Apply the outcome of the two face-up cards. No-op without a pending pair.
    pub fn resolve_pending(&mut self, round: u32) -> Vec<GameEvent> {
        if !self.resolving || self.flipped.len() != 2 {
            return Vec::new();
        }
        let (a, b) = (self.flipped[0], self.flipped[1]);
        self.flipped.clear();
        self.resolving = false;
        let player = self.current_turn.clone().unwrap_or_default();
        let mut events = Vec::new();

        if self.board[a].pair_key == self.board[b].pair_key {
            self.board[a].matched = true;
            self.board[b].matched = true;
            self.matched_pairs += 1;
            let score = self.players.adjust(&player, 1).unwrap_or(0);
            events.push(GameEvent::PairMatched {
                player: player.clone(),
                pair_key: self.board[a].pair_key.clone(),
                face: self.board[a].face_value.clone(),
                score,
            });
            if self.matched_pairs == self.size.pairs_needed() {
                self.active = false;
                let (winners, top_score) = self.winners();
                events.push(GameEvent::RoundEnded {
                    round,
                    winners,
                    top_score,
                });
            }
        } else {
            self.board[a].flipped = false;
            self.board[b].flipped = false;
            events.push(GameEvent::PairMissed {
                player: player.clone(),
                first: self.size.label(a),
                second: self.size.label(b),
            });
            if let Some(next) = self.players.next_active_after(Some(&player)) {
                let next = next.to_string();
                self.current_turn = Some(next.clone());
                events.push(GameEvent::TurnChanged { player: next });
            }
        }
        events
    }

    /// Drop a pending pair without scoring it (round reset).
    pub fn cancel_pending(&mut self) {
        for idx in self.flipped.drain(..) {
            if let Some(card) = self.board.get_mut(idx) {
                card.flipped = false;
            }
        }
        self.resolving = false;
    }

    /// Every player holding the top score, in join order.
    pub fn winners(&self) -> (Vec<String>, i64) {
        let top = self.players.iter().map(|p| p.points).max().unwrap_or(0);
        let names = self
            .players
            .iter()
            .filter(|p| p.points == top)
            .map(|p| p.name.clone())
            .collect();
        (names, top)
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_resolving(&self) -> bool {
        self.resolving
    }

    pub fn board(&self) -> &[Card] {
        &self.board
    }

    pub fn size(&self) -> BoardSize {
        self.size
    }

    pub fn current_turn(&self) -> Option<&str> {
        self.current_turn.as_deref()
    }

    pub fn players(&self) -> &PlayerRegistry {
        &self.players
    }

    pub fn settings(&self) -> &MemorySettings {
        &self.settings
    }

    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    pub fn uses_placeholders(&self) -> bool {
        self.placeholders
    }

    /// Generated placeholder faces are left out of the blob.
    pub fn to_save(&self) -> MemorySave {
        MemorySave {
            settings: self.settings.clone(),
            faces: if self.placeholders {
                Vec::new()
            } else {
                self.faces.clone()
            },
        }
    }

    /// Apply a saved blob. Validated in full before anything is replaced.
    pub fn restore(&mut self, save: MemorySave) -> Result<(), GameError> {
        let size: BoardSize = save.settings.board_size.parse()?;
        if !self.active {
            self.size = size;
        }
        self.settings = save.settings;
        if !save.faces.is_empty() {
            self.faces = save.faces;
            self.placeholders = false;
        } else if self.placeholders {
            self.faces = placeholder_faces(size.pairs_needed());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::rng::game_rng;
    use std::collections::HashMap;

    fn game(board: &str) -> MemoryGame {
        let settings = MemorySettings {
            board_size: board.to_string(),
            ..MemorySettings::default()
        };
        MemoryGame::new(settings, Vec::new()).unwrap()
    }

    /// Find two indices with the same / different pair keys.
    fn pair_indices(g: &MemoryGame, same: bool) -> (usize, usize) {
        let b = g.board();
        for i in 0..b.len() {
            for j in (i + 1)..b.len() {
                if (b[i].pair_key == b[j].pair_key) == same {
                    return (i, j);
                }
            }
        }
        panic!("no pair found");
    }

    #[test]
    fn board_size_parsing() {
        assert_eq!("6x4".parse::<BoardSize>().unwrap(), BoardSize { cols: 6, rows: 4 });
        assert!("3x3".parse::<BoardSize>().is_err());
        assert!("0x4".parse::<BoardSize>().is_err());
        assert!("27x2".parse::<BoardSize>().is_err());
        assert!("six".parse::<BoardSize>().is_err());
        assert_eq!(BoardSize { cols: 6, rows: 4 }.label(7), "B2");
    }

    #[test]
    fn board_has_two_cards_per_key() {
        let mut rng = game_rng(Some(11));
        let size = BoardSize { cols: 6, rows: 4 };
        let board = generate_board(&mut rng, &placeholder_faces(20), size).unwrap();
        assert_eq!(board.len(), 2 * size.pairs_needed());
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for c in &board {
            *counts.entry(c.pair_key.as_str()).or_default() += 1;
        }
        assert_eq!(counts.len(), 12);
        assert!(counts.values().all(|&n| n == 2));
    }

    #[test]
    fn not_enough_faces_fails() {
        let mut rng = game_rng(Some(1));
        let err = generate_board(&mut rng, &placeholder_faces(3), BoardSize { cols: 4, rows: 2 }).unwrap_err();
        assert_eq!(err, GameError::NotEnoughFaces { needed: 4, available: 3 });
    }

    #[test]
    fn play_ignored_while_inactive() {
        let mut g = game("4x2");
        assert!(g.join("alice").unwrap().is_empty());
        assert!(g.players().is_empty());
    }

    #[test]
    fn first_joiner_gets_turn_and_capacity_enforced() {
        let mut g = MemoryGame::new(
            MemorySettings {
                max_players: 1,
                board_size: "2x2".into(),
                ..MemorySettings::default()
            },
            Vec::new(),
        )
        .unwrap();
        g.start_round(&mut game_rng(Some(2))).unwrap();
        let ev = g.join("alice").unwrap();
        assert!(ev.contains(&GameEvent::TurnChanged { player: "alice".into() }));
        assert_eq!(g.join("bob").unwrap_err(), GameError::CapacityExceeded { max: 1 });
    }

    #[test]
    fn same_index_twice_is_noop_and_out_of_turn_ignored() {
        let mut g = game("4x2");
        g.start_round(&mut game_rng(Some(3))).unwrap();
        g.join("alice").unwrap();
        g.join("bob").unwrap();
        assert_eq!(g.flip(0, "bob").0, FlipResult::Ignored);
        assert_eq!(g.flip(0, "alice").0, FlipResult::Flipped);
        assert_eq!(g.flip(0, "alice").0, FlipResult::Ignored);
        assert_eq!(g.flip(99, "alice").0, FlipResult::Ignored);
        assert_eq!(g.flip_at("alice", 4, 0).0, FlipResult::Ignored);
        assert!(!g.is_resolving());
    }

    #[test]
    fn miss_turns_cards_back_and_rotates_with_wraparound() {
        let mut g = game("4x2");
        g.start_round(&mut game_rng(Some(4))).unwrap();
        g.join("alice").unwrap();
        g.join("bob").unwrap();
        let (a, b) = pair_indices(&g, false);
        g.flip(a, "alice");
        let (res, _) = g.flip(b, "alice");
        assert!(matches!(res, FlipResult::PairPending { is_match: false, delay } if delay == Duration::from_millis(2000)));
        // a third flip while pending is ignored
        assert_eq!(g.flip(pair_indices(&g, true).0, "alice").0, FlipResult::Ignored);
        let ev = g.resolve_pending(1);
        assert!(ev.contains(&GameEvent::TurnChanged { player: "bob".into() }));
        assert!(!g.board()[a].flipped && !g.board()[a].matched);
        assert!(!g.board()[b].flipped && !g.board()[b].matched);

        g.flip(a, "bob");
        g.flip(b, "bob");
        g.resolve_pending(1);
        assert_eq!(g.current_turn(), Some("alice"));
    }

    #[test]
    fn match_scores_and_keeps_turn_until_round_end() {
        let mut g = game("2x2");
        g.start_round(&mut game_rng(Some(5))).unwrap();
        g.join("alice").unwrap();
        g.join("bob").unwrap();
        let (a, b) = pair_indices(&g, true);
        g.flip(a, "alice");
        let (res, _) = g.flip(b, "alice");
        assert!(matches!(res, FlipResult::PairPending { is_match: true, .. }));
        let ev = g.resolve_pending(1);
        assert!(matches!(&ev[0], GameEvent::PairMatched { score: 1, .. }));
        assert_eq!(g.current_turn(), Some("alice"));

        let rest: Vec<usize> = (0..4).filter(|i| *i != a && *i != b).collect();
        g.flip(rest[0], "alice");
        g.flip(rest[1], "alice");
        let ev = g.resolve_pending(1);
        assert!(ev.iter().any(|e| matches!(e,
            GameEvent::RoundEnded { winners, top_score: 2, .. } if winners == &vec!["alice".to_string()])));
        assert!(!g.is_active());
    }

    #[test]
    fn tied_scores_report_all_winners() {
        let mut g = game("2x2");
        g.start_round(&mut game_rng(Some(6))).unwrap();
        g.join("a").unwrap();
        g.join("b").unwrap();
        let (w, top) = g.winners();
        assert_eq!(top, 0);
        assert_eq!(w, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn cancel_pending_turns_cards_down() {
        let mut g = game("2x2");
        g.start_round(&mut game_rng(Some(8))).unwrap();
        g.join("a").unwrap();
        g.flip(0, "a");
        g.flip(1, "a");
        g.cancel_pending();
        assert!(!g.is_resolving());
        assert!(g.board().iter().all(|c| !c.flipped));
        assert!(g.resolve_pending(1).is_empty());
    }
}
