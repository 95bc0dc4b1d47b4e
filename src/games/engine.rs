//! Generic game engine: one instance per launched game.
//!
//! The engine tracks the round session and phase, turns chat lines into
//! variant calls, and hands out [`ResolutionTicket`]s for outcomes that must
//! wait (Memory reveal, Roulette spin). The host schedules the ticket and calls
//! [`GameEngine::resolve`] when the delay elapses. Starting a new round bumps
//! the ticket generation, so a timer that fires late resolves nothing.
//!
//! Phases:
//!
//! ```text
//! Idle ─► RoundInProgress ─► Resolving ─► RoundInProgress | RoundResolved ─► (new round)
//! ```

use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::Serialize;
use std::time::Duration;

use super::commands::{ChatCommand, ChatCommandParser};
use super::errors::{ErrorKind, GameError};
use super::events::GameEvent;
use super::memory::{Face, FlipResult, MemoryGame, MemorySave, MemorySettings};
use super::number_guess::{NumberGuessGame, NumberGuessSave, NumberGuessSettings};
use super::rng::{game_rng, GameRng};
use super::roulette::{PendingSpin, RouletteGame, RouletteSave, RouletteSettings};
use super::GameKind;
use crate::logutil::escape_log;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    Idle,
    RoundInProgress,
    /// A deferred outcome is scheduled; mutating commands are refused.
    Resolving,
    RoundResolved,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub round_number: u32,
    pub is_active: bool,
    pub started_at: Option<DateTime<Utc>>,
}

/// Identifies one scheduled resolution. Only the newest ticket is honored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResolutionTicket {
    generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deferred {
    pub ticket: ResolutionTicket,
    pub delay: Duration,
}

/// Result of one engine step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outcome {
    pub events: Vec<GameEvent>,
    /// Set when the host must call [`GameEngine::resolve`] after `delay`.
    pub deferred: Option<Deferred>,
}

impl Outcome {
    fn events(events: Vec<GameEvent>) -> Self {
        Outcome {
            events,
            deferred: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.deferred.is_none()
    }
}

/// Everything needed to build an engine for any of the games.
#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    pub memory: MemorySettings,
    pub roulette: RouletteSettings,
    pub number_guess: NumberGuessSettings,
    pub faces: Vec<Face>,
    pub command_prefix: Option<String>,
    /// Fixed seed for reproducible play; `None` uses OS entropy.
    pub seed: Option<u64>,
}

#[derive(Debug, Clone)]
pub enum GameVariant {
    Memory(MemoryGame),
    Roulette(RouletteGame),
    NumberGuess(NumberGuessGame),
}

pub struct GameEngine {
    kind: GameKind,
    session: Session,
    phase: Phase,
    variant: GameVariant,
    parser: ChatCommandParser,
    rng: GameRng,
    generation: u64,
    pending: Option<ResolutionTicket>,
}

impl GameEngine {
    pub fn new(kind: GameKind, options: EngineOptions) -> Result<Self, GameError> {
        let mut rng = game_rng(options.seed);
        let variant = match kind {
            GameKind::Memory => GameVariant::Memory(MemoryGame::new(options.memory, options.faces)?),
            GameKind::Roulette => GameVariant::Roulette(RouletteGame::new(options.roulette, &mut rng)),
            GameKind::NumberGuess => GameVariant::NumberGuess(NumberGuessGame::new(options.number_guess)),
        };
        Ok(Self {
            kind,
            session: Session {
                round_number: 0,
                is_active: false,
                started_at: None,
            },
            phase: Phase::Idle,
            variant,
            parser: ChatCommandParser::new_with_prefix(kind, options.command_prefix.as_deref()),
            rng,
            generation: 0,
            pending: None,
        })
    }

    /// Begin a round. Only valid from `Idle` or `RoundResolved`.
    pub fn start_round(&mut self, now: DateTime<Utc>) -> Result<Outcome, GameError> {
        if matches!(self.phase, Phase::RoundInProgress | Phase::Resolving) {
            return Err(GameError::RoundInProgress);
        }
        self.begin_round(now)
    }

    /// Abandon whatever is running (including a scheduled resolution) and start over.
    pub fn restart_round(&mut self, now: DateTime<Utc>) -> Result<Outcome, GameError> {
        self.cancel_pending();
        self.begin_round(now)
    }

    fn begin_round(&mut self, now: DateTime<Utc>) -> Result<Outcome, GameError> {
        match &mut self.variant {
            GameVariant::Memory(g) => g.start_round(&mut self.rng)?,
            GameVariant::NumberGuess(g) => {
                let (min, max) = (g.settings().min_number, g.settings().max_number);
                g.start_round(&mut self.rng, min, max, now)?
            }
            GameVariant::Roulette(_) => {}
        }
        // Any ticket handed out before this point is now stale.
        self.generation += 1;
        self.pending = None;
        self.session.round_number += 1;
        self.session.is_active = true;
        self.session.started_at = Some(now);
        self.phase = Phase::RoundInProgress;
        info!("{} round #{} started", self.kind, self.session.round_number);
        Ok(Outcome::events(vec![GameEvent::RoundStarted {
            round: self.session.round_number,
        }]))
    }

    /// Invalidate any outstanding ticket and undo its half-applied state.
    pub fn cancel_pending(&mut self) {
        if self.pending.take().is_some() {
            debug!("{}: cancelling pending resolution", self.kind);
        }
        self.generation += 1;
        match &mut self.variant {
            GameVariant::Memory(g) => g.cancel_pending(),
            GameVariant::Roulette(g) => g.cancel_spin(),
            GameVariant::NumberGuess(_) => {}
        }
        if self.phase == Phase::Resolving {
            self.phase = Phase::RoundInProgress;
        }
    }

    /// Process one chat line from `user`.
    pub fn handle_chat(&mut self, user: &str, text: &str, now: DateTime<Utc>) -> Outcome {
        let cmd = self.parser.parse(text);
        if cmd == ChatCommand::Unknown {
            return Outcome::default();
        }
        debug!("{} <{}> {}", self.kind, escape_log(user), escape_log(text));
        let result = match cmd {
            ChatCommand::Play => match &mut self.variant {
                GameVariant::Memory(g) => g.join(user).map(Outcome::events),
                _ => Ok(Outcome::default()),
            },
            ChatCommand::Memory { col, row } => Ok(self.flip(user, col, row)),
            ChatCommand::Join => match &mut self.variant {
                GameVariant::Roulette(g) => Ok(Outcome::events(g.join(user))),
                _ => Ok(Outcome::default()),
            },
            ChatCommand::Bet { amount, color } => self.place_bet(user, amount, &color, now),
            ChatCommand::Guess(value) => Ok(self.guess(user, value, now)),
            ChatCommand::Unknown => Ok(Outcome::default()),
        };
        result.unwrap_or_else(|e| Outcome::events(vec![notice_for(user, &e)]))
    }

    fn flip(&mut self, user: &str, col: i64, row: i64) -> Outcome {
        let GameVariant::Memory(g) = &mut self.variant else {
            return Outcome::default();
        };
        let (flip, events) = g.flip_at(user, col, row);
        self.after_flip(flip, events)
    }

    fn guess(&mut self, user: &str, value: i64, now: DateTime<Utc>) -> Outcome {
        let round = self.session.round_number;
        let GameVariant::NumberGuess(g) = &mut self.variant else {
            return Outcome::default();
        };
        let (_, events) = g.guess(user, value, now, round);
        let solved = !g.is_active();
        if solved && self.session.is_active {
            self.finish_round();
        }
        Outcome::events(events)
    }

    fn after_flip(&mut self, flip: FlipResult, events: Vec<GameEvent>) -> Outcome {
        match flip {
            FlipResult::PairPending { delay, .. } => {
                let ticket = self.issue_ticket();
                Outcome {
                    events,
                    deferred: Some(Deferred { ticket, delay }),
                }
            }
            _ => Outcome::events(events),
        }
    }

    fn place_bet(&mut self, user: &str, amount: i64, color: &str, now: DateTime<Utc>) -> Result<Outcome, GameError> {
        let GameVariant::Roulette(g) = &mut self.variant else {
            return Err(self.unsupported("bet"));
        };
        let mut events = g.register_bettor(user)?;
        match g.place_bet(user, amount, color) {
            Ok(mut placed) => events.append(&mut placed),
            Err(e) if events.is_empty() => return Err(e),
            Err(e) => {
                events.push(notice_for(user, &e));
                return Ok(Outcome::events(events));
            }
        }
        if matches!(self.phase, Phase::Idle | Phase::RoundResolved) {
            let mut started = self.begin_round(now)?.events;
            started.append(&mut events);
            events = started;
        }
        Ok(Outcome::events(events))
    }

    /// Roulette host action: draw the result and schedule its application.
    pub fn spin(&mut self) -> Result<Outcome, GameError> {
        let GameVariant::Roulette(g) = &mut self.variant else {
            return Err(self.unsupported("spin"));
        };
        let pending = g.begin_spin(&mut self.rng)?;
        self.spin_scheduled(pending)
    }

    /// Like [`Self::spin`] with a fixed segment index.
    pub fn spin_at(&mut self, segment: usize) -> Result<Outcome, GameError> {
        let GameVariant::Roulette(g) = &mut self.variant else {
            return Err(self.unsupported("spin"));
        };
        let pending = g.begin_spin_at(segment)?;
        self.spin_scheduled(pending)
    }

    fn spin_scheduled(&mut self, pending: PendingSpin) -> Result<Outcome, GameError> {
        let ticket = self.issue_ticket();
        info!("{}: wheel spinning, segment {} drawn", self.kind, pending.segment);
        Ok(Outcome {
            events: vec![GameEvent::SpinStarted {
                segment: pending.segment,
            }],
            deferred: Some(Deferred {
                ticket,
                delay: pending.delay,
            }),
        })
    }

    fn issue_ticket(&mut self) -> ResolutionTicket {
        self.generation += 1;
        let ticket = ResolutionTicket {
            generation: self.generation,
        };
        self.pending = Some(ticket);
        self.phase = Phase::Resolving;
        ticket
    }

    /// Apply a deferred outcome. Stale or unknown tickets are ignored.
    pub fn resolve(&mut self, ticket: ResolutionTicket, now: DateTime<Utc>) -> Vec<GameEvent> {
        if self.pending != Some(ticket) {
            debug!("{}: ignoring stale resolution ticket {:?}", self.kind, ticket);
            return Vec::new();
        }
        self.pending = None;
        self.phase = Phase::RoundInProgress;
        let round = self.session.round_number;
        let (events, finished) = match &mut self.variant {
            GameVariant::Memory(g) => {
                let events = g.resolve_pending(round);
                (events, !g.is_active())
            }
            GameVariant::Roulette(g) => (g.resolve_spin(now), true),
            GameVariant::NumberGuess(_) => (Vec::new(), false),
        };
        if finished {
            self.finish_round();
        }
        events
    }

    fn finish_round(&mut self) {
        self.session.is_active = false;
        self.phase = Phase::RoundResolved;
        info!("{} round #{} resolved", self.kind, self.session.round_number);
    }

    pub fn reset_player(&mut self, name: &str) -> Result<Vec<GameEvent>, GameError> {
        match &mut self.variant {
            GameVariant::Roulette(g) => Ok(g.reset_player(name)),
            _ => Err(self.unsupported("reset")),
        }
    }

    pub fn add_balance(&mut self, name: &str, amount: i64) -> Result<Vec<GameEvent>, GameError> {
        match &mut self.variant {
            GameVariant::Roulette(g) => g.add_balance(name, amount),
            _ => Err(self.unsupported("add balance")),
        }
    }

    /// Change roulette chances/multipliers; the wheel is rebuilt.
    pub fn update_roulette_settings(&mut self, settings: RouletteSettings) -> Result<Vec<GameEvent>, GameError> {
        match &mut self.variant {
            GameVariant::Roulette(g) => g.update_settings(settings, &mut self.rng),
            _ => Err(self.unsupported("odds")),
        }
    }

    fn unsupported(&self, action: &'static str) -> GameError {
        GameError::Unsupported {
            game: self.kind.title(),
            action,
        }
    }

    /// Persistable blob: `{ settings, <game state> }`.
    pub fn save_blob(&self) -> serde_json::Value {
        let value = match &self.variant {
            GameVariant::Memory(g) => serde_json::to_value(g.to_save()),
            GameVariant::Roulette(g) => serde_json::to_value(g.to_save()),
            GameVariant::NumberGuess(g) => serde_json::to_value(g.to_save()),
        };
        value.unwrap_or(serde_json::Value::Null)
    }

    /// Apply a blob from [`Self::save_blob`]. The blob is fully decoded and
    /// validated before any state is replaced.
    pub fn restore_blob(&mut self, blob: serde_json::Value) -> Result<(), GameError> {
        let bad = |e: serde_json::Error| GameError::InvalidSave(e.to_string());
        match &mut self.variant {
            GameVariant::Memory(g) => {
                let save: MemorySave = serde_json::from_value(blob).map_err(bad)?;
                g.restore(save)
            }
            GameVariant::Roulette(g) => {
                let save: RouletteSave = serde_json::from_value(blob).map_err(bad)?;
                g.restore(save, &mut self.rng)
            }
            GameVariant::NumberGuess(g) => {
                let save: NumberGuessSave = serde_json::from_value(blob).map_err(bad)?;
                g.restore(save)
            }
        }
    }

    pub fn kind(&self) -> GameKind {
        self.kind
    }

    pub fn prefix(&self) -> char {
        self.parser.prefix()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn pending_ticket(&self) -> Option<ResolutionTicket> {
        self.pending
    }

    pub fn variant(&self) -> &GameVariant {
        &self.variant
    }

    pub fn memory(&self) -> Option<&MemoryGame> {
        match &self.variant {
            GameVariant::Memory(g) => Some(g),
            _ => None,
        }
    }

    pub fn roulette(&self) -> Option<&RouletteGame> {
        match &self.variant {
            GameVariant::Roulette(g) => Some(g),
            _ => None,
        }
    }

    /// Mutable roulette access for host-side tweaks (e.g. fixed wheel layouts).
    pub fn roulette_mut(&mut self) -> Option<&mut RouletteGame> {
        match &mut self.variant {
            GameVariant::Roulette(g) => Some(g),
            _ => None,
        }
    }

    pub fn number_guess(&self) -> Option<&NumberGuessGame> {
        match &self.variant {
            GameVariant::NumberGuess(g) => Some(g),
            _ => None,
        }
    }
}

fn notice_for(user: &str, err: &GameError) -> GameEvent {
    match err.kind() {
        ErrorKind::StateConflict => debug!("{}: {}", escape_log(user), err),
        ErrorKind::Validation | ErrorKind::Capacity => info!("{}: {}", escape_log(user), err),
    }
    GameEvent::notice(Some(user), err.to_string())
}
