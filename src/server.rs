//! # Game Server - host loop for one running game
//!
//! Wires a [`GameEngine`] to its inputs and outputs:
//!
//! ```text
//! ChatEvent ──┐
//! HostCommand ┼─► GameServer ─► GameEngine ─► Renderer
//! timer ──────┘        │
//!                      └─► GameStorage (save after each change)
//! ```
//!
//! Deferred outcomes come back from the [`ResolutionTimer`] as tickets. The
//! loop never sleeps itself, so chat keeps flowing while a spin or reveal is
//! pending (the engine refuses conflicting commands meanwhile).
//!
//! Persistence is best effort: a failed save is logged and play continues.

use anyhow::Result;
use chrono::Utc;
use log::{debug, error, info, warn};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

use crate::games::engine::Outcome;
use crate::games::roulette::RouletteSettings;
use crate::games::timer::ResolutionTimer;
use crate::games::{GameEngine, GameError, GameEvent, GameKind, ResolutionTicket};
use crate::logutil::escape_log;
use crate::metrics;
use crate::storage::GameStorage;

/// Receives every event the engine emits, in order.
pub trait Renderer: Send {
    fn render(&mut self, game: GameKind, event: &GameEvent);
}

/// Writes events to the log at `info` level.
#[derive(Debug, Default)]
pub struct LogRenderer;

impl Renderer for LogRenderer {
    fn render(&mut self, game: GameKind, event: &GameEvent) {
        info!("[{}] {}", game.slug(), escape_log(&event.to_string()));
    }
}

/// Collects events in memory. Clones share the same buffer, so a test can
/// keep one handle while the server owns another.
#[derive(Debug, Clone, Default)]
pub struct RecordingRenderer {
    events: Arc<Mutex<Vec<GameEvent>>>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<GameEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Return and clear everything recorded so far.
    pub fn take(&self) -> Vec<GameEvent> {
        self.events
            .lock()
            .map(|mut e| std::mem::take(&mut *e))
            .unwrap_or_default()
    }
}

impl Renderer for RecordingRenderer {
    fn render(&mut self, _game: GameKind, event: &GameEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

/// One chat line from the configured channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEvent {
    pub username: String,
    pub text: String,
}

impl ChatEvent {
    pub fn new(username: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            text: text.into(),
        }
    }
}

/// Operator actions (the control panel of a streamer-facing UI).
#[derive(Debug, Clone, PartialEq)]
pub enum HostCommand {
    /// Refused while a round is running.
    StartRound,
    /// Abandon the current round, pending resolution included, and start over.
    RestartRound,
    Spin,
    ResetPlayer(String),
    AddBalance { player: String, amount: i64 },
    UpdateOdds(RouletteSettings),
    /// Write a pretty JSON copy of the current blob.
    Export(PathBuf),
    /// Replace settings and persistent data from a JSON file.
    Import(PathBuf),
    /// Settle any pending resolution, save and stop.
    Shutdown,
}

/// Senders feeding a [`GameServer`].
#[derive(Debug, Clone)]
pub struct ServerHandle {
    pub chat: mpsc::UnboundedSender<ChatEvent>,
    pub host: mpsc::UnboundedSender<HostCommand>,
}

pub struct GameServer {
    engine: GameEngine,
    storage: GameStorage,
    renderer: Box<dyn Renderer>,
    timer: ResolutionTimer,
    timer_rx: mpsc::UnboundedReceiver<ResolutionTicket>,
    chat_rx: mpsc::UnboundedReceiver<ChatEvent>,
    host_rx: mpsc::UnboundedReceiver<HostCommand>,
}

impl GameServer {
    /// Build a server and restore the saved blob if one exists. A missing or
    /// unreadable save is not fatal; the engine keeps its configured defaults.
    pub fn new(engine: GameEngine, storage: GameStorage, renderer: Box<dyn Renderer>) -> (Self, ServerHandle) {
        let (timer, timer_rx) = ResolutionTimer::new();
        let (chat_tx, chat_rx) = mpsc::unbounded_channel();
        let (host_tx, host_rx) = mpsc::unbounded_channel();
        let mut server = Self {
            engine,
            storage,
            renderer,
            timer,
            timer_rx,
            chat_rx,
            host_rx,
        };
        server.load_saved();
        let handle = ServerHandle {
            chat: chat_tx,
            host: host_tx,
        };
        (server, handle)
    }

    fn load_saved(&mut self) {
        match self.storage.load() {
            Ok(Some(blob)) => match self.engine.restore_blob(blob) {
                Ok(()) => info!("Restored saved {} state from {}", self.engine.kind(), self.storage.path().display()),
                Err(e) => warn!("Ignoring saved {} state: {}", self.engine.kind(), e),
            },
            Ok(None) => debug!("No saved state for {}", self.engine.kind()),
            Err(e) => warn!("Could not load {}: {}", self.storage.path().display(), e),
        }
    }

    pub fn engine(&self) -> &GameEngine {
        &self.engine
    }

    pub fn storage(&self) -> &GameStorage {
        &self.storage
    }

    /// Run until [`HostCommand::Shutdown`] or until every sender is gone.
    pub async fn run(&mut self) -> Result<()> {
        info!("{} ready (command prefix '{}')", self.engine.kind(), self.engine.prefix());
        let (mut chat_open, mut host_open) = (true, true);
        while chat_open || host_open {
            tokio::select! {
                biased;
                Some(ticket) = self.timer_rx.recv() => {
                    self.resolve_ticket(ticket);
                }
                ev = self.chat_rx.recv(), if chat_open => match ev {
                    Some(ev) => self.handle_chat_event(ev),
                    None => chat_open = false,
                },
                cmd = self.host_rx.recv(), if host_open => match cmd {
                    Some(cmd) => {
                        if !self.handle_host_command(cmd) {
                            break;
                        }
                    }
                    None => host_open = false,
                },
            }
        }
        self.shutdown();
        Ok(())
    }

    /// Feed one chat line through the engine.
    pub fn handle_chat_event(&mut self, ev: ChatEvent) {
        let outcome = self.engine.handle_chat(&ev.username, &ev.text, Utc::now());
        let slug = self.engine.kind().slug();
        metrics::record_command(slug, !outcome.is_empty());
        if outcome.is_empty() {
            return;
        }
        self.apply(outcome);
        self.persist();
    }

    /// Execute an operator action. Returns `false` when the loop should stop.
    pub fn handle_host_command(&mut self, cmd: HostCommand) -> bool {
        debug!("Host command: {:?}", cmd);
        let now = Utc::now();
        let result: Result<Outcome, GameError> = match cmd {
            HostCommand::StartRound => self.engine.start_round(now),
            HostCommand::RestartRound => {
                self.timer.cancel();
                self.engine.restart_round(now)
            }
            HostCommand::Spin => self.engine.spin(),
            HostCommand::ResetPlayer(name) => self.engine.reset_player(&name).map(events_only),
            HostCommand::AddBalance { player, amount } => self.engine.add_balance(&player, amount).map(events_only),
            HostCommand::UpdateOdds(settings) => self.engine.update_roulette_settings(settings).map(events_only),
            HostCommand::Export(path) => {
                self.export(path);
                return true;
            }
            HostCommand::Import(path) => {
                self.import(path);
                return true;
            }
            HostCommand::Shutdown => return false,
        };
        match result {
            Ok(outcome) => {
                self.apply(outcome);
                self.persist();
            }
            Err(e) => {
                warn!("{}: {}", self.engine.kind(), e);
                self.emit(vec![GameEvent::notice(None, e.to_string())]);
            }
        }
        true
    }

    /// Apply a due resolution. Tickets from cancelled or replaced schedules are dropped.
    pub fn resolve_ticket(&mut self, ticket: ResolutionTicket) {
        if self.engine.pending_ticket() != Some(ticket) {
            debug!("Dropping stale resolution ticket {:?}", ticket);
            metrics::record_stale_resolution(self.engine.kind().slug());
            return;
        }
        let events = self.engine.resolve(ticket, Utc::now());
        self.emit(events);
        self.persist();
    }

    fn apply(&mut self, outcome: Outcome) {
        let Outcome { events, deferred } = outcome;
        self.emit(events);
        if let Some(deferred) = deferred {
            self.timer.schedule(deferred);
        }
    }

    fn emit(&mut self, events: Vec<GameEvent>) {
        let kind = self.engine.kind();
        for event in &events {
            match event {
                GameEvent::RoundStarted { .. } => {
                    metrics::record_round_started(kind.slug());
                }
                GameEvent::RoundEnded { .. } | GameEvent::SpinResolved { .. } => {
                    metrics::record_round_finished(kind.slug());
                }
                _ => {}
            }
            self.renderer.render(kind, event);
        }
    }

    fn persist(&self) {
        if let Err(e) = self.storage.save(&self.engine.save_blob()) {
            metrics::inc_save_failures();
            warn!("Failed to save {}: {}", self.engine.kind(), e);
        }
    }

    fn export(&mut self, path: PathBuf) {
        match self.storage.export_to(&path, &self.engine.save_blob()) {
            Ok(()) => {
                info!("Exported {} to {}", self.engine.kind(), path.display());
                self.emit(vec![GameEvent::notice(None, format!("Exported to {}", path.display()))]);
            }
            Err(e) => {
                warn!("Export to {} failed: {}", path.display(), e);
                self.emit(vec![GameEvent::notice(None, format!("Export failed: {}", e))]);
            }
        }
    }

    // The file becomes the save first; if the engine rejects it the previous
    // blob is written back so disk and memory stay in agreement.
    fn import(&mut self, path: PathBuf) {
        let previous = self.engine.save_blob();
        let message = match self.storage.import_from(&path) {
            Ok(blob) => match self.engine.restore_blob(blob) {
                Ok(()) => {
                    info!("Imported {} from {}", self.engine.kind(), path.display());
                    format!("Imported {}", path.display())
                }
                Err(e) => {
                    warn!("Rejected import {}: {}", path.display(), e);
                    if let Err(e) = self.storage.save(&previous) {
                        error!("Could not restore previous save after failed import: {}", e);
                    }
                    format!("Import failed: {}", e)
                }
            },
            Err(e) => {
                warn!("Import from {} failed: {}", path.display(), e);
                format!("Import failed: {}", e)
            }
        };
        self.emit(vec![GameEvent::notice(None, message)]);
    }

    fn shutdown(&mut self) {
        self.timer.cancel();
        // Settle now rather than drop stakes that were already taken.
        if let Some(ticket) = self.engine.pending_ticket() {
            let events = self.engine.resolve(ticket, Utc::now());
            self.emit(events);
        }
        self.persist();
        if let Some(c) = metrics::game_counters_snapshot().get(self.engine.kind().slug()) {
            info!(
                "{} stopped: rounds {}/{} started/finished, commands {} handled, {} ignored",
                self.engine.kind(),
                c.rounds_started,
                c.rounds_finished,
                c.commands_handled,
                c.commands_ignored
            );
        }
    }
}

fn events_only(events: Vec<GameEvent>) -> Outcome {
    Outcome {
        events,
        deferred: None,
    }
}
