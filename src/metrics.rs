//! In-process counters per game slug.
//!
//! Nothing is exported over the network; `status` and the shutdown log line
//! read [`game_counters_snapshot`].
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, OnceLock};

static SAVE_FAILURES: AtomicU64 = AtomicU64::new(0);

static GAME_COUNTERS: OnceLock<Mutex<HashMap<String, GameCounter>>> = OnceLock::new();

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GameCounter {
    pub rounds_started: u64,
    pub rounds_finished: u64,
    /// Chat lines that produced at least one event.
    pub commands_handled: u64,
    /// Chat lines that were not commands or were silently dropped.
    pub commands_ignored: u64,
    pub stale_resolutions: u64,
}

fn game_counters() -> MutexGuard<'static, HashMap<String, GameCounter>> {
    let lock = GAME_COUNTERS.get_or_init(|| Mutex::new(HashMap::new()));
    // Counters stay usable even if a panicking thread held the lock.
    lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn update(slug: &str, f: impl FnOnce(&mut GameCounter)) -> GameCounter {
    let mut guard = game_counters();
    let counter = guard.entry(slug.to_string()).or_default();
    f(counter);
    *counter
}

pub fn record_round_started(slug: &str) -> GameCounter {
    update(slug, |c| c.rounds_started = c.rounds_started.saturating_add(1))
}

pub fn record_round_finished(slug: &str) -> GameCounter {
    update(slug, |c| c.rounds_finished = c.rounds_finished.saturating_add(1))
}

pub fn record_command(slug: &str, handled: bool) -> GameCounter {
    update(slug, |c| {
        if handled {
            c.commands_handled = c.commands_handled.saturating_add(1);
        } else {
            c.commands_ignored = c.commands_ignored.saturating_add(1);
        }
    })
}

pub fn record_stale_resolution(slug: &str) -> GameCounter {
    update(slug, |c| c.stale_resolutions = c.stale_resolutions.saturating_add(1))
}

pub fn inc_save_failures() {
    SAVE_FAILURES.fetch_add(1, Ordering::Relaxed);
}

pub fn save_failures() -> u64 {
    SAVE_FAILURES.load(Ordering::Relaxed)
}

pub fn game_counters_snapshot() -> HashMap<String, GameCounter> {
    game_counters().clone()
}
