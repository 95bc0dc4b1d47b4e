//! Shared builders for integration tests.
#![allow(dead_code)]

use chatgames::games::memory::MemorySettings;
use chatgames::games::{EngineOptions, GameEngine, GameKind};
use chatgames::server::{GameServer, RecordingRenderer, ServerHandle};
use chatgames::storage::GameStorage;
use chrono::{DateTime, Duration, TimeZone, Utc};

/// Fixed clock origin so cooldown and elapsed-time maths are exact.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 20, 0, 0).unwrap()
}

pub fn at(seconds: i64) -> DateTime<Utc> {
    t0() + Duration::seconds(seconds)
}

/// Seeded options with short delays and a small memory board.
pub fn options(board: &str) -> EngineOptions {
    let mut options = EngineOptions {
        memory: MemorySettings {
            board_size: board.to_string(),
            match_reveal_ms: 5,
            miss_reveal_ms: 5,
            ..MemorySettings::default()
        },
        seed: Some(2024),
        ..EngineOptions::default()
    };
    options.roulette.spin_duration_ms = 5;
    options
}

pub fn engine(kind: GameKind) -> GameEngine {
    GameEngine::new(kind, options("4x2")).expect("engine")
}

pub fn server(kind: GameKind, dir: &tempfile::TempDir) -> (GameServer, ServerHandle, RecordingRenderer) {
    let storage = GameStorage::new(dir.path(), kind.slug()).expect("storage");
    let recorder = RecordingRenderer::new();
    let (server, handle) = GameServer::new(engine(kind), storage, Box::new(recorder.clone()));
    (server, handle, recorder)
}
