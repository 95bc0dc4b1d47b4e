//! # Chatgames - chat-driven party games
//!
//! Three small games played through chat commands, sharing one engine:
//!
//! - **Memory**: take turns flipping cards with `!memory B3`, match pairs of faces.
//! - **Roulette**: `!bet 100 red` against a weighted red/black/green wheel.
//! - **NumberGuess**: `!guess 42` with higher/lower hints and a highscore table.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use chatgames::config::Config;
//! use chatgames::games::{GameEngine, GameKind};
//! use chatgames::server::{GameServer, HostCommand, LogRenderer};
//! use chatgames::storage::GameStorage;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     let kind = GameKind::Roulette;
//!     let engine = GameEngine::new(kind, config.engine_options(None))?;
//!     let storage = GameStorage::new(&config.storage.data_dir, kind.slug())?;
//!     let (mut server, handle) = GameServer::new(engine, storage, Box::new(LogRenderer));
//!     handle.host.send(HostCommand::StartRound)?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`games`] - rules, command parsing and the generic engine
//! - [`server`] - host loop: chat in, timers, persistence, renderer out
//! - [`storage`] - one JSON save per game
//! - [`config`] - TOML configuration
//! - [`console`] - stdin/stdout front end used by the binary
//! - [`metrics`] - in-process counters
//! - [`logutil`] - log-safe rendering of chat text

pub mod config;
pub mod console;
pub mod games;
pub mod logutil;
pub mod metrics;
pub mod server;
pub mod storage;
