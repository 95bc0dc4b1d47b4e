//! Binary entrypoint for the chatgames CLI.
//!
//! Commands:
//! - `init` - write a starter `config.toml`
//! - `play --game <memory|roulette|guess> [--seed N]` - run a game fed by stdin
//! - `status --game <...>` - print the saved state of a game
//!
//! See the library crate docs for module-level details: `chatgames::`.
use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};

use chatgames::config::Config;
use chatgames::console::{parse_console_line, status_lines, ConsoleInput, ConsoleRenderer};
use chatgames::games::{GameEngine, GameKind};
use chatgames::server::{GameServer, HostCommand, LogRenderer, Renderer};
use chatgames::storage::GameStorage;

#[derive(Parser)]
#[command(name = "chatgames")]
#[command(about = "Chat-driven party games: memory, roulette and number guessing")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init,
    /// Run a game, reading `user: message` chat lines and /commands from stdin
    Play {
        /// memory, roulette or guess
        #[arg(short, long)]
        game: GameKind,
        /// Fixed RNG seed for reproducible rounds
        #[arg(long)]
        seed: Option<u64>,
        /// Send events to the log instead of stdout
        #[arg(long)]
        log_events: bool,
    },
    /// Show the saved state of a game
    Status {
        #[arg(short, long)]
        game: GameKind,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            init_logging(&None, cli.verbose);
            if std::path::Path::new(&cli.config).exists() {
                return Err(anyhow!("{} already exists; not overwriting", cli.config));
            }
            Config::create_default(&cli.config).await?;
            info!("Configuration file created at {}", cli.config);
        }
        Commands::Play {
            game,
            seed,
            log_events,
        } => {
            let config = load_or_default(&cli.config).await;
            init_logging(&Some(config.clone()), cli.verbose);
            log_config_warnings(&config);
            info!("Starting chatgames v{} ({})", env!("CARGO_PKG_VERSION"), game);
            play(config, game, seed, log_events).await?;
        }
        Commands::Status { game } => {
            let config = load_or_default(&cli.config).await;
            init_logging(&Some(config.clone()), cli.verbose);
            log_config_warnings(&config);
            let mut engine = GameEngine::new(game, config.engine_options(None))?;
            let storage = GameStorage::new(&config.storage.data_dir, game.slug())?;
            match storage.load()? {
                Some(blob) => engine.restore_blob(blob)?,
                None => println!("No saved state at {}; showing configured defaults.", storage.path().display()),
            }
            for line in status_lines(&engine) {
                println!("{}", line);
            }
        }
    }

    Ok(())
}

async fn load_or_default(path: &str) -> Config {
    if !std::path::Path::new(path).exists() {
        return Config::default();
    }
    match Config::load(path).await {
        Ok(c) => c,
        Err(e) => {
            // Logging is not up yet.
            eprintln!("{}; using defaults", e);
            Config::default()
        }
    }
}

fn log_config_warnings(config: &Config) {
    for w in config.warnings() {
        warn!("{}", w);
    }
}

async fn play(config: Config, game: GameKind, seed: Option<u64>, log_events: bool) -> Result<()> {
    let engine = GameEngine::new(game, config.engine_options(seed))?;
    let storage = GameStorage::new(&config.storage.data_dir, game.slug())?;
    let default_export = PathBuf::from(storage.default_export_name());
    let renderer: Box<dyn Renderer> = if log_events {
        Box::new(LogRenderer)
    } else {
        Box::new(ConsoleRenderer)
    };
    let (mut server, handle) = GameServer::new(engine, storage, renderer);
    if !config.chat.channel.is_empty() {
        info!("Listening as channel '{}'", config.chat.channel);
    }

    let reader = tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => match parse_console_line(&line, &default_export) {
                    Some(ConsoleInput::Chat(ev)) => {
                        if handle.chat.send(ev).is_err() {
                            break;
                        }
                    }
                    Some(ConsoleInput::Host(cmd)) => {
                        let quit = cmd == HostCommand::Shutdown;
                        if handle.host.send(cmd).is_err() || quit {
                            break;
                        }
                    }
                    Some(ConsoleInput::Invalid(why)) => eprintln!("? {}", why),
                    None => {}
                },
                Ok(None) => {
                    let _ = handle.host.send(HostCommand::Shutdown);
                    break;
                }
                Err(e) => {
                    warn!("stdin read error: {}", e);
                    let _ = handle.host.send(HostCommand::Shutdown);
                    break;
                }
            }
        }
    });

    server.run().await?;
    reader.abort();
    Ok(())
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity wins over the configured level
    let base_level = match verbosity {
        0 => config
            .as_ref()
            .and_then(|c| c.logging.level.parse::<log::LevelFilter>().ok())
            .unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);
    let log_file = config.as_ref().and_then(|c| c.logging.file.clone());
    let file = log_file.and_then(|path| {
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .ok()
    });
    if let Some(f) = file {
        let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
        // With a log file, only echo to the console when someone is watching.
        let is_tty = atty::is(atty::Stream::Stderr);
        builder.format(move |fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            let line = format!("{} [{}] {}", ts, record.level(), record.args());
            if let Ok(mut guard) = write_mutex.lock() {
                let _ = writeln!(guard, "{}", line);
            }
            if is_tty {
                writeln!(fmt, "{}", line)
            } else {
                Ok(())
            }
        });
    } else {
        builder.format(|fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            writeln!(fmt, "{} [{}] {}", ts, record.level(), record.args())
        });
    }
    let _ = builder.try_init();
}
