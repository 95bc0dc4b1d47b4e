//! Console front end for `chatgames play` and `chatgames status`.
//!
//! Each stdin line is either chat, written `user: message`, or a host command
//! starting with `/`:
//!
//! | line               | action                           |
//! |--------------------|----------------------------------|
//! | `/start`           | start a round                    |
//! | `/restart`         | abandon the round and start over |
//! | `/spin`            | spin the roulette wheel          |
//! | `/reset <user>`    | reset a roulette player          |
//! | `/add <user> <n>`  | add balance                      |
//! | `/export [file]`   | export settings and data         |
//! | `/import <file>`   | import settings and data         |
//! | `/quit`            | settle, save and exit            |

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::games::{GameEngine, GameEvent, GameKind};
use crate::server::{ChatEvent, HostCommand, Renderer};

#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleInput {
    Chat(ChatEvent),
    Host(HostCommand),
    /// Unparseable line; the string says why.
    Invalid(String),
}

/// Parse one stdin line. Blank lines give `None`.
pub fn parse_console_line(line: &str, default_export: &Path) -> Option<ConsoleInput> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    if let Some(rest) = line.strip_prefix('/') {
        return Some(parse_host(rest, default_export));
    }
    let parsed = line.split_once(':').and_then(|(user, text)| {
        let user = user.trim();
        let valid = !user.is_empty() && !user.contains(char::is_whitespace);
        valid.then(|| ChatEvent::new(user, text.trim()))
    });
    Some(match parsed {
        Some(ev) => ConsoleInput::Chat(ev),
        None => ConsoleInput::Invalid("expected 'user: message' or a /command".to_string()),
    })
}

fn parse_host(rest: &str, default_export: &Path) -> ConsoleInput {
    let mut parts = rest.split_whitespace();
    let verb = parts.next().unwrap_or("").to_ascii_lowercase();
    let args: Vec<&str> = parts.collect();
    let cmd = match (verb.as_str(), args.as_slice()) {
        ("start", []) => HostCommand::StartRound,
        ("restart", []) => HostCommand::RestartRound,
        ("spin", []) => HostCommand::Spin,
        ("reset", [user]) => HostCommand::ResetPlayer(user.to_string()),
        ("add", [user, amount]) => match amount.parse::<i64>() {
            Ok(amount) => HostCommand::AddBalance {
                player: user.to_string(),
                amount,
            },
            Err(_) => return ConsoleInput::Invalid(format!("not a number: {}", amount)),
        },
        ("export", []) => HostCommand::Export(default_export.to_path_buf()),
        ("export", [file]) => HostCommand::Export(PathBuf::from(file)),
        ("import", [file]) => HostCommand::Import(PathBuf::from(file)),
        ("quit" | "exit", []) => HostCommand::Shutdown,
        _ => return ConsoleInput::Invalid(format!("unknown command: /{}", rest.trim())),
    };
    ConsoleInput::Host(cmd)
}

/// Prints each event as a chat line on stdout.
#[derive(Debug, Default)]
pub struct ConsoleRenderer;

impl Renderer for ConsoleRenderer {
    fn render(&mut self, game: GameKind, event: &GameEvent) {
        let mut out = std::io::stdout().lock();
        let _ = writeln!(out, "[{}] {}", game.slug(), event);
    }
}

/// Human summary of persisted state, used by `chatgames status`.
pub fn status_lines(engine: &GameEngine) -> Vec<String> {
    let mut lines = vec![format!("Game: {} ({})", engine.kind(), engine.kind().slug())];
    if let Some(g) = engine.memory() {
        let s = g.settings();
        lines.push(format!(
            "Board {} (max {} players), {} faces in catalogue",
            s.board_size,
            s.max_players,
            g.faces().len()
        ));
    }
    if let Some(g) = engine.roulette() {
        let odds = g.settings().odds();
        lines.push(format!(
            "Odds red {}% / black {}% / green {}%, {} segments",
            odds.red,
            odds.black,
            odds.green,
            g.segments().len()
        ));
        for p in g.players().ranked() {
            lines.push(format!(
                "  {:<20} {:>8}  W{} L{}",
                p.name, p.points, p.wins, p.losses
            ));
        }
        let recent: Vec<String> = g.recent_history().iter().map(|r| r.result.to_string()).collect();
        if !recent.is_empty() {
            lines.push(format!("Last results: {}", recent.join(" ")));
        }
    }
    if let Some(g) = engine.number_guess() {
        let (min, max) = g.range();
        lines.push(format!(
            "Range {}..={}, cooldown {} s",
            min,
            max,
            g.settings().cooldown_seconds
        ));
        for (i, h) in g.highscores().iter().enumerate() {
            lines.push(format!(
                "  #{:<2} {:<20} {} attempts  {:.1} s",
                i + 1,
                h.username,
                h.attempts,
                h.elapsed_seconds
            ));
        }
    }
    lines
}
