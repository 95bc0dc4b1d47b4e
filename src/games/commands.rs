//! Chat command parser: a small, best-effort matcher for the game keywords.
//!
//! Each game only listens to its own grammar (default prefix `!`):
//! - Memory: `!play`, `!memory <letter><number>` (e.g. `!memory B3`)
//! - Roulette: `!join`, `!bet <amount> <color>`
//! - NumberGuess: `!guess <number>`
//!
//! Keywords are case-insensitive. Anything else is [`ChatCommand::Unknown`] and
//! simply ignored by the engine. Numeric and color arguments are only
//! tokenized here; range and validity checks belong to the game itself.
use log::trace;

use super::GameKind;

/// Prefix characters accepted in configuration.
pub const ALLOWED_PREFIXES: [char; 6] = ['!', '^', '+', '$', '/', '>'];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    Play,
    /// Zero-based column/row (`A1` → `(0, 0)`).
    Memory { col: i64, row: i64 },
    Join,
    Bet { amount: i64, color: String },
    Guess(i64),
    Unknown,
}

#[derive(Debug, Clone)]
pub struct ChatCommandParser {
    game: GameKind,
    prefix: char,
}

impl ChatCommandParser {
    pub fn new(game: GameKind) -> Self {
        Self { game, prefix: '!' }
    }

    /// Use a configured prefix; anything outside [`ALLOWED_PREFIXES`] falls back to `!`.
    pub fn new_with_prefix(game: GameKind, prefix: Option<&str>) -> Self {
        let prefix = prefix
            .and_then(|p| {
                let mut chars = p.trim().chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) if ALLOWED_PREFIXES.contains(&c) => Some(c),
                    _ => None,
                }
            })
            .unwrap_or('!');
        Self { game, prefix }
    }

    pub fn prefix(&self) -> char {
        self.prefix
    }

    pub fn parse(&self, raw: &str) -> ChatCommand {
        let Some(body) = raw.trim().strip_prefix(self.prefix) else {
            return ChatCommand::Unknown;
        };
        let mut parts = body.split_whitespace();
        let Some(keyword) = parts.next() else {
            return ChatCommand::Unknown;
        };
        let args: Vec<&str> = parts.collect();
        let keyword = keyword.to_ascii_lowercase();

        let cmd = match (self.game, keyword.as_str(), args.as_slice()) {
            (GameKind::Memory, "play", []) => ChatCommand::Play,
            (GameKind::Memory, "memory", [cell]) => parse_cell(cell),
            (GameKind::Roulette, "join", []) => ChatCommand::Join,
            (GameKind::Roulette, "bet", [amount, color]) => match amount.parse::<i64>() {
                Ok(amount) => ChatCommand::Bet {
                    amount,
                    color: color.to_string(),
                },
                Err(_) => ChatCommand::Unknown,
            },
            (GameKind::NumberGuess, "guess", [n]) => match n.parse::<i64>() {
                Ok(v) => ChatCommand::Guess(v),
                Err(_) => ChatCommand::Unknown,
            },
            _ => ChatCommand::Unknown,
        };
        if cmd != ChatCommand::Unknown {
            trace!("Parsed {:?} from '{}'", cmd, raw);
        }
        cmd
    }
}

/// `B3` → column 1, row 2. One ASCII letter followed by digits only.
fn parse_cell(cell: &str) -> ChatCommand {
    let mut chars = cell.chars();
    let Some(letter) = chars.next().filter(|c| c.is_ascii_alphabetic()) else {
        return ChatCommand::Unknown;
    };
    let digits = chars.as_str();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return ChatCommand::Unknown;
    }
    match digits.parse::<i64>() {
        Ok(number) => ChatCommand::Memory {
            col: (letter.to_ascii_uppercase() as u8 - b'A') as i64,
            row: number - 1,
        },
        Err(_) => ChatCommand::Unknown,
    }
}
