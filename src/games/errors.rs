use thiserror::Error;

/// Broad classification used by the host to decide how loudly to report a failure.
///
/// None of these ever end a round; the engine keeps running with its current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad user or operator input (range, format, unknown color).
    Validation,
    /// Valid in isolation but illegal right now (betting mid-spin, empty wheel queue).
    StateConflict,
    /// Player limit reached.
    Capacity,
}

/// Errors raised by the game engine and its variants.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GameError {
    /// `min`/`max` do not describe a usable range.
    #[error("invalid range: {min}..={max}")]
    InvalidRange { min: i64, max: i64 },

    /// Bet amount must be a positive integer.
    #[error("invalid amount: {0}")]
    InvalidAmount(i64),

    /// Bet exceeds the player's current balance.
    #[error("insufficient balance: wanted {wanted}, have {balance}")]
    InsufficientBalance { wanted: i64, balance: i64 },

    /// Color is not one of red, black, green.
    #[error("invalid color: {0}")]
    InvalidColor(String),

    /// Bets and odds are locked while the wheel is turning.
    #[error("spin in progress")]
    SpinInProgress,

    /// `spin` called with an empty bet queue.
    #[error("no bets placed")]
    NoBetsPlaced,

    /// The wheel has no segments (all chances rounded to zero).
    #[error("wheel has no segments")]
    EmptyWheel,

    /// Player registry is full.
    #[error("player limit reached ({max})")]
    CapacityExceeded { max: usize },

    /// Operation on a player that never joined.
    #[error("unknown player: {0}")]
    UnknownPlayer(String),

    /// Board dimensions are unusable (odd cell count, zero, or more than 26 columns).
    #[error("invalid board size: {0}")]
    InvalidBoardSize(String),

    /// Face catalogue too small for the requested board.
    #[error("not enough faces: need {needed}, have {available}")]
    NotEnoughFaces { needed: usize, available: usize },

    /// Guess cooldown longer than the allowed maximum.
    #[error("cooldown of {seconds} s exceeds the maximum of {max} s")]
    InvalidCooldown { seconds: u64, max: u64 },

    /// A new round may only start from idle or resolved.
    #[error("round already in progress")]
    RoundInProgress,

    /// The requested action does not exist for this game.
    #[error("{action} is not supported by {game}")]
    Unsupported {
        game: &'static str,
        action: &'static str,
    },

    /// A persisted blob could not be applied to this game.
    #[error("invalid saved state: {0}")]
    InvalidSave(String),
}

impl GameError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GameError::SpinInProgress
            | GameError::NoBetsPlaced
            | GameError::EmptyWheel
            | GameError::RoundInProgress
            | GameError::Unsupported { .. } => ErrorKind::StateConflict,
            GameError::CapacityExceeded { .. } => ErrorKind::Capacity,
            _ => ErrorKind::Validation,
        }
    }
}
