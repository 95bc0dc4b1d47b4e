//! Randomness helpers shared by all games.
//!
//! Every game owns its own [`GameRng`] so tests can pin outcomes with a seed
//! while production play draws from OS entropy.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use super::errors::GameError;

pub type GameRng = StdRng;

/// Build a game RNG; `Some(seed)` gives a reproducible sequence.
pub fn game_rng(seed: Option<u64>) -> GameRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    }
}

/// Uniform integer in `[min, max]` inclusive.
pub fn random_int<R: Rng + ?Sized>(rng: &mut R, min: i64, max: i64) -> Result<i64, GameError> {
    if min > max {
        return Err(GameError::InvalidRange { min, max });
    }
    Ok(rng.gen_range(min..=max))
}

/// Return a uniformly shuffled copy of `items` (Fisher-Yates); the input is untouched.
pub fn shuffle<T: Clone, R: Rng + ?Sized>(rng: &mut R, items: &[T]) -> Vec<T> {
    let mut out = items.to_vec();
    out.shuffle(rng);
    out
}
