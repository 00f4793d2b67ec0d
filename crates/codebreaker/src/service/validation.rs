//! Local request validation performed before any network call.

use tracing::{instrument, warn};
use unicode_general_category::{GeneralCategory, get_general_category};

use crate::error::ServiceError;
use crate::model::{Game, Guess};

/// Shortest allowed code.
pub const MIN_CODE_LENGTH: usize = 1;
/// Longest allowed code.
pub const MAX_CODE_LENGTH: usize = 20;

/// Checks a draft game: length in range, non-empty pool of defined code points.
#[instrument(skip(game), fields(length = *game.length()))]
pub fn validate_game(game: &Game) -> Result<(), ServiceError> {
    let length = *game.length();
    if !(MIN_CODE_LENGTH..=MAX_CODE_LENGTH).contains(&length) {
        warn!("Code length out of range");
        return Err(ServiceError::invalid_payload(format!(
            "code length {} outside {}..={}",
            length, MIN_CODE_LENGTH, MAX_CODE_LENGTH
        )));
    }
    if game.pool().is_empty() {
        warn!("Empty pool");
        return Err(ServiceError::invalid_payload("pool is empty"));
    }
    if let Some(bad) = game.pool_code_points().find(|c| !is_defined(*c)) {
        warn!(code_point = %format!("U+{:04X}", bad as u32), "Undefined code point in pool");
        return Err(ServiceError::invalid_payload(format!(
            "pool contains undefined code point U+{:04X}",
            bad as u32
        )));
    }
    Ok(())
}

/// Checks a draft guess against its game: exact length, pool-only code points.
#[instrument(skip(game, guess), fields(length = *game.length()))]
pub fn validate_guess(game: &Game, guess: &Guess) -> Result<(), ServiceError> {
    let length = guess.code_length();
    if length != *game.length() {
        warn!(guess_length = length, "Guess length mismatch");
        return Err(ServiceError::invalid_payload(format!(
            "guess has {} code points, game expects {}",
            length,
            game.length()
        )));
    }
    if let Some(bad) = guess.text().chars().find(|c| !game.pool().contains(*c)) {
        warn!(code_point = %bad, "Guess uses code point outside pool");
        return Err(ServiceError::invalid_payload(format!(
            "'{}' is not in the pool",
            bad
        )));
    }
    Ok(())
}

/// Null and unassigned code points (noncharacters included) are never valid in a pool.
fn is_defined(c: char) -> bool {
    c != '\0' && get_general_category(c) != GeneralCategory::Unassigned
}
