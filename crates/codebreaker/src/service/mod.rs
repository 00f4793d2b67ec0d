//! Asynchronous operations against the Codebreaker service.

mod http;
mod validation;

pub use http::HttpCodebreakerService;
pub use validation::{MAX_CODE_LENGTH, MIN_CODE_LENGTH, validate_game, validate_guess};

use async_trait::async_trait;

use crate::error::ServiceError;
use crate::model::{Game, Guess};

/// Operations offered by the Codebreaker service.
///
/// [`HttpCodebreakerService`] talks to the real service; the session
/// publisher only depends on this trait, so tests can substitute a fake.
#[async_trait]
pub trait CodebreakerService: Send + Sync {
    /// Starts a game from a draft; resolves with the service-assigned game.
    async fn start_game(&self, game: &Game) -> Result<Game, ServiceError>;

    /// Fetches a game with its guess history.
    async fn get_game(&self, game_id: &str) -> Result<Game, ServiceError>;

    /// Deletes a game.
    async fn delete_game(&self, game_id: &str) -> Result<(), ServiceError>;

    /// Submits a guess against `game`; resolves with the scored guess.
    async fn submit_guess(&self, game: &Game, guess: &Guess) -> Result<Guess, ServiceError>;

    /// Fetches a single guess of a game.
    async fn get_guess(&self, game_id: &str, guess_id: &str) -> Result<Guess, ServiceError>;

    /// Releases transport resources. Later operations fail.
    fn shutdown(&self);
}
