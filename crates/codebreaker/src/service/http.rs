//! HTTP implementation of [`CodebreakerService`] on a dedicated transport pool.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use tokio::runtime::{Handle, Runtime};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, error, info, instrument, warn};

use super::CodebreakerService;
use super::validation::{validate_game, validate_guess};
use crate::config::ClientConfig;
use crate::error::{ConfigError, ServiceError};
use crate::model::{Game, Guess};

/// Service client backed by `reqwest`.
///
/// Requests run on a bounded multi-threaded runtime owned by the client, so
/// callers on any executor (or none) only await the result. Guess submissions
/// for the same game are queued and sent one at a time.
#[derive(Debug)]
pub struct HttpCodebreakerService {
    root: Url,
    client: reqwest::Client,
    handle: Handle,
    pool: Mutex<Option<Runtime>>,
    shut_down: AtomicBool,
    guess_turns: GuessTurns,
}

impl HttpCodebreakerService {
    /// Builds the transport pool and HTTP client described by `config`.
    #[instrument(skip(config), fields(base_url = %config.base_url(), workers = *config.worker_threads()))]
    pub fn new(config: &ClientConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let root = config.service_root()?;

        let mut builder =
            reqwest::Client::builder().pool_max_idle_per_host(*config.worker_threads());
        if let Some(secs) = config.connect_timeout_secs() {
            builder = builder.connect_timeout(Duration::from_secs(*secs));
        }
        let client = builder
            .build()
            .map_err(|e| ConfigError::new(format!("Failed to build HTTP client: {}", e)))?;

        // Built last: dropping a runtime from inside another runtime panics.
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(*config.worker_threads())
            .thread_name("codebreaker-transport")
            .enable_all()
            .build()
            .map_err(|e| ConfigError::new(format!("Failed to start transport pool: {}", e)))?;

        info!(root = %root, "Codebreaker service client ready");
        Ok(Self {
            root,
            client,
            handle: runtime.handle().clone(),
            pool: Mutex::new(Some(runtime)),
            shut_down: AtomicBool::new(false),
            guess_turns: GuessTurns::default(),
        })
    }

    /// Whether [`CodebreakerService::shutdown`] has run.
    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.root.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Runs `request` on the transport pool and waits for its outcome.
    async fn execute<T, F>(&self, operation: &'static str, request: F) -> Result<T, ServiceError>
    where
        T: Send + 'static,
        F: Future<Output = Result<T, ServiceError>> + Send + 'static,
    {
        if self.is_shut_down() {
            warn!(operation, "Operation started after shutdown");
            return Err(ServiceError::shut_down());
        }
        self.handle.spawn(request).await.map_err(|e| {
            error!(operation, error = %e, "Transport task did not complete");
            ServiceError::transport(format!("{} did not complete", operation), e)
        })?
    }
}

#[async_trait]
impl CodebreakerService for HttpCodebreakerService {
    #[instrument(skip(self, game), fields(length = *game.length()))]
    async fn start_game(&self, game: &Game) -> Result<Game, ServiceError> {
        validate_game(game)?;
        let request = self.client.post(self.endpoint(&["games"])).json(game);
        debug!("POST /games");
        let started: Game = self.execute("start_game", send_json(request)).await?;
        info!(game_id = ?started.id(), "Game started");
        Ok(started)
    }

    #[instrument(skip(self))]
    async fn get_game(&self, game_id: &str) -> Result<Game, ServiceError> {
        let request = self.client.get(self.endpoint(&["games", game_id]));
        debug!("GET /games/{{gameId}}");
        self.execute("get_game", send_json(request)).await
    }

    #[instrument(skip(self))]
    async fn delete_game(&self, game_id: &str) -> Result<(), ServiceError> {
        let request = self.client.delete(self.endpoint(&["games", game_id]));
        debug!("DELETE /games/{{gameId}}");
        self.execute("delete_game", async move { send(request).await.map(|_| ()) })
            .await?;
        self.guess_turns.release(game_id);
        info!("Game deleted");
        Ok(())
    }

    #[instrument(skip(self, game, guess), fields(game_id = ?game.id(), text = %guess.text()))]
    async fn submit_guess(&self, game: &Game, guess: &Guess) -> Result<Guess, ServiceError> {
        validate_guess(game, guess)?;
        let game_id = game
            .id()
            .ok_or_else(|| ServiceError::invalid_payload("game has not been started"))?;
        let request = self
            .client
            .post(self.endpoint(&["games", game_id, "guesses"]))
            .json(guess);

        let turn = self.guess_turns.slot(game_id).lock_owned().await;
        debug!("POST /games/{{gameId}}/guesses");
        let scored: Guess = self
            .execute("submit_guess", async move {
                let _turn = turn;
                send_json(request).await
            })
            .await?;
        info!(
            exact = ?scored.exact_matches(),
            near = ?scored.near_matches(),
            solution = scored.is_solution(),
            "Guess scored"
        );
        Ok(scored)
    }

    #[instrument(skip(self))]
    async fn get_guess(&self, game_id: &str, guess_id: &str) -> Result<Guess, ServiceError> {
        let request = self
            .client
            .get(self.endpoint(&["games", game_id, "guesses", guess_id]));
        debug!("GET /games/{{gameId}}/guesses/{{guessId}}");
        self.execute("get_guess", send_json(request)).await
    }

    #[instrument(skip(self))]
    fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            debug!("Already shut down");
            return;
        }
        let runtime = self
            .pool
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(runtime) = runtime {
            runtime.shutdown_background();
        }
        info!("Transport pool released");
    }
}

impl Drop for HttpCodebreakerService {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Per-game FIFO gates for guess submission.
#[derive(Debug, Default)]
struct GuessTurns {
    slots: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl GuessTurns {
    fn slot(&self, game_id: &str) -> Arc<AsyncMutex<()>> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(game_id.to_owned()).or_default())
    }

    fn release(&self, game_id: &str) {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(game_id);
    }
}

/// Sends a request, turning any non-success outcome into a [`ServiceError`].
async fn send(request: RequestBuilder) -> Result<Response, ServiceError> {
    let response = request.send().await.map_err(|e| {
        error!(error = %e, "No response from service");
        ServiceError::transport("no response from service", e)
    })?;

    let status = response.status();
    if status.is_success() {
        debug!(status = %status, "Request succeeded");
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let error = ServiceError::from_status(status.as_u16(), body);
    warn!(status = %status, kind = %error.kind(), "Service rejected request");
    Err(error)
}

async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ServiceError> {
    send(request).await?.json::<T>().await.map_err(|e| {
        error!(error = %e, "Undecodable response body");
        ServiceError::transport("undecodable response body", e)
    })
}
