//! Session publisher: the current game, guess, solved flag and error, with
//! per-kind observers.
//!
//! All four values live inside a [`DeliveryContext`]; service completions hand
//! their update to that context instead of applying it on the worker that
//! finished the request. Observers of one kind therefore see updates one at a
//! time, in completion order.

mod channel;
mod delivery;

pub use channel::{Observer, SubscriptionId};
use delivery::DeliveryContext;

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info, instrument, warn};

use crate::error::ServiceError;
use crate::model::{Game, Guess};
use crate::service::CodebreakerService;
use channel::Channel;

/// Kinds of value a session publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// Current game, or its absence after deletion.
    Game,
    /// Latest guess.
    Guess,
    /// Solved flag of the current game.
    Solved,
    /// Latest failure.
    Error,
}

/// Cached session values, owned by the delivery context.
#[derive(Default)]
pub(crate) struct SessionState {
    game: Channel<Option<Game>>,
    guess: Channel<Guess>,
    solved: Channel<Option<bool>>,
    error: Channel<ServiceError>,
}

impl SessionState {
    fn current_game(&self) -> Option<&Game> {
        self.game.current().and_then(Option::as_ref)
    }

    /// Takes a service-provided game as current, along with its solved flag.
    fn adopt_game(&mut self, game: Game) {
        let solved = game.solved();
        debug!(game_id = ?game.id(), ?solved, observers = self.game.observer_count(), "Publishing game");
        self.game.publish(Some(game));
        self.solved.publish(solved);
    }

    /// Clears the current game if it is `game_id`.
    fn discard_game(&mut self, game_id: &str) {
        if self.current_game().and_then(Game::id) == Some(game_id) {
            debug!(game_id, "Clearing current game");
            self.game.publish(None);
        }
    }

    fn set_guess(&mut self, guess: Guess) {
        debug!(guess_id = ?guess.id(), observers = self.guess.observer_count(), "Publishing guess");
        self.guess.publish(guess);
    }

    /// Appends a scored guess to the current game if it is still `game_id`.
    fn append_guess(&mut self, game_id: &str, guess: Guess) {
        if self.current_game().and_then(Game::id) != Some(game_id) {
            debug!(game_id, "Current game changed; guess not appended");
            return;
        }
        self.game.modify(|game| {
            if let Some(game) = game {
                game.push_guess(guess);
            }
        });
    }

    fn set_error(&mut self, error: ServiceError) {
        debug!(kind = %error.kind(), observers = self.error.observer_count(), "Publishing error");
        self.error.publish(error);
    }

    fn remove(&mut self, kind: ValueKind, id: SubscriptionId) -> bool {
        match kind {
            ValueKind::Game => self.game.unsubscribe(id),
            ValueKind::Guess => self.guess.unsubscribe(id),
            ValueKind::Solved => self.solved.unsubscribe(id),
            ValueKind::Error => self.error.unsubscribe(id),
        }
    }
}

/// Registration of one observer; dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes its observer"]
#[derive(Debug)]
pub struct Subscription {
    kind: ValueKind,
    id: SubscriptionId,
    context: DeliveryContext<SessionState>,
    active: bool,
}

impl Subscription {
    /// Kind of value this subscription observes.
    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    /// Removes the observer now.
    pub fn unsubscribe(mut self) {
        self.detach();
    }

    fn detach(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        let (kind, id) = (self.kind, self.id);
        self.context.post(move |state| {
            if state.remove(kind, id) {
                debug!(?kind, id, "Observer removed");
            }
        });
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.detach();
    }
}

/// Caches the latest session values and notifies observers of changes.
///
/// Operations never fail to the caller: outcomes, including failures, arrive
/// through the observers. Each operation returns the handle of the task that
/// runs it; awaiting the handle is optional.
#[derive(Clone)]
pub struct SessionPublisher {
    service: Arc<dyn CodebreakerService>,
    context: DeliveryContext<SessionState>,
    runtime: Handle,
    next_subscription: Arc<AtomicU64>,
}

impl fmt::Debug for SessionPublisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionPublisher")
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

impl SessionPublisher {
    /// Creates a publisher on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    #[instrument(skip(service))]
    pub fn new(service: Arc<dyn CodebreakerService>) -> Self {
        Self::with_runtime(service, Handle::current())
    }

    /// Creates a publisher whose tasks run on `runtime`.
    #[instrument(skip(service, runtime))]
    pub fn with_runtime(service: Arc<dyn CodebreakerService>, runtime: Handle) -> Self {
        info!("Creating session publisher");
        let context = DeliveryContext::spawn(&runtime, SessionState::default());
        Self {
            service,
            context,
            runtime,
            next_subscription: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Observes the current game; `None` after the current game is deleted.
    pub fn subscribe_game(
        &self,
        observer: impl FnMut(&Option<Game>) + Send + 'static,
    ) -> Subscription {
        self.attach(ValueKind::Game, move |state, id| {
            state.game.subscribe(id, Box::new(observer))
        })
    }

    /// Observes the latest guess.
    pub fn subscribe_guess(&self, observer: impl FnMut(&Guess) + Send + 'static) -> Subscription {
        self.attach(ValueKind::Guess, move |state, id| {
            state.guess.subscribe(id, Box::new(observer))
        })
    }

    /// Observes the solved flag; `None` while the service has not said.
    pub fn subscribe_solved(
        &self,
        observer: impl FnMut(&Option<bool>) + Send + 'static,
    ) -> Subscription {
        self.attach(ValueKind::Solved, move |state, id| {
            state.solved.subscribe(id, Box::new(observer))
        })
    }

    /// Observes failures of any operation.
    pub fn subscribe_error(
        &self,
        observer: impl FnMut(&ServiceError) + Send + 'static,
    ) -> Subscription {
        self.attach(ValueKind::Error, move |state, id| {
            state.error.subscribe(id, Box::new(observer))
        })
    }

    fn attach(
        &self,
        kind: ValueKind,
        register: impl FnOnce(&mut SessionState, SubscriptionId) + Send + 'static,
    ) -> Subscription {
        let id = self.next_subscription.fetch_add(1, Ordering::Relaxed);
        self.context.post(move |state| register(state, id));
        debug!(?kind, id, "Observer registered");
        Subscription {
            kind,
            id,
            context: self.context.clone(),
            active: true,
        }
    }

    /// Starts a game over `pool` with codes of `length` code points.
    #[instrument(skip(self, pool))]
    pub fn start_game(&self, pool: impl Into<String>, length: usize) -> JoinHandle<()> {
        let draft = Game::draft(pool, length);
        let this = self.clone();
        self.runtime.spawn(
            async move {
                match this.service.start_game(&draft).await {
                    Ok(game) => this.deliver(move |state| state.adopt_game(game)),
                    Err(error) => this.fail(error),
                }
            }
            .in_current_span(),
        )
    }

    /// Fetches `game_id` and makes it the current game.
    #[instrument(skip(self, game_id), fields(game_id = %game_id.as_ref()))]
    pub fn get_game(&self, game_id: impl AsRef<str>) -> JoinHandle<()> {
        let game_id = game_id.as_ref().to_owned();
        let this = self.clone();
        self.runtime
            .spawn(async move { this.refresh(&game_id).await }.in_current_span())
    }

    /// Deletes `game_id`; clears the current game if it was that one.
    #[instrument(skip(self, game_id), fields(game_id = %game_id.as_ref()))]
    pub fn delete_game(&self, game_id: impl AsRef<str>) -> JoinHandle<()> {
        let game_id = game_id.as_ref().to_owned();
        let this = self.clone();
        self.runtime
            .spawn(async move { this.remove_game(game_id).await }.in_current_span())
    }

    /// Deletes the current game and clears it.
    #[instrument(skip(self))]
    pub fn delete_current_game(&self) -> JoinHandle<()> {
        let this = self.clone();
        self.runtime.spawn(
            async move {
                match this.current_game_id().await {
                    Some(game_id) => this.remove_game(game_id).await,
                    None => this.fail(ServiceError::resource_not_found("no current game")),
                }
            }
            .in_current_span(),
        )
    }

    /// Submits `text` as a guess against the current game.
    ///
    /// A solving guess triggers a refresh of the game from the service;
    /// otherwise the guess is appended to the cached game locally.
    #[instrument(skip(self, text))]
    pub fn submit_guess(&self, text: impl Into<String>) -> JoinHandle<()> {
        let guess = Guess::draft(text);
        let this = self.clone();
        self.runtime.spawn(
            async move {
                let Some(game) = this.context.query(|state| state.current_game().cloned()).await.flatten()
                else {
                    this.fail(ServiceError::resource_not_found("no current game"));
                    return;
                };
                let Some(game_id) = game.id().map(str::to_owned) else {
                    this.fail(ServiceError::invalid_payload("current game has no id"));
                    return;
                };

                let scored = match this.service.submit_guess(&game, &guess).await {
                    Ok(scored) => scored,
                    Err(error) => {
                        this.fail(error);
                        return;
                    }
                };

                if scored.is_solution() {
                    info!(game_id = %game_id, "Game solved; refreshing");
                    this.deliver(move |state| state.set_guess(scored));
                    this.refresh(&game_id).await;
                } else {
                    this.deliver(move |state| {
                        state.set_guess(scored.clone());
                        state.append_guess(&game_id, scored);
                    });
                }
            }
            .in_current_span(),
        )
    }

    /// Fetches `guess_id` of the current game and makes it the current guess.
    #[instrument(skip(self, guess_id), fields(guess_id = %guess_id.as_ref()))]
    pub fn get_guess(&self, guess_id: impl AsRef<str>) -> JoinHandle<()> {
        let guess_id = guess_id.as_ref().to_owned();
        let this = self.clone();
        self.runtime.spawn(
            async move {
                let Some(game_id) = this.current_game_id().await else {
                    this.fail(ServiceError::resource_not_found("no current game"));
                    return;
                };
                match this.service.get_guess(&game_id, &guess_id).await {
                    Ok(guess) => this.deliver(move |state| state.set_guess(guess)),
                    Err(error) => this.fail(error),
                }
            }
            .in_current_span(),
        )
    }

    /// Shuts down the underlying service client.
    #[instrument(skip(self))]
    pub fn shutdown(&self) {
        info!("Shutting down session");
        self.service.shutdown();
    }

    /// Waits until every update handed to the delivery context so far has
    /// been applied and dispatched.
    pub async fn settled(&self) {
        let _ = self.context.query(|_| ()).await;
    }

    /// Snapshot of the current game.
    pub async fn current_game(&self) -> Option<Game> {
        self.context
            .query(|state| state.current_game().cloned())
            .await
            .flatten()
    }

    /// Snapshot of the current guess.
    pub async fn current_guess(&self) -> Option<Guess> {
        self.context
            .query(|state| state.guess.current().cloned())
            .await
            .flatten()
    }

    /// Snapshot of the solved flag.
    pub async fn current_solved(&self) -> Option<bool> {
        self.context
            .query(|state| state.solved.current().copied().flatten())
            .await
            .flatten()
    }

    /// Snapshot of the latest error.
    pub async fn current_error(&self) -> Option<ServiceError> {
        self.context
            .query(|state| state.error.current().cloned())
            .await
            .flatten()
    }

    async fn current_game_id(&self) -> Option<String> {
        self.context
            .query(|state| state.current_game().and_then(Game::id).map(str::to_owned))
            .await
            .flatten()
    }

    async fn refresh(&self, game_id: &str) {
        match self.service.get_game(game_id).await {
            Ok(game) => self.deliver(move |state| state.adopt_game(game)),
            Err(error) => self.fail(error),
        }
    }

    async fn remove_game(&self, game_id: String) {
        match self.service.delete_game(&game_id).await {
            Ok(()) => self.deliver(move |state| state.discard_game(&game_id)),
            Err(error) => self.fail(error),
        }
    }

    fn deliver(&self, update: impl FnOnce(&mut SessionState) + Send + 'static) {
        self.context.post(update);
    }

    fn fail(&self, error: ServiceError) {
        warn!(kind = %error.kind(), error = %error, "Session operation failed");
        self.deliver(move |state| state.set_error(error));
    }
}
