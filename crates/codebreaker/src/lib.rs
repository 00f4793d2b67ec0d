//! Codebreaker session client
//!
//! Asynchronous client for a turn-based code-guessing game served over REST.
//!
//! # Architecture
//!
//! - **Model**: [`Game`] and [`Guess`] records exchanged with the service
//! - **Errors**: [`ServiceError`] tagged with a closed [`ErrorKind`] taxonomy
//! - **Service**: [`CodebreakerService`] and its HTTP implementation, which
//!   validates requests locally and runs network calls on its own worker pool
//! - **Publisher**: [`SessionPublisher`] caching the current game, guess,
//!   solved flag and error, with replay-on-subscribe observers
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use codebreaker::{ClientConfig, HttpCodebreakerService, SessionPublisher};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = ClientConfig::new("http://localhost:8080/codebreaker");
//! let service = Arc::new(HttpCodebreakerService::new(&config)?);
//! let session = SessionPublisher::new(service);
//!
//! let _guesses = session.subscribe_guess(|guess| {
//!     println!("{} -> {:?} exact", guess.text(), guess.exact_matches());
//! });
//! session.start_game("ABCDE", 2).await?;
//! session.submit_guess("AB").await?;
//! session.settled().await;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod model;
mod publisher;
mod service;

// Crate-level exports - Configuration
pub use config::ClientConfig;

// Crate-level exports - Errors
pub use error::{ConfigError, ErrorKind, ServiceError};

// Crate-level exports - Domain model
pub use model::{Game, Guess};

// Crate-level exports - Service client
pub use service::{
    CodebreakerService, HttpCodebreakerService, MAX_CODE_LENGTH, MIN_CODE_LENGTH, validate_game,
    validate_guess,
};

// Crate-level exports - Session publisher
pub use publisher::{Observer, SessionPublisher, Subscription, SubscriptionId, ValueKind};
