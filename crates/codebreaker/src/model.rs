//! Wire-level records exchanged with the Codebreaker service.

use chrono::{DateTime, FixedOffset};
use derive_getters::Getters;
use derive_setters::Setters;
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// A code-guessing game.
///
/// A draft built with [`Game::draft`] carries only the pool and length; the
/// service assigns the id, creation timestamp and solved state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, Setters)]
#[serde(rename_all = "camelCase")]
#[setters(prefix = "with_")]
pub struct Game {
    /// Service-assigned identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[getter(skip)]
    #[setters(strip_option, into)]
    id: Option<String>,

    /// Allowed alphabet, in order.
    #[setters(into)]
    pool: String,

    /// Number of positions in the hidden code.
    length: usize,

    /// Solved state; `None` while unknown.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[getter(skip)]
    #[setters(strip_option)]
    solved: Option<bool>,

    /// Guesses in submission order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    guesses: Vec<Guess>,

    /// Creation timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[getter(skip)]
    #[setters(strip_option)]
    created: Option<DateTime<FixedOffset>>,
}

impl Game {
    /// Creates a draft game to be started by the service.
    #[instrument(skip(pool))]
    pub fn draft(pool: impl Into<String>, length: usize) -> Self {
        Self {
            id: None,
            pool: pool.into(),
            length,
            solved: None,
            guesses: Vec::new(),
            created: None,
        }
    }

    /// Service-assigned identifier, absent on drafts.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Solved state, `None` while unknown.
    pub fn solved(&self) -> Option<bool> {
        self.solved
    }

    /// Creation timestamp, absent on drafts.
    pub fn created(&self) -> Option<&DateTime<FixedOffset>> {
        self.created.as_ref()
    }

    /// Iterates over the code points of the pool.
    pub fn pool_code_points(&self) -> impl Iterator<Item = char> + '_ {
        self.pool.chars()
    }

    /// Appends a scored guess to the local history.
    pub(crate) fn push_guess(&mut self, guess: Guess) {
        self.guesses.push(guess);
    }
}

/// A single guess against a game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, Setters)]
#[serde(rename_all = "camelCase")]
#[setters(prefix = "with_")]
pub struct Guess {
    /// Service-assigned identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[getter(skip)]
    #[setters(strip_option, into)]
    id: Option<String>,

    /// Guessed code.
    #[setters(into)]
    text: String,

    /// Positions matching the hidden code exactly.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[getter(skip)]
    #[setters(strip_option)]
    exact_matches: Option<u32>,

    /// Code points present in the hidden code at another position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[getter(skip)]
    #[setters(strip_option)]
    near_matches: Option<u32>,

    /// Whether this guess solved the game.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    #[getter(skip)]
    solution: bool,

    /// Scoring timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[getter(skip)]
    #[setters(strip_option)]
    created: Option<DateTime<FixedOffset>>,
}

impl Guess {
    /// Creates a draft guess to be scored by the service.
    #[instrument(skip(text))]
    pub fn draft(text: impl Into<String>) -> Self {
        Self {
            id: None,
            text: text.into(),
            exact_matches: None,
            near_matches: None,
            solution: false,
            created: None,
        }
    }

    /// Service-assigned identifier, absent on drafts.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Exact-match count, absent until scored.
    pub fn exact_matches(&self) -> Option<u32> {
        self.exact_matches
    }

    /// Near-match count, absent until scored.
    pub fn near_matches(&self) -> Option<u32> {
        self.near_matches
    }

    /// True once the guess matched every position.
    pub fn is_solution(&self) -> bool {
        self.solution
    }

    /// Creation timestamp, absent on drafts.
    pub fn created(&self) -> Option<&DateTime<FixedOffset>> {
        self.created.as_ref()
    }

    /// Number of code points in the guess text.
    pub fn code_length(&self) -> usize {
        self.text.chars().count()
    }
}
