//! Error taxonomy for Codebreaker service operations.

use std::error::Error as StdError;
use std::sync::Arc;

use derive_more::Display;
use tracing::instrument;

/// Closed set of failure kinds surfaced by the service client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ErrorKind {
    /// Bad request, rejected locally or by the service.
    #[display("invalid payload")]
    InvalidPayload,
    /// Referenced game or guess does not exist.
    #[display("resource not found")]
    ResourceNotFound,
    /// Guess submitted against a game that is already solved.
    #[display("game already solved")]
    GameSolved,
    /// Server fault, unrecognized status or transport failure.
    #[display("unknown service failure")]
    UnknownService,
}

impl ErrorKind {
    /// Maps a non-success outcome to its kind.
    ///
    /// `Some(status)` is the HTTP status of a response that was not a
    /// success; `None` means no response was received at all.
    pub fn classify(status: Option<u16>) -> Self {
        match status {
            Some(400) => Self::InvalidPayload,
            Some(404) => Self::ResourceNotFound,
            Some(409) => Self::GameSolved,
            Some(_) | None => Self::UnknownService,
        }
    }
}

/// Failure of a Codebreaker service operation.
#[derive(Debug, Clone, Display)]
#[display("{}: {} at {}:{}", kind, message, file, line)]
pub struct ServiceError {
    kind: ErrorKind,
    message: String,
    status: Option<u16>,
    cause: Option<Arc<dyn StdError + Send + Sync>>,
    line: u32,
    file: &'static str,
}

impl ServiceError {
    /// Creates an error of the given kind with caller location tracking.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            kind,
            message: message.into(),
            status: None,
            cause: None,
            line: loc.line(),
            file: loc.file(),
        }
    }

    /// Request rejected before reaching the network.
    #[track_caller]
    pub fn invalid_payload(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidPayload, message)
    }

    /// Referenced resource is unknown.
    #[track_caller]
    pub fn resource_not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ResourceNotFound, message)
    }

    /// Failure outside the other kinds.
    #[track_caller]
    pub fn unknown_service(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnknownService, message)
    }

    /// Non-success HTTP response.
    #[track_caller]
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        let message = if body.is_empty() {
            format!("HTTP {status}")
        } else {
            format!("HTTP {status}: {body}")
        };
        let mut error = Self::new(ErrorKind::classify(Some(status)), message);
        error.status = Some(status);
        error
    }

    /// No usable response: connection, DNS, timeout or decode failure.
    #[track_caller]
    pub fn transport(message: impl Into<String>, cause: impl StdError + Send + Sync + 'static) -> Self {
        let mut error = Self::new(ErrorKind::classify(None), message);
        error.cause = Some(Arc::new(cause));
        error
    }

    /// Operation attempted after the client was shut down.
    #[track_caller]
    pub fn shut_down() -> Self {
        Self::unknown_service("service has been shut down")
    }

    /// Failure kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Human-readable detail.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// HTTP status, when the service answered.
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// Source line where the error was raised.
    pub fn line(&self) -> u32 {
        self.line
    }

    /// Source file where the error was raised.
    pub fn file(&self) -> &'static str {
        self.file
    }
}

impl StdError for ServiceError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn StdError + 'static))
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, derive_more::Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}
