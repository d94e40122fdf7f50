//! Error types shared between host and display.
//!
//! `TickerError` covers the failure classes of the sync protocol: provider failures
//! (`Network`, `MalformedResponse`, `MissingField`), persisted state problems
//! (`PersistedDataCorrupt`), caller mistakes (`InvalidCommandParams`, `UnknownMethod`) and the
//! plumbing errors of sockets, JSON and channels.
use std::io;
use std::sync::PoisonError;

use thiserror::Error;

/// Unified error type shared by host and display.
#[derive(Error, Debug)]
pub enum TickerError {
    /// I/O error originating from sockets or files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Failure while encoding/decoding JSON via serde_json.
    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// The quote provider could not be reached or answered with a non-success status.
    #[error("Network failure: {0}")]
    Network(String),

    /// The provider answered, but the body is not the expected shape.
    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),

    /// A field required to build a quote is absent from the provider response.
    #[error("Missing field in provider response: {0}")]
    MissingField(&'static str),

    /// A persisted value could not be parsed; callers fall back to defaults.
    #[error("Persisted data under `{key}` is corrupt: {reason}")]
    PersistedDataCorrupt {
        /// Store key holding the bad value.
        key: String,
        /// Parser message.
        reason: String,
    },

    /// A command carried missing or invalid parameters.
    #[error("Invalid command params: {0}")]
    InvalidCommandParams(String),

    /// A request named a method the host does not know.
    #[error("Unknown method: {0}")]
    UnknownMethod(String),

    /// Crossbeam/channel send failed (e.g., receiver dropped); contains a short context string.
    #[error("Channel send failed: {0}")]
    ChannelSend(String),

    /// Error indicating a poisoned mutex/lock was encountered.
    #[error("Mutex Lock Poisoned: {0}")]
    MutexLock(String),
}

impl TickerError {
    /// Whether this error should be reported back to the caller as-is.
    ///
    /// Only parameter and method errors are meaningful to a display; anything else is
    /// reported as a generic internal failure.
    pub fn is_caller_visible(&self) -> bool {
        matches!(
            self,
            TickerError::InvalidCommandParams(_) | TickerError::UnknownMethod(_)
        )
    }
}

impl<T> From<PoisonError<T>> for TickerError {
    fn from(err: PoisonError<T>) -> Self {
        TickerError::MutexLock(err.to_string())
    }
}
