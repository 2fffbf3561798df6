//! Error taxonomy
//!
//! Storage and completion failures are typed so the request handlers can
//! decide what the end user sees and what only goes to the log.

use std::path::PathBuf;
use thiserror::Error;

/// Failures of the per-user record store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid user identifier: {0:?}")]
    InvalidUser(String),

    #[error("storage directory does not exist: {0:?}")]
    RootMissing(PathBuf),

    #[error("storage I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A persisted record exists but cannot be decoded
    #[error("stored record for '{user}' is corrupt: {source}")]
    Decode {
        user: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode record for '{user}': {source}")]
    Encode {
        user: String,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Failures of a completion request
#[derive(Debug, Error)]
pub enum CompletionError {
    /// The provider answered with a structured error payload
    #[error("provider error: {0}")]
    Provider(String),

    /// Network failure, timeout or an unreadable response
    #[error("transport error: {0}")]
    Transport(String),
}
