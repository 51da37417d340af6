//! Error types for the catalog, search and profile-sync core.

use thiserror::Error;

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Failures a collaborator can report back into the core.
///
/// None of these are fatal: callers degrade to an empty or prior result
/// plus an optional inline notice.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CoreError {
    /// Network, non-2xx or parse error on any catalog call.
    #[error("catalog fetch failed: {0}")]
    FetchFailed(String),

    /// A profile-store subscription reported an error or ended.
    #[error("profile store subscription lost: {0}")]
    SyncDisconnected(String),

    /// A one-shot profile-store request (delete, read, merge-write) failed.
    #[error("profile store request failed: {0}")]
    Store(String),
}

impl CoreError {
    pub fn fetch(err: impl std::fmt::Display) -> Self {
        Self::FetchFailed(err.to_string())
    }

    pub fn store(err: impl std::fmt::Display) -> Self {
        Self::Store(err.to_string())
    }
}
