//! Error types for the history store and clipboard access.

use thiserror::Error;

/// Failures of the key-value backend behind the history.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Backend(#[from] rusqlite::Error),

    #[error("stored value for '{key}' is malformed: {source}")]
    Malformed {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Failures talking to the system clipboard.
#[derive(Debug, Error)]
pub enum ClipboardError {
    /// No clipboard could be opened (no display server, permission denied).
    #[error("clipboard unavailable: {0}")]
    Unavailable(String),

    #[error("failed to read clipboard: {0}")]
    Read(String),

    #[error("failed to write clipboard: {0}")]
    Write(String),

    /// The platform has no such clipboard (e.g. primary selection outside X11/Wayland).
    #[error("clipboard operation not supported on this platform")]
    Unsupported,
}
