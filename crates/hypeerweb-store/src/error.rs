//! Error types for hypeerweb-store.

use thiserror::Error;

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by a store.
#[derive(Debug, Error)]
pub enum Error {
    /// The transaction was rejected; nothing was written.
    #[error("commit failed: {0}")]
    CommitFailure(String),

    /// Stored rows do not form a consistent graph.
    #[error("corrupt store: {0}")]
    Corrupt(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("rocksdb error: {0}")]
    Rocks(String),
}

impl From<rocksdb::Error> for Error {
    fn from(e: rocksdb::Error) -> Self {
        Error::Rocks(e.to_string())
    }
}
