//! Error types for hypeerweb-segment.

use thiserror::Error;

/// Result type for segment operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by a segment.
#[derive(Debug, Error)]
pub enum Error {
    /// No valid insertion or disconnection point, or an unknown node.
    #[error("topology: {0}")]
    Structural(#[from] hypeerweb_topology::Error),

    /// The store rejected the change; the web is unchanged.
    #[error("store: {0}")]
    Commit(#[from] hypeerweb_store::Error),

    /// A call to another segment did not complete.
    #[error("remote: {0}")]
    RemoteUnavailable(#[from] hypeerweb_transfer::Error),

    /// The other segment ran the call and reported a failure.
    #[error("remote segment failed: {0}")]
    Remote(String),

    /// A received call is missing or mistypes an argument.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The operation only runs where the web is held.
    #[error("this segment does not hold the web")]
    NotCoordinator,
}
