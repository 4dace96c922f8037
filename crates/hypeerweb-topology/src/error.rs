//! Error types for hypeerweb-topology.

use thiserror::Error;

use crate::WebId;

/// Result type for topology operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by topology mutations.
///
/// A routing miss is not an error; see [`crate::RouteOutcome`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// No valid insertion or disconnection point could be located.
    #[error("structural failure: {0}")]
    StructuralFailure(String),

    /// The requested node is not part of the web.
    #[error("unknown node {0}")]
    UnknownNode(WebId),

    /// The operation needs at least one node.
    #[error("the web is empty")]
    EmptyWeb,
}

impl Error {
    pub(crate) fn structural(reason: impl Into<String>) -> Self {
        Error::StructuralFailure(reason.into())
    }
}
