//! Error types for hypeerweb-transfer.

use std::time::Duration;

use thiserror::Error;

use crate::types::SegmentAddress;

/// Result type for transfer operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while talking to another segment.
///
/// None of these affect local topology state.
#[derive(Debug, Error)]
pub enum Error {
    /// The target did not answer or is not reachable.
    #[error("segment {target} unavailable: {reason}")]
    RemoteUnavailable { target: SegmentAddress, reason: String },

    #[error("no reply within {0:?}")]
    Timeout(Duration),

    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("frame of {0} bytes exceeds the datagram limit")]
    FrameTooLarge(usize),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
