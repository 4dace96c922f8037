//! HyPeerWeb Segment
//!
//! A segment is the context object that ties one web to its collaborators:
//! - a [`Store`](hypeerweb_store::Store) every mutation is committed to
//!   before it becomes visible
//! - a [`Transport`](hypeerweb_transfer::Transport) other segments reach it
//!   through
//! - an event channel presentation layers can follow
//!
//! Segments are built explicitly and passed around; nothing is global.

mod config;
mod error;
mod events;
mod node_ref;
mod segment;
mod server;

pub use config::SegmentConfig;
pub use error::{Error, Result};
pub use events::{Events, TopologyEvent, EVENT_CAPACITY};
pub use node_ref::NodeRef;
pub use segment::{Health, Role, Segment};
