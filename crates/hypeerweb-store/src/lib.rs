//! HyPeerWeb Store
//!
//! Durable rows for a web: one row per node (height and the three fold
//! slots), symmetric neighbor pairs and asymmetric surrogate-neighbor pairs.
//! Inverse surrogate neighbors are never stored; they are derived by reverse
//! lookup when the graph is loaded.
//!
//! Every mutation reaches a store as one [`Transaction`] built from a
//! topology changeset, and a store applies it all-or-nothing.

mod error;
mod memory;
mod rocks;
mod schema;
mod transaction;

pub use error::{Error, Result};
pub use memory::MemoryStore;
pub use rocks::RocksStore;
pub use schema::{assemble, NodeRow};
pub use transaction::{Mutation, Transaction};

use hypeerweb_topology::Node;

/// Persistence collaborator of a segment.
pub trait Store: Send + Sync {
    /// Apply every mutation of `transaction`, or none of them.
    fn commit(&self, transaction: Transaction) -> Result<()>;

    /// Load every node with all six relations reconstructed.
    fn load(&self) -> Result<Vec<Node>>;
}
