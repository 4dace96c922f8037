//! HyPeerWeb Topology
//!
//! A self-organizing overlay in which every node is addressed by an integer
//! whose binary form is its corner in an evolving hypercube.
//!
//! # Structure
//!
//! With `n` nodes the identifiers are exactly `0..n`. Writing
//! `n = 2^m + k` (`0 < k <= 2^m`), the nodes `k..2^m` have height `m` and
//! every other node has height `m + 1`. Each node holds six relations:
//! - fold, surrogate fold and inverse surrogate fold (complement partners)
//! - neighbors, surrogate neighbors and inverse surrogate neighbors
//!   (one-bit partners and their stand-ins)
//!
//! # Mutations
//!
//! Insertion grows the parent of identifier `n`; removal detaches the cap
//! `n - 1` and relabels it into the departing slot. Both are planned as a
//! [`Changeset`] first and applied in one step, so no intermediate state is
//! ever observable.
//!
//! # Traversal
//!
//! [`SendVisitor`] routes greedily by bit similarity and
//! [`BroadcastVisitor`] walks the spanning tree implied by the identifiers.
//! [`Validator`] is the executable definition of a valid web.

mod broadcast;
mod criteria;
mod error;
mod fold;
mod insert;
mod node;
mod remove;
mod rewrite;
mod send;
mod validator;
mod web;
mod web_id;

pub use broadcast::{tree_children, BroadcastVisitor, Visitor};
pub use criteria::{find_cap, find_insertion_point, Criteria, SearchConfig, DEFAULT_FALLBACK_DEPTH};
pub use error::{Error, Result};
pub use fold::FoldState;
pub use node::{Attributes, Links, Node, NodeSnapshot};
pub use rewrite::{Changeset, Outcome, Relabel};
pub use send::{RouteOutcome, SendVisitor};
pub use validator::{RelationKind, ValidationReport, Validator, Violation};
pub use web::{HyPeerWeb, Population};
pub use web_id::{mask, WebId};
