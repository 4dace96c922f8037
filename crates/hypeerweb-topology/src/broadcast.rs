//! Spanning broadcast.
//!
//! The spanning tree is implied by the identifiers themselves. A node with
//! identifier `id` and height `h` is responsible for the bits below its
//! lowest set bit (all `h` bits for the origin). For each such bit it hands
//! the broadcast to `id | bit` when that node is a neighbor, and to
//! `id | 2^h | bit` when that node is an inverse surrogate neighbor. Every
//! node has exactly one tree parent, so each is visited once without any
//! shared visited-set.
//!
//! The tree is rooted at the origin; a broadcast started anywhere else is
//! first routed there.

use tracing::debug;

use crate::error::{Error, Result};
use crate::{HyPeerWeb, Node, SendVisitor, WebId};

/// Action performed at every node a broadcast reaches.
pub trait Visitor {
    fn visit(&mut self, node: &Node);
}

impl<F> Visitor for F
where
    F: FnMut(&Node),
{
    fn visit(&mut self, node: &Node) {
        (self)(node)
    }
}

/// Visits every node of the web exactly once.
#[derive(Debug, Clone, Copy, Default)]
pub struct BroadcastVisitor;

impl BroadcastVisitor {
    pub fn new() -> Self {
        Self
    }

    /// Broadcast from `start`, returning the number of nodes visited.
    pub fn broadcast<V: Visitor>(&self, web: &HyPeerWeb, start: WebId, visitor: &mut V) -> Result<usize> {
        let route = SendVisitor::new(WebId::ZERO).visit(web, start)?;
        let root = route
            .found
            .ok_or_else(|| Error::structural(format!("broadcast from {start} cannot reach the origin")))?;

        let mut visited = 0;
        let mut pending = vec![web.node(root)?];
        while let Some(node) = pending.pop() {
            visitor.visit(node);
            visited += 1;
            for child in tree_children(node) {
                pending.push(web.node(child)?);
            }
        }

        debug!(%start, visited, "broadcast complete");
        Ok(visited)
    }
}

/// Tree children of a node, in ascending bit order.
pub fn tree_children(node: &Node) -> Vec<WebId> {
    let id = node.id();
    let height = node.height();
    let links = node.links();
    let child_bit = 1u64 << height;

    let mut children = Vec::new();
    for bit in (0..id.trailing_zeros(height)).map(|i| 1u64 << i) {
        let direct = WebId(id.value() | bit);
        if links.neighbors.contains(&direct) {
            children.push(direct);
        }
        let surrogate = WebId(id.value() | child_bit | bit);
        if links.inverse_surrogate_neighbors.contains(&surrogate) {
            children.push(surrogate);
        }
    }
    children
}
