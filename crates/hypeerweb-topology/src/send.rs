//! Point-to-point routing.
//!
//! A greedy hill-climb over bit similarity: every hop moves to the related
//! node (any of the six relation kinds) that agrees with the target on the
//! most bits, and the walk stops as soon as no relation improves on the
//! current node. Similarity is bounded and strictly increases on every hop,
//! so the walk always terminates. Ties go to the lowest identifier.

use tracing::trace;

use crate::error::{Error, Result};
use crate::{HyPeerWeb, Node, WebId};

/// Result of a routing walk.
///
/// A miss (`found == None`) is an ordinary answer: the identifier is not
/// part of the web.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RouteOutcome {
    /// The node carrying the target identifier, if it exists.
    pub found: Option<WebId>,
    /// Where the walk stopped; equals `found` on a hit.
    pub terminal: WebId,
    /// Every node visited, start and terminal included.
    pub path: Vec<WebId>,
}

impl RouteOutcome {
    pub fn is_hit(&self) -> bool {
        self.found.is_some()
    }

    /// Number of hops taken.
    pub fn hops(&self) -> usize {
        self.path.len().saturating_sub(1)
    }
}

/// Routes toward one target identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendVisitor {
    target: WebId,
}

impl SendVisitor {
    pub fn new(target: WebId) -> Self {
        Self { target }
    }

    pub fn target(&self) -> WebId {
        self.target
    }

    /// Walk from `start` toward the target.
    pub fn visit(&self, web: &HyPeerWeb, start: WebId) -> Result<RouteOutcome> {
        let mut current = web.node(start)?;
        let mut path = vec![start];

        loop {
            if current.id() == self.target {
                return Ok(RouteOutcome {
                    found: Some(current.id()),
                    terminal: current.id(),
                    path,
                });
            }

            match self.next_hop(web, current)? {
                Some(next) => {
                    trace!(from = %current.id(), to = %next.id(), target = %self.target, "route hop");
                    path.push(next.id());
                    current = next;
                }
                None => {
                    trace!(terminal = %current.id(), target = %self.target, "route miss");
                    return Ok(RouteOutcome {
                        found: None,
                        terminal: current.id(),
                        path,
                    });
                }
            }
        }
    }

    /// The related node that strictly improves similarity the most.
    fn next_hop<'w>(&self, web: &'w HyPeerWeb, current: &Node) -> Result<Option<&'w Node>> {
        let related = current
            .links()
            .all()
            .into_iter()
            .map(|id| web.node(id))
            .collect::<Result<Vec<_>>>()
            .map_err(|err| match err {
                Error::UnknownNode(id) => Error::structural(format!(
                    "node {} references missing node {id}",
                    current.id()
                )),
                other => other,
            })?;

        // Every identifier is below 2^height, so this window covers every
        // set bit of the current node, its relations and the target.
        let window = related
            .iter()
            .map(|node| node.height())
            .max()
            .unwrap_or(0)
            .max(current.height())
            .max(self.target.bit_length());

        let mut best_score = current.id().matching_bits(self.target, window);
        let mut best = None;
        for node in related {
            let score = node.id().matching_bits(self.target, window);
            if score > best_score {
                best_score = score;
                best = Some(node);
            }
        }
        Ok(best)
    }
}
