//! Structural invariant checker.
//!
//! Works on a plain listing rather than the arena so listings produced by
//! other segments, or loaded from a store, can be checked the same way.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;
use tracing::warn;

use crate::{NodeSnapshot, WebId};

/// Relation list named in a violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    Fold,
    SurrogateFold,
    InverseSurrogateFold,
    Neighbor,
    SurrogateNeighbor,
    InverseSurrogateNeighbor,
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RelationKind::Fold => "fold",
            RelationKind::SurrogateFold => "surrogate fold",
            RelationKind::InverseSurrogateFold => "inverse surrogate fold",
            RelationKind::Neighbor => "neighbor",
            RelationKind::SurrogateNeighbor => "surrogate neighbor",
            RelationKind::InverseSurrogateNeighbor => "inverse surrogate neighbor",
        };
        f.write_str(name)
    }
}

/// One broken invariant, naming the offending node.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("listing position {expected} holds node {found}; identifiers must run 0..n in order")]
    NonContiguous { expected: WebId, found: WebId },

    #[error("lone node {id} must be identifier 0 with height 0 and no relations")]
    LoneNode { id: WebId },

    #[error("node {id}: height {height} but {count} neighbors and surrogate neighbors")]
    HeightCount { id: WebId, height: u32, count: usize },

    #[error("node {id}: identifier does not fit in height {height}")]
    HeightTooSmall { id: WebId, height: u32 },

    #[error("node {id}: lowest neighbor should be parent {expected}, found {found:?}")]
    Parent {
        id: WebId,
        expected: WebId,
        found: Option<WebId>,
    },

    #[error("node {id}: {kind} list is unsorted or holds duplicates")]
    Unordered { id: WebId, kind: RelationKind },

    #[error("node {id}: {kind} {other} is not in the web")]
    Dangling {
        id: WebId,
        kind: RelationKind,
        other: WebId,
    },

    #[error("node {id}: {kind} {other} {reason}")]
    Relation {
        id: WebId,
        kind: RelationKind,
        other: WebId,
        reason: &'static str,
    },

    #[error("node {id}: holds surrogate and inverse surrogate neighbors at once")]
    MixedSurrogates { id: WebId },

    #[error("node {id}: {reason}")]
    FoldPresence { id: WebId, reason: &'static str },
}

/// Outcome of a full check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Checks a node listing against every structural invariant.
pub struct Validator;

impl Validator {
    /// `true` when the listing is a valid web. Each violation is logged.
    pub fn validate(nodes: &[NodeSnapshot]) -> bool {
        let report = Self::check(nodes);
        for violation in &report.violations {
            warn!(%violation, "topology violation");
        }
        report.is_valid()
    }

    /// Collect every violation in the listing.
    pub fn check(nodes: &[NodeSnapshot]) -> ValidationReport {
        let mut check = Check {
            index: nodes.iter().map(|node| (node.id, node)).collect(),
            violations: Vec::new(),
        };

        check.contiguity(nodes);
        if let [lone] = nodes {
            check.lone(lone);
        } else {
            for node in nodes {
                check.node(node);
            }
        }

        ValidationReport {
            violations: check.violations,
        }
    }
}

struct Check<'a> {
    index: BTreeMap<WebId, &'a NodeSnapshot>,
    violations: Vec<Violation>,
}

impl<'a> Check<'a> {
    fn report(&mut self, violation: Violation) {
        self.violations.push(violation);
    }

    fn contiguity(&mut self, nodes: &[NodeSnapshot]) {
        let stray = nodes
            .iter()
            .enumerate()
            .find(|(position, node)| node.id != WebId(*position as u64));
        if let Some((position, node)) = stray {
            self.report(Violation::NonContiguous {
                expected: WebId(position as u64),
                found: node.id,
            });
        }
    }

    fn lone(&mut self, node: &NodeSnapshot) {
        let bare = node.fold.is_none()
            && node.surrogate_fold.is_none()
            && node.inverse_surrogate_fold.is_none()
            && node.neighbors.is_empty()
            && node.surrogate_neighbors.is_empty()
            && node.inverse_surrogate_neighbors.is_empty();
        if node.id != WebId::ZERO || node.height != 0 || !bare {
            self.report(Violation::LoneNode { id: node.id });
        }
    }

    fn node(&mut self, node: &'a NodeSnapshot) {
        let id = node.id;

        for (kind, list) in [
            (RelationKind::Neighbor, &node.neighbors),
            (RelationKind::SurrogateNeighbor, &node.surrogate_neighbors),
            (RelationKind::InverseSurrogateNeighbor, &node.inverse_surrogate_neighbors),
        ] {
            if !list.windows(2).all(|pair| pair[0] < pair[1]) {
                self.report(Violation::Unordered { id, kind });
            }
        }

        let count = node.neighbors.len() + node.surrogate_neighbors.len();
        if count != node.height as usize {
            self.report(Violation::HeightCount {
                id,
                height: node.height,
                count,
            });
        }
        if id.bit_length() > node.height {
            self.report(Violation::HeightTooSmall {
                id,
                height: node.height,
            });
        }
        if let Some(expected) = id.parent() {
            let found = node.neighbors.iter().min().copied();
            if found != Some(expected) {
                self.report(Violation::Parent { id, expected, found });
            }
        }
        if !node.surrogate_neighbors.is_empty() && !node.inverse_surrogate_neighbors.is_empty() {
            self.report(Violation::MixedSurrogates { id });
        }

        self.neighbors(node);
        self.surrogate_neighbors(node);
        self.inverse_surrogate_neighbors(node);
        self.folds(node);
    }

    /// Resolve a relation target, reporting it when missing.
    fn target(&mut self, id: WebId, kind: RelationKind, other: WebId) -> Option<&'a NodeSnapshot> {
        let found = self.index.get(&other).copied();
        if found.is_none() {
            self.report(Violation::Dangling { id, kind, other });
        }
        found
    }

    fn relation(&mut self, id: WebId, kind: RelationKind, other: WebId, reason: &'static str) {
        self.report(Violation::Relation {
            id,
            kind,
            other,
            reason,
        });
    }

    fn neighbors(&mut self, node: &NodeSnapshot) {
        let kind = RelationKind::Neighbor;
        for &other in &node.neighbors {
            let Some(peer) = self.target(node.id, kind, other) else {
                continue;
            };
            if node.id.hamming(other) != 1 {
                self.relation(node.id, kind, other, "is not one bit away");
            }
            if node.height.abs_diff(peer.height) > 1 {
                self.relation(node.id, kind, other, "differs in height by more than one");
            }
            if !peer.neighbors.contains(&node.id) {
                self.relation(node.id, kind, other, "does not list this node back");
            }
        }
    }

    fn surrogate_neighbors(&mut self, node: &NodeSnapshot) {
        let kind = RelationKind::SurrogateNeighbor;
        let highest = node.id.highest_bit().unwrap_or(0);
        for &other in &node.surrogate_neighbors {
            let Some(peer) = self.target(node.id, kind, other) else {
                continue;
            };
            if node.id.hamming(other) != 2 || (node.id.value() ^ other.value()) & highest == 0 {
                self.relation(node.id, kind, other, "is not two bits away across the highest bit");
            }
            if peer.height + 1 != node.height {
                self.relation(node.id, kind, other, "is not exactly one height lower");
            }
            if !peer.inverse_surrogate_neighbors.contains(&node.id) {
                self.relation(node.id, kind, other, "does not hold the inverse relation");
            }
        }
    }

    fn inverse_surrogate_neighbors(&mut self, node: &NodeSnapshot) {
        let kind = RelationKind::InverseSurrogateNeighbor;
        for &other in &node.inverse_surrogate_neighbors {
            let Some(peer) = self.target(node.id, kind, other) else {
                continue;
            };
            if peer.height != node.height + 1 {
                self.relation(node.id, kind, other, "is not exactly one height higher");
            }
            if !peer.surrogate_neighbors.contains(&node.id) {
                self.relation(node.id, kind, other, "does not hold this node as surrogate neighbor");
            }
        }
    }

    fn folds(&mut self, node: &NodeSnapshot) {
        let id = node.id;
        match (node.fold, node.surrogate_fold) {
            (Some(_), Some(_)) => self.report(Violation::FoldPresence {
                id,
                reason: "holds both a fold and a surrogate fold",
            }),
            (None, None) => self.report(Violation::FoldPresence {
                id,
                reason: "holds neither a fold nor a surrogate fold",
            }),
            _ => {}
        }

        let mut fold_height = None;
        if let Some(other) = node.fold {
            let kind = RelationKind::Fold;
            if let Some(peer) = self.target(id, kind, other) {
                fold_height = Some(peer.height);
                let window = node.height.max(peer.height);
                if other != id.complement(window) {
                    self.relation(id, kind, other, "is not the bit complement");
                }
                if node.height.abs_diff(peer.height) > 1 {
                    self.relation(id, kind, other, "differs in height by more than one");
                }
                if peer.fold != Some(id) {
                    self.relation(id, kind, other, "is not reciprocal");
                }
            }
        }

        if let Some(other) = node.surrogate_fold {
            let kind = RelationKind::SurrogateFold;
            if let Some(peer) = self.target(id, kind, other) {
                let complement = id.complement(node.height);
                if self.index.contains_key(&complement) {
                    self.relation(id, kind, other, "stands in for a complement that exists");
                }
                if complement.parent() != Some(other) {
                    self.relation(id, kind, other, "is not the parent of the missing complement");
                }
                if peer.inverse_surrogate_fold != Some(id) {
                    self.relation(id, kind, other, "does not hold the inverse relation");
                }
            }
        }

        let expects_inverse = fold_height == Some(node.height + 1);
        match node.inverse_surrogate_fold {
            Some(other) => {
                let kind = RelationKind::InverseSurrogateFold;
                if let Some(peer) = self.target(id, kind, other) {
                    if peer.surrogate_fold != Some(id) {
                        self.relation(id, kind, other, "does not hold this node as surrogate fold");
                    }
                }
                if !expects_inverse {
                    self.relation(id, kind, other, "present although the fold is not one height higher");
                }
            }
            None if expects_inverse => self.report(Violation::FoldPresence {
                id,
                reason: "fold is one height higher but no inverse surrogate fold is held",
            }),
            None => {}
        }
    }
}
