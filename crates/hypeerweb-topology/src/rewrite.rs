//! Staged relation rewrites.
//!
//! Insertion and removal never touch the arena directly. They stage
//! copy-on-write versions of every node they change in a [`Rewrite`], which
//! is frozen into a [`Changeset`]. The changeset can be inspected (to build a
//! durable transaction) before [`crate::HyPeerWeb::apply`] makes it visible,
//! so a failed commit leaves no partial relation graph behind.

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::{Node, WebId};

/// What a changeset does once applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Outcome {
    /// A node with this identifier was created.
    Inserted(WebId),
    /// A node was removed.
    ///
    /// When `relabeled` is set, the node formerly known as `from` now lives
    /// under `to` (the removed identifier, or 0 after a two-node collapse).
    Removed {
        removed: WebId,
        relabeled: Option<Relabel>,
    },
}

/// A surviving node taking over another identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Relabel {
    pub from: WebId,
    pub to: WebId,
}

/// A frozen set of node replacements.
///
/// `Some(node)` replaces (or creates) the node under that identifier,
/// `None` deletes it.
#[derive(Debug, Clone)]
pub struct Changeset {
    staged: BTreeMap<WebId, Option<Node>>,
    outcome: Outcome,
}

impl Changeset {
    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    /// Every touched identifier with its state after the change.
    pub fn touched(&self) -> impl Iterator<Item = (WebId, Option<&Node>)> {
        self.staged.iter().map(|(id, node)| (*id, node.as_ref()))
    }

    /// Number of touched nodes.
    pub fn len(&self) -> usize {
        self.staged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    pub(crate) fn into_parts(self) -> (BTreeMap<WebId, Option<Node>>, Outcome) {
        (self.staged, self.outcome)
    }
}

/// Copy-on-write staging area over the arena.
pub(crate) struct Rewrite<'a> {
    base: &'a BTreeMap<WebId, Node>,
    staged: BTreeMap<WebId, Option<Node>>,
}

impl<'a> Rewrite<'a> {
    pub(crate) fn new(base: &'a BTreeMap<WebId, Node>) -> Self {
        Self {
            base,
            staged: BTreeMap::new(),
        }
    }

    /// Current view of a node, staged version first.
    pub(crate) fn node(&self, id: WebId) -> Result<&Node> {
        match self.staged.get(&id) {
            Some(Some(node)) => Ok(node),
            Some(None) => Err(Error::UnknownNode(id)),
            None => self.base.get(&id).ok_or(Error::UnknownNode(id)),
        }
    }

    pub(crate) fn node_mut(&mut self, id: WebId) -> Result<&mut Node> {
        if !self.staged.contains_key(&id) {
            let node = self.base.get(&id).cloned().ok_or(Error::UnknownNode(id))?;
            self.staged.insert(id, Some(node));
        }
        self.staged
            .get_mut(&id)
            .and_then(Option::as_mut)
            .ok_or(Error::UnknownNode(id))
    }

    pub(crate) fn contains(&self, id: WebId) -> bool {
        self.node(id).is_ok()
    }

    pub(crate) fn create(&mut self, node: Node) {
        self.staged.insert(node.id(), Some(node));
    }

    /// Delete a node, returning its last state.
    pub(crate) fn delete(&mut self, id: WebId) -> Result<Node> {
        let node = self.node(id)?.clone();
        self.staged.insert(id, None);
        Ok(node)
    }

    pub(crate) fn link_neighbors(&mut self, a: WebId, b: WebId) -> Result<()> {
        self.node_mut(a)?.links_mut().neighbors.insert(b);
        self.node_mut(b)?.links_mut().neighbors.insert(a);
        Ok(())
    }

    pub(crate) fn unlink_neighbors(&mut self, a: WebId, b: WebId) -> Result<()> {
        self.node_mut(a)?.links_mut().neighbors.remove(&b);
        self.node_mut(b)?.links_mut().neighbors.remove(&a);
        Ok(())
    }

    /// `holder` gains `target` as surrogate neighbor, `target` gains the inverse.
    pub(crate) fn link_surrogate_neighbor(&mut self, holder: WebId, target: WebId) -> Result<()> {
        self.node_mut(holder)?
            .links_mut()
            .surrogate_neighbors
            .insert(target);
        self.node_mut(target)?
            .links_mut()
            .inverse_surrogate_neighbors
            .insert(holder);
        Ok(())
    }

    pub(crate) fn unlink_surrogate_neighbor(&mut self, holder: WebId, target: WebId) -> Result<()> {
        self.node_mut(holder)?
            .links_mut()
            .surrogate_neighbors
            .remove(&target);
        self.node_mut(target)?
            .links_mut()
            .inverse_surrogate_neighbors
            .remove(&holder);
        Ok(())
    }

    pub(crate) fn link_folds(&mut self, a: WebId, b: WebId) -> Result<()> {
        self.node_mut(a)?.links_mut().fold = Some(b);
        self.node_mut(b)?.links_mut().fold = Some(a);
        Ok(())
    }

    /// `holder` gains `target` as surrogate fold, `target` gains the inverse.
    pub(crate) fn link_surrogate_fold(&mut self, holder: WebId, target: WebId) -> Result<()> {
        self.node_mut(holder)?.links_mut().surrogate_fold = Some(target);
        self.node_mut(target)?.links_mut().inverse_surrogate_fold = Some(holder);
        Ok(())
    }

    pub(crate) fn unlink_surrogate_fold(&mut self, holder: WebId, target: WebId) -> Result<()> {
        self.node_mut(holder)?.links_mut().surrogate_fold = None;
        self.node_mut(target)?.links_mut().inverse_surrogate_fold = None;
        Ok(())
    }

    pub(crate) fn finish(self, outcome: Outcome) -> Changeset {
        Changeset {
            staged: self.staged,
            outcome,
        }
    }
}
