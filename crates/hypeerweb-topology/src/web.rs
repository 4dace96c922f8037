//! The web: an arena of nodes keyed by identifier.

use std::collections::BTreeMap;

use rand::Rng;
use tracing::{debug, info};

use crate::criteria::SearchConfig;
use crate::error::{Error, Result};
use crate::rewrite::{Changeset, Outcome};
use crate::{insert, remove};
use crate::{
    Attributes, BroadcastVisitor, Node, NodeSnapshot, RouteOutcome, SendVisitor, Validator, Visitor, WebId,
};

/// Population classes; each has its own insert and remove transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Population {
    Empty,
    Single,
    Pair,
    Many,
}

impl Population {
    pub fn of(len: usize) -> Self {
        match len {
            0 => Population::Empty,
            1 => Population::Single,
            2 => Population::Pair,
            _ => Population::Many,
        }
    }
}

/// A complete HyPeerWeb held in one arena.
#[derive(Debug, Clone, Default)]
pub struct HyPeerWeb {
    nodes: BTreeMap<WebId, Node>,
    search: SearchConfig,
}

impl HyPeerWeb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(search: SearchConfig) -> Self {
        Self {
            nodes: BTreeMap::new(),
            search,
        }
    }

    /// Rebuild a web from loaded records.
    ///
    /// Inverse surrogate neighbors and inverse surrogate folds are derived
    /// from the forward relations, so stores only need to keep those.
    pub fn from_nodes(nodes: impl IntoIterator<Item = Node>, search: SearchConfig) -> Self {
        let mut arena: BTreeMap<WebId, Node> = nodes.into_iter().map(|node| (node.id(), node)).collect();

        let mut inverse_neighbors = Vec::new();
        let mut inverse_folds = Vec::new();
        for (id, node) in arena.iter_mut() {
            let links = node.links_mut();
            links.inverse_surrogate_neighbors.clear();
            links.inverse_surrogate_fold = None;
            inverse_neighbors.extend(links.surrogate_neighbors.iter().map(|target| (*target, *id)));
            inverse_folds.extend(links.surrogate_fold.map(|target| (target, *id)));
        }
        for (target, holder) in inverse_neighbors {
            if let Some(node) = arena.get_mut(&target) {
                node.links_mut().inverse_surrogate_neighbors.insert(holder);
            }
        }
        for (target, holder) in inverse_folds {
            if let Some(node) = arena.get_mut(&target) {
                node.links_mut().inverse_surrogate_fold = Some(holder);
            }
        }

        debug!(nodes = arena.len(), "rebuilt web from records");
        Self { nodes: arena, search }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn population(&self) -> Population {
        Population::of(self.nodes.len())
    }

    pub fn search_config(&self) -> &SearchConfig {
        &self.search
    }

    pub fn contains(&self, id: WebId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Exact lookup.
    pub fn get_node(&self, id: WebId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Exact lookup, failing with [`Error::UnknownNode`].
    pub fn node(&self, id: WebId) -> Result<&Node> {
        self.nodes.get(&id).ok_or(Error::UnknownNode(id))
    }

    /// The node with `id`, or where a routing walk from the origin toward
    /// it stops.
    pub fn nearest(&self, id: WebId) -> Result<&Node> {
        if let Some(node) = self.nodes.get(&id) {
            return Ok(node);
        }
        if self.is_empty() {
            return Err(Error::EmptyWeb);
        }
        let outcome = SendVisitor::new(id).visit(self, WebId::ZERO)?;
        self.node(outcome.terminal)
    }

    /// Every node in ascending identifier order.
    pub fn ordered_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Ascending listing in the validator's input format.
    pub fn snapshot(&self) -> Vec<NodeSnapshot> {
        self.nodes.values().map(Node::snapshot).collect()
    }

    pub(crate) fn arena(&self) -> &BTreeMap<WebId, Node> {
        &self.nodes
    }

    pub(crate) fn random_node<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<WebId> {
        if self.is_empty() {
            return Err(Error::EmptyWeb);
        }
        Ok(WebId(rng.gen_range(0..self.nodes.len() as u64)))
    }

    /// Compute the insertion of a new node without applying it.
    pub fn plan_insert<R: Rng + ?Sized>(&self, rng: &mut R, attributes: Attributes) -> Result<Changeset> {
        insert::plan(self, rng, attributes, &self.search)
    }

    /// Compute the removal of `id` without applying it.
    pub fn plan_remove<R: Rng + ?Sized>(&self, rng: &mut R, id: WebId) -> Result<Changeset> {
        remove::plan(self, rng, id, &self.search)
    }

    /// Make a planned change visible.
    ///
    /// The changeset must have been planned against the current state.
    pub fn apply(&mut self, changeset: Changeset) -> Outcome {
        let (staged, outcome) = changeset.into_parts();
        for (id, node) in staged {
            match node {
                Some(node) => {
                    self.nodes.insert(id, node);
                }
                None => {
                    self.nodes.remove(&id);
                }
            }
        }

        match outcome {
            Outcome::Inserted(id) => info!(%id, nodes = self.nodes.len(), "node inserted"),
            Outcome::Removed { removed, relabeled } => {
                info!(%removed, ?relabeled, nodes = self.nodes.len(), "node removed")
            }
        }
        outcome
    }

    /// Insert a node with no attributes.
    pub fn insert<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<WebId> {
        self.insert_with(rng, Attributes::new())
    }

    pub fn insert_with<R: Rng + ?Sized>(&mut self, rng: &mut R, attributes: Attributes) -> Result<WebId> {
        let changeset = self.plan_insert(rng, attributes)?;
        match self.apply(changeset) {
            Outcome::Inserted(id) => Ok(id),
            Outcome::Removed { .. } => Err(Error::structural("insertion planned a removal")),
        }
    }

    pub fn remove<R: Rng + ?Sized>(&mut self, rng: &mut R, id: WebId) -> Result<Outcome> {
        let changeset = self.plan_remove(rng, id)?;
        Ok(self.apply(changeset))
    }

    /// Route from `from` toward `target`.
    pub fn route(&self, from: WebId, target: WebId) -> Result<RouteOutcome> {
        SendVisitor::new(target).visit(self, from)
    }

    /// Visit every node once, starting anywhere.
    pub fn broadcast<V: Visitor>(&self, from: WebId, visitor: &mut V) -> Result<usize> {
        BroadcastVisitor::new().broadcast(self, from, visitor)
    }

    pub fn validate(&self) -> bool {
        Validator::validate(&self.snapshot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn web_of(size: usize) -> HyPeerWeb {
        let mut rng = StdRng::seed_from_u64(41);
        let mut web = HyPeerWeb::new();
        for _ in 0..size {
            web.insert(&mut rng).unwrap();
        }
        web
    }

    #[test]
    fn population_follows_size() {
        assert_eq!(web_of(0).population(), Population::Empty);
        assert_eq!(web_of(1).population(), Population::Single);
        assert_eq!(web_of(2).population(), Population::Pair);
        assert_eq!(web_of(3).population(), Population::Many);
        assert_eq!(web_of(40).population(), Population::Many);
    }

    #[test]
    fn identifiers_stay_contiguous() {
        let web = web_of(19);
        let ids: Vec<_> = web.ordered_nodes().map(Node::id).collect();
        let expected: Vec<_> = (0..19).map(WebId).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn plan_does_not_mutate() {
        let web = web_of(5);
        let mut rng = StdRng::seed_from_u64(1);
        let changeset = web.plan_insert(&mut rng, Attributes::new()).unwrap();
        assert_eq!(changeset.outcome(), Outcome::Inserted(WebId(5)));
        assert_eq!(web.len(), 5);
        assert!(web.get_node(WebId(5)).is_none());

        let mut web = web;
        web.apply(changeset);
        assert_eq!(web.len(), 6);
        assert!(web.validate());
    }

    #[test]
    fn nearest_falls_back_to_route_terminal() {
        let web = web_of(6);
        assert_eq!(web.nearest(WebId(4)).unwrap().id(), WebId(4));
        let near = web.nearest(WebId(7)).unwrap();
        assert!(web.contains(near.id()));
        assert_eq!(HyPeerWeb::new().nearest(WebId(0)).unwrap_err(), Error::EmptyWeb);
    }

    #[test]
    fn rebuild_derives_inverse_relations() {
        let web = web_of(11);
        let stripped = web.ordered_nodes().cloned().map(|mut node| {
            node.links_mut().inverse_surrogate_neighbors.clear();
            node.links_mut().inverse_surrogate_fold = None;
            node
        });
        let rebuilt = HyPeerWeb::from_nodes(stripped, SearchConfig::default());
        assert_eq!(rebuilt.snapshot(), web.snapshot());
    }

    #[test]
    fn three_node_scenario() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut web = web_of(3);
        assert_eq!(web.node(WebId(2)).unwrap().id().value(), 0b10);
        assert!(web.validate());

        web.remove(&mut rng, WebId(0)).unwrap();
        assert_eq!(web.len(), 2);
        assert!(web.validate());
    }
}
