//! Node and link records.
//!
//! Relations are stored as identifier slots and sets rather than references,
//! so the arena owns every node and no relation ever forms an ownership
//! cycle. Every relation mutation must be paired with its reverse on the
//! other endpoint inside one rewrite.

use std::collections::{BTreeMap, BTreeSet};

use crate::WebId;

/// User-defined payload carried by a node.
pub type Attributes = BTreeMap<String, String>;

/// The six relations held by a node.
///
/// Sets are ordered by identifier, which gives routing its deterministic
/// tie-break and keeps every listing free of duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Links {
    /// Complement partner.
    pub fold: Option<WebId>,
    /// Stand-in for a fold partner that does not exist yet.
    pub surrogate_fold: Option<WebId>,
    /// Reverse of another node's surrogate fold.
    pub inverse_surrogate_fold: Option<WebId>,
    /// Nodes one bit away.
    pub neighbors: BTreeSet<WebId>,
    /// Parents of missing neighbors (one height lower).
    pub surrogate_neighbors: BTreeSet<WebId>,
    /// Reverse of other nodes' surrogate neighbors (one height higher).
    pub inverse_surrogate_neighbors: BTreeSet<WebId>,
}

impl Links {
    /// True when no relation of any kind is held.
    pub fn is_empty(&self) -> bool {
        self.fold.is_none()
            && self.surrogate_fold.is_none()
            && self.inverse_surrogate_fold.is_none()
            && self.neighbors.is_empty()
            && self.surrogate_neighbors.is_empty()
            && self.inverse_surrogate_neighbors.is_empty()
    }

    /// Every related node, all six kinds, without duplicates.
    pub fn all(&self) -> BTreeSet<WebId> {
        let mut all = BTreeSet::new();
        all.extend(self.fold);
        all.extend(self.surrogate_fold);
        all.extend(self.inverse_surrogate_fold);
        all.extend(self.neighbors.iter().copied());
        all.extend(self.surrogate_neighbors.iter().copied());
        all.extend(self.inverse_surrogate_neighbors.iter().copied());
        all
    }

    /// Lowest-identifier neighbor.
    pub fn lowest_neighbor(&self) -> Option<WebId> {
        self.neighbors.first().copied()
    }

    /// Highest-identifier neighbor.
    pub fn highest_neighbor(&self) -> Option<WebId> {
        self.neighbors.last().copied()
    }
}

/// One addressable member of the web.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    id: WebId,
    height: u32,
    links: Links,
    attributes: Attributes,
}

impl Node {
    /// A node with no relations.
    pub fn new(id: WebId, height: u32) -> Self {
        Self {
            id,
            height,
            links: Links::default(),
            attributes: Attributes::new(),
        }
    }

    /// Rebuild a node from stored parts.
    pub fn from_parts(id: WebId, height: u32, links: Links, attributes: Attributes) -> Self {
        Self {
            id,
            height,
            links,
            attributes,
        }
    }

    pub fn id(&self) -> WebId {
        self.id
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn links(&self) -> &Links {
        &self.links
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut Attributes {
        &mut self.attributes
    }

    /// Identifier this node's next child would take.
    pub fn child_id(&self) -> WebId {
        self.id.child(self.height)
    }

    /// Parent: the lowest-identifier neighbor, which is below this node's id.
    pub fn parent(&self) -> Option<WebId> {
        self.links.lowest_neighbor().filter(|n| *n < self.id)
    }

    pub(crate) fn set_height(&mut self, height: u32) {
        self.height = height;
    }

    pub(crate) fn links_mut(&mut self) -> &mut Links {
        &mut self.links
    }

    pub(crate) fn take_attributes(&mut self) -> Attributes {
        std::mem::take(&mut self.attributes)
    }

    pub(crate) fn set_attributes(&mut self, attributes: Attributes) {
        self.attributes = attributes;
    }

    /// Plain listing of this node, suitable for validation and transport.
    pub fn snapshot(&self) -> NodeSnapshot {
        NodeSnapshot {
            id: self.id,
            height: self.height,
            fold: self.links.fold,
            surrogate_fold: self.links.surrogate_fold,
            inverse_surrogate_fold: self.links.inverse_surrogate_fold,
            neighbors: self.links.neighbors.iter().copied().collect(),
            surrogate_neighbors: self.links.surrogate_neighbors.iter().copied().collect(),
            inverse_surrogate_neighbors: self
                .links
                .inverse_surrogate_neighbors
                .iter()
                .copied()
                .collect(),
            attributes: self.attributes.clone(),
        }
    }
}

/// Flat copy of a node with its relations as identifier lists.
///
/// Lists are not required to be sorted or duplicate-free; the validator
/// reports when they are not.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeSnapshot {
    pub id: WebId,
    pub height: u32,
    pub fold: Option<WebId>,
    pub surrogate_fold: Option<WebId>,
    pub inverse_surrogate_fold: Option<WebId>,
    pub neighbors: Vec<WebId>,
    pub surrogate_neighbors: Vec<WebId>,
    pub inverse_surrogate_neighbors: Vec<WebId>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub attributes: Attributes,
}

impl NodeSnapshot {
    /// Convert back into an arena node.
    pub fn into_node(self) -> Node {
        let links = Links {
            fold: self.fold,
            surrogate_fold: self.surrogate_fold,
            inverse_surrogate_fold: self.inverse_surrogate_fold,
            neighbors: self.neighbors.into_iter().collect(),
            surrogate_neighbors: self.surrogate_neighbors.into_iter().collect(),
            inverse_surrogate_neighbors: self.inverse_surrogate_neighbors.into_iter().collect(),
        };
        Node::from_parts(self.id, self.height, links, self.attributes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_node_has_no_relations() {
        let node = Node::new(WebId(0), 0);
        assert!(node.links().is_empty());
        assert_eq!(node.parent(), None);
        assert_eq!(node.child_id(), WebId(1));
    }

    #[test]
    fn all_relations_deduplicated() {
        let mut links = Links::default();
        links.fold = Some(WebId(3));
        links.neighbors.insert(WebId(1));
        links.neighbors.insert(WebId(3));
        links.surrogate_neighbors.insert(WebId(1));

        let all: Vec<_> = links.all().into_iter().collect();
        assert_eq!(all, vec![WebId(1), WebId(3)]);
    }

    #[test]
    fn parent_is_lowest_lower_neighbor() {
        let mut node = Node::new(WebId(6), 3);
        node.links_mut().neighbors.extend([WebId(2), WebId(4), WebId(7)]);
        assert_eq!(node.parent(), Some(WebId(2)));

        let mut origin = Node::new(WebId(0), 1);
        origin.links_mut().neighbors.insert(WebId(1));
        assert_eq!(origin.parent(), None);
    }

    #[test]
    fn snapshot_round_trips_into_node() {
        let mut node = Node::new(WebId(2), 2);
        node.links_mut().neighbors.insert(WebId(0));
        node.links_mut().surrogate_neighbors.insert(WebId(1));
        node.links_mut().fold = Some(WebId(1));
        node.attributes_mut().insert("name".into(), "two".into());

        let back = node.snapshot().into_node();
        assert_eq!(back, node);
    }
}
