//! Batched row mutations.

use std::collections::BTreeSet;

use hypeerweb_topology::{Changeset, HyPeerWeb, Node, WebId};
use tracing::debug;

use crate::schema::NodeRow;

/// One row-level change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    PutNode(NodeRow),
    DeleteNode(WebId),
    /// Stored in both directions.
    PutNeighbor(WebId, WebId),
    DeleteNeighbor(WebId, WebId),
    /// Stored from the holder only.
    PutSurrogateNeighbor { holder: WebId, target: WebId },
    DeleteSurrogateNeighbor { holder: WebId, target: WebId },
}

/// An all-or-nothing group of mutations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transaction {
    mutations: Vec<Mutation>,
}

impl Transaction {
    pub fn begin() -> Self {
        Self::default()
    }

    pub fn upsert_node(&mut self, node: &Node) {
        self.mutations.push(Mutation::PutNode(NodeRow::of(node)));
    }

    pub fn delete_node(&mut self, id: WebId) {
        self.mutations.push(Mutation::DeleteNode(id));
    }

    pub fn insert_neighbor(&mut self, a: WebId, b: WebId) {
        self.mutations.push(Mutation::PutNeighbor(a, b));
    }

    pub fn delete_neighbor(&mut self, a: WebId, b: WebId) {
        self.mutations.push(Mutation::DeleteNeighbor(a, b));
    }

    pub fn insert_surrogate_neighbor(&mut self, holder: WebId, target: WebId) {
        self.mutations.push(Mutation::PutSurrogateNeighbor { holder, target });
    }

    pub fn delete_surrogate_neighbor(&mut self, holder: WebId, target: WebId) {
        self.mutations.push(Mutation::DeleteSurrogateNeighbor { holder, target });
    }

    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }

    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    /// Rows changed by `changeset`, diffed against the current `web`.
    ///
    /// Both endpoints of every relation change are part of a changeset, so
    /// a symmetric neighbor pair is written once, from its lower endpoint.
    pub fn from_changeset(web: &HyPeerWeb, changeset: &Changeset) -> Self {
        let mut tx = Self::begin();
        let empty = BTreeSet::new();

        for (id, after) in changeset.touched() {
            let before = web.get_node(id);
            let old_neighbors = before.map_or(&empty, |n| &n.links().neighbors);
            let old_surrogates = before.map_or(&empty, |n| &n.links().surrogate_neighbors);
            let new_neighbors = after.map_or(&empty, |n| &n.links().neighbors);
            let new_surrogates = after.map_or(&empty, |n| &n.links().surrogate_neighbors);

            match after {
                Some(node) => tx.upsert_node(node),
                None => tx.delete_node(id),
            }

            for &other in old_neighbors.difference(new_neighbors).filter(|other| id < **other) {
                tx.delete_neighbor(id, other);
            }
            for &other in new_neighbors.difference(old_neighbors).filter(|other| id < **other) {
                tx.insert_neighbor(id, other);
            }
            for &target in old_surrogates.difference(new_surrogates) {
                tx.delete_surrogate_neighbor(id, target);
            }
            for &target in new_surrogates.difference(old_surrogates) {
                tx.insert_surrogate_neighbor(id, target);
            }
        }

        debug!(touched = changeset.len(), mutations = tx.len(), "built transaction");
        tx
    }

    pub(crate) fn into_mutations(self) -> Vec<Mutation> {
        self.mutations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hypeerweb_topology::Attributes;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn first_node_is_a_single_row() {
        let web = HyPeerWeb::new();
        let mut rng = StdRng::seed_from_u64(1);
        let changeset = web.plan_insert(&mut rng, Attributes::new()).unwrap();
        let tx = Transaction::from_changeset(&web, &changeset);
        assert_eq!(tx.mutations(), &[Mutation::PutNode(NodeRow::of(&Node::new(WebId(0), 0)))]);
    }

    #[test]
    fn insertion_writes_new_relations_once() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut web = HyPeerWeb::new();
        for _ in 0..2 {
            web.insert(&mut rng).unwrap();
        }
        let changeset = web.plan_insert(&mut rng, Attributes::new()).unwrap();
        let tx = Transaction::from_changeset(&web, &changeset);

        let neighbors: Vec<_> = tx
            .mutations()
            .iter()
            .filter(|m| matches!(m, Mutation::PutNeighbor(..)))
            .collect();
        assert_eq!(neighbors, vec![&Mutation::PutNeighbor(WebId(0), WebId(2))]);
        assert!(tx.mutations().contains(&Mutation::PutSurrogateNeighbor {
            holder: WebId(2),
            target: WebId(1)
        }));
    }

    #[test]
    fn removal_deletes_rows() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut web = HyPeerWeb::new();
        for _ in 0..3 {
            web.insert(&mut rng).unwrap();
        }
        let changeset = web.plan_remove(&mut rng, WebId(2)).unwrap();
        let tx = Transaction::from_changeset(&web, &changeset);

        assert!(tx.mutations().contains(&Mutation::DeleteNode(WebId(2))));
        assert!(tx.mutations().contains(&Mutation::DeleteNeighbor(WebId(0), WebId(2))));
        assert!(tx.mutations().contains(&Mutation::DeleteSurrogateNeighbor {
            holder: WebId(2),
            target: WebId(1)
        }));
    }
}
