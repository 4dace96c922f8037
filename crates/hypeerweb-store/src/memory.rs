//! In-process store.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use hypeerweb_topology::{Node, WebId};
use tracing::warn;

use crate::error::{Error, Result};
use crate::schema::{assemble, NodeRow};
use crate::transaction::{Mutation, Transaction};
use crate::Store;

#[derive(Debug, Clone, Default)]
struct Tables {
    nodes: BTreeMap<WebId, NodeRow>,
    neighbors: BTreeSet<(WebId, WebId)>,
    surrogates: BTreeSet<(WebId, WebId)>,
}

impl Tables {
    fn apply(&mut self, mutation: Mutation) {
        match mutation {
            Mutation::PutNode(row) => {
                self.nodes.insert(row.id, row);
            }
            Mutation::DeleteNode(id) => {
                self.nodes.remove(&id);
            }
            Mutation::PutNeighbor(a, b) => {
                self.neighbors.insert((a, b));
                self.neighbors.insert((b, a));
            }
            Mutation::DeleteNeighbor(a, b) => {
                self.neighbors.remove(&(a, b));
                self.neighbors.remove(&(b, a));
            }
            Mutation::PutSurrogateNeighbor { holder, target } => {
                self.surrogates.insert((holder, target));
            }
            Mutation::DeleteSurrogateNeighbor { holder, target } => {
                self.surrogates.remove(&(holder, target));
            }
        }
    }
}

/// Store kept in memory, with commit failure injection for tests and
/// single-process deployments.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    fail_next: AtomicBool,
    commits: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject the next commit.
    pub fn fail_next_commit(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    /// Number of successful commits.
    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| Error::CommitFailure("store lock poisoned".into()))
    }
}

impl Store for MemoryStore {
    fn commit(&self, transaction: Transaction) -> Result<()> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            warn!(mutations = transaction.len(), "injected commit failure");
            return Err(Error::CommitFailure("injected failure".into()));
        }

        let mut tables = self.tables()?;
        let mut staged = tables.clone();
        for mutation in transaction.into_mutations() {
            staged.apply(mutation);
        }
        *tables = staged;
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn load(&self) -> Result<Vec<Node>> {
        let tables = self.tables()?;
        assemble(
            tables.nodes.values().cloned(),
            tables.neighbors.iter().copied(),
            tables.surrogates.iter().copied(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hypeerweb_topology::{Attributes, HyPeerWeb, SearchConfig};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn commit_insert(web: &mut HyPeerWeb, store: &MemoryStore, rng: &mut StdRng) -> Result<()> {
        let changeset = web.plan_insert(rng, Attributes::new()).expect("plan");
        store.commit(Transaction::from_changeset(web, &changeset))?;
        web.apply(changeset);
        Ok(())
    }

    #[test]
    fn load_matches_committed_web() {
        let store = MemoryStore::new();
        let mut web = HyPeerWeb::new();
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..13 {
            commit_insert(&mut web, &store, &mut rng).unwrap();
        }
        let changeset = web.plan_remove(&mut rng, WebId(4)).unwrap();
        store.commit(Transaction::from_changeset(&web, &changeset)).unwrap();
        web.apply(changeset);

        let loaded = HyPeerWeb::from_nodes(store.load().unwrap(), SearchConfig::default());
        assert_eq!(loaded.snapshot(), web.snapshot());
        assert_eq!(store.commit_count(), 14);
    }

    #[test]
    fn injected_failure_writes_nothing() {
        let store = MemoryStore::new();
        let mut web = HyPeerWeb::new();
        let mut rng = StdRng::seed_from_u64(6);
        for _ in 0..4 {
            commit_insert(&mut web, &store, &mut rng).unwrap();
        }

        store.fail_next_commit();
        let err = commit_insert(&mut web, &store, &mut rng).unwrap_err();
        assert!(matches!(err, Error::CommitFailure(_)));
        assert_eq!(web.len(), 4);
        assert_eq!(store.load().unwrap().len(), 4);

        commit_insert(&mut web, &store, &mut rng).unwrap();
        assert_eq!(store.load().unwrap().len(), 5);
    }
}
