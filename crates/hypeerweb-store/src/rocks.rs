//! RocksDB-backed store.

use std::path::Path;

use hypeerweb_topology::{Node, WebId};
use rocksdb::{Options, WriteBatch, DB};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::schema::{
    assemble, neighbor_key, node_key, parse_pair, surrogate_key, NodeRow, NEIGHBOR_PREFIX, NODE_PREFIX,
    SURROGATE_PREFIX,
};
use crate::transaction::{Mutation, Transaction};
use crate::Store;

/// Store backed by a RocksDB database.
pub struct RocksStore {
    db: DB,
}

impl RocksStore {
    /// Open or create a store at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        let db = DB::open(&opts, path)?;
        Ok(Self { db })
    }

    /// Get a node row by identifier.
    pub fn get_node(&self, id: WebId) -> Result<Option<NodeRow>> {
        match self.db.get(node_key(id).as_bytes())? {
            Some(data) => Ok(Some(serde_json::from_slice(&data)?)),
            None => Ok(None),
        }
    }

    fn scan<T: DeserializeOwned>(&self, prefix: &str) -> Result<Vec<T>> {
        let mut values = Vec::new();
        for item in self.db.prefix_iterator(prefix.as_bytes()) {
            let (key, value) = item?;
            if !key.starts_with(prefix.as_bytes()) {
                break;
            }
            values.push(serde_json::from_slice(&value)?);
        }
        Ok(values)
    }

    fn scan_pairs(&self, prefix: &str) -> Result<Vec<(WebId, WebId)>> {
        let mut pairs = Vec::new();
        for item in self.db.prefix_iterator(prefix.as_bytes()) {
            let (key, _) = item?;
            if !key.starts_with(prefix.as_bytes()) {
                break;
            }
            pairs.push(parse_pair(&key, prefix)?);
        }
        Ok(pairs)
    }
}

impl Store for RocksStore {
    fn commit(&self, transaction: Transaction) -> Result<()> {
        let count = transaction.len();
        let mut batch = WriteBatch::default();
        for mutation in transaction.into_mutations() {
            match mutation {
                Mutation::PutNode(row) => batch.put(node_key(row.id).as_bytes(), serde_json::to_vec(&row)?),
                Mutation::DeleteNode(id) => batch.delete(node_key(id).as_bytes()),
                Mutation::PutNeighbor(a, b) => {
                    batch.put(neighbor_key(a, b).as_bytes(), b"");
                    batch.put(neighbor_key(b, a).as_bytes(), b"");
                }
                Mutation::DeleteNeighbor(a, b) => {
                    batch.delete(neighbor_key(a, b).as_bytes());
                    batch.delete(neighbor_key(b, a).as_bytes());
                }
                Mutation::PutSurrogateNeighbor { holder, target } => {
                    batch.put(surrogate_key(holder, target).as_bytes(), b"")
                }
                Mutation::DeleteSurrogateNeighbor { holder, target } => {
                    batch.delete(surrogate_key(holder, target).as_bytes())
                }
            }
        }

        self.db.write(batch).map_err(|e| {
            warn!(error = %e, mutations = count, "commit rejected");
            Error::CommitFailure(e.to_string())
        })?;
        debug!(mutations = count, "committed");
        Ok(())
    }

    fn load(&self) -> Result<Vec<Node>> {
        let rows: Vec<NodeRow> = self.scan(NODE_PREFIX)?;
        let neighbors = self.scan_pairs(NEIGHBOR_PREFIX)?;
        let surrogates = self.scan_pairs(SURROGATE_PREFIX)?;
        debug!(nodes = rows.len(), "loaded rows");
        assemble(rows, neighbors, surrogates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hypeerweb_topology::{Attributes, HyPeerWeb, SearchConfig};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tempfile::tempdir;

    fn persist(web: &mut HyPeerWeb, store: &RocksStore, rng: &mut StdRng, attributes: Attributes) {
        let changeset = web.plan_insert(rng, attributes).unwrap();
        store.commit(Transaction::from_changeset(web, &changeset)).unwrap();
        web.apply(changeset);
    }

    #[test]
    fn empty_store_loads_nothing() {
        let dir = tempdir().unwrap();
        let store = RocksStore::open(dir.path()).unwrap();
        assert!(store.load().unwrap().is_empty());
        assert_eq!(store.get_node(WebId(0)).unwrap(), None);
    }

    #[test]
    fn web_survives_reopen() {
        let dir = tempdir().unwrap();
        let mut web = HyPeerWeb::new();
        let mut rng = StdRng::seed_from_u64(8);
        {
            let store = RocksStore::open(dir.path()).unwrap();
            for i in 0..21 {
                let attributes = Attributes::from([("name".to_string(), format!("n{i}"))]);
                persist(&mut web, &store, &mut rng, attributes);
            }
            let changeset = web.plan_remove(&mut rng, WebId(3)).unwrap();
            store.commit(Transaction::from_changeset(&web, &changeset)).unwrap();
            web.apply(changeset);
        }

        let store = RocksStore::open(dir.path()).unwrap();
        let loaded = HyPeerWeb::from_nodes(store.load().unwrap(), SearchConfig::default());
        assert_eq!(loaded.snapshot(), web.snapshot());
        assert!(loaded.validate());

        let row = store.get_node(WebId(3)).unwrap().unwrap();
        assert_eq!(row.attributes["name"], "n20");
    }
}
