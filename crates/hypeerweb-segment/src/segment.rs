//! A segment: one web, its store and its transport.
//!
//! A coordinator holds the web. Structural mutations take the write lock,
//! so at most one is in flight and no reader ever sees an intermediate
//! state. Each mutation is planned, committed to the store and only then
//! applied; a rejected commit leaves the web untouched. A member holds no
//! nodes and forwards every operation to its coordinator.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use hypeerweb_store::{Store, Transaction};
use hypeerweb_topology::{
    Attributes, Changeset, HyPeerWeb, Node, NodeSnapshot, Outcome, RouteOutcome, SearchConfig, Visitor, WebId,
};
use hypeerweb_transfer::{Argument, Operation, RemoteCall, Reply, SegmentAddress, Transport};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::{broadcast, RwLock};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::events::{Events, TopologyEvent};
use crate::node_ref::NodeRef;

/// Where the web lives relative to this segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Coordinator,
    Member { coordinator: SegmentAddress },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Health {
    Healthy,
    /// A structural failure was seen; the web may be corrupt.
    Suspect,
}

struct State {
    web: HyPeerWeb,
    rng: StdRng,
}

/// One execution unit of a HyPeerWeb.
pub struct Segment<T: Transport> {
    role: Role,
    state: RwLock<State>,
    store: Arc<dyn Store>,
    transport: T,
    suspect: AtomicBool,
    events: Events,
}

impl<T: Transport> Segment<T> {
    /// Build a segment. A coordinator loads its web from `store`.
    pub fn open(
        role: Role,
        store: Arc<dyn Store>,
        transport: T,
        search: SearchConfig,
        seed: Option<u64>,
    ) -> Result<Self> {
        let web = match role {
            Role::Coordinator => HyPeerWeb::from_nodes(store.load()?, search),
            Role::Member { .. } => HyPeerWeb::with_config(search),
        };

        let suspect = !web.is_empty() && !web.validate();
        if suspect {
            warn!(nodes = web.len(), "loaded web violates its invariants");
        }
        info!(
            address = %transport.local_address(),
            ?role,
            nodes = web.len(),
            "segment open"
        );

        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            role,
            state: RwLock::new(State { web, rng }),
            store,
            transport,
            suspect: AtomicBool::new(suspect),
            events: Events::default(),
        })
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn health(&self) -> Health {
        if self.suspect.load(Ordering::SeqCst) {
            Health::Suspect
        } else {
            Health::Healthy
        }
    }

    pub fn local_address(&self) -> SegmentAddress {
        self.transport.local_address()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Topology changes applied by this segment.
    pub fn subscribe(&self) -> broadcast::Receiver<TopologyEvent> {
        self.events.subscribe()
    }

    /// Add a node carrying `attributes`.
    pub async fn insert(&self, attributes: Attributes) -> Result<WebId> {
        if let Role::Member { coordinator } = self.role {
            let call = RemoteCall::new(coordinator, Operation::Insert).with_arg(Argument::Attributes(attributes));
            return match self.transport.call(call).await? {
                Reply::Inserted(id) => Ok(id),
                other => Err(unexpected(other)),
            };
        }

        let outcome = self.mutate(|web, rng| web.plan_insert(rng, attributes)).await?;
        inserted_id(outcome).map_err(|e| self.topology_failure(e))
    }

    /// Remove node `id`.
    pub async fn remove(&self, id: WebId) -> Result<Outcome> {
        if let Role::Member { coordinator } = self.role {
            let call = RemoteCall::new(coordinator, Operation::Remove).with_arg(Argument::Id(id));
            return match self.transport.call(call).await? {
                Reply::Removed(outcome) => Ok(outcome),
                other => Err(unexpected(other)),
            };
        }

        self.mutate(|web, rng| web.plan_remove(rng, id)).await
    }

    async fn mutate(
        &self,
        plan: impl FnOnce(&HyPeerWeb, &mut StdRng) -> hypeerweb_topology::Result<Changeset>,
    ) -> Result<Outcome> {
        let mut state = self.state.write().await;
        let State { web, rng } = &mut *state;

        let changeset = plan(web, rng).map_err(|e| self.topology_failure(e))?;
        let transaction = Transaction::from_changeset(web, &changeset);
        // RocksDB writes block; keep them off the async workers
        let store = Arc::clone(&self.store);
        let committed = tokio::task::spawn_blocking(move || store.commit(transaction))
            .await
            .unwrap_or_else(|e| Err(hypeerweb_store::Error::CommitFailure(format!("commit task failed: {e}"))));
        if let Err(e) = committed {
            warn!(error = %e, outcome = ?changeset.outcome(), "commit rejected, web unchanged");
            return Err(Error::Commit(e));
        }

        let outcome = web.apply(changeset);
        self.events.publish(outcome);
        Ok(outcome)
    }

    fn topology_failure(&self, e: hypeerweb_topology::Error) -> Error {
        if matches!(e, hypeerweb_topology::Error::StructuralFailure(_)) {
            warn!(error = %e, "structural failure, segment marked suspect");
            self.suspect.store(true, Ordering::SeqCst);
        }
        Error::Structural(e)
    }

    /// Exact lookup.
    pub async fn get_node(&self, id: WebId) -> Result<Option<NodeSnapshot>> {
        if let Role::Member { coordinator } = self.role {
            let call = RemoteCall::new(coordinator, Operation::GetNode).with_arg(Argument::Id(id));
            return self.fetch_node(call).await;
        }
        Ok(self.state.read().await.web.get_node(id).map(Node::snapshot))
    }

    /// Every node in ascending identifier order.
    pub async fn ordered_nodes(&self) -> Result<Vec<NodeSnapshot>> {
        if let Role::Member { coordinator } = self.role {
            return match self
                .transport
                .call(RemoteCall::new(coordinator, Operation::ListNodes))
                .await?
            {
                Reply::Nodes(nodes) => Ok(nodes),
                other => Err(unexpected(other)),
            };
        }
        Ok(self.state.read().await.web.snapshot())
    }

    /// Exact match, else where routing from the origin stops.
    pub async fn nearest(&self, id: WebId) -> Result<NodeSnapshot> {
        self.require_coordinator()?;
        let state = self.state.read().await;
        Ok(state.web.nearest(id)?.snapshot())
    }

    pub async fn route(&self, from: WebId, target: WebId) -> Result<RouteOutcome> {
        if let Role::Member { coordinator } = self.role {
            let call = RemoteCall::new(coordinator, Operation::Route)
                .with_arg(Argument::Id(from))
                .with_arg(Argument::Id(target));
            return match self.transport.call(call).await? {
                Reply::Route(outcome) => Ok(outcome),
                other => Err(unexpected(other)),
            };
        }
        Ok(self.state.read().await.web.route(from, target)?)
    }

    /// Run `visitor` on every node. Visitors do not cross segments.
    pub async fn broadcast<V: Visitor>(&self, from: WebId, visitor: &mut V) -> Result<usize> {
        self.require_coordinator()?;
        Ok(self.state.read().await.web.broadcast(from, visitor)?)
    }

    pub async fn validate(&self) -> Result<bool> {
        if let Role::Member { coordinator } = self.role {
            return match self
                .transport
                .call(RemoteCall::new(coordinator, Operation::Validate))
                .await?
            {
                Reply::Valid(valid) => Ok(valid),
                other => Err(unexpected(other)),
            };
        }
        Ok(self.state.read().await.web.validate())
    }

    /// Turn a reference into the node's current state.
    pub async fn resolve(&self, node: NodeRef) -> Result<Option<NodeSnapshot>> {
        match node {
            NodeRef::Local(id) => Ok(self.state.read().await.web.get_node(id).map(Node::snapshot)),
            NodeRef::Remote { segment, id } => {
                let call = RemoteCall::new(segment, Operation::GetNode).with_arg(Argument::Id(id));
                self.fetch_node(call).await
            }
        }
    }

    /// Reference to `id` as seen from this segment.
    pub fn reference(&self, id: WebId) -> NodeRef {
        match self.role {
            Role::Coordinator => NodeRef::Local(id),
            Role::Member { coordinator } => NodeRef::Remote {
                segment: coordinator,
                id,
            },
        }
    }

    async fn fetch_node(&self, call: RemoteCall) -> Result<Option<NodeSnapshot>> {
        match self.transport.call(call).await? {
            Reply::Node(node) => Ok(node),
            other => Err(unexpected(other)),
        }
    }

    fn require_coordinator(&self) -> Result<()> {
        match self.role {
            Role::Coordinator => Ok(()),
            Role::Member { .. } => Err(Error::NotCoordinator),
        }
    }
}

fn inserted_id(outcome: Outcome) -> hypeerweb_topology::Result<WebId> {
    match outcome {
        Outcome::Inserted(id) => Ok(id),
        Outcome::Removed { removed, .. } => Err(hypeerweb_topology::Error::StructuralFailure(format!(
            "insertion produced a removal of {removed}"
        ))),
    }
}

fn unexpected(reply: Reply) -> Error {
    match reply {
        Reply::Failed(reason) => Error::Remote(reason),
        other => Error::Remote(format!("unexpected reply {other:?}")),
    }
}
