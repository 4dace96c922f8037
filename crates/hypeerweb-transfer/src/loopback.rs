//! In-process transport
//!
//! Segments joined to the same [`LoopbackNetwork`] reach each other through
//! channels instead of sockets. Addresses are only names here.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, RwLock};
use tracing::debug;

use crate::error::{Error, Result};
use crate::transport::Transport;
use crate::types::{CallMode, Incoming, RemoteCall, Reply, SegmentAddress};

const QUEUE: usize = 64;

/// Shared routing table of a set of in-process segments.
#[derive(Clone, Default)]
pub struct LoopbackNetwork {
    routes: Arc<RwLock<HashMap<SegmentAddress, mpsc::Sender<Incoming>>>>,
    call_timeout: Option<Duration>,
}

impl LoopbackNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    /// Register `address`, returning its transport and incoming calls.
    pub async fn join(&self, address: SegmentAddress) -> (LoopbackTransport, mpsc::Receiver<Incoming>) {
        let (tx, rx) = mpsc::channel(QUEUE);
        self.routes.write().await.insert(address, tx);
        debug!(%address, "joined loopback network");
        let transport = LoopbackTransport {
            network: self.clone(),
            local: address,
        };
        (transport, rx)
    }

    /// Drop `address` from the table; calls to it become unavailable.
    pub async fn leave(&self, address: SegmentAddress) {
        self.routes.write().await.remove(&address);
    }
}

/// One segment's handle on a [`LoopbackNetwork`].
#[derive(Clone)]
pub struct LoopbackTransport {
    network: LoopbackNetwork,
    local: SegmentAddress,
}

impl Transport for LoopbackTransport {
    fn local_address(&self) -> SegmentAddress {
        self.local
    }

    async fn call(&self, call: RemoteCall) -> Result<Reply> {
        let target = call.target;
        let unavailable = |reason: &str| Error::RemoteUnavailable {
            target,
            reason: reason.to_string(),
        };

        let route = self
            .network
            .routes
            .read()
            .await
            .get(&target)
            .cloned()
            .ok_or_else(|| unavailable("no such segment"))?;

        if call.mode == CallMode::FireAndForget {
            route
                .send(Incoming::new(call, self.local, None))
                .await
                .map_err(|_| unavailable("segment stopped serving"))?;
            return Ok(Reply::Ack);
        }

        let (tx, rx) = oneshot::channel();
        route
            .send(Incoming::new(call, self.local, Some(tx)))
            .await
            .map_err(|_| unavailable("segment stopped serving"))?;

        let reply = match self.network.call_timeout {
            Some(limit) => tokio::time::timeout(limit, rx)
                .await
                .map_err(|_| Error::Timeout(limit))?,
            None => rx.await,
        };
        reply.map_err(|_| unavailable("request dropped without a reply"))
    }
}
