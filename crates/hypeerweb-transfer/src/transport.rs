//! Transport trait and configuration

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::warn;

use crate::error::Result;
use crate::types::{RemoteCall, Reply, SegmentAddress};

/// Transport configuration
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Address to bind to
    pub bind: SocketAddr,
    /// Send buffer size in bytes
    pub sndbuf: usize,
    /// Receive buffer size in bytes
    pub rcvbuf: usize,
    /// How long a synchronous call waits for its reply
    pub call_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 9300)),
            sndbuf: 4 * 1024 * 1024, // 4MB
            rcvbuf: 4 * 1024 * 1024, // 4MB
            call_timeout: Duration::from_secs(5),
        }
    }
}

/// Receives the result of a dispatched call.
pub type Callback = oneshot::Sender<Result<Reply>>;

/// Request/response primitive between segments.
pub trait Transport: Clone + Send + Sync + 'static {
    /// Address other segments reach this one at.
    fn local_address(&self) -> SegmentAddress;

    /// Perform a call. Synchronous calls resolve with the remote reply,
    /// fire-and-forget calls with [`Reply::Ack`] once sent.
    fn call(&self, call: RemoteCall) -> impl Future<Output = Result<Reply>> + Send;

    /// Perform a call in the background, delivering the result to
    /// `callback` when one is given.
    fn dispatch(&self, call: RemoteCall, callback: Option<Callback>) {
        let transport = self.clone();
        tokio::spawn(async move {
            let target = call.target;
            let operation = call.operation;
            let result = transport.call(call).await;
            match callback {
                Some(callback) => {
                    if callback.send(result).is_err() {
                        warn!(%target, ?operation, "dispatch callback dropped");
                    }
                }
                None => {
                    if let Err(e) = result {
                        warn!(%target, ?operation, error = %e, "dispatched call failed");
                    }
                }
            }
        });
    }
}
