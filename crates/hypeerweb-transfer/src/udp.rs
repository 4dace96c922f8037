//! UDP transport
//!
//! Every datagram carries one JSON-encoded [`Frame`]. Requests get an
//! identifier; the response echoes it so the pending call can be resumed.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::transport::{Transport, TransportConfig};
use crate::types::{CallMode, Frame, FrameBody, Incoming, RemoteCall, Reply, SegmentAddress};

/// Largest payload a single UDP datagram can carry.
pub const MAX_DATAGRAM: usize = 65_507;

/// Depth of the incoming call queue.
const INCOMING_QUEUE: usize = 256;

struct Inner {
    socket: UdpSocket,
    local: SegmentAddress,
    pending: Mutex<HashMap<u64, oneshot::Sender<Reply>>>,
    next_id: AtomicU64,
    call_timeout: Duration,
}

/// Stops the receive loop once the last transport handle is gone.
struct ReceiveTask(JoinHandle<()>);

impl Drop for ReceiveTask {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Transport over a single UDP socket.
#[derive(Clone)]
pub struct UdpTransport {
    inner: Arc<Inner>,
    _receiver: Arc<ReceiveTask>,
}

impl UdpTransport {
    /// Bind with the configured buffer sizes and start receiving.
    ///
    /// Calls from other segments arrive on the returned receiver.
    pub async fn bind(config: TransportConfig) -> Result<(Self, mpsc::Receiver<Incoming>)> {
        let socket = bind_socket(config.bind, config.sndbuf, config.rcvbuf)?;
        let local = SegmentAddress(socket.local_addr()?);

        info!(
            "UDP transport bound to {} (sndbuf={}, rcvbuf={})",
            local, config.sndbuf, config.rcvbuf
        );

        let inner = Arc::new(Inner {
            socket,
            local,
            pending: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            call_timeout: config.call_timeout,
        });
        let (tx, rx) = mpsc::channel(INCOMING_QUEUE);
        let receiver = tokio::spawn(receive_loop(Arc::clone(&inner), tx));

        Ok((
            Self {
                inner,
                _receiver: Arc::new(ReceiveTask(receiver)),
            },
            rx,
        ))
    }

    async fn send_frame(&self, frame: &Frame, to: SocketAddr) -> Result<()> {
        send_frame(&self.inner.socket, frame, to).await
    }
}

impl Transport for UdpTransport {
    fn local_address(&self) -> SegmentAddress {
        self.inner.local
    }

    async fn call(&self, call: RemoteCall) -> Result<Reply> {
        let target = call.target;
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);

        if call.mode == CallMode::FireAndForget {
            let frame = Frame {
                id,
                body: FrameBody::Request(call),
            };
            self.send_frame(&frame, target.0).await?;
            return Ok(Reply::Ack);
        }

        let (tx, rx) = oneshot::channel();
        self.inner.pending.lock().await.insert(id, tx);

        let frame = Frame {
            id,
            body: FrameBody::Request(call),
        };
        if let Err(e) = self.send_frame(&frame, target.0).await {
            self.inner.pending.lock().await.remove(&id);
            return Err(e);
        }

        match tokio::time::timeout(self.inner.call_timeout, rx).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(_)) => Err(Error::RemoteUnavailable {
                target,
                reason: "transport closed before the reply".into(),
            }),
            Err(_) => {
                self.inner.pending.lock().await.remove(&id);
                warn!(%target, id, "call timed out");
                Err(Error::Timeout(self.inner.call_timeout))
            }
        }
    }
}

fn bind_socket(addr: SocketAddr, sndbuf: usize, rcvbuf: usize) -> Result<UdpSocket> {
    let domain = if addr.is_ipv4() { Domain::IPV4 } else { Domain::IPV6 };
    let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;

    // Buffers must be sized before binding
    socket.set_send_buffer_size(sndbuf)?;
    socket.set_recv_buffer_size(rcvbuf)?;
    socket.set_reuse_address(true)?;

    socket.bind(&addr.into())?;
    socket.set_nonblocking(true)?;

    let std_socket: std::net::UdpSocket = socket.into();
    Ok(UdpSocket::from_std(std_socket)?)
}

async fn send_frame(socket: &UdpSocket, frame: &Frame, to: SocketAddr) -> Result<()> {
    let bytes = serde_json::to_vec(frame)?;
    if bytes.len() > MAX_DATAGRAM {
        return Err(Error::FrameTooLarge(bytes.len()));
    }
    socket.send_to(&bytes, to).await?;
    Ok(())
}

async fn receive_loop(inner: Arc<Inner>, incoming: mpsc::Sender<Incoming>) {
    let mut buf = vec![0u8; MAX_DATAGRAM];
    loop {
        let (len, from) = match inner.socket.recv_from(&mut buf).await {
            Ok(received) => received,
            Err(e) => {
                warn!(error = %e, "receive failed");
                continue;
            }
        };
        let frame: Frame = match serde_json::from_slice(&buf[..len]) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(%from, error = %e, "dropping undecodable datagram");
                continue;
            }
        };

        match frame.body {
            FrameBody::Response(reply) => match inner.pending.lock().await.remove(&frame.id) {
                Some(waiter) => {
                    let _ = waiter.send(reply);
                }
                None => debug!(%from, id = frame.id, "late or unknown response"),
            },
            FrameBody::Request(call) => {
                let responder = if call.mode == CallMode::Synchronous {
                    let (tx, rx) = oneshot::channel();
                    tokio::spawn(respond(Arc::clone(&inner), frame.id, from, rx));
                    Some(tx)
                } else {
                    None
                };
                // Replies to our own calls still arrive after the queue closes.
                if incoming
                    .send(Incoming::new(call, SegmentAddress(from), responder))
                    .await
                    .is_err()
                {
                    debug!(%from, id = frame.id, "incoming queue closed, dropping request");
                }
            }
        }
    }
}

async fn respond(inner: Arc<Inner>, id: u64, to: SocketAddr, reply: oneshot::Receiver<Reply>) {
    let Ok(reply) = reply.await else {
        debug!(%to, id, "request dropped without a reply");
        return;
    };
    let frame = Frame {
        id,
        body: FrameBody::Response(reply),
    };
    if let Err(e) = send_frame(&inner.socket, &frame, to).await {
        warn!(%to, id, error = %e, "failed to send reply");
    }
}
