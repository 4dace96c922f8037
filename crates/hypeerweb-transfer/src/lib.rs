//! HyPeerWeb Transfer - remote invocation between segments
//!
//! This crate provides:
//! - The request/response vocabulary segments exchange ([`RemoteCall`],
//!   [`Reply`])
//! - A [`Transport`] trait with synchronous calls and callback dispatch
//! - An in-process [`LoopbackNetwork`] for tests and single-host setups
//! - A UDP transport with configurable socket buffers
//!
//! # Example
//!
//! ```rust,ignore
//! use hypeerweb_transfer::{TransportConfig, UdpTransport};
//!
//! let config = TransportConfig {
//!     bind: "0.0.0.0:9300".parse()?,
//!     ..Default::default()
//! };
//! let (transport, mut incoming) = UdpTransport::bind(config).await?;
//! ```

pub mod error;
pub mod loopback;
pub mod transport;
pub mod types;
pub mod udp;

// Re-export main types at crate root
pub use error::{Error, Result};
pub use loopback::{LoopbackNetwork, LoopbackTransport};
pub use transport::{Callback, Transport, TransportConfig};
pub use types::{Argument, CallMode, Frame, FrameBody, Incoming, Operation, RemoteCall, Reply, SegmentAddress};
pub use udp::{UdpTransport, MAX_DATAGRAM};
