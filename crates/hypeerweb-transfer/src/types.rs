//! Core types for segment-to-segment calls

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

use hypeerweb_topology::{Attributes, NodeSnapshot, Outcome, RouteOutcome, WebId};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

/// Network address of a segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SegmentAddress(pub SocketAddr);

impl fmt::Display for SegmentAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for SegmentAddress {
    type Err = std::net::AddrParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(SegmentAddress)
    }
}

impl From<SocketAddr> for SegmentAddress {
    fn from(addr: SocketAddr) -> Self {
        Self(addr)
    }
}

/// Operation a segment can be asked to perform.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// `[Id]` -> `Node`
    GetNode,
    /// `[]` -> `Nodes`
    ListNodes,
    /// `[Attributes]` (optional) -> `Inserted`
    Insert,
    /// `[Id]` -> `Removed`
    Remove,
    /// `[Id from, Id target]` -> `Route`
    Route,
    /// `[]` -> `Valid`
    Validate,
}

/// Typed call argument.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Argument {
    Id(WebId),
    Attributes(Attributes),
}

/// Whether the caller waits for the reply.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallMode {
    #[default]
    Synchronous,
    /// The receiver sends nothing back.
    FireAndForget,
}

/// One remote invocation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteCall {
    pub target: SegmentAddress,
    pub operation: Operation,
    pub args: Vec<Argument>,
    pub mode: CallMode,
}

impl RemoteCall {
    pub fn new(target: SegmentAddress, operation: Operation) -> Self {
        Self {
            target,
            operation,
            args: Vec::new(),
            mode: CallMode::Synchronous,
        }
    }

    #[must_use]
    pub fn with_arg(mut self, arg: Argument) -> Self {
        self.args.push(arg);
        self
    }

    #[must_use]
    pub fn fire_and_forget(mut self) -> Self {
        self.mode = CallMode::FireAndForget;
        self
    }

    /// The `index`-th argument if it is an identifier.
    pub fn id_arg(&self, index: usize) -> Option<WebId> {
        match self.args.get(index) {
            Some(Argument::Id(id)) => Some(*id),
            _ => None,
        }
    }

    /// The first attributes argument, if any.
    pub fn attributes_arg(&self) -> Option<&Attributes> {
        self.args.iter().find_map(|arg| match arg {
            Argument::Attributes(attributes) => Some(attributes),
            Argument::Id(_) => None,
        })
    }
}

/// Result of a synchronous call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reply {
    /// Fire-and-forget acknowledgement (local only, never sent).
    Ack,
    Node(Option<NodeSnapshot>),
    Nodes(Vec<NodeSnapshot>),
    Inserted(WebId),
    Removed(Outcome),
    Route(RouteOutcome),
    Valid(bool),
    /// The remote operation ran and failed.
    Failed(String),
}

/// Wire frame: a request or the response to one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    /// Correlates a response with its request.
    pub id: u64,
    pub body: FrameBody,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameBody {
    Request(RemoteCall),
    Response(Reply),
}

/// A call received from another segment.
#[derive(Debug)]
pub struct Incoming {
    pub call: RemoteCall,
    pub from: SegmentAddress,
    responder: Option<oneshot::Sender<Reply>>,
}

impl Incoming {
    pub(crate) fn new(call: RemoteCall, from: SegmentAddress, responder: Option<oneshot::Sender<Reply>>) -> Self {
        Self { call, from, responder }
    }

    /// Whether the caller is waiting for a reply.
    pub fn expects_reply(&self) -> bool {
        self.responder.is_some()
    }

    /// Answer the call; a no-op for fire-and-forget calls.
    pub fn respond(self, reply: Reply) {
        if let Some(responder) = self.responder {
            if responder.send(reply).is_err() {
                tracing::debug!(from = %self.from, "caller went away before the reply");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_builder_and_argument_access() {
        let target: SegmentAddress = "127.0.0.1:9300".parse().unwrap();
        let call = RemoteCall::new(target, Operation::Route)
            .with_arg(Argument::Id(WebId(3)))
            .with_arg(Argument::Id(WebId(12)));

        assert_eq!(call.mode, CallMode::Synchronous);
        assert_eq!(call.id_arg(0), Some(WebId(3)));
        assert_eq!(call.id_arg(1), Some(WebId(12)));
        assert_eq!(call.id_arg(2), None);
        assert!(call.attributes_arg().is_none());
    }

    #[test]
    fn frame_json_shape() {
        let target: SegmentAddress = "127.0.0.1:9300".parse().unwrap();
        let frame = Frame {
            id: 7,
            body: FrameBody::Request(RemoteCall::new(target, Operation::GetNode).with_arg(Argument::Id(WebId(5)))),
        };
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["body"]["Request"]["operation"], "GetNode");
        assert_eq!(json["body"]["Request"]["args"][0]["Id"], 5);

        let back: Frame = serde_json::from_value(json).unwrap();
        assert_eq!(back, frame);
    }
}
