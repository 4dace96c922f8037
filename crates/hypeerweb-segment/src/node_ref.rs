//! References to nodes that may live in another segment.

use std::fmt;

use hypeerweb_topology::WebId;
use hypeerweb_transfer::SegmentAddress;

/// A node held here, or one reached through another segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeRef {
    Local(WebId),
    Remote { segment: SegmentAddress, id: WebId },
}

impl NodeRef {
    pub fn id(&self) -> WebId {
        match self {
            NodeRef::Local(id) | NodeRef::Remote { id, .. } => *id,
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, NodeRef::Local(_))
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeRef::Local(id) => write!(f, "{id}"),
            NodeRef::Remote { segment, id } => write!(f, "{id}@{segment}"),
        }
    }
}
