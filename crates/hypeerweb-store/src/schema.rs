//! Row layout.

use std::collections::BTreeMap;

use hypeerweb_topology::{Attributes, Links, Node, WebId};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub(crate) const NODE_PREFIX: &str = "node:";
pub(crate) const NEIGHBOR_PREFIX: &str = "nbr:";
pub(crate) const SURROGATE_PREFIX: &str = "snbr:";

/// Node table row: everything but the relation sets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRow {
    pub id: WebId,
    pub height: u32,
    pub fold: Option<WebId>,
    pub surrogate_fold: Option<WebId>,
    pub inverse_surrogate_fold: Option<WebId>,
    #[serde(default)]
    pub attributes: Attributes,
}

impl NodeRow {
    pub fn of(node: &Node) -> Self {
        let links = node.links();
        Self {
            id: node.id(),
            height: node.height(),
            fold: links.fold,
            surrogate_fold: links.surrogate_fold,
            inverse_surrogate_fold: links.inverse_surrogate_fold,
            attributes: node.attributes().clone(),
        }
    }
}

// Zero-padded so lexical key order is identifier order.
pub(crate) fn node_key(id: WebId) -> String {
    format!("{NODE_PREFIX}{:020}", id.value())
}

pub(crate) fn neighbor_key(a: WebId, b: WebId) -> String {
    format!("{NEIGHBOR_PREFIX}{:020}:{:020}", a.value(), b.value())
}

pub(crate) fn surrogate_key(holder: WebId, target: WebId) -> String {
    format!("{SURROGATE_PREFIX}{:020}:{:020}", holder.value(), target.value())
}

/// Split the identifier pair out of a relation key.
pub(crate) fn parse_pair(key: &[u8], prefix: &str) -> Result<(WebId, WebId)> {
    let text = std::str::from_utf8(key).map_err(|_| Error::Corrupt("non-utf8 relation key".into()))?;
    let rest = text
        .strip_prefix(prefix)
        .ok_or_else(|| Error::Corrupt(format!("unexpected key {text}")))?;
    let (a, b) = rest
        .split_once(':')
        .ok_or_else(|| Error::Corrupt(format!("malformed relation key {text}")))?;
    let parse = |part: &str| {
        part.parse::<u64>()
            .map(WebId)
            .map_err(|_| Error::Corrupt(format!("malformed identifier in {text}")))
    };
    Ok((parse(a)?, parse(b)?))
}

/// Rebuild full nodes from rows.
///
/// Neighbor pairs are expected in both directions. Inverse surrogate
/// neighbors are derived from the surrogate-neighbor pairs.
pub fn assemble(
    rows: impl IntoIterator<Item = NodeRow>,
    neighbors: impl IntoIterator<Item = (WebId, WebId)>,
    surrogates: impl IntoIterator<Item = (WebId, WebId)>,
) -> Result<Vec<Node>> {
    let mut parts: BTreeMap<WebId, (NodeRow, Links)> = rows
        .into_iter()
        .map(|row| {
            let links = Links {
                fold: row.fold,
                surrogate_fold: row.surrogate_fold,
                inverse_surrogate_fold: row.inverse_surrogate_fold,
                ..Links::default()
            };
            (row.id, (row, links))
        })
        .collect();

    for (a, b) in neighbors {
        if !parts.contains_key(&b) {
            return Err(Error::Corrupt(format!("neighbor row {a}-{b} names a missing node")));
        }
        let (_, links) = parts
            .get_mut(&a)
            .ok_or_else(|| Error::Corrupt(format!("neighbor row {a}-{b} names a missing node")))?;
        links.neighbors.insert(b);
    }

    for (holder, target) in surrogates {
        let (_, links) = parts
            .get_mut(&holder)
            .ok_or_else(|| Error::Corrupt(format!("surrogate row {holder}-{target} names a missing holder")))?;
        links.surrogate_neighbors.insert(target);
        let (_, links) = parts
            .get_mut(&target)
            .ok_or_else(|| Error::Corrupt(format!("surrogate row {holder}-{target} names a missing target")))?;
        links.inverse_surrogate_neighbors.insert(holder);
    }

    Ok(parts
        .into_values()
        .map(|(row, links)| Node::from_parts(row.id, row.height, links, row.attributes))
        .collect())
}
