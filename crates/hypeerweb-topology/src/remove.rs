//! Node removal.
//!
//! Only the cap (the highest identifier) can leave without opening a hole in
//! the identifier range. Removing any other node therefore disconnects the
//! cap and moves the cap's payload into the departing identifier's slot.

use rand::Rng;
use tracing::debug;

use crate::criteria::{find_cap, SearchConfig};
use crate::error::{Error, Result};
use crate::fold;
use crate::rewrite::{Changeset, Outcome, Relabel, Rewrite};
use crate::web::{HyPeerWeb, Population};
use crate::{Node, WebId};

pub(crate) fn plan<R: Rng + ?Sized>(
    web: &HyPeerWeb,
    rng: &mut R,
    departing: WebId,
    config: &SearchConfig,
) -> Result<Changeset> {
    if web.is_empty() {
        return Err(Error::EmptyWeb);
    }
    web.node(departing)?;
    match web.population() {
        Population::Empty => Err(Error::EmptyWeb),
        Population::Single => {
            let mut rw = Rewrite::new(web.arena());
            rw.delete(departing)?;
            Ok(rw.finish(Outcome::Removed {
                removed: departing,
                relabeled: None,
            }))
        }
        Population::Pair => collapse(web, departing),
        Population::Many => {
            let start = web.random_node(rng)?;
            let cap = find_cap(web, start, config)?.terminal;
            replace(web, departing, cap)
        }
    }
}

/// Two nodes become one: the survivor turns into a lone origin.
fn collapse(web: &HyPeerWeb, departing: WebId) -> Result<Changeset> {
    let survivor = if departing == WebId::ZERO {
        WebId::new(1)
    } else {
        WebId::ZERO
    };

    let mut rw = Rewrite::new(web.arena());
    rw.delete(departing)?;
    let mut kept = rw.delete(survivor)?;

    let mut origin = Node::new(WebId::ZERO, 0);
    origin.set_attributes(kept.take_attributes());
    rw.create(origin);

    let relabeled = (survivor != WebId::ZERO).then_some(Relabel {
        from: survivor,
        to: WebId::ZERO,
    });
    debug!(%departing, %survivor, "collapsed to a single node");
    Ok(rw.finish(Outcome::Removed {
        removed: departing,
        relabeled,
    }))
}

/// Disconnect `cap`, then let it take over `departing`'s identifier.
fn replace(web: &HyPeerWeb, departing: WebId, cap: WebId) -> Result<Changeset> {
    let mut rw = Rewrite::new(web.arena());
    let mut detached = disconnect(&mut rw, cap)?;

    let relabeled = if departing == cap {
        None
    } else {
        let attributes = detached.take_attributes();
        rw.node_mut(departing)?.set_attributes(attributes);
        Some(Relabel {
            from: cap,
            to: departing,
        })
    };

    debug!(%departing, %cap, "planned removal");
    Ok(rw.finish(Outcome::Removed {
        removed: departing,
        relabeled,
    }))
}

/// Detach the cap from every relation and delete it, undoing the insertion
/// that created it.
fn disconnect(rw: &mut Rewrite<'_>, cap: WebId) -> Result<Node> {
    let node = rw.node(cap)?.clone();
    let links = node.links();
    if !links.inverse_surrogate_neighbors.is_empty()
        || links.surrogate_fold.is_some()
        || links.inverse_surrogate_fold.is_some()
    {
        return Err(Error::structural(format!(
            "node {cap} is not detachable: it still anchors surrogate relations"
        )));
    }
    let parent = node
        .parent()
        .ok_or_else(|| Error::structural(format!("node {cap} has no parent")))?;

    fold::on_child_removed(rw, parent, cap)?;

    rw.unlink_neighbors(parent, cap)?;
    let height = rw.node(parent)?.height();
    rw.node_mut(parent)?.set_height(height.saturating_sub(1));

    for &lower in &links.surrogate_neighbors {
        rw.unlink_surrogate_neighbor(cap, lower)?;
    }
    for &neighbor in links.neighbors.iter().filter(|n| **n != parent) {
        rw.unlink_neighbors(neighbor, cap)?;
        rw.link_surrogate_neighbor(neighbor, parent)?;
    }

    rw.delete(cap)
}
