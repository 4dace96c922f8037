//! Node insertion.
//!
//! A parent `P` of height `h` creates the child `C = P | 2^h` of height
//! `h + 1`. The relation rewrite:
//!
//! 1. every inverse surrogate neighbor of `P` drops its surrogate pointer to
//!    `P` and becomes a neighbor of `C`;
//! 2. every neighbor of `P` lower than `h + 1` becomes a surrogate neighbor of
//!    `C` (and holds `C` as inverse surrogate neighbor);
//! 3. `P` and `C` become neighbors and `P` grows to height `h + 1`;
//! 4. the fold-state transition runs on `P` and `C`.

use rand::Rng;
use tracing::debug;

use crate::criteria::{find_insertion_point, SearchConfig};
use crate::error::{Error, Result};
use crate::fold;
use crate::rewrite::{Changeset, Outcome, Rewrite};
use crate::web::{HyPeerWeb, Population};
use crate::{web_id, Attributes, Node, SendVisitor, WebId};

pub(crate) fn plan<R: Rng + ?Sized>(
    web: &HyPeerWeb,
    rng: &mut R,
    attributes: Attributes,
    config: &SearchConfig,
) -> Result<Changeset> {
    match web.population() {
        Population::Empty => Ok(bootstrap(web, attributes)),
        Population::Single => second(web, attributes),
        Population::Pair | Population::Many => {
            let start = web.random_node(rng)?;
            let landing = spread(web, start, rng)?;
            let parent = find_insertion_point(web, landing, config)?.terminal;
            grow(web, parent, attributes)
        }
    }
}

/// The origin node, alone.
fn bootstrap(web: &HyPeerWeb, attributes: Attributes) -> Changeset {
    let mut rw = Rewrite::new(web.arena());
    let mut origin = Node::new(WebId::ZERO, 0);
    origin.set_attributes(attributes);
    rw.create(origin);
    rw.finish(Outcome::Inserted(WebId::ZERO))
}

/// Node 1: mutual neighbor and fold of the origin.
fn second(web: &HyPeerWeb, attributes: Attributes) -> Result<Changeset> {
    let mut rw = Rewrite::new(web.arena());
    let one = WebId::new(1);
    let mut node = Node::new(one, 1);
    node.set_attributes(attributes);
    rw.create(node);
    rw.node_mut(WebId::ZERO)?.set_height(1);
    rw.link_neighbors(WebId::ZERO, one)?;
    rw.link_folds(WebId::ZERO, one)?;
    Ok(rw.finish(Outcome::Inserted(one)))
}

/// Route toward a pseudo-random identifier so searches start from a
/// well-distributed node rather than always the same one.
fn spread<R: Rng + ?Sized>(web: &HyPeerWeb, start: WebId, rng: &mut R) -> Result<WebId> {
    let height = web.node(start)?.height();
    let target = WebId(rng.gen::<u64>() & web_id::mask(height));
    Ok(SendVisitor::new(target).visit(web, start)?.terminal)
}

/// Create the child of `parent`.
pub(crate) fn grow(web: &HyPeerWeb, parent: WebId, attributes: Attributes) -> Result<Changeset> {
    let mut rw = Rewrite::new(web.arena());
    let before = rw.node(parent)?.clone();
    let height = before.height();
    let child = before.child_id();
    if rw.contains(child) {
        return Err(Error::structural(format!(
            "child slot {child} of {parent} is already taken"
        )));
    }

    let mut node = Node::new(child, height + 1);
    node.set_attributes(attributes);
    rw.create(node);

    for &upper in &before.links().inverse_surrogate_neighbors {
        rw.unlink_surrogate_neighbor(upper, parent)?;
        rw.link_neighbors(upper, child)?;
    }

    for &neighbor in &before.links().neighbors {
        if rw.node(neighbor)?.height() < height + 1 {
            rw.link_surrogate_neighbor(child, neighbor)?;
        }
    }

    rw.link_neighbors(parent, child)?;
    rw.node_mut(parent)?.set_height(height + 1);
    fold::on_child_created(&mut rw, parent, child)?;

    debug!(%parent, %child, height = height + 1, "planned insertion");
    Ok(rw.finish(Outcome::Inserted(child)))
}
