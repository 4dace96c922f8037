//! Location of insertion and disconnection points.
//!
//! Identifiers are always contiguous, `0..n`, so both points are fixed by
//! the population:
//!
//! - the **cap** (`n - 1`, the highest identifier) is the only node that can
//!   be detached without leaving a hole;
//! - the **insertion point** is the parent of the next identifier `n`, i.e.
//!   the lowest identifier among the nodes of minimal height.
//!
//! Neither is known locally, so both are found by walking from wherever the
//! caller starts:
//!
//! - the cap search climbs to ever taller (then higher) relations until it
//!   stands on a node of the greatest height `H`, routes to `2^(H-1)`, the
//!   lowest node of the upper half, and from there follows the highest
//!   neighbor until none is higher;
//! - the insertion search descends through surrogate folds, surrogate
//!   neighbors and lower neighbors to a node of minimal height, locates the
//!   cap from there and routes to the parent of `cap + 1`.
//!
//! Each candidate is confirmed against its [`Criteria`]; if the
//! confirmation fails a bounded recursive search over neighbors takes over.

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::{HyPeerWeb, Node, RouteOutcome, SendVisitor, WebId};

/// Default depth of the recursive fallback search.
pub const DEFAULT_FALLBACK_DEPTH: usize = 2;

/// Tuning for insertion and disconnection searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchConfig {
    /// Levels of neighbors explored when a located candidate fails its
    /// criterion. Chosen empirically.
    pub fallback_depth: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            fallback_depth: DEFAULT_FALLBACK_DEPTH,
        }
    }
}

impl SearchConfig {
    #[must_use]
    pub fn with_fallback_depth(mut self, depth: usize) -> Self {
        self.fallback_depth = depth;
        self
    }
}

/// What a search is looking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Criteria {
    /// A node that can take a child: its child slot is vacant and no relation
    /// is lower than it.
    Insert,
    /// A node that can be detached: no relation is higher and no neighbor has
    /// a greater identifier.
    Disconnect,
}

impl Criteria {
    /// Whether `node` satisfies this criterion.
    pub fn matches(self, web: &HyPeerWeb, node: &Node) -> bool {
        let related = node.links().all();
        let heights = related.iter().filter_map(|id| web.get_node(*id)).map(Node::height);
        match self {
            Criteria::Insert => {
                !web.contains(node.child_id()) && heights.into_iter().all(|h| h >= node.height())
            }
            Criteria::Disconnect => {
                let higher_neighbor = node
                    .links()
                    .highest_neighbor()
                    .is_some_and(|n| n > node.id());
                !higher_neighbor && heights.into_iter().all(|h| h <= node.height())
            }
        }
    }

    /// Accept `candidate` or search its neighborhood up to the configured depth.
    pub fn confirm(self, web: &HyPeerWeb, candidate: WebId, config: &SearchConfig) -> Result<WebId> {
        if let Some(found) = self.search(web, candidate, config.fallback_depth) {
            if found != candidate {
                warn!(criteria = ?self, %candidate, %found, "candidate rejected, fallback search succeeded");
            }
            return Ok(found);
        }
        Err(Error::structural(format!(
            "no {self:?} point within {} levels of node {candidate}",
            config.fallback_depth
        )))
    }

    fn search(self, web: &HyPeerWeb, id: WebId, depth: usize) -> Option<WebId> {
        let node = web.get_node(id)?;
        if self.matches(web, node) {
            return Some(id);
        }
        if depth == 0 {
            return None;
        }
        self.fallback_candidates(web, node)
            .into_iter()
            .find_map(|next| self.search(web, next, depth - 1))
    }

    fn fallback_candidates(self, web: &HyPeerWeb, node: &Node) -> Vec<WebId> {
        let links = node.links();
        let pool = links
            .neighbors
            .iter()
            .chain(&links.surrogate_neighbors)
            .chain(&links.inverse_surrogate_neighbors)
            .filter_map(|id| web.get_node(*id));
        match self {
            Criteria::Insert => pool
                .filter(|n| n.height() < node.height() || n.id() < node.id())
                .map(Node::id)
                .collect(),
            Criteria::Disconnect => pool
                .filter(|n| n.height() > node.height() || n.id() > node.id())
                .map(Node::id)
                .rev()
                .collect(),
        }
    }
}

/// Path of a search walk.
struct Walk {
    current: WebId,
    path: Vec<WebId>,
}

impl Walk {
    fn new(start: WebId) -> Self {
        Self {
            current: start,
            path: vec![start],
        }
    }

    fn step(&mut self, next: WebId) {
        if next != self.current {
            self.path.push(next);
            self.current = next;
        }
    }

    /// Route to `target`, which must exist.
    fn route(&mut self, web: &HyPeerWeb, target: WebId) -> Result<()> {
        let outcome = SendVisitor::new(target).visit(web, self.current)?;
        let found = outcome
            .found
            .ok_or_else(|| Error::structural(format!("node {target} unreachable from {}", self.current)))?;
        self.path.extend(outcome.path.into_iter().skip(1));
        self.current = found;
        Ok(())
    }

    /// Append another walk that starts where this one stands.
    fn follow(&mut self, other: RouteOutcome) {
        self.path.extend(other.path.into_iter().skip(1));
        self.current = other.terminal;
    }

    fn finish(self) -> RouteOutcome {
        RouteOutcome {
            found: Some(self.current),
            terminal: self.current,
            path: self.path,
        }
    }
}

/// Move to the tallest relation, highest identifier first, while it beats
/// the current node on (height, identifier).
///
/// Stops on a node of the greatest height in the web: a shorter node always
/// has a taller or higher relation.
fn climb(web: &HyPeerWeb, walk: &mut Walk) -> Result<()> {
    loop {
        let node = web.node(walk.current)?;
        let best = node
            .links()
            .all()
            .into_iter()
            .filter_map(|id| web.get_node(id))
            .map(|n| (n.height(), n.id()))
            .max();
        match best {
            Some((height, id)) if (height, id) > (node.height(), node.id()) => walk.step(id),
            _ => return Ok(()),
        }
    }
}

/// Follow the highest neighbor while it is higher than the current node.
fn ascend_neighbors(web: &HyPeerWeb, walk: &mut Walk) -> Result<()> {
    loop {
        let node = web.node(walk.current)?;
        match node.links().highest_neighbor().filter(|n| *n > node.id()) {
            Some(next) => walk.step(next),
            None => return Ok(()),
        }
    }
}

/// Walk down to a node of minimal height: through the surrogate fold, else
/// the lowest surrogate neighbor, else the lowest shorter neighbor.
///
/// Height strictly decreases on every step.
fn descend(web: &HyPeerWeb, walk: &mut Walk) -> Result<()> {
    loop {
        let node = web.node(walk.current)?;
        let height = node.height();
        let shorter = |id: &WebId| web.get_node(*id).is_some_and(|n| n.height() < height);
        let links = node.links();
        let next = links
            .surrogate_fold
            .filter(shorter)
            .or_else(|| links.surrogate_neighbors.iter().copied().find(shorter))
            .or_else(|| links.neighbors.iter().copied().find(shorter));
        match next {
            Some(next) => walk.step(next),
            None => return Ok(()),
        }
    }
}

/// Locate the cap node, starting anywhere.
///
/// The returned outcome carries every node the search passed through.
pub fn find_cap(web: &HyPeerWeb, start: WebId, config: &SearchConfig) -> Result<RouteOutcome> {
    let mut walk = Walk::new(start);
    climb(web, &mut walk)?;

    let top = web.node(walk.current)?.height();
    if top > 0 {
        walk.route(web, WebId(1 << (top - 1)))?;
    }
    ascend_neighbors(web, &mut walk)?;

    let cap = Criteria::Disconnect.confirm(web, walk.current, config)?;
    walk.step(cap);
    debug!(%start, %cap, hops = walk.path.len() - 1, "located cap");
    Ok(walk.finish())
}

/// Locate the insertion point, starting anywhere.
///
/// The returned outcome carries every node the search passed through.
pub fn find_insertion_point(web: &HyPeerWeb, start: WebId, config: &SearchConfig) -> Result<RouteOutcome> {
    let mut walk = Walk::new(start);
    descend(web, &mut walk)?;

    let cap = find_cap(web, walk.current, config)?;
    let next = WebId(cap.terminal.value() + 1);
    walk.follow(cap);
    walk.route(web, next.parent().unwrap_or(WebId::ZERO))?;

    let parent = Criteria::Insert.confirm(web, walk.current, config)?;
    walk.step(parent);
    debug!(%start, %parent, hops = walk.path.len() - 1, "located insertion point");
    Ok(walk.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn web_of(size: usize) -> HyPeerWeb {
        let mut rng = StdRng::seed_from_u64(3);
        let mut web = HyPeerWeb::new();
        for _ in 0..size {
            web.insert(&mut rng).unwrap();
        }
        web
    }

    #[test]
    fn cap_is_highest_identifier_from_every_start() {
        let config = SearchConfig::default();
        for size in 2..40u64 {
            let web = web_of(size as usize);
            for start in 0..size {
                let search = find_cap(&web, WebId(start), &config).unwrap();
                assert_eq!(search.terminal, WebId(size - 1), "web of {size} from {start}");
                assert_eq!(search.path.first(), Some(&WebId(start)));
                assert_eq!(search.path.last(), Some(&search.terminal));
            }
        }
    }

    #[test]
    fn insertion_point_is_parent_of_next_identifier_from_every_start() {
        let config = SearchConfig::default();
        for size in 2..40u64 {
            let web = web_of(size as usize);
            for start in 0..size {
                let search = find_insertion_point(&web, WebId(start), &config).unwrap();
                assert_eq!(Some(search.terminal), WebId(size).parent(), "web of {size} from {start}");
                assert_eq!(search.path.first(), Some(&WebId(start)));
            }
        }
    }

    #[test]
    fn insertion_point_of_full_cube_is_origin() {
        let web = web_of(8);
        let search = find_insertion_point(&web, WebId(5), &SearchConfig::default()).unwrap();
        assert_eq!(search.terminal, WebId(0));
    }

    #[test]
    fn searches_stay_clear_of_origin() {
        // 13 nodes: cap 12, insertion point 5, neither walk needs node 0
        let web = web_of(13);
        let config = SearchConfig::default();

        let cap = find_cap(&web, WebId(11), &config).unwrap();
        assert_eq!(cap.terminal, WebId(12));
        assert!(!cap.path.contains(&WebId::ZERO), "{:?}", cap.path);

        let parent = find_insertion_point(&web, WebId(11), &config).unwrap();
        assert_eq!(parent.terminal, WebId(5));
        assert!(!parent.path.contains(&WebId::ZERO), "{:?}", parent.path);
    }

    #[test]
    fn upper_half_starts_avoid_origin() {
        let web = web_of(27);
        let config = SearchConfig::default();
        for start in 16..27 {
            let path = find_cap(&web, WebId(start), &config).unwrap().path;
            assert!(!path.contains(&WebId::ZERO), "from {start}: {path:?}");
        }
    }

    #[test]
    fn criteria_match_expected_nodes() {
        // 0..6: heights 3,3,2,2,3,3
        let web = web_of(6);
        assert!(Criteria::Insert.matches(&web, web.node(WebId(2)).unwrap()));
        assert!(!Criteria::Insert.matches(&web, web.node(WebId(0)).unwrap()));
        assert!(Criteria::Disconnect.matches(&web, web.node(WebId(5)).unwrap()));
        assert!(!Criteria::Disconnect.matches(&web, web.node(WebId(4)).unwrap()));
    }

    #[test]
    fn fallback_search_recovers_nearby_candidate() {
        let web = web_of(6);
        let config = SearchConfig::default();
        // 4 is one neighbor hop below the cap
        assert_eq!(Criteria::Disconnect.confirm(&web, WebId(4), &config).unwrap(), WebId(5));
    }

    #[test]
    fn zero_depth_rejects_wrong_candidate() {
        let web = web_of(6);
        let config = SearchConfig::default().with_fallback_depth(0);
        let err = Criteria::Disconnect.confirm(&web, WebId(4), &config).unwrap_err();
        assert!(matches!(err, Error::StructuralFailure(_)));
    }
}
