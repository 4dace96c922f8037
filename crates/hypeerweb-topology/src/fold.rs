//! Fold-state policy.
//!
//! A node's fold is the complement of its identifier inside the window of the
//! larger of the two heights. While a sub-hypercube is incomplete that
//! complement may not exist yet; the node then holds a surrogate fold to the
//! complement's parent, which holds the inverse pointer.
//!
//! The state is read off the parent at child-creation time:
//!
//! - **Stable**: the parent holds no inverse surrogate fold. The child takes
//!   over the parent's fold and the parent falls back to a surrogate fold on
//!   that same node.
//! - **Unstable**: the parent holds an inverse surrogate fold. The node
//!   pointing at the parent becomes the child's true fold and both surrogate
//!   pointers disappear.
//!
//! Disconnection replays the matching transition backwards.

use tracing::trace;

use crate::error::{Error, Result};
use crate::rewrite::Rewrite;
use crate::{Node, WebId};

/// Fold configuration of a parent about to create (or lose) a child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoldState {
    Stable,
    Unstable,
}

impl FoldState {
    /// State selected for a parent about to create a child.
    pub fn of(parent: &Node) -> Self {
        if parent.links().inverse_surrogate_fold.is_some() {
            FoldState::Unstable
        } else {
            FoldState::Stable
        }
    }

    /// State that produced the current relation between a parent and the
    /// child it is about to lose.
    ///
    /// A stable creation left the parent with a surrogate fold; an unstable
    /// one never does.
    pub fn before_removal(parent: &Node) -> Self {
        if parent.links().surrogate_fold.is_some() {
            FoldState::Stable
        } else {
            FoldState::Unstable
        }
    }
}

/// Rewrite folds after `child` was created under `parent`.
pub(crate) fn on_child_created(rw: &mut Rewrite<'_>, parent: WebId, child: WebId) -> Result<()> {
    let state = FoldState::of(rw.node(parent)?);
    trace!(%parent, %child, ?state, "fold transition");

    match state {
        FoldState::Stable => {
            let fold = rw
                .node(parent)?
                .links()
                .fold
                .ok_or_else(|| Error::structural(format!("parent {parent} has no fold")))?;
            rw.node_mut(parent)?.links_mut().fold = None;
            rw.link_folds(child, fold)?;
            rw.link_surrogate_fold(parent, fold)?;
        }
        FoldState::Unstable => {
            let isf = rw
                .node(parent)?
                .links()
                .inverse_surrogate_fold
                .ok_or_else(|| Error::structural(format!("parent {parent} lost its inverse surrogate fold")))?;
            rw.unlink_surrogate_fold(isf, parent)?;
            rw.link_folds(child, isf)?;
        }
    }
    Ok(())
}

/// Rewrite folds before `child` is detached from `parent`.
pub(crate) fn on_child_removed(rw: &mut Rewrite<'_>, parent: WebId, child: WebId) -> Result<()> {
    let fold = rw
        .node(child)?
        .links()
        .fold
        .ok_or_else(|| Error::structural(format!("node {child} has no fold to hand back")))?;
    let state = FoldState::before_removal(rw.node(parent)?);
    trace!(%parent, %child, %fold, ?state, "reverse fold transition");

    rw.node_mut(child)?.links_mut().fold = None;
    match state {
        FoldState::Stable => {
            rw.unlink_surrogate_fold(parent, fold)?;
            rw.link_folds(parent, fold)?;
        }
        FoldState::Unstable => {
            rw.node_mut(fold)?.links_mut().fold = None;
            rw.link_surrogate_fold(fold, parent)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn pair() -> BTreeMap<WebId, Node> {
        let mut zero = Node::new(WebId(0), 1);
        let mut one = Node::new(WebId(1), 1);
        zero.links_mut().fold = Some(WebId(1));
        one.links_mut().fold = Some(WebId(0));
        BTreeMap::from([(WebId(0), zero), (WebId(1), one)])
    }

    #[test]
    fn stable_parent_hands_over_fold() {
        let nodes = pair();
        let mut rw = Rewrite::new(&nodes);
        rw.create(Node::new(WebId(2), 2));
        on_child_created(&mut rw, WebId(0), WebId(2)).unwrap();

        let zero = rw.node(WebId(0)).unwrap().links().clone();
        let one = rw.node(WebId(1)).unwrap().links().clone();
        let two = rw.node(WebId(2)).unwrap().links().clone();
        assert_eq!(zero.fold, None);
        assert_eq!(zero.surrogate_fold, Some(WebId(1)));
        assert_eq!(one.fold, Some(WebId(2)));
        assert_eq!(one.inverse_surrogate_fold, Some(WebId(0)));
        assert_eq!(two.fold, Some(WebId(1)));
    }

    #[test]
    fn unstable_parent_resolves_surrogate() {
        let nodes = pair();
        let mut rw = Rewrite::new(&nodes);
        rw.create(Node::new(WebId(2), 2));
        on_child_created(&mut rw, WebId(0), WebId(2)).unwrap();
        rw.create(Node::new(WebId(3), 2));

        assert_eq!(FoldState::of(rw.node(WebId(1)).unwrap()), FoldState::Unstable);
        on_child_created(&mut rw, WebId(1), WebId(3)).unwrap();

        let zero = rw.node(WebId(0)).unwrap().links().clone();
        let one = rw.node(WebId(1)).unwrap().links().clone();
        assert_eq!(zero.fold, Some(WebId(3)));
        assert_eq!(zero.surrogate_fold, None);
        assert_eq!(one.inverse_surrogate_fold, None);
        assert_eq!(one.fold, Some(WebId(2)));
    }

    #[test]
    fn removal_replays_stable_transition() {
        let nodes = pair();
        let mut rw = Rewrite::new(&nodes);
        rw.create(Node::new(WebId(2), 2));
        on_child_created(&mut rw, WebId(0), WebId(2)).unwrap();

        assert_eq!(FoldState::before_removal(rw.node(WebId(0)).unwrap()), FoldState::Stable);
        on_child_removed(&mut rw, WebId(0), WebId(2)).unwrap();

        assert_eq!(rw.node(WebId(0)).unwrap().links(), nodes[&WebId(0)].links());
        assert_eq!(rw.node(WebId(1)).unwrap().links(), nodes[&WebId(1)].links());
    }

    #[test]
    fn missing_fold_is_structural() {
        let nodes = BTreeMap::from([(WebId(0), Node::new(WebId(0), 1))]);
        let mut rw = Rewrite::new(&nodes);
        rw.create(Node::new(WebId(2), 2));
        let err = on_child_created(&mut rw, WebId(0), WebId(2)).unwrap_err();
        assert!(matches!(err, Error::StructuralFailure(_)));
    }
}
