//! Property tests over randomly grown and shrunk webs.

use std::collections::BTreeSet;

use hypeerweb_topology::{HyPeerWeb, Node, Outcome, Relabel, Validator, WebId};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn grow(size: usize, seed: u64) -> (HyPeerWeb, StdRng) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut web = HyPeerWeb::new();
    for _ in 0..size {
        web.insert(&mut rng).expect("insert");
    }
    (web, rng)
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        .. ProptestConfig::default()
    })]

    #[test]
    fn every_insertion_keeps_the_web_valid(size in 1usize..90, seed in any::<u64>()) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut web = HyPeerWeb::new();
        for expected in 0..size as u64 {
            let id = web.insert(&mut rng).expect("insert");
            prop_assert_eq!(id, WebId(expected));
            let report = Validator::check(&web.snapshot());
            prop_assert!(report.is_valid(), "after {} insertions: {:?}", expected + 1, report.violations);
        }
    }

    #[test]
    fn removing_everything_in_any_order_empties_the_web(
        order in (1usize..48).prop_flat_map(|size| Just((0..size).collect::<Vec<_>>()).prop_shuffle()),
        seed in any::<u64>(),
    ) {
        let (mut web, mut rng) = grow(order.len(), seed);
        // positions index the current population, so a removal always
        // names a live node
        for position in order {
            let id = WebId((position % web.len()) as u64);
            web.remove(&mut rng, id).expect("remove");
            let report = Validator::check(&web.snapshot());
            prop_assert!(report.is_valid(), "after removing {}: {:?}", id, report.violations);
        }
        prop_assert!(web.is_empty());
    }

    #[test]
    fn relabel_carries_attributes(size in 3usize..40, seed in any::<u64>(), pick in any::<prop::sample::Index>()) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut web = HyPeerWeb::new();
        for i in 0..size {
            let attributes = [("name".to_string(), format!("n{i}"))].into();
            web.insert_with(&mut rng, attributes).expect("insert");
        }
        let departing = WebId(pick.index(size) as u64);
        let cap = WebId(size as u64 - 1);
        let outcome = web.remove(&mut rng, departing).expect("remove");

        let relabeled = (departing != cap).then_some(Relabel { from: cap, to: departing });
        prop_assert_eq!(outcome, Outcome::Removed { removed: departing, relabeled });
        if departing != cap {
            let name = web.node(departing).expect("relabeled node").attributes()["name"].clone();
            prop_assert_eq!(name, format!("n{}", size - 1));
        }
    }

    #[test]
    fn routes_find_every_present_identifier(size in 1usize..70, seed in any::<u64>(), from in any::<prop::sample::Index>(), to in any::<prop::sample::Index>()) {
        let (web, _) = grow(size, seed);
        let from = WebId(from.index(size) as u64);
        let to = WebId(to.index(size) as u64);
        let outcome = web.route(from, to).expect("route");
        prop_assert_eq!(outcome.found, Some(to));
        prop_assert_eq!(outcome.terminal, to);
    }

    #[test]
    fn routes_miss_absent_identifiers(size in 1usize..70, seed in any::<u64>(), from in any::<prop::sample::Index>(), offset in 0u64..1_000_000) {
        let (web, _) = grow(size, seed);
        let from = WebId(from.index(size) as u64);
        let absent = WebId(size as u64 + offset);
        let outcome = web.route(from, absent).expect("route");
        prop_assert!(!outcome.is_hit());
        prop_assert!(web.contains(outcome.terminal));
    }

    #[test]
    fn broadcast_visits_each_node_once(size in 1usize..70, seed in any::<u64>(), from in any::<prop::sample::Index>()) {
        let (web, _) = grow(size, seed);
        let from = WebId(from.index(size) as u64);
        let mut seen = Vec::new();
        let count = web.broadcast(from, &mut |node: &Node| seen.push(node.id())).expect("broadcast");
        let unique: BTreeSet<_> = seen.iter().copied().collect();
        prop_assert_eq!(count, size);
        prop_assert_eq!(seen.len(), size);
        prop_assert_eq!(unique.len(), size);
    }

    #[test]
    fn fold_relations_are_reciprocal(size in 2usize..90, seed in any::<u64>()) {
        let (web, _) = grow(size, seed);
        for node in web.ordered_nodes() {
            let links = node.links();
            if let Some(fold) = links.fold {
                prop_assert_eq!(web.node(fold).expect("fold").links().fold, Some(node.id()));
            }
            if let Some(surrogate) = links.surrogate_fold {
                prop_assert_eq!(
                    web.node(surrogate).expect("surrogate fold").links().inverse_surrogate_fold,
                    Some(node.id())
                );
            }
            if let Some(inverse) = links.inverse_surrogate_fold {
                prop_assert_eq!(
                    web.node(inverse).expect("inverse surrogate fold").links().surrogate_fold,
                    Some(node.id())
                );
            }
        }
    }
}

#[test]
fn small_web_walkthrough() {
    let mut rng = StdRng::seed_from_u64(99);
    let mut web = HyPeerWeb::new();

    assert_eq!(web.insert(&mut rng).unwrap(), WebId(0));
    let origin = web.node(WebId(0)).unwrap();
    assert_eq!(origin.height(), 0);
    assert!(origin.links().is_empty());

    assert_eq!(web.insert(&mut rng).unwrap(), WebId(1));
    for (id, other) in [(0, 1), (1, 0)] {
        let links = web.node(WebId(id)).unwrap().links();
        assert_eq!(web.node(WebId(id)).unwrap().height(), 1);
        assert_eq!(links.fold, Some(WebId(other)));
        assert!(links.neighbors.contains(&WebId(other)));
    }

    assert_eq!(web.insert(&mut rng).unwrap(), WebId(0b10));
    assert!(web.validate());

    web.remove(&mut rng, WebId(0)).unwrap();
    assert_eq!(web.len(), 2);
    assert!(web.validate());
    for (id, other) in [(0, 1), (1, 0)] {
        let node = web.node(WebId(id)).unwrap();
        assert_eq!(node.height(), 1);
        assert_eq!(node.links().fold, Some(WebId(other)));
    }
}
