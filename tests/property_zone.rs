//! Property tests for chain lookup, nested restoration, binding, and
//! panic containment.

mod common;

use common::{init_test_logging, test_proptest_config};
use proptest::prelude::*;
use std::collections::BTreeMap;
use zonal::{Extensions, PanicResponse, Zone};

// ============================================================================
// Helpers
// ============================================================================

/// Forks a chain of zones below the current zone, one level per map.
fn fork_chain(levels: &[BTreeMap<String, u64>]) -> Vec<Zone> {
    let mut zones = Vec::with_capacity(levels.len());
    let mut parent = Zone::current();
    for level in levels {
        let mut ext = Extensions::new();
        for (key, value) in level {
            ext = ext.with_value(key.clone(), *value);
        }
        let child = parent.fork(ext);
        zones.push(child.clone());
        parent = child;
    }
    zones
}

/// The view each level should see: its own entries over everything above.
fn expected_views(levels: &[BTreeMap<String, u64>]) -> Vec<BTreeMap<String, u64>> {
    let mut views = Vec::with_capacity(levels.len());
    let mut merged = BTreeMap::new();
    for level in levels {
        for (key, value) in level {
            merged.insert(key.clone(), *value);
        }
        views.push(merged.clone());
    }
    views
}

/// Enters `remaining` nested zones and checks the cell on the way back
/// out. A violated check panics inside some enclosing run and surfaces
/// as a `None` result at the level above.
fn descend(remaining: usize) {
    let here = Zone::current().id();
    if remaining > 0 {
        let child = Zone::current().fork(Extensions::new());
        let inside = child.run(|| {
            descend(remaining - 1);
            Zone::current().id()
        });
        assert_eq!(inside, Some(child.id()));
    }
    assert_eq!(Zone::current().id(), here);
}

// ============================================================================
// Chain Lookup
// ============================================================================

proptest! {
    #![proptest_config(test_proptest_config(128))]

    /// Every zone in a fork chain sees, for each key, the value set by
    /// the nearest zone at or above it, and nothing for unset keys.
    #[test]
    fn chain_lookup_prefers_the_nearest_ancestor(
        levels in prop::collection::vec(
            prop::collection::btree_map("[a-d]", any::<u64>(), 0..=3),
            0..=5,
        ),
    ) {
        init_test_logging();
        let zones = fork_chain(&levels);
        let views = expected_views(&levels);
        for (zone, view) in zones.iter().zip(&views) {
            for key in ["a", "b", "c", "d"] {
                let actual = zone.value(key).and_then(|v| v.as_uint());
                prop_assert_eq!(actual, view.get(key).copied());
            }
        }
    }

    /// `descends_from` is exactly "strictly below in the fork chain".
    #[test]
    fn descent_follows_the_fork_chain(depth in 2usize..=6) {
        init_test_logging();
        let mut chain = vec![Zone::current()];
        for _ in 0..depth {
            let next = chain.last().unwrap().fork(Extensions::new());
            chain.push(next);
        }
        for (i, ancestor) in chain.iter().enumerate() {
            for (j, descendant) in chain.iter().enumerate() {
                prop_assert_eq!(descendant.descends_from(ancestor), j > i);
            }
        }
    }
}

// ============================================================================
// Nesting and Binding
// ============================================================================

proptest! {
    #![proptest_config(test_proptest_config(64))]

    /// Entering and leaving nested zones restores the cell in LIFO order
    /// at every depth.
    #[test]
    fn nested_runs_restore_in_lifo_order(depth in 1usize..=8) {
        init_test_logging();
        let before = Zone::current().id();
        descend(depth);
        prop_assert_eq!(Zone::current().id(), before);
    }

    /// Every bind forks its own child: ids are distinct, all descend
    /// from the origin, and each call runs in its bound zone.
    #[test]
    fn each_bind_gets_a_distinct_child_zone(count in 1usize..=8) {
        init_test_logging();
        let origin = Zone::current().fork(Extensions::new());
        let mut seen = Vec::with_capacity(count);
        for _ in 0..count {
            let bound = origin.bind(|| Zone::current().id());
            prop_assert_eq!(bound.call(), Some(bound.zone().id()));
            prop_assert!(bound.zone().descends_from(&origin));
            prop_assert_ne!(bound.zone().id(), origin.id());
            seen.push(bound.zone().id());
        }
        let mut dedup = seen.clone();
        dedup.sort_unstable();
        dedup.dedup();
        prop_assert_eq!(dedup.len(), seen.len());
    }

    /// The run result is exactly the body's value on success.
    #[test]
    fn run_returns_the_body_value(value in any::<i64>()) {
        init_test_logging();
        let zone = Zone::current().fork(Extensions::new());
        prop_assert_eq!(zone.run(|| value), Some(value));
        prop_assert_eq!(zone.try_run(|| value).unwrap(), value);
    }
}

// ============================================================================
// Panic Containment
// ============================================================================

proptest! {
    #![proptest_config(test_proptest_config(64))]

    /// Any mix of panicking and clean runs leaves the current zone
    /// untouched after every run.
    #[test]
    fn panics_never_leak_the_current_zone(
        plan in prop::collection::vec(any::<bool>(), 1..=12),
    ) {
        init_test_logging();
        let before = Zone::current().id();
        let quiet =
            Zone::current().fork(Extensions::new().panic_response(PanicResponse::Silent));
        for &should_panic in &plan {
            let outcome = quiet.run(|| {
                if should_panic {
                    panic!("planned failure");
                }
                7_u32
            });
            prop_assert_eq!(outcome, if should_panic { None } else { Some(7) });
            prop_assert_eq!(Zone::current().id(), before);
        }
    }
}
