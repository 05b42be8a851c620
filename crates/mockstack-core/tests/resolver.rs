// crates/mockstack-core/tests/resolver.rs
// ============================================================================
// Module: Dependency Resolver Tests
// Description: Topological ordering, cycle reports, and missing chains.
// Purpose: Ensure initialization order is deterministic and dependency-first.
// Dependencies: mockstack-core, proptest
// ============================================================================

//! ## Overview
//! Covers the documented ordering scenarios plus a property check over random
//! acyclic graphs.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

mod common;

use mockstack_core::MockName;
use mockstack_core::MockRegistry;
use mockstack_core::ResolutionError;
use mockstack_core::resolve;
use proptest::prelude::*;

use crate::common::EventLog;
use crate::common::entry_depending;

fn registry(specs: &[(&str, &[&str])]) -> MockRegistry {
    let log = EventLog::new();
    let mut registry = MockRegistry::new();
    for (name, deps) in specs {
        registry.register(entry_depending(name, deps, &log)).unwrap();
    }
    registry
}

fn request(names: &[&str]) -> Vec<MockName> {
    names.iter().map(|name| MockName::new(*name)).collect()
}

fn ordered(names: &[&str], registry: &MockRegistry) -> Vec<String> {
    let requested = request(names);
    resolve(&requested, registry).unwrap().names().iter().map(ToString::to_string).collect()
}

#[test]
fn chain_resolves_dependencies_first() {
    let registry = registry(&[("A", &[]), ("B", &["A"]), ("C", &["B"])]);
    assert_eq!(ordered(&["C"], &registry), vec!["A", "B", "C"]);
}

#[test]
fn unrelated_mocks_follow_registration_order() {
    let registry = registry(&[("zeta", &[]), ("alpha", &[]), ("mid", &[])]);
    assert_eq!(ordered(&["mid", "alpha", "zeta"], &registry), vec!["zeta", "alpha", "mid"]);
}

#[test]
fn diamond_places_shared_dependency_once() {
    let registry =
        registry(&[("base", &[]), ("left", &["base"]), ("right", &["base"]), ("top", &["right", "left"])]);
    let order = ordered(&["top"], &registry);
    assert_eq!(order, vec!["base", "left", "right", "top"]);
}

#[test]
fn unrequested_mocks_are_left_out() {
    let registry = registry(&[("A", &[]), ("B", &["A"]), ("unused", &[])]);
    assert_eq!(ordered(&["B"], &registry), vec!["A", "B"]);
}

#[test]
fn empty_request_resolves_to_empty_order() {
    let registry = registry(&[("A", &[])]);
    let order = resolve(&Vec::<MockName>::new(), &registry).unwrap();
    assert!(order.is_empty());
}

#[test]
fn two_node_cycle_is_reported_from_earliest_member() {
    let registry = registry(&[("X", &["Y"]), ("Y", &["X"])]);
    let err = resolve(&request(&["Y"]), &registry).unwrap_err();
    assert_eq!(
        err,
        ResolutionError::Cycle {
            cycle: request(&["X", "Y"]),
        }
    );
    assert_eq!(err.to_string(), "dependency cycle: X -> Y -> X");
    assert_eq!(err.code(), "dependency_cycle");
}

#[test]
fn shortest_cycle_wins_over_longer_loop() {
    let registry = registry(&[
        ("root", &["a"]),
        ("a", &["b"]),
        ("b", &["c", "a"]),
        ("c", &["root"]),
    ]);
    let err = resolve(&request(&["root"]), &registry).unwrap_err();
    let ResolutionError::Cycle {
        cycle,
    } = err
    else {
        panic!("expected a cycle");
    };
    assert_eq!(cycle, request(&["a", "b"]));
}

#[test]
fn missing_dependency_reports_the_chain() {
    let registry = registry(&[("app", &["api"]), ("api", &["db"])]);
    let err = resolve(&request(&["app"]), &registry).unwrap_err();
    assert_eq!(
        err,
        ResolutionError::MissingDependency {
            name: "db".into(),
            chain: request(&["app", "api"]),
        }
    );
    assert_eq!(err.to_string(), "mock `db` is not registered (required via app -> api)");
}

#[test]
fn missing_requested_mock_has_empty_chain() {
    let registry = registry(&[]);
    let err = resolve(&request(&["ghost"]), &registry).unwrap_err();
    assert_eq!(err.to_string(), "mock `ghost` is not registered");
    assert_eq!(err.code(), "missing_dependency");
}

#[test]
fn resolved_entries_are_snapshots() {
    let log = EventLog::new();
    let mut registry = registry(&[("A", &[])]);
    let order = resolve(&request(&["A"]), &registry).unwrap();
    registry.unregister("A");
    registry.register(entry_depending("B", &[], &log)).unwrap();
    assert_eq!(order.len(), 1);
    assert!(order.get("A").is_some());
}

#[test]
fn resolved_entries_carry_their_registry_revision() {
    let log = EventLog::new();
    let mut registry = registry(&[("A", &[]), ("B", &["A"])]);
    let before = resolve(&request(&["B"]), &registry).unwrap();
    registry.register(entry_depending("A", &[], &log)).unwrap();
    let after = resolve(&request(&["B"]), &registry).unwrap();

    assert_eq!(before.revisions().len(), before.len());
    assert_eq!(before.revisions()[1], after.revisions()[1]);
    assert!(after.revisions()[0] > before.revisions()[0]);
    let revision_of_a = registry.snapshot("A").map(|registered| registered.revision);
    assert_eq!(revision_of_a, Some(after.revisions()[0]));
}

/// Builds `mock-i` entries where node `i` may depend on any `j < i`.
fn dag_registry(edges: &[Vec<bool>]) -> MockRegistry {
    let log = EventLog::new();
    let names: Vec<String> = (0 .. edges.len()).map(|index| format!("mock-{index}")).collect();
    let mut registry = MockRegistry::new();
    for index in (0 .. edges.len()).rev() {
        let deps: Vec<&str> = (0 .. index)
            .filter(|dep| edges[index].get(*dep).copied().unwrap_or(false))
            .map(|dep| names[dep].as_str())
            .collect();
        registry.register(entry_depending(&names[index], &deps, &log)).unwrap();
    }
    registry
}

proptest! {
    #[test]
    fn every_mock_follows_its_dependencies(
        edges in prop::collection::vec(prop::collection::vec(any::<bool>(), 8), 1 .. 8)
    ) {
        let registry = dag_registry(&edges);
        let requested: Vec<MockName> = registry.list_all().iter().map(|entry| entry.name.clone()).collect();
        let order = resolve(&requested, &registry).unwrap();
        let names = order.names();
        prop_assert_eq!(names.len(), edges.len());
        for (position, entry) in order.entries().iter().enumerate() {
            for dependency in entry.dependency_names() {
                let dep_position = names.iter().position(|name| name == dependency).unwrap();
                prop_assert!(dep_position < position);
            }
        }
    }

    #[test]
    fn resolution_is_deterministic(
        edges in prop::collection::vec(prop::collection::vec(any::<bool>(), 6), 1 .. 6)
    ) {
        let registry = dag_registry(&edges);
        let mut requested: Vec<MockName> = registry.list_all().iter().map(|entry| entry.name.clone()).collect();
        let first = resolve(&requested, &registry).unwrap().names();
        requested.reverse();
        let second = resolve(&requested, &registry).unwrap().names();
        prop_assert_eq!(first, second);
    }
}
