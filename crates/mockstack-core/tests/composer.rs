// crates/mockstack-core/tests/composer.rs
// ============================================================================
// Module: Stack Composer Tests
// Description: Provider nesting, failure teardown, and smoke tests.
// Purpose: Ensure composition is all-or-nothing and panics never escape.
// Dependencies: mockstack-core
// ============================================================================

//! ## Overview
//! Drives the composer directly with resolved orders so nesting, dependency
//! wiring, and partial teardown can be observed through the event log.

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

use mockstack_core::MockEntry;
use mockstack_core::MockError;
use mockstack_core::MockName;
use mockstack_core::MockRegistry;
use mockstack_core::ResolvedOrder;
use mockstack_core::SmokeTestOutcome;
use mockstack_core::StackComposer;
use mockstack_core::StackConfig;
use mockstack_core::StackId;
use mockstack_core::Timestamp;
use mockstack_core::resolve;

use crate::common::Behavior;
use crate::common::EventLog;
use crate::common::RecordingMock;
use crate::common::entry_depending;
use crate::common::entry_with;

fn order_of(entries: Vec<MockEntry>, requested: &[&str]) -> ResolvedOrder {
    let mut registry = MockRegistry::new();
    for entry in entries {
        registry.register(entry).unwrap();
    }
    let requested: Vec<MockName> = requested.iter().map(|name| MockName::new(*name)).collect();
    resolve(&requested, &registry).unwrap()
}

fn chain(log: &EventLog) -> Vec<MockEntry> {
    vec![
        entry_depending("A", &[], log),
        entry_depending("B", &["A"], log),
        entry_depending("C", &["B"], log),
    ]
}

#[test]
fn providers_nest_with_first_initialized_innermost() {
    let log = EventLog::new();
    let order = order_of(chain(&log), &["C"]);
    let mut composer = StackComposer::new();

    let stack = composer
        .compose(&StackId::new("s1"), &order, &StackConfig::default(), Timestamp::Logical(1))
        .unwrap();

    assert_eq!(log.instantiated(), vec!["A", "B", "C"]);
    assert_eq!(stack.context().to_string(), "[C > B > A]");
    assert_eq!(stack.context().depth(), 3);
    assert_eq!(stack.context().outermost().map(|handle| handle.name().to_string()), Some("C".to_string()));
    assert!(stack.context().lookup("A").is_some());
    assert!(stack.context().lookup("Z").is_none());
    assert_eq!(stack.created_at(), Timestamp::Logical(1));
}

#[test]
fn providers_receive_only_declared_dependencies() {
    let log = EventLog::new();
    let order = order_of(chain(&log), &["C"]);
    let mut composer = StackComposer::new();

    let stack = composer
        .compose(&StackId::new("s1"), &order, &StackConfig::default(), Timestamp::Logical(1))
        .unwrap();

    let deps_of = |name: &str| {
        stack.handle(name).and_then(|handle| handle.with(|mock: &RecordingMock| mock.dependency_names.clone()))
    };
    assert_eq!(deps_of("A"), Some(Vec::new()));
    assert_eq!(deps_of("B"), Some(vec!["A".to_string()]));
    assert_eq!(deps_of("C"), Some(vec!["B".to_string()]));
}

#[test]
fn release_disposes_innermost_first() {
    let log = EventLog::new();
    let order = order_of(chain(&log), &["C"]);
    let mut composer = StackComposer::new();
    let stack = composer
        .compose(&StackId::new("s1"), &order, &StackConfig::default(), Timestamp::Logical(1))
        .unwrap();

    let report = composer.release(stack);

    assert!(report.is_clean());
    assert_eq!(log.disposed(), vec!["A", "B", "C"]);
    assert_eq!(report.disposed, vec![MockName::new("A"), MockName::new("B"), MockName::new("C")]);
}

#[test]
fn failed_provider_tears_down_earlier_providers_in_reverse() {
    let log = EventLog::new();
    let failing = Behavior {
        fail_instantiate: true,
        ..Behavior::default()
    };
    let entries = vec![
        entry_depending("A", &[], &log),
        entry_depending("B", &["A"], &log),
        entry_with("C", "1.0.0", &log, failing).try_depends_on("B", "*").unwrap(),
    ];
    let order = order_of(entries, &["C"]);
    let mut composer = StackComposer::new();

    let err = composer
        .compose(&StackId::new("s1"), &order, &StackConfig::default(), Timestamp::Logical(1))
        .unwrap_err();

    assert_eq!(err.failed_mock, MockName::new("C"));
    assert_eq!(err.dependencies, vec![MockName::new("B")]);
    assert_eq!(err.code(), "provider_failed");
    assert!(matches!(err.cause, MockError::Failed(_)));
    assert_eq!(log.disposed(), vec!["B", "A"]);
    assert_eq!(err.teardown.disposed, vec![MockName::new("B"), MockName::new("A")]);
}

#[test]
fn panicking_provider_is_reported_not_propagated() {
    let log = EventLog::new();
    let panicking = Behavior {
        panic_instantiate: true,
        ..Behavior::default()
    };
    let entries = vec![entry_depending("A", &[], &log), entry_with("boom", "1.0.0", &log, panicking)];
    let order = order_of(entries, &["A", "boom"]);
    let mut composer = StackComposer::new();

    let err = composer
        .compose(&StackId::new("s1"), &order, &StackConfig::default(), Timestamp::Logical(1))
        .unwrap_err();

    assert_eq!(err.code(), "provider_panicked");
    assert_eq!(err.cause, MockError::Panicked("boom exploded during instantiation".to_string()));
    assert_eq!(log.disposed(), vec!["A"]);
}

#[test]
fn teardown_continues_past_failing_dispose() {
    let log = EventLog::new();
    let stubborn = Behavior {
        fail_dispose: true,
        ..Behavior::default()
    };
    let entries = vec![
        entry_depending("A", &[], &log),
        entry_with("B", "1.0.0", &log, stubborn).try_depends_on("A", "*").unwrap(),
        entry_depending("C", &["B"], &log),
    ];
    let order = order_of(entries, &["C"]);
    let mut composer = StackComposer::new();
    let stack = composer
        .compose(&StackId::new("s1"), &order, &StackConfig::default(), Timestamp::Logical(1))
        .unwrap();

    let report = composer.release(stack);

    assert!(!report.is_clean());
    assert_eq!(log.disposed(), vec!["A", "B", "C"]);
    assert_eq!(report.disposed, vec![MockName::new("A"), MockName::new("C")]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].mock_name, MockName::new("B"));
}

#[test]
fn stacks_get_distinct_instances() {
    let log = EventLog::new();
    let order = order_of(vec![entry_depending("A", &[], &log)], &["A"]);
    let mut composer = StackComposer::new();
    let config = StackConfig::default();

    let first = composer.compose(&StackId::new("s1"), &order, &config, Timestamp::Logical(1)).unwrap();
    let second = composer.compose(&StackId::new("s2"), &order, &config, Timestamp::Logical(2)).unwrap();

    let first_handle = first.handle("A").unwrap();
    let second_handle = second.handle("A").unwrap();
    assert!(!first_handle.same_instance(second_handle));
    assert_ne!(first_handle.id(), second_handle.id());
    first_handle.with_mut(|mock: &mut RecordingMock| mock.counter += 5).unwrap();
    assert_eq!(second_handle.with(|mock: &RecordingMock| mock.counter), Some(0));
}

#[test]
fn shared_instance_is_disposed_by_last_holder() {
    let log = EventLog::new();
    let order = order_of(vec![entry_depending("store", &[], &log)], &["store"]);
    let mut composer = StackComposer::new();
    let config = StackConfig::default().with_shared(["store"]);

    let first = composer.compose(&StackId::new("s1"), &order, &config, Timestamp::Logical(1)).unwrap();
    let second = composer.compose(&StackId::new("s2"), &order, &config, Timestamp::Logical(2)).unwrap();
    assert!(first.handle("store").unwrap().same_instance(second.handle("store").unwrap()));
    assert_eq!(composer.shared_pool().holders("store"), 2);
    assert_eq!(log.instantiated(), vec!["store"]);

    let report = composer.release(first);
    assert_eq!(report.released_shared, vec![MockName::new("store")]);
    assert!(log.disposed().is_empty());

    let report = composer.release(second);
    assert_eq!(report.disposed, vec![MockName::new("store")]);
    assert_eq!(log.disposed(), vec!["store"]);
    assert!(composer.shared_pool().names().is_empty());
}

#[test]
fn shared_instance_never_reaches_a_stack_local_dependency() {
    let log = EventLog::new();
    let order = order_of(
        vec![entry_depending("db", &[], &log), entry_depending("cache", &["db"], &log)],
        &["cache"],
    );
    let mut composer = StackComposer::new();
    let config = StackConfig::default().with_shared(["cache"]);

    let first = composer.compose(&StackId::new("s1"), &order, &config, Timestamp::Logical(1)).unwrap();
    let second = composer.compose(&StackId::new("s2"), &order, &config, Timestamp::Logical(2)).unwrap();
    let cache = second.handle("cache").unwrap().clone();
    assert!(first.handle("cache").unwrap().same_instance(&cache));
    assert!(!first.handle("db").unwrap().same_instance(second.handle("db").unwrap()));

    let report = composer.release(first);
    assert_eq!(report.disposed, vec![MockName::new("db")]);
    assert_eq!(report.released_shared, vec![MockName::new("cache")]);
    assert_eq!(log.disposed(), vec!["db"]);
    assert_eq!(cache.with(|mock: &RecordingMock| mock.dependency_names.clone()), Some(Vec::new()));

    let report = composer.release(second);
    assert_eq!(report.disposed, vec![MockName::new("cache"), MockName::new("db")]);
    assert_eq!(log.disposed(), vec!["db", "cache", "db"]);
}

#[test]
fn replaced_entry_gets_a_fresh_shared_instance() {
    let log = EventLog::new();
    let mut registry = MockRegistry::new();
    registry.register(entry_depending("store", &[], &log)).unwrap();
    let requested = [MockName::new("store")];
    let mut composer = StackComposer::new();
    let config = StackConfig::default().with_shared(["store"]);

    let before = resolve(&requested, &registry).unwrap();
    let first = composer.compose(&StackId::new("s1"), &before, &config, Timestamp::Logical(1)).unwrap();
    registry.register(entry_depending("store", &[], &log)).unwrap();
    let after = resolve(&requested, &registry).unwrap();
    assert_ne!(before.revisions(), after.revisions());
    let second = composer.compose(&StackId::new("s2"), &after, &config, Timestamp::Logical(2)).unwrap();

    assert!(!first.handle("store").unwrap().same_instance(second.handle("store").unwrap()));
    assert_eq!(log.instantiated(), vec!["store", "store"]);
    assert_eq!(composer.shared_pool().holders("store"), 2);
    assert_eq!(composer.shared_pool().names(), vec![MockName::new("store")]);

    let report = composer.release(first);
    assert_eq!(report.disposed, vec![MockName::new("store")]);
    assert!(report.released_shared.is_empty());
    assert_eq!(composer.shared_pool().holders("store"), 1);
    assert_eq!(log.disposed(), vec!["store"]);

    let report = composer.release(second);
    assert_eq!(report.disposed, vec![MockName::new("store")]);
    assert!(composer.shared_pool().names().is_empty());
}

#[test]
fn smoke_test_reports_each_outcome() {
    let log = EventLog::new();
    let failing_smoke = Behavior {
        fail_smoke: true,
        ..Behavior::default()
    };
    let failing_start = Behavior {
        fail_instantiate: true,
        ..Behavior::default()
    };
    let entries = vec![
        entry_depending("ok", &[], &log),
        entry_with("flaky", "1.0.0", &log, failing_smoke),
        entry_with("broken", "1.0.0", &log, failing_start),
    ];
    let order = order_of(entries, &["ok", "flaky", "broken"]);
    let empty = ResolvedOrder::default();
    let mut composer = StackComposer::new();
    let probe = StackId::new("probe");

    let partial = order_of(vec![entry_depending("ok", &[], &log)], &["ok"]);
    assert_eq!(
        composer.smoke_test(&probe, &partial, &MockName::new("ok"), Timestamp::Logical(1)),
        SmokeTestOutcome::Passed
    );
    let flaky_only = order_of(vec![entry_with("flaky", "1.0.0", &log, failing_smoke)], &["flaky"]);
    assert!(matches!(
        composer.smoke_test(&probe, &flaky_only, &MockName::new("flaky"), Timestamp::Logical(2)),
        SmokeTestOutcome::RenderFailure { mock_name, .. } if mock_name.as_str() == "flaky"
    ));
    assert!(matches!(
        composer.smoke_test(&probe, &order, &MockName::new("ok"), Timestamp::Logical(3)),
        SmokeTestOutcome::RenderFailure { mock_name, .. } if mock_name.as_str() == "broken"
    ));
    assert!(matches!(
        composer.smoke_test(&probe, &empty, &MockName::new("ok"), Timestamp::Logical(4)),
        SmokeTestOutcome::Skipped { .. }
    ));
}
