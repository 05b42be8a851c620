// crates/mockstack-core/tests/registry.rs
// ============================================================================
// Module: Mock Registry Tests
// Description: Registration, replacement, removal, and observer delivery.
// Purpose: Ensure the registry keeps names unique and announces every mutation.
// Dependencies: mockstack-core
// ============================================================================

//! ## Overview
//! Covers insertion ordering across replacement, name validation, and the
//! synchronous invalidation signal consumed by observers.

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

use std::sync::Arc;
use std::sync::Mutex;

use mockstack_core::MockRegistry;
use mockstack_core::RegistryError;
use mockstack_core::RegistryEvent;
use mockstack_core::RegistryObserver;

use crate::common::EventLog;
use crate::common::entry;

type TestResult = Result<(), String>;

#[derive(Default)]
struct CollectingObserver {
    events: Mutex<Vec<RegistryEvent>>,
}

impl RegistryObserver for CollectingObserver {
    fn on_registry_event(&self, event: &RegistryEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

fn names(registry: &MockRegistry) -> Vec<String> {
    registry.list_all().iter().map(|entry| entry.name.to_string()).collect()
}

#[test]
fn list_all_follows_insertion_order() -> TestResult {
    let log = EventLog::new();
    let mut registry = MockRegistry::new();
    for name in ["storage", "api", "toast"] {
        registry.register(entry(name, "1.0.0", &log)).map_err(|err| err.to_string())?;
    }
    assert_eq!(names(&registry), vec!["storage", "api", "toast"]);
    assert_eq!(registry.len(), 3);
    Ok(())
}

#[test]
fn replacement_keeps_position_and_bumps_revision() -> TestResult {
    let log = EventLog::new();
    let mut registry = MockRegistry::new();
    registry.register(entry("a", "1.0.0", &log)).map_err(|err| err.to_string())?;
    registry.register(entry("b", "1.0.0", &log)).map_err(|err| err.to_string())?;
    let before = registry.snapshot("a").map(|registered| (registered.sequence, registered.revision));

    let event = registry.register(entry("a", "2.0.0", &log)).map_err(|err| err.to_string())?;

    let after = registry.snapshot("a").map(|registered| (registered.sequence, registered.revision));
    let (Some((seq_before, rev_before)), Some((seq_after, rev_after))) = (before, after) else {
        return Err("snapshot missing".to_string());
    };
    assert_eq!(seq_before, seq_after);
    assert!(rev_after > rev_before);
    assert_eq!(names(&registry), vec!["a", "b"]);
    assert_eq!(registry.get("a").map_err(|err| err.to_string())?.version, "2.0.0");
    assert!(matches!(event, RegistryEvent::Replaced { previous_revision, .. } if previous_revision == rev_before));
    Ok(())
}

#[test]
fn unregister_is_noop_when_absent() {
    let mut registry = MockRegistry::new();
    assert!(registry.unregister("ghost").is_none());
    assert!(registry.is_empty());
}

#[test]
fn get_missing_reports_not_found() {
    let registry = MockRegistry::new();
    let err = registry.get("ghost").unwrap_err();
    assert_eq!(err.code(), "mock_not_found");
}

#[test]
fn observers_receive_every_mutation_in_order() -> TestResult {
    let log = EventLog::new();
    let observer = Arc::new(CollectingObserver::default());
    let mut registry = MockRegistry::new();
    registry.subscribe(observer.clone());

    registry.register(entry("a", "1.0.0", &log)).map_err(|err| err.to_string())?;
    registry.register(entry("a", "1.1.0", &log)).map_err(|err| err.to_string())?;
    registry.unregister("a");
    registry.unregister("a");

    let events = observer.events.lock().unwrap().clone();
    assert_eq!(events.len(), 3);
    assert!(matches!(events[0], RegistryEvent::Registered { .. }));
    assert!(matches!(events[1], RegistryEvent::Replaced { .. }));
    assert!(matches!(events[2], RegistryEvent::Unregistered { .. }));
    assert!(events.iter().all(|event| event.name().as_str() == "a"));
    Ok(())
}

#[test]
fn invalid_names_are_rejected() {
    let log = EventLog::new();
    let mut registry = MockRegistry::new();
    let too_long = "m".repeat(129);
    for name in ["", "has space", "tab\tname", too_long.as_str()] {
        let err = registry.register(entry(name, "1.0.0", &log)).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidName { .. }), "accepted {name:?}");
    }
    assert!(registry.is_empty());
}

#[test]
fn self_dependency_is_rejected() {
    let log = EventLog::new();
    let mut registry = MockRegistry::new();
    let looped = entry("loop", "1.0.0", &log).try_depends_on("loop", "*").unwrap();
    let err = registry.register(looped).unwrap_err();
    assert_eq!(err, RegistryError::SelfDependency("loop".into()));
    assert!(!registry.contains("loop"));
}
