// crates/mockstack-core/tests/audit.rs
// ============================================================================
// Module: Audit Sink Tests
// Description: JSON-lines audit output for registry and lifecycle events.
// Purpose: Ensure audit records are machine-readable and append-only.
// Dependencies: mockstack-core, serde_json, tempfile
// ============================================================================

//! ## Overview
//! Wires a file sink into an orchestrator and parses the resulting log.

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

use mockstack_core::AuditEvent;
use mockstack_core::AuditSink;
use mockstack_core::FileAuditSink;
use mockstack_core::LogicalClock;
use mockstack_core::MockOrchestrator;
use mockstack_core::OrchestratorSettings;
use mockstack_core::StackConfig;
use mockstack_core::StackId;
use mockstack_core::StackState;
use mockstack_core::Timestamp;
use serde_json::Value;

use crate::common::EventLog;
use crate::common::entry_depending;

fn read_lines(path: &std::path::Path) -> Vec<Value> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[test]
fn file_sink_writes_one_json_object_per_event() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.jsonl");
    let sink = Arc::new(FileAuditSink::new(&path).unwrap());
    let settings = OrchestratorSettings::default()
        .with_clock(Arc::new(LogicalClock::new()))
        .with_audit_sink(sink);
    let mut orchestrator = MockOrchestrator::new(settings);
    let log = EventLog::new();

    orchestrator.register(entry_depending("A", &[], &log)).unwrap();
    orchestrator.create_stack("s1", ["A"], StackConfig::default()).unwrap();
    orchestrator.cleanup("s1").unwrap();

    let records = read_lines(&path);
    let events: Vec<&str> = records.iter().filter_map(|record| record["event"].as_str()).collect();
    assert_eq!(events.len(), records.len());
    assert_eq!(events.first(), Some(&"registry_changed"));
    assert_eq!(events.last(), Some(&"stack_transition"));
    assert!(events.contains(&"validation_served"));
    assert!(events.contains(&"teardown_completed"));
    assert_eq!(records[0]["change"]["event"], "registered");
    assert_eq!(records[0]["timestamp"]["kind"], "logical");
    let teardown = records.iter().find(|record| record["event"] == "teardown_completed").unwrap();
    assert_eq!(teardown["report"]["disposed"], serde_json::json!(["A"]));
}

#[test]
fn file_sink_appends_to_existing_log() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.jsonl");
    let event = AuditEvent::StackTransition {
        timestamp: Timestamp::Logical(1),
        stack_id: StackId::new("s1"),
        from: StackState::Uninitialized,
        to: StackState::Composing,
    };

    FileAuditSink::new(&path).unwrap().record(&event);
    FileAuditSink::new(&path).unwrap().record(&event);

    let records = read_lines(&path);
    assert_eq!(records.len(), 2);
    assert_eq!(records[1]["stack_id"], "s1");
    assert_eq!(event.label(), "stack_transition");
}
