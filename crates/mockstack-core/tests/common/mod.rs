// crates/mockstack-core/tests/common/mod.rs
// ============================================================================
// Module: Common Test Utilities
// Description: Shared mock fixtures for mockstack-core tests.
// Purpose: Provide recording mocks, failing factories, and wired orchestrators.
// Dependencies: mockstack-core
// ============================================================================

//! ## Overview
//! Fixtures record instantiation and disposal into a shared log so tests can
//! assert ordering and isolation without inspecting engine internals.

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
#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]

use std::sync::Arc;
use std::sync::Mutex;

use mockstack_core::CapabilityContract;
use mockstack_core::FnMockFactory;
use mockstack_core::InMemoryAuditSink;
use mockstack_core::LogicalClock;
use mockstack_core::MemberKind;
use mockstack_core::MockEntry;
use mockstack_core::MockError;
use mockstack_core::MockInstance;
use mockstack_core::MockOrchestrator;
use mockstack_core::MockShape;
use mockstack_core::OrchestratorSettings;

// ============================================================================
// SECTION: Event Log
// ============================================================================

/// Shared log of `instantiate:<name>` and `dispose:<name>` lines.
#[derive(Debug, Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, line: impl Into<String>) {
        self.0.lock().unwrap().push(line.into());
    }

    pub fn lines(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    /// Returns the names recorded with the given prefix, in order.
    pub fn with_prefix(&self, prefix: &str) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter_map(|line| line.strip_prefix(prefix).map(ToString::to_string))
            .collect()
    }

    pub fn disposed(&self) -> Vec<String> {
        self.with_prefix("dispose:")
    }

    pub fn instantiated(&self) -> Vec<String> {
        self.with_prefix("instantiate:")
    }
}

// ============================================================================
// SECTION: Mock Instances
// ============================================================================

/// Recording mock with a mutable counter for isolation checks.
#[derive(Debug)]
pub struct RecordingMock {
    pub name: String,
    pub counter: u32,
    pub dependency_names: Vec<String>,
    log: EventLog,
    fail_dispose: bool,
    fail_smoke: bool,
}

impl MockInstance for RecordingMock {
    fn smoke_test(&mut self) -> Result<(), MockError> {
        if self.fail_smoke {
            return Err(MockError::Failed(format!("{} cannot render", self.name)));
        }
        Ok(())
    }

    fn dispose(&mut self) -> Result<(), MockError> {
        self.log.push(format!("dispose:{}", self.name));
        if self.fail_dispose {
            return Err(MockError::Failed(format!("{} refused to dispose", self.name)));
        }
        Ok(())
    }
}

/// Behavior switches for [`recording_factory`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Behavior {
    pub fail_instantiate: bool,
    pub panic_instantiate: bool,
    pub fail_dispose: bool,
    pub fail_smoke: bool,
}

// ============================================================================
// SECTION: Factories
// ============================================================================

pub fn basic_shape() -> MockShape {
    MockShape::new().function("render").value("state")
}

pub fn recording_factory(shape: MockShape, log: &EventLog, behavior: Behavior) -> FnMockFactory {
    let log = log.clone();
    FnMockFactory::new(shape, move |ctx| {
        let name = ctx.mock_name.to_string();
        if behavior.panic_instantiate {
            panic!("{name} exploded during instantiation");
        }
        if behavior.fail_instantiate {
            return Err(MockError::Failed(format!("{name} could not start")));
        }
        log.push(format!("instantiate:{name}"));
        Ok(Box::new(RecordingMock {
            name,
            counter: 0,
            dependency_names: ctx.dependencies.keys().map(ToString::to_string).collect(),
            log: log.clone(),
            fail_dispose: behavior.fail_dispose,
            fail_smoke: behavior.fail_smoke,
        }) as Box<dyn MockInstance>)
    })
}

/// Entry with the basic shape and default behavior.
pub fn entry(name: &str, version: &str, log: &EventLog) -> MockEntry {
    MockEntry::new(name, version, recording_factory(basic_shape(), log, Behavior::default()))
}

/// Entry with custom behavior.
pub fn entry_with(name: &str, version: &str, log: &EventLog, behavior: Behavior) -> MockEntry {
    MockEntry::new(name, version, recording_factory(basic_shape(), log, behavior))
}

/// Entry depending on every name in `deps` with a wildcard range.
pub fn entry_depending(name: &str, deps: &[&str], log: &EventLog) -> MockEntry {
    deps.iter().fold(entry(name, "1.0.0", log), |entry, dep| entry.try_depends_on(*dep, "*").unwrap())
}

// ============================================================================
// SECTION: Contracts
// ============================================================================

pub fn toast_contract() -> CapabilityContract {
    CapabilityContract::new("toast")
        .require("show", MemberKind::Function)
        .require("queue", MemberKind::Value)
        .optional("dismiss", MemberKind::Function)
}

pub fn toast_shape() -> MockShape {
    MockShape::new().function("show").value("queue")
}

// ============================================================================
// SECTION: Orchestrators
// ============================================================================

/// Orchestrator with a logical clock and an in-memory audit sink.
pub fn orchestrator() -> (MockOrchestrator, Arc<InMemoryAuditSink>) {
    let audit = Arc::new(InMemoryAuditSink::new());
    let settings = OrchestratorSettings::default()
        .with_clock(Arc::new(LogicalClock::new()))
        .with_audit_sink(audit.clone());
    (MockOrchestrator::new(settings), audit)
}
