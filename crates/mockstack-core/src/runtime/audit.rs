// crates/mockstack-core/src/runtime/audit.rs
// ============================================================================
// Module: Mockstack Audit Logging
// Description: Structured audit events for registry, validation, and stacks.
// Purpose: Emit JSON-lines diagnostics without hard logging dependencies.
// Dependencies: crate::core, crate::interfaces, serde_json
// ============================================================================

//! ## Overview
//! Engine components report what they did through an [`AuditSink`]. Sinks
//! serialize events as one JSON object per line so a test runner can route
//! them to whatever reporting pipeline it already uses. A sink never fails
//! the operation it observes; write errors are dropped.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use serde::Serialize;

use crate::core::MockName;
use crate::core::StackId;
use crate::core::StackState;
use crate::core::TeardownReport;
use crate::core::Timestamp;
use crate::interfaces::RegistryEvent;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Audit event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuditEvent {
    /// The registry was mutated.
    RegistryChanged {
        /// Event time.
        timestamp: Timestamp,
        /// Mutation details.
        change: RegistryEvent,
    },
    /// A validation result was served.
    ValidationServed {
        /// Event time.
        timestamp: Timestamp,
        /// Validated mock.
        mock_name: MockName,
        /// Whether the result came from the cache.
        cache_hit: bool,
        /// Whether the mock is valid.
        is_valid: bool,
        /// Number of errors.
        error_count: usize,
        /// Number of warnings.
        warning_count: usize,
    },
    /// A declared dependency failed the compatibility check.
    CompatibilityViolation {
        /// Event time.
        timestamp: Timestamp,
        /// Mock declaring the dependency.
        mock_name: MockName,
        /// Stable error code.
        code: &'static str,
        /// Violation message.
        message: String,
    },
    /// A stack changed lifecycle state.
    StackTransition {
        /// Event time.
        timestamp: Timestamp,
        /// Stack identifier.
        stack_id: StackId,
        /// Previous state.
        from: StackState,
        /// New state.
        to: StackState,
    },
    /// A provider failed during composition.
    CompositionFailed {
        /// Event time.
        timestamp: Timestamp,
        /// Stack identifier.
        stack_id: StackId,
        /// Failing mock.
        mock_name: MockName,
        /// Failure message.
        message: String,
    },
    /// A stack finished tearing down.
    TeardownCompleted {
        /// Event time.
        timestamp: Timestamp,
        /// Teardown details.
        report: TeardownReport,
    },
}

impl AuditEvent {
    /// Returns a stable label for the event.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::RegistryChanged {
                ..
            } => "registry_changed",
            Self::ValidationServed {
                ..
            } => "validation_served",
            Self::CompatibilityViolation {
                ..
            } => "compatibility_violation",
            Self::StackTransition {
                ..
            } => "stack_transition",
            Self::CompositionFailed {
                ..
            } => "composition_failed",
            Self::TeardownCompleted {
                ..
            } => "teardown_completed",
        }
    }
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Destination for audit events.
pub trait AuditSink: Send + Sync {
    /// Records an audit event.
    fn record(&self, event: &AuditEvent);
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl AuditSink for StderrAuditSink {
    fn record(&self, event: &AuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Audit sink that appends JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl AuditSink for FileAuditSink {
    fn record(&self, event: &AuditEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// Audit sink that keeps events in memory for assertions.
#[derive(Default)]
pub struct InMemoryAuditSink {
    /// Recorded events in arrival order.
    events: Mutex<Vec<AuditEvent>>,
}

impl InMemoryAuditSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every recorded event.
    #[must_use]
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }

    /// Returns the labels of recorded events in order.
    #[must_use]
    pub fn labels(&self) -> Vec<&'static str> {
        self.events
            .lock()
            .map(|events| events.iter().map(AuditEvent::label).collect())
            .unwrap_or_default()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&self, event: &AuditEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

/// No-op audit sink.
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record(&self, _event: &AuditEvent) {}
}
