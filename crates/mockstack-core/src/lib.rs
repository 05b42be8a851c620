// crates/mockstack-core/src/lib.rs
// ============================================================================
// Module: Mockstack Core Library
// Description: Public API surface for the mock orchestration engine.
// Purpose: Expose core types, interfaces, and runtime components.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Mockstack registers substitute implementations of runtime collaborators,
//! checks their versions and shapes, resolves their dependencies into a
//! deterministic initialization order, and composes them into isolated,
//! nested stacks that are torn down at every test-case boundary.
//!
//! Everything is in-process and synchronous. Each test worker owns its own
//! [`MockOrchestrator`]; nothing is shared between workers.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use crate::core::*;

pub use interfaces::Clock;
pub use interfaces::FnMockFactory;
pub use interfaces::InstantiationContext;
pub use interfaces::MockError;
pub use interfaces::MockFactory;
pub use interfaces::MockHandle;
pub use interfaces::MockInstance;
pub use interfaces::RegistryEvent;
pub use interfaces::RegistryObserver;
pub use runtime::AuditEvent;
pub use runtime::AuditSink;
pub use runtime::CacheStats;
pub use runtime::CompatibilityError;
pub use runtime::CompatibilityMatrix;
pub use runtime::ComplianceReport;
pub use runtime::ComposedContext;
pub use runtime::ComposedStack;
pub use runtime::CompositionError;
pub use runtime::FileAuditSink;
pub use runtime::InMemoryAuditSink;
pub use runtime::LifecycleError;
pub use runtime::LifecycleManager;
pub use runtime::LogicalClock;
pub use runtime::MockOrchestrator;
pub use runtime::MockRegistry;
pub use runtime::NoopAuditSink;
pub use runtime::OrchestratorError;
pub use runtime::OrchestratorSettings;
pub use runtime::RegistryError;
pub use runtime::ResolutionError;
pub use runtime::ResolvedOrder;
pub use runtime::StackComposer;
pub use runtime::StderrAuditSink;
pub use runtime::StructuralValidator;
pub use runtime::SystemClock;
pub use runtime::ValidatorError;
pub use runtime::check_compatibility;
pub use runtime::resolve;
