// crates/mockstack-core/src/runtime/mod.rs
// ============================================================================
// Module: Mockstack Runtime
// Description: Registry, checks, resolution, composition, and lifecycle.
// Purpose: Turn registered mocks into isolated, validated stacks.
// Dependencies: crate::{core, interfaces}, serde_json
// ============================================================================

//! ## Overview
//! Runtime modules implement the six engine components plus the audit sink,
//! clocks, and the [`MockOrchestrator`] facade. Every composition path goes
//! through the same resolver, checker, and validator so diagnostics and real
//! stacks never disagree.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod audit;
pub mod clock;
pub mod compatibility;
pub mod composer;
pub mod lifecycle;
pub mod orchestrator;
pub mod registry;
pub mod resolver;
pub mod validator;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::AuditEvent;
pub use audit::AuditSink;
pub use audit::FileAuditSink;
pub use audit::InMemoryAuditSink;
pub use audit::NoopAuditSink;
pub use audit::StderrAuditSink;
pub use clock::LogicalClock;
pub use clock::SystemClock;
pub use compatibility::CompatibilityError;
pub use compatibility::CompatibilityMatrix;
pub use compatibility::ComplianceReport;
pub use compatibility::check_compatibility;
pub use composer::ComposedContext;
pub use composer::ComposedStack;
pub use composer::CompositionError;
pub use composer::SharedInstancePool;
pub use composer::StackComposer;
pub use lifecycle::LifecycleError;
pub use lifecycle::LifecycleManager;
pub use orchestrator::MockOrchestrator;
pub use orchestrator::OrchestratorError;
pub use orchestrator::OrchestratorSettings;
pub use registry::MockRegistry;
pub use registry::RegisteredMock;
pub use registry::RegistryError;
pub use resolver::ResolutionError;
pub use resolver::ResolvedOrder;
pub use resolver::resolve;
pub use validator::CacheStats;
pub use validator::DEFAULT_CACHE_CAPACITY;
pub use validator::StructuralValidator;
pub use validator::ValidationOutcome;
pub use validator::ValidatorError;
