// crates/mockstack-core/src/runtime/orchestrator.rs
// ============================================================================
// Module: Mockstack Orchestrator
// Description: Facade wiring registry, checks, resolution, and lifecycle.
// Purpose: Offer the registration, composition, and validation APIs in one place.
// Dependencies: crate::core, crate::interfaces, crate::runtime
// ============================================================================

//! ## Overview
//! [`MockOrchestrator`] is what test setup code talks to. Creating a stack
//! runs these steps in order:
//! 1. Scope check against `enabled_mocks`. An empty request means every
//!    enabled mock.
//! 2. Dependency resolution.
//! 3. Shared-scope check: a shared mock may only depend on shared mocks.
//! 4. Version compliance for every resolved entry.
//! 5. Structural validation for every resolved entry.
//! 6. Composition.
//!
//! Steps 1 to 5 fail before any provider is instantiated. Their errors name
//! the stack being created. Validation warnings
//! never block; errors always do.
//!
//! Each worker owns one orchestrator. Nothing is shared across workers.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::panic::AssertUnwindSafe;
use std::panic::catch_unwind;
use std::panic::resume_unwind;
use std::sync::Arc;

use thiserror::Error;

use crate::core::CapabilityContract;
use crate::core::ContractCatalog;
use crate::core::DebugReport;
use crate::core::MockEntry;
use crate::core::MockName;
use crate::core::SmokeTestOutcome;
use crate::core::StackConfig;
use crate::core::StackId;
use crate::core::StackSnapshot;
use crate::core::TeardownReport;
use crate::core::ValidationResult;
use crate::interfaces::Clock;
use crate::interfaces::RegistryEvent;
use crate::runtime::audit::AuditEvent;
use crate::runtime::audit::AuditSink;
use crate::runtime::audit::NoopAuditSink;
use crate::runtime::clock::SystemClock;
use crate::runtime::compatibility::CompatibilityError;
use crate::runtime::compatibility::CompatibilityMatrix;
use crate::runtime::compatibility::ComplianceReport;
use crate::runtime::compatibility::check_compatibility;
use crate::runtime::composer::ComposedStack;
use crate::runtime::composer::SharedInstancePool;
use crate::runtime::lifecycle::LifecycleError;
use crate::runtime::lifecycle::LifecycleManager;
use crate::runtime::registry::MockRegistry;
use crate::runtime::registry::RegistryError;
use crate::runtime::resolver::ResolutionError;
use crate::runtime::resolver::ResolvedOrder;
use crate::runtime::resolver::resolve;
use crate::runtime::validator::CacheStats;
use crate::runtime::validator::DEFAULT_CACHE_CAPACITY;
use crate::runtime::validator::StructuralValidator;
use crate::runtime::validator::ValidatorError;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors surfaced by the orchestrator.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Registry rejected the operation.
    #[error(transparent)]
    Registry(#[from] RegistryError),
    /// Dependency resolution failed.
    #[error("stack `{stack_id}`: {source}")]
    Resolution {
        /// Stack being created.
        stack_id: StackId,
        /// Resolver failure.
        source: ResolutionError,
    },
    /// A resolved entry violated a version constraint.
    #[error("stack `{stack_id}`: {source}")]
    Compatibility {
        /// Stack being created.
        stack_id: StackId,
        /// First violated constraint.
        source: CompatibilityError,
    },
    /// A resolved entry failed structural validation.
    #[error(
        "stack `{stack_id}`: mock `{}` failed structural validation with {} error(s)",
        .result.mock_name,
        .result.errors.len()
    )]
    ValidationFailed {
        /// Stack being created.
        stack_id: StackId,
        /// Failing validation result.
        result: Box<ValidationResult>,
    },
    /// A shared mock depends on a mock that is not shared.
    #[error(
        "stack `{stack_id}`: shared mock `{mock_name}` depends on `{dependency_name}`, which is not shared"
    )]
    UnsharedDependency {
        /// Stack being created.
        stack_id: StackId,
        /// Shared mock.
        mock_name: MockName,
        /// Stack-local dependency.
        dependency_name: MockName,
    },
    /// A requested mock or dependency is outside `enabled_mocks`.
    #[error("stack `{stack_id}`: mock `{mock_name}` is not enabled for this stack")]
    OutOfScope {
        /// Stack being created.
        stack_id: StackId,
        /// Mock outside the enabled set.
        mock_name: MockName,
    },
    /// Lifecycle operation failed.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    /// Validator infrastructure failed.
    #[error(transparent)]
    Validator(#[from] ValidatorError),
}

impl OrchestratorError {
    /// Returns a stable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Registry(err) => err.code(),
            Self::Resolution {
                source,
                ..
            } => source.code(),
            Self::Compatibility {
                source,
                ..
            } => source.code(),
            Self::ValidationFailed {
                ..
            } => "validation_failed",
            Self::UnsharedDependency {
                ..
            } => "unshared_dependency",
            Self::OutOfScope {
                ..
            } => "out_of_scope",
            Self::Lifecycle(err) => err.code(),
            Self::Validator(err) => err.code(),
        }
    }
}

// ============================================================================
// SECTION: Settings
// ============================================================================

/// Construction settings for [`MockOrchestrator`].
#[derive(Clone)]
pub struct OrchestratorSettings {
    /// Timestamp source.
    pub clock: Arc<dyn Clock>,
    /// Audit sink.
    pub audit: Arc<dyn AuditSink>,
    /// Maximum cached validation results.
    pub cache_capacity: usize,
    /// Strictness used by [`MockOrchestrator::validate`] and debug reports.
    pub strict_validation: bool,
    /// Pinned dependency versions.
    pub matrix: CompatibilityMatrix,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            clock: Arc::new(SystemClock),
            audit: Arc::new(NoopAuditSink),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            strict_validation: false,
            matrix: CompatibilityMatrix::new(),
        }
    }
}

impl OrchestratorSettings {
    /// Replaces the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the audit sink.
    #[must_use]
    pub fn with_audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Sets the validation cache capacity.
    #[must_use]
    pub const fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    /// Sets the strictness used for standalone validation.
    #[must_use]
    pub const fn with_strict_validation(mut self, strict: bool) -> Self {
        self.strict_validation = strict;
        self
    }

    /// Replaces the compatibility matrix.
    #[must_use]
    pub fn with_matrix(mut self, matrix: CompatibilityMatrix) -> Self {
        self.matrix = matrix;
        self
    }
}

// ============================================================================
// SECTION: Orchestrator
// ============================================================================

/// Per-worker facade over every engine component.
pub struct MockOrchestrator {
    /// Mock registry.
    registry: MockRegistry,
    /// Capability contracts.
    catalog: ContractCatalog,
    /// Pinned dependency versions.
    matrix: CompatibilityMatrix,
    /// Structural validator, subscribed to the registry.
    validator: Arc<StructuralValidator>,
    /// Stack owner.
    lifecycle: LifecycleManager,
    /// Timestamp source.
    clock: Arc<dyn Clock>,
    /// Audit sink.
    audit: Arc<dyn AuditSink>,
    /// Strictness for standalone validation.
    strict_validation: bool,
}

impl Default for MockOrchestrator {
    fn default() -> Self {
        Self::new(OrchestratorSettings::default())
    }
}

impl MockOrchestrator {
    /// Creates an orchestrator from settings.
    #[must_use]
    pub fn new(settings: OrchestratorSettings) -> Self {
        let validator = Arc::new(StructuralValidator::new(settings.cache_capacity));
        let mut registry = MockRegistry::new();
        registry.subscribe(validator.clone());
        Self {
            registry,
            catalog: ContractCatalog::new(),
            matrix: settings.matrix,
            validator,
            lifecycle: LifecycleManager::new(settings.clock.clone(), settings.audit.clone()),
            clock: settings.clock,
            audit: settings.audit,
            strict_validation: settings.strict_validation,
        }
    }

    // ------------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------------

    /// Registers or replaces a mock entry.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::Registry`] when the entry is rejected.
    pub fn register(&mut self, entry: MockEntry) -> Result<RegistryEvent, OrchestratorError> {
        let event = self.registry.register(entry)?;
        self.record_registry_change(&event);
        Ok(event)
    }

    /// Removes a mock entry; no-op when absent.
    pub fn unregister(&mut self, name: &str) -> Option<RegistryEvent> {
        let event = self.registry.unregister(name)?;
        self.record_registry_change(&event);
        Some(event)
    }

    /// Adds or replaces a capability contract.
    pub fn register_contract(&mut self, contract: CapabilityContract) -> Option<CapabilityContract> {
        self.catalog.register(contract)
    }

    /// Replaces the compatibility matrix.
    pub fn set_matrix(&mut self, matrix: CompatibilityMatrix) {
        self.matrix = matrix;
    }

    /// Returns the registry.
    #[must_use]
    pub const fn registry(&self) -> &MockRegistry {
        &self.registry
    }

    /// Returns the contract catalog.
    #[must_use]
    pub const fn catalog(&self) -> &ContractCatalog {
        &self.catalog
    }

    /// Returns the compatibility matrix.
    #[must_use]
    pub const fn matrix(&self) -> &CompatibilityMatrix {
        &self.matrix
    }

    // ------------------------------------------------------------------------
    // Validation
    // ------------------------------------------------------------------------

    /// Checks a registered mock's declared dependencies.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::Registry`] when the mock is not registered.
    pub fn check_compatibility(&self, name: &str) -> Result<ComplianceReport, OrchestratorError> {
        let entry = self.registry.get(name)?;
        let report = check_compatibility(entry, &self.matrix, &self.registry);
        self.record_violations(&report);
        Ok(report)
    }

    /// Validates a registered mock against its capability contracts.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError`] when the mock is not registered or the
    /// validator fails to run. Structural mismatches are reported in the result.
    pub fn validate(&self, name: &str) -> Result<ValidationResult, OrchestratorError> {
        let entry = self.registry.get(name)?;
        self.validate_entry(entry, self.strict_validation)
    }

    /// Builds a debug report for a registered mock, including a smoke test.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError`] when the mock is not registered or the
    /// validator fails to run. Smoke test failures are reported in the report.
    pub fn generate_debug_info(&mut self, name: &str) -> Result<DebugReport, OrchestratorError> {
        let entry = self.registry.get(name)?.clone();
        let smoke_test = match resolve([&entry.name], &self.registry) {
            Ok(order) => {
                let probe_id = StackId::new(format!("debug:{}", entry.name));
                let created_at = self.clock.now();
                self.lifecycle.composer_mut().smoke_test(&probe_id, &order, &entry.name, created_at)
            }
            Err(err) => SmokeTestOutcome::Skipped {
                reason: err.to_string(),
            },
        };
        let report = self.validator.generate_debug_info(
            &entry,
            &self.catalog,
            self.strict_validation,
            self.clock.as_ref(),
            smoke_test,
        )?;
        Ok(report)
    }

    /// Returns validation cache counters.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::Validator`] when the cache lock is poisoned.
    pub fn validation_stats(&self) -> Result<CacheStats, OrchestratorError> {
        Ok(self.validator.stats()?)
    }

    // ------------------------------------------------------------------------
    // Composition
    // ------------------------------------------------------------------------

    /// Resolves, checks, validates, and composes a stack.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError`] from the first failing step; nothing is
    /// instantiated unless every check passes.
    pub fn create_stack<I, N>(
        &mut self,
        stack_id: impl Into<StackId>,
        requested: I,
        config: StackConfig,
    ) -> Result<&ComposedStack, OrchestratorError>
    where
        I: IntoIterator<Item = N>,
        N: Into<MockName>,
    {
        let stack_id = stack_id.into();
        self.lifecycle.ensure_available(&stack_id)?;
        let order = self.prepare(&stack_id, requested, &config)?;
        Ok(self.lifecycle.create_stack(stack_id, &order, config)?)
    }

    /// Disposes a stack; repeated calls are no-ops.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::Lifecycle`] for an unknown id.
    pub fn cleanup(&mut self, stack_id: &str) -> Result<TeardownReport, OrchestratorError> {
        Ok(self.lifecycle.cleanup(&StackId::new(stack_id))?)
    }

    /// Disposes every active stack.
    pub fn cleanup_all(&mut self) -> Vec<TeardownReport> {
        self.lifecycle.cleanup_all()
    }

    /// Replaces an active stack with a newly composed one.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError`] when the stack is not active or any
    /// creation step fails. Check failures leave the old stack untouched.
    pub fn reset<I, N>(
        &mut self,
        stack_id: &str,
        requested: I,
        config: StackConfig,
    ) -> Result<&ComposedStack, OrchestratorError>
    where
        I: IntoIterator<Item = N>,
        N: Into<MockName>,
    {
        let stack_id = StackId::new(stack_id);
        self.lifecycle.stack(&stack_id)?;
        let order = self.prepare(&stack_id, requested, &config)?;
        Ok(self.lifecycle.reset(&stack_id, &order, config)?)
    }

    /// Returns an active stack.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::Lifecycle`] when the stack is disposed or unknown.
    pub fn stack(&self, stack_id: &str) -> Result<&ComposedStack, OrchestratorError> {
        Ok(self.lifecycle.stack(&StackId::new(stack_id))?)
    }

    /// Returns snapshots of every active stack.
    #[must_use]
    pub fn debug_info(&self) -> Vec<StackSnapshot> {
        self.lifecycle.debug_info()
    }

    /// Returns the pool of instances shared across stacks.
    #[must_use]
    pub const fn shared_pool(&self) -> &SharedInstancePool {
        self.lifecycle.shared_pool()
    }

    /// Disposes every stack created with `auto_cleanup`.
    pub fn teardown_test_case(&mut self) -> Vec<TeardownReport> {
        self.lifecycle.teardown_test_case()
    }

    /// Runs one test case and always performs test-case teardown afterwards.
    ///
    /// A panic inside `test` is resumed once teardown has finished.
    pub fn with_test_case<R>(
        &mut self,
        test: impl FnOnce(&mut Self) -> R,
    ) -> (R, Vec<TeardownReport>) {
        let outcome = catch_unwind(AssertUnwindSafe(|| test(self)));
        let teardown = self.teardown_test_case();
        match outcome {
            Ok(output) => (output, teardown),
            Err(payload) => resume_unwind(payload),
        }
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    /// Runs every pre-composition check and returns the resolved order.
    fn prepare<I, N>(
        &self,
        stack_id: &StackId,
        requested: I,
        config: &StackConfig,
    ) -> Result<ResolvedOrder, OrchestratorError>
    where
        I: IntoIterator<Item = N>,
        N: Into<MockName>,
    {
        let mut requested: BTreeSet<MockName> = requested.into_iter().map(Into::into).collect();
        if requested.is_empty() {
            requested = self
                .registry
                .list_all()
                .into_iter()
                .filter(|entry| config.is_enabled(&entry.name))
                .map(|entry| entry.name.clone())
                .collect();
        }
        let out_of_scope = |name: &MockName| OrchestratorError::OutOfScope {
            stack_id: stack_id.clone(),
            mock_name: name.clone(),
        };
        if let Some(name) = requested.iter().find(|name| !config.is_enabled(name)) {
            return Err(out_of_scope(name));
        }
        let order = resolve(&requested, &self.registry).map_err(|source| OrchestratorError::Resolution {
            stack_id: stack_id.clone(),
            source,
        })?;
        if let Some(entry) = order.entries().iter().find(|entry| !config.is_enabled(&entry.name)) {
            return Err(out_of_scope(&entry.name));
        }
        for entry in order.entries().iter().filter(|entry| config.is_shared(&entry.name)) {
            if let Some(dependency) =
                entry.declared_dependencies.keys().find(|dependency| !config.is_shared(dependency))
            {
                return Err(OrchestratorError::UnsharedDependency {
                    stack_id: stack_id.clone(),
                    mock_name: entry.name.clone(),
                    dependency_name: dependency.clone(),
                });
            }
        }
        for entry in order.entries() {
            let report = check_compatibility(entry, &self.matrix, &self.registry);
            self.record_violations(&report);
            report.into_result().map_err(|source| OrchestratorError::Compatibility {
                stack_id: stack_id.clone(),
                source,
            })?;
        }
        for entry in order.entries() {
            let result = self.validate_entry(entry, config.strict_validation)?;
            if !result.is_valid {
                return Err(OrchestratorError::ValidationFailed {
                    stack_id: stack_id.clone(),
                    result: Box::new(result),
                });
            }
        }
        Ok(order)
    }

    /// Validates one entry and audits the lookup.
    fn validate_entry(
        &self,
        entry: &MockEntry,
        strict: bool,
    ) -> Result<ValidationResult, OrchestratorError> {
        let outcome = self.validator.validate(entry, &self.catalog, strict, self.clock.as_ref())?;
        self.audit.record(&AuditEvent::ValidationServed {
            timestamp: self.clock.now(),
            mock_name: entry.name.clone(),
            cache_hit: outcome.cache_hit,
            is_valid: outcome.result.is_valid,
            error_count: outcome.result.errors.len(),
            warning_count: outcome.result.warnings.len(),
        });
        Ok(outcome.result)
    }

    /// Audits a registry mutation.
    fn record_registry_change(&self, event: &RegistryEvent) {
        self.audit.record(&AuditEvent::RegistryChanged {
            timestamp: self.clock.now(),
            change: event.clone(),
        });
    }

    /// Audits every violation in a compliance report.
    fn record_violations(&self, report: &ComplianceReport) {
        for violation in &report.violations {
            self.audit.record(&AuditEvent::CompatibilityViolation {
                timestamp: self.clock.now(),
                mock_name: report.mock_name.clone(),
                code: violation.code(),
                message: violation.to_string(),
            });
        }
    }
}
