// crates/mockstack-core/src/runtime/lifecycle.rs
// ============================================================================
// Module: Mockstack Lifecycle Manager
// Description: Owns active stacks and drives their state machine.
// Purpose: Guarantee idempotent teardown and isolation between test cases.
// Dependencies: crate::core, crate::interfaces, crate::runtime
// ============================================================================

//! ## Overview
//! Every stack moves through `Uninitialized -> Composing -> Active ->
//! Disposing -> Disposed`. A failure while composing goes straight to
//! `Disposing -> Disposed` and the original error is returned. `Disposed` is
//! terminal: the id is kept as a tombstone so later calls fail with
//! [`LifecycleError::StackDisposed`]. Only `create_stack` may reuse it.
//!
//! Cleanup is idempotent and never stops at the first failing provider.
//! Every transition and teardown is reported to the audit sink.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::collections::btree_map::Entry;
use std::sync::Arc;

use thiserror::Error;

use crate::core::StackConfig;
use crate::core::StackId;
use crate::core::StackSnapshot;
use crate::core::StackState;
use crate::core::TeardownReport;
use crate::interfaces::Clock;
use crate::runtime::audit::AuditEvent;
use crate::runtime::audit::AuditSink;
use crate::runtime::composer::ComposedStack;
use crate::runtime::composer::CompositionError;
use crate::runtime::composer::SharedInstancePool;
use crate::runtime::composer::StackComposer;
use crate::runtime::resolver::ResolvedOrder;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Lifecycle errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    /// A stack with this id is already active.
    #[error("stack already active: {0}")]
    DuplicateStackId(StackId),
    /// The stack was disposed and cannot be used.
    #[error("stack disposed: {0}")]
    StackDisposed(StackId),
    /// No stack was ever created under this id.
    #[error("stack not found: {0}")]
    StackNotFound(StackId),
    /// A provider failed during composition.
    #[error(transparent)]
    Composition(#[from] Box<CompositionError>),
}

impl LifecycleError {
    /// Returns a stable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::DuplicateStackId(_) => "duplicate_stack_id",
            Self::StackDisposed(_) => "stack_disposed",
            Self::StackNotFound(_) => "stack_not_found",
            Self::Composition(_) => "composition_failed",
        }
    }
}

// ============================================================================
// SECTION: Live Stacks
// ============================================================================

/// Active stack with the config it was created from.
#[derive(Debug)]
struct LiveStack {
    /// Composed stack.
    stack: ComposedStack,
    /// Creation config.
    config: StackConfig,
}

// ============================================================================
// SECTION: Lifecycle Manager
// ============================================================================

/// Owner of every stack in one worker.
///
/// # Invariants
/// - A live id maps to a fully composed stack.
/// - An id is never both live and disposed.
/// - No composed provider is referenced once its stack is disposed.
pub struct LifecycleManager {
    /// Composer used for creation and teardown.
    composer: StackComposer,
    /// Active stacks keyed by id.
    live: BTreeMap<StackId, LiveStack>,
    /// Tombstones of disposed stacks.
    disposed: BTreeSet<StackId>,
    /// Timestamp source.
    clock: Arc<dyn Clock>,
    /// Audit sink.
    audit: Arc<dyn AuditSink>,
}

impl LifecycleManager {
    /// Creates a manager with no stacks.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, audit: Arc<dyn AuditSink>) -> Self {
        Self {
            composer: StackComposer::new(),
            live: BTreeMap::new(),
            disposed: BTreeSet::new(),
            clock,
            audit,
        }
    }

    /// Fails when `stack_id` is currently active.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::DuplicateStackId`] for an active id.
    pub fn ensure_available(&self, stack_id: &StackId) -> Result<(), LifecycleError> {
        if self.live.contains_key(stack_id) {
            return Err(LifecycleError::DuplicateStackId(stack_id.clone()));
        }
        Ok(())
    }

    /// Composes `order` and registers the stack under `stack_id`.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::DuplicateStackId`] when the id is active and
    /// [`LifecycleError::Composition`] when a provider fails.
    pub fn create_stack(
        &mut self,
        stack_id: StackId,
        order: &ResolvedOrder,
        config: StackConfig,
    ) -> Result<&ComposedStack, LifecycleError> {
        self.ensure_available(&stack_id)?;
        let live = self.compose(&stack_id, order, config)?;
        Ok(self.install(stack_id, live))
    }

    /// Returns the active stack registered under `stack_id`.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError`] when the stack is disposed or unknown.
    pub fn stack(&self, stack_id: &StackId) -> Result<&ComposedStack, LifecycleError> {
        match self.live.get(stack_id) {
            Some(live) => Ok(&live.stack),
            None => Err(self.inactive_error(stack_id)),
        }
    }

    /// Returns the lifecycle state of `stack_id`, if it was ever created.
    #[must_use]
    pub fn state(&self, stack_id: &StackId) -> Option<StackState> {
        if self.live.contains_key(stack_id) {
            Some(StackState::Active)
        } else if self.disposed.contains(stack_id) {
            Some(StackState::Disposed)
        } else {
            None
        }
    }

    /// Disposes a stack. Repeated calls after the first are no-ops.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::StackNotFound`] for an unknown id.
    pub fn cleanup(&mut self, stack_id: &StackId) -> Result<TeardownReport, LifecycleError> {
        if let Some(live) = self.live.remove(stack_id) {
            self.disposed.insert(stack_id.clone());
            return Ok(self.dispose(live.stack));
        }
        if self.disposed.contains(stack_id) {
            return Ok(TeardownReport::empty(stack_id.clone()));
        }
        Err(LifecycleError::StackNotFound(stack_id.clone()))
    }

    /// Disposes every active stack in id order.
    pub fn cleanup_all(&mut self) -> Vec<TeardownReport> {
        self.cleanup_where(|_| true)
    }

    /// Disposes every active stack created with `auto_cleanup`.
    pub fn teardown_test_case(&mut self) -> Vec<TeardownReport> {
        self.cleanup_where(|config| config.auto_cleanup)
    }

    /// Replaces an active stack with a freshly composed one under the same id.
    ///
    /// The old stack is disposed and the new one composed within this call,
    /// so no other caller can observe the id unmapped.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError`] when the id is not active or the new
    /// composition fails, in which case the id is left disposed.
    pub fn reset(
        &mut self,
        stack_id: &StackId,
        order: &ResolvedOrder,
        config: StackConfig,
    ) -> Result<&ComposedStack, LifecycleError> {
        let Some(previous) = self.live.remove(stack_id) else {
            return Err(self.inactive_error(stack_id));
        };
        self.disposed.insert(stack_id.clone());
        self.dispose(previous.stack);
        let live = self.compose(stack_id, order, config)?;
        Ok(self.install(stack_id.clone(), live))
    }

    /// Returns snapshots of every active stack, oldest first.
    ///
    /// Stacks created at the same instant are listed in id order.
    #[must_use]
    pub fn debug_info(&self) -> Vec<StackSnapshot> {
        let mut snapshots: Vec<StackSnapshot> = self.live.values().map(snapshot).collect();
        snapshots.sort_by(|left, right| {
            left.created_at
                .sort_key()
                .cmp(&right.created_at.sort_key())
                .then_with(|| left.stack_id.cmp(&right.stack_id))
        });
        snapshots
    }

    /// Returns the number of active stacks.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.live.len()
    }

    /// Returns the pool of instances shared across stacks.
    #[must_use]
    pub const fn shared_pool(&self) -> &SharedInstancePool {
        self.composer.shared_pool()
    }

    /// Returns the composer for isolated smoke tests.
    pub(crate) const fn composer_mut(&mut self) -> &mut StackComposer {
        &mut self.composer
    }

    /// Returns the error for an id that is not live.
    fn inactive_error(&self, stack_id: &StackId) -> LifecycleError {
        if self.disposed.contains(stack_id) {
            LifecycleError::StackDisposed(stack_id.clone())
        } else {
            LifecycleError::StackNotFound(stack_id.clone())
        }
    }

    /// Runs the composing half of the state machine.
    fn compose(
        &mut self,
        stack_id: &StackId,
        order: &ResolvedOrder,
        config: StackConfig,
    ) -> Result<LiveStack, LifecycleError> {
        self.transition(stack_id, StackState::Uninitialized, StackState::Composing);
        let created_at = self.clock.now();
        match self.composer.compose(stack_id, order, &config, created_at) {
            Ok(stack) => {
                self.transition(stack_id, StackState::Composing, StackState::Active);
                Ok(LiveStack {
                    stack,
                    config,
                })
            }
            Err(err) => {
                self.audit.record(&AuditEvent::CompositionFailed {
                    timestamp: self.clock.now(),
                    stack_id: stack_id.clone(),
                    mock_name: err.failed_mock.clone(),
                    message: err.cause.to_string(),
                });
                self.transition(stack_id, StackState::Composing, StackState::Disposing);
                self.record_teardown(err.teardown.clone());
                self.transition(stack_id, StackState::Disposing, StackState::Disposed);
                self.disposed.insert(stack_id.clone());
                Err(LifecycleError::Composition(Box::new(err)))
            }
        }
    }

    /// Stores a live stack under `stack_id` and returns it.
    fn install(&mut self, stack_id: StackId, live: LiveStack) -> &ComposedStack {
        self.disposed.remove(&stack_id);
        let live = match self.live.entry(stack_id) {
            Entry::Occupied(mut occupied) => {
                occupied.insert(live);
                occupied.into_mut()
            }
            Entry::Vacant(vacant) => vacant.insert(live),
        };
        &live.stack
    }

    /// Runs the disposing half of the state machine.
    fn dispose(&mut self, stack: ComposedStack) -> TeardownReport {
        let stack_id = stack.stack_id().clone();
        self.transition(&stack_id, StackState::Active, StackState::Disposing);
        let report = self.composer.release(stack);
        self.record_teardown(report.clone());
        self.transition(&stack_id, StackState::Disposing, StackState::Disposed);
        report
    }

    /// Disposes every live stack whose config matches `predicate`.
    fn cleanup_where(&mut self, predicate: impl Fn(&StackConfig) -> bool) -> Vec<TeardownReport> {
        let targets: Vec<StackId> = self
            .live
            .iter()
            .filter(|(_, live)| predicate(&live.config))
            .map(|(id, _)| id.clone())
            .collect();
        targets.iter().filter_map(|id| self.cleanup(id).ok()).collect()
    }

    /// Audits a state transition.
    fn transition(&self, stack_id: &StackId, from: StackState, to: StackState) {
        debug_assert!(from.can_transition_to(to), "illegal stack transition {from} -> {to}");
        self.audit.record(&AuditEvent::StackTransition {
            timestamp: self.clock.now(),
            stack_id: stack_id.clone(),
            from,
            to,
        });
    }

    /// Audits a teardown report.
    fn record_teardown(&self, report: TeardownReport) {
        self.audit.record(&AuditEvent::TeardownCompleted {
            timestamp: self.clock.now(),
            report,
        });
    }
}

/// Builds a snapshot of a live stack.
fn snapshot(live: &LiveStack) -> StackSnapshot {
    StackSnapshot {
        stack_id: live.stack.stack_id().clone(),
        state: StackState::Active,
        ordered_mock_names: live.stack.ordered_mock_names().to_vec(),
        instances: live.stack.instance_snapshots(),
        created_at: live.stack.created_at(),
        auto_cleanup: live.config.auto_cleanup,
    }
}
