// crates/mockstack-core/src/runtime/composer.rs
// ============================================================================
// Module: Mockstack Stack Composer
// Description: Instantiates resolved mocks and nests them into one context.
// Purpose: Build isolated stacks and tear partial stacks down on failure.
// Dependencies: crate::core, crate::interfaces, crate::runtime::resolver
// ============================================================================

//! ## Overview
//! The composer walks a [`ResolvedOrder`] front to back. Each mock is
//! instantiated with handles to its direct dependencies and then wrapped
//! around the context built so far. Dependencies therefore sit innermost and
//! the last resolved mock is the outermost layer.
//!
//! Every stack gets fresh mock state. The exception is a mock named in
//! [`StackConfig::shared_mocks`]: it lives in the [`SharedInstancePool`], is
//! reference counted per holding stack, and is disposed when the last holder
//! releases it. Pool slots are keyed by registry revision, and a shared
//! instance is only wired to dependencies that are shared too, so it never
//! outlives a provider it holds.
//!
//! Provider failures, including panics, never leave partial state behind.
//! Already instantiated providers are torn down in reverse instantiation order
//! before the [`CompositionError`] is returned.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::any::Any;
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::panic::catch_unwind;

use thiserror::Error;

use crate::core::InstanceId;
use crate::core::MockEntry;
use crate::core::MockInstanceSnapshot;
use crate::core::MockName;
use crate::core::SmokeTestOutcome;
use crate::core::StackConfig;
use crate::core::StackId;
use crate::core::TeardownFailure;
use crate::core::TeardownReport;
use crate::core::Timestamp;
use crate::interfaces::InstantiationContext;
use crate::interfaces::MockError;
use crate::interfaces::MockHandle;
use crate::runtime::resolver::ResolvedOrder;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// A provider failed while a stack was being composed.
///
/// # Invariants
/// - Every provider instantiated before the failure has been torn down.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("stack `{stack_id}`: mock `{failed_mock}` failed to instantiate: {cause}")]
pub struct CompositionError {
    /// Stack being composed.
    pub stack_id: StackId,
    /// Provider that failed.
    pub failed_mock: MockName,
    /// Direct dependencies of the failing provider.
    pub dependencies: Vec<MockName>,
    /// Underlying failure.
    pub cause: MockError,
    /// Teardown of the providers instantiated before the failure.
    pub teardown: TeardownReport,
}

impl CompositionError {
    /// Returns a stable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self.cause {
            MockError::Panicked(_) => "provider_panicked",
            _ => "provider_failed",
        }
    }
}

// ============================================================================
// SECTION: Composed Context
// ============================================================================

/// One provider wrapper around an inner context.
#[derive(Debug, Clone)]
struct ContextLayer {
    /// Provider at this layer.
    handle: MockHandle,
    /// Context wrapped by this provider.
    inner: ComposedContext,
}

/// Nested provider chain; the outermost layer is the last resolved mock.
#[derive(Debug, Clone, Default)]
pub struct ComposedContext {
    /// Outermost layer, `None` for an empty stack.
    outer: Option<Box<ContextLayer>>,
}

impl ComposedContext {
    /// Wraps `inner` in a new outermost provider.
    #[must_use]
    pub fn wrap(handle: MockHandle, inner: Self) -> Self {
        Self {
            outer: Some(Box::new(ContextLayer {
                handle,
                inner,
            })),
        }
    }

    /// Returns the outermost provider.
    #[must_use]
    pub fn outermost(&self) -> Option<&MockHandle> {
        self.outer.as_ref().map(|layer| &layer.handle)
    }

    /// Finds the nearest provider named `name`, walking outermost to innermost.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&MockHandle> {
        self.layers().find(|handle| handle.name().as_str() == name)
    }

    /// Iterates providers from outermost to innermost.
    pub fn layers(&self) -> impl Iterator<Item = &MockHandle> {
        let mut cursor = self.outer.as_deref();
        std::iter::from_fn(move || {
            let layer = cursor?;
            cursor = layer.inner.outer.as_deref();
            Some(&layer.handle)
        })
    }

    /// Returns the nesting depth.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.layers().count()
    }
}

impl fmt::Display for ComposedContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.layers().map(|handle| handle.name().as_str()).collect();
        write!(f, "[{}]", names.join(" > "))
    }
}

// ============================================================================
// SECTION: Composed Stack
// ============================================================================

/// Fully composed stack for one test case.
///
/// # Invariants
/// - `handles` follow initialization order and match `ordered_mock_names`.
#[derive(Debug, Clone)]
pub struct ComposedStack {
    /// Stack identifier.
    stack_id: StackId,
    /// Initialization order.
    ordered_mock_names: Vec<MockName>,
    /// Provider handles in initialization order.
    handles: Vec<MockHandle>,
    /// Nested provider context.
    context: ComposedContext,
    /// Composition time.
    created_at: Timestamp,
}

impl ComposedStack {
    /// Returns the stack identifier.
    #[must_use]
    pub const fn stack_id(&self) -> &StackId {
        &self.stack_id
    }

    /// Returns the initialization order.
    #[must_use]
    pub fn ordered_mock_names(&self) -> &[MockName] {
        &self.ordered_mock_names
    }

    /// Returns provider handles in initialization order.
    #[must_use]
    pub fn handles(&self) -> &[MockHandle] {
        &self.handles
    }

    /// Returns the handle of the named mock.
    #[must_use]
    pub fn handle(&self, name: &str) -> Option<&MockHandle> {
        self.handles.iter().find(|handle| handle.name().as_str() == name)
    }

    /// Returns the nested provider context.
    #[must_use]
    pub const fn context(&self) -> &ComposedContext {
        &self.context
    }

    /// Returns the composition time.
    #[must_use]
    pub const fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// Returns per-instance snapshots in initialization order.
    #[must_use]
    pub fn instance_snapshots(&self) -> Vec<MockInstanceSnapshot> {
        self.handles
            .iter()
            .map(|handle| MockInstanceSnapshot {
                mock_name: handle.name().clone(),
                instance_id: handle.id(),
                shared: handle.is_shared(),
            })
            .collect()
    }
}

// ============================================================================
// SECTION: Shared Instance Pool
// ============================================================================

/// Shared instance plus the stacks holding it.
#[derive(Debug)]
struct SharedSlot {
    /// Shared handle.
    handle: MockHandle,
    /// Stacks currently holding the instance.
    holders: BTreeSet<StackId>,
}

/// Outcome of releasing a shared instance.
#[derive(Debug)]
enum SharedRelease {
    /// Other stacks still hold the instance.
    Retained,
    /// The last holder released it; the caller disposes the instance.
    Last,
    /// The stack did not hold the instance.
    NotHeld,
}

/// Reference-counted instances shared across stacks.
///
/// Slots are keyed by mock name and registry revision, so a stack composed
/// after an entry is replaced never picks up the replaced implementation.
#[derive(Debug, Default)]
pub struct SharedInstancePool {
    /// Shared slots keyed by mock name and registry revision.
    slots: BTreeMap<(MockName, u64), SharedSlot>,
}

impl SharedInstancePool {
    /// Returns the number of stacks holding a shared instance of `name`,
    /// summed over every live revision.
    #[must_use]
    pub fn holders(&self, name: &str) -> usize {
        self.slots_named(name).map(|slot| slot.holders.len()).sum()
    }

    /// Returns the names of live shared instances.
    #[must_use]
    pub fn names(&self) -> Vec<MockName> {
        let names: BTreeSet<&MockName> = self.slots.keys().map(|(name, _)| name).collect();
        names.into_iter().cloned().collect()
    }

    /// Iterates the slots of every revision of `name`.
    fn slots_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a SharedSlot> + 'a {
        self.slots
            .iter()
            .filter(move |((slot_name, _), _)| slot_name.as_str() == name)
            .map(|(_, slot)| slot)
    }

    /// Adds `stack_id` as a holder of the existing instance, if any.
    fn acquire(&mut self, name: &MockName, revision: u64, stack_id: &StackId) -> Option<MockHandle> {
        let slot = self.slots.get_mut(&(name.clone(), revision))?;
        slot.holders.insert(stack_id.clone());
        Some(slot.handle.clone())
    }

    /// Stores a freshly created shared instance held by `stack_id`.
    fn insert(&mut self, handle: MockHandle, revision: u64, stack_id: &StackId) {
        self.slots.insert(
            (handle.name().clone(), revision),
            SharedSlot {
                handle,
                holders: BTreeSet::from([stack_id.clone()]),
            },
        );
    }

    /// Drops `stack_id` as a holder of the instance behind `handle`.
    fn release(&mut self, handle: &MockHandle, stack_id: &StackId) -> SharedRelease {
        let Some(key) = self
            .slots
            .iter()
            .find(|((name, _), slot)| name == handle.name() && slot.handle.same_instance(handle))
            .map(|(key, _)| key.clone())
        else {
            return SharedRelease::NotHeld;
        };
        let Some(slot) = self.slots.get_mut(&key) else {
            return SharedRelease::NotHeld;
        };
        if !slot.holders.remove(stack_id) {
            return SharedRelease::NotHeld;
        }
        if !slot.holders.is_empty() {
            return SharedRelease::Retained;
        }
        self.slots.remove(&key);
        SharedRelease::Last
    }
}

// ============================================================================
// SECTION: Composer
// ============================================================================

/// Builds stacks from resolved orders.
#[derive(Debug, Default)]
pub struct StackComposer {
    /// Last issued instance identifier.
    last_instance: u64,
    /// Instances shared across stacks.
    shared: SharedInstancePool,
}

impl StackComposer {
    /// Creates a composer with an empty shared pool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the shared instance pool.
    #[must_use]
    pub const fn shared_pool(&self) -> &SharedInstancePool {
        &self.shared
    }

    /// Instantiates and nests every mock in `order`.
    ///
    /// # Errors
    ///
    /// Returns [`CompositionError`] when a provider fails or panics; providers
    /// instantiated before it are torn down first.
    pub fn compose(
        &mut self,
        stack_id: &StackId,
        order: &ResolvedOrder,
        config: &StackConfig,
        created_at: Timestamp,
    ) -> Result<ComposedStack, CompositionError> {
        let mut handles: Vec<MockHandle> = Vec::with_capacity(order.len());
        for (entry, revision) in order.entries().iter().zip(order.revisions()) {
            match self.provide(stack_id, entry, *revision, config, &handles) {
                Ok(handle) => handles.push(handle),
                Err(cause) => {
                    let teardown = self.teardown(stack_id, handles.iter().rev());
                    return Err(CompositionError {
                        stack_id: stack_id.clone(),
                        failed_mock: entry.name.clone(),
                        dependencies: entry.dependency_names().cloned().collect(),
                        cause,
                        teardown,
                    });
                }
            }
        }
        let context = handles.iter().fold(ComposedContext::default(), |inner, handle| {
            ComposedContext::wrap(handle.clone(), inner)
        });
        Ok(ComposedStack {
            stack_id: stack_id.clone(),
            ordered_mock_names: order.names(),
            handles,
            context,
            created_at,
        })
    }

    /// Disposes a stack's providers innermost first.
    pub fn release(&mut self, stack: ComposedStack) -> TeardownReport {
        self.teardown(&stack.stack_id, stack.handles.iter())
    }

    /// Composes `order` in isolation, smoke-tests `target`, and tears it down.
    pub fn smoke_test(
        &mut self,
        stack_id: &StackId,
        order: &ResolvedOrder,
        target: &MockName,
        created_at: Timestamp,
    ) -> SmokeTestOutcome {
        let stack = match self.compose(stack_id, order, &StackConfig::default(), created_at) {
            Ok(stack) => stack,
            Err(err) => {
                return SmokeTestOutcome::RenderFailure {
                    mock_name: err.failed_mock,
                    message: err.cause.to_string(),
                };
            }
        };
        let outcome = match stack.handle(target.as_str()) {
            Some(handle) => match guarded(|| handle.smoke_test()) {
                Ok(()) => SmokeTestOutcome::Passed,
                Err(err) => SmokeTestOutcome::RenderFailure {
                    mock_name: target.clone(),
                    message: err.to_string(),
                },
            },
            None => SmokeTestOutcome::Skipped {
                reason: format!("`{target}` is not part of the resolved order"),
            },
        };
        let report = self.release(stack);
        match (outcome, report.failures.into_iter().next()) {
            (SmokeTestOutcome::Passed, Some(failure)) => SmokeTestOutcome::RenderFailure {
                mock_name: failure.mock_name,
                message: failure.message,
            },
            (outcome, _) => outcome,
        }
    }

    /// Produces the handle for one entry, instantiating it when needed.
    ///
    /// A shared instance outlives the stack that created it, so it is only
    /// handed dependencies that are shared as well.
    fn provide(
        &mut self,
        stack_id: &StackId,
        entry: &MockEntry,
        revision: u64,
        config: &StackConfig,
        built: &[MockHandle],
    ) -> Result<MockHandle, MockError> {
        let shared = config.is_shared(&entry.name);
        if shared && let Some(handle) = self.shared.acquire(&entry.name, revision, stack_id) {
            return Ok(handle);
        }
        let dependencies: BTreeMap<MockName, MockHandle> = built
            .iter()
            .filter(|handle| entry.declared_dependencies.contains_key(handle.name()))
            .filter(|handle| !shared || handle.is_shared())
            .map(|handle| (handle.name().clone(), handle.clone()))
            .collect();
        let ctx = InstantiationContext {
            stack_id,
            mock_name: &entry.name,
            dependencies: &dependencies,
        };
        let instance = guarded(|| entry.implementation.instantiate(&ctx))?;
        self.last_instance = self.last_instance.saturating_add(1);
        let handle =
            MockHandle::new(entry.name.clone(), InstanceId::new(self.last_instance), shared, instance);
        if shared {
            self.shared.insert(handle.clone(), revision, stack_id);
        }
        Ok(handle)
    }

    /// Releases handles in the given order, collecting a report.
    fn teardown<'a>(
        &mut self,
        stack_id: &StackId,
        handles: impl Iterator<Item = &'a MockHandle>,
    ) -> TeardownReport {
        let mut report = TeardownReport::empty(stack_id.clone());
        for handle in handles {
            let name = handle.name().clone();
            if handle.is_shared() {
                match self.shared.release(handle, stack_id) {
                    SharedRelease::Retained => {
                        report.released_shared.push(name);
                        continue;
                    }
                    SharedRelease::NotHeld => continue,
                    SharedRelease::Last => {}
                }
            }
            match guarded(|| handle.dispose()) {
                Ok(()) => report.disposed.push(name),
                Err(err) => report.failures.push(TeardownFailure {
                    mock_name: name,
                    message: err.to_string(),
                }),
            }
        }
        report
    }
}

// ============================================================================
// SECTION: Panic Guard
// ============================================================================

/// Runs a mock callback, converting a panic into [`MockError::Panicked`].
fn guarded<T>(call: impl FnOnce() -> Result<T, MockError>) -> Result<T, MockError> {
    catch_unwind(AssertUnwindSafe(call))
        .unwrap_or_else(|payload| Err(MockError::Panicked(panic_message(payload.as_ref()))))
}

/// Extracts a readable message from a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}
