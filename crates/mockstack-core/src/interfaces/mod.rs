// crates/mockstack-core/src/interfaces/mod.rs
// ============================================================================
// Module: Mockstack Interfaces
// Description: Contract surfaces implemented by mocks, observers, and clocks.
// Purpose: Keep the engine independent of concrete mock implementations.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! Mocks plug into the engine through two traits: a [`MockFactory`] registered
//! once per entry, and the [`MockInstance`] state it produces for every stack.
//! The registry announces mutations through [`RegistryObserver`], and all time
//! flows through a [`Clock`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::Mutex;

use serde::Serialize;
use thiserror::Error;

use crate::core::contract::MockShape;
use crate::core::identifiers::InstanceId;
use crate::core::identifiers::MockName;
use crate::core::identifiers::StackId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Mock Errors
// ============================================================================

/// Errors raised by mock implementations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MockError {
    /// The mock reported a failure.
    #[error("mock failure: {0}")]
    Failed(String),
    /// The mock panicked; the payload message is captured.
    #[error("mock panicked: {0}")]
    Panicked(String),
    /// A required dependency handle was not supplied.
    #[error("dependency handle unavailable: {0}")]
    DependencyUnavailable(MockName),
    /// The instance lock was poisoned by an earlier panic.
    #[error("mock instance poisoned: {0}")]
    Poisoned(MockName),
}

// ============================================================================
// SECTION: Mock Instance
// ============================================================================

/// Live state of one instantiated mock.
pub trait MockInstance: Any + Send {
    /// Best-effort render/invocation check used by debug reports.
    ///
    /// # Errors
    ///
    /// Returns [`MockError`] when the mock cannot perform its basic duties.
    fn smoke_test(&mut self) -> Result<(), MockError> {
        Ok(())
    }

    /// Releases resources held by the instance.
    ///
    /// # Errors
    ///
    /// Returns [`MockError`] when teardown fails; teardown of other mocks continues.
    fn dispose(&mut self) -> Result<(), MockError> {
        Ok(())
    }
}

/// Shared handle to an instantiated mock.
///
/// # Invariants
/// - Clones refer to the same instance and share its [`InstanceId`].
#[derive(Clone)]
pub struct MockHandle {
    /// Owning mock name.
    name: MockName,
    /// Process-unique instance identifier.
    id: InstanceId,
    /// Whether the instance is shared across stacks.
    shared: bool,
    /// Instance state.
    inner: Arc<Mutex<Box<dyn MockInstance>>>,
}

impl MockHandle {
    /// Wraps a freshly instantiated mock.
    #[must_use]
    pub fn new(name: MockName, id: InstanceId, shared: bool, instance: Box<dyn MockInstance>) -> Self {
        Self {
            name,
            id,
            shared,
            inner: Arc::new(Mutex::new(instance)),
        }
    }

    /// Returns the owning mock name.
    #[must_use]
    pub const fn name(&self) -> &MockName {
        &self.name
    }

    /// Returns the instance identifier.
    #[must_use]
    pub const fn id(&self) -> InstanceId {
        self.id
    }

    /// Returns true when the instance is shared across stacks.
    #[must_use]
    pub const fn is_shared(&self) -> bool {
        self.shared
    }

    /// Runs `f` against the instance when it has concrete type `T`.
    ///
    /// Returns `None` on a type mismatch or a poisoned instance.
    pub fn with<T: MockInstance, R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        let guard = self.inner.lock().ok()?;
        let any: &dyn Any = &**guard;
        any.downcast_ref::<T>().map(f)
    }

    /// Runs `f` against the instance mutably when it has concrete type `T`.
    ///
    /// Returns `None` on a type mismatch or a poisoned instance.
    pub fn with_mut<T: MockInstance, R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let mut guard = self.inner.lock().ok()?;
        let any: &mut dyn Any = &mut **guard;
        any.downcast_mut::<T>().map(f)
    }

    /// Runs the instance smoke test.
    ///
    /// # Errors
    ///
    /// Returns [`MockError`] when the smoke test fails or the lock is poisoned.
    pub fn smoke_test(&self) -> Result<(), MockError> {
        let mut guard = self.inner.lock().map_err(|_| MockError::Poisoned(self.name.clone()))?;
        guard.smoke_test()
    }

    /// Disposes the instance.
    ///
    /// # Errors
    ///
    /// Returns [`MockError`] when disposal fails or the lock is poisoned.
    pub fn dispose(&self) -> Result<(), MockError> {
        let mut guard = self.inner.lock().map_err(|_| MockError::Poisoned(self.name.clone()))?;
        guard.dispose()
    }

    /// Returns true when both handles point at the same instance.
    #[must_use]
    pub fn same_instance(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for MockHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockHandle")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("shared", &self.shared)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// SECTION: Mock Factory
// ============================================================================

/// Inputs available to a factory while it instantiates a mock.
#[derive(Debug, Clone, Copy)]
pub struct InstantiationContext<'a> {
    /// Stack being composed.
    pub stack_id: &'a StackId,
    /// Mock being instantiated.
    pub mock_name: &'a MockName,
    /// Handles of the mock's direct dependencies.
    pub dependencies: &'a BTreeMap<MockName, MockHandle>,
}

impl InstantiationContext<'_> {
    /// Returns the handle of a direct dependency.
    ///
    /// # Errors
    ///
    /// Returns [`MockError::DependencyUnavailable`] when `name` was not supplied.
    pub fn dependency(&self, name: &str) -> Result<&MockHandle, MockError> {
        self.dependencies
            .get(name)
            .ok_or_else(|| MockError::DependencyUnavailable(MockName::new(name)))
    }
}

/// Implementation registered for a mock entry.
pub trait MockFactory: Send + Sync {
    /// Returns the runtime shape the mock exposes.
    fn shape(&self) -> MockShape;

    /// Instantiates fresh mock state.
    ///
    /// # Errors
    ///
    /// Returns [`MockError`] when the mock cannot be instantiated.
    fn instantiate(
        &self,
        ctx: &InstantiationContext<'_>,
    ) -> Result<Box<dyn MockInstance>, MockError>;
}

/// Boxed instantiation closure used by [`FnMockFactory`].
type InstantiateFn =
    dyn Fn(&InstantiationContext<'_>) -> Result<Box<dyn MockInstance>, MockError> + Send + Sync;

/// Factory built from a shape and an instantiation closure.
pub struct FnMockFactory {
    /// Declared runtime shape.
    shape: MockShape,
    /// Instantiation closure.
    instantiate: Box<InstantiateFn>,
}

impl FnMockFactory {
    /// Creates a factory from a shape and closure.
    #[must_use]
    pub fn new<F>(shape: MockShape, instantiate: F) -> Self
    where
        F: Fn(&InstantiationContext<'_>) -> Result<Box<dyn MockInstance>, MockError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            shape,
            instantiate: Box::new(instantiate),
        }
    }
}

impl MockFactory for FnMockFactory {
    fn shape(&self) -> MockShape {
        self.shape.clone()
    }

    fn instantiate(
        &self,
        ctx: &InstantiationContext<'_>,
    ) -> Result<Box<dyn MockInstance>, MockError> {
        (self.instantiate)(ctx)
    }
}

// ============================================================================
// SECTION: Registry Observer
// ============================================================================

/// Mutation announced by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RegistryEvent {
    /// A new name was registered.
    Registered {
        /// Registered mock.
        name: MockName,
        /// New revision.
        revision: u64,
    },
    /// An existing entry was replaced.
    Replaced {
        /// Replaced mock.
        name: MockName,
        /// Revision of the removed entry.
        previous_revision: u64,
        /// Revision of the new entry.
        revision: u64,
    },
    /// An entry was removed.
    Unregistered {
        /// Removed mock.
        name: MockName,
        /// Revision of the removed entry.
        revision: u64,
    },
}

impl RegistryEvent {
    /// Returns the affected mock name.
    #[must_use]
    pub const fn name(&self) -> &MockName {
        match self {
            Self::Registered {
                name,
                ..
            }
            | Self::Replaced {
                name,
                ..
            }
            | Self::Unregistered {
                name,
                ..
            } => name,
        }
    }
}

/// Synchronous subscriber to registry mutations.
pub trait RegistryObserver: Send + Sync {
    /// Handles a mutation before the mutating call returns.
    fn on_registry_event(&self, event: &RegistryEvent);
}

// ============================================================================
// SECTION: Clock
// ============================================================================

/// Source of timestamps for engine records.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> Timestamp;
}
