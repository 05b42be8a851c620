// crates/mockstack-core/src/core/stack.rs
// ============================================================================
// Module: Mockstack Stack Records
// Description: Stack configuration, lifecycle states, and snapshots.
// Purpose: Provide serializable views of stacks for callers and diagnostics.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! These types describe stacks without holding live mock state. The live
//! stack (with instance handles) is owned by the lifecycle manager; callers
//! and tooling see [`StackSnapshot`] values.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::InstanceId;
use crate::core::identifiers::MockName;
use crate::core::identifiers::StackId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Stack Config
// ============================================================================

/// Per-stack composition options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackConfig {
    /// Mocks allowed in this stack; `None` allows every registered mock.
    #[serde(default)]
    pub enabled_mocks: Option<BTreeSet<MockName>>,
    /// Mocks whose instance is shared with other stacks naming them here.
    #[serde(default)]
    pub shared_mocks: BTreeSet<MockName>,
    /// Report members undeclared by any contract as warnings.
    #[serde(default)]
    pub strict_validation: bool,
    /// Dispose the stack automatically at test-case teardown.
    #[serde(default = "default_auto_cleanup")]
    pub auto_cleanup: bool,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            enabled_mocks: None,
            shared_mocks: BTreeSet::new(),
            strict_validation: false,
            auto_cleanup: default_auto_cleanup(),
        }
    }
}

impl StackConfig {
    /// Restricts the stack to the given mocks.
    #[must_use]
    pub fn with_enabled<I, N>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<MockName>,
    {
        self.enabled_mocks = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Marks the given mocks as shared across stacks.
    #[must_use]
    pub fn with_shared<I, N>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<MockName>,
    {
        self.shared_mocks.extend(names.into_iter().map(Into::into));
        self
    }

    /// Enables strict validation.
    #[must_use]
    pub const fn strict(mut self) -> Self {
        self.strict_validation = true;
        self
    }

    /// Disables automatic test-case teardown for this stack.
    #[must_use]
    pub const fn without_auto_cleanup(mut self) -> Self {
        self.auto_cleanup = false;
        self
    }

    /// Returns true when `name` may be part of this stack.
    #[must_use]
    pub fn is_enabled(&self, name: &MockName) -> bool {
        self.enabled_mocks.as_ref().is_none_or(|enabled| enabled.contains(name))
    }

    /// Returns true when `name` is shared across stacks.
    #[must_use]
    pub fn is_shared(&self, name: &MockName) -> bool {
        self.shared_mocks.contains(name)
    }
}

/// Default for [`StackConfig::auto_cleanup`].
const fn default_auto_cleanup() -> bool {
    true
}

// ============================================================================
// SECTION: Stack State
// ============================================================================

/// Lifecycle state of a stack.
///
/// # Invariants
/// - Transitions only move forward; `Disposed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StackState {
    /// Id reserved, nothing built yet.
    Uninitialized,
    /// Providers are being instantiated.
    Composing,
    /// Fully composed and usable.
    Active,
    /// Providers are being disposed.
    Disposing,
    /// Fully released; never reused.
    Disposed,
}

impl StackState {
    /// Returns a stable label for the state.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Composing => "composing",
            Self::Active => "active",
            Self::Disposing => "disposing",
            Self::Disposed => "disposed",
        }
    }

    /// Returns true when moving from `self` to `next` is allowed.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Uninitialized, Self::Composing)
                | (Self::Composing | Self::Active, Self::Disposing)
                | (Self::Composing, Self::Active)
                | (Self::Disposing, Self::Disposed)
        )
    }
}

impl fmt::Display for StackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Snapshots
// ============================================================================

/// One composed mock inside a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MockInstanceSnapshot {
    /// Mock name.
    pub mock_name: MockName,
    /// Instance identifier.
    pub instance_id: InstanceId,
    /// Whether the instance is shared across stacks.
    pub shared: bool,
}

/// Read-only view of an active stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackSnapshot {
    /// Stack identifier.
    pub stack_id: StackId,
    /// Lifecycle state.
    pub state: StackState,
    /// Initialization order.
    pub ordered_mock_names: Vec<MockName>,
    /// Instances in initialization order.
    pub instances: Vec<MockInstanceSnapshot>,
    /// Creation time.
    pub created_at: Timestamp,
    /// Whether the stack is disposed at test-case teardown.
    pub auto_cleanup: bool,
}

// ============================================================================
// SECTION: Teardown Reports
// ============================================================================

/// Dispose failure recorded during teardown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeardownFailure {
    /// Mock whose disposal failed.
    pub mock_name: MockName,
    /// Failure description.
    pub message: String,
}

/// Outcome of tearing down one stack.
///
/// # Invariants
/// - Every composed mock appears in exactly one of `disposed`, `released_shared`, or `failures`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeardownReport {
    /// Torn-down stack.
    pub stack_id: StackId,
    /// Mocks disposed, in disposal order.
    pub disposed: Vec<MockName>,
    /// Shared mocks released while other stacks still hold them.
    pub released_shared: Vec<MockName>,
    /// Mocks whose disposal failed.
    pub failures: Vec<TeardownFailure>,
}

impl TeardownReport {
    /// Creates an empty report for a stack.
    #[must_use]
    pub const fn empty(stack_id: StackId) -> Self {
        Self {
            stack_id,
            disposed: Vec::new(),
            released_shared: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// Returns true when every disposal succeeded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}
