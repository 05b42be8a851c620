// crates/mockstack-core/src/runtime/registry.rs
// ============================================================================
// Module: Mockstack Mock Registry
// Description: Process-scoped store of named mock entries.
// Purpose: Hold registrations in insertion order and announce every mutation.
// Dependencies: crate::core, crate::interfaces, thiserror
// ============================================================================

//! ## Overview
//! The registry is the only place mock entries live. Registration replaces an
//! existing entry wholesale while keeping its original insertion position, so
//! resolution tie-breaks stay stable across re-registration. Every mutation is
//! delivered synchronously to subscribed [`RegistryObserver`]s before the
//! mutating call returns; the validation cache relies on that to never serve
//! a stale result.
//!
//! Registration never touches active stacks. Stacks compose from the entry
//! snapshots taken at resolution time.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;

use crate::core::MockEntry;
use crate::core::MockName;
use crate::interfaces::RegistryEvent;
use crate::interfaces::RegistryObserver;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum mock name length in bytes.
pub const MAX_MOCK_NAME_BYTES: usize = 128;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Registry errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The mock name failed validation.
    #[error("invalid mock name `{name}`: {reason}")]
    InvalidName {
        /// Rejected name.
        name: String,
        /// Rejection reason.
        reason: String,
    },
    /// The entry declares a dependency on itself.
    #[error("mock `{0}` declares a dependency on itself")]
    SelfDependency(MockName),
    /// No entry is registered under the name.
    #[error("mock not registered: {0}")]
    NotFound(MockName),
}

impl RegistryError {
    /// Returns a stable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidName {
                ..
            } => "invalid_mock_name",
            Self::SelfDependency(_) => "self_dependency",
            Self::NotFound(_) => "mock_not_found",
        }
    }
}

// ============================================================================
// SECTION: Registered Entry
// ============================================================================

/// Entry plus the bookkeeping the registry keeps for it.
#[derive(Debug, Clone)]
pub struct RegisteredMock {
    /// Registered entry.
    pub entry: MockEntry,
    /// Insertion sequence; preserved across replacement.
    pub sequence: u64,
    /// Registration revision; bumped on every replacement.
    pub revision: u64,
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Process-scoped mock registry.
///
/// # Invariants
/// - Names are unique.
/// - `sequence` values are unique and reflect first insertion.
/// - `revision` values are unique and strictly increase with every mutation.
#[derive(Default)]
pub struct MockRegistry {
    /// Entries keyed by name.
    entries: BTreeMap<MockName, RegisteredMock>,
    /// Next insertion sequence.
    next_sequence: u64,
    /// Last issued revision.
    last_revision: u64,
    /// Mutation subscribers in subscription order.
    observers: Vec<Arc<dyn RegistryObserver>>,
}

impl MockRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes an observer to registry mutations.
    pub fn subscribe(&mut self, observer: Arc<dyn RegistryObserver>) {
        self.observers.push(observer);
    }

    /// Registers an entry, replacing any prior entry with the same name.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when the name is invalid or the entry
    /// depends on itself.
    pub fn register(&mut self, entry: MockEntry) -> Result<RegistryEvent, RegistryError> {
        validate_name(entry.name.as_str())?;
        if entry.declared_dependencies.contains_key(&entry.name) {
            return Err(RegistryError::SelfDependency(entry.name));
        }
        self.last_revision = self.last_revision.saturating_add(1);
        let revision = self.last_revision;
        let name = entry.name.clone();
        let event = match self.entries.get_mut(&name) {
            Some(existing) => {
                let previous_revision = existing.revision;
                existing.entry = entry;
                existing.revision = revision;
                RegistryEvent::Replaced {
                    name,
                    previous_revision,
                    revision,
                }
            }
            None => {
                let sequence = self.next_sequence;
                self.next_sequence = self.next_sequence.saturating_add(1);
                self.entries.insert(
                    name.clone(),
                    RegisteredMock {
                        entry,
                        sequence,
                        revision,
                    },
                );
                RegistryEvent::Registered {
                    name,
                    revision,
                }
            }
        };
        self.notify(&event);
        Ok(event)
    }

    /// Removes an entry; returns `None` when nothing was registered.
    pub fn unregister(&mut self, name: &str) -> Option<RegistryEvent> {
        let removed = self.entries.remove(name)?;
        let event = RegistryEvent::Unregistered {
            name: removed.entry.name,
            revision: removed.revision,
        };
        self.notify(&event);
        Some(event)
    }

    /// Returns the entry registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] when no entry is registered.
    pub fn get(&self, name: &str) -> Result<&MockEntry, RegistryError> {
        self.entries
            .get(name)
            .map(|registered| &registered.entry)
            .ok_or_else(|| RegistryError::NotFound(MockName::new(name)))
    }

    /// Returns the entry with its bookkeeping, if registered.
    #[must_use]
    pub fn snapshot(&self, name: &str) -> Option<&RegisteredMock> {
        self.entries.get(name)
    }

    /// Returns all entries in insertion order.
    #[must_use]
    pub fn list_all(&self) -> Vec<&MockEntry> {
        let mut registered: Vec<&RegisteredMock> = self.entries.values().collect();
        registered.sort_by_key(|registered| registered.sequence);
        registered.into_iter().map(|registered| &registered.entry).collect()
    }

    /// Returns true when `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Returns the number of registered entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Delivers an event to every observer.
    fn notify(&self, event: &RegistryEvent) {
        for observer in &self.observers {
            observer.on_registry_event(event);
        }
    }
}

// ============================================================================
// SECTION: Name Validation
// ============================================================================

/// Validates a mock name.
///
/// # Errors
///
/// Returns [`RegistryError::InvalidName`] when the name is empty, too long,
/// or contains whitespace or control characters.
pub fn validate_name(name: &str) -> Result<(), RegistryError> {
    let reason = if name.is_empty() {
        Some("name must not be empty".to_string())
    } else if name.len() > MAX_MOCK_NAME_BYTES {
        Some(format!("name exceeds {MAX_MOCK_NAME_BYTES} bytes"))
    } else if name.chars().any(|ch| ch.is_whitespace() || ch.is_control()) {
        Some("name must not contain whitespace or control characters".to_string())
    } else {
        None
    };
    reason.map_or(Ok(()), |reason| {
        Err(RegistryError::InvalidName {
            name: name.to_string(),
            reason,
        })
    })
}
