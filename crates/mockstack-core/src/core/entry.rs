// crates/mockstack-core/src/core/entry.rs
// ============================================================================
// Module: Mockstack Mock Entries
// Description: Registry entries describing one mock and its declared metadata.
// Purpose: Carry implementation, version, dependencies, and capability tags.
// Dependencies: crate::interfaces
// ============================================================================

//! ## Overview
//! A [`MockEntry`] is immutable once registered. Re-registering a name
//! replaces the entry wholesale. The implementation is a shared factory, so
//! cloning an entry (for example when a stack snapshots it) never duplicates
//! mock state.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::core::identifiers::MockName;
use crate::core::version::VersionError;
use crate::core::version::VersionRange;
use crate::interfaces::MockFactory;

// ============================================================================
// SECTION: Mock Entry
// ============================================================================

/// Registered mock: implementation plus declared metadata.
///
/// # Invariants
/// - `name` is the registry key.
/// - `declared_dependencies` never names the entry itself once registered.
#[derive(Clone)]
pub struct MockEntry {
    /// Unique registry key.
    pub name: MockName,
    /// Semantic version of this mock.
    pub version: String,
    /// Factory producing fresh mock state.
    pub implementation: Arc<dyn MockFactory>,
    /// Dependencies with the version range each one must satisfy.
    pub declared_dependencies: BTreeMap<MockName, VersionRange>,
    /// Capability tags whose contracts this mock must satisfy.
    pub capability_tags: BTreeSet<String>,
}

impl MockEntry {
    /// Creates an entry with no dependencies or capability tags.
    #[must_use]
    pub fn new(
        name: impl Into<MockName>,
        version: impl Into<String>,
        implementation: impl MockFactory + 'static,
    ) -> Self {
        Self::from_shared(name, version, Arc::new(implementation))
    }

    /// Creates an entry around an already shared factory.
    #[must_use]
    pub fn from_shared(
        name: impl Into<MockName>,
        version: impl Into<String>,
        implementation: Arc<dyn MockFactory>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            implementation,
            declared_dependencies: BTreeMap::new(),
            capability_tags: BTreeSet::new(),
        }
    }

    /// Declares a dependency on `name` within `range`.
    #[must_use]
    pub fn depends_on(mut self, name: impl Into<MockName>, range: VersionRange) -> Self {
        self.declared_dependencies.insert(name.into(), range);
        self
    }

    /// Declares a dependency from a range expression.
    ///
    /// # Errors
    ///
    /// Returns [`VersionError`] when the expression does not parse.
    pub fn try_depends_on(
        self,
        name: impl Into<MockName>,
        range: &str,
    ) -> Result<Self, VersionError> {
        let range = VersionRange::parse(range)?;
        Ok(self.depends_on(name, range))
    }

    /// Adds a capability tag.
    #[must_use]
    pub fn with_capability(mut self, tag: impl Into<String>) -> Self {
        self.capability_tags.insert(tag.into());
        self
    }

    /// Returns the names of declared dependencies in name order.
    pub fn dependency_names(&self) -> impl Iterator<Item = &MockName> {
        self.declared_dependencies.keys()
    }
}

impl fmt::Debug for MockEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockEntry")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("declared_dependencies", &self.declared_dependencies)
            .field("capability_tags", &self.capability_tags)
            .finish_non_exhaustive()
    }
}
