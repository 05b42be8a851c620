// crates/mockstack-core/src/runtime/compatibility.rs
// ============================================================================
// Module: Mockstack Version Compatibility
// Description: Checks declared dependency ranges against registered versions.
// Purpose: Reject incompatible mock combinations before anything instantiates.
// Dependencies: crate::core, crate::runtime::registry, serde, thiserror
// ============================================================================

//! ## Overview
//! For every dependency an entry declares, the checker looks up the
//! dependency in the registry, parses its version, and requires it to lie
//! inside the declared range. When the [`CompatibilityMatrix`] pins a range
//! for the same dependency, the version must satisfy that too. Violations are
//! collected in dependency-name order rather than stopping at the first one.
//!
//! Only `major.minor.patch` take part in comparisons; pre-release and build
//! metadata are parsed and dropped.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::MockEntry;
use crate::core::MockName;
use crate::core::SemanticVersion;
use crate::core::VersionRange;
use crate::runtime::registry::MockRegistry;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Compatibility violation for one declared dependency.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompatibilityError {
    /// A declared dependency is not registered.
    #[error("mock `{mock_name}` depends on `{dependency_name}`, which is not registered")]
    MissingDependency {
        /// Mock declaring the dependency.
        mock_name: MockName,
        /// Missing dependency.
        dependency_name: MockName,
    },
    /// A registered dependency version falls outside a required range.
    #[error(
        "mock `{mock_name}` requires `{dependency_name}` {required}, but version {actual} is \
         registered"
    )]
    IncompatibleVersion {
        /// Mock declaring the dependency.
        mock_name: MockName,
        /// Dependency whose version is out of range.
        dependency_name: MockName,
        /// Range expression that was violated.
        required: String,
        /// Registered dependency version.
        actual: String,
    },
    /// A registered version string is not semantic versioning.
    #[error("mock `{mock_name}` has unparsable version `{version}`: {reason}")]
    InvalidVersion {
        /// Mock carrying the bad version.
        mock_name: MockName,
        /// Raw version string.
        version: String,
        /// Parser failure details.
        reason: String,
    },
}

impl CompatibilityError {
    /// Returns a stable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::MissingDependency {
                ..
            } => "missing_dependency",
            Self::IncompatibleVersion {
                ..
            } => "incompatible_version",
            Self::InvalidVersion {
                ..
            } => "invalid_version",
        }
    }
}

// ============================================================================
// SECTION: Matrix
// ============================================================================

/// Externally pinned version ranges keyed by mock name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompatibilityMatrix {
    /// Ranges keyed by dependency name.
    ranges: BTreeMap<MockName, VersionRange>,
}

impl CompatibilityMatrix {
    /// Creates an empty matrix.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a pinned range.
    #[must_use]
    pub fn with(mut self, name: impl Into<MockName>, range: VersionRange) -> Self {
        self.insert(name, range);
        self
    }

    /// Adds or replaces a pinned range, returning the previous one.
    pub fn insert(&mut self, name: impl Into<MockName>, range: VersionRange) -> Option<VersionRange> {
        self.ranges.insert(name.into(), range)
    }

    /// Returns the pinned range for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&VersionRange> {
        self.ranges.get(name)
    }

    /// Iterates pinned ranges in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&MockName, &VersionRange)> {
        self.ranges.iter()
    }

    /// Returns the number of pinned ranges.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// Returns true when nothing is pinned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

impl FromIterator<(MockName, VersionRange)> for CompatibilityMatrix {
    fn from_iter<T: IntoIterator<Item = (MockName, VersionRange)>>(iter: T) -> Self {
        Self {
            ranges: iter.into_iter().collect(),
        }
    }
}

// ============================================================================
// SECTION: Compliance Report
// ============================================================================

/// Compatibility outcome for one entry.
///
/// # Invariants
/// - `violations` are ordered by dependency name, the entry's own version first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComplianceReport {
    /// Checked mock.
    pub mock_name: MockName,
    /// Every violation found.
    pub violations: Vec<CompatibilityError>,
}

impl ComplianceReport {
    /// Returns true when no violations were found.
    #[must_use]
    pub fn is_compliant(&self) -> bool {
        self.violations.is_empty()
    }

    /// Converts the report into its first violation, if any.
    ///
    /// # Errors
    ///
    /// Returns the first [`CompatibilityError`] when the entry is not compliant.
    pub fn into_result(self) -> Result<(), CompatibilityError> {
        self.violations.into_iter().next().map_or(Ok(()), Err)
    }
}

// ============================================================================
// SECTION: Checker
// ============================================================================

/// Checks an entry's declared dependencies against the registry and matrix.
#[must_use]
pub fn check_compatibility(
    entry: &MockEntry,
    matrix: &CompatibilityMatrix,
    registry: &MockRegistry,
) -> ComplianceReport {
    let mut violations = Vec::new();
    if let Err(violation) = parse_registered(&entry.name, &entry.version) {
        violations.push(violation);
    }
    for (dependency_name, declared) in &entry.declared_dependencies {
        let Ok(dependency) = registry.get(dependency_name.as_str()) else {
            violations.push(CompatibilityError::MissingDependency {
                mock_name: entry.name.clone(),
                dependency_name: dependency_name.clone(),
            });
            continue;
        };
        let actual = match parse_registered(dependency_name, &dependency.version) {
            Ok(actual) => actual,
            Err(violation) => {
                violations.push(violation);
                continue;
            }
        };
        let pinned = matrix.get(dependency_name.as_str());
        let violated = [Some(declared), pinned]
            .into_iter()
            .flatten()
            .find(|range| !range.contains(actual));
        if let Some(range) = violated {
            violations.push(CompatibilityError::IncompatibleVersion {
                mock_name: entry.name.clone(),
                dependency_name: dependency_name.clone(),
                required: range.expression().to_string(),
                actual: dependency.version.clone(),
            });
        }
    }
    ComplianceReport {
        mock_name: entry.name.clone(),
        violations,
    }
}

/// Parses a registered version string.
fn parse_registered(name: &MockName, version: &str) -> Result<SemanticVersion, CompatibilityError> {
    SemanticVersion::parse(version).map_err(|err| CompatibilityError::InvalidVersion {
        mock_name: name.clone(),
        version: version.to_string(),
        reason: err.to_string(),
    })
}
