// crates/mockstack-core/src/core/validation.rs
// ============================================================================
// Module: Mockstack Validation Records
// Description: Structural validation results and debug reports.
// Purpose: Report mock/contract mismatches as data instead of failures.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Validation never throws for a structural mismatch. Errors and warnings are
//! collected into a [`ValidationResult`] in a deterministic order (contract
//! order, then member path order) so repeated validation of the same entry is
//! byte-identical.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::contract::MemberKind;
use crate::core::identifiers::MockName;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Issues
// ============================================================================

/// Structural problem that blocks composition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationErrorKind {
    /// A required member is absent.
    MissingMember,
    /// A member is present with the wrong kind.
    WrongKind {
        /// Kind the contract expects.
        expected: MemberKind,
        /// Kind the mock exposes.
        actual: MemberKind,
    },
    /// A capability tag has no registered contract.
    UnknownCapability,
}

/// Structural validation error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Capability whose contract raised the error.
    pub capability: String,
    /// Dotted member path (empty for capability-level errors).
    pub path: String,
    /// Error classification.
    pub kind: ValidationErrorKind,
    /// Human-readable message.
    pub message: String,
}

/// Structural concern that never blocks composition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationWarningKind {
    /// An optional member is absent.
    MissingOptional,
    /// A member is not declared by any contract (strict mode only).
    UnknownMember,
}

/// Structural validation warning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationWarning {
    /// Capability whose contract raised the warning, empty for unknown members.
    pub capability: String,
    /// Dotted member path.
    pub path: String,
    /// Warning classification.
    pub kind: ValidationWarningKind,
    /// Human-readable message.
    pub message: String,
}

// ============================================================================
// SECTION: Validation Result
// ============================================================================

/// Outcome of validating one mock entry against its contracts.
///
/// # Invariants
/// - `is_valid` is true exactly when `errors` is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Validated mock.
    pub mock_name: MockName,
    /// True when no errors were found.
    pub is_valid: bool,
    /// Errors in deterministic order.
    pub errors: Vec<ValidationError>,
    /// Warnings in deterministic order.
    pub warnings: Vec<ValidationWarning>,
    /// Remediation hints, one per issue.
    pub suggestions: Vec<String>,
    /// Time the result was computed (cached results keep the original value).
    pub computed_at: Timestamp,
}

// ============================================================================
// SECTION: Debug Report
// ============================================================================

/// Presence status of one member in a debug report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MemberStatus {
    /// Present with the expected kind.
    Present {
        /// Member kind.
        kind: MemberKind,
    },
    /// Declared by a contract but absent.
    Missing {
        /// Kind the contract expects.
        expected: MemberKind,
        /// Whether the contract requires the member.
        required: bool,
    },
    /// Present with a different kind than declared.
    Mistyped {
        /// Kind the contract expects.
        expected: MemberKind,
        /// Kind the mock exposes.
        actual: MemberKind,
    },
    /// Present but not declared by any contract.
    Undeclared {
        /// Member kind.
        kind: MemberKind,
    },
}

/// One member line of a debug report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberReport {
    /// Dotted member path.
    pub path: String,
    /// Member status.
    pub status: MemberStatus,
}

/// Result of instantiating and exercising a mock in isolation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SmokeTestOutcome {
    /// The mock instantiated, passed its smoke check, and disposed cleanly.
    Passed,
    /// The mock (or one of its dependencies) failed or panicked.
    RenderFailure {
        /// Mock that failed.
        mock_name: MockName,
        /// Failure description.
        message: String,
    },
    /// The smoke test could not run (for example, unresolved dependencies).
    Skipped {
        /// Reason the test did not run.
        reason: String,
    },
}

/// Human-diagnosable report for a single mock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugReport {
    /// Reported mock.
    pub mock_name: MockName,
    /// Mock version.
    pub version: String,
    /// Capability tags on the entry.
    pub capability_tags: Vec<String>,
    /// Member-by-member status in path order.
    pub members: Vec<MemberReport>,
    /// Structural validation result.
    pub validation: ValidationResult,
    /// Smoke test outcome.
    pub smoke_test: SmokeTestOutcome,
}
