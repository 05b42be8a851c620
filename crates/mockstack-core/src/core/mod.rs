// crates/mockstack-core/src/core/mod.rs
// ============================================================================
// Module: Mockstack Core Types
// Description: Canonical mock, contract, version, and stack data structures.
// Purpose: Provide stable, serializable types shared by every engine component.
// Dependencies: semver, serde, serde_jcs, sha2
// ============================================================================

//! ## Overview
//! Core types hold no live mock state and perform no I/O. Runtime components
//! build on them; diagnostic tooling can serialize them directly.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod contract;
pub mod entry;
pub mod hashing;
pub mod identifiers;
pub mod stack;
pub mod time;
pub mod validation;
pub mod version;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use contract::CapabilityContract;
pub use contract::ContractCatalog;
pub use contract::MemberKind;
pub use contract::MemberRequirement;
pub use contract::MemberShape;
pub use contract::MockShape;
pub use entry::MockEntry;
pub use hashing::HashDigest;
pub use hashing::HashError;
pub use identifiers::InstanceId;
pub use identifiers::MockName;
pub use identifiers::StackId;
pub use stack::MockInstanceSnapshot;
pub use stack::StackConfig;
pub use stack::StackSnapshot;
pub use stack::StackState;
pub use stack::TeardownFailure;
pub use stack::TeardownReport;
pub use time::Timestamp;
pub use validation::DebugReport;
pub use validation::MemberReport;
pub use validation::MemberStatus;
pub use validation::SmokeTestOutcome;
pub use validation::ValidationError;
pub use validation::ValidationErrorKind;
pub use validation::ValidationResult;
pub use validation::ValidationWarning;
pub use validation::ValidationWarningKind;
pub use version::SemanticVersion;
pub use version::VersionBound;
pub use version::VersionError;
pub use version::VersionRange;
