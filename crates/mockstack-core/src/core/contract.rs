// crates/mockstack-core/src/core/contract.rs
// ============================================================================
// Module: Mockstack Capability Contracts
// Description: Mock runtime shapes and the contracts they are checked against.
// Purpose: Make the expected surface of a mock explicit and testable.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`MockShape`] describes what a mock actually exposes: named members that
//! are functions, plain values, or nested objects with their own shape. A
//! [`CapabilityContract`] describes what a role requires and optionally
//! accepts. The structural validator walks one against the other.
//!
//! Both types use ordered maps so their canonical JSON, and therefore their
//! structural signature, is independent of construction order.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Member Kinds
// ============================================================================

/// Kind of a member exposed by a mock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberKind {
    /// Callable member.
    Function,
    /// Plain data member.
    Value,
    /// Nested object member.
    Object,
}

impl MemberKind {
    /// Returns a stable label for the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Value => "value",
            Self::Object => "object",
        }
    }
}

impl fmt::Display for MemberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Mock Shape
// ============================================================================

/// Shape of one member of a mock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MemberShape {
    /// Callable member.
    Function,
    /// Plain data member.
    Value,
    /// Nested object with its own members.
    Object(MockShape),
}

impl MemberShape {
    /// Returns the kind of this member.
    #[must_use]
    pub const fn kind(&self) -> MemberKind {
        match self {
            Self::Function => MemberKind::Function,
            Self::Value => MemberKind::Value,
            Self::Object(_) => MemberKind::Object,
        }
    }
}

/// Runtime shape of a mock implementation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MockShape {
    /// Members keyed by name.
    #[serde(default)]
    pub members: BTreeMap<String, MemberShape>,
}

impl MockShape {
    /// Creates an empty shape.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a function member.
    #[must_use]
    pub fn function(mut self, name: impl Into<String>) -> Self {
        self.members.insert(name.into(), MemberShape::Function);
        self
    }

    /// Adds a value member.
    #[must_use]
    pub fn value(mut self, name: impl Into<String>) -> Self {
        self.members.insert(name.into(), MemberShape::Value);
        self
    }

    /// Adds a nested object member.
    #[must_use]
    pub fn object(mut self, name: impl Into<String>, shape: Self) -> Self {
        self.members.insert(name.into(), MemberShape::Object(shape));
        self
    }

    /// Returns the member with the given name.
    #[must_use]
    pub fn member(&self, name: &str) -> Option<&MemberShape> {
        self.members.get(name)
    }
}

// ============================================================================
// SECTION: Capability Contract
// ============================================================================

/// Requirement placed on a single contract member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRequirement {
    /// Expected member kind.
    pub kind: MemberKind,
    /// Nested contract for object members.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nested: Option<Box<CapabilityContract>>,
}

impl MemberRequirement {
    /// Creates a requirement for a member of the given kind.
    #[must_use]
    pub const fn of(kind: MemberKind) -> Self {
        Self {
            kind,
            nested: None,
        }
    }

    /// Creates a requirement for an object member checked against `contract`.
    #[must_use]
    pub fn object(contract: CapabilityContract) -> Self {
        Self {
            kind: MemberKind::Object,
            nested: Some(Box::new(contract)),
        }
    }
}

/// Set of members a mock must (and may) expose to fill a role.
///
/// # Invariants
/// - A member name appears in at most one of `required` and `optional`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityContract {
    /// Capability tag this contract describes.
    pub capability: String,
    /// Members that must be present.
    #[serde(default)]
    pub required: BTreeMap<String, MemberRequirement>,
    /// Members that may be present.
    #[serde(default)]
    pub optional: BTreeMap<String, MemberRequirement>,
}

impl CapabilityContract {
    /// Creates an empty contract for a capability tag.
    #[must_use]
    pub fn new(capability: impl Into<String>) -> Self {
        Self {
            capability: capability.into(),
            required: BTreeMap::new(),
            optional: BTreeMap::new(),
        }
    }

    /// Adds a required member.
    #[must_use]
    pub fn require(mut self, name: impl Into<String>, kind: MemberKind) -> Self {
        let name = name.into();
        self.optional.remove(&name);
        self.required.insert(name, MemberRequirement::of(kind));
        self
    }

    /// Adds a required nested object member.
    #[must_use]
    pub fn require_object(mut self, name: impl Into<String>, contract: Self) -> Self {
        let name = name.into();
        self.optional.remove(&name);
        self.required.insert(name, MemberRequirement::object(contract));
        self
    }

    /// Adds an optional member.
    #[must_use]
    pub fn optional(mut self, name: impl Into<String>, kind: MemberKind) -> Self {
        let name = name.into();
        self.required.remove(&name);
        self.optional.insert(name, MemberRequirement::of(kind));
        self
    }

    /// Returns true when `name` is declared as required or optional.
    #[must_use]
    pub fn declares(&self, name: &str) -> bool {
        self.required.contains_key(name) || self.optional.contains_key(name)
    }
}

// ============================================================================
// SECTION: Contract Catalog
// ============================================================================

/// Capability contracts keyed by capability tag.
#[derive(Debug, Clone, Default)]
pub struct ContractCatalog {
    /// Contracts keyed by capability tag.
    contracts: BTreeMap<String, CapabilityContract>,
}

impl ContractCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the contract for its capability tag.
    pub fn register(&mut self, contract: CapabilityContract) -> Option<CapabilityContract> {
        self.contracts.insert(contract.capability.clone(), contract)
    }

    /// Returns the contract for a capability tag.
    #[must_use]
    pub fn get(&self, capability: &str) -> Option<&CapabilityContract> {
        self.contracts.get(capability)
    }

    /// Splits `tags` into known contracts and tags without a contract.
    #[must_use]
    pub fn lookup_all<'a>(
        &'a self,
        tags: &'a BTreeSet<String>,
    ) -> (Vec<&'a CapabilityContract>, Vec<&'a str>) {
        let mut found = Vec::new();
        let mut missing = Vec::new();
        for tag in tags {
            match self.contracts.get(tag) {
                Some(contract) => found.push(contract),
                None => missing.push(tag.as_str()),
            }
        }
        (found, missing)
    }

    /// Returns the number of registered contracts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    /// Returns true when no contracts are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }
}
