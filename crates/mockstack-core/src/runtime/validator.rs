// crates/mockstack-core/src/runtime/validator.rs
// ============================================================================
// Module: Mockstack Structural Validator
// Description: Checks mock shapes against capability contracts with caching.
// Purpose: Report structural mismatches as data and reuse results across stacks.
// Dependencies: crate::core, crate::interfaces, serde
// ============================================================================

//! ## Overview
//! The validator walks a mock's [`MockShape`] against the contracts of every
//! capability tag the entry carries:
//! - A missing required member is an error.
//! - A member of the wrong kind is an error.
//! - A missing optional member is a warning.
//! - A tag with no registered contract is an error.
//! - An undeclared member is ignored, or a warning in strict mode. It is
//!   never an error.
//!
//! Results are cached under `(mock name, version, structural signature)`. The
//! signature hashes the canonical JSON of the shape, the contracts consulted,
//! and the mode, so a contract change can never serve a stale result. The
//! validator subscribes to registry events and drops every cached result for
//! a name the moment that name is replaced or removed.
//!
//! Security posture: mock shapes come from test code and are trusted; the
//! cache is bounded so a long run cannot grow it without limit.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::MutexGuard;

use serde::Serialize;
use thiserror::Error;

use crate::core::CapabilityContract;
use crate::core::ContractCatalog;
use crate::core::DebugReport;
use crate::core::HashDigest;
use crate::core::HashError;
use crate::core::MemberReport;
use crate::core::MemberRequirement;
use crate::core::MemberShape;
use crate::core::MemberStatus;
use crate::core::MockEntry;
use crate::core::MockName;
use crate::core::MockShape;
use crate::core::SmokeTestOutcome;
use crate::core::ValidationError;
use crate::core::ValidationErrorKind;
use crate::core::ValidationResult;
use crate::core::ValidationWarning;
use crate::core::ValidationWarningKind;
use crate::core::hashing::hash_canonical_json;
use crate::interfaces::Clock;
use crate::interfaces::RegistryEvent;
use crate::interfaces::RegistryObserver;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Default maximum number of cached validation results.
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Validator errors. Structural mismatches are never errors here.
#[derive(Debug, Error)]
pub enum ValidatorError {
    /// The structural signature could not be computed.
    #[error(transparent)]
    Signature(#[from] HashError),
    /// The cache lock was poisoned.
    #[error("validation cache lock poisoned")]
    CachePoisoned,
}

impl ValidatorError {
    /// Returns a stable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Signature(_) => "signature_failed",
            Self::CachePoisoned => "cache_poisoned",
        }
    }
}

// ============================================================================
// SECTION: Public Types
// ============================================================================

/// Validation result plus whether it was served from cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOutcome {
    /// Validation result.
    pub result: ValidationResult,
    /// True when the result came from the cache.
    pub cache_hit: bool,
}

/// Cache counters exposed for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Lookups served from the cache.
    pub hits: u64,
    /// Lookups that computed a fresh result.
    pub misses: u64,
    /// Results currently cached.
    pub entries: usize,
    /// Maximum cached results.
    pub capacity: usize,
}

// ============================================================================
// SECTION: Cache
// ============================================================================

/// Cache key for one validation result.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct CacheKey {
    /// Validated mock.
    mock_name: MockName,
    /// Mock version.
    version: String,
    /// Structural signature.
    signature: HashDigest,
}

/// Bounded validation cache with insertion-order eviction.
#[derive(Debug)]
struct ValidationCache {
    /// Cached results.
    results: BTreeMap<CacheKey, ValidationResult>,
    /// Keys in insertion order for eviction.
    order: VecDeque<CacheKey>,
    /// Maximum cached results.
    capacity: usize,
    /// Hit counter.
    hits: u64,
    /// Miss counter.
    misses: u64,
}

impl ValidationCache {
    /// Looks up a key, counting the hit or miss.
    fn lookup(&mut self, key: &CacheKey) -> Option<ValidationResult> {
        let found = self.results.get(key).cloned();
        if found.is_some() {
            self.hits = self.hits.saturating_add(1);
        } else {
            self.misses = self.misses.saturating_add(1);
        }
        found
    }

    /// Stores a result, evicting the oldest entries beyond capacity.
    fn store(&mut self, key: CacheKey, result: ValidationResult) {
        if self.results.insert(key.clone(), result).is_none() {
            self.order.push_back(key);
        }
        while self.results.len() > self.capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.results.remove(&oldest);
        }
    }

    /// Drops every result cached for `name`.
    fn invalidate(&mut self, name: &MockName) {
        self.results.retain(|key, _| &key.mock_name != name);
        self.order.retain(|key| &key.mock_name != name);
    }
}

/// Input hashed into the structural signature.
#[derive(Serialize)]
struct SignatureInput<'a> {
    /// Mock shape.
    shape: &'a MockShape,
    /// Contracts consulted, in tag order.
    contracts: &'a [&'a CapabilityContract],
    /// Tags with no contract.
    unknown_capabilities: &'a [&'a str],
    /// Strict mode flag.
    strict: bool,
}

// ============================================================================
// SECTION: Validator
// ============================================================================

/// Structural validator with a result cache.
#[derive(Debug)]
pub struct StructuralValidator {
    /// Result cache.
    cache: Mutex<ValidationCache>,
}

impl Default for StructuralValidator {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl StructuralValidator {
    /// Creates a validator caching at most `capacity` results (minimum one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: Mutex::new(ValidationCache {
                results: BTreeMap::new(),
                order: VecDeque::new(),
                capacity: capacity.max(1),
                hits: 0,
                misses: 0,
            }),
        }
    }

    /// Validates an entry against the contracts of its capability tags.
    ///
    /// # Errors
    ///
    /// Returns [`ValidatorError`] when the signature cannot be computed or
    /// the cache lock is poisoned.
    pub fn validate(
        &self,
        entry: &MockEntry,
        catalog: &ContractCatalog,
        strict: bool,
        clock: &dyn Clock,
    ) -> Result<ValidationOutcome, ValidatorError> {
        let shape = entry.implementation.shape();
        let (contracts, unknown) = catalog.lookup_all(&entry.capability_tags);
        let signature = hash_canonical_json(&SignatureInput {
            shape: &shape,
            contracts: &contracts,
            unknown_capabilities: &unknown,
            strict,
        })?;
        let key = CacheKey {
            mock_name: entry.name.clone(),
            version: entry.version.clone(),
            signature,
        };
        if let Some(result) = self.lock()?.lookup(&key) {
            return Ok(ValidationOutcome {
                result,
                cache_hit: true,
            });
        }
        let result = check_shape(&entry.name, &shape, &contracts, &unknown, strict, clock);
        self.lock()?.store(key, result.clone());
        Ok(ValidationOutcome {
            result,
            cache_hit: false,
        })
    }

    /// Builds a debug report around a validation result and smoke test outcome.
    ///
    /// # Errors
    ///
    /// Returns [`ValidatorError`] when validation fails to run.
    pub fn generate_debug_info(
        &self,
        entry: &MockEntry,
        catalog: &ContractCatalog,
        strict: bool,
        clock: &dyn Clock,
        smoke_test: SmokeTestOutcome,
    ) -> Result<DebugReport, ValidatorError> {
        let validation = self.validate(entry, catalog, strict, clock)?.result;
        let shape = entry.implementation.shape();
        let (contracts, _) = catalog.lookup_all(&entry.capability_tags);
        let mut statuses = BTreeMap::new();
        describe_members(&shape, &contracts, "", &mut statuses);
        Ok(DebugReport {
            mock_name: entry.name.clone(),
            version: entry.version.clone(),
            capability_tags: entry.capability_tags.iter().cloned().collect(),
            members: statuses
                .into_iter()
                .map(|(path, status)| MemberReport {
                    path,
                    status,
                })
                .collect(),
            validation,
            smoke_test,
        })
    }

    /// Drops every cached result for `name`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidatorError::CachePoisoned`] when the cache lock is poisoned.
    pub fn invalidate(&self, name: &MockName) -> Result<(), ValidatorError> {
        self.lock()?.invalidate(name);
        Ok(())
    }

    /// Returns cache counters.
    ///
    /// # Errors
    ///
    /// Returns [`ValidatorError::CachePoisoned`] when the cache lock is poisoned.
    pub fn stats(&self) -> Result<CacheStats, ValidatorError> {
        let cache = self.lock()?;
        Ok(CacheStats {
            hits: cache.hits,
            misses: cache.misses,
            entries: cache.results.len(),
            capacity: cache.capacity,
        })
    }

    /// Locks the cache.
    fn lock(&self) -> Result<MutexGuard<'_, ValidationCache>, ValidatorError> {
        self.cache.lock().map_err(|_| ValidatorError::CachePoisoned)
    }
}

impl RegistryObserver for StructuralValidator {
    fn on_registry_event(&self, event: &RegistryEvent) {
        match event {
            RegistryEvent::Replaced {
                name,
                ..
            }
            | RegistryEvent::Unregistered {
                name,
                ..
            } => {
                // A poisoned cache fails every later lookup, so nothing stale is served.
                let _ = self.invalidate(name);
            }
            RegistryEvent::Registered {
                ..
            } => {}
        }
    }
}

// ============================================================================
// SECTION: Shape Checks
// ============================================================================

/// Issues collected while walking a shape.
#[derive(Default)]
struct Findings {
    /// Errors in emission order.
    errors: Vec<ValidationError>,
    /// Warnings in emission order.
    warnings: Vec<ValidationWarning>,
    /// Suggestions for errors.
    error_suggestions: Vec<String>,
    /// Suggestions for warnings.
    warning_suggestions: Vec<String>,
}

impl Findings {
    /// Records an error and its suggestion.
    fn error(
        &mut self,
        capability: &str,
        path: String,
        kind: ValidationErrorKind,
        message: String,
        suggestion: String,
    ) {
        self.errors.push(ValidationError {
            capability: capability.to_string(),
            path,
            kind,
            message,
        });
        self.error_suggestions.push(suggestion);
    }

    /// Records a warning and its suggestion.
    fn warning(
        &mut self,
        capability: &str,
        path: String,
        kind: ValidationWarningKind,
        message: String,
        suggestion: String,
    ) {
        self.warnings.push(ValidationWarning {
            capability: capability.to_string(),
            path,
            kind,
            message,
        });
        self.warning_suggestions.push(suggestion);
    }
}

/// Validates a shape against resolved contracts without touching the cache.
#[must_use]
pub fn check_shape(
    mock_name: &MockName,
    shape: &MockShape,
    contracts: &[&CapabilityContract],
    unknown_capabilities: &[&str],
    strict: bool,
    clock: &dyn Clock,
) -> ValidationResult {
    let mut findings = Findings::default();
    for tag in unknown_capabilities {
        findings.error(
            tag,
            String::new(),
            ValidationErrorKind::UnknownCapability,
            format!("no contract is registered for capability `{tag}`"),
            format!("register a contract for `{tag}` or remove the tag from `{mock_name}`"),
        );
    }
    for contract in contracts {
        check_contract(&contract.capability, contract, shape, "", &mut findings);
    }
    if strict {
        check_undeclared(shape, contracts, "", &mut findings);
    }
    let Findings {
        errors,
        warnings,
        mut error_suggestions,
        warning_suggestions,
    } = findings;
    error_suggestions.extend(warning_suggestions);
    ValidationResult {
        mock_name: mock_name.clone(),
        is_valid: errors.is_empty(),
        errors,
        warnings,
        suggestions: error_suggestions,
        computed_at: clock.now(),
    }
}

/// Walks one contract level against one shape level.
fn check_contract(
    capability: &str,
    contract: &CapabilityContract,
    shape: &MockShape,
    prefix: &str,
    findings: &mut Findings,
) {
    for (name, (requirement, required)) in merged_requirements(contract) {
        let path = join_path(prefix, name);
        let expected = requirement.kind;
        match shape.member(name) {
            None if required => findings.error(
                capability,
                path.clone(),
                ValidationErrorKind::MissingMember,
                format!("required {expected} member `{path}` is missing"),
                format!("add a {expected} member `{path}` to satisfy `{capability}`"),
            ),
            None => findings.warning(
                capability,
                path.clone(),
                ValidationWarningKind::MissingOptional,
                format!("optional {expected} member `{path}` is missing"),
                format!("add a {expected} member `{path}` if tests rely on it"),
            ),
            Some(member) if member.kind() != expected => {
                let actual = member.kind();
                findings.error(
                    capability,
                    path.clone(),
                    ValidationErrorKind::WrongKind {
                        expected,
                        actual,
                    },
                    format!("member `{path}` is a {actual}, expected a {expected}"),
                    format!("change `{path}` from a {actual} to a {expected}"),
                );
            }
            Some(MemberShape::Object(inner)) => {
                if let Some(nested) = requirement.nested.as_deref() {
                    check_contract(capability, nested, inner, &path, findings);
                }
            }
            Some(_) => {}
        }
    }
}

/// Warns about members no consulted contract declares.
fn check_undeclared(
    shape: &MockShape,
    contracts: &[&CapabilityContract],
    prefix: &str,
    findings: &mut Findings,
) {
    for (name, member) in &shape.members {
        let path = join_path(prefix, name);
        let declaring = declaring_requirements(contracts, name);
        if declaring.is_empty() {
            findings.warning(
                "",
                path.clone(),
                ValidationWarningKind::UnknownMember,
                format!("member `{path}` is not declared by any contract"),
                format!("declare `{path}` in a contract or remove it from the mock"),
            );
            continue;
        }
        if let MemberShape::Object(inner) = member {
            let nested = nested_contracts(&declaring);
            if !nested.is_empty() {
                check_undeclared(inner, &nested, &path, findings);
            }
        }
    }
}

// ============================================================================
// SECTION: Debug Walk
// ============================================================================

/// Records the status of every declared and present member.
fn describe_members(
    shape: &MockShape,
    contracts: &[&CapabilityContract],
    prefix: &str,
    statuses: &mut BTreeMap<String, MemberStatus>,
) {
    for contract in contracts {
        for (name, (requirement, required)) in merged_requirements(contract) {
            let path = join_path(prefix, name);
            if statuses.contains_key(&path) {
                continue;
            }
            let expected = requirement.kind;
            let status = match shape.member(name) {
                None => MemberStatus::Missing {
                    expected,
                    required,
                },
                Some(member) if member.kind() != expected => MemberStatus::Mistyped {
                    expected,
                    actual: member.kind(),
                },
                Some(member) => MemberStatus::Present {
                    kind: member.kind(),
                },
            };
            statuses.insert(path, status);
        }
    }
    for (name, member) in &shape.members {
        let path = join_path(prefix, name);
        let declaring = declaring_requirements(contracts, name);
        if declaring.is_empty() {
            statuses.insert(
                path.clone(),
                MemberStatus::Undeclared {
                    kind: member.kind(),
                },
            );
        }
        if let MemberShape::Object(inner) = member {
            let nested = nested_contracts(&declaring);
            if !nested.is_empty() {
                describe_members(inner, &nested, &path, statuses);
            }
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Merges required and optional members into name order.
fn merged_requirements(contract: &CapabilityContract) -> BTreeMap<&str, (&MemberRequirement, bool)> {
    let required = contract.required.iter().map(|(name, req)| (name.as_str(), (req, true)));
    let optional = contract.optional.iter().map(|(name, req)| (name.as_str(), (req, false)));
    optional.chain(required).collect()
}

/// Returns the requirements any contract places on `name`.
fn declaring_requirements<'a>(
    contracts: &[&'a CapabilityContract],
    name: &str,
) -> Vec<&'a MemberRequirement> {
    contracts
        .iter()
        .filter_map(|contract| contract.required.get(name).or_else(|| contract.optional.get(name)))
        .collect()
}

/// Returns the nested contracts carried by object requirements.
fn nested_contracts<'a>(requirements: &[&'a MemberRequirement]) -> Vec<&'a CapabilityContract> {
    requirements.iter().filter_map(|requirement| requirement.nested.as_deref()).collect()
}

/// Joins a dotted member path.
fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() { name.to_string() } else { format!("{prefix}.{name}") }
}
