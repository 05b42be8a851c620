// crates/mockstack-core/src/core/version.rs
// ============================================================================
// Module: Mockstack Versions
// Description: Semantic versions and version range expressions.
// Purpose: Give compatibility checks a pure, comparable range value type.
// Dependencies: semver, serde
// ============================================================================

//! ## Overview
//! Versions compare on `major.minor.patch` only; pre-release and build
//! metadata are accepted by the parser and then dropped. Ranges are stored as
//! a lower and an upper bound, each inclusive or exclusive, plus the source
//! expression so errors can echo exactly what the author wrote.
//!
//! Supported expressions: `*`, `1.2.3`, `=1.2.3`, `^1.2.3`, `~1.2.3`,
//! partial or wildcard forms (`1.2`, `1.x`, `^1`), and comparator sets such
//! as `>=1.0.0 <2.0.0` or `>=1.0.0, <2.0.0`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Version parsing errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    /// Version string is not valid semantic versioning.
    #[error("invalid version `{input}`: {reason}")]
    InvalidVersion {
        /// Raw input.
        input: String,
        /// Parser failure details.
        reason: String,
    },
    /// Range expression could not be parsed.
    #[error("invalid version range `{input}`: {reason}")]
    InvalidRange {
        /// Raw input.
        input: String,
        /// Parser failure details.
        reason: String,
    },
    /// Range expression parsed but no version can satisfy it.
    #[error("version range `{0}` is unsatisfiable")]
    EmptyRange(String),
}

// ============================================================================
// SECTION: Semantic Version
// ============================================================================

/// A `major.minor.patch` triple ordered with standard precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SemanticVersion {
    /// Major component.
    pub major: u64,
    /// Minor component.
    pub minor: u64,
    /// Patch component.
    pub patch: u64,
}

impl SemanticVersion {
    /// Creates a version from its components.
    #[must_use]
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parses a full semantic version, ignoring pre-release and build metadata.
    ///
    /// # Errors
    ///
    /// Returns [`VersionError::InvalidVersion`] when the input is not semver.
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let trimmed = input.trim();
        let body = trimmed.strip_prefix('v').unwrap_or(trimmed);
        let parsed = semver::Version::parse(body).map_err(|err| VersionError::InvalidVersion {
            input: input.to_string(),
            reason: err.to_string(),
        })?;
        Ok(Self::new(parsed.major, parsed.minor, parsed.patch))
    }

    /// Returns the first version of the next major line.
    const fn next_major(self) -> Self {
        Self::new(self.major.saturating_add(1), 0, 0)
    }

    /// Returns the first version of the next minor line.
    const fn next_minor(self) -> Self {
        Self::new(self.major, self.minor.saturating_add(1), 0)
    }

    /// Returns the next patch version.
    const fn next_patch(self) -> Self {
        Self::new(self.major, self.minor, self.patch.saturating_add(1))
    }
}

impl fmt::Display for SemanticVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for SemanticVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// ============================================================================
// SECTION: Version Range
// ============================================================================

/// One end of a version range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionBound {
    /// Bound version.
    pub version: SemanticVersion,
    /// Whether the bound version itself is inside the range.
    pub inclusive: bool,
}

impl VersionBound {
    /// Creates an inclusive bound.
    #[must_use]
    pub const fn inclusive(version: SemanticVersion) -> Self {
        Self {
            version,
            inclusive: true,
        }
    }

    /// Creates an exclusive bound.
    #[must_use]
    pub const fn exclusive(version: SemanticVersion) -> Self {
        Self {
            version,
            inclusive: false,
        }
    }
}

/// Semantic version interval with optional lower and upper bounds.
///
/// # Invariants
/// - Parsed ranges are satisfiable by at least one version.
/// - `expression` is the source text (or a canonical rendering when built in code).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VersionRange {
    /// Lower bound, `None` when unbounded.
    min: Option<VersionBound>,
    /// Upper bound, `None` when unbounded.
    max: Option<VersionBound>,
    /// Expression used for display and error reporting.
    expression: String,
}

impl VersionRange {
    /// Returns a range matching every version.
    #[must_use]
    pub fn any() -> Self {
        Self {
            min: None,
            max: None,
            expression: "*".to_string(),
        }
    }

    /// Returns a range matching exactly one version.
    #[must_use]
    pub fn exact(version: SemanticVersion) -> Self {
        Self {
            min: Some(VersionBound::inclusive(version)),
            max: Some(VersionBound::inclusive(version)),
            expression: format!("={version}"),
        }
    }

    /// Builds a range from explicit bounds.
    ///
    /// # Errors
    ///
    /// Returns [`VersionError::EmptyRange`] when no version satisfies the bounds.
    pub fn from_bounds(
        min: Option<VersionBound>,
        max: Option<VersionBound>,
    ) -> Result<Self, VersionError> {
        let expression = render_bounds(min, max);
        let range = Self {
            min,
            max,
            expression,
        };
        if range.is_empty() {
            return Err(VersionError::EmptyRange(range.expression));
        }
        Ok(range)
    }

    /// Parses a range expression.
    ///
    /// # Errors
    ///
    /// Returns [`VersionError`] when the expression is malformed or unsatisfiable.
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let expression = input.trim();
        if expression.is_empty() {
            return Err(invalid_range(input, "expression is empty"));
        }
        let mut min: Option<VersionBound> = None;
        let mut max: Option<VersionBound> = None;
        for token in tokenize(expression) {
            let (lower, upper) = parse_comparator(input, &token)?;
            min = tighter_lower(min, lower);
            max = tighter_upper(max, upper);
        }
        let range = Self {
            min,
            max,
            expression: expression.to_string(),
        };
        if range.is_empty() {
            return Err(VersionError::EmptyRange(range.expression));
        }
        Ok(range)
    }

    /// Returns the lower bound.
    #[must_use]
    pub const fn min(&self) -> Option<VersionBound> {
        self.min
    }

    /// Returns the upper bound.
    #[must_use]
    pub const fn max(&self) -> Option<VersionBound> {
        self.max
    }

    /// Returns the source expression.
    #[must_use]
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Returns true when `version` lies inside the range.
    #[must_use]
    pub fn contains(&self, version: SemanticVersion) -> bool {
        let above_min = self.min.is_none_or(|bound| match version.cmp(&bound.version) {
            Ordering::Greater => true,
            Ordering::Equal => bound.inclusive,
            Ordering::Less => false,
        });
        let below_max = self.max.is_none_or(|bound| match version.cmp(&bound.version) {
            Ordering::Less => true,
            Ordering::Equal => bound.inclusive,
            Ordering::Greater => false,
        });
        above_min && below_max
    }

    /// Returns true when no version can satisfy the range.
    fn is_empty(&self) -> bool {
        match (self.min, self.max) {
            (Some(lower), Some(upper)) => match lower.version.cmp(&upper.version) {
                Ordering::Greater => true,
                Ordering::Equal => !(lower.inclusive && upper.inclusive),
                Ordering::Less => false,
            },
            _ => false,
        }
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.expression.fmt(f)
    }
}

impl FromStr for VersionRange {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for VersionRange {
    type Error = VersionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<VersionRange> for String {
    fn from(value: VersionRange) -> Self {
        value.expression
    }
}

// ============================================================================
// SECTION: Parsing Helpers
// ============================================================================

/// Number of components an operand spelled out before padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Precision {
    /// Only the major component was given.
    Major,
    /// Major and minor were given.
    Minor,
    /// All three components were given.
    Patch,
}

/// Lower and upper bound contributed by one comparator token.
type BoundPair = (Option<VersionBound>, Option<VersionBound>);

/// Splits an expression into comparator tokens, gluing detached operators.
fn tokenize(expression: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    let mut pending_operator: Option<String> = None;
    for raw in expression.split(|c: char| c == ',' || c.is_whitespace()) {
        if raw.is_empty() {
            continue;
        }
        if raw.chars().all(|c| matches!(c, '<' | '>' | '=' | '^' | '~')) {
            pending_operator = Some(raw.to_string());
            continue;
        }
        match pending_operator.take() {
            Some(operator) => tokens.push(format!("{operator}{raw}")),
            None => tokens.push(raw.to_string()),
        }
    }
    if let Some(operator) = pending_operator {
        tokens.push(operator);
    }
    tokens
}

/// Converts one comparator token into bounds.
fn parse_comparator(input: &str, token: &str) -> Result<BoundPair, VersionError> {
    if token == "*" || token.eq_ignore_ascii_case("x") {
        return Ok((None, None));
    }
    let (operator, operand) = split_operator(token);
    if operand.is_empty() {
        return Err(invalid_range(input, &format!("operator `{operator}` has no version")));
    }
    let Some((version, precision)) = parse_operand(input, operand)? else {
        return Ok((None, None));
    };
    let bounds = match operator {
        "^" => (Some(VersionBound::inclusive(version)), Some(caret_upper(version, precision))),
        "~" => (Some(VersionBound::inclusive(version)), Some(tilde_upper(version, precision))),
        "" | "=" => match precision {
            Precision::Patch => {
                (Some(VersionBound::inclusive(version)), Some(VersionBound::inclusive(version)))
            }
            Precision::Minor | Precision::Major => {
                (Some(VersionBound::inclusive(version)), Some(tilde_upper(version, precision)))
            }
        },
        ">=" => (Some(VersionBound::inclusive(version)), None),
        ">" => (Some(VersionBound::exclusive(version)), None),
        "<=" => (None, Some(VersionBound::inclusive(version))),
        "<" => (None, Some(VersionBound::exclusive(version))),
        other => return Err(invalid_range(input, &format!("unknown operator `{other}`"))),
    };
    Ok(bounds)
}

/// Splits the leading operator from a token.
fn split_operator(token: &str) -> (&str, &str) {
    let split = token.find(|c: char| !matches!(c, '<' | '>' | '=' | '^' | '~')).unwrap_or(token.len());
    let (operator, operand) = token.split_at(split);
    (operator, operand.strip_prefix('v').unwrap_or(operand))
}

/// Parses a possibly partial operand; `None` means the operand is a bare wildcard.
fn parse_operand(
    input: &str,
    operand: &str,
) -> Result<Option<(SemanticVersion, Precision)>, VersionError> {
    let core = operand.split(['-', '+']).next().unwrap_or(operand);
    let parts: Vec<&str> = core.split('.').collect();
    if parts.len() == 3 && !parts.iter().any(|part| is_wildcard(part)) {
        let version = SemanticVersion::parse(operand)
            .map_err(|err| invalid_range(input, &err.to_string()))?;
        return Ok(Some((version, Precision::Patch)));
    }
    if parts.is_empty() || parts.len() > 3 {
        return Err(invalid_range(input, &format!("malformed version `{operand}`")));
    }
    let mut numbers: Vec<u64> = Vec::with_capacity(3);
    for part in &parts {
        if is_wildcard(part) {
            break;
        }
        let number = part
            .parse::<u64>()
            .map_err(|_| invalid_range(input, &format!("malformed version `{operand}`")))?;
        numbers.push(number);
    }
    let precision = match numbers.len() {
        0 => return Ok(None),
        1 => Precision::Major,
        2 => Precision::Minor,
        _ => Precision::Patch,
    };
    let major = numbers.first().copied().unwrap_or(0);
    let minor = numbers.get(1).copied().unwrap_or(0);
    let patch = numbers.get(2).copied().unwrap_or(0);
    Ok(Some((SemanticVersion::new(major, minor, patch), precision)))
}

/// Returns true for `x`, `X`, or `*` components.
fn is_wildcard(part: &str) -> bool {
    matches!(part, "x" | "X" | "*")
}

/// Computes the exclusive upper bound of a caret range.
const fn caret_upper(version: SemanticVersion, precision: Precision) -> VersionBound {
    let upper = if version.major > 0 {
        version.next_major()
    } else {
        match precision {
            Precision::Major => version.next_major(),
            Precision::Minor => version.next_minor(),
            Precision::Patch => {
                if version.minor > 0 {
                    version.next_minor()
                } else {
                    version.next_patch()
                }
            }
        }
    };
    VersionBound::exclusive(upper)
}

/// Computes the exclusive upper bound of a tilde range.
const fn tilde_upper(version: SemanticVersion, precision: Precision) -> VersionBound {
    match precision {
        Precision::Major => VersionBound::exclusive(version.next_major()),
        Precision::Minor | Precision::Patch => VersionBound::exclusive(version.next_minor()),
    }
}

/// Keeps the more restrictive of two lower bounds.
fn tighter_lower(current: Option<VersionBound>, next: Option<VersionBound>) -> Option<VersionBound> {
    match (current, next) {
        (Some(a), Some(b)) => Some(match a.version.cmp(&b.version) {
            Ordering::Greater => a,
            Ordering::Less => b,
            Ordering::Equal => VersionBound {
                version: a.version,
                inclusive: a.inclusive && b.inclusive,
            },
        }),
        (bound, None) | (None, bound) => bound,
    }
}

/// Keeps the more restrictive of two upper bounds.
fn tighter_upper(current: Option<VersionBound>, next: Option<VersionBound>) -> Option<VersionBound> {
    match (current, next) {
        (Some(a), Some(b)) => Some(match a.version.cmp(&b.version) {
            Ordering::Less => a,
            Ordering::Greater => b,
            Ordering::Equal => VersionBound {
                version: a.version,
                inclusive: a.inclusive && b.inclusive,
            },
        }),
        (bound, None) | (None, bound) => bound,
    }
}

/// Renders bounds as a canonical comparator expression.
fn render_bounds(min: Option<VersionBound>, max: Option<VersionBound>) -> String {
    let lower = min.map(|bound| {
        let operator = if bound.inclusive { ">=" } else { ">" };
        format!("{operator}{}", bound.version)
    });
    let upper = max.map(|bound| {
        let operator = if bound.inclusive { "<=" } else { "<" };
        format!("{operator}{}", bound.version)
    });
    match (lower, upper) {
        (Some(lower), Some(upper)) => format!("{lower} {upper}"),
        (Some(bound), None) | (None, Some(bound)) => bound,
        (None, None) => "*".to_string(),
    }
}

/// Builds an [`VersionError::InvalidRange`].
fn invalid_range(input: &str, reason: &str) -> VersionError {
    VersionError::InvalidRange {
        input: input.to_string(),
        reason: reason.to_string(),
    }
}
