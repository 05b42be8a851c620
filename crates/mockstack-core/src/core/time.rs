// crates/mockstack-core/src/core/time.rs
// ============================================================================
// Module: Mockstack Time Model
// Description: Creation and validation instants for stacks and results.
// Purpose: Order stacks by creation without reading the wall clock.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! The engine never reads wall-clock time directly. Components ask a
//! [`crate::interfaces::Clock`] for a [`Timestamp`], so tests can swap in a
//! logical clock and get byte-identical output across runs.
//!
//! One orchestrator runs on one clock, so every stack it creates carries the
//! same timestamp kind. Only values of the same kind are comparable:
//! [`PartialOrd`] returns `None` across kinds, and [`Timestamp::sort_key`]
//! gives a total order for listings that must never fail.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cmp::Ordering;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Time Values
// ============================================================================

/// Instant at which a stack was composed or a validation result produced.
///
/// # Invariants
/// - Values from one clock share a kind and never decrease.
/// - Values of different kinds are unordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Timestamp {
    /// Unix epoch milliseconds from the system clock.
    UnixMillis(i64),
    /// Tick from a logical clock.
    Logical(u64),
}

impl Timestamp {
    /// Returns the unix milliseconds of a system clock reading.
    #[must_use]
    pub const fn as_unix_millis(&self) -> Option<i64> {
        match self {
            Self::UnixMillis(value) => Some(*value),
            Self::Logical(_) => None,
        }
    }

    /// Returns the tick of a logical clock reading.
    #[must_use]
    pub const fn as_logical(&self) -> Option<u64> {
        match self {
            Self::UnixMillis(_) => None,
            Self::Logical(value) => Some(*value),
        }
    }

    /// Returns a key that totally orders timestamps.
    ///
    /// System readings sort before logical ones; within a kind the key
    /// follows the value.
    #[must_use]
    pub fn sort_key(&self) -> (u8, i128) {
        match self {
            Self::UnixMillis(value) => (0, i128::from(*value)),
            Self::Logical(value) => (1, i128::from(*value)),
        }
    }
}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::UnixMillis(left), Self::UnixMillis(right)) => Some(left.cmp(right)),
            (Self::Logical(left), Self::Logical(right)) => Some(left.cmp(right)),
            _ => None,
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnixMillis(value) => write!(f, "{value}ms"),
            Self::Logical(value) => write!(f, "t{value}"),
        }
    }
}
