// crates/mockstack-core/src/runtime/clock.rs
// ============================================================================
// Module: Mockstack Clocks
// Description: Wall-clock and logical clock implementations.
// Purpose: Supply timestamps to validation results, stacks, and audit events.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! [`SystemClock`] reads wall-clock time. [`LogicalClock`] hands out a
//! strictly increasing counter and is what tests use for reproducible output.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use crate::core::Timestamp;
use crate::interfaces::Clock;

// ============================================================================
// SECTION: Clocks
// ============================================================================

/// Clock backed by the system wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX));
        Timestamp::UnixMillis(millis)
    }
}

/// Deterministic clock returning 1, 2, 3, ... on successive reads.
#[derive(Debug, Default)]
pub struct LogicalClock {
    /// Last issued tick.
    ticks: AtomicU64,
}

impl LogicalClock {
    /// Creates a clock whose first reading is `1`.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ticks: AtomicU64::new(0),
        }
    }

    /// Returns the last issued tick without advancing.
    #[must_use]
    pub fn current(&self) -> u64 {
        self.ticks.load(Ordering::SeqCst)
    }
}

impl Clock for LogicalClock {
    fn now(&self) -> Timestamp {
        Timestamp::Logical(self.ticks.fetch_add(1, Ordering::SeqCst).saturating_add(1))
    }
}
