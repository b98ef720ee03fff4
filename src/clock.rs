//! Injectable clock source
//!
//! Expiry is decided by comparing "milliseconds since the Unix epoch"
//! timestamps taken at store time and lookup time. The clock is a trait
//! object so tests can freeze or advance time deterministically instead of
//! sleeping.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

/// Time source contract expected by the memoizing wrappers.
///
/// Production implementations must be monotonically non-decreasing for
/// expiry comparisons to hold; test doubles may jump arbitrarily.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Current time in milliseconds since the Unix epoch
    fn now_millis(&self) -> i64;
}

/// Wall-clock time source backed by `chrono`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    /// Create a new system clock
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Manually driven clock for deterministic tests
///
/// Starts frozen and only moves when told to. Hand a shared handle to a
/// wrapper via [`crate::Memoized::with_clock`], keep a clone, and advance it
/// from the test body.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    /// Create a clock frozen at `start` milliseconds
    pub fn new(start: i64) -> Self {
        Self {
            now: AtomicI64::new(start),
        }
    }

    /// Create a shared handle frozen at `start`, ready to hand to a wrapper
    pub fn shared(start: i64) -> Arc<Self> {
        Arc::new(Self::new(start))
    }

    /// Move the clock forward by `millis`
    pub fn advance(&self, millis: i64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }

    /// Jump the clock to an absolute timestamp
    pub fn set(&self, millis: i64) {
        self.now.store(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}
