//! Time abstraction for testability
//!
//! Expiry bookkeeping works in absolute epoch milliseconds behind a trait so
//! tests can cross expiry boundaries without sleeping.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use chrono::Utc;

/// Trait for wall-clock access
pub trait Clock: Send + Sync {
    /// Milliseconds since the UNIX epoch
    fn now_millis(&self) -> i64;
}

/// Real system clock implementation
///
/// Use this in production code.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Mock clock for deterministic tests
///
/// Time only moves when `advance` or `set` is called.
#[derive(Debug, Default)]
pub struct MockClock {
    now_ms: AtomicI64,
}

impl MockClock {
    /// Create a mock clock starting at the given epoch-millisecond instant.
    #[must_use]
    pub fn new(start_ms: i64) -> Self {
        Self { now_ms: AtomicI64::new(start_ms) }
    }

    /// Advance the clock by a duration.
    pub fn advance(&self, by: Duration) {
        self.now_ms.fetch_add(by.as_millis() as i64, Ordering::SeqCst);
    }

    /// Jump the clock to an absolute epoch-millisecond instant.
    pub fn set(&self, now_ms: i64) {
        self.now_ms.store(now_ms, Ordering::SeqCst);
    }
}

impl Clock for MockClock {
    fn now_millis(&self) -> i64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}
