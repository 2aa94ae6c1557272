//! The narrow time-source interface the journal consumes.
//!
//! The journal needs "now, in milliseconds" for exactly two things: the
//! `<path>.<ts>` suffix a rotated backup gets, and synthesizing `add_time`
//! when decoding a legacy `Add` record. Neither call site should reach for
//! `SystemTime::now()` directly, so that both are deterministic under test.

use std::time::{SystemTime, UNIX_EPOCH};

/// A monotonically increasing (in practice) wall-clock, in milliseconds.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> u64;
}

/// The real wall clock, backed by [`SystemTime::now`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[expect(clippy::cast_possible_truncation, reason = "millis since epoch fits in u64 until year 584556556")]
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock is before the Unix epoch")
            .as_millis() as u64
    }
}

/// A clock that always returns the same value, for deterministic tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(u64);

impl FixedClock {
    #[must_use]
    pub fn new(millis: u64) -> Self {
        Self(millis)
    }
}

impl Clock for FixedClock {
    fn now_millis(&self) -> u64 {
        self.0
    }
}
