//! Time sources pinned to one canonical offset
//!
//! Every timestamp the core records is a `DateTime<FixedOffset>` in the same
//! zone regardless of host locale, so session arithmetic is reproducible.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, FixedOffset, Offset, Utc};

/// Canonical offset from UTC, in hours
pub const CANONICAL_OFFSET_HOURS: i32 = 8;

const SECONDS_PER_HOUR: i32 = 3600;

/// Largest minute count a `chrono::Duration` can hold
const MAX_MINUTES: i64 = i64::MAX / 60_000;

/// Convert a configured minute count into a duration, saturating
pub(crate) fn minutes(count: u64) -> Duration {
    Duration::minutes(i64::try_from(count).unwrap_or(MAX_MINUTES).min(MAX_MINUTES))
}

/// Source of the current time
pub trait Clock: Send + Sync {
    /// Current instant in the clock's fixed offset
    fn now(&self) -> DateTime<FixedOffset>;
}

/// The canonical UTC+8 offset
pub fn canonical_offset() -> FixedOffset {
    offset_from_hours(CANONICAL_OFFSET_HOURS).unwrap_or_else(|| Utc.fix())
}

/// Build a fixed offset from whole hours; `None` outside ±23 hours
pub fn offset_from_hours(hours: i32) -> Option<FixedOffset> {
    if !(-23..=23).contains(&hours) {
        return None;
    }
    FixedOffset::east_opt(hours * SECONDS_PER_HOUR)
}

/// Wall clock converted into a fixed offset
#[derive(Clone, Copy, Debug)]
pub struct SystemClock {
    offset: FixedOffset,
}

impl SystemClock {
    /// Wall clock in the canonical offset
    pub fn new() -> Self {
        Self {
            offset: canonical_offset(),
        }
    }

    /// Wall clock in a custom offset
    pub fn with_offset(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// The offset this clock reports in
    pub fn offset(&self) -> FixedOffset {
        self.offset
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.offset)
    }
}

/// Manually driven clock for simulating elapsed time
///
/// Clones share the same underlying instant, so a test can hand one clone to
/// an `AuthSession` and advance the other.
#[derive(Clone, Debug)]
pub struct ManualClock {
    current: Arc<Mutex<DateTime<FixedOffset>>>,
}

impl ManualClock {
    /// Start at the given instant
    pub fn new(start: DateTime<FixedOffset>) -> Self {
        Self {
            current: Arc::new(Mutex::new(start)),
        }
    }

    /// Start at the current wall-clock time in the canonical offset
    pub fn starting_now() -> Self {
        Self::new(SystemClock::new().now())
    }

    /// Jump to an absolute instant
    pub fn set(&self, instant: DateTime<FixedOffset>) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        *current = instant;
    }

    /// Move the clock forward (or backward, for a negative duration)
    pub fn advance(&self, by: Duration) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        *current += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<FixedOffset> {
        *self.current.lock().unwrap_or_else(|e| e.into_inner())
    }
}
