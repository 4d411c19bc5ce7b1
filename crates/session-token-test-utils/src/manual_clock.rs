//! Manually driven clock.
//!
//! Lets tests place "now" on an exact second, e.g. one second past expiry.

use chrono::{DateTime, TimeZone, Utc};
use session_token::Clock;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Fixed starting point for tests (2023-11-14T22:13:20Z).
pub const TEST_EPOCH: i64 = 1_700_000_000;

#[derive(Debug)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    /// Clock reading `timestamp` until moved.
    pub fn at(timestamp: i64) -> Arc<Self> {
        Arc::new(Self {
            now: AtomicI64::new(timestamp),
        })
    }

    /// Clock reading [`TEST_EPOCH`].
    pub fn at_test_epoch() -> Arc<Self> {
        Self::at(TEST_EPOCH)
    }

    pub fn set(&self, timestamp: i64) {
        self.now.store(timestamp, Ordering::SeqCst);
    }

    /// Move forward (or back, for negative values) by `seconds`.
    pub fn advance(&self, seconds: i64) {
        self.now.fetch_add(seconds, Ordering::SeqCst);
    }

    pub fn timestamp(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.timestamp(), 0)
            .single()
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    fn now_timestamp(&self) -> i64 {
        self.timestamp()
    }
}
