//! Time source for token issuance and validation.
//!
//! The lifecycle manager never reads the wall clock directly; it asks the
//! [`Clock`] it was built with, so tests can pin time to exact boundaries.

use chrono::{DateTime, Utc};

/// Supplies the current time.
pub trait Clock: Send + Sync {
    /// Current instant. Only second granularity is used by tokens.
    fn now(&self) -> DateTime<Utc>;

    /// Current instant as Unix epoch seconds.
    fn now_timestamp(&self) -> i64 {
        self.now().timestamp()
    }
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
