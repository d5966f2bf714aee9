//! Wall-clock abstraction for token expiry
//!
//! Token expiry is an absolute UTC instant, so the clock hands out
//! `DateTime<Utc>` rather than a monotonic `Instant`. Tests drive expiry
//! with `testing::MockClock` instead of sleeping.

use std::sync::Arc;

use chrono::{DateTime, Utc};

/// Source of the current time
pub trait Clock: Send + Sync + 'static {
    /// Current wall-clock time
    fn now(&self) -> DateTime<Utc>;
}

/// Real system clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

impl<T: Clock> Clock for Arc<T> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}
