//! Time source
//!
//! Polling loops measure durations and sleep through this trait so the same
//! loop can run against the wall clock or a manually advanced test clock.

use core::time::Duration;

use chrono::NaiveDateTime;

/// Monotonic time, sleeping, and wall-clock timestamps
pub trait Clock {
    /// Time elapsed since the clock was created
    fn elapsed(&self) -> Duration;

    /// Yield for `duration`
    fn sleep(&mut self, duration: Duration);

    /// Current local wall-clock time, used for log timestamps and file names
    fn wall_time(&self) -> NaiveDateTime;
}
