//! Host system clock

use std::time::{Duration, Instant};

use chrono::{Local, NaiveDateTime};
use servocal_hal::Clock;

/// Monotonic clock backed by [`Instant`], with local wall time
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    started: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }

    fn wall_time(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}
