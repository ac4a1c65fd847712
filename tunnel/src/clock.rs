//! Time sources for liveness bookkeeping and packet timestamps.

use std::fmt;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Supplies monotonic time for liveness and wall-clock seconds for headers.
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> Instant;

    /// Wall-clock seconds as carried in packet headers.
    fn epoch(&self) -> i32;
}

/// The real clocks.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn epoch(&self) -> i32 {
        wire::current_epoch()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    start: Instant,
    start_epoch: i32,
    elapsed: Mutex<Duration>,
}

impl ManualClock {
    #[must_use]
    pub fn new(start_epoch: i32) -> Self {
        Self {
            start: Instant::now(),
            start_epoch,
            elapsed: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.elapsed.lock() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.start + *self.elapsed.lock()
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    fn epoch(&self) -> i32 {
        let secs = self.elapsed.lock().as_secs();
        self.start_epoch.wrapping_add(secs as i32)
    }
}
