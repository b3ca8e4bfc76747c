//! Injectable time sources
//!
//! Every component that needs "now" asks a [`Clock`] instead of calling
//! `Instant::now()` directly, so scheduling can be tested deterministically.

use parking_lot::Mutex;
use std::time::{Duration, Instant};

/// A source of monotonic time
pub trait Clock: Send + Sync {
    /// Returns the current instant
    fn now(&self) -> Instant;
}

/// Clock backed by tokio's time driver
///
/// Under `#[tokio::test(start_paused = true)]` this clock follows the paused
/// runtime, so sleeps in the runner advance it instantly.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }
}

/// A clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    /// Creates a manual clock starting at the current instant
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    /// Creates a manual clock starting at `start`
    pub fn starting_at(start: Instant) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Moves the clock forward by `by`
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }

    /// Sets the clock to `to`; moving backwards is ignored
    pub fn set(&self, to: Instant) {
        let mut now = self.now.lock();
        if to > *now {
            *now = to;
        }
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock()
    }
}
