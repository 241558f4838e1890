//! Clock sources: wall time and virtual time.

use crate::types::Time;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// A source of the current time.
///
/// Implementations must be cheap to query and, apart from an explicit
/// [`VirtualClock::set`], monotonic: `now` never returns a value smaller
/// than a previously returned one.
pub trait TimeSource: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> Time;
}

/// Wall-clock time source backed by [`Instant`].
///
/// Measures time from the clock's creation, so [`Time::ZERO`] is the
/// moment the clock was built.
#[derive(Debug)]
pub struct WallClock {
    epoch: Instant,
}

impl WallClock {
    /// Creates a wall clock with its epoch at the current instant.
    #[must_use]
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for WallClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for WallClock {
    fn now(&self) -> Time {
        let nanos = u64::try_from(self.epoch.elapsed().as_nanos()).unwrap_or(u64::MAX);
        Time::from_nanos(nanos)
    }
}

/// Virtual time source for deterministic tests.
///
/// Starts at [`Time::ZERO`] and only moves when explicitly advanced, so a
/// test controls exactly how much time "passes" between callbacks.
///
/// # Example
///
/// ```
/// use zonal::{TimeSource, VirtualClock};
/// use std::time::Duration;
///
/// let clock = VirtualClock::new();
/// assert_eq!(clock.now().as_nanos(), 0);
/// clock.advance(Duration::from_millis(5));
/// assert_eq!(clock.now().as_millis(), 5);
/// ```
#[derive(Debug, Default)]
pub struct VirtualClock {
    now: AtomicU64,
}

impl VirtualClock {
    /// Creates a virtual clock at [`Time::ZERO`].
    #[must_use]
    pub const fn new() -> Self {
        Self {
            now: AtomicU64::new(0),
        }
    }

    /// Creates a virtual clock starting at the given time.
    #[must_use]
    pub const fn starting_at(time: Time) -> Self {
        Self {
            now: AtomicU64::new(time.as_nanos()),
        }
    }

    /// Advances the clock by `amount`.
    pub fn advance(&self, amount: Duration) {
        let nanos = u64::try_from(amount.as_nanos()).unwrap_or(u64::MAX);
        self.now.fetch_add(nanos, Ordering::Release);
    }

    /// Advances the clock to `target` if it is ahead of the current time.
    ///
    /// Moving backwards is a no-op; the clock stays monotonic.
    pub fn advance_to(&self, target: Time) {
        let target = target.as_nanos();
        let mut current = self.now.load(Ordering::Acquire);
        while current < target {
            match self.now.compare_exchange_weak(
                current,
                target,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return,
                Err(observed) => current = observed,
            }
        }
    }

    /// Sets the clock to `time`, for tests that reposition time outright.
    ///
    /// Unlike [`Self::advance_to`], this may move the clock backwards.
    pub fn set(&self, time: Time) {
        self.now.store(time.as_nanos(), Ordering::Release);
    }
}

impl TimeSource for VirtualClock {
    fn now(&self) -> Time {
        Time::from_nanos(self.now.load(Ordering::Acquire))
    }
}
