//! Identifier and timestamp types.
//!
//! [`ZoneId`] is a process-wide monotonic identifier: every fork draws the
//! next value from a shared atomic counter, so ids are unique across threads
//! and a higher id always means a later fork. [`Time`] is a nanosecond
//! timestamp measured from an arbitrary epoch, shared by the clock sources
//! and the timer queue.

use core::fmt;
use std::ops::Add;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

static ZONE_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// A unique identifier for a zone.
///
/// Ids are allocated from a single process-wide counter, so they are unique
/// across threads and strictly increase in fork order.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ZoneId(u64);

impl ZoneId {
    /// Allocates the next zone id.
    #[must_use]
    pub(crate) fn next() -> Self {
        Self(ZONE_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw counter value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Creates a zone id from a raw value, for tests that need a fixed id.
    #[doc(hidden)]
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Debug for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ZoneId({})", self.0)
    }
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Z{}", self.0)
    }
}

/// Nanosecond timestamp from an arbitrary epoch.
///
/// `Time` is a plain `u64` nanosecond count. Wall clocks measure it from
/// their creation instant; virtual clocks start at [`Time::ZERO`] and only
/// move when told to. Arithmetic saturates instead of wrapping.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Time(u64);

impl Time {
    /// The zero timestamp (the epoch itself).
    pub const ZERO: Self = Self(0);

    /// The maximum representable timestamp.
    pub const MAX: Self = Self(u64::MAX);

    /// Creates a time from nanoseconds since the epoch.
    #[must_use]
    pub const fn from_nanos(nanos: u64) -> Self {
        Self(nanos)
    }

    /// Creates a time from milliseconds since the epoch.
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis.saturating_mul(1_000_000))
    }

    /// Creates a time from seconds since the epoch.
    #[must_use]
    pub const fn from_secs(secs: u64) -> Self {
        Self(secs.saturating_mul(1_000_000_000))
    }

    /// Returns the number of nanoseconds since the epoch.
    #[must_use]
    pub const fn as_nanos(self) -> u64 {
        self.0
    }

    /// Returns the number of whole milliseconds since the epoch.
    #[must_use]
    pub const fn as_millis(self) -> u64 {
        self.0 / 1_000_000
    }

    /// Returns the number of whole seconds since the epoch.
    #[must_use]
    pub const fn as_secs(self) -> u64 {
        self.0 / 1_000_000_000
    }

    /// Adds nanoseconds, saturating at [`Time::MAX`].
    #[must_use]
    pub const fn saturating_add_nanos(self, nanos: u64) -> Self {
        Self(self.0.saturating_add(nanos))
    }

    /// Subtracts nanoseconds, saturating at [`Time::ZERO`].
    #[must_use]
    pub const fn saturating_sub_nanos(self, nanos: u64) -> Self {
        Self(self.0.saturating_sub(nanos))
    }

    /// Returns the nanoseconds elapsed since `earlier`, or zero if `earlier`
    /// is in the future.
    #[must_use]
    pub const fn duration_since(self, earlier: Self) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl Add<Duration> for Time {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self {
        let nanos = u64::try_from(rhs.as_nanos()).unwrap_or(u64::MAX);
        self.saturating_add_nanos(nanos)
    }
}

impl fmt::Debug for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Time({}ns)", self.0)
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 >= 1_000_000_000 {
            write!(f, "{}.{:03}s", self.as_secs(), self.as_millis() % 1_000)
        } else if self.0 >= 1_000_000 {
            write!(f, "{}ms", self.as_millis())
        } else if self.0 >= 1_000 {
            write!(f, "{}us", self.0 / 1_000)
        } else {
            write!(f, "{}ns", self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zone_ids_are_unique_and_increasing() {
        let a = ZoneId::next();
        let b = ZoneId::next();
        assert_ne!(a, b);
        assert!(b > a);
    }

    #[test]
    fn zone_ids_are_unique_across_threads() {
        let handles: Vec<_> = (0..4)
            .map(|_| std::thread::spawn(|| (0..64).map(|_| ZoneId::next()).collect::<Vec<_>>()))
            .collect();
        let mut all: Vec<ZoneId> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        let total = all.len();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), total);
    }

    #[test]
    fn zone_id_formatting() {
        let id = ZoneId::from_raw(42);
        assert_eq!(format!("{id}"), "Z42");
        assert_eq!(format!("{id:?}"), "ZoneId(42)");
    }

    #[test]
    fn time_conversions() {
        let t = Time::from_millis(1_500);
        assert_eq!(t.as_nanos(), 1_500_000_000);
        assert_eq!(t.as_millis(), 1_500);
        assert_eq!(t.as_secs(), 1);
    }

    #[test]
    fn time_saturating_arithmetic() {
        assert_eq!(Time::MAX.saturating_add_nanos(1), Time::MAX);
        assert_eq!(Time::ZERO.saturating_sub_nanos(1), Time::ZERO);
        assert_eq!(Time::from_nanos(10).duration_since(Time::from_nanos(30)), 0);
        assert_eq!(Time::from_nanos(30).duration_since(Time::from_nanos(10)), 20);
    }

    #[test]
    fn time_add_duration() {
        let t = Time::from_millis(1) + Duration::from_micros(500);
        assert_eq!(t.as_nanos(), 1_500_000);
    }

    #[test]
    fn time_display_tiers() {
        assert_eq!(format!("{}", Time::from_nanos(999)), "999ns");
        assert_eq!(format!("{}", Time::from_nanos(2_000)), "2us");
        assert_eq!(format!("{}", Time::from_millis(15)), "15ms");
        assert_eq!(format!("{}", Time::from_millis(2_250)), "2.250s");
    }
}
