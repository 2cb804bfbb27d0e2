//! Wall-clock timestamps, the wake cadence, and the sleep seam.
//!
//! The controller wakes on a fixed duty cycle and compares wall-clock time
//! against an externally supplied alarm instant. [`DutyClock`] is the single
//! trait the embedding target implements for time: reading the calendar
//! clock, short blocking holds, and the terminal deep-sleep call that ends
//! every cycle.

use core::fmt;
use core::time::Duration;

/// Seconds the device sleeps between wake cycles.
pub const WAKE_INTERVAL_SECONDS: u32 = 4 * 60;

/// Number of wake intervals covered by the fire window. The cadence is
/// coarse, so the window must span enough intervals that exactly one wake
/// observes the target fall inside it.
pub const WINDOW_INTERVALS: u32 = 3;

/// Absolute wall-clock instant in unix seconds.
///
/// A `u32` carries the 10-digit second timestamps the alarm endpoint
/// produces and fits the 32-bit persistence slots; deltas are widened to
/// `i64` so past targets stay representable.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp(u32);

impl Timestamp {
    /// Sentinel for "no alarm armed".
    pub const NEVER: Self = Self(0);

    /// Wraps a unix-seconds value.
    #[must_use]
    pub const fn from_unix_seconds(seconds: u32) -> Self {
        Self(seconds)
    }

    /// Returns the raw unix-seconds value.
    #[must_use]
    pub const fn as_unix_seconds(self) -> u32 {
        self.0
    }

    /// Returns `true` for the "no alarm" sentinel.
    #[must_use]
    pub const fn is_never(self) -> bool {
        self.0 == Self::NEVER.0
    }

    /// Signed seconds from `now` until this instant; negative once passed.
    #[must_use]
    pub const fn seconds_after(self, now: Self) -> i64 {
        self.0 as i64 - now.0 as i64
    }

    /// Returns this instant shifted forward, saturating at the range end.
    #[must_use]
    pub const fn plus_seconds(self, seconds: u32) -> Self {
        Self(self.0.saturating_add(seconds))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The fixed sleep/wake cadence and the fire window derived from it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct WakeSchedule {
    interval_seconds: u32,
}

impl WakeSchedule {
    /// The cadence the device ships with.
    pub const DEFAULT: Self = Self::new(WAKE_INTERVAL_SECONDS);

    /// Creates a schedule with the given whole-second interval.
    #[must_use]
    pub const fn new(interval_seconds: u32) -> Self {
        Self { interval_seconds }
    }

    /// Seconds between wakes.
    #[must_use]
    pub const fn interval_seconds(self) -> u32 {
        self.interval_seconds
    }

    /// Sleep duration between wakes.
    #[must_use]
    pub const fn interval(self) -> Duration {
        Duration::from_secs(self.interval_seconds as u64)
    }

    /// Width of the fire window in seconds.
    #[must_use]
    pub const fn window_seconds(self) -> u32 {
        self.interval_seconds * WINDOW_INTERVALS
    }
}

/// Time source and sleep control for one wake cycle.
///
/// `deep_sleep` is the terminal action of every cycle: it arms the hardware
/// wake timer and suspends the whole process, so it never returns. A skewed
/// clock degrades alarm timing but must never abort the cycle, which is why
/// `now` is infallible.
pub trait DutyClock {
    /// Returns the current wall-clock instant.
    fn now(&mut self) -> Timestamp;

    /// Blocks for the given duration.
    fn pause(&mut self, duration: Duration);

    /// Arms the wake timer for `interval` and suspends the process.
    fn deep_sleep(&mut self, interval: Duration) -> !;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_is_three_intervals() {
        let schedule = WakeSchedule::DEFAULT;
        assert_eq!(schedule.interval_seconds(), 240);
        assert_eq!(schedule.window_seconds(), 720);
        assert_eq!(schedule.interval(), Duration::from_secs(240));
    }

    #[test]
    fn deltas_are_signed() {
        let now = Timestamp::from_unix_seconds(1_000);
        assert_eq!(Timestamp::from_unix_seconds(1_300).seconds_after(now), 300);
        assert_eq!(Timestamp::from_unix_seconds(700).seconds_after(now), -300);
        assert_eq!(now.seconds_after(now), 0);
    }

    #[test]
    fn never_sentinel_is_zero() {
        assert!(Timestamp::NEVER.is_never());
        assert!(Timestamp::from_unix_seconds(0).is_never());
        assert!(!Timestamp::from_unix_seconds(1).is_never());
    }

    #[test]
    fn plus_seconds_saturates() {
        let late = Timestamp::from_unix_seconds(u32::MAX - 1);
        assert_eq!(late.plus_seconds(10).as_unix_seconds(), u32::MAX);
    }
}
