//! Alarm decision engine: target resolution and the fire/no-fire verdict.
//!
//! Once per wake cycle the engine reconstructs the effective alarm target,
//! preferring the live endpoint and falling back to the cached value, then
//! compares it against wall-clock time inside a window wide enough that
//! exactly one wake cycle observes an upcoming target. Inside that window it
//! spin-aligns to the precise second before reporting a fire.

use core::fmt;
use core::time::Duration;

use crate::clock::{DutyClock, Timestamp, WakeSchedule};
use crate::store::{self, SlotStore};
use crate::wire::{self, AlarmBody, MenuBody};

/// Cadence of the alignment loop.
pub const ALIGN_POLL: Duration = Duration::from_secs(1);

/// Remaining seconds at which the alignment loop stops.
pub const ALIGN_THRESHOLD_SECONDS: i64 = 1;

/// Transport to the two origin endpoints.
///
/// Implementations fill the caller-owned buffer with the raw response body;
/// an empty menu body is a valid "nothing today" response, not an error.
pub trait RemoteSource {
    type Error;

    /// Fetches the alarm-config body.
    fn fetch_alarm(&mut self, body: &mut AlarmBody) -> Result<(), Self::Error>;

    /// Fetches the daily-menu body.
    fn fetch_menu(&mut self, body: &mut MenuBody) -> Result<(), Self::Error>;
}

/// Alarm configuration as published by the origin.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AlarmTarget {
    pub epoch_seconds: Timestamp,
    pub active: bool,
}

impl AlarmTarget {
    #[must_use]
    pub const fn new(epoch_seconds: Timestamp, active: bool) -> Self {
        Self {
            epoch_seconds,
            active,
        }
    }

    /// The instant actually compared against the clock. An inactive target
    /// is never an imminent deadline.
    #[must_use]
    pub const fn effective(self) -> Timestamp {
        if self.active {
            self.epoch_seconds
        } else {
            Timestamp::NEVER
        }
    }
}

/// Where the effective target of this cycle came from.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TargetOrigin {
    /// Fresh fetch from the endpoint.
    Live,
    /// Fetch failed, cached value substituted.
    Cached,
    /// Fetch failed and no cache exists; nothing is armed.
    Default,
}

impl fmt::Display for TargetOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetOrigin::Live => f.write_str("live"),
            TargetOrigin::Cached => f.write_str("cached"),
            TargetOrigin::Default => f.write_str("default"),
        }
    }
}

/// Why a cycle did not fire.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum IdleReason {
    /// No alarm armed (inactive, or never configured).
    Unarmed,
    /// Target lies in the past.
    TargetPassed,
    /// Target is too far ahead for this wake; a later cycle will catch it.
    OutsideWindow,
}

impl fmt::Display for IdleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdleReason::Unarmed => f.write_str("unarmed"),
            IdleReason::TargetPassed => f.write_str("target-passed"),
            IdleReason::OutsideWindow => f.write_str("outside-window"),
        }
    }
}

/// Outcome of one cycle's decision.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum WakeVerdict {
    /// The alarm fires this cycle, after `aligned_for` seconds of polling.
    Fire {
        target: Timestamp,
        aligned_for: u32,
    },
    /// Nothing to do this cycle.
    Idle(IdleReason),
}

impl WakeVerdict {
    /// Returns `true` when the action sequence should run.
    #[must_use]
    pub const fn is_fire(self) -> bool {
        matches!(self, WakeVerdict::Fire { .. })
    }
}

impl fmt::Display for WakeVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WakeVerdict::Fire {
                target,
                aligned_for,
            } => write!(f, "fire at {target} after {aligned_for}s"),
            WakeVerdict::Idle(reason) => write!(f, "idle ({reason})"),
        }
    }
}

/// Per-cycle decision logic around a fixed wake schedule.
#[derive(Copy, Clone, Debug)]
pub struct DecisionEngine {
    schedule: WakeSchedule,
}

impl DecisionEngine {
    #[must_use]
    pub const fn new(schedule: WakeSchedule) -> Self {
        Self { schedule }
    }

    /// The schedule this engine decides against.
    #[must_use]
    pub const fn schedule(&self) -> WakeSchedule {
        self.schedule
    }

    /// Resolves the effective target for this cycle.
    ///
    /// A successful fetch refreshes the fallback cache with the effective
    /// value (so an inactive alarm caches the "never" sentinel); any fetch
    /// or parse failure falls back to the cache, and an absent cache means
    /// nothing is armed.
    pub fn resolve_target<R, S>(&self, remote: &mut R, store: &mut S) -> (Timestamp, TargetOrigin)
    where
        R: RemoteSource,
        S: SlotStore,
    {
        let mut body = AlarmBody::new();
        if remote.fetch_alarm(&mut body).is_ok() {
            if let Ok(target) = wire::alarm::parse(&body) {
                let effective = target.effective();
                store::cache_target(store, effective);
                return (effective, TargetOrigin::Live);
            }
        }
        match store::cached_target(store) {
            Some(cached) => (cached, TargetOrigin::Cached),
            None => (Timestamp::NEVER, TargetOrigin::Default),
        }
    }

    /// Decides fire/no-fire for the effective target.
    ///
    /// Inside the qualifying window this blocks, re-sampling the clock once
    /// per second until the target is at most one second away. The loop is
    /// bounded by the window width, so a stalled clock produces a late fire
    /// rather than an unbounded wait.
    pub fn decide<C: DutyClock>(&self, clock: &mut C, effective: Timestamp) -> WakeVerdict {
        if effective.is_never() {
            return WakeVerdict::Idle(IdleReason::Unarmed);
        }

        let delta = effective.seconds_after(clock.now());
        if delta < 0 {
            return WakeVerdict::Idle(IdleReason::TargetPassed);
        }
        if delta >= i64::from(self.schedule.window_seconds()) {
            return WakeVerdict::Idle(IdleReason::OutsideWindow);
        }

        let mut aligned_for = 0;
        while effective.seconds_after(clock.now()) > ALIGN_THRESHOLD_SECONDS
            && aligned_for < self.schedule.window_seconds()
        {
            clock.pause(ALIGN_POLL);
            aligned_for += 1;
        }

        WakeVerdict::Fire {
            target: effective,
            aligned_for,
        }
    }

    /// Convenience wrapper running resolution and decision back to back.
    pub fn evaluate<C, R, S>(
        &self,
        clock: &mut C,
        remote: &mut R,
        store: &mut S,
    ) -> (WakeVerdict, TargetOrigin)
    where
        C: DutyClock,
        R: RemoteSource,
        S: SlotStore,
    {
        let (effective, origin) = self.resolve_target(remote, store);
        (self.decide(clock, effective), origin)
    }
}
