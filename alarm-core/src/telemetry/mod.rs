//! Cycle event log shared by firmware and host targets.
//!
//! Every wake cycle appends a handful of records describing what the
//! controller observed and did. The ring keeps the most recent cycles so a
//! debugger (or the emulator's status view) can reconstruct recent history
//! without any heap.

use core::fmt;

use heapless::{HistoryBuf, OldestOrdered};

use crate::clock::Timestamp;
use crate::engine::{TargetOrigin, WakeVerdict};
use crate::escalate::FailureClass;
use crate::sequence::{SkipReason, StepFault};

/// Records retained before the oldest cycle falls off.
pub const CYCLE_LOG_CAPACITY: usize = 32;

/// One observation made during a wake cycle.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CycleEvent {
    Woke,
    MountOk,
    MountFailed,
    LinkOk,
    LinkFailed,
    ClockSynced,
    ClockSyncFailed,
    TargetResolved(TargetOrigin),
    Verdict(WakeVerdict),
    AlertPrinted(FailureClass),
    StepFailed(StepFault),
    StepSkipped(SkipReason),
    SleepArmed(u32),
}

impl fmt::Display for CycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleEvent::Woke => f.write_str("woke"),
            CycleEvent::MountOk => f.write_str("mount ok"),
            CycleEvent::MountFailed => f.write_str("mount failed"),
            CycleEvent::LinkOk => f.write_str("link ok"),
            CycleEvent::LinkFailed => f.write_str("link failed"),
            CycleEvent::ClockSynced => f.write_str("clock synced"),
            CycleEvent::ClockSyncFailed => f.write_str("clock sync failed"),
            CycleEvent::TargetResolved(origin) => write!(f, "target from {origin}"),
            CycleEvent::Verdict(verdict) => write!(f, "verdict: {verdict}"),
            CycleEvent::AlertPrinted(class) => write!(f, "alert printed: {class}"),
            CycleEvent::StepFailed(fault) => write!(f, "step failed: {fault}"),
            CycleEvent::StepSkipped(reason) => write!(f, "step skipped: {reason}"),
            CycleEvent::SleepArmed(seconds) => write!(f, "sleep armed for {seconds}s"),
        }
    }
}

/// A [`CycleEvent`] stamped with the wake time of its cycle.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CycleRecord {
    pub at: Timestamp,
    pub event: CycleEvent,
}

/// Fixed-capacity chronological event ring.
pub struct CycleLog {
    ring: HistoryBuf<CycleRecord, CYCLE_LOG_CAPACITY>,
}

impl CycleLog {
    /// Creates an empty log.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ring: HistoryBuf::new(),
        }
    }

    /// Appends a record, evicting the oldest once full.
    pub fn record(&mut self, at: Timestamp, event: CycleEvent) {
        self.ring.write(CycleRecord { at, event });
    }

    /// Returns the records in chronological order.
    pub fn oldest_first(&self) -> OldestOrdered<'_, CycleRecord> {
        self.ring.oldest_ordered()
    }

    /// Returns the most recent record, if any.
    #[must_use]
    pub fn latest(&self) -> Option<&CycleRecord> {
        self.ring.recent()
    }

    /// Returns the number of records currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    /// Returns `true` when nothing has been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }
}

impl Default for CycleLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::IdleReason;
    use core::fmt::Write;

    #[test]
    fn records_come_back_in_order() {
        let mut log = CycleLog::new();
        let at = Timestamp::from_unix_seconds(1_700_000_000);
        log.record(at, CycleEvent::Woke);
        log.record(at, CycleEvent::LinkOk);
        log.record(at, CycleEvent::SleepArmed(240));

        let events: heapless::Vec<CycleEvent, 8> =
            log.oldest_first().map(|record| record.event).collect();
        assert_eq!(
            events.as_slice(),
            [
                CycleEvent::Woke,
                CycleEvent::LinkOk,
                CycleEvent::SleepArmed(240),
            ]
        );
        assert_eq!(log.len(), 3);
        assert_eq!(
            log.latest().map(|record| record.event),
            Some(CycleEvent::SleepArmed(240))
        );
    }

    #[test]
    fn overflow_drops_the_oldest_cycle() {
        let mut log = CycleLog::new();
        for second in 0..(CYCLE_LOG_CAPACITY as u32 + 4) {
            log.record(Timestamp::from_unix_seconds(second), CycleEvent::Woke);
        }

        assert_eq!(log.len(), CYCLE_LOG_CAPACITY);
        let first = log.oldest_first().next().map(|record| record.at);
        assert_eq!(first, Some(Timestamp::from_unix_seconds(4)));
    }

    #[test]
    fn events_render_for_status_views() {
        let mut line = heapless::String::<64>::new();
        write!(
            line,
            "{}",
            CycleEvent::Verdict(WakeVerdict::Idle(IdleReason::OutsideWindow))
        )
        .unwrap();
        assert_eq!(line.as_str(), "verdict: idle (outside-window)");

        line.clear();
        write!(line, "{}", CycleEvent::TargetResolved(TargetOrigin::Cached)).unwrap();
        assert_eq!(line.as_str(), "target from cached");
    }
}
