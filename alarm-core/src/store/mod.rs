//! Persistent slot storage: failure counters, the alarm cache, and the
//! strip cursor.
//!
//! The controller owns four small values that must survive power cycles.
//! Each is a single `u32` slot, directly overwritten, so a power loss leaves
//! either the old value or the new one and never a partial write. The
//! backing medium is abstracted behind [`SlotStore`]; the firmware maps the
//! slots onto battery-backed registers and the emulator onto one decimal
//! text file per slot.

use core::fmt;

use crate::clock::Timestamp;

/// Identifies one persisted value.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SlotId {
    /// Consecutive storage-mount failures.
    MountFailures,
    /// Consecutive network-association failures.
    LinkFailures,
    /// Last effective alarm target (the fallback cache).
    AlarmTime,
    /// Index of the most recently printed strip.
    StripIndex,
}

impl SlotId {
    /// Every slot, in persistence-layout order.
    pub const ALL: [Self; 4] = [
        Self::MountFailures,
        Self::LinkFailures,
        Self::AlarmTime,
        Self::StripIndex,
    ];

    /// Stable name used by file-backed stores.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MountFailures => "failed_mounts",
            Self::LinkFailures => "failed_connections",
            Self::AlarmTime => "alarm_time",
            Self::StripIndex => "strip_index",
        }
    }

    /// Position of the slot within a register-backed layout.
    #[must_use]
    pub const fn as_index(self) -> usize {
        match self {
            Self::MountFailures => 0,
            Self::LinkFailures => 1,
            Self::AlarmTime => 2,
            Self::StripIndex => 3,
        }
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Durable storage for the controller's slots.
///
/// `read` distinguishes "never written" (`Ok(None)`) from an I/O failure so
/// callers can apply their own defaults.
pub trait SlotStore {
    type Error;

    /// Reads the slot, `None` when it has never been written.
    fn read(&mut self, slot: SlotId) -> Result<Option<u32>, Self::Error>;

    /// Overwrites the slot with a whole new value.
    fn write(&mut self, slot: SlotId, value: u32) -> Result<(), Self::Error>;
}

/// Removable or bulk storage holding the printable strips.
///
/// Distinct from the slot store: the counters must stay reachable when this
/// medium is the thing that failed.
pub trait StorageMedium {
    type Error;

    /// Makes the medium usable for this cycle.
    fn mount(&mut self) -> Result<(), Self::Error>;

    /// Number of strips available for printing.
    fn strip_count(&mut self) -> Result<u32, Self::Error>;
}

/// Increments a failure counter and returns the new value.
///
/// A missing slot reads as 0. The write-back is best effort: escalation
/// must still see the incremented value when persistence itself is the
/// failing component.
pub fn increment_counter<S: SlotStore>(store: &mut S, slot: SlotId) -> u32 {
    let current = store.read(slot).ok().flatten().unwrap_or(0);
    let next = current.saturating_add(1);
    let _ = store.write(slot, next);
    next
}

/// Resets a failure counter to 0, ignoring write failures.
pub fn reset_counter<S: SlotStore>(store: &mut S, slot: SlotId) {
    let _ = store.write(slot, 0);
}

/// Best-effort persist of the effective alarm target.
pub fn cache_target<S: SlotStore>(store: &mut S, target: Timestamp) {
    let _ = store.write(SlotId::AlarmTime, target.as_unix_seconds());
}

/// Returns the cached alarm target, `None` when absent or unreadable.
pub fn cached_target<S: SlotStore>(store: &mut S) -> Option<Timestamp> {
    store
        .read(SlotId::AlarmTime)
        .ok()
        .flatten()
        .map(Timestamp::from_unix_seconds)
}

/// Advances the strip cursor and commits the new index.
///
/// The commit is the last action of the advance and the returned index may
/// only be rendered after it succeeds: a power loss before the commit
/// retains the prior, already-rendered index, so no strip is skipped twice.
/// A missing slot starts the rotation at index 0.
pub fn advance_cursor<S: SlotStore>(store: &mut S, count: u32) -> Result<u32, S::Error> {
    let next = match store.read(SlotId::StripIndex)? {
        None => 0,
        Some(index) => {
            let next = index.saturating_add(1);
            if next >= count { 0 } else { next }
        }
    };
    store.write(SlotId::StripIndex, next)?;
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct MemStore {
        slots: [Option<u32>; 4],
        fail_reads: bool,
        fail_writes: bool,
        writes: usize,
    }

    impl SlotStore for MemStore {
        type Error = ();

        fn read(&mut self, slot: SlotId) -> Result<Option<u32>, ()> {
            if self.fail_reads {
                return Err(());
            }
            Ok(self.slots[slot.as_index()])
        }

        fn write(&mut self, slot: SlotId, value: u32) -> Result<(), ()> {
            if self.fail_writes {
                return Err(());
            }
            self.writes += 1;
            self.slots[slot.as_index()] = Some(value);
            Ok(())
        }
    }

    #[test]
    fn increment_after_reset_yields_one() {
        let mut store = MemStore::default();
        assert_eq!(increment_counter(&mut store, SlotId::LinkFailures), 1);
        assert_eq!(increment_counter(&mut store, SlotId::LinkFailures), 2);
        reset_counter(&mut store, SlotId::LinkFailures);
        assert_eq!(store.slots[SlotId::LinkFailures.as_index()], Some(0));
        assert_eq!(increment_counter(&mut store, SlotId::LinkFailures), 1);
    }

    #[test]
    fn increment_reports_new_value_when_persist_fails() {
        let mut store = MemStore {
            slots: [None, Some(4), None, None],
            fail_writes: true,
            ..MemStore::default()
        };
        assert_eq!(increment_counter(&mut store, SlotId::LinkFailures), 5);
        // Value stays stale on the medium but escalation saw 5.
        assert_eq!(store.slots[SlotId::LinkFailures.as_index()], Some(4));
    }

    #[test]
    fn unreadable_counter_restarts_from_zero() {
        let mut store = MemStore {
            fail_reads: true,
            ..MemStore::default()
        };
        assert_eq!(increment_counter(&mut store, SlotId::MountFailures), 1);
    }

    #[test]
    fn cached_target_roundtrips() {
        let mut store = MemStore::default();
        assert_eq!(cached_target(&mut store), None);
        cache_target(&mut store, Timestamp::from_unix_seconds(1_700_000_000));
        assert_eq!(
            cached_target(&mut store),
            Some(Timestamp::from_unix_seconds(1_700_000_000))
        );
    }

    #[test]
    fn cache_read_failure_reads_as_absent() {
        let mut store = MemStore {
            slots: [None, None, Some(123), None],
            fail_reads: true,
            ..MemStore::default()
        };
        assert_eq!(cached_target(&mut store), None);
    }

    #[test]
    fn cursor_wraps_to_zero_at_end() {
        let mut store = MemStore::default();
        store.slots[SlotId::StripIndex.as_index()] = Some(4);
        assert_eq!(advance_cursor(&mut store, 5), Ok(0));
    }

    #[test]
    fn cursor_steps_forward_inside_range() {
        let mut store = MemStore::default();
        store.slots[SlotId::StripIndex.as_index()] = Some(2);
        assert_eq!(advance_cursor(&mut store, 5), Ok(3));
        assert_eq!(store.slots[SlotId::StripIndex.as_index()], Some(3));
    }

    #[test]
    fn cursor_starts_at_zero_on_first_boot() {
        let mut store = MemStore::default();
        assert_eq!(advance_cursor(&mut store, 5), Ok(0));
    }

    #[test]
    fn stale_cursor_beyond_count_wraps() {
        let mut store = MemStore::default();
        store.slots[SlotId::StripIndex.as_index()] = Some(9);
        assert_eq!(advance_cursor(&mut store, 5), Ok(0));
    }

    #[test]
    fn cursor_commit_failure_surfaces() {
        let mut store = MemStore {
            slots: [None, None, None, Some(1)],
            fail_writes: true,
            ..MemStore::default()
        };
        assert_eq!(advance_cursor(&mut store, 5), Err(()));
    }
}
