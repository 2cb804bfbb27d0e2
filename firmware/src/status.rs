#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Shared status registers for the firmware target.
//!
//! Standby powers this RAM down, so the registers always describe the wake
//! cycle currently in flight. The hardware adapters stamp their progress
//! here and the panic handler folds the registers into its crash report,
//! since it cannot reach the controller's owned state.

use portable_atomic::{AtomicU8, AtomicU32, Ordering};

/// Coarse progress marker for the running wake cycle.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CyclePhase {
    Boot,
    Storage,
    Network,
    Resolving,
    Aligning,
    Printing,
    Retiring,
}

impl CyclePhase {
    /// Human-readable phase name for crash reports.
    pub const fn as_str(self) -> &'static str {
        match self {
            CyclePhase::Boot => "boot",
            CyclePhase::Storage => "storage",
            CyclePhase::Network => "network",
            CyclePhase::Resolving => "resolving",
            CyclePhase::Aligning => "aligning",
            CyclePhase::Printing => "printing",
            CyclePhase::Retiring => "retiring",
        }
    }

    fn from_code(code: u8) -> Self {
        match code {
            1 => CyclePhase::Storage,
            2 => CyclePhase::Network,
            3 => CyclePhase::Resolving,
            4 => CyclePhase::Aligning,
            5 => CyclePhase::Printing,
            6 => CyclePhase::Retiring,
            _ => CyclePhase::Boot,
        }
    }
}

/// Current cycle phase code.
static PHASE: AtomicU8 = AtomicU8::new(CyclePhase::Boot as u8);
/// Wake timestamp in unix seconds (+1, 0 == clock not read yet).
static WOKE_AT: AtomicU32 = AtomicU32::new(0);
/// Escalation alerts raised so far this cycle.
static ALERTS: AtomicU8 = AtomicU8::new(0);

/// Registers as captured at one moment.
#[derive(Copy, Clone, Debug)]
pub struct CycleStatus {
    pub phase: CyclePhase,
    pub woke_at: Option<u32>,
    pub alerts: u8,
}

/// Marks the phase the cycle is entering.
pub fn record_phase(phase: CyclePhase) {
    PHASE.store(phase as u8, Ordering::Relaxed);
}

/// Stores the most recent wall-clock reading.
pub fn record_wall_clock(seconds: u32) {
    WOKE_AT.store(seconds.wrapping_add(1), Ordering::Relaxed);
}

/// Counts one escalation alert.
pub fn record_alert() {
    ALERTS.fetch_add(1, Ordering::Relaxed);
}

/// Builds a [`CycleStatus`] from the stored registers.
pub fn snapshot() -> CycleStatus {
    CycleStatus {
        phase: CyclePhase::from_code(PHASE.load(Ordering::Relaxed)),
        woke_at: decode_seconds(WOKE_AT.load(Ordering::Relaxed)),
        alerts: ALERTS.load(Ordering::Relaxed),
    }
}

fn decode_seconds(raw: u32) -> Option<u32> {
    if raw == 0 {
        None
    } else {
        Some(raw.wrapping_sub(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wall_clock_zero_is_distinguishable_from_unread() {
        assert_eq!(decode_seconds(0), None);
        record_wall_clock(0);
        assert_eq!(snapshot().woke_at, Some(0));
    }

    #[test]
    fn phase_codes_round_trip() {
        for phase in [
            CyclePhase::Boot,
            CyclePhase::Storage,
            CyclePhase::Network,
            CyclePhase::Resolving,
            CyclePhase::Aligning,
            CyclePhase::Printing,
            CyclePhase::Retiring,
        ] {
            assert_eq!(CyclePhase::from_code(phase as u8), phase);
        }
    }
}
