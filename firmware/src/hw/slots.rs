//! Slot store over the TAMP backup registers.
//!
//! The backup domain keeps these registers alive through standby and
//! battery brown-outs, which is exactly the persistence the counters, the
//! alarm cache, and the strip cursor need. Values are stored `+1` so the
//! all-zeroes reset state reads as "never written" rather than as a live 0.

use core::convert::Infallible;

use alarm_core::store::{SlotId, SlotStore};
use embassy_stm32::pac;

/// Largest storable value; the encoding steals one step for the sentinel.
const SLOT_MAX: u32 = u32::MAX - 1;

/// [`SlotStore`] mapping each slot onto one backup register.
///
/// Construct after `Rtc::new`, which unlocks backup-domain writes.
pub struct BackupSlots {
    _private: (),
}

impl BackupSlots {
    pub fn new() -> Self {
        Self { _private: () }
    }
}

impl Default for BackupSlots {
    fn default() -> Self {
        Self::new()
    }
}

impl SlotStore for BackupSlots {
    type Error = Infallible;

    fn read(&mut self, slot: SlotId) -> Result<Option<u32>, Infallible> {
        let raw = pac::TAMP.bkpr(slot.as_index()).read().bkp();
        Ok(if raw == 0 { None } else { Some(raw - 1) })
    }

    fn write(&mut self, slot: SlotId, value: u32) -> Result<(), Infallible> {
        pac::TAMP
            .bkpr(slot.as_index())
            .write(|w| w.set_bkp(value.min(SLOT_MAX) + 1));
        Ok(())
    }
}
