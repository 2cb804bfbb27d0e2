//! Failure counters and one-shot alert escalation.
//!
//! Each failure class owns a persistent counter. Failures increment it,
//! successes reset it, and an alert is raised exactly once per streak, on
//! the cycle where the count reaches the class threshold.

use core::fmt;

use crate::store::{self, SlotId, SlotStore};

/// Consecutive mount failures before the storage alert.
pub const STORAGE_MOUNT_ALERT_THRESHOLD: u32 = 1;

/// Consecutive link failures before the network alert.
pub const NETWORK_LINK_ALERT_THRESHOLD: u32 = 50;

/// A tracked class of recurring failure.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FailureClass {
    /// The strip medium refused to mount.
    StorageMount,
    /// The network link refused to come up.
    NetworkLink,
}

impl FailureClass {
    /// Counter slot backing this class.
    #[must_use]
    pub const fn counter(self) -> SlotId {
        match self {
            FailureClass::StorageMount => SlotId::MountFailures,
            FailureClass::NetworkLink => SlotId::LinkFailures,
        }
    }

    /// Streak length at which the alert fires.
    #[must_use]
    pub const fn threshold(self) -> u32 {
        match self {
            FailureClass::StorageMount => STORAGE_MOUNT_ALERT_THRESHOLD,
            FailureClass::NetworkLink => NETWORK_LINK_ALERT_THRESHOLD,
        }
    }

    /// Notification text printed when the alert fires.
    #[must_use]
    pub const fn alert_text(self) -> &'static str {
        match self {
            FailureClass::StorageMount => "SD-Karte konnte nicht gelesen werden!",
            FailureClass::NetworkLink => "WLAN-Verbindung fehlgeschlagen!",
        }
    }
}

impl fmt::Display for FailureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureClass::StorageMount => f.write_str("storage-mount"),
            FailureClass::NetworkLink => f.write_str("network-link"),
        }
    }
}

/// A raised escalation, ready to hand to the alert sequence.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Alert {
    pub class: FailureClass,
    pub text: &'static str,
}

/// Records one failure of `class` and reports whether it crossed the
/// threshold on exactly this cycle.
///
/// Counts beyond the threshold stay silent, so a persistent fault raises
/// one alert per streak rather than one per wake.
pub fn note_failure<S: SlotStore>(store: &mut S, class: FailureClass) -> Option<Alert> {
    let count = store::increment_counter(store, class.counter());
    (count == class.threshold()).then_some(Alert {
        class,
        text: class.alert_text(),
    })
}

/// Records one success of `class`, ending the streak and re-arming the
/// alert for the next one.
pub fn note_success<S: SlotStore>(store: &mut S, class: FailureClass) {
    store::reset_counter(store, class.counter());
}
