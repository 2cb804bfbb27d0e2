//! Top-level wake-cycle orchestration.
//!
//! [`WakeController`] owns every peripheral handle for the duration of the
//! process and runs the linear cycle: bring up storage and network, note
//! failures, resolve the target, decide, act, sleep. Nothing in the cycle
//! can abort early; every failure degrades into a report field, because a
//! cycle that dies before the terminal sleep strands the device awake and
//! drains the battery.

use heapless::Vec;

use crate::clock::{DutyClock, Timestamp};
use crate::engine::{DecisionEngine, RemoteSource, TargetOrigin, WakeVerdict};
use crate::escalate::{self, Alert, FailureClass};
use crate::sequence::{
    self, PowerSwitch, RenderChannel, SequenceReport, StepOutcome,
};
use crate::store::{SlotStore, StorageMedium};
use crate::telemetry::{CycleEvent, CycleLog};

/// Network association and wall-clock synchronization.
///
/// Clock sync failures are tolerated: the cycle proceeds on the device's
/// last known time base.
pub trait NetworkLink {
    type Error;

    /// Associates with the configured network.
    fn bring_up(&mut self) -> Result<(), Self::Error>;

    /// Synchronizes the device wall clock from a remote reference.
    fn sync_clock(&mut self) -> Result<(), Self::Error>;
}

/// Everything one wake cycle observed and did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CycleReport {
    pub woke_at: Timestamp,
    pub mount_ok: bool,
    pub link_ok: bool,
    pub clock_synced: bool,
    pub origin: TargetOrigin,
    pub verdict: WakeVerdict,
    pub sequence: Option<SequenceReport>,
    pub alerts: Vec<Alert, 2>,
}

/// The controller process: one of these owns the hardware for the whole
/// run. Fields are public so each target can assemble it from its own
/// peripheral set.
pub struct WakeController<C, S, M, L, R, P, W> {
    pub engine: DecisionEngine,
    pub clock: C,
    pub store: S,
    pub media: M,
    pub link: L,
    pub remote: R,
    pub power: P,
    pub printer: W,
}

impl<C, S, M, L, R, P, W> WakeController<C, S, M, L, R, P, W>
where
    C: DutyClock,
    S: SlotStore,
    M: StorageMedium,
    L: NetworkLink,
    R: RemoteSource,
    P: PowerSwitch,
    W: RenderChannel,
{
    /// Runs one complete wake cycle and reports what happened.
    ///
    /// Infallible on purpose: every component failure is folded into the
    /// report so the caller always reaches its sleep call.
    pub fn run_cycle(&mut self, log: &mut CycleLog) -> CycleReport {
        let woke_at = self.clock.now();
        log.record(woke_at, CycleEvent::Woke);

        let mut alerts = Vec::new();

        let mount_ok = self.media.mount().is_ok();
        if mount_ok {
            log.record(woke_at, CycleEvent::MountOk);
            escalate::note_success(&mut self.store, FailureClass::StorageMount);
        } else {
            log.record(woke_at, CycleEvent::MountFailed);
            self.escalate(FailureClass::StorageMount, &mut alerts, log, woke_at);
        }

        let link_ok = self.link.bring_up().is_ok();
        if link_ok {
            log.record(woke_at, CycleEvent::LinkOk);
            escalate::note_success(&mut self.store, FailureClass::NetworkLink);
        } else {
            log.record(woke_at, CycleEvent::LinkFailed);
            self.escalate(FailureClass::NetworkLink, &mut alerts, log, woke_at);
        }

        // A failed sync skews the alarm comparison but never stops the
        // cycle; the device keeps its last known time base.
        let clock_synced = link_ok && self.link.sync_clock().is_ok();
        if clock_synced {
            log.record(woke_at, CycleEvent::ClockSynced);
        } else {
            log.record(woke_at, CycleEvent::ClockSyncFailed);
        }

        let (effective, origin) = self
            .engine
            .resolve_target(&mut self.remote, &mut self.store);
        log.record(woke_at, CycleEvent::TargetResolved(origin));

        let verdict = self.engine.decide(&mut self.clock, effective);
        log.record(woke_at, CycleEvent::Verdict(verdict));

        let sequence = verdict.is_fire().then(|| {
            let report = sequence::run_alarm_sequence(
                &mut self.clock,
                &mut self.store,
                &mut self.media,
                &mut self.remote,
                &mut self.power,
                &mut self.printer,
            );
            for outcome in [report.power_on, report.strip, report.menu, report.power_off] {
                match outcome {
                    StepOutcome::Failed(fault) => {
                        log.record(woke_at, CycleEvent::StepFailed(fault));
                    }
                    StepOutcome::Skipped(reason) => {
                        log.record(woke_at, CycleEvent::StepSkipped(reason));
                    }
                    StepOutcome::Completed => {}
                }
            }
            report
        });

        CycleReport {
            woke_at,
            mount_ok,
            link_ok,
            clock_synced,
            origin,
            verdict,
            sequence,
            alerts,
        }
    }

    /// Records the sleep interval and suspends until the next wake.
    pub fn sleep(&mut self, log: &mut CycleLog) -> ! {
        let schedule = self.engine.schedule();
        log.record(
            self.clock.now(),
            CycleEvent::SleepArmed(schedule.interval_seconds()),
        );
        self.clock.deep_sleep(schedule.interval())
    }

    /// Runs the cycle and immediately sleeps: the shape of one firmware
    /// boot, since waking from deep sleep restarts the program.
    pub fn run(&mut self, log: &mut CycleLog) -> ! {
        let _report = self.run_cycle(log);
        self.sleep(log)
    }

    fn escalate(
        &mut self,
        class: FailureClass,
        alerts: &mut Vec<Alert, 2>,
        log: &mut CycleLog,
        at: Timestamp,
    ) {
        let Some(alert) = escalate::note_failure(&mut self.store, class) else {
            return;
        };
        // Alert printing is itself best effort; a failure here is logged
        // and never escalates further.
        let outcome = sequence::run_alert_sequence(
            &mut self.clock,
            &mut self.power,
            &mut self.printer,
            alert.text,
        );
        match outcome {
            StepOutcome::Failed(fault) => log.record(at, CycleEvent::StepFailed(fault)),
            _ => log.record(at, CycleEvent::AlertPrinted(class)),
        }
        let _ = alerts.push(alert);
    }
}
