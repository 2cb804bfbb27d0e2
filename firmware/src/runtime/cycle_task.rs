use defmt::{info, warn, Display2Format};

use alarm_core::controller::{CycleReport, WakeController};
use alarm_core::telemetry::CycleLog;

use crate::hw::clock::RtcClock;
use crate::hw::printer::ThermalPrinter;
use crate::hw::relay::Relay;
use crate::hw::slots::BackupSlots;
use crate::hw::strips::StripMedium;
use crate::net::{LinkHandle, RemoteHandle};
use crate::status::{self, CyclePhase};

pub type FirmwareController = WakeController<
    RtcClock,
    BackupSlots,
    StripMedium,
    LinkHandle,
    RemoteHandle,
    Relay,
    ThermalPrinter,
>;

/// One boot runs one cycle: standby wakeups restart the program, so the
/// task never loops.
#[embassy_executor::task]
pub async fn run(mut controller: FirmwareController, log: &'static mut CycleLog) -> ! {
    let report = controller.run_cycle(log);
    for _ in &report.alerts {
        status::record_alert();
    }
    log_report(&report);
    drain(log);

    status::record_phase(CyclePhase::Retiring);
    controller.sleep(log)
}

fn log_report(report: &CycleReport) {
    info!(
        "cycle at {=u32}: mount={=bool} link={=bool} synced={=bool}",
        report.woke_at.as_unix_seconds(),
        report.mount_ok,
        report.link_ok,
        report.clock_synced,
    );
    info!(
        "target from {}, verdict: {}",
        Display2Format(&report.origin),
        Display2Format(&report.verdict),
    );
    for alert in &report.alerts {
        warn!("alert raised: {}", Display2Format(&alert.class));
    }
    if let Some(sequence) = &report.sequence {
        if !sequence.is_clean() {
            warn!(
                "sequence degraded: power-on {} strip {} menu {} power-off {}",
                Display2Format(&sequence.power_on),
                Display2Format(&sequence.strip),
                Display2Format(&sequence.menu),
                Display2Format(&sequence.power_off),
            );
        }
    }
}

fn drain(log: &CycleLog) {
    for record in log.oldest_first() {
        info!(
            "[{=u32}] {}",
            record.at.as_unix_seconds(),
            Display2Format(&record.event),
        );
    }
}
