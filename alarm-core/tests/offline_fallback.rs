use core::time::Duration;

use alarm_core::clock::{DutyClock, Timestamp, WakeSchedule};
use alarm_core::controller::{NetworkLink, WakeController};
use alarm_core::engine::{DecisionEngine, IdleReason, RemoteSource, TargetOrigin, WakeVerdict};
use alarm_core::escalate::FailureClass;
use alarm_core::sequence::{Justify, PowerSwitch, RenderChannel, TextSize};
use alarm_core::store::{SlotId, SlotStore, StorageMedium};
use alarm_core::telemetry::CycleLog;
use alarm_core::wire::{AlarmBody, MenuBody};

#[test]
fn cached_target_fires_when_the_fetch_fails() {
    let mut controller = build_controller(1_700_000_000);
    controller.remote.serves_alarm = false;
    controller.store.slots[SlotId::AlarmTime.as_index()] = Some(1_700_000_300);
    let mut cycle_log = CycleLog::new();

    let report = controller.run_cycle(&mut cycle_log);

    assert_eq!(report.origin, TargetOrigin::Cached);
    assert_eq!(
        report.verdict,
        WakeVerdict::Fire {
            target: Timestamp::from_unix_seconds(1_700_000_300),
            aligned_for: 299,
        }
    );
    assert!(
        report.sequence.is_some(),
        "a cache-driven fire runs the full sequence"
    );
}

#[test]
fn first_boot_without_cache_stays_unarmed() {
    let mut controller = build_controller(1_700_000_000);
    controller.remote.serves_alarm = false;
    let mut cycle_log = CycleLog::new();

    let report = controller.run_cycle(&mut cycle_log);

    assert_eq!(report.origin, TargetOrigin::Default);
    assert_eq!(report.verdict, WakeVerdict::Idle(IdleReason::Unarmed));
    assert_eq!(
        controller.power.on_count, 0,
        "an unarmed cycle leaves the peripheral untouched"
    );
}

#[test]
fn cache_survives_failed_fetch_unchanged() {
    let mut controller = build_controller(1_700_000_000);
    controller.remote.serves_alarm = false;
    controller.store.slots[SlotId::AlarmTime.as_index()] = Some(1_900_000_000);
    let mut cycle_log = CycleLog::new();

    controller.run_cycle(&mut cycle_log);

    assert_eq!(
        controller.store.slots[SlotId::AlarmTime.as_index()],
        Some(1_900_000_000),
        "fallbacks read the cache, they never overwrite it"
    );
}

#[test]
fn link_failures_escalate_exactly_at_the_threshold() {
    let mut controller = build_controller(1_700_000_000);
    controller.remote.serves_alarm = false;
    controller.link.up = false;
    controller.store.slots[SlotId::LinkFailures.as_index()] = Some(48);

    let mut cycle_log = CycleLog::new();
    let before = controller.run_cycle(&mut cycle_log);
    assert!(before.alerts.is_empty(), "failure 49 is below the threshold");

    let crossing = controller.run_cycle(&mut cycle_log);
    assert_eq!(
        crossing.alerts.first().map(|alert| alert.class),
        Some(FailureClass::NetworkLink),
        "failure 50 crosses the threshold"
    );
    assert_eq!(controller.printer.alert_lines, 1);

    let after = controller.run_cycle(&mut cycle_log);
    assert!(after.alerts.is_empty(), "failure 51 must not repeat the alert");
    assert_eq!(
        controller.printer.alert_lines, 1,
        "one streak prints exactly one alert"
    );
}

#[test]
fn clock_sync_failure_degrades_but_never_aborts() {
    let mut controller = build_controller(1_700_000_000);
    controller.link.sync_works = false;
    controller.remote.serves_alarm = true;
    let mut cycle_log = CycleLog::new();

    let report = controller.run_cycle(&mut cycle_log);

    assert!(report.link_ok);
    assert!(!report.clock_synced);
    assert_eq!(
        report.origin,
        TargetOrigin::Live,
        "fetches proceed on the stale time base"
    );
    assert_eq!(
        controller.store.slots[SlotId::LinkFailures.as_index()],
        Some(0),
        "sync trouble is not an association failure"
    );
}

type Rig = WakeController<
    MockClock,
    MockStore,
    MockMedia,
    MockLink,
    MockRemote,
    MockRelay,
    MockPrinter,
>;

fn build_controller(now: u32) -> Rig {
    WakeController {
        engine: DecisionEngine::new(WakeSchedule::DEFAULT),
        clock: MockClock { now },
        store: MockStore { slots: [None; 4] },
        media: MockMedia,
        link: MockLink {
            up: true,
            sync_works: true,
        },
        remote: MockRemote { serves_alarm: true },
        power: MockRelay { on_count: 0 },
        printer: MockPrinter { alert_lines: 0 },
    }
}

struct MockClock {
    now: u32,
}

impl DutyClock for MockClock {
    fn now(&mut self) -> Timestamp {
        Timestamp::from_unix_seconds(self.now)
    }

    fn pause(&mut self, duration: Duration) {
        self.now += u32::try_from(duration.as_secs()).expect("test pauses are short");
    }

    fn deep_sleep(&mut self, _interval: Duration) -> ! {
        unreachable!("scenario tests drive cycles directly");
    }
}

struct MockStore {
    slots: [Option<u32>; 4],
}

impl SlotStore for MockStore {
    type Error = ();

    fn read(&mut self, slot: SlotId) -> Result<Option<u32>, ()> {
        Ok(self.slots[slot.as_index()])
    }

    fn write(&mut self, slot: SlotId, value: u32) -> Result<(), ()> {
        self.slots[slot.as_index()] = Some(value);
        Ok(())
    }
}

struct MockMedia;

impl StorageMedium for MockMedia {
    type Error = ();

    fn mount(&mut self) -> Result<(), ()> {
        Ok(())
    }

    fn strip_count(&mut self) -> Result<u32, ()> {
        Ok(3)
    }
}

struct MockLink {
    up: bool,
    sync_works: bool,
}

impl NetworkLink for MockLink {
    type Error = ();

    fn bring_up(&mut self) -> Result<(), ()> {
        if self.up { Ok(()) } else { Err(()) }
    }

    fn sync_clock(&mut self) -> Result<(), ()> {
        if self.sync_works { Ok(()) } else { Err(()) }
    }
}

struct MockRemote {
    serves_alarm: bool,
}

impl RemoteSource for MockRemote {
    type Error = ();

    fn fetch_alarm(&mut self, body: &mut AlarmBody) -> Result<(), ()> {
        if !self.serves_alarm {
            return Err(());
        }
        body.clear();
        body.extend_from_slice(br#"{"time": 1800000000, "active": true}"#)
            .map_err(|_| ())
    }

    fn fetch_menu(&mut self, _body: &mut MenuBody) -> Result<(), ()> {
        Err(())
    }
}

struct MockRelay {
    on_count: u32,
}

impl PowerSwitch for MockRelay {
    type Error = ();

    fn power_on(&mut self) -> Result<(), ()> {
        self.on_count += 1;
        Ok(())
    }

    fn power_off(&mut self) -> Result<(), ()> {
        Ok(())
    }
}

struct MockPrinter {
    alert_lines: u32,
}

impl RenderChannel for MockPrinter {
    type Error = ();

    fn write_text(&mut self, text: &str) -> Result<(), ()> {
        if text.ends_with('!') {
            self.alert_lines += 1;
        }
        Ok(())
    }

    fn newline(&mut self) -> Result<(), ()> {
        Ok(())
    }

    fn set_underline(&mut self, _on: bool) -> Result<(), ()> {
        Ok(())
    }

    fn set_justify(&mut self, _justify: Justify) -> Result<(), ()> {
        Ok(())
    }

    fn set_size(&mut self, _size: TextSize) -> Result<(), ()> {
        Ok(())
    }

    fn feed(&mut self, _lines: u8) -> Result<(), ()> {
        Ok(())
    }

    fn print_strip(&mut self, _index: u32) -> Result<(), ()> {
        Ok(())
    }
}
