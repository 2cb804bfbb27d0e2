use core::cell::RefCell;
use core::time::Duration;

use alarm_core::clock::{DutyClock, Timestamp, WakeSchedule};
use alarm_core::controller::{NetworkLink, WakeController};
use alarm_core::engine::{DecisionEngine, RemoteSource, TargetOrigin, WakeVerdict};
use alarm_core::sequence::{Justify, PowerSwitch, RenderChannel, StepOutcome, TextSize};
use alarm_core::store::{SlotId, SlotStore, StorageMedium};
use alarm_core::telemetry::CycleLog;
use alarm_core::wire::{AlarmBody, MenuBody};
use heapless::Vec as HeaplessVec;

#[test]
fn alarm_fires_in_the_qualifying_window_and_aligns() {
    let log = OpLog::new();
    let mut controller = build_controller(&log, 1_700_000_000);
    controller.remote.alarm = Some(br#"{"time": 1700000300, "active": true}"#);
    let mut cycle_log = CycleLog::new();

    let report = controller.run_cycle(&mut cycle_log);

    assert_eq!(report.origin, TargetOrigin::Live);
    let WakeVerdict::Fire {
        target,
        aligned_for,
    } = report.verdict
    else {
        panic!("expected a firing verdict, got {:?}", report.verdict);
    };
    assert_eq!(target, Timestamp::from_unix_seconds(1_700_000_300));
    assert_eq!(
        aligned_for, 299,
        "alignment should poll once per second until one second remains"
    );

    let sequence = report.sequence.expect("firing cycle must run the sequence");
    assert!(sequence.is_clean());
}

#[test]
fn cursor_commits_to_storage_before_any_ink() {
    let log = OpLog::new();
    let mut controller = build_controller(&log, 1_700_000_000);
    controller.remote.alarm = Some(br#"{"time": 1700000060, "active": true}"#);
    controller.store.cursor = Some(2);
    let mut cycle_log = CycleLog::new();

    controller.run_cycle(&mut cycle_log);

    let ops = log.take();
    let committed = position(&ops, &Op::Committed(3));
    let rendered = position(&ops, &Op::Strip(3));
    assert!(
        committed < rendered,
        "the advanced index must be durable before the strip renders"
    );
}

#[test]
fn sequence_orders_power_strip_menu_release() {
    let log = OpLog::new();
    let mut controller = build_controller(&log, 1_700_000_000);
    controller.remote.alarm = Some(br#"{"time": 1700000010, "active": true}"#);
    controller.remote.menu = Some("#Suppe:\nTomatensuppe\n".as_bytes());
    let mut cycle_log = CycleLog::new();

    let report = controller.run_cycle(&mut cycle_log);
    assert_eq!(
        report.sequence.map(|sequence| sequence.menu),
        Some(StepOutcome::Completed)
    );

    let ops = log.take();
    let powered = position(&ops, &Op::PowerOn);
    let warmed = position(&ops, &Op::Pause(3));
    let strip = position(&ops, &Op::Strip(0));
    let banner = position(&ops, &text("Heute"));
    let heading = position(&ops, &text("Suppe:"));
    let released = position(&ops, &Op::PowerOff);

    assert!(powered < warmed, "warm-up belongs right after power-on");
    assert!(warmed < strip, "the strip may only print after the warm-up");
    assert!(strip < banner, "the menu banner follows the strip block");
    assert!(banner < heading);
    assert_eq!(
        released,
        ops.len() - 1,
        "dropping peripheral power is always the final action"
    );
}

#[test]
fn successful_fetch_refreshes_the_fallback_cache() {
    let log = OpLog::new();
    let mut controller = build_controller(&log, 1_700_000_000);
    controller.remote.alarm = Some(br#"{"time": 1700086400, "active": true}"#);
    let mut cycle_log = CycleLog::new();

    let report = controller.run_cycle(&mut cycle_log);

    assert!(
        !report.verdict.is_fire(),
        "a target a day out is beyond this wake's window"
    );
    assert_eq!(
        controller.store.slots[SlotId::AlarmTime.as_index()],
        Some(1_700_086_400),
        "every successful fetch overwrites the cache"
    );
}

#[test]
fn inactive_alarm_never_spins_nor_fires() {
    let log = OpLog::new();
    let mut controller = build_controller(&log, 1_700_000_000);
    controller.remote.alarm = Some(br#"{"time": 1700000100, "active": false}"#);
    let mut cycle_log = CycleLog::new();

    let report = controller.run_cycle(&mut cycle_log);

    assert!(!report.verdict.is_fire());
    assert_eq!(
        controller.clock.now,
        1_700_000_000,
        "an unarmed cycle must not burn time polling"
    );
    assert!(log.take().is_empty(), "no peripheral may be touched");
    assert_eq!(
        controller.store.slots[SlotId::AlarmTime.as_index()],
        Some(0),
        "an inactive alarm caches the never sentinel"
    );
}

fn position(ops: &[Op], needle: &Op) -> usize {
    ops.iter()
        .position(|op| op == needle)
        .unwrap_or_else(|| panic!("expected {needle:?} in {ops:?}"))
}

fn text(value: &str) -> Op {
    let mut copy = heapless::String::new();
    copy.push_str(value).expect("test text fits the op buffer");
    Op::Text(copy)
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Op {
    PowerOn,
    PowerOff,
    Pause(u64),
    Committed(u32),
    Strip(u32),
    Text(heapless::String<64>),
}

struct OpLog {
    ops: RefCell<HeaplessVec<Op, 64>>,
}

impl OpLog {
    fn new() -> Self {
        Self {
            ops: RefCell::new(HeaplessVec::new()),
        }
    }

    fn push(&self, op: Op) {
        self.ops.borrow_mut().push(op).expect("op log overflow");
    }

    fn take(&self) -> HeaplessVec<Op, 64> {
        core::mem::take(&mut *self.ops.borrow_mut())
    }
}

type Rig<'a> = WakeController<
    MockClock<'a>,
    MockStore<'a>,
    MockMedia,
    MockLink,
    MockRemote,
    MockRelay<'a>,
    MockPrinter<'a>,
>;

fn build_controller(log: &OpLog, now: u32) -> Rig<'_> {
    WakeController {
        engine: DecisionEngine::new(WakeSchedule::DEFAULT),
        clock: MockClock { log, now },
        store: MockStore {
            log,
            slots: [None; 4],
            cursor: None,
        },
        media: MockMedia { strips: 5 },
        link: MockLink,
        remote: MockRemote {
            alarm: None,
            menu: None,
        },
        power: MockRelay { log },
        printer: MockPrinter { log },
    }
}

struct MockClock<'a> {
    log: &'a OpLog,
    now: u32,
}

impl DutyClock for MockClock<'_> {
    fn now(&mut self) -> Timestamp {
        Timestamp::from_unix_seconds(self.now)
    }

    fn pause(&mut self, duration: Duration) {
        let seconds = u32::try_from(duration.as_secs()).expect("test pauses are short");
        self.now += seconds;
        // The one-second alignment polls would swamp the op log.
        if seconds > 1 {
            self.log.push(Op::Pause(duration.as_secs()));
        }
    }

    fn deep_sleep(&mut self, _interval: Duration) -> ! {
        unreachable!("scenario tests drive cycles directly");
    }
}

struct MockStore<'a> {
    log: &'a OpLog,
    slots: [Option<u32>; 4],
    cursor: Option<u32>,
}

impl SlotStore for MockStore<'_> {
    type Error = ();

    fn read(&mut self, slot: SlotId) -> Result<Option<u32>, ()> {
        if slot == SlotId::StripIndex {
            return Ok(self.cursor);
        }
        Ok(self.slots[slot.as_index()])
    }

    fn write(&mut self, slot: SlotId, value: u32) -> Result<(), ()> {
        if slot == SlotId::StripIndex {
            self.log.push(Op::Committed(value));
            self.cursor = Some(value);
            return Ok(());
        }
        self.slots[slot.as_index()] = Some(value);
        Ok(())
    }
}

struct MockMedia {
    strips: u32,
}

impl StorageMedium for MockMedia {
    type Error = ();

    fn mount(&mut self) -> Result<(), ()> {
        Ok(())
    }

    fn strip_count(&mut self) -> Result<u32, ()> {
        Ok(self.strips)
    }
}

struct MockLink;

impl NetworkLink for MockLink {
    type Error = ();

    fn bring_up(&mut self) -> Result<(), ()> {
        Ok(())
    }

    fn sync_clock(&mut self) -> Result<(), ()> {
        Ok(())
    }
}

struct MockRemote {
    alarm: Option<&'static [u8]>,
    menu: Option<&'static [u8]>,
}

impl RemoteSource for MockRemote {
    type Error = ();

    fn fetch_alarm(&mut self, body: &mut AlarmBody) -> Result<(), ()> {
        let bytes = self.alarm.ok_or(())?;
        body.clear();
        body.extend_from_slice(bytes).map_err(|_| ())
    }

    fn fetch_menu(&mut self, body: &mut MenuBody) -> Result<(), ()> {
        let bytes = self.menu.ok_or(())?;
        body.clear();
        body.extend_from_slice(bytes).map_err(|_| ())
    }
}

struct MockRelay<'a> {
    log: &'a OpLog,
}

impl PowerSwitch for MockRelay<'_> {
    type Error = ();

    fn power_on(&mut self) -> Result<(), ()> {
        self.log.push(Op::PowerOn);
        Ok(())
    }

    fn power_off(&mut self) -> Result<(), ()> {
        self.log.push(Op::PowerOff);
        Ok(())
    }
}

struct MockPrinter<'a> {
    log: &'a OpLog,
}

impl RenderChannel for MockPrinter<'_> {
    type Error = ();

    fn write_text(&mut self, value: &str) -> Result<(), ()> {
        self.log.push(text(value));
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

    fn print_strip(&mut self, index: u32) -> Result<(), ()> {
        self.log.push(Op::Strip(index));
        Ok(())
    }
}
