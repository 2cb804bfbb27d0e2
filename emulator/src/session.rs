use std::cell::RefCell;
use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use alarm_core::clock::{DutyClock, Timestamp, WakeSchedule};
use alarm_core::controller::{CycleReport, NetworkLink, WakeController};
use alarm_core::engine::{DecisionEngine, RemoteSource};
use alarm_core::sequence::{Justify, PowerSwitch, RenderChannel, TextSize};
use alarm_core::store::{SlotId, SlotStore, StorageMedium};
use alarm_core::telemetry::CycleLog;
use alarm_core::wire::{AlarmBody, MenuBody};
use crossterm::style::Stylize;

/// Simulated wall-clock time at boot.
const SIM_BOOT_SECONDS: u32 = 1_700_000_000;

/// Character cells across the simulated paper roll.
const PAPER_COLUMNS: usize = 32;

pub const HELP_TOPICS: &[(&str, &str)] = &[
    (
        "cycle",
        "cycle [n]                 - run n wake cycles (default 1)",
    ),
    (
        "arm",
        "arm <+secs|unix> [off]    - publish an alarm target (off = inactive)",
    ),
    (
        "disarm",
        "disarm                    - publish an inactive alarm",
    ),
    (
        "net",
        "net <up|down>             - toggle the network link and endpoints",
    ),
    (
        "sd",
        "sd <ok|fail>              - toggle the strip medium mount",
    ),
    (
        "strips",
        "strips <n>                - set the number of strips on the medium",
    ),
    (
        "menu",
        "menu <category> <title..> - append a menu item; `menu clear` empties",
    ),
    (
        "status",
        "status                    - show clock, endpoints, and slot files",
    ),
    (
        "log",
        "log                       - dump the telemetry ring",
    ),
    (
        "help",
        "help [topic]              - show help for a command",
    ),
];

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ScenarioProfile {
    /// Healthy device, alarm five minutes out.
    Morning,
    /// Network down, fallback cache pre-seeded.
    Offline,
    /// Strip medium refusing to mount.
    Faults,
}

impl ScenarioProfile {
    pub fn tag(self) -> &'static str {
        match self {
            ScenarioProfile::Morning => "morning",
            ScenarioProfile::Offline => "offline",
            ScenarioProfile::Faults => "faults",
        }
    }

    pub fn log_path(self) -> PathBuf {
        PathBuf::from(format!("transcripts/emulator-{}.log", self.tag()))
    }

    pub fn slot_dir(self) -> PathBuf {
        PathBuf::from(format!("transcripts/{}-slots", self.tag()))
    }

    pub fn header(self) -> &'static str {
        match self {
            ScenarioProfile::Morning => "Alarm emulator morning transcript",
            ScenarioProfile::Offline => "Alarm emulator offline-fallback transcript",
            ScenarioProfile::Faults => "Alarm emulator storage-fault transcript",
        }
    }

    pub fn from_tag(tag: &str) -> Result<Self, String> {
        if tag.eq_ignore_ascii_case("morning") {
            Ok(Self::Morning)
        } else if tag.eq_ignore_ascii_case("offline") {
            Ok(Self::Offline)
        } else if tag.eq_ignore_ascii_case("faults") {
            Ok(Self::Faults)
        } else {
            Err(format!("Unknown scenario profile `{tag}`"))
        }
    }
}

/// Collaborator failure marker; the controller absorbs it either way.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SimFault;

/// Simulated duty clock; pauses advance simulated time instantly.
pub struct SimClock {
    now: u32,
}

impl SimClock {
    fn advance(&mut self, seconds: u32) {
        self.now = self.now.saturating_add(seconds);
    }
}

impl DutyClock for SimClock {
    fn now(&mut self) -> Timestamp {
        Timestamp::from_unix_seconds(self.now)
    }

    fn pause(&mut self, duration: Duration) {
        self.advance(u32::try_from(duration.as_secs()).unwrap_or(u32::MAX));
    }

    fn deep_sleep(&mut self, _interval: Duration) -> ! {
        panic!("the emulator advances cycles explicitly; deep sleep is never reached");
    }
}

/// One decimal text file per slot, the layout the original device kept on
/// its SD card.
pub struct FileSlots {
    dir: PathBuf,
}

impl FileSlots {
    fn path(&self, slot: SlotId) -> PathBuf {
        self.dir.join(format!("{}.txt", slot.as_str()))
    }
}

impl SlotStore for FileSlots {
    type Error = io::Error;

    fn read(&mut self, slot: SlotId) -> Result<Option<u32>, io::Error> {
        match fs::read_to_string(self.path(slot)) {
            Ok(text) => text
                .trim()
                .parse()
                .map(Some)
                .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn write(&mut self, slot: SlotId, value: u32) -> Result<(), io::Error> {
        fs::write(self.path(slot), format!("{value}\n"))
    }
}

pub struct SimMedium {
    pub mountable: bool,
    pub strips: u32,
}

impl StorageMedium for SimMedium {
    type Error = SimFault;

    fn mount(&mut self) -> Result<(), SimFault> {
        if self.mountable { Ok(()) } else { Err(SimFault) }
    }

    fn strip_count(&mut self) -> Result<u32, SimFault> {
        if self.mountable {
            Ok(self.strips)
        } else {
            Err(SimFault)
        }
    }
}

pub struct SimLink {
    pub up: bool,
}

impl NetworkLink for SimLink {
    type Error = SimFault;

    fn bring_up(&mut self) -> Result<(), SimFault> {
        if self.up { Ok(()) } else { Err(SimFault) }
    }

    fn sync_clock(&mut self) -> Result<(), SimFault> {
        if self.up { Ok(()) } else { Err(SimFault) }
    }
}

pub struct SimRemote {
    pub reachable: bool,
    pub armed: Option<(u32, bool)>,
    pub menu: String,
}

impl RemoteSource for SimRemote {
    type Error = SimFault;

    fn fetch_alarm(&mut self, body: &mut AlarmBody) -> Result<(), SimFault> {
        if !self.reachable {
            return Err(SimFault);
        }
        let (time, active) = self.armed.ok_or(SimFault)?;
        let json = format!(r#"{{"time": {time}, "active": {active}}}"#);
        body.clear();
        body.extend_from_slice(json.as_bytes()).map_err(|_| SimFault)
    }

    fn fetch_menu(&mut self, body: &mut MenuBody) -> Result<(), SimFault> {
        if !self.reachable {
            return Err(SimFault);
        }
        body.clear();
        body.extend_from_slice(self.menu.as_bytes())
            .map_err(|_| SimFault)
    }
}

/// Shared paper roll; the relay and the printer both leave marks on it so
/// their relative order stays visible in the transcript.
pub struct Paper {
    lines: Vec<String>,
    current_styled: String,
    current_width: usize,
    current_justify: Justify,
}

impl Paper {
    fn new() -> Self {
        Self {
            lines: Vec::new(),
            current_styled: String::new(),
            current_width: 0,
            current_justify: Justify::Left,
        }
    }

    fn push_marker(&mut self, marker: &str) {
        self.lines.push(marker.dim().to_string());
    }

    fn break_line(&mut self) {
        let mut line = std::mem::take(&mut self.current_styled);
        if self.current_justify == Justify::Center && self.current_width < PAPER_COLUMNS {
            let pad = (PAPER_COLUMNS - self.current_width) / 2;
            line.insert_str(0, &" ".repeat(pad));
        }
        self.lines.push(line);
        self.current_width = 0;
    }

    fn drain(&mut self) -> Vec<String> {
        std::mem::take(&mut self.lines)
    }
}

pub struct SimRelay {
    paper: Rc<RefCell<Paper>>,
    pub fail_power_on: bool,
    pub power_cycles: u32,
}

impl PowerSwitch for SimRelay {
    type Error = SimFault;

    fn power_on(&mut self) -> Result<(), SimFault> {
        if self.fail_power_on {
            return Err(SimFault);
        }
        self.power_cycles += 1;
        self.paper.borrow_mut().push_marker("-- printer power on --");
        Ok(())
    }

    fn power_off(&mut self) -> Result<(), SimFault> {
        self.paper
            .borrow_mut()
            .push_marker("-- printer power off --");
        Ok(())
    }
}

/// Renders the printer byte stream as styled terminal text: underline for
/// the emphasis toggle, bold for the large character size.
pub struct TermPrinter {
    paper: Rc<RefCell<Paper>>,
    underline: bool,
    size: TextSize,
}

impl RenderChannel for TermPrinter {
    type Error = SimFault;

    fn write_text(&mut self, text: &str) -> Result<(), SimFault> {
        let mut styled = text.stylize();
        if self.underline {
            styled = styled.underlined();
        }
        if self.size == TextSize::Large {
            styled = styled.bold();
        }
        let mut paper = self.paper.borrow_mut();
        paper.current_styled.push_str(&styled.to_string());
        paper.current_width += text.chars().count();
        Ok(())
    }

    fn newline(&mut self) -> Result<(), SimFault> {
        self.paper.borrow_mut().break_line();
        Ok(())
    }

    fn set_underline(&mut self, on: bool) -> Result<(), SimFault> {
        self.underline = on;
        Ok(())
    }

    fn set_justify(&mut self, justify: Justify) -> Result<(), SimFault> {
        self.paper.borrow_mut().current_justify = justify;
        Ok(())
    }

    fn set_size(&mut self, size: TextSize) -> Result<(), SimFault> {
        self.size = size;
        Ok(())
    }

    fn feed(&mut self, lines: u8) -> Result<(), SimFault> {
        let mut paper = self.paper.borrow_mut();
        for _ in 0..lines {
            paper.lines.push(String::new());
        }
        Ok(())
    }

    fn print_strip(&mut self, index: u32) -> Result<(), SimFault> {
        self.paper
            .borrow_mut()
            .lines
            .push(format!("<< comic strip #{index} >>").reverse().to_string());
        Ok(())
    }
}

type SimController =
    WakeController<SimClock, FileSlots, SimMedium, SimLink, SimRemote, SimRelay, TermPrinter>;

pub struct Session {
    controller: SimController,
    paper: Rc<RefCell<Paper>>,
    log: CycleLog,
    transcript: TranscriptLogger,
    cycles_run: u32,
}

impl Session {
    pub fn new(profile: ScenarioProfile) -> io::Result<Self> {
        let slot_dir = profile.slot_dir();
        if slot_dir.exists() {
            fs::remove_dir_all(&slot_dir)?;
        }
        fs::create_dir_all(&slot_dir)?;

        let paper = Rc::new(RefCell::new(Paper::new()));
        let mut controller = WakeController {
            engine: DecisionEngine::new(WakeSchedule::DEFAULT),
            clock: SimClock {
                now: SIM_BOOT_SECONDS,
            },
            store: FileSlots { dir: slot_dir },
            media: SimMedium {
                mountable: true,
                strips: 5,
            },
            link: SimLink { up: true },
            remote: SimRemote {
                reachable: true,
                armed: None,
                menu: String::new(),
            },
            power: SimRelay {
                paper: Rc::clone(&paper),
                fail_power_on: false,
                power_cycles: 0,
            },
            printer: TermPrinter {
                paper: Rc::clone(&paper),
                underline: false,
                size: TextSize::Small,
            },
        };

        match profile {
            ScenarioProfile::Morning => {
                controller.remote.armed = Some((SIM_BOOT_SECONDS + 300, true));
                controller.remote.menu =
                    "#Suppe:\nTomatensuppe\n#Hauptgericht:\nSchnitzel mit Pommes\n".to_string();
            }
            ScenarioProfile::Offline => {
                controller.link.up = false;
                controller.remote.reachable = false;
                controller
                    .store
                    .write(SlotId::AlarmTime, SIM_BOOT_SECONDS + 300)?;
            }
            ScenarioProfile::Faults => {
                controller.media.mountable = false;
                controller.remote.armed = Some((0, false));
            }
        }

        Ok(Self {
            controller,
            paper,
            log: CycleLog::new(),
            transcript: TranscriptLogger::new(profile)?,
            cycles_run: 0,
        })
    }

    pub fn handle_command(&mut self, line: &str) -> io::Result<Vec<String>> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }

        let elapsed = self.elapsed();
        self.transcript
            .append_line(elapsed, TranscriptRole::User, trimmed)?;

        let mut parts = trimmed.split_whitespace();
        let lines = match parts.next() {
            Some("help") => self.handle_help(parts.next()),
            Some("status") => self.handle_status(),
            Some("log") => self.handle_log(),
            Some("cycle") => {
                let count = match parts.next().map(str::parse::<u32>) {
                    None => 1,
                    Some(Ok(count)) if count >= 1 => count,
                    _ => return self.reply(elapsed, vec!["ERR usage: cycle [n]".to_string()]),
                };
                self.handle_cycles(count)
            }
            Some("arm") => self.handle_arm(parts.next(), parts.next()),
            Some("disarm") => {
                self.controller.remote.armed = Some((0, false));
                vec!["alarm endpoint now publishes an inactive target".to_string()]
            }
            Some("net") => match parts.next() {
                Some("up") => {
                    self.controller.link.up = true;
                    self.controller.remote.reachable = true;
                    vec!["network link and endpoints up".to_string()]
                }
                Some("down") => {
                    self.controller.link.up = false;
                    self.controller.remote.reachable = false;
                    vec!["network link and endpoints down".to_string()]
                }
                _ => vec!["ERR usage: net <up|down>".to_string()],
            },
            Some("sd") => match parts.next() {
                Some("ok") => {
                    self.controller.media.mountable = true;
                    vec!["strip medium mounts cleanly".to_string()]
                }
                Some("fail") => {
                    self.controller.media.mountable = false;
                    vec!["strip medium refuses to mount".to_string()]
                }
                _ => vec!["ERR usage: sd <ok|fail>".to_string()],
            },
            Some("strips") => match parts.next().map(str::parse::<u32>) {
                Some(Ok(count)) => {
                    self.controller.media.strips = count;
                    vec![format!("medium now holds {count} strips")]
                }
                _ => vec!["ERR usage: strips <n>".to_string()],
            },
            Some("menu") => self.handle_menu(trimmed),
            Some(other) => vec![format!("ERR unknown command `{other}`; try `help`")],
            None => Vec::new(),
        };

        self.reply(elapsed, lines)
    }

    fn reply(&mut self, elapsed: u32, lines: Vec<String>) -> io::Result<Vec<String>> {
        for line in &lines {
            self.transcript
                .append_line(elapsed, TranscriptRole::Emulator, line)?;
        }
        Ok(lines)
    }

    fn elapsed(&mut self) -> u32 {
        self.controller.clock.now().as_unix_seconds() - SIM_BOOT_SECONDS
    }

    fn handle_help(&self, topic: Option<&str>) -> Vec<String> {
        let mut lines = Vec::new();
        match topic {
            Some(target) if !target.is_empty() => {
                if let Some((_, detail)) = HELP_TOPICS
                    .iter()
                    .find(|(name, _)| name.eq_ignore_ascii_case(target))
                {
                    lines.push((*detail).to_string());
                } else {
                    lines.push(format!("No help available for `{target}`."));
                }
            }
            _ => {
                lines.push("Available commands:".to_string());
                for (_, detail) in HELP_TOPICS {
                    lines.push(format!("  {detail}"));
                }
            }
        }
        lines
    }

    fn handle_arm(&mut self, target: Option<&str>, flag: Option<&str>) -> Vec<String> {
        let now = self.controller.clock.now();
        let parsed = match target {
            Some(value) => {
                if let Some(offset) = value.strip_prefix('+') {
                    offset
                        .parse::<u32>()
                        .ok()
                        .map(|secs| now.plus_seconds(secs).as_unix_seconds())
                } else {
                    value.parse::<u32>().ok()
                }
            }
            None => None,
        };
        let Some(time) = parsed else {
            return vec!["ERR usage: arm <+secs|unix> [off]".to_string()];
        };
        let active = flag != Some("off");
        self.controller.remote.armed = Some((time, active));
        vec![format!(
            "alarm endpoint publishes time={time} active={active} (t+{}s)",
            time.saturating_sub(now.as_unix_seconds())
        )]
    }

    fn handle_menu(&mut self, line: &str) -> Vec<String> {
        let rest = line.trim_start_matches("menu").trim();
        if rest == "clear" {
            self.controller.remote.menu.clear();
            return vec!["menu endpoint now returns an empty body".to_string()];
        }
        let Some((category, title)) = rest.split_once(' ') else {
            return vec!["ERR usage: menu <category> <title..> | menu clear".to_string()];
        };
        self.controller
            .remote
            .menu
            .push_str(&format!("#{category}:\n{}\n", title.trim()));
        vec![format!("menu item appended under `{category}`")]
    }

    fn handle_cycles(&mut self, count: u32) -> Vec<String> {
        let mut lines = Vec::new();
        for _ in 0..count {
            self.cycles_run += 1;
            let report = self.controller.run_cycle(&mut self.log);
            lines.extend(self.describe_report(&report));

            let interval = self.controller.engine.schedule().interval_seconds();
            lines.push(format!("sleeping {interval}s"));
            self.controller.clock.advance(interval);
        }
        lines
    }

    fn describe_report(&mut self, report: &CycleReport) -> Vec<String> {
        let mut lines = Vec::new();
        lines.push(format!(
            "cycle {} at t+{}s: mount={} link={} synced={}",
            self.cycles_run,
            report.woke_at.as_unix_seconds() - SIM_BOOT_SECONDS,
            describe_outcome(report.mount_ok),
            describe_outcome(report.link_ok),
            describe_outcome(report.clock_synced),
        ));
        lines.push(format!(
            "  target from {}, verdict: {}",
            report.origin, report.verdict
        ));
        for alert in &report.alerts {
            lines.push(format!("  ALERT ({}): {}", alert.class, alert.text));
        }
        if let Some(sequence) = &report.sequence {
            lines.push(format!(
                "  sequence: power-on {} / strip {} / menu {} / power-off {}",
                sequence.power_on, sequence.strip, sequence.menu, sequence.power_off
            ));
        }
        for mark in self.paper.borrow_mut().drain() {
            lines.push(format!("  PRN | {mark}"));
        }
        lines
    }

    fn handle_status(&mut self) -> Vec<String> {
        let now = self.controller.clock.now().as_unix_seconds();
        let mut lines = Vec::new();
        lines.push(format!(
            "clock: unix {now} (t+{}s), interval {}s, window {}s",
            now - SIM_BOOT_SECONDS,
            self.controller.engine.schedule().interval_seconds(),
            self.controller.engine.schedule().window_seconds(),
        ));
        lines.push(match self.controller.remote.armed {
            Some((time, true)) => format!("alarm endpoint: time={time} active"),
            Some((_, false)) => "alarm endpoint: inactive".to_string(),
            None => "alarm endpoint: nothing published".to_string(),
        });
        lines.push(format!(
            "link: {}, endpoints: {}, medium: {} ({} strips)",
            if self.controller.link.up { "up" } else { "down" },
            if self.controller.remote.reachable {
                "reachable"
            } else {
                "unreachable"
            },
            if self.controller.media.mountable {
                "ok"
            } else {
                "failing"
            },
            self.controller.media.strips,
        ));
        for slot in SlotId::ALL {
            let value = match self.controller.store.read(slot) {
                Ok(Some(value)) => value.to_string(),
                Ok(None) => "-".to_string(),
                Err(err) => format!("unreadable ({err})"),
            };
            lines.push(format!("slot {slot}: {value}"));
        }
        lines
    }

    fn handle_log(&self) -> Vec<String> {
        if self.log.is_empty() {
            return vec!["telemetry ring is empty".to_string()];
        }
        self.log
            .oldest_first()
            .map(|record| {
                format!(
                    "[t+{}s] {}",
                    record.at.as_unix_seconds() - SIM_BOOT_SECONDS,
                    record.event
                )
            })
            .collect()
    }
}

fn describe_outcome(ok: bool) -> &'static str {
    if ok { "ok" } else { "FAILED" }
}

struct TranscriptLogger {
    writer: BufWriter<std::fs::File>,
}

impl TranscriptLogger {
    fn new(profile: ScenarioProfile) -> io::Result<Self> {
        let path = profile.log_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        let mut logger = Self {
            writer: BufWriter::new(file),
        };
        logger.write_header(profile)?;
        Ok(logger)
    }

    fn write_header(&mut self, profile: ScenarioProfile) -> io::Result<()> {
        writeln!(self.writer, "# {}", profile.header())?;
        writeln!(
            self.writer,
            "# Timestamps are simulated seconds since boot"
        )?;
        writeln!(self.writer)?;
        self.writer.flush()
    }

    fn append_line(&mut self, elapsed: u32, role: TranscriptRole, line: &str) -> io::Result<()> {
        writeln!(
            self.writer,
            "[t+{elapsed:>6}s] {} {line}",
            role.prefix()
        )?;
        self.writer.flush()
    }
}

enum TranscriptRole {
    User,
    Emulator,
}

impl TranscriptRole {
    fn prefix(&self) -> &'static str {
        match self {
            TranscriptRole::User => "USER>",
            TranscriptRole::Emulator => "EMU <",
        }
    }
}
