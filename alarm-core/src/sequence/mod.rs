//! Ordered side-effect sequences for alarm and alert cycles.
//!
//! A firing cycle runs exactly one pass of power-on, strip print, menu
//! print, power-off. Each step tolerates its own failures; whatever
//! happens in between, the sequence always ends by dropping peripheral
//! power so a fault can never strand the printer drawing current.

use core::fmt;
use core::time::Duration;

use crate::clock::DutyClock;
use crate::engine::RemoteSource;
use crate::store::{self, SlotStore, StorageMedium};
use crate::wire::MenuBody;
use crate::wire::menu::{self, MenuSegment};

/// Settle time between relay close and the first byte to the printer.
pub const PRINTER_WARM_UP: Duration = Duration::from_secs(3);

/// Drain time between the last alert byte and relay release.
pub const ALERT_SETTLE: Duration = Duration::from_secs(2);

/// Blank lines before a strip print.
pub const STRIP_LEAD_FEED_LINES: u8 = 1;

/// Blank lines after a strip print.
pub const STRIP_TRAIL_FEED_LINES: u8 = 4;

/// Blank lines after the menu block.
pub const MENU_TRAIL_FEED_LINES: u8 = 4;

/// Blank lines around an alert message.
pub const ALERT_PAD_FEED_LINES: u8 = 2;

/// Heading printed centered and enlarged above the menu.
pub const MENU_BANNER: [&str; 2] = ["Heute", "in der Mensa"];

/// Horizontal alignment of subsequent text.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Justify {
    Left,
    Center,
}

/// Character size of subsequent text.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TextSize {
    Small,
    Large,
}

/// Switched supply feeding the output peripheral.
pub trait PowerSwitch {
    type Error;

    fn power_on(&mut self) -> Result<(), Self::Error>;
    fn power_off(&mut self) -> Result<(), Self::Error>;
}

/// Ordered render channel to the output peripheral.
///
/// Directives apply to everything written after them until changed; the
/// sequencer is responsible for resetting any toggle it sets.
pub trait RenderChannel {
    type Error;

    /// Writes text at the current cursor without a line break.
    fn write_text(&mut self, text: &str) -> Result<(), Self::Error>;

    /// Terminates the current line.
    fn newline(&mut self) -> Result<(), Self::Error>;

    /// Switches the emphasis (underline) toggle.
    fn set_underline(&mut self, on: bool) -> Result<(), Self::Error>;

    fn set_justify(&mut self, justify: Justify) -> Result<(), Self::Error>;

    fn set_size(&mut self, size: TextSize) -> Result<(), Self::Error>;

    /// Advances the paper by `lines` blank lines.
    fn feed(&mut self, lines: u8) -> Result<(), Self::Error>;

    /// Renders the stored strip at `index`.
    fn print_strip(&mut self, index: u32) -> Result<(), Self::Error>;

    /// Writes one full line of text.
    fn write_line(&mut self, text: &str) -> Result<(), Self::Error> {
        self.write_text(text)?;
        self.newline()
    }
}

/// Step that reported an error.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StepFault {
    PowerOn,
    PowerOff,
    Cursor,
    Strip,
    Menu,
    Alert,
}

impl fmt::Display for StepFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepFault::PowerOn => f.write_str("power-on"),
            StepFault::PowerOff => f.write_str("power-off"),
            StepFault::Cursor => f.write_str("cursor"),
            StepFault::Strip => f.write_str("strip"),
            StepFault::Menu => f.write_str("menu"),
            StepFault::Alert => f.write_str("alert"),
        }
    }
}

/// Why an optional step did not run.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// Peripheral power never came up.
    NoPower,
    /// The medium holds no strips to rotate through.
    NoStrips,
    /// Menu fetch failed or returned nothing for today.
    MenuUnavailable,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoPower => f.write_str("no-power"),
            SkipReason::NoStrips => f.write_str("no-strips"),
            SkipReason::MenuUnavailable => f.write_str("menu-unavailable"),
        }
    }
}

/// Result of one sequence step.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    Completed,
    Skipped(SkipReason),
    Failed(StepFault),
}

impl StepOutcome {
    /// Returns `true` unless the step reported an error.
    #[must_use]
    pub const fn is_ok(self) -> bool {
        !matches!(self, StepOutcome::Failed(_))
    }
}

impl fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepOutcome::Completed => f.write_str("completed"),
            StepOutcome::Skipped(reason) => write!(f, "skipped ({reason})"),
            StepOutcome::Failed(fault) => write!(f, "failed ({fault})"),
        }
    }
}

/// Per-step outcomes of one alarm sequence.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SequenceReport {
    pub power_on: StepOutcome,
    pub strip: StepOutcome,
    pub menu: StepOutcome,
    pub power_off: StepOutcome,
}

impl SequenceReport {
    /// Returns `true` when no step reported an error.
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        self.power_on.is_ok()
            && self.strip.is_ok()
            && self.menu.is_ok()
            && self.power_off.is_ok()
    }
}

/// Runs the full alarm sequence for a firing cycle.
///
/// Steps run in a fixed order: power-on and warm-up, strip print, menu
/// print, power-off. A failing step forfeits only its own remaining
/// output; the power-off runs unconditionally at the end.
pub fn run_alarm_sequence<C, S, M, R, P, W>(
    clock: &mut C,
    store: &mut S,
    media: &mut M,
    remote: &mut R,
    power: &mut P,
    printer: &mut W,
) -> SequenceReport
where
    C: DutyClock,
    S: SlotStore,
    M: StorageMedium,
    R: RemoteSource,
    P: PowerSwitch,
    W: RenderChannel,
{
    if power.power_on().is_err() {
        // Nothing can render without supply power. Still drive the switch
        // to its off position in case it latched half way.
        let power_off = release(power);
        return SequenceReport {
            power_on: StepOutcome::Failed(StepFault::PowerOn),
            strip: StepOutcome::Skipped(SkipReason::NoPower),
            menu: StepOutcome::Skipped(SkipReason::NoPower),
            power_off,
        };
    }
    clock.pause(PRINTER_WARM_UP);

    let strip = strip_step(store, media, printer);
    let menu = menu_step(remote, printer);
    let power_off = release(power);

    SequenceReport {
        power_on: StepOutcome::Completed,
        strip,
        menu,
        power_off,
    }
}

/// Prints a short escalation message, bracketed by its own power cycle.
///
/// Deliberately independent of storage and network: this path runs when
/// one of those just failed.
pub fn run_alert_sequence<C, P, W>(
    clock: &mut C,
    power: &mut P,
    printer: &mut W,
    message: &str,
) -> StepOutcome
where
    C: DutyClock,
    P: PowerSwitch,
    W: RenderChannel,
{
    if power.power_on().is_err() {
        let _ = power.power_off();
        return StepOutcome::Failed(StepFault::PowerOn);
    }
    clock.pause(PRINTER_WARM_UP);

    let printed = printer
        .feed(ALERT_PAD_FEED_LINES)
        .and_then(|()| printer.write_line(message))
        .and_then(|()| printer.feed(ALERT_PAD_FEED_LINES));
    clock.pause(ALERT_SETTLE);
    let released = power.power_off();

    match (printed, released) {
        (Ok(()), Ok(())) => StepOutcome::Completed,
        (Err(_), _) => StepOutcome::Failed(StepFault::Alert),
        (Ok(()), Err(_)) => StepOutcome::Failed(StepFault::PowerOff),
    }
}

fn release<P: PowerSwitch>(power: &mut P) -> StepOutcome {
    match power.power_off() {
        Ok(()) => StepOutcome::Completed,
        Err(_) => StepOutcome::Failed(StepFault::PowerOff),
    }
}

fn strip_step<S, M, W>(store: &mut S, media: &mut M, printer: &mut W) -> StepOutcome
where
    S: SlotStore,
    M: StorageMedium,
    W: RenderChannel,
{
    let count = match media.strip_count() {
        Ok(count) => count,
        Err(_) => return StepOutcome::Failed(StepFault::Strip),
    };
    if count == 0 {
        return StepOutcome::Skipped(SkipReason::NoStrips);
    }

    // Cursor commit lands before any ink hits paper. Losing power after
    // this point repeats nothing on the next firing cycle.
    let index = match store::advance_cursor(store, count) {
        Ok(index) => index,
        Err(_) => return StepOutcome::Failed(StepFault::Cursor),
    };

    let rendered = printer
        .feed(STRIP_LEAD_FEED_LINES)
        .and_then(|()| printer.print_strip(index))
        .and_then(|()| printer.feed(STRIP_TRAIL_FEED_LINES));
    match rendered {
        Ok(()) => StepOutcome::Completed,
        Err(_) => StepOutcome::Failed(StepFault::Strip),
    }
}

fn menu_step<R, W>(remote: &mut R, printer: &mut W) -> StepOutcome
where
    R: RemoteSource,
    W: RenderChannel,
{
    let mut body = MenuBody::new();
    if remote.fetch_menu(&mut body).is_err() {
        return StepOutcome::Skipped(SkipReason::MenuUnavailable);
    }
    let Ok(text) = core::str::from_utf8(&body) else {
        return StepOutcome::Skipped(SkipReason::MenuUnavailable);
    };
    if text.is_empty() {
        return StepOutcome::Skipped(SkipReason::MenuUnavailable);
    }
    match render_menu(printer, text) {
        Ok(()) => StepOutcome::Completed,
        Err(_) => StepOutcome::Failed(StepFault::Menu),
    }
}

/// Renders the banner followed by the menu markup.
///
/// An emphasized segment opens with a blank line and prints underlined.
/// Every segment closes with the underline dropped before its line break,
/// so emphasis never bleeds into the next segment.
pub fn render_menu<W: RenderChannel>(printer: &mut W, text: &str) -> Result<(), W::Error> {
    printer.set_justify(Justify::Center)?;
    printer.set_size(TextSize::Large)?;
    for line in MENU_BANNER {
        printer.write_line(line)?;
    }
    printer.set_size(TextSize::Small)?;
    printer.set_justify(Justify::Left)?;

    for segment in menu::segments(text) {
        match segment {
            MenuSegment::Emphasized(heading) => {
                printer.set_underline(true)?;
                printer.newline()?;
                printer.write_text(heading)?;
            }
            MenuSegment::Plain(line) => printer.write_text(line)?,
        }
        printer.set_underline(false)?;
        printer.newline()?;
    }

    printer.feed(MENU_TRAIL_FEED_LINES)
}
