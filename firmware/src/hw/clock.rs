//! RTC-backed duty-cycle clock and the standby sleep path.
//!
//! The RTC keeps calendar time across standby on the backup domain, so one
//! hardware clock serves both the alarm comparison and the wake timer. The
//! independent watchdog is petted from every pause: a collaborator that
//! wedges mid-cycle resets the device instead of stranding it awake.

use core::time::Duration;

use alarm_core::clock::{DutyClock, Timestamp};
use embassy_stm32::pac;
use embassy_stm32::peripherals::IWDG;
use embassy_stm32::rtc::{DateTime, DayOfWeek, Rtc};
use embassy_stm32::wdg::IndependentWatchdog;
use embassy_time::block_for;
use portable_atomic::{AtomicU32, Ordering};

use crate::calendar::{self, CivilDateTime};
use crate::status::{self, CyclePhase};

/// Unix seconds (+1, 0 == none) handed over by a successful remote sync.
///
/// The network link cannot reach the RTC handle owned by this clock, so it
/// parks the synced time here and the clock folds it in on its next read.
static PENDING_SYNC: AtomicU32 = AtomicU32::new(0);

/// Offers a freshly synced wall-clock reading to the RTC owner.
pub fn offer_sync(unix_seconds: u32) {
    let encoded = unix_seconds.min(u32::MAX - 1).wrapping_add(1);
    PENDING_SYNC.store(encoded, Ordering::Relaxed);
}

fn take_pending_sync() -> Option<u32> {
    let raw = PENDING_SYNC.swap(0, Ordering::Relaxed);
    if raw == 0 { None } else { Some(raw - 1) }
}

/// [`DutyClock`] over the hardware RTC and the independent watchdog.
pub struct RtcClock {
    rtc: Rtc,
    watchdog: IndependentWatchdog<'static, IWDG>,
    last_read: u32,
}

impl RtcClock {
    pub fn new(rtc: Rtc, watchdog: IndependentWatchdog<'static, IWDG>) -> Self {
        Self {
            rtc,
            watchdog,
            last_read: 0,
        }
    }

    fn apply_pending_sync(&mut self) {
        let Some(seconds) = take_pending_sync() else {
            return;
        };
        let (civil, weekday) = calendar::civil_from_unix(seconds);
        let Ok(datetime) = DateTime::from(
            civil.year,
            civil.month,
            civil.day,
            day_of_week(weekday),
            civil.hour,
            civil.minute,
            civil.second,
        ) else {
            return;
        };
        if self.rtc.set_datetime(datetime).is_err() {
            defmt::warn!("rtc rejected synced time {=u32}", seconds);
        }
    }

    /// Programs the RTC wakeup timer for `seconds` of standby.
    ///
    /// The 1 Hz ck_spre clock drives the timer and the hardware fires one
    /// tick after the reload value, hence the minus one.
    fn arm_wakeup(seconds: u32) {
        let rtc = pac::RTC;
        rtc.wpr().write(|w| w.set_key(pac::rtc::vals::Key::DEACTIVATE1));
        rtc.wpr().write(|w| w.set_key(pac::rtc::vals::Key::DEACTIVATE2));
        rtc.cr().modify(|w| w.set_wute(false));
        while !rtc.icsr().read().wutwf() {}
        rtc.wutr()
            .write(|w| w.set_wut(u16::try_from(seconds.clamp(1, 65_536) - 1).unwrap_or(u16::MAX)));
        rtc.cr().modify(|w| {
            w.set_wucksel(pac::rtc::vals::Wucksel::CLOCK_SPARE);
            w.set_wutie(true);
            w.set_wute(true);
        });
        rtc.wpr().write(|w| w.set_key(pac::rtc::vals::Key::ACTIVATE));
    }

    fn enter_standby() -> ! {
        let pwr = pac::PWR;
        pwr.cr1().modify(|w| w.set_lpms(pac::pwr::vals::Lpms::STANDBY));
        pwr.scr().write(|w| {
            w.set_cwuf(1, true);
            w.set_cwuf(2, true);
            w.set_csbf(true);
        });
        // SAFETY: the executor never resumes past this point; the core is
        // ours until the wakeup reset.
        let mut core = unsafe { cortex_m::Peripherals::steal() };
        core.SCB.set_sleepdeep();
        loop {
            cortex_m::asm::wfi();
        }
    }
}

impl DutyClock for RtcClock {
    fn now(&mut self) -> Timestamp {
        self.apply_pending_sync();
        if let Ok(datetime) = self.rtc.now() {
            self.last_read = calendar::unix_from_civil(CivilDateTime {
                year: datetime.year(),
                month: datetime.month(),
                day: datetime.day(),
                hour: datetime.hour(),
                minute: datetime.minute(),
                second: datetime.second(),
            });
        }
        // A failed read repeats the previous value; a skewed comparison is
        // survivable, an aborted cycle is not.
        status::record_wall_clock(self.last_read);
        Timestamp::from_unix_seconds(self.last_read)
    }

    fn pause(&mut self, duration: Duration) {
        // One-second holds only occur in the alignment loop.
        if duration == Duration::from_secs(1) {
            status::record_phase(CyclePhase::Aligning);
        }
        self.watchdog.pet();
        block_for(embassy_time::Duration::from_micros(
            u64::try_from(duration.as_micros()).unwrap_or(u64::MAX),
        ));
        self.watchdog.pet();
    }

    fn deep_sleep(&mut self, interval: Duration) -> ! {
        self.watchdog.pet();
        Self::arm_wakeup(u32::try_from(interval.as_secs()).unwrap_or(u32::MAX));
        Self::enter_standby()
    }
}

fn day_of_week(weekday: u8) -> DayOfWeek {
    match weekday {
        0 => DayOfWeek::Monday,
        1 => DayOfWeek::Tuesday,
        2 => DayOfWeek::Wednesday,
        3 => DayOfWeek::Thursday,
        4 => DayOfWeek::Friday,
        5 => DayOfWeek::Saturday,
        _ => DayOfWeek::Sunday,
    }
}
