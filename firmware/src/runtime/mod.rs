use core::cell::RefCell;

use cortex_m::interrupt;
use cortex_m::register::primask;
use critical_section::{self, RawRestoreState};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_stm32 as hal;
use embassy_stm32::gpio::{Level, Output, Speed};
use embassy_stm32::rtc::{Rtc, RtcConfig};
use embassy_stm32::usart::{self, Uart};
use embassy_stm32::wdg::IndependentWatchdog;
use embassy_stm32::{bind_interrupts, peripherals, rcc};
use static_cell::StaticCell;

use alarm_core::clock::WakeSchedule;
use alarm_core::controller::WakeController;
use alarm_core::engine::DecisionEngine;
use alarm_core::telemetry::CycleLog;

use crate::hw::clock::RtcClock;
use crate::hw::printer::ThermalPrinter;
use crate::hw::relay::Relay;
use crate::hw::slots::BackupSlots;
use crate::hw::strips::{StripMedium, StripRegion};
use crate::net::{CoProcessor, LinkHandle, RemoteHandle};

mod cycle_task;

/// Watchdog budget; every pause pets it, so this only has to outlast the
/// longest single UART exchange.
const WATCHDOG_TIMEOUT_MICROS: u32 = 20_000_000;

critical_section::set_impl!(InterruptCriticalSection);

struct InterruptCriticalSection;

unsafe impl critical_section::Impl for InterruptCriticalSection {
    unsafe fn acquire() -> RawRestoreState {
        let primask = primask::read();
        interrupt::disable();
        primask.is_active()
    }

    unsafe fn release(restore_state: RawRestoreState) {
        if restore_state {
            unsafe {
                interrupt::enable();
            }
        }
    }
}

bind_interrupts!(struct Irqs {
    USART2 => usart::InterruptHandler<peripherals::USART2>;
});

static CO_PROCESSOR: StaticCell<RefCell<CoProcessor>> = StaticCell::new();
static CYCLE_LOG: StaticCell<CycleLog> = StaticCell::new();

#[embassy_executor::main]
pub async fn main(spawner: Spawner) {
    let mut config = hal::Config::default();
    // The RTC must keep counting through standby, so it runs off the
    // always-on low-speed oscillator.
    config.rcc.ls = rcc::LsConfig::default_lsi();
    let peripherals = hal::init(config);

    let mut watchdog = IndependentWatchdog::new(peripherals.IWDG, WATCHDOG_TIMEOUT_MICROS);
    watchdog.unleash();

    // Rtc::new unlocks the backup domain, which BackupSlots relies on.
    let rtc = Rtc::new(peripherals.RTC, RtcConfig::default());
    let clock = RtcClock::new(rtc, watchdog);
    let slots = BackupSlots::new();

    let mut printer_config = usart::Config::default();
    printer_config.baudrate = 19_200;
    let printer_uart = Uart::new_blocking(
        peripherals.USART1,
        peripherals.PA10,
        peripherals.PA9,
        printer_config,
    )
    .expect("printer uart config");

    let mut co_config = usart::Config::default();
    co_config.baudrate = 115_200;
    let co_uart = Uart::new(
        peripherals.USART2,
        peripherals.PA3,
        peripherals.PA2,
        Irqs,
        peripherals.DMA1_CH1,
        peripherals.DMA1_CH2,
        co_config,
    )
    .expect("co-processor uart config");
    let transport = CO_PROCESSOR.init(RefCell::new(CoProcessor::new(co_uart)));

    let region = StripRegion::default_region();
    let controller = WakeController {
        engine: DecisionEngine::new(WakeSchedule::DEFAULT),
        clock,
        store: slots,
        media: StripMedium::new(region),
        link: LinkHandle::new(transport),
        remote: RemoteHandle::new(transport),
        power: Relay::new(Output::new(peripherals.PA8, Level::Low, Speed::Low)),
        printer: ThermalPrinter::new(printer_uart, region),
    };

    let log = CYCLE_LOG.init(CycleLog::new());
    spawner
        .spawn(cycle_task::run(controller, log))
        .expect("failed to spawn wake-cycle task");
}
