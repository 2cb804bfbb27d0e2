// firmware/src/panic.rs
use core::panic::PanicInfo;
use defmt::error;

use crate::status;

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    let status = status::snapshot();
    error!(
        "PANIC during {=str} (woke_at={}, alerts={=u8}): {}",
        status.phase.as_str(),
        status.woke_at,
        status.alerts,
        defmt::Display2Format(info)
    );
    cortex_m::asm::udf();
}
