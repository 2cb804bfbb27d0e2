//! Relay switching the thermal printer's 5 V supply.

use core::convert::Infallible;

use alarm_core::sequence::PowerSwitch;
use embassy_stm32::gpio::Output;

use crate::status::{self, CyclePhase};

/// Active-high relay driver on a push-pull output.
pub struct Relay {
    coil: Output<'static>,
}

impl Relay {
    pub fn new(coil: Output<'static>) -> Self {
        Self { coil }
    }
}

impl PowerSwitch for Relay {
    type Error = Infallible;

    fn power_on(&mut self) -> Result<(), Infallible> {
        status::record_phase(CyclePhase::Printing);
        self.coil.set_high();
        Ok(())
    }

    fn power_off(&mut self) -> Result<(), Infallible> {
        self.coil.set_low();
        Ok(())
    }
}
