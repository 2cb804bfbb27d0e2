//! Hardware adapters binding the STM32G0 peripherals to the `alarm-core`
//! traits.
//!
//! Each adapter owns its peripheral handle outright and is moved into the
//! wake controller at boot, so no hardware state lives outside the
//! controller for the duration of a cycle.

pub mod clock;
pub mod printer;
pub mod relay;
pub mod slots;
pub mod strips;
