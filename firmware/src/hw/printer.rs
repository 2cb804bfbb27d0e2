//! Thermal printer render channel over a blocking UART.
//!
//! The printer speaks the Adafruit mini-printer command set at 19200 baud:
//! ESC directives for underline, justification, and feeds, GS for character
//! size, and DC2 `*` raster chunks for bitmaps. Directives are stateful on
//! the printer side, so the sequencer resets whatever it toggles.

use alarm_core::sequence::{Justify, RenderChannel, TextSize};
use embassy_stm32::mode::Blocking;
use embassy_stm32::usart::{Error as UartError, Uart};
use embassy_time::block_for;

use crate::hw::strips::{StripRegion, STRIP_ROW_BYTES};

const ESC: u8 = 0x1B;
const GS: u8 = 0x1D;
const DC2: u8 = 0x12;

/// Rows per raster chunk; the chunk header carries the count in one byte.
const RASTER_CHUNK_ROWS: usize = 255;

/// Hold between raster chunks so the head keeps up at full duty.
const RASTER_CHUNK_HOLD: embassy_time::Duration = embassy_time::Duration::from_millis(50);

pub struct ThermalPrinter {
    uart: Uart<'static, Blocking>,
    strips: StripRegion,
}

impl ThermalPrinter {
    /// Wraps the UART and resets the printer to its power-on defaults.
    pub fn new(mut uart: Uart<'static, Blocking>, strips: StripRegion) -> Self {
        let _ = uart.blocking_write(&[ESC, b'@']);
        Self { uart, strips }
    }
}

impl RenderChannel for ThermalPrinter {
    type Error = UartError;

    fn write_text(&mut self, text: &str) -> Result<(), UartError> {
        self.uart.blocking_write(text.as_bytes())
    }

    fn newline(&mut self) -> Result<(), UartError> {
        self.uart.blocking_write(b"\n")
    }

    fn set_underline(&mut self, on: bool) -> Result<(), UartError> {
        self.uart.blocking_write(&[ESC, b'-', u8::from(on)])
    }

    fn set_justify(&mut self, justify: Justify) -> Result<(), UartError> {
        let code = match justify {
            Justify::Left => 0,
            Justify::Center => 1,
        };
        self.uart.blocking_write(&[ESC, b'a', code])
    }

    fn set_size(&mut self, size: TextSize) -> Result<(), UartError> {
        let code = match size {
            TextSize::Small => 0x00,
            // Double height and width.
            TextSize::Large => 0x11,
        };
        self.uart.blocking_write(&[GS, b'!', code])
    }

    fn feed(&mut self, lines: u8) -> Result<(), UartError> {
        self.uart.blocking_write(&[ESC, b'd', lines])
    }

    fn print_strip(&mut self, index: u32) -> Result<(), UartError> {
        let Ok(raster) = self.strips.raster(index) else {
            // The medium validated at mount; a read failure here means the
            // flash went bad mid-cycle. Reported as a framing error so the
            // sequencer books it against the strip step.
            return Err(UartError::Framing);
        };
        let width = u8::try_from(STRIP_ROW_BYTES).unwrap_or(u8::MAX);
        for chunk in raster.data.chunks(RASTER_CHUNK_ROWS * STRIP_ROW_BYTES) {
            let rows = u8::try_from(chunk.len() / STRIP_ROW_BYTES).unwrap_or(u8::MAX);
            self.uart.blocking_write(&[DC2, b'*', rows, width])?;
            self.uart.blocking_write(chunk)?;
            block_for(RASTER_CHUNK_HOLD);
        }
        Ok(())
    }
}
