use banktools::bit;
use embedded_hal::digital::{OutputPin, PinState};

use crate::{pin_error, FrameSink, HwError};

/// Two chained 74HC595s behind one clock/data/latch triple.
///
/// A frame is shifted most significant bit first, so bit 15 ends up in the
/// far register and bit 0 on the first output of the near one. Nothing
/// changes on the LEDs until the latch pulse at the end.
pub struct IndicatorDriver<P> {
    clock: P,
    latch: P,
    data: P,
    active_low: bool,
}

impl<P: OutputPin> IndicatorDriver<P> {
    pub fn new(clock: P, latch: P, data: P) -> Self {
        IndicatorDriver {
            clock,
            latch,
            data,
            active_low: false,
        }
    }

    /// Invert every output, for LEDs wired to sink current
    pub fn active_low(self, active_low: bool) -> Self {
        IndicatorDriver { active_low, ..self }
    }
}

impl<P: OutputPin + Send> FrameSink for IndicatorDriver<P> {
    fn render(&mut self, frame: u16) -> Result<(), HwError> {
        let frame = if self.active_low { frame ^ 0xFFFF } else { frame };
        for level in bit::msb_first(frame) {
            self.data
                .set_state(PinState::from(level))
                .map_err(pin_error("data"))?;
            self.clock.set_high().map_err(pin_error("clock"))?;
            self.clock.set_low().map_err(pin_error("clock"))?;
        }
        self.latch.set_high().map_err(pin_error("latch"))?;
        self.latch.set_low().map_err(pin_error("latch"))?;
        Ok(())
    }
}
