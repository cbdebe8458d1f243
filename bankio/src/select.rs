use banktools::{bit, Slot};
use embedded_hal::digital::{OutputPin, PinState};
use std::time::Duration;

use crate::{pin_error, HwError, SlotSelect};

/// Propagation time allowed for the decoder after the address changes
pub const SETTLE: Duration = Duration::from_millis(1);

/// Drives the decoder's A0..A3 address lines
pub struct BusSelector<P> {
    lines: [P; 4],
    current: Option<Slot>,
    settle: Duration,
}

impl<P: OutputPin> BusSelector<P> {
    /// `lines` in A0..A3 order
    pub fn new(lines: [P; 4]) -> Self {
        BusSelector {
            lines,
            current: None,
            settle: SETTLE,
        }
    }

    pub fn with_settle(self, settle: Duration) -> Self {
        BusSelector { settle, ..self }
    }
}

impl<P: OutputPin + Send> SlotSelect for BusSelector<P> {
    fn select(&mut self, slot: Slot) -> Result<(), HwError> {
        for (line, level) in self.lines.iter_mut().zip(bit::select_lines(slot)) {
            line.set_state(PinState::from(level))
                .map_err(pin_error("select"))?;
        }
        self.current = Some(slot);
        std::thread::sleep(self.settle);
        Ok(())
    }

    fn selected(&self) -> Option<Slot> {
        self.current
    }
}
