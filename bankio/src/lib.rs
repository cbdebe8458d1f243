//! Hardware access for the 16-slot flash bank.
//!
//! The bank hangs off a single SPI bus. Chip select is routed to one of
//! sixteen slots by a 4-to-16 decoder addressed by four GPIO lines, and the
//! sixteen status LEDs sit behind two chained 8-bit shift registers that
//! share one clock/data/latch triple:
//!
//! ```text
//!  GPIO 22..25 (A0..A3) -----> CD74HC154 ---> /CS of slot 0..15
//!  SPI0 (MOSI/MISO/SCLK) ----------------------> every slot
//!  GPIO 2/4 (CLK/DATA) ------> 74HC595 -> 74HC595 ---> LED 0..15
//!  GPIO 3 (LATCH) ---------------^----------^
//! ```
//!
//! Everything here is written against the `embedded-hal` digital and SPI
//! traits so the encoders can be exercised with recording pins. The
//! [`linux`] module (feature `linux`) wires them to the Raspberry Pi's
//! GPIO character device and spidev.
//!
//! Only two operations matter to the rest of the system: [`SlotSelect`] and
//! [`FrameSink`]. Neither has logical failure modes; the `HwError`s they can
//! return come from the pins themselves and are only worth logging.

pub mod chipid;
#[cfg(feature = "linux")]
pub mod linux;
pub mod select;
pub mod shift;

pub use chipid::{ChipId, ChipIdent};
pub use select::BusSelector;
pub use shift::IndicatorDriver;

use banktools::Slot;
use embedded_hal::digital::InputPin;

#[derive(Debug, thiserror::Error)]
pub enum HwError {
    #[error("gpio {line}: {msg}")]
    Pin { line: &'static str, msg: String },
    #[error("spi: {0}")]
    Spi(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[cfg(feature = "linux")]
    #[error(transparent)]
    Gpio(#[from] linux_embedded_hal::gpio_cdev::errors::Error),
}

/// Addresses one slot on the shared bus
pub trait SlotSelect: Send {
    /// Drive the address lines and wait out the decoder settle time
    fn select(&mut self, slot: Slot) -> Result<(), HwError>;
    fn selected(&self) -> Option<Slot>;
}

/// Shows a 16-bit frame on the indicators, bit `i` lighting slot `i`
pub trait FrameSink: Send {
    fn render(&mut self, frame: u16) -> Result<(), HwError>;
}

impl<T: SlotSelect + ?Sized> SlotSelect for Box<T> {
    fn select(&mut self, slot: Slot) -> Result<(), HwError> {
        (**self).select(slot)
    }

    fn selected(&self) -> Option<Slot> {
        (**self).selected()
    }
}

impl<T: FrameSink + ?Sized> FrameSink for Box<T> {
    fn render(&mut self, frame: u16) -> Result<(), HwError> {
        (**self).render(frame)
    }
}

/// Maps a pin error into an `HwError` tagged with the line's role
pub(crate) fn pin_error<E: core::fmt::Debug>(line: &'static str) -> impl FnOnce(E) -> HwError {
    move |e| HwError::Pin {
        line,
        msg: format!("{:?}", e),
    }
}

/// Read the configuration switches once, DIP1 first. Switches pull their
/// line low when on, so a low line reads as asserted.
pub fn read_switches<P: InputPin>(pins: &mut [P; 4]) -> Result<[bool; 4], HwError> {
    let mut asserted = [false; 4];
    for (on, pin) in asserted.iter_mut().zip(pins.iter_mut()) {
        *on = pin.is_low().map_err(pin_error("switch"))?;
    }
    Ok(asserted)
}
