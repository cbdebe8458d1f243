//! Bus clock derived from the four configuration switches

use std::fmt;

pub const BASE_KHZ: u32 = 2000;
pub const STEP_KHZ: u32 = 2000;

/// SPI clock handed to the programming tool, fixed for the process lifetime.
///
/// The value is not clamped: the fastest setting (32 MHz) is passed through
/// and it is up to the tool and the SPI driver to honor or round it.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BusSpeed {
    khz: u32,
}

impl BusSpeed {
    /// `base + n * step` for the low four bits of `n`
    pub fn from_index(n: u8) -> BusSpeed {
        BusSpeed {
            khz: BASE_KHZ + u32::from(n & 0xF) * STEP_KHZ,
        }
    }

    /// Switches in DIP1..DIP4 order, `true` meaning asserted. DIP1 is the LSB.
    pub fn from_switches(asserted: [bool; 4]) -> BusSpeed {
        BusSpeed::from_index(switch_index(asserted))
    }

    pub fn khz(self) -> u32 {
        self.khz
    }

    pub fn hz(self) -> u32 {
        self.khz * 1000
    }
}

impl Default for BusSpeed {
    fn default() -> Self {
        BusSpeed::from_index(0)
    }
}

impl fmt::Display for BusSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} kHz", self.khz)
    }
}

/// Assemble the switch bits LSB first
pub fn switch_index(asserted: [bool; 4]) -> u8 {
    asserted
        .iter()
        .enumerate()
        .fold(0, |n, (b, &on)| if on { n | 1 << b } else { n })
}
