//! Raspberry Pi wiring over `/dev/gpiochipN` and `/dev/spidevB.C`.
//!
//! Line numbers are BCM GPIO offsets on the first GPIO chip. Inputs are
//! requested as plain inputs: the board provides the pull-ups that make the
//! buttons and switches active-low. All lines are released when the
//! returned handles are dropped.

use linux_embedded_hal::gpio_cdev::{Chip, LineRequestFlags};
use linux_embedded_hal::spidev::{SpiModeFlags, SpidevOptions};
use linux_embedded_hal::{CdevPin, SpidevDevice};
use std::path::{Path, PathBuf};

use crate::chipid::{read_ident, ChipId, ChipIdent};
use crate::{BusSelector, HwError, IndicatorDriver};

pub const LED_CLOCK: u32 = 2;
pub const LED_LATCH: u32 = 3;
pub const LED_DATA: u32 = 4;
/// Decoder address lines A0..A3
pub const SELECT: [u32; 4] = [22, 23, 24, 25];
/// Speed switches DIP1..DIP4. Pulled up on the board, closed to ground.
pub const SWITCHES: [u32; 4] = [16, 19, 20, 21];
/// Buttons are pulled up on the board and pull their line low when pressed.
/// No bias is requested from the kernel, so a board without pull-ups
/// reads floating lines here.
pub const CHECK_BUTTON: u32 = 5;
pub const WRITE_BUTTON: u32 = 6;

const CONSUMER: &str = "flashbank";

/// Every line the bank uses, requested from one GPIO chip
pub struct Board {
    pub indicators: IndicatorDriver<CdevPin>,
    pub selector: BusSelector<CdevPin>,
    pub switches: [CdevPin; 4],
    /// CHECK, WRITE
    pub buttons: [CdevPin; 2],
}

impl Board {
    pub fn open<P: AsRef<Path>>(chip: P, active_low_leds: bool) -> Result<Board, HwError> {
        let mut chip = Chip::new(chip)?;
        let indicators = IndicatorDriver::new(
            output(&mut chip, LED_CLOCK)?,
            output(&mut chip, LED_LATCH)?,
            output(&mut chip, LED_DATA)?,
        )
        .active_low(active_low_leds);
        let selector = BusSelector::new([
            output(&mut chip, SELECT[0])?,
            output(&mut chip, SELECT[1])?,
            output(&mut chip, SELECT[2])?,
            output(&mut chip, SELECT[3])?,
        ]);
        let switches = [
            input(&mut chip, SWITCHES[0])?,
            input(&mut chip, SWITCHES[1])?,
            input(&mut chip, SWITCHES[2])?,
            input(&mut chip, SWITCHES[3])?,
        ];
        let buttons = [
            input(&mut chip, CHECK_BUTTON)?,
            input(&mut chip, WRITE_BUTTON)?,
        ];
        Ok(Board {
            indicators,
            selector,
            switches,
            buttons,
        })
    }
}

fn output(chip: &mut Chip, offset: u32) -> Result<CdevPin, HwError> {
    let handle = chip
        .get_line(offset)?
        .request(LineRequestFlags::OUTPUT, 0, CONSUMER)?;
    Ok(CdevPin::new(handle)?)
}

/// Plain input; the character device request flags carry no bias setting
fn input(chip: &mut Chip, offset: u32) -> Result<CdevPin, HwError> {
    let handle = chip
        .get_line(offset)?
        .request(LineRequestFlags::INPUT, 0, CONSUMER)?;
    Ok(CdevPin::new(handle)?)
}

/// Identifies the selected chip through spidev.
///
/// The device is opened per call and closed right after, since the
/// programming tool needs the same spidev node in between.
pub struct SpidevChipId {
    path: PathBuf,
    speed_hz: u32,
}

impl SpidevChipId {
    pub fn new<P: Into<PathBuf>>(path: P, speed_hz: u32) -> Self {
        SpidevChipId {
            path: path.into(),
            speed_hz,
        }
    }
}

impl ChipId for SpidevChipId {
    fn identify(&mut self) -> Result<ChipIdent, HwError> {
        let mut spi =
            SpidevDevice::open(&self.path).map_err(|e| HwError::Spi(format!("{:?}", e)))?;
        let options = SpidevOptions::new()
            .bits_per_word(8)
            .max_speed_hz(self.speed_hz)
            .mode(SpiModeFlags::SPI_MODE_0)
            .build();
        spi.configure(&options)?;
        read_ident(&mut spi)
    }
}
