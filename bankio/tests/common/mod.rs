#![allow(dead_code)]

use embedded_hal::digital::{ErrorType, InputPin, OutputPin};
use embedded_hal::spi::{self, Operation, SpiDevice};
use std::convert::Infallible;
use std::sync::{Arc, Mutex};

/// Every level written to any pin sharing the log, in order
pub type PinLog = Arc<Mutex<Vec<(&'static str, bool)>>>;

pub struct RecPin {
    pub name: &'static str,
    pub log: PinLog,
}

impl RecPin {
    pub fn new(name: &'static str, log: &PinLog) -> Self {
        RecPin { name, log: log.clone() }
    }
}

impl ErrorType for RecPin {
    type Error = Infallible;
}

impl OutputPin for RecPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.log.lock().unwrap().push((self.name, false));
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.log.lock().unwrap().push((self.name, true));
        Ok(())
    }
}

/// Input pin with a fixed line level
pub struct LevelPin(pub bool);

impl ErrorType for LevelPin {
    type Error = Infallible;
}

impl InputPin for LevelPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.0)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.0)
    }
}

/// Answers RDID with a fixed JEDEC ID and RUID with a fixed unique ID,
/// repeated or truncated to the requested length
pub struct FakeSpi {
    pub jedec: [u8; 3],
    pub uid: Vec<u8>,
    pub commands: Vec<u8>,
}

impl spi::ErrorType for FakeSpi {
    type Error = Infallible;
}

impl SpiDevice for FakeSpi {
    fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), Self::Error> {
        for op in operations.iter_mut() {
            if let Operation::TransferInPlace(buf) = op {
                self.commands.push(buf[0]);
                match buf[0] {
                    0x9F => buf[1..4].copy_from_slice(&self.jedec),
                    0x4B => {
                        for (i, b) in buf[5..].iter_mut().enumerate() {
                            *b = self.uid.get(i).copied().unwrap_or(0xFF);
                        }
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }
}
