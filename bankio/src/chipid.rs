//! Best-effort identification of the selected chip over SPI.
//!
//! Most serial NOR parts answer JEDEC `RDID` (0x9F) with manufacturer and
//! device bytes, and many answer `RUID` (0x4B, four dummy bytes) with a
//! factory-programmed unique ID of 8 or 16 bytes. Parts without a unique ID
//! return all-zero or all-one bytes, which are reported as no ID.

use embedded_hal::spi::SpiDevice;
use std::fmt;

use crate::HwError;

const RDID: u8 = 0x9F;
const RUID: u8 = 0x4B;
const RUID_DUMMY: usize = 4;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ChipIdent {
    pub jedec: [u8; 3],
    pub uid: Option<Vec<u8>>,
}

impl ChipIdent {
    /// The unique ID as one big-endian integer, when it is 8 bytes long
    pub fn uid64(&self) -> Option<u64> {
        let uid: [u8; 8] = self.uid.as_deref()?.try_into().ok()?;
        Some(u64::from_be_bytes(uid))
    }
}

impl fmt::Display for ChipIdent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "JEDEC {:02X} {:02X} {:02X}",
            self.jedec[0], self.jedec[1], self.jedec[2]
        )?;
        match &self.uid {
            Some(uid) => {
                write!(f, ", UID({}) ", uid.len())?;
                for b in uid {
                    write!(f, "{:02x}", b)?;
                }
                Ok(())
            }
            None => write!(f, ", no UID"),
        }
    }
}

/// Something that can identify the currently selected chip
pub trait ChipId: Send {
    fn identify(&mut self) -> Result<ChipIdent, HwError>;
}

/// Read the JEDEC ID, then an 8-byte unique ID, falling back to 16 bytes
pub fn read_ident<S: SpiDevice>(spi: &mut S) -> Result<ChipIdent, HwError> {
    let mut rdid = [RDID, 0, 0, 0];
    spi.transfer_in_place(&mut rdid).map_err(spi_error)?;
    let uid = match read_uid(spi, 8)? {
        Some(uid) => Some(uid),
        None => read_uid(spi, 16)?,
    };
    Ok(ChipIdent {
        jedec: [rdid[1], rdid[2], rdid[3]],
        uid,
    })
}

fn read_uid<S: SpiDevice>(spi: &mut S, len: usize) -> Result<Option<Vec<u8>>, HwError> {
    let mut buf = vec![0u8; 1 + RUID_DUMMY + len];
    buf[0] = RUID;
    spi.transfer_in_place(&mut buf).map_err(spi_error)?;
    let uid = buf.split_off(1 + RUID_DUMMY);
    if uid.iter().all(|&b| b == 0x00) || uid.iter().all(|&b| b == 0xFF) {
        return Ok(None);
    }
    Ok(Some(uid))
}

fn spi_error<E: fmt::Debug>(e: E) -> HwError {
    HwError::Spi(format!("{:?}", e))
}
