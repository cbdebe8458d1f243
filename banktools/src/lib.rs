pub mod bit;
pub mod debounce;
pub mod found;
pub mod mode;
pub mod size;
pub mod speed;

use std::fmt;

/// Number of addressable positions behind the bus decoder
pub const NUM_SLOTS: usize = 16;

/// One addressable position behind the bus multiplexer, holding zero or one
/// flash device. Slot 0 is the source; slots 1 through 15 are clone targets.
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct Slot(u8);

impl Slot {
    pub const SOURCE: Slot = Slot(0);

    /// Returns `None` for indices past the last slot
    pub fn new(index: u8) -> Option<Slot> {
        if (index as usize) < NUM_SLOTS {
            Some(Slot(index))
        } else {
            None
        }
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn is_source(self) -> bool {
        self.0 == 0
    }

    /// Every slot, source first
    pub fn all() -> impl Iterator<Item = Slot> {
        (0..NUM_SLOTS as u8).map(Slot)
    }

    /// Target slots in ascending order
    pub fn targets() -> impl Iterator<Item = Slot> {
        (1..NUM_SLOTS as u8).map(Slot)
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}", self.0)
    }
}
