//! Bitmask tools for 16-slot indicator frames and decoder addresses

use bit_iter::BitIter;

use crate::Slot;

/// Convert slots into a frame with one bit per lit slot
pub fn slots_to_frame(slots: &[Slot]) -> u16 {
    let mut m = 0;
    for s in slots {
        m |= 1 << s.index();
    }
    return m;
}

/// Returns all slots lit in a frame
pub fn frame_to_slots(frame: u16) -> Vec<Slot> {
    let mut slots = Vec::new();
    for b in BitIter::from(frame) {
        // Bits and slots are both 0-indexed
        if let Some(s) = Slot::new(b as u8) {
            slots.push(s);
        }
    }
    return slots;
}

/// Whether a slot is lit in a frame
pub fn is_lit(frame: u16, slot: Slot) -> bool {
    return frame >> slot.index() & 1 == 1;
}

/// Levels of the four decoder address lines A0..A3 for a slot, A0 being the LSB
pub fn select_lines(slot: Slot) -> [bool; 4] {
    let i = slot.index();
    [i & 1 == 1, i >> 1 & 1 == 1, i >> 2 & 1 == 1, i >> 3 & 1 == 1]
}

/// Frame bits in shift order: most significant first
pub fn msb_first(frame: u16) -> impl Iterator<Item = bool> {
    (0..16).rev().map(move |b| frame >> b & 1 == 1)
}
