use banktools::mode::IndicatorMode;
use banktools::{Slot, NUM_SLOTS};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// Per-slot indicator modes shared between the workflow and the animator.
///
/// Every access takes the lock for that access only. The animator copies
/// the whole table in one [`ModeTable::snapshot`] per tick, so a frame never
/// mixes two states of the table.
#[derive(Clone, Default)]
pub struct ModeTable {
    modes: Arc<Mutex<[IndicatorMode; NUM_SLOTS]>>,
}

impl ModeTable {
    pub fn new() -> Self {
        ModeTable::default()
    }

    pub fn set(&self, slot: Slot, mode: IndicatorMode) {
        self.modes.lock()[slot.index()] = mode;
    }

    pub fn get(&self, slot: Slot) -> IndicatorMode {
        self.modes.lock()[slot.index()]
    }

    pub fn set_all(&self, mode: IndicatorMode) {
        *self.modes.lock() = [mode; NUM_SLOTS];
    }

    pub fn snapshot(&self) -> [IndicatorMode; NUM_SLOTS] {
        *self.modes.lock()
    }

    /// Light every slot in turn, then clear them in the same order
    pub fn startup_sweep(&self, step: Duration) {
        for mode in [IndicatorMode::On, IndicatorMode::Off] {
            for slot in Slot::all() {
                self.set(slot, mode);
                std::thread::sleep(step);
            }
        }
    }
}
