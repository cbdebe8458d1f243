//! Indicator display modes and the rule that turns them into frames
//!
//! The animator advances a tick counter at a fixed period (10 ms on the
//! bench) and asks a [`FrameBuilder`] for the frame to shift out on each
//! tick. With that period:
//!
//! | Mode           | Lit when                                   |
//! |----------------|--------------------------------------------|
//! | `Off`          | never                                      |
//! | `On`           | always                                     |
//! | `BlinkFast`    | `(tick / 5) % 2 == 0`, 100 ms half period  |
//! | `BlinkSlow`    | `(tick / 100) % 2 == 1`, 1 s half period   |
//! | `DataActivity` | random, redrawn when `tick % 5 == 0`       |
//!
//! `BlinkSlow` starts dark so it never lines up with `BlinkFast` at power-on.

use rand::Rng;

use crate::{Slot, NUM_SLOTS};

/// Ticks per fast blink half period, and per data-activity redraw
pub const FAST_TICKS: u64 = 5;
/// Ticks per slow blink half period
pub const SLOW_TICKS: u64 = 100;

#[derive(Clone, Copy, Eq, PartialEq, Debug, Default)]
pub enum IndicatorMode {
    #[default]
    Off,
    On,
    BlinkFast,
    BlinkSlow,
    DataActivity,
}

impl IndicatorMode {
    /// Lit state on `tick` for the deterministic modes; `None` for
    /// `DataActivity`, whose state is held by the [`FrameBuilder`].
    pub fn lit_at(self, tick: u64) -> Option<bool> {
        match self {
            IndicatorMode::Off => Some(false),
            IndicatorMode::On => Some(true),
            IndicatorMode::BlinkFast => Some((tick / FAST_TICKS) % 2 == 0),
            IndicatorMode::BlinkSlow => Some((tick / SLOW_TICKS) % 2 == 1),
            IndicatorMode::DataActivity => None,
        }
    }
}

/// Computes frames from snapshots of the mode table.
///
/// Holds the per-slot random state of `DataActivity` between redraws so it
/// only changes on ticks that are multiples of [`FAST_TICKS`].
pub struct FrameBuilder<R> {
    rng: R,
    activity: [bool; NUM_SLOTS],
}

impl<R: Rng> FrameBuilder<R> {
    pub fn new(rng: R) -> Self {
        FrameBuilder {
            rng,
            activity: [false; NUM_SLOTS],
        }
    }

    pub fn frame(&mut self, tick: u64, modes: &[IndicatorMode; NUM_SLOTS]) -> u16 {
        let redraw = tick % FAST_TICKS == 0;
        let mut frame = 0u16;
        for slot in Slot::all() {
            let i = slot.index();
            let mode = modes[i];
            if mode == IndicatorMode::DataActivity && redraw {
                self.activity[i] = self.rng.gen();
            }
            if mode.lit_at(tick).unwrap_or(self.activity[i]) {
                frame |= 1 << i;
            }
        }
        frame
    }
}
