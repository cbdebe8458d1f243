//! Debouncing for momentary push buttons

use std::time::{Duration, Instant};

/// Logical level of a button after active-low decoding
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum Level {
    Pressed,
    Released,
}

impl Level {
    /// Buttons pull their line low when pressed
    pub fn from_line_low(is_low: bool) -> Level {
        if is_low {
            Level::Pressed
        } else {
            Level::Released
        }
    }
}

/// A committed change of the stable level
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum Edge {
    Press,
    Release,
}

/// Stable level plus the candidate level waiting out the debounce window.
///
/// A raw level that differs from the stable one becomes the candidate. The
/// candidate is dropped as soon as the raw level disagrees with it, and is
/// committed once it has been seen for at least `window`.
#[derive(Clone, Debug)]
pub struct Debouncer {
    window: Duration,
    stable: Level,
    candidate: Option<(Level, Instant)>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Debouncer {
            window,
            stable: Level::Released,
            candidate: None,
        }
    }

    pub fn stable(&self) -> Level {
        self.stable
    }

    /// Feed one raw sample taken at `now`
    pub fn update(&mut self, raw: Level, now: Instant) -> Option<Edge> {
        match self.candidate {
            None => {
                if raw != self.stable {
                    self.candidate = Some((raw, now));
                }
                None
            }
            Some((level, _)) if raw != level => {
                self.candidate = None;
                None
            }
            Some((level, since)) => {
                if now.saturating_duration_since(since) < self.window {
                    return None;
                }
                self.candidate = None;
                self.stable = level;
                match level {
                    Level::Pressed => Some(Edge::Press),
                    Level::Released => Some(Edge::Release),
                }
            }
        }
    }
}
