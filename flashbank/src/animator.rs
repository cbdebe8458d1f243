use anyhow::Result;
use bankio::FrameSink;
use banktools::bit;
use banktools::mode::FrameBuilder;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, trace, warn};

use crate::indicators::ModeTable;
use crate::timer::TickLoop;
use crate::Event;

/// How long a stop that timed out waits for the sink to blank it
const BLANK_WAIT: Duration = Duration::from_millis(250);

/// Renders the mode table to the indicators on every tick until stopped
pub struct Animator {
    tick_loop: TickLoop,
    sink: Arc<Mutex<dyn FrameSink>>,
}

impl Animator {
    pub fn start<S>(sink: S, modes: ModeTable, tick: Duration) -> Result<Animator>
    where
        S: FrameSink + 'static,
    {
        let sink: Arc<Mutex<dyn FrameSink>> = Arc::new(Mutex::new(sink));
        let loop_sink = sink.clone();
        let tick_loop = TickLoop::spawn("animator", tick, move |rx| {
            let mut frames = FrameBuilder::new(rand::thread_rng());
            let mut failing = false;
            let mut count = 0u64;
            while let Ok(Event::Tick) = rx.recv() {
                let frame = frames.frame(count, &modes.snapshot());
                trace!("frame {:04x} lit {:?}", frame, bit::frame_to_slots(frame));
                render(&mut *loop_sink.lock(), frame, &mut failing);
                count = count.wrapping_add(1);
            }
            render(&mut *loop_sink.lock(), 0, &mut failing);
        })?;
        Ok(Animator { tick_loop, sink })
    }

    /// Stop rendering; the loop blanks the indicators on its way out. If it
    /// does not finish in time the indicators are blanked from here instead,
    /// and the loop may still overwrite them until the process exits.
    pub fn stop(self, timeout: Duration) -> bool {
        if self.tick_loop.stop(timeout) {
            return true;
        }
        match self.sink.try_lock_for(BLANK_WAIT) {
            Some(mut sink) => {
                if let Err(e) = sink.render(0) {
                    warn!("blanking indicators failed: {}", e);
                }
            }
            None => warn!("indicator output busy; LEDs left as they were"),
        }
        false
    }
}

/// Render a frame, logging only the first of a run of failures
fn render(sink: &mut dyn FrameSink, frame: u16, failing: &mut bool) {
    match sink.render(frame) {
        Ok(()) => {
            if *failing {
                info!("indicator output recovered");
                *failing = false;
            }
        }
        Err(e) => {
            if !*failing {
                warn!("indicator output failed: {}", e);
                *failing = true;
            }
        }
    }
}
