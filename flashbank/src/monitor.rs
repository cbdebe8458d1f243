use anyhow::Result;
use banktools::debounce::{Debouncer, Edge, Level};
use embedded_hal::digital::InputPin;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::timer::TickLoop;
use crate::Event;

/// Called on the monitor thread for every debounced press. Must return
/// quickly: polling is paused while it runs.
pub type Handler = Box<dyn FnMut() + Send>;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Button {
    Check,
    Write,
}

/// Polls the CHECK and WRITE buttons and fires a handler per press
pub struct InputMonitor {
    tick_loop: TickLoop,
}

impl InputMonitor {
    /// `buttons` in CHECK, WRITE order
    pub fn start<P>(
        buttons: [P; 2],
        poll: Duration,
        debounce: Duration,
        on_check: Handler,
        on_write: Handler,
    ) -> Result<InputMonitor>
    where
        P: InputPin + Send + 'static,
    {
        let [check, write] = buttons;
        let mut inputs = [
            Input::new(Button::Check, check, debounce, on_check),
            Input::new(Button::Write, write, debounce, on_write),
        ];
        let tick_loop = TickLoop::spawn("inputs", poll, move |rx| {
            while let Ok(Event::Tick) = rx.recv() {
                let now = Instant::now();
                for input in inputs.iter_mut() {
                    input.poll(now);
                }
            }
        })?;
        Ok(InputMonitor { tick_loop })
    }

    pub fn stop(self, timeout: Duration) -> bool {
        self.tick_loop.stop(timeout)
    }
}

struct Input<P> {
    button: Button,
    pin: P,
    debouncer: Debouncer,
    handler: Handler,
    failing: bool,
}

impl<P: InputPin> Input<P> {
    fn new(button: Button, pin: P, debounce: Duration, handler: Handler) -> Self {
        Input {
            button,
            pin,
            debouncer: Debouncer::new(debounce),
            handler,
            failing: false,
        }
    }

    fn poll(&mut self, now: Instant) {
        let raw = match self.pin.is_low() {
            Ok(low) => {
                if self.failing {
                    info!(button = ?self.button, "input line readable again");
                    self.failing = false;
                }
                Level::from_line_low(low)
            }
            Err(e) => {
                if !self.failing {
                    warn!(button = ?self.button, "reading input line failed: {:?}", e);
                    self.failing = true;
                }
                return;
            }
        };
        match self.debouncer.update(raw, now) {
            Some(Edge::Press) => {
                debug!(button = ?self.button, "pressed");
                (self.handler)();
            }
            Some(Edge::Release) => debug!(button = ?self.button, "released"),
            None => {}
        }
    }
}
