use anyhow::{Context, Result};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::warn;

use crate::Event;

/// Send `Event::Tick` every `period` until the receiving loop goes away.
///
/// Deadlines advance by whole periods so the tick rate does not drift; if
/// the loop falls behind, the schedule restarts from now instead of
/// bursting to catch up.
pub fn main(period: Duration, tx: flume::Sender<Event>) -> Result<()> {
    std::thread::Builder::new()
        .name(String::from("timer"))
        .spawn(move || {
            let mut next = Instant::now();
            loop {
                next += period;
                let now = Instant::now();
                if next > now {
                    std::thread::sleep(next - now);
                } else {
                    next = now;
                }
                if tx.send(Event::Tick).is_err() {
                    break;
                }
            }
        })
        .context("spawning timer thread")?;
    Ok(())
}

/// A loop thread fed by its own timer, stoppable with a bounded wait
pub struct TickLoop {
    name: &'static str,
    tx: flume::Sender<Event>,
    done: flume::Receiver<()>,
    thread: Option<JoinHandle<()>>,
}

impl TickLoop {
    /// Run `body` on a new thread with the receiving end of a tick channel.
    /// `body` should return once it receives `Event::Stop`.
    pub fn spawn<F>(name: &'static str, period: Duration, body: F) -> Result<TickLoop>
    where
        F: FnOnce(flume::Receiver<Event>) + Send + 'static,
    {
        // Bounded so a slow loop gets fewer ticks rather than a backlog
        let (tx, rx) = flume::bounded(1);
        let (done_tx, done) = flume::bounded(1);
        let thread = std::thread::Builder::new()
            .name(String::from(name))
            .spawn(move || {
                body(rx);
                let _ = done_tx.send(());
            })
            .with_context(|| format!("spawning {} thread", name))?;
        main(period, tx.clone())?;
        Ok(TickLoop {
            name,
            tx,
            done,
            thread: Some(thread),
        })
    }

    /// Ask the loop to finish and wait up to `timeout` for it. Returns
    /// `false` if the loop was still running when the time ran out.
    pub fn stop(mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        // Fails if the loop already ended, which the done channel reports too
        let _ = self.tx.send_deadline(Event::Stop, deadline);
        match self.done.recv_deadline(deadline) {
            Err(flume::RecvTimeoutError::Timeout) => {
                warn!("{} loop did not stop within {:?}", self.name, timeout);
                false
            }
            _ => {
                if let Some(thread) = self.thread.take() {
                    if thread.join().is_err() {
                        warn!("{} loop panicked", self.name);
                    }
                }
                true
            }
        }
    }
}
