//! Runs the external programming tool.
//!
//! Every run is synchronous with an explicit timeout. Standard output and
//! standard error are merged line by line into one string; for the long
//! operations (read, write, verify) each line is also logged as it arrives
//! so progress shows up on the console. A run that times out is killed and
//! reported as a failure like any other.

use banktools::speed::BusSpeed;
use std::ffi::OsString;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::{Config, ToolTimeouts};

#[derive(Clone, Copy, Debug)]
pub enum Operation<'a> {
    /// Probe the selected chip, optionally forcing a chip model
    Identify { hint: Option<&'a str> },
    Read(&'a Path),
    Write(&'a Path),
    Verify(&'a Path),
}

impl Operation<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Identify { .. } => "identify",
            Operation::Read(_) => "read",
            Operation::Write(_) => "write",
            Operation::Verify(_) => "verify",
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ToolStatus {
    Success,
    /// Non-zero exit, or killed by a signal (`None`)
    Exit(Option<i32>),
    TimedOut,
    /// The tool could not be started at all
    Spawn(String),
}

#[derive(Clone, Debug)]
pub struct ToolRun {
    pub status: ToolStatus,
    pub output: String,
}

impl ToolRun {
    pub fn success(&self) -> bool {
        self.status == ToolStatus::Success
    }
}

/// The device-programming collaborator, acting on whichever slot is
/// currently selected on the bus
pub trait Programmer: Send + Sync {
    fn run(&self, op: Operation<'_>) -> ToolRun;
}

/// flashrom driving the SPI bus through a Linux programmer
pub struct Flashrom {
    tool: String,
    programmer: String,
    speed: BusSpeed,
    chip: Option<String>,
    timeouts: ToolTimeouts,
}

impl Flashrom {
    pub fn new(cfg: &Config, speed: BusSpeed) -> Self {
        Flashrom {
            tool: cfg.tool.clone(),
            programmer: cfg.programmer.clone(),
            speed,
            chip: cfg.chip.clone(),
            timeouts: cfg.timeouts,
        }
    }

    /// Programmer string with the bus clock appended
    pub fn programmer_arg(&self) -> String {
        format!("{},spispeed={}", self.programmer, self.speed.khz())
    }

    pub fn args(&self, op: Operation<'_>) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["-p".into(), self.programmer_arg().into()];
        let chip = match op {
            Operation::Identify { hint } => hint.or(self.chip.as_deref()),
            Operation::Read(path) => {
                args.extend([OsString::from("-r"), path.as_os_str().to_owned()]);
                self.chip.as_deref()
            }
            Operation::Write(path) => {
                args.extend([OsString::from("-w"), path.as_os_str().to_owned()]);
                self.chip.as_deref()
            }
            Operation::Verify(path) => {
                args.extend([OsString::from("--verify"), path.as_os_str().to_owned()]);
                self.chip.as_deref()
            }
        };
        if let Some(chip) = chip {
            args.extend([OsString::from("-c"), OsString::from(chip)]);
        }
        args
    }

    fn timeout(&self, op: Operation<'_>) -> Duration {
        match op {
            Operation::Identify { .. } => self.timeouts.identify,
            Operation::Read(_) => self.timeouts.read,
            Operation::Write(_) => self.timeouts.write,
            Operation::Verify(_) => self.timeouts.verify,
        }
    }
}

impl Programmer for Flashrom {
    fn run(&self, op: Operation<'_>) -> ToolRun {
        let mut cmd = Command::new(&self.tool);
        cmd.args(self.args(op));
        let stream = !matches!(op, Operation::Identify { .. });
        debug!(op = op.name(), "running {:?}", cmd);
        run_command(cmd, self.timeout(op), op.name(), stream)
    }
}

/// Run `cmd` to completion or until `timeout`, collecting both output
/// streams. With `stream` set, every line is logged at info level as it
/// arrives.
pub fn run_command(mut cmd: Command, timeout: Duration, label: &str, stream: bool) -> ToolRun {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            return ToolRun {
                status: ToolStatus::Spawn(e.to_string()),
                output: String::new(),
            }
        }
    };
    let deadline = Instant::now() + timeout;

    let (tx, rx) = flume::unbounded();
    if let Some(out) = child.stdout.take() {
        forward_lines(out, tx.clone());
    }
    if let Some(err) = child.stderr.take() {
        forward_lines(err, tx.clone());
    }
    drop(tx);

    let mut output = String::new();
    let mut timed_out = false;
    loop {
        match rx.recv_deadline(deadline) {
            Ok(line) => {
                if stream {
                    info!("[{}] {}", label, line);
                } else {
                    debug!("[{}] {}", label, line);
                }
                output.push_str(&line);
                output.push('\n');
            }
            // Both pipes closed
            Err(flume::RecvTimeoutError::Disconnected) => break,
            Err(flume::RecvTimeoutError::Timeout) => {
                timed_out = true;
                break;
            }
        }
    }

    let status = if timed_out {
        None
    } else {
        wait_until(&mut child, deadline)
    };
    let status = match status {
        Some(s) if s.success() => ToolStatus::Success,
        Some(s) => ToolStatus::Exit(s.code()),
        None => {
            let _ = child.kill();
            let _ = child.wait();
            ToolStatus::TimedOut
        }
    };
    ToolRun { status, output }
}

/// Wait for the child to exit, giving up at `deadline`
fn wait_until(child: &mut Child, deadline: Instant) -> Option<ExitStatus> {
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Some(status),
            Ok(None) if Instant::now() < deadline => {
                std::thread::sleep(Duration::from_millis(10));
            }
            _ => return None,
        }
    }
}

fn forward_lines<R: Read + Send + 'static>(reader: R, tx: flume::Sender<String>) {
    std::thread::spawn(move || {
        for line in BufReader::new(reader).lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
    });
}
