#![allow(dead_code)]

use bankio::{ChipId, ChipIdent, FrameSink, HwError, SlotSelect};
use banktools::{Slot, NUM_SLOTS};
use flashbank::programmer::{Operation, Programmer, ToolRun, ToolStatus};
use flashbank::Config;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const KIB: u64 = 1024;

/// The slot the fake bus last addressed, seen by the fake programmer
pub type Selected = Arc<Mutex<Option<Slot>>>;

pub fn slot(i: u8) -> Slot {
    Slot::new(i).unwrap()
}

pub fn config(dir: &Path) -> Config {
    Config {
        image: dir.join("card.bin"),
        archive_dir: dir.join("CardArchive"),
        ..Config::default()
    }
}

#[derive(Default)]
pub struct FakeBus {
    pub selected: Selected,
}

impl SlotSelect for FakeBus {
    fn select(&mut self, slot: Slot) -> Result<(), HwError> {
        *self.selected.lock().unwrap() = Some(slot);
        Ok(())
    }

    fn selected(&self) -> Option<Slot> {
        *self.selected.lock().unwrap()
    }
}

/// Pauses the first identify call until the release sender is dropped
pub struct Gate {
    pub entered: flume::Sender<()>,
    pub release: flume::Receiver<()>,
}

/// A bank of simulated chips behind a simulated programming tool
pub struct FakeProgrammer {
    pub selected: Selected,
    /// Chip size per slot, `None` for an empty slot
    pub chips: [Option<u64>; NUM_SLOTS],
    pub read_ok: bool,
    pub content: Vec<u8>,
    pub failing_writes: Vec<Slot>,
    pub failing_verifies: Vec<Slot>,
    pub gate: Option<Gate>,
    /// Panic on the first operation with this name
    pub panic_on: Option<&'static str>,
    pub calls: Mutex<Vec<(Option<Slot>, &'static str)>>,
}

impl FakeProgrammer {
    pub fn new(selected: &Selected, chips: &[(u8, u64)]) -> Self {
        let mut sizes = [None; NUM_SLOTS];
        for &(i, size) in chips {
            sizes[i as usize] = Some(size);
        }
        let content = sizes[0]
            .map(|size| (0..size).map(|i| (i % 251) as u8).collect())
            .unwrap_or_default();
        FakeProgrammer {
            selected: selected.clone(),
            chips: sizes,
            read_ok: true,
            content,
            failing_writes: Vec::new(),
            failing_verifies: Vec::new(),
            gate: None,
            panic_on: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn count(&self, op: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, name)| *name == op)
            .count()
    }

    pub fn slots(&self, op: &str) -> Vec<Slot> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, name)| *name == op)
            .filter_map(|(slot, _)| *slot)
            .collect()
    }
}

fn ok(output: String) -> ToolRun {
    ToolRun {
        status: ToolStatus::Success,
        output,
    }
}

fn failed(output: &str) -> ToolRun {
    ToolRun {
        status: ToolStatus::Exit(Some(1)),
        output: output.to_owned(),
    }
}

impl Programmer for FakeProgrammer {
    fn run(&self, op: Operation<'_>) -> ToolRun {
        let slot = *self.selected.lock().unwrap();
        self.calls.lock().unwrap().push((slot, op.name()));
        if self.panic_on == Some(op.name()) {
            panic!("simulated tool crash");
        }
        let chip = slot.and_then(|s| self.chips[s.index()]);
        match op {
            Operation::Identify { .. } => {
                if let Some(gate) = &self.gate {
                    let _ = gate.entered.send(());
                    let _ = gate.release.recv();
                }
                match (slot, chip) {
                    (Some(s), Some(size)) => ok(format!(
                        "Found Fake flash chip \"FAKE{}\" ({} kB, SPI) on linux_spi.\n",
                        s.index(),
                        size / KIB
                    )),
                    _ => failed("No EEPROM/flash device found.\n"),
                }
            }
            Operation::Read(path) => {
                if self.read_ok && chip.is_some() {
                    std::fs::write(path, &self.content).unwrap();
                    ok(String::from("Reading flash... done.\n"))
                } else {
                    failed("Reading flash... FAILED.\n")
                }
            }
            Operation::Write(_) => match slot {
                Some(s) if chip.is_some() && !self.failing_writes.contains(&s) => {
                    ok(String::from("Writing flash... done.\n"))
                }
                _ => failed("Writing flash... FAILED.\n"),
            },
            Operation::Verify(_) => match slot {
                Some(s) if chip.is_some() && !self.failing_verifies.contains(&s) => {
                    ok(String::from("Verifying flash... VERIFIED.\n"))
                }
                _ => failed("Verifying flash... FAILED.\n"),
            },
        }
    }
}

/// Counts identify calls and answers with a fixed JEDEC ID
pub struct FakeChipId(pub Arc<AtomicUsize>);

impl ChipId for FakeChipId {
    fn identify(&mut self) -> Result<ChipIdent, HwError> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(ChipIdent {
            jedec: [0xEF, 0x40, 0x16],
            uid: None,
        })
    }
}

/// Keeps every rendered frame
#[derive(Clone, Default)]
pub struct FrameLog(pub Arc<Mutex<Vec<u16>>>);

impl FrameSink for FrameLog {
    fn render(&mut self, frame: u16) -> Result<(), HwError> {
        self.0.lock().unwrap().push(frame);
        Ok(())
    }
}
