//! The SCAN and CLONE workflows.
//!
//! A [`Coordinator`] owns the bus and the programming tool. Requests come in
//! from the button handlers; each one first takes the busy latch with a
//! single compare-and-swap and only then starts a sweep thread, so two
//! presses can never start two sweeps. The latch is released by
//! [`SweepGuard`]'s `Drop`, which also covers a sweep that panics.

use bankio::{ChipId, SlotSelect};
use banktools::mode::IndicatorMode;
use banktools::size::HumanSize;
use banktools::{Slot, NUM_SLOTS};
use parking_lot::{Mutex, RwLock};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, error, info, info_span, warn};

use crate::archive;
use crate::indicators::ModeTable;
use crate::monitor::Handler;
use crate::probe::{probe, ProbeResult};
use crate::programmer::{Operation, Programmer};
use crate::Config;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum WorkflowState {
    Idle = 0,
    Scanning = 1,
    Cloning = 2,
}

impl WorkflowState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => WorkflowState::Scanning,
            2 => WorkflowState::Cloning,
            _ => WorkflowState::Idle,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Request {
    /// Probe every slot and classify against slot 0
    Check,
    /// Copy slot 0 to every slot holding a chip of the same size
    Write,
}

impl Request {
    fn state(self) -> WorkflowState {
        match self {
            Request::Check => WorkflowState::Scanning,
            Request::Write => WorkflowState::Cloning,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Request::Check => "CHECK",
            Request::Write => "WRITE",
        }
    }
}

/// One probe per slot; `None` where the slot was never probed
pub type ScanResults = [Option<ProbeResult>; NUM_SLOTS];

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SlotOutcome {
    Cloned,
    Absent,
    SizeMismatch,
    WriteFailed,
    VerifyFailed,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CloneReport {
    /// Length of the image read from slot 0; `None` if the read failed
    pub source_size: Option<u64>,
    pub outcomes: Vec<(Slot, SlotOutcome)>,
}

impl CloneReport {
    pub fn ok(&self) -> usize {
        self.count(|o| o == SlotOutcome::Cloned)
    }

    pub fn failed(&self) -> usize {
        self.count(|o| {
            matches!(
                o,
                SlotOutcome::SizeMismatch | SlotOutcome::WriteFailed | SlotOutcome::VerifyFailed
            )
        })
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| o == SlotOutcome::Absent)
    }

    pub fn outcome(&self, slot: Slot) -> Option<SlotOutcome> {
        self.outcomes
            .iter()
            .find(|(s, _)| *s == slot)
            .map(|(_, o)| *o)
    }

    fn count<F: Fn(SlotOutcome) -> bool>(&self, f: F) -> usize {
        self.outcomes.iter().filter(|(_, o)| f(*o)).count()
    }
}

#[derive(Clone, Debug)]
pub enum SweepReport {
    Scan(Arc<ScanResults>),
    Clone(CloneReport),
}

/// Holds the busy latch; dropping it returns the coordinator to idle
pub struct SweepGuard {
    latch: Arc<AtomicU8>,
    request: Request,
}

impl Drop for SweepGuard {
    fn drop(&mut self) {
        self.latch
            .store(WorkflowState::Idle as u8, Ordering::Release);
        debug!("{} sweep finished, idle", self.request.name());
    }
}

pub struct Coordinator {
    bus: Mutex<Box<dyn SlotSelect>>,
    programmer: Arc<dyn Programmer>,
    chip_id: Mutex<Option<Box<dyn ChipId>>>,
    modes: ModeTable,
    latch: Arc<AtomicU8>,
    last_scan: RwLock<Option<Arc<ScanResults>>>,
    image: PathBuf,
    archive_dir: PathBuf,
}

impl Coordinator {
    pub fn new(
        bus: Box<dyn SlotSelect>,
        programmer: Arc<dyn Programmer>,
        modes: ModeTable,
        cfg: &Config,
    ) -> Self {
        Coordinator {
            bus: Mutex::new(bus),
            programmer,
            chip_id: Mutex::new(None),
            modes,
            latch: Arc::new(AtomicU8::new(WorkflowState::Idle as u8)),
            last_scan: RwLock::new(None),
            image: cfg.image.clone(),
            archive_dir: cfg.archive_dir.clone(),
        }
    }

    /// Log the chip's JEDEC and unique IDs before each source read
    pub fn with_chip_id(self, chip_id: Box<dyn ChipId>) -> Self {
        *self.chip_id.lock() = Some(chip_id);
        self
    }

    pub fn state(&self) -> WorkflowState {
        WorkflowState::from_u8(self.latch.load(Ordering::Acquire))
    }

    /// Results of the last completed SCAN
    pub fn last_scan(&self) -> Option<Arc<ScanResults>> {
        self.last_scan.read().clone()
    }

    pub fn modes(&self) -> &ModeTable {
        &self.modes
    }

    /// Take the busy latch for `req`, or `None` if a sweep is already running
    pub fn try_begin(&self, req: Request) -> Option<SweepGuard> {
        self.latch
            .compare_exchange(
                WorkflowState::Idle as u8,
                req.state() as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .ok()
            .map(|_| SweepGuard {
                latch: self.latch.clone(),
                request: req,
            })
    }

    /// Start `req` on its own thread. Rejected (and logged) while busy.
    pub fn dispatch(self: &Arc<Self>, req: Request) -> Option<JoinHandle<SweepReport>> {
        let guard = match self.try_begin(req) {
            Some(guard) => guard,
            None => {
                warn!("busy ({:?}); {} ignored", self.state(), req.name());
                return None;
            }
        };
        let this = self.clone();
        let spawned = std::thread::Builder::new()
            .name(String::from(match req {
                Request::Check => "scan",
                Request::Write => "clone",
            }))
            .spawn(move || {
                let _guard = guard;
                this.sweep(req)
            });
        match spawned {
            Ok(handle) => Some(handle),
            Err(e) => {
                error!("could not start {} sweep: {}", req.name(), e);
                None
            }
        }
    }

    /// Run `req` on the calling thread. Rejected (and logged) while busy.
    pub fn run(&self, req: Request) -> Option<SweepReport> {
        match self.try_begin(req) {
            Some(_guard) => Some(self.sweep(req)),
            None => {
                warn!("busy ({:?}); {} ignored", self.state(), req.name());
                None
            }
        }
    }

    /// A button handler dispatching `req`
    pub fn handler(self: &Arc<Self>, req: Request) -> Handler {
        let this = self.clone();
        Box::new(move || {
            this.dispatch(req);
        })
    }

    fn sweep(&self, req: Request) -> SweepReport {
        match req {
            Request::Check => {
                let _span = info_span!("scan").entered();
                SweepReport::Scan(self.scan())
            }
            Request::Write => {
                let _span = info_span!("clone").entered();
                SweepReport::Clone(self.clone_all())
            }
        }
    }

    fn select(&self, slot: Slot) {
        if let Err(e) = self.bus.lock().select(slot) {
            warn!(%slot, "selecting slot failed: {}", e);
        }
    }

    fn probe_slot(&self, slot: Slot) -> ProbeResult {
        self.select(slot);
        probe(&*self.programmer, None)
    }

    fn scan(&self) -> Arc<ScanResults> {
        info!("scanning all slots");
        let mut results: ScanResults = Default::default();
        self.modes.set_all(IndicatorMode::Off);

        let source = self.probe_slot(Slot::SOURCE);
        if !source.found {
            warn!(slot = %Slot::SOURCE, "no source chip; nothing to compare against");
            self.modes.set(Slot::SOURCE, IndicatorMode::BlinkFast);
            results[0] = Some(source);
            return self.store_scan(results);
        }
        info!(
            slot = %Slot::SOURCE,
            "source {} ({})",
            source.name(),
            source.human_size()
        );
        self.modes.set(
            Slot::SOURCE,
            match source.size_bytes {
                Some(_) => IndicatorMode::On,
                None => IndicatorMode::BlinkFast,
            },
        );
        let reference = source.size_bytes;
        results[0] = Some(source);

        for slot in Slot::targets() {
            let res = self.probe_slot(slot);
            let mode = classify(&res, reference);
            match mode {
                IndicatorMode::Off => info!(%slot, "empty"),
                IndicatorMode::BlinkSlow => {
                    info!(%slot, "{} ({}) matches", res.name(), res.human_size())
                }
                _ => warn!(
                    %slot,
                    "{} ({}) does not match source ({})",
                    res.name(),
                    res.human_size(),
                    HumanSize(reference)
                ),
            }
            self.modes.set(slot, mode);
            results[slot.index()] = Some(res);
        }
        let matching = results[1..]
            .iter()
            .flatten()
            .filter(|r| classify(r, reference) == IndicatorMode::BlinkSlow)
            .count();
        info!("scan done: {} matching target(s)", matching);
        self.store_scan(results)
    }

    fn store_scan(&self, results: ScanResults) -> Arc<ScanResults> {
        let results = Arc::new(results);
        *self.last_scan.write() = Some(results.clone());
        results
    }

    fn clone_all(&self) -> CloneReport {
        let snapshot = self.last_scan();
        let mut report = CloneReport::default();

        let size = match self.acquire_source() {
            Some(size) => size,
            None => return report,
        };
        report.source_size = Some(size);
        info!("source image is {}", HumanSize(Some(size)));

        self.preclear(snapshot.as_deref(), size);

        for slot in Slot::targets() {
            let known = snapshot
                .as_deref()
                .and_then(|scan| scan[slot.index()].as_ref());
            let outcome = self.clone_slot(slot, known, size);
            report.outcomes.push((slot, outcome));
        }

        info!(
            "clone done: {} ok, {} failed, {} skipped",
            report.ok(),
            report.failed(),
            report.skipped()
        );
        report
    }

    /// Read slot 0 into the working image. Returns the image length.
    fn acquire_source(&self) -> Option<u64> {
        let slot = Slot::SOURCE;
        self.select(slot);
        if let Some(chip_id) = self.chip_id.lock().as_mut() {
            match chip_id.identify() {
                Ok(ident) => {
                    info!(%slot, "{}", ident);
                    if let Some(uid) = ident.uid64() {
                        info!(%slot, "UID {}", uid);
                    }
                }
                Err(e) => debug!(%slot, "chip identification failed: {}", e),
            }
        }
        if let Err(e) = remove_stale(&self.image) {
            warn!("removing stale image {}: {}", self.image.display(), e);
        }

        self.modes.set(slot, IndicatorMode::DataActivity);
        info!(%slot, "reading source into {}", self.image.display());
        let run = self.programmer.run(Operation::Read(&self.image));
        let size = match fs::metadata(&self.image) {
            Ok(meta) if run.success() => Some(meta.len()),
            Ok(_) => None,
            Err(e) => {
                debug!("image not readable: {}", e);
                None
            }
        };
        let size = match size {
            Some(size) => size,
            None => {
                error!(%slot, status = ?run.status, "source read failed; clone aborted");
                self.modes.set(slot, IndicatorMode::BlinkFast);
                return None;
            }
        };

        match archive::store(&self.image, &self.archive_dir) {
            Ok(path) => info!("archived source image as {}", path.display()),
            Err(e) => warn!("archiving source image failed: {:#}", e),
        }
        self.modes.set(slot, IndicatorMode::On);
        Some(size)
    }

    /// Turn off the indicators of every target about to be written
    fn preclear(&self, snapshot: Option<&ScanResults>, size: u64) {
        let usable = snapshot.filter(|scan| {
            scan[0]
                .as_ref()
                .map_or(false, |src| src.found && src.size_bytes == Some(size))
        });
        match usable {
            Some(scan) => {
                for slot in Slot::targets() {
                    if scan[slot.index()]
                        .as_ref()
                        .map_or(false, |r| r.matches(size))
                    {
                        self.modes.set(slot, IndicatorMode::Off);
                    }
                }
            }
            None => {
                debug!("no usable scan; probing targets before writing");
                for slot in Slot::targets() {
                    if self.probe_slot(slot).matches(size) {
                        self.modes.set(slot, IndicatorMode::Off);
                    }
                }
            }
        }
    }

    fn clone_slot(&self, slot: Slot, known: Option<&ProbeResult>, size: u64) -> SlotOutcome {
        self.select(slot);
        let fresh;
        let res = match known {
            Some(res) => res,
            None => {
                fresh = probe(&*self.programmer, None);
                &fresh
            }
        };
        if !res.found {
            info!(%slot, "no chip; skipped");
            self.modes.set(slot, IndicatorMode::Off);
            return SlotOutcome::Absent;
        }
        if !res.matches(size) {
            warn!(
                %slot,
                "{} ({}) does not fit a {} image; not written",
                res.name(),
                res.human_size(),
                HumanSize(Some(size))
            );
            self.modes.set(slot, IndicatorMode::BlinkFast);
            return SlotOutcome::SizeMismatch;
        }

        self.modes.set(slot, IndicatorMode::DataActivity);
        info!(%slot, "writing {}", res.name());
        let write = self.programmer.run(Operation::Write(&self.image));
        if !write.success() {
            warn!(%slot, status = ?write.status, "write failed");
            self.modes.set(slot, IndicatorMode::BlinkFast);
            return SlotOutcome::WriteFailed;
        }
        let verify = self.programmer.run(Operation::Verify(&self.image));
        if !verify.success() {
            warn!(%slot, status = ?verify.status, "verify failed");
            self.modes.set(slot, IndicatorMode::BlinkFast);
            return SlotOutcome::VerifyFailed;
        }
        info!(%slot, "cloned and verified");
        self.modes.set(slot, IndicatorMode::On);
        SlotOutcome::Cloned
    }
}

/// Indicator mode of a target relative to the source size
pub fn classify(res: &ProbeResult, reference: Option<u64>) -> IndicatorMode {
    if !res.found {
        IndicatorMode::Off
    } else if reference.map_or(false, |size| res.matches(size)) {
        IndicatorMode::BlinkSlow
    } else {
        IndicatorMode::BlinkFast
    }
}

fn remove_stale(path: &Path) -> std::io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn found(size: Option<u64>) -> ProbeResult {
        ProbeResult {
            found: true,
            device_name: Some(String::from("W25Q32.V")),
            size_bytes: size,
            raw_output: String::new(),
        }
    }

    #[test]
    fn classification() {
        let s = 4 << 20;
        assert_eq!(IndicatorMode::Off, classify(&ProbeResult::default(), Some(s)));
        assert_eq!(IndicatorMode::BlinkSlow, classify(&found(Some(s)), Some(s)));
        assert_eq!(IndicatorMode::BlinkFast, classify(&found(Some(s * 2)), Some(s)));
        assert_eq!(IndicatorMode::BlinkFast, classify(&found(None), Some(s)));
        assert_eq!(IndicatorMode::BlinkFast, classify(&found(Some(s)), None));
    }

    #[test]
    fn report_counts() {
        let slot = |i| Slot::new(i).unwrap();
        let report = CloneReport {
            source_size: Some(1024),
            outcomes: vec![
                (slot(1), SlotOutcome::Cloned),
                (slot(2), SlotOutcome::Absent),
                (slot(3), SlotOutcome::SizeMismatch),
                (slot(4), SlotOutcome::WriteFailed),
                (slot(5), SlotOutcome::VerifyFailed),
            ],
        };
        assert_eq!(1, report.ok());
        assert_eq!(3, report.failed());
        assert_eq!(1, report.skipped());
        assert_eq!(Some(SlotOutcome::Absent), report.outcome(slot(2)));
        assert_eq!(None, report.outcome(slot(9)));
    }

    #[test]
    fn missing_stale_image_is_fine() {
        let dir = tempfile::tempdir().unwrap();
        assert!(remove_stale(&dir.path().join("card.bin")).is_ok());
    }
}
