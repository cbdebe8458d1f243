use bankio::{FrameSink, HwError};
use banktools::mode::IndicatorMode;
use flashbank::animator::Animator;
use flashbank::indicators::ModeTable;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

mod common;
use common::{slot, FrameLog};

fn wait_for_frame(log: &FrameLog, frame: u16) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !log.0.lock().unwrap().contains(&frame) {
        assert!(Instant::now() < deadline, "frame {:04x} never rendered", frame);
        std::thread::sleep(Duration::from_millis(2));
    }
}

#[test]
fn renders_mode_table() {
    let log = FrameLog::default();
    let modes = ModeTable::new();
    modes.set(slot(3), IndicatorMode::On);
    let animator = Animator::start(log.clone(), modes.clone(), Duration::from_millis(1)).unwrap();

    wait_for_frame(&log, 0x0008);
    modes.set(slot(15), IndicatorMode::On);
    wait_for_frame(&log, 0x8008);

    assert!(animator.stop(Duration::from_secs(1)));
    let frames = log.0.lock().unwrap();
    assert_eq!(Some(&0), frames.last());
}

#[test]
fn blinks_between_frames() {
    let log = FrameLog::default();
    let modes = ModeTable::new();
    modes.set(slot(0), IndicatorMode::BlinkFast);
    let animator = Animator::start(log.clone(), modes, Duration::from_millis(1)).unwrap();

    wait_for_frame(&log, 0x0001);
    let seen = log.0.lock().unwrap().len();
    let deadline = Instant::now() + Duration::from_secs(5);
    while !log.0.lock().unwrap()[seen..].contains(&0) {
        assert!(Instant::now() < deadline, "BlinkFast never went dark");
        std::thread::sleep(Duration::from_millis(2));
    }
    assert!(animator.stop(Duration::from_secs(1)));
}

/// Takes `delay` per frame and notes whether the animator thread drew it
#[derive(Clone)]
struct SlowSink {
    delay: Duration,
    frames: Arc<Mutex<Vec<(bool, u16)>>>,
}

impl FrameSink for SlowSink {
    fn render(&mut self, frame: u16) -> Result<(), HwError> {
        std::thread::sleep(self.delay);
        let from_loop = std::thread::current().name() == Some("animator");
        self.frames.lock().unwrap().push((from_loop, frame));
        Ok(())
    }
}

#[test]
fn blanks_when_stop_times_out() {
    let sink = SlowSink {
        delay: Duration::from_millis(100),
        frames: Default::default(),
    };
    let modes = ModeTable::new();
    modes.set_all(IndicatorMode::On);
    let animator = Animator::start(sink.clone(), modes, Duration::from_millis(1)).unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    while sink.frames.lock().unwrap().is_empty() {
        assert!(Instant::now() < deadline, "nothing rendered");
        std::thread::sleep(Duration::from_millis(2));
    }

    assert!(!animator.stop(Duration::from_millis(1)));
    let frames = sink.frames.lock().unwrap();
    assert!(frames.contains(&(true, 0xFFFF)));
    assert!(frames.contains(&(false, 0)));
}
