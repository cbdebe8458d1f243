use banktools::mode::{FrameBuilder, IndicatorMode, FAST_TICKS};
use banktools::{bit, Slot, NUM_SLOTS};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn builder() -> FrameBuilder<StdRng> {
    FrameBuilder::new(StdRng::seed_from_u64(0x5eed))
}

#[test]
fn deterministic_modes() {
    let mut modes = [IndicatorMode::Off; NUM_SLOTS];
    modes[1] = IndicatorMode::On;
    modes[2] = IndicatorMode::BlinkFast;
    modes[3] = IndicatorMode::BlinkSlow;
    let mut frames = builder();
    for tick in 0..1000u64 {
        let frame = frames.frame(tick, &modes);
        assert!(!bit::is_lit(frame, Slot::SOURCE));
        assert!(bit::is_lit(frame, Slot::new(1).unwrap()));
        assert_eq!((tick / 5) % 2 == 0, bit::is_lit(frame, Slot::new(2).unwrap()));
        assert_eq!((tick / 100) % 2 == 1, bit::is_lit(frame, Slot::new(3).unwrap()));
        // Nothing else is lit
        assert_eq!(0, frame & !0b1110);
    }
}

#[test]
fn blink_phases() {
    // Fast blink starts lit, slow blink starts dark
    assert_eq!(Some(true), IndicatorMode::BlinkFast.lit_at(0));
    assert_eq!(Some(true), IndicatorMode::BlinkFast.lit_at(4));
    assert_eq!(Some(false), IndicatorMode::BlinkFast.lit_at(5));
    assert_eq!(Some(true), IndicatorMode::BlinkFast.lit_at(10));
    assert_eq!(Some(false), IndicatorMode::BlinkSlow.lit_at(0));
    assert_eq!(Some(false), IndicatorMode::BlinkSlow.lit_at(99));
    assert_eq!(Some(true), IndicatorMode::BlinkSlow.lit_at(100));
    assert_eq!(Some(false), IndicatorMode::BlinkSlow.lit_at(200));
    assert_eq!(None, IndicatorMode::DataActivity.lit_at(0));
}

#[test]
fn data_activity_changes_only_on_redraw_ticks() {
    let modes = [IndicatorMode::DataActivity; NUM_SLOTS];
    let mut frames = builder();
    let mut last = frames.frame(0, &modes);
    let mut changed = 0;
    for tick in 1..5000u64 {
        let frame = frames.frame(tick, &modes);
        if tick % FAST_TICKS != 0 {
            assert_eq!(last, frame, "changed off a redraw tick at {}", tick);
        } else if frame != last {
            changed += 1;
        }
        last = frame;
    }
    // 16 independent coin flips per redraw: a stuck frame means no randomness
    assert!(changed > 900);
}

#[test]
fn data_activity_is_per_slot() {
    let modes = [IndicatorMode::DataActivity; NUM_SLOTS];
    let mut frames = builder();
    let mut seen = [[false; 2]; NUM_SLOTS];
    for tick in (0..2000u64).step_by(FAST_TICKS as usize) {
        let frame = frames.frame(tick, &modes);
        for s in Slot::all() {
            seen[s.index()][bit::is_lit(frame, s) as usize] = true;
        }
    }
    assert!(seen.iter().all(|s| s[0] && s[1]));
}

#[test]
fn mode_change_takes_effect_next_frame() {
    let mut modes = [IndicatorMode::Off; NUM_SLOTS];
    let mut frames = builder();
    assert_eq!(0, frames.frame(7, &modes));
    modes[15] = IndicatorMode::On;
    assert_eq!(0x8000, frames.frame(8, &modes));
}
