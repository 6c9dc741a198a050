//! Scale controller properties driven through deterministic time.

use std::collections::{BTreeMap, BTreeSet};
use std::time::{Duration, Instant};

use nosemirror_core::{ScaleConfig, ScaleController};
use nosemirror_models::IdentityId;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const FRAME: f64 = 1.0 / 30.0;

fn controller() -> ScaleController {
    ScaleController::new(ScaleConfig::default()).unwrap()
}

fn live(ids: &[IdentityId]) -> BTreeSet<IdentityId> {
    ids.iter().copied().collect()
}

fn score(id: IdentityId, raw: f64) -> BTreeMap<IdentityId, f64> {
    [(id, raw)].into_iter().collect()
}

fn at(t0: Instant, secs: f64) -> Instant {
    t0 + Duration::from_secs_f64(secs)
}

/// Feed `raw` at 30 fps for frames `first..=last`, returning the scales.
fn feed(
    controller: &mut ScaleController,
    t0: Instant,
    id: IdentityId,
    raw: f64,
    frames: std::ops::RangeInclusive<u32>,
) -> Vec<f64> {
    let set = live(&[id]);
    frames
        .map(|k| controller.update_at(&set, &score(id, raw), at(t0, k as f64 * FRAME))[&id])
        .collect()
}

#[test]
fn test_scale_bounds_under_random_input() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let config = ScaleConfig::default();

    for run in 0..20 {
        let mut controller = controller();
        let t0 = Instant::now();
        let mut t = 0.0;

        for _ in 0..1_000 {
            t += rng.random_range(0.0..0.5);
            let mut ids = BTreeSet::new();
            let mut scores = BTreeMap::new();
            for id in 0..4 {
                if rng.random_bool(0.8) {
                    ids.insert(id);
                    let raw = match rng.random_range(0..10) {
                        0 => f64::NAN,
                        1 => rng.random_range(-1.0..2.0),
                        _ => rng.random_range(0.0..1.0),
                    };
                    scores.insert(id, raw);
                }
            }

            for (id, scale) in controller.update_at(&ids, &scores, at(t0, t)) {
                assert!(
                    (config.scale_min..=config.scale_max).contains(&scale),
                    "run {} identity {} left bounds: {}",
                    run,
                    id,
                    scale
                );
            }
        }
    }
}

#[test]
fn test_fresh_identity_never_grows_during_calibration() {
    let mut rng = StdRng::seed_from_u64(42);
    let mut controller = controller();
    let t0 = Instant::now();
    let ids = live(&[0]);

    let mut t = 0.0;
    let mut previous = f64::INFINITY;
    while t < 1.99 {
        let raw = rng.random_range(0.0..1.0);
        let scale = controller.update_at(&ids, &score(0, raw), at(t0, t))[&0];
        assert!(scale <= previous, "scale grew at t={}: {} > {}", t, scale, previous);
        previous = scale;
        t += rng.random_range(0.001..0.05);
    }
    assert!(!controller.person(0).unwrap().engaged);
}

#[test]
fn test_restored_identity_only_decays_during_calibration() {
    let mut controller = controller();
    let t0 = Instant::now();

    // Grow identity 2 well above the minimum
    feed(&mut controller, t0, 2, 0.0, 0..=63);
    let grown = feed(&mut controller, t0, 2, 0.9, 64..=104);
    let peak = *grown.last().unwrap();
    assert!(peak > 3.0, "expected growth, got {}", peak);

    // Brief absence, then back with a full smile
    controller.update_at(&BTreeSet::new(), &BTreeMap::new(), at(t0, 105.0 * FRAME));
    let scales = feed(&mut controller, t0, 2, 1.0, 110..=160);
    assert!(scales[0] > 3.0, "retained scale should seed the return: {}", scales[0]);
    for pair in scales.windows(2) {
        assert!(pair[1] <= pair[0], "scale grew during calibration: {:?}", pair);
    }
}

#[test]
fn test_narrow_oscillation_never_engages() {
    let mut controller = controller();
    let t0 = Instant::now();
    let ids = live(&[0]);

    for k in 0..600 {
        let raw = if k % 2 == 0 { 0.28 } else { 0.32 };
        let scale = controller.update_at(&ids, &score(0, raw), at(t0, k as f64 * FRAME))[&0];
        let person = controller.person(0).unwrap();
        assert!(!person.engaged, "engaged on flicker at frame {}", k);
        assert_eq!(scale, 2.0);
    }
}

#[test]
fn test_decay_independent_of_call_frequency() {
    let mut controller = controller();
    let t0 = Instant::now();

    feed(&mut controller, t0, 0, 0.0, 0..=63);
    feed(&mut controller, t0, 0, 0.9, 64..=104);
    let released = feed(&mut controller, t0, 0, 0.0, 105..=124);

    let before = *released.last().unwrap();
    assert!(before > 3.0, "needs headroom above the minimum: {}", before);
    let t_end = 124.0 * FRAME;

    let ids = live(&[0]);
    let zero = score(0, 0.0);

    let mut coarse = controller.clone();
    let one_step = coarse.update_at(&ids, &zero, at(t0, t_end + 1.0))[&0];

    let mut fine = controller.clone();
    let mut last = before;
    for i in 1..=10 {
        let scale = fine.update_at(&ids, &zero, at(t0, t_end + i as f64 * 0.1))[&0];
        assert!(scale < last, "decay must be monotonic");
        last = scale;
    }

    let expected = before - 0.6;
    assert!((one_step - expected).abs() < 1e-6, "single step: {} vs {}", one_step, expected);
    assert!((last - expected).abs() < 1e-6, "ten steps: {} vs {}", last, expected);
}

#[test]
fn test_decay_stops_at_minimum() {
    let mut controller = controller();
    let t0 = Instant::now();

    feed(&mut controller, t0, 0, 0.0, 0..=63);
    feed(&mut controller, t0, 0, 0.9, 64..=104);
    let scales = feed(&mut controller, t0, 0, 0.0, 105..=300);

    assert_eq!(*scales.last().unwrap(), 2.0);
    for pair in scales.windows(2) {
        assert!(pair[1] <= pair[0]);
    }
}

#[test]
fn test_release_on_relative_gate() {
    let mut controller = controller();
    let t0 = Instant::now();

    feed(&mut controller, t0, 0, 0.0, 0..=63);
    feed(&mut controller, t0, 0, 0.9, 64..=73);
    assert!(controller.person(0).unwrap().engaged);

    // Smoothed score falls through the hysteresis band
    for k in 74..=77 {
        feed(&mut controller, t0, 0, 0.0, k..=k);
        assert!(controller.person(0).unwrap().engaged, "released early at frame {}", k);
    }

    feed(&mut controller, t0, 0, 0.0, 78..=78);
    let person = controller.person(0).unwrap();
    assert!(!person.engaged);
    assert_eq!(person.on_streak, 0);
    // Still above the absolute off gate, so the baseline margin did it
    assert!(person.smoothed_score > controller.config().abs_off);
    assert!(person.smoothed_score < person.baseline + controller.config().delta_off);
}

#[test]
fn test_interrupted_streak_starts_over() {
    let config = ScaleConfig {
        score_alpha: 1.0,
        ..Default::default()
    };
    let mut controller = ScaleController::new(config).unwrap();
    let t0 = Instant::now();

    feed(&mut controller, t0, 0, 0.0, 0..=63);
    feed(&mut controller, t0, 0, 0.9, 64..=69);
    assert_eq!(controller.person(0).unwrap().on_streak, 6);

    feed(&mut controller, t0, 0, 0.0, 70..=70);
    assert_eq!(controller.person(0).unwrap().on_streak, 0);

    let scales = feed(&mut controller, t0, 0, 0.9, 71..=76);
    assert!(!controller.person(0).unwrap().engaged);
    assert!(scales.iter().all(|&s| s == 2.0));

    feed(&mut controller, t0, 0, 0.9, 77..=77);
    assert!(controller.person(0).unwrap().engaged, "seventh consecutive frame engages");
}
