//! Smile-gated overlay scale control.
//!
//! Each live identity carries a small state machine fed by its raw smile
//! score:
//!
//! ```text
//!  raw score ──► EMA ──► smoothed ──┬──► candidate-on / candidate-off gates
//!                                   │          │
//!                  (while OFF only) ▼          ▼
//!                       baseline, noise    OFF ◄──► ON   (debounced, hysteresis)
//!                                              │
//!                                              ▼
//!                         scale += excess · rate_up · dt   (ON and candidate-on)
//!                         scale -= rate_down · dt          (otherwise)
//! ```
//!
//! Both gates combine an absolute threshold with one relative to the
//! person's own neutral baseline; the off gate is strictly easier to hit
//! than the on gate is to clear. Growth and decay are integrated over real
//! elapsed time, so the output does not depend on the camera frame rate.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::Instant;

use nosemirror_models::IdentityId;
use tracing::debug;
use validator::Validate;

use crate::config::ScaleConfig;
use crate::error::{CoreError, CoreResult};
use crate::metrics;

/// Per-identity controller state.
#[derive(Debug, Clone, PartialEq)]
pub struct PersonState {
    /// Current output, always within the configured bounds
    pub scale: f64,
    /// EMA of the raw smile score
    pub smoothed_score: f64,
    /// Neutral expression estimate, frozen while engaged
    pub baseline: f64,
    /// EMA of the deviation from baseline, frozen while engaged
    pub noise: f64,
    /// Consecutive frames the candidate-on gate held while disengaged
    pub on_streak: u32,
    /// Debounced smile state
    pub engaged: bool,
    pub first_seen_at: Instant,
    pub last_update_at: Instant,
}

impl PersonState {
    fn new(scale: f64, now: Instant) -> Self {
        Self {
            scale,
            smoothed_score: 0.0,
            baseline: 0.0,
            noise: 0.0,
            on_streak: 0,
            engaged: false,
            first_seen_at: now,
            last_update_at: now,
        }
    }

    /// Whether the identity is still inside its calibration window.
    pub fn in_calibration(&self, now: Instant, calibration_secs: f64) -> bool {
        now.saturating_duration_since(self.first_seen_at).as_secs_f64() < calibration_secs
    }
}

/// Scale remembered for an identity that left the live set.
#[derive(Debug, Clone, Copy)]
struct RetainedScale {
    scale: f64,
    departed_at: Instant,
}

/// Converts per-identity smile scores into smoothed overlay scales.
#[derive(Debug, Clone)]
pub struct ScaleController {
    config: ScaleConfig,
    people: BTreeMap<IdentityId, PersonState>,
    retained: HashMap<IdentityId, RetainedScale>,
}

impl ScaleController {
    /// Create a new controller, validating the configuration once.
    pub fn new(config: ScaleConfig) -> CoreResult<Self> {
        config
            .validate()
            .map_err(|e| CoreError::from_validation("scale", e))?;

        Ok(Self {
            config,
            people: BTreeMap::new(),
            retained: HashMap::new(),
        })
    }

    /// Advance every live identity using the monotonic clock.
    pub fn update(
        &mut self,
        live: &BTreeSet<IdentityId>,
        raw_scores: &BTreeMap<IdentityId, f64>,
    ) -> BTreeMap<IdentityId, f64> {
        self.update_at(live, raw_scores, Instant::now())
    }

    /// Advance every live identity to `now`.
    ///
    /// # Arguments
    /// * `live` - Identities present this frame; state for all others is dropped
    /// * `raw_scores` - Smile score per identity in `[0, 1]`; missing means `0.0`
    /// * `now` - Monotonic timestamp of this frame
    ///
    /// # Returns
    /// Current scale per live identity
    pub fn update_at(
        &mut self,
        live: &BTreeSet<IdentityId>,
        raw_scores: &BTreeMap<IdentityId, f64>,
        now: Instant,
    ) -> BTreeMap<IdentityId, f64> {
        self.reconcile(live, now);

        let config = &self.config;
        let scales = self
            .people
            .iter_mut()
            .map(|(&id, state)| {
                let raw = raw_scores.get(&id).copied().unwrap_or(0.0);
                (id, advance(config, id, state, raw, now))
            })
            .collect();

        metrics::record_live_identities(self.people.len());
        scales
    }

    /// State of one identity, if live.
    pub fn person(&self, id: IdentityId) -> Option<&PersonState> {
        self.people.get(&id)
    }

    /// All live identities in ascending order.
    pub fn people(&self) -> impl Iterator<Item = (IdentityId, &PersonState)> {
        self.people.iter().map(|(&id, state)| (id, state))
    }

    pub fn len(&self) -> usize {
        self.people.len()
    }

    pub fn is_empty(&self) -> bool {
        self.people.is_empty()
    }

    pub fn config(&self) -> &ScaleConfig {
        &self.config
    }

    /// Drop all state, including retained scales.
    pub fn reset(&mut self) {
        self.people.clear();
        self.retained.clear();
    }

    /// Create state for arrivals and drop state for departures.
    fn reconcile(&mut self, live: &BTreeSet<IdentityId>, now: Instant) {
        let retention = self.config.scale_retention_secs;
        self.retained.retain(|_, r| {
            now.saturating_duration_since(r.departed_at).as_secs_f64() <= retention
        });

        let departed: Vec<IdentityId> = self
            .people
            .keys()
            .filter(|id| !live.contains(id))
            .copied()
            .collect();
        for id in departed {
            if let Some(state) = self.people.remove(&id) {
                debug!(identity = id, scale = state.scale, "Identity left, state dropped");
                if retention > 0.0 {
                    self.retained.insert(
                        id,
                        RetainedScale {
                            scale: state.scale,
                            departed_at: now,
                        },
                    );
                }
            }
        }

        for &id in live {
            if self.people.contains_key(&id) {
                continue;
            }
            let scale = match self.retained.remove(&id) {
                Some(r) => {
                    metrics::record_scale_restored();
                    r.scale
                }
                None => self.config.scale_min,
            };
            debug!(identity = id, scale, "Identity arrived, calibrating");
            self.people.insert(id, PersonState::new(scale, now));
        }
    }
}

/// Relative threshold the smoothed score must reach to be candidate-on.
#[inline]
fn on_gate(config: &ScaleConfig, baseline: f64, noise: f64) -> f64 {
    baseline + config.delta_on.max(config.k_on * noise)
}

/// Relative threshold below which the smoothed score is candidate-off.
#[inline]
fn off_gate(config: &ScaleConfig, baseline: f64, noise: f64) -> f64 {
    baseline + config.delta_off.max(config.k_off * noise)
}

/// Run one frame of the state machine for a single identity.
fn advance(
    config: &ScaleConfig,
    id: IdentityId,
    state: &mut PersonState,
    raw: f64,
    now: Instant,
) -> f64 {
    let raw = if raw.is_finite() {
        raw.clamp(0.0, 1.0)
    } else {
        0.0
    };

    let dt = now
        .saturating_duration_since(state.last_update_at)
        .as_secs_f64()
        .max(config.min_dt_secs);
    state.last_update_at = now;

    let s = state.smoothed_score * (1.0 - config.score_alpha) + raw * config.score_alpha;
    state.smoothed_score = s;

    let calibrating = state.in_calibration(now, config.calibration_secs);

    if !state.engaged {
        state.baseline =
            state.baseline * (1.0 - config.baseline_alpha) + s * config.baseline_alpha;
        state.noise = state.noise * (1.0 - config.noise_alpha)
            + (s - state.baseline).abs() * config.noise_alpha;
    }

    let on_threshold = on_gate(config, state.baseline, state.noise);
    let candidate_on = s >= config.abs_on && s >= on_threshold;
    let candidate_off =
        s < config.abs_off || s < off_gate(config, state.baseline, state.noise);

    if state.engaged {
        if candidate_off {
            state.engaged = false;
            state.on_streak = 0;
            debug!(identity = id, score = s, scale = state.scale, "Smile released");
        }
    } else if candidate_on {
        state.on_streak += 1;
        if state.on_streak >= config.min_on_frames && !calibrating {
            state.engaged = true;
            state.on_streak = 0;
            metrics::record_engagement();
            debug!(
                identity = id,
                score = s,
                baseline = state.baseline,
                "Smile engaged"
            );
        }
    } else {
        state.on_streak = 0;
    }

    let next = if state.engaged && candidate_on {
        let excess = (s - on_threshold).max(0.0);
        state.scale + excess * config.rate_up * dt
    } else {
        state.scale - config.rate_down * dt
    };

    state.scale = next.clamp(config.scale_min, config.scale_max);
    state.scale
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn ids(list: &[IdentityId]) -> BTreeSet<IdentityId> {
        list.iter().copied().collect()
    }

    fn scores(list: &[(IdentityId, f64)]) -> BTreeMap<IdentityId, f64> {
        list.iter().copied().collect()
    }

    fn at(t0: Instant, secs: f64) -> Instant {
        t0 + Duration::from_secs_f64(secs)
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = ScaleConfig {
            delta_off: 0.2,
            ..Default::default()
        };
        assert!(ScaleController::new(config).is_err());
    }

    #[test]
    fn test_new_identity_starts_at_min() {
        let mut controller = ScaleController::new(ScaleConfig::default()).unwrap();
        let t0 = Instant::now();

        let out = controller.update_at(&ids(&[4]), &scores(&[(4, 1.0)]), t0);
        assert_eq!(out[&4], 2.0);

        let person = controller.person(4).unwrap();
        assert!(!person.engaged);
        assert_eq!(person.first_seen_at, t0);
        assert!((person.smoothed_score - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_departed_identity_state_dropped() {
        let mut controller = ScaleController::new(ScaleConfig::default()).unwrap();
        let t0 = Instant::now();

        controller.update_at(&ids(&[1, 2]), &BTreeMap::new(), t0);
        let out = controller.update_at(&ids(&[2]), &BTreeMap::new(), at(t0, 0.1));

        assert_eq!(out.keys().copied().collect::<Vec<_>>(), vec![2]);
        assert!(controller.person(1).is_none());
        assert_eq!(controller.len(), 1);
    }

    #[test]
    fn test_surviving_identity_keeps_history_when_others_arrive() {
        let mut controller = ScaleController::new(ScaleConfig::default()).unwrap();
        let t0 = Instant::now();

        controller.update_at(&ids(&[1]), &scores(&[(1, 0.4)]), t0);
        let before = controller.person(1).unwrap().clone();

        controller.update_at(&ids(&[1, 2]), &scores(&[(1, 0.4)]), at(t0, 0.1));
        let after = controller.person(1).unwrap();

        assert_eq!(after.first_seen_at, before.first_seen_at);
        assert!(after.smoothed_score > before.smoothed_score);
    }

    #[test]
    fn test_empty_live_set_returns_nothing() {
        let mut controller = ScaleController::new(ScaleConfig::default()).unwrap();
        let out = controller.update_at(&BTreeSet::new(), &scores(&[(3, 0.9)]), Instant::now());
        assert!(out.is_empty());
        assert!(controller.is_empty());
    }

    #[test]
    fn test_missing_score_treated_as_zero() {
        let mut controller = ScaleController::new(ScaleConfig::default()).unwrap();
        let t0 = Instant::now();

        controller.update_at(&ids(&[7]), &BTreeMap::new(), t0);
        assert_eq!(controller.person(7).unwrap().smoothed_score, 0.0);
    }

    #[test]
    fn test_non_finite_score_treated_as_zero() {
        let mut controller = ScaleController::new(ScaleConfig::default()).unwrap();
        let out = controller.update_at(&ids(&[7]), &scores(&[(7, f64::NAN)]), Instant::now());
        assert_eq!(out[&7], 2.0);
        assert_eq!(controller.person(7).unwrap().smoothed_score, 0.0);
    }

    #[test]
    fn test_first_observation_uses_dt_floor() {
        let config = ScaleConfig {
            scale_retention_secs: 10.0,
            ..Default::default()
        };
        let mut controller = ScaleController::new(config).unwrap();
        let t0 = Instant::now();

        // Seed a high retained scale through a departure
        controller.people.insert(9, PersonState::new(3.0, t0));
        controller.update_at(&BTreeSet::new(), &BTreeMap::new(), t0);

        let out = controller.update_at(&ids(&[9]), &BTreeMap::new(), at(t0, 0.5));
        let expected = 3.0 - 0.6 / 120.0;
        assert!(
            (out[&9] - expected).abs() < 1e-9,
            "first update should decay by one floored step: {}",
            out[&9]
        );
    }

    #[test]
    fn test_retained_scale_restored_within_window() {
        let mut controller = ScaleController::new(ScaleConfig::default()).unwrap();
        let t0 = Instant::now();

        controller.people.insert(5, PersonState::new(3.5, t0));
        controller.update_at(&BTreeSet::new(), &BTreeMap::new(), at(t0, 1.0));

        let out = controller.update_at(&ids(&[5]), &BTreeMap::new(), at(t0, 1.5));
        assert!(out[&5] > 3.4, "scale should continue from retained value: {}", out[&5]);

        let person = controller.person(5).unwrap();
        assert_eq!(person.first_seen_at, at(t0, 1.5), "calibration restarts");
        assert_eq!(person.baseline, 0.0);
    }

    #[test]
    fn test_retained_scale_expires() {
        let mut controller = ScaleController::new(ScaleConfig::default()).unwrap();
        let t0 = Instant::now();

        controller.people.insert(5, PersonState::new(3.5, t0));
        controller.update_at(&BTreeSet::new(), &BTreeMap::new(), t0);

        let out = controller.update_at(&ids(&[5]), &BTreeMap::new(), at(t0, 1.5));
        assert_eq!(out[&5], 2.0);
    }

    #[test]
    fn test_retention_disabled() {
        let config = ScaleConfig {
            scale_retention_secs: 0.0,
            ..Default::default()
        };
        let mut controller = ScaleController::new(config).unwrap();
        let t0 = Instant::now();

        controller.people.insert(5, PersonState::new(3.5, t0));
        controller.update_at(&BTreeSet::new(), &BTreeMap::new(), t0);

        let out = controller.update_at(&ids(&[5]), &BTreeMap::new(), t0);
        assert_eq!(out[&5], 2.0);
    }

    #[test]
    fn test_baseline_frozen_while_engaged() {
        let mut controller = ScaleController::new(ScaleConfig::default()).unwrap();
        let t0 = Instant::now();
        let live = ids(&[0]);

        // Past calibration with a neutral face
        let mut t = 0.0;
        while t < 2.1 {
            controller.update_at(&live, &scores(&[(0, 0.0)]), at(t0, t));
            t += 1.0 / 30.0;
        }
        while !controller.person(0).unwrap().engaged {
            controller.update_at(&live, &scores(&[(0, 0.9)]), at(t0, t));
            t += 1.0 / 30.0;
            assert!(t < 3.0, "smile never engaged");
        }

        let frozen = controller.person(0).unwrap().clone();
        for _ in 0..30 {
            controller.update_at(&live, &scores(&[(0, 0.9)]), at(t0, t));
            t += 1.0 / 30.0;
        }
        let person = controller.person(0).unwrap();
        assert!(person.engaged);
        assert_eq!(person.baseline, frozen.baseline);
        assert_eq!(person.noise, frozen.noise);
        assert!(person.scale > frozen.scale);
    }

    #[test]
    fn test_engaged_decays_when_candidate_on_lapses() {
        let mut controller = ScaleController::new(ScaleConfig::default()).unwrap();
        let t0 = Instant::now();
        let live = ids(&[0]);

        let mut t = 0.0;
        while t < 2.1 {
            controller.update_at(&live, &scores(&[(0, 0.0)]), at(t0, t));
            t += 1.0 / 30.0;
        }
        for _ in 0..40 {
            controller.update_at(&live, &scores(&[(0, 0.9)]), at(t0, t));
            t += 1.0 / 30.0;
        }
        let peak = controller.person(0).unwrap().clone();
        assert!(peak.engaged);

        // Dip just under the absolute on gate but above every off gate
        let mut state = peak.clone();
        state.smoothed_score = 0.24;
        controller.people.insert(0, state);
        let out = controller.update_at(&live, &scores(&[(0, 0.24)]), at(t0, t));

        let person = controller.person(0).unwrap();
        assert!(person.engaged, "still formally engaged");
        assert!(out[&0] < peak.scale, "scale decays while candidate-on lapses");
    }

    #[test]
    fn test_release_on_absolute_gate() {
        let mut controller = ScaleController::new(ScaleConfig::default()).unwrap();
        let t0 = Instant::now();
        let live = ids(&[0]);

        let mut state = PersonState::new(3.0, t0);
        state.engaged = true;
        state.smoothed_score = 0.2;
        controller.people.insert(0, state);

        // Inside the hysteresis band: neither gate fires
        let out = controller.update_at(&live, &scores(&[(0, 0.2)]), at(t0, 0.1));
        assert!(controller.person(0).unwrap().engaged);
        assert!(out[&0] < 3.0);

        // 0.175 is under the absolute off gate but far above the baseline margin
        controller.update_at(&live, &scores(&[(0, 0.1)]), at(t0, 0.2));
        let person = controller.person(0).unwrap();
        assert!((person.smoothed_score - 0.175).abs() < 1e-12);
        assert!(!person.engaged);
        assert_eq!(person.on_streak, 0);
    }
}
