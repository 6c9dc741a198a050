//! Overlay target selection.
//!
//! Exactly one visible face wears the overlay at a time. With two people
//! in frame the overlay alternates between them on a fixed interval; with
//! more, the wearer only changes when it leaves. The overlay is sized by
//! somebody else's smile whenever anyone else is present, so people grow
//! each other's noses.

use std::collections::BTreeMap;
use std::time::Instant;

use nosemirror_models::{FaceLandmarks, IdentityId, OverlayPlacement};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use tracing::debug;
use validator::Validate;

use crate::config::SpotlightConfig;
use crate::error::{CoreError, CoreResult};
use crate::scoring::overlay_base_size;

/// Chooses who wears the overlay and how it is placed.
#[derive(Debug, Clone)]
pub struct Spotlight<R: Rng = StdRng> {
    config: SpotlightConfig,
    rng: R,
    /// Identity currently wearing the overlay
    target: Option<IdentityId>,
    /// Asset drawn on the last (re)assignment
    asset_index: Option<usize>,
    /// When the two-person swap timer last started
    swapped_at: Option<Instant>,
    /// Faces seen on the last update
    face_count: usize,
}

impl Spotlight<StdRng> {
    /// Create a spotlight seeded from the operating system.
    pub fn new(config: SpotlightConfig) -> CoreResult<Self> {
        Self::with_rng(config, StdRng::from_os_rng())
    }

    /// Create a spotlight with reproducible choices.
    pub fn seeded(config: SpotlightConfig, seed: u64) -> CoreResult<Self> {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> Spotlight<R> {
    /// Create a spotlight drawing random choices from `rng`.
    pub fn with_rng(config: SpotlightConfig, rng: R) -> CoreResult<Self> {
        config
            .validate()
            .map_err(|e| CoreError::from_validation("spotlight", e))?;

        Ok(Self {
            config,
            rng,
            target: None,
            asset_index: None,
            swapped_at: None,
            face_count: 0,
        })
    }

    /// Update the target for this frame's visible faces.
    ///
    /// # Arguments
    /// * `faces` - Identities with a face mesh this frame, ascending
    /// * `now` - Monotonic timestamp of this frame
    ///
    /// # Returns
    /// The identity wearing the overlay, if anyone is visible
    pub fn update(&mut self, faces: &[IdentityId], now: Instant) -> Option<IdentityId> {
        self.face_count = faces.len();

        match self.target {
            None => {
                if !faces.is_empty() {
                    self.assign(faces, now);
                }
            }
            Some(target) if !faces.contains(&target) => {
                if faces.is_empty() {
                    debug!(identity = target, "Spotlight cleared");
                    self.target = None;
                    self.asset_index = None;
                    self.swapped_at = None;
                } else {
                    self.assign(faces, now);
                }
            }
            Some(target) if faces.len() == 2 => match self.swapped_at {
                None => self.swapped_at = Some(now),
                Some(since) => {
                    let elapsed = now.saturating_duration_since(since).as_secs_f64();
                    if elapsed >= self.config.swap_interval_secs {
                        if let Some(&other) = faces.iter().find(|&&id| id != target) {
                            debug!(from = target, to = other, "Spotlight swapped");
                            self.target = Some(other);
                        }
                        self.swapped_at = Some(now);
                    }
                }
            },
            Some(_) => {}
        }

        self.target
    }

    /// Pick a new target among `faces`, which must not be empty.
    fn assign(&mut self, faces: &[IdentityId], now: Instant) {
        if faces.len() == 1 {
            self.target = Some(faces[0]);
            self.swapped_at = None;
        } else {
            self.target = faces.choose(&mut self.rng).copied();
            self.swapped_at = Some(now);
        }

        self.asset_index = match self.config.asset_count {
            0 => None,
            count => Some(self.rng.random_range(0..count)),
        };
        debug!(
            identity = ?self.target,
            asset = ?self.asset_index,
            faces = faces.len(),
            "Spotlight assigned"
        );
    }

    /// Scale the overlay is drawn at.
    ///
    /// One face uses its own scale, two faces use the other person's and
    /// three or more use the largest among the others. Missing scales fall
    /// back to the configured default; the result is clamped for display.
    pub fn overlay_scale(
        &self,
        faces: &[IdentityId],
        scales: &BTreeMap<IdentityId, f64>,
    ) -> Option<f64> {
        let target = self.target?;
        if !faces.contains(&target) {
            return None;
        }

        let fallback = self.config.fallback_scale;
        let scale_of = |id: &IdentityId| scales.get(id).copied().unwrap_or(fallback);
        let scale = if faces.len() == 1 {
            scale_of(&target)
        } else {
            faces
                .iter()
                .filter(|&&id| id != target)
                .map(scale_of)
                .fold(f64::NEG_INFINITY, f64::max)
        };

        Some(scale.min(self.config.max_display_scale))
    }

    /// Overlay placement for the current target.
    ///
    /// Returns `None` with no target, no assets, or no mesh for the target.
    pub fn placement(
        &self,
        landmarks: &BTreeMap<IdentityId, FaceLandmarks>,
        scales: &BTreeMap<IdentityId, f64>,
    ) -> Option<OverlayPlacement> {
        let target = self.target?;
        let asset_index = self.asset_index?;
        let face = landmarks.get(&target)?;
        let anchor = face.anchor()?;

        let faces: Vec<IdentityId> = landmarks.keys().copied().collect();
        let scale = self.overlay_scale(&faces, scales)?;

        let scaled = (overlay_base_size(face) as f64 * scale) as u32;
        let size = scaled.max(self.config.min_overlay_size);
        let edge = size as f64;

        Some(OverlayPlacement {
            identity: target,
            asset_index,
            x: (anchor.x - edge / 2.0) as i32,
            y: (anchor.y - edge * self.config.overlay_lift) as i32,
            size,
            scale,
        })
    }

    /// Seconds until the next swap, only while exactly two faces are visible.
    pub fn swap_remaining(&self, now: Instant) -> Option<f64> {
        if self.face_count != 2 {
            return None;
        }
        let since = self.swapped_at?;
        let elapsed = now.saturating_duration_since(since).as_secs_f64();
        Some((self.config.swap_interval_secs - elapsed).max(0.0))
    }

    pub fn target(&self) -> Option<IdentityId> {
        self.target
    }

    pub fn asset_index(&self) -> Option<usize> {
        self.asset_index
    }

    pub fn config(&self) -> &SpotlightConfig {
        &self.config
    }

    /// Forget the current target.
    pub fn reset(&mut self) {
        self.target = None;
        self.asset_index = None;
        self.swapped_at = None;
        self.face_count = 0;
    }
}
