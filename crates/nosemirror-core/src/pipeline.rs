//! Per-frame orchestration.
//!
//! ```text
//! FrameInput ─► IdentityTracker ─► associate ─► ScaleController ─► Spotlight ─► FrameReport
//!   boxes           centroids       meshes,         scales           overlay
//!   meshes                          smile scores                     laugh cue
//! ```

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use nosemirror_models::{FrameInput, FrameReport, IdentityId, IdentityReport, LaughCue};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{trace, warn};

use crate::association::associate;
use crate::config::MirrorSettings;
use crate::error::CoreResult;
use crate::metrics;
use crate::scale::ScaleController;
use crate::spotlight::Spotlight;
use crate::tracker::IdentityTracker;

/// Runs every component for one frame at a time.
#[derive(Debug)]
pub struct FramePipeline<R: Rng = StdRng> {
    tracker: IdentityTracker,
    controller: ScaleController,
    spotlight: Spotlight<R>,
    /// Instant that input timestamp zero maps to
    origin: Instant,
    /// Instant of the most recent frame
    last_at: Instant,
    frame_index: u64,
}

impl FramePipeline<StdRng> {
    /// Create a pipeline with OS-seeded spotlight choices.
    pub fn new(settings: MirrorSettings) -> CoreResult<Self> {
        Self::with_rng(settings, StdRng::from_os_rng())
    }

    /// Create a pipeline with reproducible spotlight choices.
    pub fn seeded(settings: MirrorSettings, seed: u64) -> CoreResult<Self> {
        Self::with_rng(settings, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> FramePipeline<R> {
    pub fn with_rng(settings: MirrorSettings, rng: R) -> CoreResult<Self> {
        settings.validate()?;
        let MirrorSettings {
            tracker,
            scale,
            spotlight,
        } = settings;

        let origin = Instant::now();
        Ok(Self {
            tracker: IdentityTracker::new(tracker),
            controller: ScaleController::new(scale)?,
            spotlight: Spotlight::with_rng(spotlight, rng)?,
            origin,
            last_at: origin,
            frame_index: 0,
        })
    }

    /// Process a frame, placing its timestamp on the pipeline's own timeline.
    ///
    /// Negative or non-finite timestamps are treated as zero. Timestamps too
    /// far out to represent reuse the previous frame's instant.
    pub fn process(&mut self, input: &FrameInput) -> FrameReport {
        let offset = if input.timestamp_secs.is_finite() {
            input.timestamp_secs.max(0.0)
        } else {
            0.0
        };
        let now = Duration::try_from_secs_f64(offset)
            .ok()
            .and_then(|elapsed| self.origin.checked_add(elapsed))
            .unwrap_or_else(|| {
                warn!(timestamp = input.timestamp_secs, "Timestamp out of range");
                self.last_at
            });
        self.process_at(input, now)
    }

    /// Process a frame observed at `now`.
    pub fn process_at(&mut self, input: &FrameInput, now: Instant) -> FrameReport {
        let started = Instant::now();
        self.last_at = now;

        let centroids = self.tracker.update(&input.detections);
        let associated = associate(&centroids, &input.faces);

        let live: BTreeSet<IdentityId> = centroids.keys().copied().collect();
        let scales = self.controller.update_at(&live, &associated.scores, now);

        let faces: Vec<IdentityId> = associated.landmarks.keys().copied().collect();
        let spotlight = self.spotlight.update(&faces, now);
        let overlay = self.spotlight.placement(&associated.landmarks, &scales);
        let laugh = LaughCue::for_scores(associated.scores.values().copied());

        let identities = centroids
            .iter()
            .filter_map(|(&id, &centroid)| {
                let person = self.controller.person(id)?;
                Some(IdentityReport {
                    id,
                    centroid,
                    raw_score: associated.scores.get(&id).copied(),
                    smoothed_score: person.smoothed_score,
                    scale: person.scale,
                    engaged: person.engaged,
                })
            })
            .collect();

        let report = FrameReport {
            frame_index: self.frame_index,
            timestamp_secs: input.timestamp_secs,
            identities,
            face_count: associated.len(),
            spotlight,
            overlay,
            laugh,
            swap_remaining_secs: self.spotlight.swap_remaining(now),
        };
        self.frame_index += 1;

        metrics::record_frame(started.elapsed().as_secs_f64());
        trace!(
            frame = report.frame_index,
            identities = report.identities.len(),
            faces = report.face_count,
            laugh = report.laugh.as_str(),
            "Frame processed"
        );
        report
    }

    /// Frames processed since creation or the last reset.
    pub fn frames_processed(&self) -> u64 {
        self.frame_index
    }

    pub fn tracker(&self) -> &IdentityTracker {
        &self.tracker
    }

    pub fn controller(&self) -> &ScaleController {
        &self.controller
    }

    pub fn spotlight(&self) -> &Spotlight<R> {
        &self.spotlight
    }

    /// Drop all identities and restart the timeline.
    pub fn reset(&mut self) {
        self.tracker.reset();
        self.controller.reset();
        self.spotlight.reset();
        self.origin = Instant::now();
        self.last_at = self.origin;
        self.frame_index = 0;
    }
}
