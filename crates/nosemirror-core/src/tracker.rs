//! Centroid tracker for maintaining face identity across frames.
//!
//! Associates detection boxes between consecutive frames by centroid
//! distance. Matching is greedy: existing tracks are visited in order of
//! their closest detection, and each claims that detection if it is still
//! free and within the distance gate. Released identities go to a sorted
//! free list and are handed out again, smallest first, before any new
//! integer is allocated.

use std::collections::{BTreeMap, BTreeSet};

use nosemirror_models::{BoundingBox, Centroid, IdentityId};
use tracing::debug;

use crate::config::TrackerConfig;
use crate::metrics;

/// Track information.
#[derive(Debug, Clone)]
struct Track {
    /// Last matched centroid
    centroid: Centroid,
    /// Consecutive frames without a matching detection
    disappeared_frames: u32,
}

/// Centroid tracker producing stable, reusable identities.
#[derive(Debug, Clone)]
pub struct IdentityTracker {
    config: TrackerConfig,
    /// Live tracks keyed by identity
    tracks: BTreeMap<IdentityId, Track>,
    /// Released identities, handed out smallest first
    free_ids: BTreeSet<IdentityId>,
    /// Next never-used identity
    next_id: IdentityId,
}

impl IdentityTracker {
    /// Create a new tracker.
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            tracks: BTreeMap::new(),
            free_ids: BTreeSet::new(),
            next_id: 0,
        }
    }

    /// Update tracks with this frame's detections.
    ///
    /// # Arguments
    /// * `detections` - Face boxes from the detector, possibly empty
    ///
    /// # Returns
    /// Current identity to centroid mapping, after all matches, expiries
    /// and registrations of this call
    pub fn update(&mut self, detections: &[BoundingBox]) -> BTreeMap<IdentityId, Centroid> {
        if detections.is_empty() {
            let ids: Vec<IdentityId> = self.tracks.keys().copied().collect();
            for id in ids {
                self.mark_missing(id);
            }
            return self.centroids();
        }

        let inputs: Vec<Centroid> = detections.iter().map(BoundingBox::centroid).collect();

        if self.tracks.is_empty() {
            for centroid in inputs {
                self.register(centroid);
            }
            return self.centroids();
        }

        let track_ids: Vec<IdentityId> = self.tracks.keys().copied().collect();
        let distances: Vec<Vec<f64>> = track_ids
            .iter()
            .map(|id| {
                let origin = self.tracks[id].centroid;
                inputs.iter().map(|c| origin.distance(c)).collect()
            })
            .collect();

        // Closest detection per row; first minimum wins on ties
        let row_best: Vec<(usize, f64)> = distances
            .iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .fold((0, f64::INFINITY), |best, (col, &d)| {
                        if d < best.1 {
                            (col, d)
                        } else {
                            best
                        }
                    })
            })
            .collect();

        let mut rows: Vec<usize> = (0..track_ids.len()).collect();
        rows.sort_by(|&a, &b| row_best[a].1.total_cmp(&row_best[b].1));

        let mut used_rows = vec![false; track_ids.len()];
        let mut used_cols = vec![false; inputs.len()];

        for row in rows {
            let (col, distance) = row_best[row];
            if used_cols[col] || distance > self.config.max_distance {
                continue;
            }
            if let Some(track) = self.tracks.get_mut(&track_ids[row]) {
                track.centroid = inputs[col];
                track.disappeared_frames = 0;
            }
            used_rows[row] = true;
            used_cols[col] = true;
        }

        for (row, &id) in track_ids.iter().enumerate() {
            if !used_rows[row] {
                self.mark_missing(id);
            }
        }

        for (col, centroid) in inputs.into_iter().enumerate() {
            if !used_cols[col] {
                self.register(centroid);
            }
        }

        self.centroids()
    }

    /// Current identity to centroid mapping.
    pub fn centroids(&self) -> BTreeMap<IdentityId, Centroid> {
        self.tracks
            .iter()
            .map(|(&id, track)| (id, track.centroid))
            .collect()
    }

    /// Frames since the identity was last matched, if it is live.
    pub fn disappeared_frames(&self, id: IdentityId) -> Option<u32> {
        self.tracks.get(&id).map(|t| t.disappeared_frames)
    }

    /// Released identities waiting for reuse, ascending.
    pub fn free_ids(&self) -> impl Iterator<Item = IdentityId> + '_ {
        self.free_ids.iter().copied()
    }

    /// Number of live tracks.
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Reset the tracker state.
    pub fn reset(&mut self) {
        self.tracks.clear();
        self.free_ids.clear();
        self.next_id = 0;
    }

    fn register(&mut self, centroid: Centroid) -> IdentityId {
        let id = match self.free_ids.pop_first() {
            Some(id) => {
                metrics::record_identity_reused();
                id
            }
            None => {
                let id = self.next_id;
                self.next_id += 1;
                id
            }
        };

        self.tracks.insert(
            id,
            Track {
                centroid,
                disappeared_frames: 0,
            },
        );
        metrics::record_track_registered();
        debug!(identity = id, x = centroid.x, y = centroid.y, "Track registered");
        id
    }

    fn mark_missing(&mut self, id: IdentityId) {
        let expired = match self.tracks.get_mut(&id) {
            Some(track) => {
                track.disappeared_frames += 1;
                track.disappeared_frames > self.config.max_disappeared
            }
            None => false,
        };

        if expired {
            self.tracks.remove(&id);
            self.free_ids.insert(id);
            metrics::record_track_expired();
            debug!(identity = id, "Track expired");
        }
    }
}

impl Default for IdentityTracker {
    fn default() -> Self {
        Self::new(TrackerConfig::default())
    }
}
