//! Ties face meshes to tracked identities.
//!
//! The face detector and the mesh model run independently, so each mesh
//! is attached to whichever identity's centroid lies nearest to its nose
//! tip.

use std::collections::BTreeMap;

use nosemirror_models::{Centroid, FaceLandmarks, IdentityId};

use crate::scoring::smile_score;

/// Meshes and smile scores keyed by identity.
#[derive(Debug, Clone, Default)]
pub struct Associated {
    pub landmarks: BTreeMap<IdentityId, FaceLandmarks>,
    pub scores: BTreeMap<IdentityId, f64>,
}

impl Associated {
    /// Number of identities with a mesh this frame.
    pub fn len(&self) -> usize {
        self.landmarks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.landmarks.is_empty()
    }
}

/// Attach every mesh to its nearest identity and score it.
///
/// Meshes without a nose tip are skipped. If two meshes resolve to the same
/// identity, the later one wins.
pub fn associate(
    centroids: &BTreeMap<IdentityId, Centroid>,
    faces: &[FaceLandmarks],
) -> Associated {
    let mut associated = Associated::default();

    for face in faces {
        let Some(anchor) = face.anchor() else {
            continue;
        };
        let Some(id) = nearest(centroids, anchor.x, anchor.y) else {
            continue;
        };
        associated.scores.insert(id, smile_score(face));
        associated.landmarks.insert(id, face.clone());
    }

    associated
}

/// Identity whose centroid is closest to `(x, y)`; first minimum wins.
fn nearest(centroids: &BTreeMap<IdentityId, Centroid>, x: f64, y: f64) -> Option<IdentityId> {
    let mut best: Option<(IdentityId, f64)> = None;
    for (&id, centroid) in centroids {
        let d = centroid.distance_sq_to(x, y);
        if best.is_none_or(|(_, min)| d < min) {
            best = Some((id, d));
        }
    }
    best.map(|(id, _)| id)
}
