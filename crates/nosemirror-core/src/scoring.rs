//! Smile scoring and overlay sizing from face mesh landmarks.
//!
//! The smile score is the mouth aspect ratio (corner-to-corner width over
//! inner-lip opening) mapped onto `[0, 1]`. A neutral closed mouth sits
//! near zero; a wide grin approaches one.

use nosemirror_models::landmarks::mesh;
use nosemirror_models::{FaceLandmarks, Landmark};

/// Mouth aspect ratio treated as neutral.
pub const NEUTRAL_MOUTH_RATIO: f64 = 1.8;
/// Ratio span mapped onto the full score range.
pub const MOUTH_RATIO_SPAN: f64 = 3.5;

/// Overlay base size relative to the outer eye-corner distance.
const EYE_SPAN_FACTOR: f64 = 0.45;
/// Smallest base size derived from landmarks.
const MIN_BASE_SIZE: u32 = 40;
/// Base size when neither eyes nor face edges are available.
const DEFAULT_BASE_SIZE: u32 = 120;

/// Smile score in `[0, 1]` for one face mesh.
///
/// Returns `0.0` when any mouth point is missing or the mouth geometry is
/// degenerate.
pub fn smile_score(face: &FaceLandmarks) -> f64 {
    let points = (
        face.get(mesh::MOUTH_RIGHT),
        face.get(mesh::MOUTH_LEFT),
        face.get(mesh::UPPER_LIP_INNER),
        face.get(mesh::LOWER_LIP_INNER),
    );
    let (Some(right), Some(left), Some(upper), Some(lower)) = points else {
        return 0.0;
    };

    let width = right.planar_distance(left);
    let height = upper.planar_distance(lower);
    if width <= 1e-6 || height <= 1e-6 {
        return 0.0;
    }

    ((width / height - NEUTRAL_MOUTH_RATIO) / MOUTH_RATIO_SPAN).clamp(0.0, 1.0)
}

/// Base overlay edge length in pixels before scaling.
///
/// Uses the outer eye corners, falling back to the face edges, then to a
/// fixed size.
pub fn overlay_base_size(face: &FaceLandmarks) -> u32 {
    let span = pair(face, mesh::RIGHT_EYE_OUTER, mesh::LEFT_EYE_OUTER)
        .or_else(|| pair(face, mesh::FACE_EDGE_RIGHT, mesh::FACE_EDGE_LEFT));

    match span {
        Some((a, b)) => {
            let size = (a.planar_distance(b) * EYE_SPAN_FACTOR) as u32;
            size.max(MIN_BASE_SIZE)
        }
        None => DEFAULT_BASE_SIZE,
    }
}

fn pair(face: &FaceLandmarks, a: usize, b: usize) -> Option<(&Landmark, &Landmark)> {
    Some((face.get(a)?, face.get(b)?))
}
