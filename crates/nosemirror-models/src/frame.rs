//! Per-frame records exchanged with the outside world.
//!
//! `FrameInput` is what the capture/detection side hands over each frame;
//! `FrameReport` is what the overlay, audio and debug collaborators consume.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::geometry::{BoundingBox, Centroid};
use crate::landmarks::FaceLandmarks;
use crate::IdentityId;

/// Detector output for one captured frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FrameInput {
    /// Capture time in seconds on a monotonic timeline
    pub timestamp_secs: f64,
    /// Face detection boxes
    #[serde(default)]
    pub detections: Vec<BoundingBox>,
    /// Face meshes, in detector order, not yet tied to identities
    #[serde(default)]
    pub faces: Vec<FaceLandmarks>,
}

impl FrameInput {
    /// Create a frame with boxes only.
    pub fn new(timestamp_secs: f64, detections: Vec<BoundingBox>) -> Self {
        Self {
            timestamp_secs,
            detections,
            faces: Vec::new(),
        }
    }

    /// Attach face meshes.
    pub fn with_faces(mut self, faces: Vec<FaceLandmarks>) -> Self {
        self.faces = faces;
        self
    }
}

/// Which looping laugh track should be audible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum LaughCue {
    /// Nobody in frame, all tracks muted
    #[default]
    Silent,
    Giggle,
    Chuckle,
    Big,
}

impl LaughCue {
    /// Average score below which the big laugh plays.
    pub const BIG_BELOW: f64 = 0.1;
    /// Average score below which the giggle plays.
    pub const GIGGLE_BELOW: f64 = 0.25;

    /// Pick the cue for this frame's raw smile scores.
    ///
    /// The track is chosen from the average score; no scores means silence.
    pub fn for_scores<I>(scores: I) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        let (sum, count) = scores
            .into_iter()
            .fold((0.0, 0usize), |(sum, count), s| (sum + s, count + 1));
        if count == 0 {
            return LaughCue::Silent;
        }

        let average = sum / count as f64;
        if average < Self::BIG_BELOW {
            LaughCue::Big
        } else if average < Self::GIGGLE_BELOW {
            LaughCue::Giggle
        } else {
            LaughCue::Chuckle
        }
    }

    /// Returns the cue name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            LaughCue::Silent => "silent",
            LaughCue::Giggle => "giggle",
            LaughCue::Chuckle => "chuckle",
            LaughCue::Big => "big",
        }
    }

    /// Volumes for the `(giggle, chuckle, big)` tracks.
    pub fn volumes(&self) -> (f32, f32, f32) {
        match self {
            LaughCue::Silent => (0.0, 0.0, 0.0),
            LaughCue::Giggle => (1.0, 0.0, 0.0),
            LaughCue::Chuckle => (0.0, 1.0, 0.0),
            LaughCue::Big => (0.0, 0.0, 1.0),
        }
    }
}

/// Where and how large to draw the overlay asset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct OverlayPlacement {
    /// Identity wearing the overlay
    pub identity: IdentityId,
    /// Index into the overlay asset list
    pub asset_index: usize,
    /// Top-left x, may be off-frame
    pub x: i32,
    /// Top-left y, may be off-frame
    pub y: i32,
    /// Square edge length in pixels
    pub size: u32,
    /// Scale factor the size was derived from
    pub scale: f64,
}

/// State of one tracked identity after a frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct IdentityReport {
    pub id: IdentityId,
    pub centroid: Centroid,
    /// Raw smile score, absent when no face mesh was associated this frame
    pub raw_score: Option<f64>,
    pub smoothed_score: f64,
    pub scale: f64,
    pub engaged: bool,
}

/// Everything produced for one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FrameReport {
    /// Zero-based frame counter within the session
    pub frame_index: u64,
    pub timestamp_secs: f64,
    /// Identities ordered by id
    pub identities: Vec<IdentityReport>,
    /// Number of identities with an associated face mesh
    pub face_count: usize,
    /// Identity currently selected to wear the overlay
    pub spotlight: Option<IdentityId>,
    pub overlay: Option<OverlayPlacement>,
    pub laugh: LaughCue,
    /// Seconds until the spotlight swaps, in two-person mode
    pub swap_remaining_secs: Option<f64>,
}

impl FrameReport {
    /// Look up one identity's report.
    pub fn identity(&self, id: IdentityId) -> Option<&IdentityReport> {
        self.identities.iter().find(|r| r.id == id)
    }
}
