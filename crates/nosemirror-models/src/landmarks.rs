//! Face mesh landmarks supplied by the external landmark detector.
//!
//! Points follow the 468-point face mesh topology. Only a handful of
//! indices are consumed here; the named constants live in [`mesh`].

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Indices into the 468-point face mesh.
pub mod mesh {
    /// Nose tip, used as the face anchor.
    pub const NOSE_TIP: usize = 1;
    /// Inner upper lip midpoint.
    pub const UPPER_LIP_INNER: usize = 13;
    /// Inner lower lip midpoint.
    pub const LOWER_LIP_INNER: usize = 14;
    /// Outer corner of the right eye (image left).
    pub const RIGHT_EYE_OUTER: usize = 33;
    /// Right mouth corner (image left).
    pub const MOUTH_RIGHT: usize = 61;
    /// Right face edge at cheek height.
    pub const FACE_EDGE_RIGHT: usize = 234;
    /// Outer corner of the left eye (image right).
    pub const LEFT_EYE_OUTER: usize = 263;
    /// Left mouth corner (image right).
    pub const MOUTH_LEFT: usize = 291;
    /// Left face edge at cheek height.
    pub const FACE_EDGE_LEFT: usize = 454;
    /// Number of points in a full mesh.
    pub const POINT_COUNT: usize = 468;
}

/// A single landmark in frame pixels, with relative depth.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    /// Relative depth as reported by the mesh model
    #[serde(default)]
    pub z: f64,
}

impl Landmark {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Planar distance to another landmark (depth ignored).
    #[inline]
    pub fn planar_distance(&self, other: &Landmark) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}

/// One detected face mesh.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct FaceLandmarks {
    pub points: Vec<Landmark>,
}

impl FaceLandmarks {
    /// Create landmarks from a vector of points.
    pub fn new(points: Vec<Landmark>) -> Self {
        Self { points }
    }

    /// Point at a mesh index, if the mesh is long enough.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&Landmark> {
        self.points.get(index)
    }

    /// Nose tip, the point every face is anchored at.
    #[inline]
    pub fn anchor(&self) -> Option<&Landmark> {
        self.get(mesh::NOSE_TIP)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
