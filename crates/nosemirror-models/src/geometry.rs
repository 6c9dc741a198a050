//! Pixel-space geometry shared by the tracker and the overlay side.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Axis-aligned detection box in frame-pixel coordinates.
///
/// Produced once per frame by the external face detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct BoundingBox {
    /// Left edge x-coordinate
    pub x: i32,
    /// Top edge y-coordinate
    pub y: i32,
    /// Box width
    pub width: i32,
    /// Box height
    pub height: i32,
}

impl BoundingBox {
    /// Create a new bounding box.
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Box center, truncated toward zero onto the pixel grid.
    #[inline]
    pub fn centroid(&self) -> Centroid {
        let cx = f64::from(self.x) + f64::from(self.width) / 2.0;
        let cy = f64::from(self.y) + f64::from(self.height) / 2.0;
        Centroid::new(cx as i32, cy as i32)
    }

    /// Box area in pixels.
    #[inline]
    pub fn area(&self) -> i64 {
        i64::from(self.width) * i64::from(self.height)
    }
}

impl From<(i32, i32, i32, i32)> for BoundingBox {
    fn from((x, y, width, height): (i32, i32, i32, i32)) -> Self {
        Self::new(x, y, width, height)
    }
}

/// Integer pixel position of a tracked identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct Centroid {
    pub x: i32,
    pub y: i32,
}

impl Centroid {
    /// Create a new centroid.
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another centroid.
    #[inline]
    pub fn distance(&self, other: &Centroid) -> f64 {
        self.distance_sq_to(f64::from(other.x), f64::from(other.y)).sqrt()
    }

    /// Squared distance to an arbitrary point.
    #[inline]
    pub fn distance_sq_to(&self, x: f64, y: f64) -> f64 {
        let dx = f64::from(self.x) - x;
        let dy = f64::from(self.y) - y;
        dx * dx + dy * dy
    }
}
