//! Shared data models for the NoseMirror smile tracker.
//!
//! This crate provides Serde-serializable types for:
//! - Detection boxes and identity centroids
//! - Face mesh landmarks
//! - Per-frame input records and per-frame reports
//! - Laugh cues and overlay placements handed to the render/audio side

pub mod frame;
pub mod geometry;
pub mod landmarks;
pub mod session;

// Re-export common types
pub use frame::{FrameInput, FrameReport, IdentityReport, LaughCue, OverlayPlacement};
pub use geometry::{BoundingBox, Centroid};
pub use landmarks::{FaceLandmarks, Landmark};
pub use session::{SessionId, SessionIdError};

/// Integer identity assigned by the tracker to one face.
///
/// Identities are small non-negative integers and are reused after expiry.
pub type IdentityId = u32;
