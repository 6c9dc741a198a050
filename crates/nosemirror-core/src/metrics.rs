//! Metrics for tracking and scale control.
//!
//! Recorded through the `metrics` facade; without an installed recorder
//! every call is a no-op.

use ::metrics::{counter, gauge, histogram};

/// Metric names as constants for consistency.
pub mod names {
    // Tracker metrics
    pub const TRACKS_REGISTERED_TOTAL: &str = "nosemirror_tracks_registered_total";
    pub const TRACKS_EXPIRED_TOTAL: &str = "nosemirror_tracks_expired_total";
    pub const IDENTITIES_REUSED_TOTAL: &str = "nosemirror_identities_reused_total";

    // Scale controller metrics
    pub const ENGAGEMENTS_TOTAL: &str = "nosemirror_engagements_total";
    pub const SCALES_RESTORED_TOTAL: &str = "nosemirror_scales_restored_total";
    pub const LIVE_IDENTITIES: &str = "nosemirror_live_identities";

    // Pipeline metrics
    pub const FRAMES_PROCESSED_TOTAL: &str = "nosemirror_frames_processed_total";
    pub const FRAME_DURATION_SECONDS: &str = "nosemirror_frame_duration_seconds";
}

/// Record a newly registered track.
pub fn record_track_registered() {
    counter!(names::TRACKS_REGISTERED_TOTAL).increment(1);
}

/// Record a track dropped after too many missed frames.
pub fn record_track_expired() {
    counter!(names::TRACKS_EXPIRED_TOTAL).increment(1);
}

/// Record a registration that recycled a released identity.
pub fn record_identity_reused() {
    counter!(names::IDENTITIES_REUSED_TOTAL).increment(1);
}

/// Record a transition into the engaged state.
pub fn record_engagement() {
    counter!(names::ENGAGEMENTS_TOTAL).increment(1);
}

/// Record a reappearing identity seeded from its retained scale.
pub fn record_scale_restored() {
    counter!(names::SCALES_RESTORED_TOTAL).increment(1);
}

/// Record the number of identities the controller holds state for.
pub fn record_live_identities(count: usize) {
    gauge!(names::LIVE_IDENTITIES).set(count as f64);
}

/// Record one processed frame.
pub fn record_frame(duration_secs: f64) {
    counter!(names::FRAMES_PROCESSED_TOTAL).increment(1);
    histogram!(names::FRAME_DURATION_SECONDS).record(duration_secs);
}
