//! Structured session logging.
//!
//! One session covers one continuous run of the mirror, from the first
//! frame until the camera loop or replay stops. Session events log at info,
//! per-frame work runs inside a debug `frame` span nested in the session span.

use std::time::Duration;

use nosemirror_models::{IdentityId, SessionId};
use tracing::{info, warn, Span};

/// Session logger with consistent structured fields.
#[derive(Debug, Clone)]
pub struct SessionLogger {
    session_id: SessionId,
    source: String,
}

impl SessionLogger {
    /// Create a logger for a fresh session.
    ///
    /// # Arguments
    /// * `source` - Where frames come from (e.g. "camera", a trace file path)
    pub fn new(source: &str) -> Self {
        Self::with_id(SessionId::new(), source)
    }

    /// Create a logger for an existing session id.
    pub fn with_id(session_id: SessionId, source: &str) -> Self {
        Self {
            session_id,
            source: source.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            session_id = %self.session_id,
            source = %self.source,
            "Session started: {}", message
        );
    }

    /// Periodic heartbeat with the running frame count.
    pub fn log_progress(&self, frames: u64, identities: usize) {
        info!(
            session_id = %self.session_id,
            frames,
            identities,
            "Session progress"
        );
    }

    /// An identity crossed into the engaged state on `frame`.
    pub fn log_engaged(&self, identity: IdentityId, frame: u64) {
        info!(
            session_id = %self.session_id,
            identity,
            frame,
            "Smile engaged"
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            session_id = %self.session_id,
            source = %self.source,
            "Session warning: {}", message
        );
    }

    pub fn log_completion(&self, frames: u64, engagements: u64, elapsed: Duration) {
        info!(
            session_id = %self.session_id,
            source = %self.source,
            frames,
            engagements,
            elapsed_secs = elapsed.as_secs_f64(),
            "Session completed"
        );
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Span wrapping all per-frame work of this session.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "session",
            session_id = %self.session_id,
            source = %self.source
        )
    }

    /// Span for one frame; enter it inside the session span.
    pub fn frame_span(&self, frame: u64, timestamp_secs: f64) -> Span {
        tracing::debug_span!("frame", frame, timestamp_secs)
    }
}
