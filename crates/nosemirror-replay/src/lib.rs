//! Trace replay for the NoseMirror pipeline.
//!
//! Reads recorded detector output as JSON Lines, one `FrameInput` per line,
//! and writes one `FrameReport` per processed frame.

pub mod config;
pub mod error;
pub mod runner;

pub use config::{ReplayArgs, ReplayConfig};
pub use error::{ReplayError, ReplayResult};
pub use runner::{ReplaySummary, Replayer};
