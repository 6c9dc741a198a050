//! NoseMirror core engine.
//!
//! This crate turns per-frame face detections into stable identities and
//! smile-driven overlay scales:
//! - [`IdentityTracker`]: greedy centroid tracking with identity reuse
//! - [`ScaleController`]: per-identity smile hysteresis and scale integration
//! - [`associate`]: ties face meshes to identities and scores smiles
//! - [`Spotlight`]: picks who wears the overlay and where it goes
//! - [`FramePipeline`]: runs all of the above for one frame
//!
//! Everything is synchronous. Callers own the camera loop and supply
//! monotonic timestamps.

pub mod association;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod scale;
pub mod scoring;
pub mod spotlight;
pub mod tracker;

pub use association::{associate, Associated};
pub use crate::config::{MirrorSettings, ScaleConfig, SpotlightConfig, TrackerConfig, ENV_PREFIX};
pub use error::{CoreError, CoreResult};
pub use logging::SessionLogger;
pub use pipeline::FramePipeline;
pub use scale::{PersonState, ScaleController};
pub use scoring::{overlay_base_size, smile_score};
pub use spotlight::Spotlight;
pub use tracker::IdentityTracker;
