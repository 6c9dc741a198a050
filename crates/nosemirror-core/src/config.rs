//! Configuration for the tracker, the scale controller and the spotlight.
//!
//! Every threshold is named here once and validated once, at construction
//! time. Defaults carry the reference tuning.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;
use validator::{Validate, ValidationError};

use crate::error::{CoreError, CoreResult};

/// Prefix for environment overrides, e.g. `NOSEMIRROR__SCALE__RATE_UP=3.0`.
pub const ENV_PREFIX: &str = "NOSEMIRROR";

/// Configuration for centroid tracking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct TrackerConfig {
    /// Maximum centroid movement in pixels still treated as the same face (default: 50.0)
    #[validate(range(exclusive_min = 0.0))]
    pub max_distance: f64,

    /// Consecutive unmatched frames a track survives before it is dropped (default: 50)
    pub max_disappeared: u32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            max_distance: 50.0,
            max_disappeared: 50,
        }
    }
}

impl TrackerConfig {
    /// Kiosk configuration: people drift in and out of a mirror installation,
    /// so tracks are held for roughly ten seconds at 30 fps.
    pub fn kiosk() -> Self {
        Self {
            max_disappeared: 300,
            ..Default::default()
        }
    }
}

/// Configuration for smile-gated scale control.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
#[validate(schema(function = "validate_scale_gates"))]
pub struct ScaleConfig {
    // === Output Bounds ===
    /// Lowest scale ever emitted (default: 2.0)
    pub scale_min: f64,

    /// Highest scale ever emitted (default: 3.8)
    pub scale_max: f64,

    // === Smoothing ===
    /// EMA weight of the raw smile score (default: 0.25)
    #[validate(range(exclusive_min = 0.0, max = 1.0))]
    pub score_alpha: f64,

    /// EMA weight of the neutral baseline; keep it slow (default: 0.05)
    #[validate(range(exclusive_min = 0.0, max = 1.0))]
    pub baseline_alpha: f64,

    /// EMA weight of the baseline deviation estimate (default: 0.05)
    #[validate(range(exclusive_min = 0.0, max = 1.0))]
    pub noise_alpha: f64,

    // === Absolute Gates ===
    /// Smoothed score required to be candidate-on (default: 0.25)
    #[validate(range(min = 0.0, max = 1.0))]
    pub abs_on: f64,

    /// Smoothed score below which the face is candidate-off (default: 0.18)
    #[validate(range(min = 0.0, max = 1.0))]
    pub abs_off: f64,

    // === Relative Gates ===
    /// Minimum rise above baseline to be candidate-on (default: 0.05)
    #[validate(range(min = 0.0))]
    pub delta_on: f64,

    /// Minimum rise above baseline to stay on (default: 0.01)
    #[validate(range(min = 0.0))]
    pub delta_off: f64,

    /// Noise multiplier for the on gate (default: 0.7)
    #[validate(range(min = 0.0))]
    pub k_on: f64,

    /// Noise multiplier for the off gate (default: 0.1)
    #[validate(range(min = 0.0))]
    pub k_off: f64,

    // === Debounce ===
    /// Consecutive candidate-on frames before engaging (default: 7)
    #[validate(range(min = 1))]
    pub min_on_frames: u32,

    /// Seconds after first sight during which scale may not grow (default: 2.0)
    #[validate(range(min = 0.0))]
    pub calibration_secs: f64,

    // === Rates (per second, frame-rate independent) ===
    /// Growth per second per unit of score above the on gate (default: 4.0)
    #[validate(range(min = 0.0))]
    pub rate_up: f64,

    /// Decay per second while not smiling (default: 0.6)
    #[validate(range(min = 0.0))]
    pub rate_down: f64,

    /// Floor for elapsed time between updates of one identity (default: 1/120 s)
    #[validate(range(exclusive_min = 0.0))]
    pub min_dt_secs: f64,

    // === Identity Reuse ===
    /// How long a departed identity's scale is remembered for reuse (default: 1.0, 0 disables)
    #[validate(range(min = 0.0))]
    pub scale_retention_secs: f64,
}

impl Default for ScaleConfig {
    fn default() -> Self {
        Self {
            scale_min: 2.0,
            scale_max: 3.8,

            score_alpha: 0.25,
            baseline_alpha: 0.05,
            noise_alpha: 0.05,

            abs_on: 0.25,
            abs_off: 0.18,

            delta_on: 0.05,
            delta_off: 0.01,
            k_on: 0.7,
            k_off: 0.1,

            min_on_frames: 7,
            calibration_secs: 2.0,

            rate_up: 4.0,
            rate_down: 0.6,
            min_dt_secs: 1.0 / 120.0,

            scale_retention_secs: 1.0,
        }
    }
}

// Negated comparisons also reject NaN bounds.
#[allow(clippy::neg_cmp_op_on_partial_ord)]
fn validate_scale_gates(config: &ScaleConfig) -> Result<(), ValidationError> {
    fn reject(code: &'static str, message: &'static str) -> Result<(), ValidationError> {
        Err(ValidationError::new(code).with_message(message.into()))
    }

    if !(config.scale_min < config.scale_max) {
        return reject("scale_bounds", "scale_min must be below scale_max");
    }
    if !(config.abs_off < config.abs_on) {
        return reject("abs_gates", "abs_off must be below abs_on");
    }
    if !(config.delta_off < config.delta_on) {
        return reject("delta_gates", "delta_off must be below delta_on");
    }
    if !(config.k_off < config.k_on) {
        return reject("noise_gates", "k_off must be below k_on");
    }
    Ok(())
}

/// Configuration for choosing who wears the overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SpotlightConfig {
    /// Seconds between swaps when exactly two people are in frame (default: 15.0)
    #[validate(range(exclusive_min = 0.0))]
    pub swap_interval_secs: f64,

    /// Display clamp applied on top of the controller's bounds (default: 4.5)
    #[validate(range(exclusive_min = 0.0))]
    pub max_display_scale: f64,

    /// Scale used when a face has no controller output yet (default: 3.0)
    #[validate(range(exclusive_min = 0.0))]
    pub fallback_scale: f64,

    /// Number of overlay assets to pick from; 0 disables placement (default: 1)
    pub asset_count: usize,

    /// Smallest overlay edge in pixels (default: 8)
    pub min_overlay_size: u32,

    /// Fraction of the overlay size it is lifted above the nose tip (default: 0.7)
    #[validate(range(min = 0.0, max = 1.0))]
    pub overlay_lift: f64,
}

impl Default for SpotlightConfig {
    fn default() -> Self {
        Self {
            swap_interval_secs: 15.0,
            max_display_scale: 4.5,
            fallback_scale: 3.0,
            asset_count: 1,
            min_overlay_size: 8,
            overlay_lift: 0.7,
        }
    }
}

/// All pipeline settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MirrorSettings {
    pub tracker: TrackerConfig,
    pub scale: ScaleConfig,
    pub spotlight: SpotlightConfig,
}

impl MirrorSettings {
    /// Load settings from an optional file layered under environment overrides.
    ///
    /// Missing keys keep their defaults. The file format follows its extension.
    pub fn load(path: Option<&Path>) -> CoreResult<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            debug!(path = %path.display(), "Loading settings file");
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let settings: MirrorSettings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Parse settings from a JSON document.
    pub fn from_json(json: &str) -> CoreResult<Self> {
        let settings: MirrorSettings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate every section.
    pub fn validate(&self) -> CoreResult<()> {
        self.tracker
            .validate()
            .map_err(|e| CoreError::from_validation("tracker", e))?;
        self.scale
            .validate()
            .map_err(|e| CoreError::from_validation("scale", e))?;
        self.spotlight
            .validate()
            .map_err(|e| CoreError::from_validation("spotlight", e))?;
        Ok(())
    }
}
