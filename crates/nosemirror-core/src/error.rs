//! Error types for the NoseMirror core.
//!
//! Per-frame updates never fail; only construction and settings loading do.

use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur while building or configuring the pipeline.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid {section} configuration: {message}")]
    InvalidConfig {
        section: &'static str,
        message: String,
    },

    #[error("Failed to load settings: {0}")]
    Settings(#[from] config::ConfigError),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// Create an invalid configuration error.
    pub fn invalid_config(section: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            section,
            message: message.into(),
        }
    }

    /// Wrap `validator` errors for one configuration section.
    pub fn from_validation(section: &'static str, errors: validator::ValidationErrors) -> Self {
        Self::invalid_config(section, errors.to_string())
    }
}
