//! Replay error types.

use thiserror::Error;

pub type ReplayResult<T> = Result<T, ReplayError>;

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("Invalid frame record on line {line}: {source}")]
    InvalidRecord {
        line: u64,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write report for frame {frame}: {source}")]
    WriteReport {
        frame: u64,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("Core error: {0}")]
    Core(#[from] nosemirror_core::CoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ReplayError {
    pub fn invalid_args(msg: impl Into<String>) -> Self {
        Self::InvalidArgs(msg.into())
    }
}
