//! Replay configuration.

use std::path::PathBuf;

use crate::error::{ReplayError, ReplayResult};

/// Runtime options read from the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayConfig {
    /// File to write reports to instead of stdout
    pub output_path: Option<PathBuf>,
    /// Settings file used when none is given on the command line
    pub settings_path: Option<PathBuf>,
    /// Seed for spotlight choices; random when unset
    pub seed: Option<u64>,
    /// Install the Prometheus recorder and log the exposition at the end
    pub metrics_enabled: bool,
    /// Log progress every this many frames, 0 disables
    pub progress_every: u64,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            output_path: None,
            settings_path: None,
            seed: None,
            metrics_enabled: false,
            progress_every: 300,
        }
    }
}

impl ReplayConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            output_path: std::env::var("REPLAY_OUTPUT").ok().map(PathBuf::from),
            settings_path: std::env::var("REPLAY_SETTINGS").ok().map(PathBuf::from),
            seed: std::env::var("REPLAY_SEED")
                .ok()
                .and_then(|s| s.parse().ok()),
            metrics_enabled: std::env::var("REPLAY_METRICS")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            progress_every: std::env::var("REPLAY_PROGRESS_EVERY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(300),
        }
    }
}

/// Command line: `nosemirror-replay [TRACE] [--settings FILE]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplayArgs {
    /// Trace to read; stdin when absent or `-`
    pub trace: Option<PathBuf>,
    pub settings: Option<PathBuf>,
}

impl ReplayArgs {
    /// Parse arguments, excluding the program name.
    pub fn parse<I>(args: I) -> ReplayResult<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut parsed = Self::default();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--settings" | "-s" => {
                    let path = args
                        .next()
                        .ok_or_else(|| ReplayError::invalid_args("--settings needs a file"))?;
                    parsed.settings = Some(PathBuf::from(path));
                }
                "-" => parsed.set_trace(None)?,
                flag if flag.starts_with('-') => {
                    return Err(ReplayError::invalid_args(format!("unknown option {}", flag)));
                }
                path => parsed.set_trace(Some(PathBuf::from(path)))?,
            }
        }

        Ok(parsed)
    }

    fn set_trace(&mut self, trace: Option<PathBuf>) -> ReplayResult<()> {
        if self.trace.is_some() {
            return Err(ReplayError::invalid_args("only one trace may be given"));
        }
        self.trace = trace;
        Ok(())
    }
}
