//! Feeds a JSON Lines trace through the frame pipeline.

use std::collections::BTreeSet;
use std::io::{BufRead, Write};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use nosemirror_core::{FramePipeline, MirrorSettings, SessionLogger};
use nosemirror_models::{FrameInput, IdentityId, SessionId};
use serde::Serialize;
use tracing::debug;

use crate::error::{ReplayError, ReplayResult};

/// Totals for one replay run.
#[derive(Debug, Clone, Serialize)]
pub struct ReplaySummary {
    pub session_id: SessionId,
    pub started_at: DateTime<Utc>,
    pub frames: u64,
    /// Most identities tracked at once
    pub peak_identities: usize,
    /// Transitions into the engaged state, across all identities
    pub engagements: u64,
    #[serde(with = "secs")]
    pub wall_time: Duration,
}

mod secs {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }
}

/// Replays recorded frames through one pipeline.
pub struct Replayer {
    pipeline: FramePipeline,
    logger: SessionLogger,
    progress_every: u64,
}

impl Replayer {
    /// Create a replayer.
    ///
    /// # Arguments
    /// * `settings` - Pipeline settings, validated here
    /// * `seed` - Fixed seed for spotlight choices, or `None` for OS entropy
    /// * `source` - Label for the session logs
    pub fn new(settings: MirrorSettings, seed: Option<u64>, source: &str) -> ReplayResult<Self> {
        let pipeline = match seed {
            Some(seed) => FramePipeline::seeded(settings, seed)?,
            None => FramePipeline::new(settings)?,
        };

        Ok(Self {
            pipeline,
            logger: SessionLogger::new(source),
            progress_every: 0,
        })
    }

    /// Log progress every `frames` frames; 0 disables.
    pub fn with_progress_every(mut self, frames: u64) -> Self {
        self.progress_every = frames;
        self
    }

    pub fn session_id(&self) -> &SessionId {
        self.logger.session_id()
    }

    /// Read every frame from `input` and write one report line per frame.
    ///
    /// Blank lines are skipped. A malformed record stops the run with its
    /// line number.
    pub fn run<R: BufRead, W: Write>(
        &mut self,
        input: R,
        mut output: W,
    ) -> ReplayResult<ReplaySummary> {
        let span = self.logger.create_span();
        let _guard = span.enter();

        let started_at = Utc::now();
        let clock = Instant::now();
        self.logger.log_start(&format!("replay at {}", started_at.to_rfc3339()));

        let mut frames = 0u64;
        let mut peak_identities = 0usize;
        let mut engagements = 0u64;
        let mut engaged: BTreeSet<IdentityId> = BTreeSet::new();

        for (index, line) in input.lines().enumerate() {
            let line = line?;
            let line_number = index as u64 + 1;
            if line.trim().is_empty() {
                debug!(line = line_number, "Skipping blank line");
                continue;
            }

            let frame: FrameInput = serde_json::from_str(&line).map_err(|source| {
                ReplayError::InvalidRecord {
                    line: line_number,
                    source,
                }
            })?;
            let frame_span = self.logger.frame_span(frames, frame.timestamp_secs);
            let report = frame_span.in_scope(|| self.pipeline.process(&frame));

            let now_engaged: BTreeSet<IdentityId> = report
                .identities
                .iter()
                .filter(|r| r.engaged)
                .map(|r| r.id)
                .collect();
            for &id in now_engaged.difference(&engaged) {
                self.logger.log_engaged(id, report.frame_index);
                engagements += 1;
            }
            engaged = now_engaged;
            peak_identities = peak_identities.max(report.identities.len());

            serde_json::to_writer(&mut output, &report).map_err(|source| {
                ReplayError::WriteReport {
                    frame: report.frame_index,
                    source,
                }
            })?;
            output.write_all(b"\n")?;
            frames += 1;

            if self.progress_every > 0 && frames.is_multiple_of(self.progress_every) {
                self.logger.log_progress(frames, report.identities.len());
            }
        }
        output.flush()?;

        let summary = ReplaySummary {
            session_id: *self.logger.session_id(),
            started_at,
            frames,
            peak_identities,
            engagements,
            wall_time: clock.elapsed(),
        };

        if frames == 0 {
            self.logger.log_warning("trace contained no frames");
        }
        self.logger.log_completion(summary.frames, summary.engagements, summary.wall_time);
        Ok(summary)
    }
}
