// src/engine/batch.rs
//
// Batch Orchestrator: runs conversion jobs strictly sequentially (bounding
// peak memory to one job's buffers), records per-job outcomes without
// aborting on failure, and reports progress after every attempt.

use crate::engine::pipeline::{self, Converted};
use crate::settings::{EncodeSettings, ResizePolicy};

/// Per-job state machine: PENDING -> RUNNING -> {DONE, FAILED}.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Running,
    Done,
    Failed,
}

/// One input-file-to-output-file conversion unit.
#[derive(Clone, Debug)]
pub struct ConversionJob {
    pub source_name: String,
    pub bytes: Vec<u8>,
    pub resize: ResizePolicy,
    pub encode: EncodeSettings,
}

impl ConversionJob {
    pub fn new(
        source_name: impl Into<String>,
        bytes: Vec<u8>,
        resize: ResizePolicy,
        encode: EncodeSettings,
    ) -> Self {
        Self {
            source_name: source_name.into(),
            bytes,
            resize,
            encode,
        }
    }
}

/// Result of one job, success or failure. Failures carry the source name
/// and a human-readable reason; they never abort the batch.
#[derive(Clone, Debug)]
pub enum JobOutcome {
    Success(Converted),
    Failure {
        source_name: String,
        message: String,
    },
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn source_name(&self) -> &str {
        match self {
            Self::Success(converted) => &converted.source_name,
            Self::Failure { source_name, .. } => source_name,
        }
    }
}

/// Evolving batch state, mutated only by the orchestrator and observable
/// through the progress callback after each job completes.
#[derive(Clone, Debug)]
pub struct BatchState {
    statuses: Vec<JobStatus>,
    completed: usize,
}

impl BatchState {
    fn new(total: usize) -> Self {
        Self {
            statuses: vec![JobStatus::Pending; total],
            completed: 0,
        }
    }

    pub fn statuses(&self) -> &[JobStatus] {
        &self.statuses
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn total(&self) -> usize {
        self.statuses.len()
    }

    /// Fraction of attempted jobs in [0, 1]. Failed attempts count toward
    /// completion so progress reaches 1.0 even for all-failed batches.
    pub fn progress(&self) -> f64 {
        if self.statuses.is_empty() {
            return 1.0;
        }
        self.completed as f64 / self.statuses.len() as f64
    }
}

/// Run all jobs in input order, one at a time.
///
/// The callback fires after every attempt with `(completed, total, state)`;
/// outcomes are returned in job order once the batch finishes.
pub fn run_batch<F>(jobs: &[ConversionJob], mut on_progress: F) -> Vec<JobOutcome>
where
    F: FnMut(usize, usize, &BatchState),
{
    let total = jobs.len();
    let mut state = BatchState::new(total);
    let mut outcomes = Vec::with_capacity(total);

    for (index, job) in jobs.iter().enumerate() {
        state.statuses[index] = JobStatus::Running;
        tracing::debug!(job = %job.source_name, index, total, "job started");

        let outcome = match pipeline::convert(&job.source_name, &job.bytes, &job.resize, &job.encode)
        {
            Ok(converted) => {
                state.statuses[index] = JobStatus::Done;
                JobOutcome::Success(converted)
            }
            Err(err) => {
                state.statuses[index] = JobStatus::Failed;
                tracing::warn!(job = %job.source_name, error = %err, "job failed");
                JobOutcome::Failure {
                    source_name: job.source_name.clone(),
                    message: err.to_string(),
                }
            }
        };

        state.completed += 1;
        outcomes.push(outcome);
        on_progress(state.completed, total, &state);
    }

    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::OutputFormat;
    use image::{Rgba, RgbaImage};
    use std::io::Cursor;

    fn png_job(name: &str, px: [u8; 4]) -> ConversionJob {
        let img = RgbaImage::from_pixel(8, 8, Rgba(px));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        ConversionJob::new(
            name,
            buf,
            ResizePolicy::default(),
            EncodeSettings {
                format: OutputFormat::Png,
                quality: 80,
                preserve_metadata: false,
            },
        )
    }

    fn corrupt_job(name: &str) -> ConversionJob {
        ConversionJob::new(
            name,
            b"garbage bytes".to_vec(),
            ResizePolicy::default(),
            EncodeSettings::default(),
        )
    }

    #[test]
    fn test_failed_job_does_not_halt_batch() {
        let jobs = vec![
            png_job("a.png", [1, 1, 1, 255]),
            corrupt_job("b.png"),
            png_job("c.png", [2, 2, 2, 255]),
        ];

        let mut progress_calls = Vec::new();
        let outcomes = run_batch(&jobs, |completed, total, state| {
            progress_calls.push((completed, total, state.progress()));
        });

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].is_success());
        assert!(!outcomes[1].is_success());
        assert!(outcomes[2].is_success());

        match &outcomes[1] {
            JobOutcome::Failure {
                source_name,
                message,
            } => {
                assert_eq!(source_name, "b.png");
                assert!(!message.is_empty());
            }
            other => panic!("expected failure, got {other:?}"),
        }

        assert_eq!(progress_calls.len(), 3);
        assert_eq!(progress_calls[0], (1, 3, 1.0 / 3.0));
        assert_eq!(progress_calls[2].2, 1.0);
    }

    #[test]
    fn test_statuses_track_state_machine() {
        let jobs = vec![png_job("a.png", [0, 0, 0, 255]), corrupt_job("b.png")];
        let mut final_statuses = Vec::new();
        run_batch(&jobs, |_, _, state| {
            final_statuses = state.statuses().to_vec();
        });
        assert_eq!(final_statuses, vec![JobStatus::Done, JobStatus::Failed]);
    }

    #[test]
    fn test_outcomes_preserve_input_order() {
        let jobs = vec![
            png_job("first.png", [1, 0, 0, 255]),
            png_job("second.png", [0, 1, 0, 255]),
        ];
        let outcomes = run_batch(&jobs, |_, _, _| {});
        assert_eq!(outcomes[0].source_name(), "first.png");
        assert_eq!(outcomes[1].source_name(), "second.png");
    }

    #[test]
    fn test_empty_batch_reports_full_progress() {
        let outcomes = run_batch(&[], |_, _, _| panic!("no jobs, no callbacks"));
        assert!(outcomes.is_empty());
        assert_eq!(BatchState::new(0).progress(), 1.0);
    }
}
