//! Per-job log events.
//!
//! Events carry `job_id` and `operation` as fields so JSON output can be
//! filtered down to one job.

use std::fmt::Display;

use tracing::{error, info, warn, Span};

use framegrab_models::JobId;

/// Placeholder id for payloads that never decoded far enough to name a job.
const UNKNOWN_JOB: &str = "-";

#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: String,
    operation: &'static str,
}

impl JobLogger {
    pub fn new(job_id: &JobId, operation: &'static str) -> Self {
        Self {
            job_id: job_id.to_string(),
            operation,
        }
    }

    pub fn unidentified(operation: &'static str) -> Self {
        Self {
            job_id: UNKNOWN_JOB.to_string(),
            operation,
        }
    }

    /// Span the whole job runs under.
    pub fn span(&self) -> Span {
        tracing::info_span!("job", job_id = %self.job_id, operation = self.operation)
    }

    pub fn started(&self, url: &str, quality: u32) {
        info!(
            job_id = %self.job_id,
            operation = self.operation,
            url,
            quality,
            "Job started"
        );
    }

    pub fn progress(&self, message: &str) {
        info!(job_id = %self.job_id, operation = self.operation, "{}", message);
    }

    pub fn warning(&self, message: &str) {
        warn!(job_id = %self.job_id, operation = self.operation, "{}", message);
    }

    pub fn failed(&self, err: &dyn Display) {
        error!(
            job_id = %self.job_id,
            operation = self.operation,
            error = %err,
            "Job failed"
        );
    }

    pub fn finished(&self, elapsed_secs: f64) {
        info!(
            job_id = %self.job_id,
            operation = self.operation,
            elapsed_secs,
            "Job completed in {:.1}s",
            elapsed_secs
        );
    }
}
