//! Worker error types.

use thiserror::Error;

use framegrab_models::JobPhase;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Invalid status transition from {} to {to}", phase_name(.from))]
    InvalidTransition {
        from: Option<JobPhase>,
        to: JobPhase,
    },

    #[error("Job timed out after {0} seconds")]
    Timeout(u64),

    #[error("Media error: {0}")]
    Media(#[from] framegrab_media::MediaError),

    #[error("Queue error: {0}")]
    Queue(#[from] framegrab_queue::QueueError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn upload_failed(msg: impl Into<String>) -> Self {
        Self::UploadFailed(msg.into())
    }
}

fn phase_name(phase: &Option<JobPhase>) -> &'static str {
    phase.as_ref().map(JobPhase::as_str).unwrap_or("none")
}
