//! Job status records published for polling clients.
//!
//! Each write replaces the whole record stored at `job:<jobId>`; a missing
//! key means the record expired or was never written.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Phase of a single job run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobPhase {
    /// Written by the submitting client before enqueue, never by the worker
    Queued,
    Processing,
    UploadingImages,
    Zipping,
    Done,
    Error,
}

impl JobPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobPhase::Queued => "QUEUED",
            JobPhase::Processing => "PROCESSING",
            JobPhase::UploadingImages => "UPLOADING_IMAGES",
            JobPhase::Zipping => "ZIPPING",
            JobPhase::Done => "DONE",
            JobPhase::Error => "ERROR",
        }
    }

    /// Forward order of the phases. `Error` can follow any non-terminal
    /// phase, so it ranks above all of them.
    pub fn rank(&self) -> u8 {
        match self {
            JobPhase::Queued => 0,
            JobPhase::Processing => 1,
            JobPhase::UploadingImages => 2,
            JobPhase::Zipping => 3,
            JobPhase::Done => 4,
            JobPhase::Error => 5,
        }
    }

    /// Check if this is a terminal state (no more updates expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobPhase::Done | JobPhase::Error)
    }
}

impl fmt::Display for JobPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single uploaded frame as seen by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameLink {
    /// 1-based position in extraction order
    pub id: u32,
    /// Time-limited retrieval link
    pub image_url: String,
    /// Human label for the position
    pub timestamp: String,
}

impl FrameLink {
    pub fn new(id: u32, image_url: impl Into<String>) -> Self {
        Self {
            id,
            image_url: image_url.into(),
            timestamp: format!("Frame {}", id),
        }
    }
}

/// Full status record for a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusRecord {
    Queued {
        #[serde(rename = "jobId", default, skip_serializing_if = "Option::is_none")]
        job_id: Option<String>,
    },
    Processing,
    UploadingImages,
    Zipping,
    #[serde(rename_all = "camelCase")]
    Done {
        zip_url: String,
        frames: Vec<FrameLink>,
        quality: u32,
    },
    Error {
        error: String,
    },
}

impl StatusRecord {
    /// Record for a non-terminal phase, `None` for terminal ones.
    pub fn running(phase: JobPhase) -> Option<Self> {
        match phase {
            JobPhase::Processing => Some(Self::Processing),
            JobPhase::UploadingImages => Some(Self::UploadingImages),
            JobPhase::Zipping => Some(Self::Zipping),
            JobPhase::Queued => Some(Self::Queued { job_id: None }),
            JobPhase::Done | JobPhase::Error => None,
        }
    }

    pub fn done(zip_url: impl Into<String>, frames: Vec<FrameLink>, quality: u32) -> Self {
        Self::Done {
            zip_url: zip_url.into(),
            frames,
            quality,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error: message.into(),
        }
    }

    pub fn phase(&self) -> JobPhase {
        match self {
            StatusRecord::Queued { .. } => JobPhase::Queued,
            StatusRecord::Processing => JobPhase::Processing,
            StatusRecord::UploadingImages => JobPhase::UploadingImages,
            StatusRecord::Zipping => JobPhase::Zipping,
            StatusRecord::Done { .. } => JobPhase::Done,
            StatusRecord::Error { .. } => JobPhase::Error,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.phase().is_terminal()
    }
}
