//! Error types for media operations.

use std::process::ExitStatus;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while extracting or packaging frames.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("{0} not found in PATH")]
    ToolNotFound(String),

    #[error("{program} failed ({status})")]
    ResolverFailed {
        program: String,
        status: String,
        exit_code: Option<i32>,
    },

    #[error("{program} failed ({status})")]
    ExtractorFailed {
        program: String,
        status: String,
        exit_code: Option<i32>,
    },

    #[error("Invalid tool configuration: {0}")]
    InvalidConfig(String),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MediaError {
    /// Create a resolver failure from its exit status.
    pub fn resolver_failed(program: impl Into<String>, status: ExitStatus) -> Self {
        Self::ResolverFailed {
            program: program.into(),
            status: describe_status(status),
            exit_code: status.code(),
        }
    }

    /// Create an extractor failure from its exit status.
    pub fn extractor_failed(program: impl Into<String>, status: ExitStatus) -> Self {
        Self::ExtractorFailed {
            program: program.into(),
            status: describe_status(status),
            exit_code: status.code(),
        }
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Exit code of a failed tool, if it exited normally.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            MediaError::ResolverFailed { exit_code, .. }
            | MediaError::ExtractorFailed { exit_code, .. } => *exit_code,
            _ => None,
        }
    }
}

fn describe_status(status: ExitStatus) -> String {
    match status.code() {
        Some(code) => format!("code {}", code),
        None => "terminated by signal".to_string(),
    }
}
