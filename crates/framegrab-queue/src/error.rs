//! Queue error types.

use thiserror::Error;

pub type QueueResult<T> = Result<T, QueueError>;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Dequeue failed: {0}")]
    DequeueFailed(String),

    #[error("Status write failed: {0}")]
    StatusWriteFailed(String),

    #[error("Malformed job payload: {0}")]
    MalformedJob(String),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl QueueError {
    pub fn connection_failed(msg: impl Into<String>) -> Self {
        Self::ConnectionFailed(msg.into())
    }

    pub fn dequeue_failed(msg: impl Into<String>) -> Self {
        Self::DequeueFailed(msg.into())
    }

    pub fn status_write_failed(msg: impl Into<String>) -> Self {
        Self::StatusWriteFailed(msg.into())
    }

    pub fn malformed_job(msg: impl Into<String>) -> Self {
        Self::MalformedJob(msg.into())
    }
}
