//! Model validation errors.

use thiserror::Error;

pub type ModelResult<T> = Result<T, ModelError>;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Invalid job ID: {0}")]
    InvalidJobId(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid field `{field}`: {message}")]
    InvalidField { field: &'static str, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ModelError {
    pub fn invalid_field(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            message: message.into(),
        }
    }
}
