//! Job descriptors popped from the inbound queue.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::error::{ModelError, ModelResult};

/// Target height used when a job does not request one.
pub const DEFAULT_QUALITY: u32 = 480;

/// Maximum accepted job ID length.
const MAX_JOB_ID_LEN: usize = 128;

/// Caller-supplied job identifier.
///
/// The ID scopes the status key, the object storage namespace and the
/// local working directory, so it must be a single path-safe segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct JobId(String);

impl JobId {
    /// Validate and wrap an existing string.
    pub fn parse(s: impl Into<String>) -> ModelResult<Self> {
        let s = s.into();
        if s.is_empty() {
            return Err(ModelError::InvalidJobId("empty".to_string()));
        }
        if s.len() > MAX_JOB_ID_LEN {
            return Err(ModelError::InvalidJobId(format!(
                "longer than {} bytes",
                MAX_JOB_ID_LEN
            )));
        }
        if s == "." || s == ".." {
            return Err(ModelError::InvalidJobId(s));
        }
        if s.chars().any(|c| c == '/' || c == '\\' || c.is_control()) {
            return Err(ModelError::InvalidJobId(s));
        }
        Ok(Self(s))
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for JobId {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<JobId> for String {
    fn from(id: JobId) -> Self {
        id.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A frame extraction request.
///
/// Wire format: `{jobId, url, quality?, limit?}`. Numeric fields accept
/// either JSON numbers or numeric strings. Unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDescriptor {
    /// Unique job ID
    pub job_id: JobId,
    /// Source video location
    pub url: String,
    /// Target height ceiling in pixels
    #[serde(default = "default_quality", deserialize_with = "coerce_u32")]
    pub quality: u32,
    /// Maximum frames to retain
    #[serde(
        default,
        deserialize_with = "coerce_opt_u32",
        skip_serializing_if = "Option::is_none"
    )]
    pub limit: Option<u32>,
}

fn default_quality() -> u32 {
    DEFAULT_QUALITY
}

impl JobDescriptor {
    pub fn new(job_id: JobId, url: impl Into<String>) -> Self {
        Self {
            job_id,
            url: url.into(),
            quality: DEFAULT_QUALITY,
            limit: None,
        }
    }

    /// Set the target height.
    pub fn with_quality(mut self, quality: u32) -> Self {
        self.quality = quality;
        self
    }

    /// Set the frame limit.
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Decode and validate a queue payload.
    pub fn from_json(payload: &str) -> ModelResult<Self> {
        let job: Self = serde_json::from_str(payload)?;
        job.validate()?;
        Ok(job)
    }

    /// Check field-level constraints that serde cannot express.
    pub fn validate(&self) -> ModelResult<()> {
        let parsed = url::Url::parse(self.url.trim())
            .map_err(|e| ModelError::InvalidUrl(format!("{}: {}", self.url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ModelError::InvalidUrl(format!(
                "unsupported scheme `{}`",
                parsed.scheme()
            )));
        }
        if self.quality == 0 {
            return Err(ModelError::invalid_field("quality", "must be positive"));
        }
        Ok(())
    }

    /// Frame cap for this job, never above the global cap.
    pub fn effective_limit(&self, global_max: u32) -> u32 {
        self.limit.unwrap_or(global_max).min(global_max)
    }

    /// Best-effort job ID extraction from a payload that failed to decode.
    ///
    /// Used to publish an error status for jobs whose descriptor is
    /// malformed but still identifiable.
    pub fn recover_job_id(payload: &str) -> Option<JobId> {
        let value: serde_json::Value = serde_json::from_str(payload).ok()?;
        let id = value.get("jobId")?.as_str()?;
        JobId::parse(id).ok()
    }
}

fn parse_u32(value: serde_json::Value) -> Result<Option<u32>, String> {
    match value {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::Number(n) => {
            if let Some(v) = n.as_u64() {
                return u32::try_from(v)
                    .map(Some)
                    .map_err(|_| format!("{} is out of range", v));
            }
            match n.as_f64() {
                Some(f) if f >= 0.0 && f.fract() == 0.0 && f <= u32::MAX as f64 => {
                    Ok(Some(f as u32))
                }
                _ => Err(format!("{} is not a non-negative integer", n)),
            }
        }
        serde_json::Value::String(s) => s
            .trim()
            .parse::<u32>()
            .map(Some)
            .map_err(|_| format!("`{}` is not numeric", s)),
        other => Err(format!("expected a number, got {}", other)),
    }
}

fn coerce_u32<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match parse_u32(value).map_err(serde::de::Error::custom)? {
        Some(v) => Ok(v),
        None => Ok(DEFAULT_QUALITY),
    }
}

fn coerce_opt_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    parse_u32(value).map_err(serde::de::Error::custom)
}
