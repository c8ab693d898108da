//! Worker configuration.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use framegrab_media::{ExtractorConfig, ResolverConfig};
use framegrab_queue::DEFAULT_STATUS_TTL_SECS;

use crate::error::{WorkerError, WorkerResult};

/// Longest accepted signed link lifetime.
const MAX_LINK_EXPIRY_HOURS: u64 = 168;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Root for per-job working directories and archives
    pub frames_dir: PathBuf,
    /// Global frame cap applied on top of each job's limit
    pub max_frames: u32,
    /// Maximum concurrent frame uploads within a job
    pub upload_concurrency: usize,
    /// Lifetime of signed retrieval links
    pub link_expiry: Duration,
    /// Status record retention after its last write
    pub status_ttl_secs: u64,
    /// Per-job deadline
    pub job_timeout: Duration,
    /// Sleep after a failed queue pop
    pub error_backoff: Duration,
    /// Longest single wait on the queue before shutdown is checked again
    pub queue_poll: Duration,
    /// Stream resolver invocation
    pub resolver: ResolverConfig,
    /// Frame extractor invocation
    pub extractor: ExtractorConfig,
    /// Prometheus listener port, disabled when unset
    pub metrics_port: Option<u16>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            frames_dir: PathBuf::from("/app/frames"),
            max_frames: 500,
            upload_concurrency: 10,
            link_expiry: Duration::from_secs(3600), // 1 hour
            status_ttl_secs: DEFAULT_STATUS_TTL_SECS,
            job_timeout: Duration::from_secs(3600),
            error_backoff: Duration::from_secs(5),
            queue_poll: Duration::from_secs(5),
            resolver: ResolverConfig::default(),
            extractor: ExtractorConfig::default(),
            metrics_port: None,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    ///
    /// Unparseable values fall back to their defaults; `validate` checks
    /// the resulting ranges.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let resolver = ResolverConfig {
            program: std::env::var("YTDLP_PATH").unwrap_or(defaults.resolver.program),
            retries: env_or("RESOLVER_RETRIES", defaults.resolver.retries),
            socket_timeout_secs: env_or(
                "RESOLVER_SOCKET_TIMEOUT",
                defaults.resolver.socket_timeout_secs,
            ),
            force_ipv4: std::env::var("RESOLVER_FORCE_IPV4")
                .ok()
                .and_then(|s| parse_bool(&s))
                .unwrap_or(defaults.resolver.force_ipv4),
            preferred_vcodec: defaults.resolver.preferred_vcodec,
        };

        let extractor = ExtractorConfig {
            program: std::env::var("FFMPEG_PATH").unwrap_or(defaults.extractor.program),
            scene_threshold: env_or("SCENE_THRESHOLD", defaults.extractor.scene_threshold),
            min_gap_secs: std::env::var("SCENE_MIN_GAP_SECS")
                .ok()
                .and_then(|s| s.trim().parse().ok()),
            ..defaults.extractor
        };

        Self {
            frames_dir: std::env::var("FRAMES_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.frames_dir),
            max_frames: env_or("MAX_FRAMES", defaults.max_frames),
            upload_concurrency: env_or("UPLOAD_CONCURRENCY", defaults.upload_concurrency),
            link_expiry: Duration::from_secs(env_or("SIGNED_URL_EXPIRY_HOURS", 1u64) * 3600),
            status_ttl_secs: env_or("STATUS_TTL_SECS", defaults.status_ttl_secs),
            job_timeout: Duration::from_secs(env_or("WORKER_JOB_TIMEOUT", 3600u64)),
            error_backoff: Duration::from_secs(env_or("WORKER_ERROR_BACKOFF_SECS", 5u64)),
            queue_poll: Duration::from_secs(env_or("QUEUE_POLL_SECS", 5u64)),
            resolver,
            extractor,
            metrics_port: std::env::var("METRICS_PORT")
                .ok()
                .and_then(|s| s.trim().parse().ok()),
        }
    }

    /// Check ranges and the external tool configs.
    pub fn validate(&self) -> WorkerResult<()> {
        if !self.frames_dir.is_absolute() {
            return Err(WorkerError::config_error(format!(
                "frames directory must be absolute, got {}",
                self.frames_dir.display()
            )));
        }
        if self.max_frames == 0 {
            return Err(WorkerError::config_error("MAX_FRAMES must be at least 1"));
        }
        if self.upload_concurrency == 0 {
            return Err(WorkerError::config_error(
                "UPLOAD_CONCURRENCY must be at least 1",
            ));
        }
        let hours = self.link_expiry.as_secs() / 3600;
        if self.link_expiry.as_secs() % 3600 != 0 || !(1..=MAX_LINK_EXPIRY_HOURS).contains(&hours) {
            return Err(WorkerError::config_error(format!(
                "signed link expiry must be 1..={} whole hours",
                MAX_LINK_EXPIRY_HOURS
            )));
        }
        if self.status_ttl_secs == 0 {
            return Err(WorkerError::config_error("STATUS_TTL_SECS must be positive"));
        }
        if self.job_timeout.is_zero() {
            return Err(WorkerError::config_error("WORKER_JOB_TIMEOUT must be positive"));
        }
        if self.queue_poll.is_zero() {
            return Err(WorkerError::config_error("QUEUE_POLL_SECS must be positive"));
        }
        self.resolver
            .validate()
            .map_err(|e| WorkerError::config_error(e.to_string()))?;
        self.extractor
            .validate()
            .map_err(|e| WorkerError::config_error(e.to_string()))?;
        Ok(())
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
