//! Job queue on a Redis list.

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use tracing::{debug, info};

use framegrab_models::JobDescriptor;

use crate::error::{QueueError, QueueResult};

/// Queue configuration.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Redis URL
    pub redis_url: String,
    /// List holding pending job payloads
    pub queue_name: String,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://redis:6379".to_string(),
            queue_name: "video_queue".to_string(),
        }
    }
}

impl QueueConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            redis_url: std::env::var("REDIS_URL").unwrap_or(defaults.redis_url),
            queue_name: std::env::var("QUEUE_NAME").unwrap_or(defaults.queue_name),
        }
    }
}

/// Wait used by the default `JobSource::pop` between empty polls.
const IDLE_POLL: Duration = Duration::from_secs(5);

/// Source of raw job payloads.
#[async_trait]
pub trait JobSource: Send + Sync {
    /// Wait up to `wait` for a payload and remove it from the queue.
    ///
    /// `Ok(None)` means the wait elapsed with nothing to take.
    async fn pop_within(&self, wait: Duration) -> QueueResult<Option<String>>;

    /// Block until a payload is available and remove it from the queue.
    async fn pop(&self) -> QueueResult<String> {
        loop {
            if let Some(payload) = self.pop_within(IDLE_POLL).await? {
                return Ok(payload);
            }
        }
    }
}

/// Job queue client.
pub struct RedisJobQueue {
    client: redis::Client,
    config: QueueConfig,
}

impl RedisJobQueue {
    /// Create a new job queue.
    pub fn new(config: QueueConfig) -> QueueResult<Self> {
        if config.queue_name.trim().is_empty() {
            return Err(QueueError::connection_failed("queue name is empty"));
        }
        let client = redis::Client::open(config.redis_url.as_str())?;
        Ok(Self { client, config })
    }

    /// Create from `REDIS_URL` / `QUEUE_NAME`.
    pub fn from_env() -> QueueResult<Self> {
        Self::new(QueueConfig::from_env())
    }

    pub fn queue_name(&self) -> &str {
        &self.config.queue_name
    }

    /// Enqueue a job the way the submitting frontend does (`LPUSH`).
    pub async fn push(&self, job: &JobDescriptor) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let payload = serde_json::to_string(job)?;

        conn.lpush::<_, _, ()>(&self.config.queue_name, payload).await?;

        info!("Enqueued job {} on {}", job.job_id, self.config.queue_name);
        Ok(())
    }

    /// Get queue length.
    pub async fn len(&self) -> QueueResult<u64> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let len: u64 = conn.llen(&self.config.queue_name).await?;
        Ok(len)
    }

    /// Check connectivity with `PING`.
    pub async fn ping(&self) -> QueueResult<()> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| QueueError::connection_failed(e.to_string()))?;
        redis::cmd("PING").query_async::<()>(&mut conn).await?;
        Ok(())
    }

    /// One `BLPOP`; a timeout of zero blocks until an element arrives.
    async fn blpop(&self, timeout_secs: f64) -> QueueResult<Option<String>> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| QueueError::dequeue_failed(e.to_string()))?;

        let reply: Option<(String, String)> = redis::cmd("BLPOP")
            .arg(&self.config.queue_name)
            .arg(timeout_secs)
            .query_async(&mut conn)
            .await
            .map_err(|e| QueueError::dequeue_failed(e.to_string()))?;

        Ok(reply.map(|(queue, payload)| {
            debug!("Popped {} bytes from {}", payload.len(), queue);
            payload
        }))
    }
}

#[async_trait]
impl JobSource for RedisJobQueue {
    async fn pop_within(&self, wait: Duration) -> QueueResult<Option<String>> {
        // Zero would block forever
        let secs = wait.as_secs_f64().max(0.01);
        self.blpop(secs).await
    }

    async fn pop(&self) -> QueueResult<String> {
        loop {
            if let Some(payload) = self.blpop(0.0).await? {
                return Ok(payload);
            }
        }
    }
}
