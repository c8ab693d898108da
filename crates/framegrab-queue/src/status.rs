//! Status records in the shared key-value store.

use async_trait::async_trait;
use redis::AsyncCommands;
use tracing::debug;

use framegrab_models::keys::status_key;
use framegrab_models::{JobId, StatusRecord};

use crate::error::{QueueError, QueueResult};

/// Retention window of a status record after its last write.
pub const DEFAULT_STATUS_TTL_SECS: u64 = 3600;

/// Whole-record status publication.
#[async_trait]
pub trait StatusStore: Send + Sync {
    /// Replace the record for `job_id` and reset its expiry.
    async fn publish(&self, job_id: &JobId, record: &StatusRecord) -> QueueResult<()>;

    /// Read the current record; `None` when missing or expired.
    async fn fetch(&self, job_id: &JobId) -> QueueResult<Option<StatusRecord>>;
}

/// Redis-backed status store writing `job:<jobId>`.
pub struct RedisStatusStore {
    client: redis::Client,
    ttl_secs: u64,
}

impl RedisStatusStore {
    pub fn new(redis_url: &str, ttl_secs: u64) -> QueueResult<Self> {
        if ttl_secs == 0 {
            return Err(QueueError::status_write_failed("status TTL must be positive"));
        }
        let client = redis::Client::open(redis_url)?;
        Ok(Self { client, ttl_secs })
    }
}

#[async_trait]
impl StatusStore for RedisStatusStore {
    async fn publish(&self, job_id: &JobId, record: &StatusRecord) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = status_key(job_id);
        let payload = serde_json::to_string(record)?;

        conn.set_ex::<_, _, ()>(&key, payload, self.ttl_secs)
            .await
            .map_err(|e| QueueError::status_write_failed(format!("{}: {}", key, e)))?;

        debug!("Published {} for job {}", record.phase(), job_id);
        Ok(())
    }

    async fn fetch(&self, job_id: &JobId) -> QueueResult<Option<StatusRecord>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let raw: Option<String> = conn.get(status_key(job_id)).await?;
        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_ttl_is_rejected() {
        assert!(RedisStatusStore::new("redis://localhost:6379", 0).is_err());
        assert!(RedisStatusStore::new("redis://localhost:6379", 60).is_ok());
    }
}
