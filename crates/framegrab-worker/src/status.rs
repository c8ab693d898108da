//! Per-run phase tracking in front of the status store.
//!
//! A run moves `PROCESSING -> UPLOADING_IMAGES -> ZIPPING -> DONE`, or to
//! `ERROR` from any non-terminal phase. Once a terminal record is written,
//! the tracker refuses every further write for the run.

use std::sync::Arc;

use tracing::debug;

use framegrab_models::{FrameLink, JobId, JobPhase, StatusRecord};
use framegrab_queue::StatusStore;

use crate::error::{WorkerError, WorkerResult};

pub struct PhaseTracker {
    store: Arc<dyn StatusStore>,
    job_id: JobId,
    current: Option<JobPhase>,
}

impl PhaseTracker {
    pub fn new(store: Arc<dyn StatusStore>, job_id: JobId) -> Self {
        Self {
            store,
            job_id,
            current: None,
        }
    }

    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    /// Last phase written successfully (or attempted, for terminal phases).
    pub fn current(&self) -> Option<JobPhase> {
        self.current
    }

    pub fn is_terminal(&self) -> bool {
        self.current.map(|p| p.is_terminal()).unwrap_or(false)
    }

    /// Move to a later non-terminal phase.
    pub async fn advance(&mut self, next: JobPhase) -> WorkerResult<()> {
        let allowed = match self.current {
            None => next == JobPhase::Processing,
            Some(current) => !current.is_terminal() && next.rank() > current.rank(),
        };
        let record = match StatusRecord::running(next) {
            Some(record) if allowed => record,
            _ => return Err(self.refuse(next)),
        };

        self.store.publish(&self.job_id, &record).await?;
        debug!("Job {} entered {}", self.job_id, next);
        self.current = Some(next);
        Ok(())
    }

    /// Write `DONE`; only valid straight after `ZIPPING`.
    ///
    /// Like `fail`, the tracker is terminal once the write is attempted. A
    /// write that errors may still have landed, so no `ERROR` may follow it.
    pub async fn complete(
        &mut self,
        zip_url: String,
        frames: Vec<FrameLink>,
        quality: u32,
    ) -> WorkerResult<()> {
        if self.current != Some(JobPhase::Zipping) {
            return Err(self.refuse(JobPhase::Done));
        }

        self.current = Some(JobPhase::Done);
        let record = StatusRecord::done(zip_url, frames, quality);
        self.store.publish(&self.job_id, &record).await?;
        Ok(())
    }

    /// Write `ERROR` from any non-terminal phase.
    ///
    /// The tracker becomes terminal even if the write itself fails, so a
    /// run never produces two error records.
    pub async fn fail(&mut self, message: impl Into<String>) -> WorkerResult<()> {
        if self.is_terminal() {
            return Err(self.refuse(JobPhase::Error));
        }

        self.current = Some(JobPhase::Error);
        let record = StatusRecord::error(message);
        self.store.publish(&self.job_id, &record).await?;
        Ok(())
    }

    fn refuse(&self, to: JobPhase) -> WorkerError {
        WorkerError::InvalidTransition {
            from: self.current,
            to,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use framegrab_queue::{QueueError, QueueResult};
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryStore {
        records: Mutex<Vec<StatusRecord>>,
        fail_writes: bool,
    }

    impl MemoryStore {
        fn phases(&self) -> Vec<JobPhase> {
            self.records.lock().unwrap().iter().map(|r| r.phase()).collect()
        }
    }

    #[async_trait]
    impl StatusStore for MemoryStore {
        async fn publish(&self, _job_id: &JobId, record: &StatusRecord) -> QueueResult<()> {
            if self.fail_writes {
                return Err(QueueError::status_write_failed("store down"));
            }
            self.records.lock().unwrap().push(record.clone());
            Ok(())
        }

        async fn fetch(&self, _job_id: &JobId) -> QueueResult<Option<StatusRecord>> {
            Ok(self.records.lock().unwrap().last().cloned())
        }
    }

    fn tracker(store: &Arc<MemoryStore>) -> PhaseTracker {
        let store: Arc<dyn StatusStore> = store.clone();
        PhaseTracker::new(store, JobId::parse("job-1").unwrap())
    }

    #[tokio::test]
    async fn test_forward_progression() {
        let store = Arc::new(MemoryStore::default());
        let mut tracker = tracker(&store);

        tracker.advance(JobPhase::Processing).await.unwrap();
        tracker.advance(JobPhase::UploadingImages).await.unwrap();
        tracker.advance(JobPhase::Zipping).await.unwrap();
        tracker
            .complete("https://s/zip".to_string(), vec![], 480)
            .await
            .unwrap();

        assert_eq!(
            store.phases(),
            vec![
                JobPhase::Processing,
                JobPhase::UploadingImages,
                JobPhase::Zipping,
                JobPhase::Done
            ]
        );
        assert!(tracker.is_terminal());
    }

    #[tokio::test]
    async fn test_processing_must_be_first() {
        let store = Arc::new(MemoryStore::default());
        let mut tracker = tracker(&store);

        let err = tracker.advance(JobPhase::Zipping).await.unwrap_err();
        assert!(matches!(err, WorkerError::InvalidTransition { from: None, .. }));
        assert!(store.phases().is_empty());
    }

    #[tokio::test]
    async fn test_backwards_moves_are_refused() {
        let store = Arc::new(MemoryStore::default());
        let mut tracker = tracker(&store);

        tracker.advance(JobPhase::Processing).await.unwrap();
        tracker.advance(JobPhase::Zipping).await.unwrap();
        assert!(tracker.advance(JobPhase::UploadingImages).await.is_err());
        assert!(tracker.advance(JobPhase::Zipping).await.is_err());
        assert_eq!(store.phases(), vec![JobPhase::Processing, JobPhase::Zipping]);
    }

    #[tokio::test]
    async fn test_nothing_follows_error() {
        let store = Arc::new(MemoryStore::default());
        let mut tracker = tracker(&store);

        tracker.advance(JobPhase::Processing).await.unwrap();
        tracker.advance(JobPhase::UploadingImages).await.unwrap();
        tracker.advance(JobPhase::Zipping).await.unwrap();
        tracker.fail("upload failed").await.unwrap();

        let err = tracker
            .complete("https://s/zip".to_string(), vec![], 480)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            WorkerError::InvalidTransition {
                from: Some(JobPhase::Error),
                to: JobPhase::Done
            }
        ));
        assert!(tracker.fail("again").await.is_err());
        assert!(tracker.advance(JobPhase::Processing).await.is_err());

        let records = store.records.lock().unwrap();
        assert_eq!(records.len(), 4);
        assert_eq!(records[3], StatusRecord::error("upload failed"));
    }

    #[tokio::test]
    async fn test_done_requires_zipping() {
        let store = Arc::new(MemoryStore::default());
        let mut tracker = tracker(&store);

        tracker.advance(JobPhase::Processing).await.unwrap();
        assert!(tracker.complete(String::new(), vec![], 480).await.is_err());
        assert_eq!(tracker.current(), Some(JobPhase::Processing));
    }

    #[tokio::test]
    async fn test_failed_error_write_is_still_terminal() {
        let store = Arc::new(MemoryStore {
            fail_writes: true,
            ..Default::default()
        });
        let mut tracker = tracker(&store);

        assert!(matches!(
            tracker.advance(JobPhase::Processing).await,
            Err(WorkerError::Queue(_))
        ));
        assert_eq!(tracker.current(), None);

        assert!(tracker.fail("boom").await.is_err());
        assert!(tracker.is_terminal());
        assert!(matches!(
            tracker.fail("boom").await,
            Err(WorkerError::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn test_failed_done_write_refuses_error() {
        let store = Arc::new(MemoryStore::default());
        let mut tracker = tracker(&store);
        tracker.advance(JobPhase::Processing).await.unwrap();
        tracker.advance(JobPhase::UploadingImages).await.unwrap();
        tracker.advance(JobPhase::Zipping).await.unwrap();

        let down: Arc<dyn StatusStore> = Arc::new(MemoryStore {
            fail_writes: true,
            ..Default::default()
        });
        tracker.store = down;

        assert!(matches!(
            tracker.complete("https://s/zip".to_string(), vec![], 480).await,
            Err(WorkerError::Queue(_))
        ));
        assert_eq!(tracker.current(), Some(JobPhase::Done));
        assert!(matches!(
            tracker.fail("late").await,
            Err(WorkerError::InvalidTransition {
                from: Some(JobPhase::Done),
                to: JobPhase::Error
            })
        ));
    }
}
