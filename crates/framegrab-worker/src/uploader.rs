//! Bounded concurrent frame upload.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::{BoxFuture, FutureExt};
use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::{debug, info};

use framegrab_media::ExtractedFrame;
use framegrab_models::keys::{archive_object_key, frame_object_key};
use framegrab_models::{FrameLink, JobId};
use framegrab_storage::{content_type_for, ObjectStore};

use crate::error::{WorkerError, WorkerResult};
use crate::metrics;

/// Uploads a job's selected frames and archive, returning signed links.
#[derive(Clone)]
pub struct FrameUploader {
    store: Arc<dyn ObjectStore>,
    concurrency: usize,
    link_expiry: Duration,
}

impl FrameUploader {
    pub fn new(store: Arc<dyn ObjectStore>, concurrency: usize, link_expiry: Duration) -> Self {
        Self {
            store,
            concurrency: concurrency.max(1),
            link_expiry,
        }
    }

    /// Upload every frame with at most `concurrency` uploads in flight.
    ///
    /// Links come back in frame order, numbered from 1. The first failure
    /// drops the remaining uploads and fails the whole set.
    pub async fn upload_all(
        &self,
        job_id: &JobId,
        frames: &[ExtractedFrame],
    ) -> WorkerResult<Vec<FrameLink>> {
        let started = Instant::now();

        // Each upload owns its inputs so the set can run inside a spawned task
        let uploads: Vec<BoxFuture<'static, WorkerResult<(usize, String)>>> = frames
            .iter()
            .enumerate()
            .map(|(position, frame)| {
                let store = Arc::clone(&self.store);
                let expiry = self.link_expiry;
                let key = frame_object_key(job_id, &frame.file_name);
                let path = frame.path.clone();
                let file_name = frame.file_name.clone();
                async move {
                    let url = store
                        .put_and_sign(&path, &key, content_type_for(&key), expiry)
                        .await
                        .map_err(|e| {
                            WorkerError::upload_failed(format!("frame {}: {}", file_name, e))
                        })?;
                    debug!("Uploaded {}", key);
                    Ok((position, url))
                }
                .boxed()
            })
            .collect();

        let mut uploaded: Vec<(usize, String)> = stream::iter(uploads)
            .buffer_unordered(self.concurrency)
            .try_collect()
            .await?;
        uploaded.sort_by_key(|(position, _)| *position);

        let links: Vec<FrameLink> = uploaded
            .into_iter()
            .map(|(position, url)| FrameLink::new(position as u32 + 1, url))
            .collect();

        metrics::record_frames_uploaded(links.len());
        metrics::record_upload_duration(started.elapsed().as_secs_f64());
        info!(
            "Uploaded {} frames for job {} in {:.1}s",
            links.len(),
            job_id,
            started.elapsed().as_secs_f64()
        );

        Ok(links)
    }

    /// Upload the job archive and return its signed link.
    pub async fn upload_archive(
        &self,
        job_id: &JobId,
        archive: &std::path::Path,
    ) -> WorkerResult<String> {
        let key = archive_object_key(job_id);
        self.store
            .put_and_sign(archive, &key, content_type_for(&key), self.link_expiry)
            .await
            .map_err(|e| WorkerError::upload_failed(format!("archive {}: {}", key, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use framegrab_storage::{StorageError, StorageResult};
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Store whose uploads finish in reverse order and track concurrency.
    #[derive(Default)]
    struct SlowStore {
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        keys: Mutex<Vec<String>>,
        fail_key: Option<String>,
    }

    #[async_trait]
    impl ObjectStore for SlowStore {
        async fn put_file(&self, path: &Path, key: &str, _content_type: &str) -> StorageResult<()> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            let index: u64 = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.trim_start_matches("frame_").parse().ok())
                .unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(60u64.saturating_sub(index * 5))).await;

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            if self.fail_key.as_deref() == Some(key) {
                return Err(StorageError::upload_failed("rejected"));
            }
            self.keys.lock().unwrap().push(key.to_string());
            Ok(())
        }

        async fn presign_get(&self, key: &str, expires_in: Duration) -> StorageResult<String> {
            Ok(format!("https://storage.test/{}?expires={}", key, expires_in.as_secs()))
        }
    }

    fn frames(count: u32) -> Vec<ExtractedFrame> {
        (1..=count)
            .map(|index| {
                let file_name = format!("frame_{:03}.jpg", index);
                ExtractedFrame {
                    index,
                    path: Path::new("/tmp/frames").join(&file_name),
                    file_name,
                }
            })
            .collect()
    }

    #[tokio::test]
    async fn test_links_are_reassembled_in_frame_order() {
        let store = Arc::new(SlowStore::default());
        let uploader = FrameUploader::new(store.clone(), 4, Duration::from_secs(3600));
        let job_id = JobId::parse("job-1").unwrap();

        let links = uploader.upload_all(&job_id, &frames(10)).await.unwrap();

        assert_eq!(links.len(), 10);
        for (i, link) in links.iter().enumerate() {
            assert_eq!(link.id, i as u32 + 1);
            assert_eq!(link.timestamp, format!("Frame {}", i + 1));
            assert_eq!(
                link.image_url,
                format!("https://storage.test/jobs/job-1/frame_{:03}.jpg?expires=3600", i + 1)
            );
        }
        assert!(store.max_in_flight.load(Ordering::SeqCst) <= 4);
        assert!(store.max_in_flight.load(Ordering::SeqCst) > 1);
    }

    #[tokio::test]
    async fn test_failure_fails_the_set() {
        let store = Arc::new(SlowStore {
            fail_key: Some("jobs/job-1/frame_002.jpg".to_string()),
            ..Default::default()
        });
        let uploader = FrameUploader::new(store.clone(), 2, Duration::from_secs(3600));
        let job_id = JobId::parse("job-1").unwrap();

        let err = uploader.upload_all(&job_id, &frames(6)).await.unwrap_err();

        assert!(matches!(err, WorkerError::UploadFailed(_)));
        assert!(err.to_string().contains("frame_002.jpg"));
    }

    #[tokio::test]
    async fn test_empty_set() {
        let store = Arc::new(SlowStore::default());
        let uploader = FrameUploader::new(store, 10, Duration::from_secs(3600));
        let links = uploader
            .upload_all(&JobId::parse("job-1").unwrap(), &[])
            .await
            .unwrap();
        assert!(links.is_empty());
    }

    #[tokio::test]
    async fn test_archive_key() {
        let store = Arc::new(SlowStore::default());
        let uploader = FrameUploader::new(store.clone(), 10, Duration::from_secs(7200));
        let url = uploader
            .upload_archive(&JobId::parse("job-1").unwrap(), Path::new("/tmp/job-1.zip"))
            .await
            .unwrap();
        assert_eq!(url, "https://storage.test/zips/job-1.zip?expires=7200");
        assert_eq!(store.keys.lock().unwrap().as_slice(), ["zips/job-1.zip"]);
    }
}
