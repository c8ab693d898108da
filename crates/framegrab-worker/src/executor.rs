//! Job executor.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::watch;
use tracing::{error, info, warn, Instrument};

use framegrab_media::FrameSource;
use framegrab_models::{JobDescriptor, JobId, JobPhase};
use framegrab_queue::{JobSource, QueueError, StatusStore};
use framegrab_storage::ObjectStore;

use crate::cleanup::JobWorkspace;
use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;
use crate::metrics;
use crate::processor::{JobOutput, JobProcessor};
use crate::status::PhaseTracker;
use crate::uploader::FrameUploader;

/// What a single loop iteration did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// A valid job ran to a terminal phase.
    Processed { job_id: JobId, outcome: JobPhase },
    /// The payload could not be decoded; `job_id` is set when an `ERROR`
    /// record was published for it.
    Malformed {
        job_id: Option<JobId>,
        reason: String,
    },
    /// The pop itself failed.
    QueueError(String),
}

/// Sequential job loop: one job in flight per process.
pub struct JobExecutor {
    config: WorkerConfig,
    jobs: Arc<dyn JobSource>,
    statuses: Arc<dyn StatusStore>,
    processor: JobProcessor,
    shutdown: watch::Sender<bool>,
}

impl JobExecutor {
    /// Create a new job executor from its collaborators.
    pub fn new(
        config: WorkerConfig,
        jobs: Arc<dyn JobSource>,
        statuses: Arc<dyn StatusStore>,
        frames: Arc<dyn FrameSource>,
        store: Arc<dyn ObjectStore>,
    ) -> WorkerResult<Self> {
        config.validate()?;

        let uploader = FrameUploader::new(store, config.upload_concurrency, config.link_expiry);
        let processor = JobProcessor::new(frames, uploader, config.max_frames);
        let (shutdown, _) = watch::channel(false);

        Ok(Self {
            config,
            jobs,
            statuses,
            processor,
            shutdown,
        })
    }

    /// Run until shutdown is signalled.
    ///
    /// Shutdown is observed between bounded pops, so an element taken off
    /// the queue is always handled. A job already in flight runs to
    /// completion first.
    pub async fn run(&self) -> WorkerResult<()> {
        info!(
            "Starting job executor (frames_dir={}, max_frames={}, upload_concurrency={})",
            self.config.frames_dir.display(),
            self.config.max_frames,
            self.config.upload_concurrency
        );

        let mut shutdown_rx = self.shutdown.subscribe();

        loop {
            let stop = *shutdown_rx.borrow();
            if stop {
                info!("Shutdown signal received, stopping executor");
                break;
            }

            match self.jobs.pop_within(self.config.queue_poll).await {
                Ok(Some(payload)) => {
                    self.dispatch(payload).await;
                }
                Ok(None) => {}
                Err(e) => {
                    error!("Error consuming jobs: {}", e);
                    metrics::record_queue_error();
                    // Back off on error, waking early for shutdown
                    tokio::select! {
                        _ = tokio::time::sleep(self.config.error_backoff) => {}
                        _ = shutdown_rx.changed() => {}
                    }
                }
            }
        }

        info!("Job executor stopped");
        Ok(())
    }

    /// Pop and handle exactly one payload.
    pub async fn run_once(&self) -> RunOutcome {
        match self.jobs.pop().await {
            Ok(payload) => self.dispatch(payload).await,
            Err(e) => {
                error!("Error consuming jobs: {}", e);
                metrics::record_queue_error();
                RunOutcome::QueueError(e.to_string())
            }
        }
    }

    /// Signal shutdown. Takes effect even before `run` starts.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    /// Decode a payload and execute it; never fails the loop.
    async fn dispatch(&self, payload: String) -> RunOutcome {
        match JobDescriptor::from_json(&payload) {
            Ok(job) => {
                let job_id = job.job_id.clone();
                let outcome = self.execute(&job).await;
                RunOutcome::Processed { job_id, outcome }
            }
            Err(e) => {
                self.reject(&payload, QueueError::malformed_job(e.to_string()))
                    .await
            }
        }
    }

    async fn reject(&self, payload: &str, err: QueueError) -> RunOutcome {
        metrics::record_malformed_job();

        let reason = err.to_string();
        let job_id = JobDescriptor::recover_job_id(payload);
        let logger = match &job_id {
            Some(id) => JobLogger::new(id, "decode_payload"),
            None => JobLogger::unidentified("decode_payload"),
        };
        logger.warning(&format!("Discarding job: {}", reason));

        if let Some(id) = &job_id {
            let mut tracker = PhaseTracker::new(Arc::clone(&self.statuses), id.clone());
            if let Err(e) = tracker.fail(reason.clone()).await {
                logger.warning(&format!("Failed to publish error status: {}", e));
            }
        }

        RunOutcome::Malformed { job_id, reason }
    }

    /// Execute one decoded job under the deadline and clean up after it.
    pub async fn execute(&self, job: &JobDescriptor) -> JobPhase {
        let logger = JobLogger::new(&job.job_id, "extract_frames");
        let span = logger.span();

        async {
            logger.started(&job.url, job.quality);
            metrics::record_job_started();
            let started = Instant::now();

            let mut tracker = PhaseTracker::new(Arc::clone(&self.statuses), job.job_id.clone());
            let mut workspace: Option<JobWorkspace> = None;

            let result: WorkerResult<()> = async {
                tracker.advance(JobPhase::Processing).await?;
                let created = workspace.insert(
                    JobWorkspace::create(&self.config.frames_dir, &job.job_id).await?,
                );
                let output = self.run_with_deadline(job, created, &mut tracker).await?;
                // Terminal write stays outside the deadline
                tracker
                    .complete(output.zip_url, output.frames, output.quality)
                    .await
            }
            .await;

            if let Err(e) = &result {
                self.publish_failure(&mut tracker, &logger, e).await;
            }
            if let Some(workspace) = workspace {
                workspace.cleanup().await;
            }

            let elapsed = started.elapsed().as_secs_f64();
            match result {
                Ok(()) => {
                    metrics::record_job_completed(elapsed);
                    logger.finished(elapsed);
                    JobPhase::Done
                }
                Err(e) => {
                    metrics::record_job_failed(failure_kind(&e), elapsed);
                    JobPhase::Error
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run_with_deadline(
        &self,
        job: &JobDescriptor,
        workspace: &JobWorkspace,
        tracker: &mut PhaseTracker,
    ) -> WorkerResult<JobOutput> {
        let deadline = self.config.job_timeout;
        match tokio::time::timeout(deadline, self.processor.process(job, workspace, tracker)).await
        {
            Ok(result) => result,
            Err(_) => Err(WorkerError::Timeout(deadline.as_secs())),
        }
    }

    async fn publish_failure(
        &self,
        tracker: &mut PhaseTracker,
        logger: &JobLogger,
        err: &WorkerError,
    ) {
        logger.failed(err);
        if tracker.is_terminal() {
            warn!("Job {} already terminal, not overwriting", tracker.job_id());
            return;
        }
        if let Err(e) = tracker.fail(err.to_string()).await {
            logger.warning(&format!("Failed to publish error status: {}", e));
        }
    }
}

fn failure_kind(err: &WorkerError) -> &'static str {
    match err {
        WorkerError::Media(_) => "pipeline",
        WorkerError::UploadFailed(_) => "upload",
        WorkerError::Timeout(_) => "timeout",
        WorkerError::Queue(_) | WorkerError::InvalidTransition { .. } => "status",
        _ => "other",
    }
}
