//! Single job processing: pipeline, selection, upload, archive.

use std::sync::Arc;
use std::time::Instant;

use framegrab_media::{build_archive, select_frames, upload_limit, FrameSource};
use framegrab_models::{FrameLink, JobDescriptor, JobPhase};

use crate::cleanup::JobWorkspace;
use crate::error::WorkerResult;
use crate::logging::JobLogger;
use crate::metrics;
use crate::status::PhaseTracker;
use crate::uploader::FrameUploader;

/// Everything the `DONE` record carries.
#[derive(Debug, Clone, PartialEq)]
pub struct JobOutput {
    pub zip_url: String,
    pub frames: Vec<FrameLink>,
    pub quality: u32,
}

/// Drives one job from extraction to the uploaded archive.
pub struct JobProcessor {
    source: Arc<dyn FrameSource>,
    uploader: FrameUploader,
    max_frames: u32,
}

impl JobProcessor {
    pub fn new(source: Arc<dyn FrameSource>, uploader: FrameUploader, max_frames: u32) -> Self {
        Self {
            source,
            uploader,
            max_frames,
        }
    }

    /// Run the job inside `workspace`, publishing the upload and archive
    /// phases through `tracker`, which must already be at `PROCESSING`.
    ///
    /// The terminal write is left to the caller, as is `ERROR` when this
    /// fails part way.
    pub async fn process(
        &self,
        job: &JobDescriptor,
        workspace: &JobWorkspace,
        tracker: &mut PhaseTracker,
    ) -> WorkerResult<JobOutput> {
        let logger = JobLogger::new(&job.job_id, "extract_frames");

        let started = Instant::now();
        let frames = self
            .source
            .extract(&job.url, job.quality, workspace.dir())
            .await?;
        metrics::record_pipeline_duration(started.elapsed().as_secs_f64());
        metrics::record_frames_extracted(frames.len());

        let extracted = frames.len();
        let limit = upload_limit(
            job.effective_limit(self.max_frames),
            self.max_frames,
            extracted,
        );
        let selected = select_frames(frames, limit);
        logger.progress(&format!(
            "extracted {} frames, keeping {}",
            extracted,
            selected.len()
        ));

        tracker.advance(JobPhase::UploadingImages).await?;
        let links = self.uploader.upload_all(&job.job_id, &selected).await?;

        tracker.advance(JobPhase::Zipping).await?;
        let archive = build_archive(&selected, workspace.archive_path()).await?;
        let zip_url = self
            .uploader
            .upload_archive(&job.job_id, &archive.path)
            .await?;
        logger.progress(&format!("archive of {} frames uploaded", archive.entries));

        Ok(JobOutput {
            zip_url,
            frames: links,
            quality: job.quality,
        })
    }
}
