//! Two-stage process pipeline: resolver stdout piped into extractor stdin.
//!
//! The stream never passes through the worker; the resolver's stdout is
//! handed to the extractor as an OS pipe.

use std::io::ErrorKind;
use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::error::{MediaError, MediaResult};
use crate::extractor::ExtractorConfig;
use crate::frames::{list_frames, ExtractedFrame};
use crate::resolver::ResolverConfig;

/// One external process of the pipeline.
#[derive(Debug)]
pub struct PipelineStage {
    program: String,
    command: Command,
}

impl PipelineStage {
    pub fn new(program: impl Into<String>, command: Command) -> Self {
        Self {
            program: program.into(),
            command,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn spawn(&mut self) -> MediaResult<Child> {
        self.command.kill_on_drop(true);
        self.command.spawn().map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                MediaError::ToolNotFound(self.program.clone())
            } else {
                MediaError::Io(e)
            }
        })
    }
}

/// Runner joining an upstream and a downstream process.
pub struct StreamPipeline;

impl StreamPipeline {
    /// Run `upstream | downstream` to completion.
    ///
    /// The downstream is awaited first. A non-zero downstream exit fails
    /// immediately and the upstream is killed. Otherwise the upstream exit
    /// status decides, so a resolver failure fails the run even when the
    /// extractor already produced output.
    pub async fn run(mut upstream: PipelineStage, mut downstream: PipelineStage) -> MediaResult<()> {
        upstream.command.stdout(Stdio::piped());

        debug!(
            "Starting pipeline: {} | {}",
            upstream.program(),
            downstream.program()
        );

        let mut up = upstream.spawn()?;
        let stdout = match up.stdout.take() {
            Some(stdout) => stdout,
            None => {
                reap(&mut up, upstream.program()).await;
                return Err(MediaError::internal("upstream stdout not captured"));
            }
        };
        let stdin: Stdio = match stdout.try_into() {
            Ok(stdin) => stdin,
            Err(e) => {
                reap(&mut up, upstream.program()).await;
                return Err(MediaError::Io(e));
            }
        };
        downstream.command.stdin(stdin);

        let spawned = downstream.spawn();
        let downstream_program = downstream.program().to_string();
        // Release the parent's copy of the pipe's read end so the upstream
        // sees EPIPE if the downstream goes away.
        drop(downstream);

        let mut down = match spawned {
            Ok(child) => child,
            Err(e) => {
                reap(&mut up, upstream.program()).await;
                return Err(e);
            }
        };

        let down_status = match down.wait().await {
            Ok(status) => status,
            Err(e) => {
                reap(&mut up, upstream.program()).await;
                return Err(MediaError::Io(e));
            }
        };
        if !down_status.success() {
            warn!("{} exited with {}", downstream_program, down_status);
            reap(&mut up, upstream.program()).await;
            return Err(MediaError::extractor_failed(downstream_program, down_status));
        }

        let up_status = up.wait().await?;
        if !up_status.success() {
            warn!("{} exited with {}", upstream.program(), up_status);
            return Err(MediaError::resolver_failed(upstream.program(), up_status));
        }

        debug!("Pipeline finished: {} | {}", upstream.program(), downstream_program);
        Ok(())
    }
}

/// Kill a child and wait for it, logging failures.
async fn reap(child: &mut Child, program: &str) {
    if let Err(e) = child.kill().await {
        debug!("Failed to kill {}: {}", program, e);
    }
}

/// Producer of numbered frames for a job.
#[async_trait]
pub trait FrameSource: Send + Sync {
    /// Extract frames for `url` into `output_dir` and return them in
    /// capture order.
    async fn extract(
        &self,
        url: &str,
        quality: u32,
        output_dir: &Path,
    ) -> MediaResult<Vec<ExtractedFrame>>;
}

/// Production frame source: yt-dlp piped into FFmpeg.
#[derive(Debug, Clone, Default)]
pub struct ToolPipeline {
    pub resolver: ResolverConfig,
    pub extractor: ExtractorConfig,
}

impl ToolPipeline {
    pub fn new(resolver: ResolverConfig, extractor: ExtractorConfig) -> MediaResult<Self> {
        resolver.validate()?;
        extractor.validate()?;
        Ok(Self {
            resolver,
            extractor,
        })
    }
}

#[async_trait]
impl FrameSource for ToolPipeline {
    async fn extract(
        &self,
        url: &str,
        quality: u32,
        output_dir: &Path,
    ) -> MediaResult<Vec<ExtractedFrame>> {
        let pattern = self.extractor.pattern()?;

        info!(
            "Extracting frames at {}p with filter {}",
            quality,
            self.extractor.filter_expression()
        );

        StreamPipeline::run(
            self.resolver.stage(url, quality),
            self.extractor.stage(output_dir),
        )
        .await?;

        list_frames(output_dir, &pattern).await
    }
}
