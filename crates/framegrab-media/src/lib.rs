//! yt-dlp/FFmpeg pipeline wrapper for frame extraction.
//!
//! This crate provides:
//! - Typed invocation configs for the stream resolver (yt-dlp) and the
//!   frame extractor (FFmpeg scene filter)
//! - A two-stage process pipeline joined by an OS pipe
//! - Frame enumeration and limit selection
//! - Zip archive assembly for a selected frame set

pub mod archive;
pub mod error;
pub mod extractor;
pub mod frames;
pub mod pipeline;
pub mod resolver;
pub mod tools;

pub use archive::{build_archive, ArchiveSummary};
pub use error::{MediaError, MediaResult};
pub use extractor::ExtractorConfig;
pub use frames::{list_frames, select_frames, upload_limit, ExtractedFrame, FramePattern};
pub use pipeline::{FrameSource, PipelineStage, StreamPipeline, ToolPipeline};
pub use resolver::ResolverConfig;
pub use tools::check_tool;
