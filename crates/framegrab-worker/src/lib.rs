//! Frame extraction worker.
//!
//! This crate provides:
//! - The blocking job loop with graceful shutdown
//! - Per-job phase tracking and status publication
//! - Bounded concurrent frame upload
//! - Working directory cleanup on every exit path

pub mod cleanup;
pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod metrics;
pub mod processor;
pub mod status;
pub mod uploader;

pub use cleanup::JobWorkspace;
pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use executor::{JobExecutor, RunOutcome};
pub use logging::JobLogger;
pub use processor::{JobOutput, JobProcessor};
pub use status::PhaseTracker;
pub use uploader::FrameUploader;
