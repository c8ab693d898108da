//! Shared data models for the framegrab worker.
//!
//! This crate provides Serde-serializable types for:
//! - Inbound job descriptors popped from the queue
//! - Status records published to the shared key-value store
//! - Object storage and status key layout

pub mod error;
pub mod job;
pub mod keys;
pub mod status;

pub use error::{ModelError, ModelResult};
pub use job::{JobDescriptor, JobId, DEFAULT_QUALITY};
pub use status::{FrameLink, JobPhase, StatusRecord};
