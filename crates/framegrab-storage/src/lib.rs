//! S3-compatible object storage client.
//!
//! This crate provides:
//! - The `ObjectStore` interface the worker uploads through
//! - File upload and presigned GET link generation against S3, R2 or MinIO
//! - Content-type detection for frame and archive objects

pub mod client;
pub mod error;
pub mod store;

pub use client::{S3Store, StorageConfig};
pub use error::{StorageError, StorageResult};
pub use store::{content_type_for, ObjectStore};
