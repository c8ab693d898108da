//! Redis list job queue and status store.
//!
//! This crate provides:
//! - Blocking job consumption via `BLPOP` and enqueueing via `LPUSH`
//! - Whole-record status publication with expiry (`SET ... EX`)
//! - The `JobSource` / `StatusStore` interfaces the worker loop is built on

pub mod error;
pub mod queue;
pub mod status;

pub use error::{QueueError, QueueResult};
pub use queue::{JobSource, QueueConfig, RedisJobQueue};
pub use status::{RedisStatusStore, StatusStore, DEFAULT_STATUS_TTL_SECS};
