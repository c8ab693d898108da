//! Key layout shared by the worker and polling clients.

use crate::job::JobId;

/// Prefix of status keys in the shared store.
pub const STATUS_KEY_PREFIX: &str = "job:";

/// Object storage prefix for per-frame images.
pub const FRAMES_PREFIX: &str = "jobs";

/// Object storage prefix for archives.
pub const ARCHIVES_PREFIX: &str = "zips";

/// Status key for a job: `job:<jobId>`.
pub fn status_key(job_id: &JobId) -> String {
    format!("{}{}", STATUS_KEY_PREFIX, job_id)
}

/// Object key for one frame: `jobs/<jobId>/<file>`.
pub fn frame_object_key(job_id: &JobId, file_name: &str) -> String {
    format!("{}/{}/{}", FRAMES_PREFIX, job_id, file_name)
}

/// Object key for the job archive: `zips/<jobId>.zip`.
pub fn archive_object_key(job_id: &JobId) -> String {
    format!("{}/{}.zip", ARCHIVES_PREFIX, job_id)
}
