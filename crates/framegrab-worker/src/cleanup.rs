//! Per-job working directory and archive path.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, warn};

use framegrab_models::JobId;

use crate::error::WorkerResult;

/// Owns `<root>/<jobId>/` and `<root>/<jobId>.zip` for one run.
///
/// Call [`JobWorkspace::cleanup`] on every exit path. Dropping a workspace
/// that was never cleaned up removes both paths synchronously.
#[derive(Debug)]
pub struct JobWorkspace {
    dir: PathBuf,
    archive: PathBuf,
    cleaned: bool,
}

impl JobWorkspace {
    /// Create a fresh working directory, removing residue from an earlier
    /// run of the same job ID.
    pub async fn create(root: &Path, job_id: &JobId) -> WorkerResult<Self> {
        let dir = root.join(job_id.as_str());
        let archive = root.join(format!("{}.zip", job_id));

        fs::create_dir_all(root).await?;
        remove_dir(&dir).await?;
        remove_file(&archive).await?;
        fs::create_dir(&dir).await?;

        debug!("Created working directory {}", dir.display());
        Ok(Self {
            dir,
            archive,
            cleaned: false,
        })
    }

    /// Directory the extractor writes frames into.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Local archive path, outside the frame directory.
    pub fn archive_path(&self) -> &Path {
        &self.archive
    }

    /// Remove the directory and the archive. Failures are logged.
    pub async fn cleanup(mut self) {
        self.cleaned = true;

        if let Err(e) = remove_dir(&self.dir).await {
            warn!("Failed to remove {}: {}", self.dir.display(), e);
        }
        if let Err(e) = remove_file(&self.archive).await {
            warn!("Failed to remove {}: {}", self.archive.display(), e);
        }
        debug!("Cleaned up {}", self.dir.display());
    }
}

impl Drop for JobWorkspace {
    fn drop(&mut self) {
        if self.cleaned {
            return;
        }
        if let Err(e) = std::fs::remove_dir_all(&self.dir) {
            if e.kind() != ErrorKind::NotFound {
                warn!("Failed to remove {}: {}", self.dir.display(), e);
            }
        }
        if let Err(e) = std::fs::remove_file(&self.archive) {
            if e.kind() != ErrorKind::NotFound {
                warn!("Failed to remove {}: {}", self.archive.display(), e);
            }
        }
    }
}

async fn remove_dir(path: &Path) -> std::io::Result<()> {
    match fs::remove_dir_all(path).await {
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

async fn remove_file(path: &Path) -> std::io::Result<()> {
    match fs::remove_file(path).await {
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn job_id() -> JobId {
        JobId::parse("1700000000000").unwrap()
    }

    #[tokio::test]
    async fn test_create_and_cleanup() {
        let root = TempDir::new().unwrap();
        let workspace = JobWorkspace::create(root.path(), &job_id()).await.unwrap();

        let dir = workspace.dir().to_path_buf();
        let archive = workspace.archive_path().to_path_buf();
        assert!(dir.is_dir());
        assert_eq!(dir, root.path().join("1700000000000"));
        assert_eq!(archive, root.path().join("1700000000000.zip"));

        std::fs::write(dir.join("frame_001.jpg"), b"jpg").unwrap();
        std::fs::write(&archive, b"zip").unwrap();

        workspace.cleanup().await;
        assert!(!dir.exists());
        assert!(!archive.exists());
    }

    #[tokio::test]
    async fn test_create_removes_residue() {
        let root = TempDir::new().unwrap();
        let stale_dir = root.path().join("1700000000000");
        std::fs::create_dir(&stale_dir).unwrap();
        std::fs::write(stale_dir.join("frame_009.jpg"), b"old").unwrap();
        std::fs::write(root.path().join("1700000000000.zip"), b"old").unwrap();

        let workspace = JobWorkspace::create(root.path(), &job_id()).await.unwrap();

        assert_eq!(std::fs::read_dir(workspace.dir()).unwrap().count(), 0);
        assert!(!workspace.archive_path().exists());
        workspace.cleanup().await;
    }

    #[tokio::test]
    async fn test_creates_missing_root() {
        let root = TempDir::new().unwrap();
        let nested = root.path().join("a").join("b");

        let workspace = JobWorkspace::create(&nested, &job_id()).await.unwrap();
        assert!(workspace.dir().is_dir());
        workspace.cleanup().await;
    }

    #[tokio::test]
    async fn test_drop_removes_paths() {
        let root = TempDir::new().unwrap();
        let dir;
        {
            let workspace = JobWorkspace::create(root.path(), &job_id()).await.unwrap();
            dir = workspace.dir().to_path_buf();
            std::fs::write(dir.join("frame_001.jpg"), b"jpg").unwrap();
        }
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn test_cleanup_tolerates_missing_paths() {
        let root = TempDir::new().unwrap();
        let workspace = JobWorkspace::create(root.path(), &job_id()).await.unwrap();
        std::fs::remove_dir(workspace.dir()).unwrap();

        workspace.cleanup().await;
    }
}
