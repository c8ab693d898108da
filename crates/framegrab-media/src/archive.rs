//! Zip archive assembly for a selected frame set.

use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use tracing::info;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{MediaError, MediaResult};
use crate::frames::ExtractedFrame;

/// Result of a successful archive build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveSummary {
    pub path: PathBuf,
    pub entries: usize,
    pub bytes: u64,
}

/// Write exactly `frames`, in order, into a zip at `dest`.
///
/// The archive is built from the explicit list rather than a directory
/// scan, so unselected or stale files next to the frames never end up in
/// it. An existing file at `dest` is replaced.
pub async fn build_archive(frames: &[ExtractedFrame], dest: &Path) -> MediaResult<ArchiveSummary> {
    let sources: Vec<(String, PathBuf)> = frames
        .iter()
        .map(|f| (f.file_name.clone(), f.path.clone()))
        .collect();
    let dest = dest.to_path_buf();

    let summary = tokio::task::spawn_blocking(move || write_zip(&sources, &dest))
        .await
        .map_err(|e| MediaError::internal(format!("archive task failed: {}", e)))??;

    info!(
        archive = %summary.path.display(),
        entries = summary.entries,
        size_kb = summary.bytes / 1024,
        "Built frame archive"
    );

    Ok(summary)
}

fn write_zip(sources: &[(String, PathBuf)], dest: &Path) -> MediaResult<ArchiveSummary> {
    let file = File::create(dest)?;
    let mut writer = ZipWriter::new(BufWriter::new(file));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, path) in sources {
        let mut input = File::open(path)?;
        writer.start_file(name.as_str(), options)?;
        io::copy(&mut input, &mut writer)?;
    }

    let mut inner = writer.finish()?;
    io::Write::flush(&mut inner)?;
    drop(inner);

    let bytes = std::fs::metadata(dest)?.len();
    Ok(ArchiveSummary {
        path: dest.to_path_buf(),
        entries: sources.len(),
        bytes,
    })
}
