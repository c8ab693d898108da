//! Frame enumeration and limit selection.

use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::error::{MediaError, MediaResult};

/// A printf-style numbered file pattern such as `frame_%03d.jpg`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramePattern {
    prefix: String,
    width: usize,
    suffix: String,
}

impl FramePattern {
    /// Parse a pattern with exactly one `%d` / `%0Nd` placeholder.
    pub fn parse(pattern: &str) -> MediaResult<Self> {
        let invalid = || MediaError::invalid_config(format!("invalid frame pattern `{}`", pattern));

        let start = pattern.find('%').ok_or_else(invalid)?;
        let rest = &pattern[start + 1..];
        let end = rest.find('d').ok_or_else(invalid)?;
        let width_str = &rest[..end];
        if !width_str.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        let width = if width_str.is_empty() {
            0
        } else {
            width_str.parse::<usize>().map_err(|_| invalid())?
        };

        let prefix = pattern[..start].to_string();
        let suffix = rest[end + 1..].to_string();
        if suffix.contains('%') || prefix.contains('/') || suffix.contains('/') {
            return Err(invalid());
        }

        Ok(Self {
            prefix,
            width,
            suffix,
        })
    }

    /// Sequence index encoded in `file_name`, if it matches the pattern.
    pub fn index_of(&self, file_name: &str) -> Option<u32> {
        let digits = file_name
            .strip_prefix(&self.prefix)?
            .strip_suffix(&self.suffix)?;
        if digits.is_empty() || digits.len() < self.width {
            return None;
        }
        if !digits.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok()
    }

    /// File name the extractor writes for a 1-based index.
    pub fn file_name(&self, index: u32) -> String {
        format!(
            "{}{:0width$}{}",
            self.prefix,
            index,
            self.suffix,
            width = self.width
        )
    }
}

/// One image written by the extractor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedFrame {
    /// Index from the file name (1-based for FFmpeg output)
    pub index: u32,
    /// Absolute path
    pub path: PathBuf,
    /// File name inside the job directory
    pub file_name: String,
}

/// List extracted frames in capture order.
///
/// Files not matching the pattern are ignored. Frames are ordered by their
/// numeric index, so numbers outgrowing the zero padding still sort
/// correctly.
pub async fn list_frames(dir: &Path, pattern: &FramePattern) -> MediaResult<Vec<ExtractedFrame>> {
    let mut frames = Vec::new();
    let mut entries = fs::read_dir(dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        let file_name = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(_) => continue,
        };
        if let Some(index) = pattern.index_of(&file_name) {
            frames.push(ExtractedFrame {
                index,
                path: entry.path(),
                file_name,
            });
        }
    }

    frames.sort_by(|a, b| a.index.cmp(&b.index).then_with(|| a.file_name.cmp(&b.file_name)));
    debug!("Found {} frames in {}", frames.len(), dir.display());
    Ok(frames)
}

/// Number of frames that participate in upload and archiving.
pub fn upload_limit(requested: u32, global_max: u32, total_extracted: usize) -> usize {
    let cap = requested.min(global_max) as usize;
    cap.min(total_extracted)
}

/// Keep the first `limit` frames in order; the rest are discarded.
pub fn select_frames(mut frames: Vec<ExtractedFrame>, limit: usize) -> Vec<ExtractedFrame> {
    frames.truncate(limit);
    frames
}
