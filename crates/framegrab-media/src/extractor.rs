//! Frame extractor invocation (FFmpeg scene filter).

use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use crate::error::{MediaError, MediaResult};
use crate::frames::FramePattern;
use crate::pipeline::PipelineStage;

/// Typed FFmpeg configuration for scene-change frame extraction.
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// Binary name or path
    pub program: String,
    /// Scene-change score a frame must exceed to be selected (0..1)
    pub scene_threshold: f64,
    /// Minimum seconds since the previously selected frame
    pub min_gap_secs: Option<f64>,
    /// JPEG quality scale (`-q:v`), 1 is best
    pub jpeg_quality: u8,
    /// Output pixel format
    pub pix_fmt: String,
    /// printf-style output file pattern
    pub output_pattern: String,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            program: "ffmpeg".to_string(),
            scene_threshold: 0.4,
            min_gap_secs: None,
            jpeg_quality: 1,
            pix_fmt: "yuvj420p".to_string(),
            output_pattern: "frame_%03d.jpg".to_string(),
        }
    }
}

impl ExtractorConfig {
    pub fn validate(&self) -> MediaResult<()> {
        if self.program.trim().is_empty() {
            return Err(MediaError::invalid_config("extractor program is empty"));
        }
        if !(self.scene_threshold > 0.0 && self.scene_threshold < 1.0) {
            return Err(MediaError::invalid_config(format!(
                "scene threshold must be between 0 and 1, got {}",
                self.scene_threshold
            )));
        }
        if let Some(gap) = self.min_gap_secs {
            if !gap.is_finite() || gap < 0.0 {
                return Err(MediaError::invalid_config(format!(
                    "minimum frame gap must be non-negative, got {}",
                    gap
                )));
            }
        }
        if !(1..=31).contains(&self.jpeg_quality) {
            return Err(MediaError::invalid_config(format!(
                "jpeg quality must be in 1..=31, got {}",
                self.jpeg_quality
            )));
        }
        self.pattern()?;
        Ok(())
    }

    /// Parsed output file pattern.
    pub fn pattern(&self) -> MediaResult<FramePattern> {
        FramePattern::parse(&self.output_pattern)
    }

    /// The `select` filter expression.
    ///
    /// Commas inside the expression are escaped for the filtergraph parser.
    pub fn filter_expression(&self) -> String {
        let scene = format!("gt(scene\\,{})", self.scene_threshold);
        match self.min_gap_secs {
            Some(gap) if gap > 0.0 => format!(
                "select={}*(isnan(prev_selected_t)+gte(t-prev_selected_t\\,{}))",
                scene, gap
            ),
            _ => format!("select={}", scene),
        }
    }

    /// Build the FFmpeg argument list reading the stream from stdin.
    pub fn build_args(&self, output_dir: &Path) -> Vec<String> {
        let output = output_dir.join(&self.output_pattern);

        vec![
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-i".to_string(),
            "pipe:0".to_string(),
            "-vf".to_string(),
            self.filter_expression(),
            "-vsync".to_string(),
            "vfr".to_string(),
            "-q:v".to_string(),
            self.jpeg_quality.to_string(),
            "-pix_fmt".to_string(),
            self.pix_fmt.clone(),
            output.to_string_lossy().to_string(),
        ]
    }

    /// Build the downstream pipeline stage writing into `output_dir`.
    pub fn stage(&self, output_dir: &Path) -> PipelineStage {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.build_args(output_dir))
            .stdout(Stdio::null())
            .stderr(Stdio::inherit());
        PipelineStage::new(&self.program, cmd)
    }
}
