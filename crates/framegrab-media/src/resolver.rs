//! Stream resolver invocation (yt-dlp).
//!
//! The resolver turns a page URL into one continuous media stream on
//! stdout. Only its command-line contract lives here.

use std::process::Stdio;
use tokio::process::Command;

use crate::error::{MediaError, MediaResult};
use crate::pipeline::PipelineStage;

/// Typed yt-dlp configuration.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Binary name or path
    pub program: String,
    /// Download retries
    pub retries: u32,
    /// Socket timeout in seconds
    pub socket_timeout_secs: u32,
    /// Force IPv4 connections
    pub force_ipv4: bool,
    /// Codec prefix preferred for cheaper downstream decode
    pub preferred_vcodec: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            program: "yt-dlp".to_string(),
            retries: 10,
            socket_timeout_secs: 30,
            force_ipv4: true,
            preferred_vcodec: "avc".to_string(),
        }
    }
}

impl ResolverConfig {
    pub fn validate(&self) -> MediaResult<()> {
        if self.program.trim().is_empty() {
            return Err(MediaError::invalid_config("resolver program is empty"));
        }
        if self.socket_timeout_secs == 0 {
            return Err(MediaError::invalid_config(
                "resolver socket timeout must be positive",
            ));
        }
        if self.preferred_vcodec.contains(|c: char| c == ']' || c == '[' || c == '/') {
            return Err(MediaError::invalid_config(format!(
                "invalid preferred codec `{}`",
                self.preferred_vcodec
            )));
        }
        Ok(())
    }

    /// Format selector: best video at or below `quality` in the preferred
    /// codec plus best audio, then best muxed at or below `quality`, then
    /// anything.
    pub fn format_selector(&self, quality: u32) -> String {
        let height = format!("[height<={}]", quality);
        if self.preferred_vcodec.is_empty() {
            return format!("bestvideo{h}+bestaudio/best{h}/best", h = height);
        }
        format!(
            "bestvideo{h}[vcodec^={codec}]+bestaudio/best{h}/best",
            h = height,
            codec = self.preferred_vcodec
        )
    }

    /// Build the yt-dlp argument list. The stream is written to stdout.
    pub fn build_args(&self, url: &str, quality: u32) -> Vec<String> {
        let mut args = vec!["-o".to_string(), "-".to_string()];

        if self.force_ipv4 {
            args.push("--force-ipv4".to_string());
        }

        args.push("--socket-timeout".to_string());
        args.push(self.socket_timeout_secs.to_string());
        args.push("--retries".to_string());
        args.push(self.retries.to_string());
        args.push("-f".to_string());
        args.push(self.format_selector(quality));

        // End of options so the URL is never parsed as a flag
        args.push("--".to_string());
        args.push(url.to_string());

        args
    }

    /// Build the upstream pipeline stage for a job.
    pub fn stage(&self, url: &str, quality: u32) -> PipelineStage {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.build_args(url, quality))
            .stdin(Stdio::null())
            .stderr(Stdio::inherit());
        PipelineStage::new(&self.program, cmd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_selector() {
        let config = ResolverConfig::default();
        assert_eq!(
            config.format_selector(480),
            "bestvideo[height<=480][vcodec^=avc]+bestaudio/best[height<=480]/best"
        );
    }

    #[test]
    fn test_format_selector_without_codec_preference() {
        let config = ResolverConfig {
            preferred_vcodec: String::new(),
            ..Default::default()
        };
        assert_eq!(
            config.format_selector(1080),
            "bestvideo[height<=1080]+bestaudio/best[height<=1080]/best"
        );
    }

    #[test]
    fn test_build_args() {
        let args = ResolverConfig::default().build_args("https://youtu.be/x", 720);
        assert_eq!(&args[..2], &["-o", "-"]);
        assert!(args.contains(&"--force-ipv4".to_string()));
        let timeout = args.iter().position(|a| a == "--socket-timeout").unwrap();
        assert_eq!(args[timeout + 1], "30");
        let retries = args.iter().position(|a| a == "--retries").unwrap();
        assert_eq!(args[retries + 1], "10");
        assert_eq!(args[args.len() - 2], "--");
        assert_eq!(args.last().unwrap(), "https://youtu.be/x");
    }

    #[test]
    fn test_ipv4_is_optional() {
        let config = ResolverConfig {
            force_ipv4: false,
            ..Default::default()
        };
        assert!(!config.build_args("https://e.com", 480).contains(&"--force-ipv4".to_string()));
    }

    #[test]
    fn test_validate() {
        assert!(ResolverConfig::default().validate().is_ok());
        let bad = ResolverConfig {
            socket_timeout_secs: 0,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
        let bad = ResolverConfig {
            program: " ".to_string(),
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }
}
