//! yt-dlp downloader for caption tracks.
//!
//! Runs `yt-dlp` as a subprocess with media download disabled, asking for
//! manual and automatic subtitles in a single language. The output template
//! places the file at `<scratch>/transcript_<job_id>.<lang>.<ext>`.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info};

use super::{DownloadError, Downloader};
use crate::core::artifacts::caption_stem;

/// Downloader backed by the `yt-dlp` binary
pub struct YtDlpDownloader {
    /// Path to the yt-dlp binary (default: "yt-dlp")
    binary_path: String,

    /// Directory captions are written to
    scratch_dir: PathBuf,

    /// Subtitle language to request
    language: String,

    /// Upper bound for one subprocess run
    timeout: Duration,
}

impl YtDlpDownloader {
    /// Create a downloader writing into `scratch_dir`
    pub fn new(scratch_dir: PathBuf, language: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary_path: "yt-dlp".to_string(),
            scratch_dir,
            language: language.into(),
            timeout,
        }
    }

    /// Use a custom binary path
    pub fn with_binary_path(mut self, binary_path: impl Into<String>) -> Self {
        self.binary_path = binary_path.into();
        self
    }

    /// yt-dlp output template for a job
    fn output_template(&self, job_id: &str) -> String {
        self.scratch_dir
            .join(format!("{}.%(ext)s", caption_stem(job_id)))
            .to_string_lossy()
            .into_owned()
    }

    fn args(&self, url: &str, job_id: &str) -> Vec<String> {
        vec![
            "--skip-download".to_string(),
            "--write-subs".to_string(),
            "--write-auto-subs".to_string(),
            "--sub-langs".to_string(),
            self.language.clone(),
            "--sub-format".to_string(),
            "best".to_string(),
            "--no-warnings".to_string(),
            "-o".to_string(),
            self.output_template(job_id),
            "--".to_string(),
            url.to_string(),
        ]
    }
}

#[async_trait]
impl Downloader for YtDlpDownloader {
    fn name(&self) -> &str {
        "yt-dlp"
    }

    async fn download(&self, url: &str, job_id: &str) -> Result<(), DownloadError> {
        info!(job_id, url, "Downloading subtitles via yt-dlp");

        let child = Command::new(&self.binary_path)
            .args(self.args(url, job_id))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(DownloadError::Spawn)?;

        let output = timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| DownloadError::Timeout(self.timeout))?
            .map_err(DownloadError::Spawn)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DownloadError::Exit {
                code: output.status.code().unwrap_or(-1),
                stderr: stderr.trim().to_string(),
            });
        }

        debug!(
            job_id,
            stdout = %String::from_utf8_lossy(&output.stdout).trim(),
            "yt-dlp finished"
        );
        info!(job_id, "Subtitles downloaded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn downloader() -> YtDlpDownloader {
        YtDlpDownloader::new(PathBuf::from("/scratch"), "en", Duration::from_secs(5))
    }

    #[test]
    fn test_output_template() {
        assert_eq!(
            downloader().output_template("lm-1"),
            "/scratch/transcript_lm-1.%(ext)s"
        );
    }

    #[test]
    fn test_args_request_single_language_without_media() {
        let args = downloader().args("https://youtu.be/x", "lm-1");
        assert!(args.contains(&"--skip-download".to_string()));
        assert!(args.contains(&"--write-auto-subs".to_string()));
        let lang = args.iter().position(|a| a == "--sub-langs").unwrap();
        assert_eq!(args[lang + 1], "en");
        assert_eq!(args.last().unwrap(), "https://youtu.be/x");
    }

    #[tokio::test]
    async fn test_missing_binary_is_spawn_error() {
        let downloader = downloader().with_binary_path("/nonexistent/yt-dlp");
        let err = downloader.download("u", "lm-1").await.unwrap_err();
        assert!(matches!(err, DownloadError::Spawn(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_reported() {
        let downloader = downloader().with_binary_path("false");
        let err = downloader.download("u", "lm-1").await.unwrap_err();
        assert!(matches!(err, DownloadError::Exit { code: 1, .. }));
    }
}
