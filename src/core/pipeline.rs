//! Per-job pipeline: download → normalize → deliver → cleanup.
//!
//! One call to [`JobPipeline::run`] is one attempt. Stages run strictly in
//! order; file access and normalization happen on the blocking pool so a slow
//! job never stalls the other workers. Cleanup of the job's scratch files is
//! tied to a scope guard and runs once on every exit path.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument};

use crate::adapters::{Delivery, DeliveryMeta, Downloader};
use crate::domain::{CaptionTrack, Job, JobState, NormalizedText};

use super::artifacts::{ArtifactManager, CleanupGuard};
use super::error::JobError;
use super::normalizer;

/// Executes the stages of a single job attempt
pub struct JobPipeline {
    downloader: Arc<dyn Downloader>,
    delivery: Arc<dyn Delivery>,
    artifacts: ArtifactManager,
}

impl JobPipeline {
    /// Create a pipeline from its capabilities
    pub fn new(
        downloader: Arc<dyn Downloader>,
        delivery: Arc<dyn Delivery>,
        artifacts: ArtifactManager,
    ) -> Self {
        Self {
            downloader,
            delivery,
            artifacts,
        }
    }

    /// Run one attempt, returning the number of bytes delivered
    #[instrument(skip(self, job), fields(job_id = %job.job_id, url = %job.url))]
    pub async fn run(&self, job: &Job) -> Result<usize, JobError> {
        debug!(state = %JobState::Pending, "Starting attempt");
        let guard = CleanupGuard::new(self.artifacts.clone(), job.job_id.clone());

        let result = self.execute(job).await;

        let report = guard.release().await;
        debug!(
            removed = report.removed.len(),
            failed = report.failed,
            "Cleanup finished"
        );

        match &result {
            Ok(bytes) => info!(state = %JobState::Delivered, bytes, "Job delivered"),
            Err(e) => error!(
                state = %JobState::Failed,
                stage = %e.stage(),
                error = %e,
                "Job attempt failed"
            ),
        }

        result
    }

    async fn execute(&self, job: &Job) -> Result<usize, JobError> {
        debug!(state = %JobState::Downloading, downloader = self.downloader.name());
        self.downloader.download(&job.url, &job.job_id).await?;

        let artifacts = self.artifacts.clone();
        let job_id = job.job_id.clone();
        let caption_path = tokio::task::spawn_blocking(move || artifacts.locate(&job_id)).await??;
        info!(path = %caption_path.display(), "Subtitle file downloaded");

        debug!(state = %JobState::Normalizing);
        let artifacts = self.artifacts.clone();
        let (output_path, text) =
            tokio::task::spawn_blocking(move || normalize_file(&artifacts, &caption_path)).await??;
        info!(output = %output_path.display(), paragraphs = text.paragraphs().len(), "Subtitles processed");

        if text.is_empty() {
            error!("Processed content is empty");
            return Err(JobError::EmptyContent);
        }

        let content = text.to_plain_text();
        debug!(state = %JobState::Delivering, bytes = content.len());
        self.delivery
            .deliver(
                &content,
                DeliveryMeta {
                    user_id: &job.user_id,
                    delivery_target: &job.delivery_target,
                    endpoint: &job.endpoint,
                },
            )
            .await?;

        Ok(content.len())
    }
}

/// Read a caption file, normalize it and persist the plain text next to it
fn normalize_file(
    artifacts: &ArtifactManager,
    caption_path: &Path,
) -> Result<(PathBuf, NormalizedText), std::io::Error> {
    let raw = std::fs::read(caption_path)?;
    let track = CaptionTrack::new(
        caption_path.to_path_buf(),
        String::from_utf8_lossy(&raw).into_owned(),
    );
    debug!(format = %track.format, bytes = raw.len(), "Normalizing caption track");

    let text = normalizer::normalize_track(&track);

    let output_path = artifacts.output_path(caption_path);
    std::fs::write(&output_path, text.to_plain_text())?;

    Ok((output_path, text))
}

/// Whole-pipeline retry policy used by the worker loop.
///
/// Backoff is linear: the wait after attempt `n` is `n * backoff_unit`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including first try)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Backoff unit in milliseconds
    #[serde(default = "default_backoff_unit")]
    pub backoff_unit_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}
fn default_backoff_unit() -> u64 {
    5000
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_unit_ms: default_backoff_unit(),
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after a failed attempt (1-indexed)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.backoff_unit_ms.saturating_mul(u64::from(attempt)))
    }

    /// Check if another attempt is allowed after `attempt` failed
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_policy_delays() {
        let policy = RetryPolicy::default();

        assert_eq!(policy.delay_after(1), Duration::from_secs(5));
        assert_eq!(policy.delay_after(2), Duration::from_secs(10));
        assert_eq!(policy.delay_after(3), Duration::from_secs(15));
    }

    #[test]
    fn test_retry_policy_should_retry() {
        let policy = RetryPolicy::default();

        assert!(policy.should_retry(1));
        assert!(policy.should_retry(2));
        assert!(!policy.should_retry(3));
    }

    #[test]
    fn test_retry_policy_yaml_defaults() {
        let policy: RetryPolicy = serde_yaml::from_str("max_attempts: 5").unwrap();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.backoff_unit_ms, 5000);
    }
}
