//! Transient caption files on scratch storage.
//!
//! Every file a job touches lives in the scratch directory and carries the
//! job id in its name:
//!
//! | File | Written by |
//! |------|-----------|
//! | `transcript_<job_id>.<lang>.<ext>` | downloader |
//! | `output_transcript_<job_id>.<lang>.<ext>.txt` | pipeline |
//!
//! Concurrent jobs therefore never share a path and no locking is needed.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{error, info, warn};

/// Errors raised while locating artifacts
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("No caption file found for job {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// File stem the downloader must use for a job's caption file
pub fn caption_stem(job_id: &str) -> String {
    format!("transcript_{}", job_id)
}

/// Files removed (or not) by a cleanup pass
#[derive(Debug, Clone, Default)]
pub struct CleanupReport {
    pub removed: Vec<PathBuf>,
    pub failed: usize,
}

/// Locates and removes a job's transient files
#[derive(Debug, Clone)]
pub struct ArtifactManager {
    scratch_dir: PathBuf,
    language: String,
    extensions: Vec<String>,
}

impl ArtifactManager {
    /// Create a manager for `scratch_dir`, probing `extensions` in order
    pub fn new(scratch_dir: PathBuf, language: impl Into<String>, extensions: Vec<String>) -> Self {
        Self {
            scratch_dir,
            language: language.into(),
            extensions,
        }
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    /// Create the scratch directory if it does not exist yet
    pub fn ensure_scratch_dir(&self) -> Result<(), ArtifactError> {
        std::fs::create_dir_all(&self.scratch_dir)?;
        Ok(())
    }

    /// Expected path of a caption file with the given extension
    pub fn caption_path(&self, job_id: &str, extension: &str) -> PathBuf {
        self.scratch_dir.join(format!(
            "{}.{}.{}",
            caption_stem(job_id),
            self.language,
            extension
        ))
    }

    /// Find the caption file the downloader produced for `job_id`
    pub fn locate(&self, job_id: &str) -> Result<PathBuf, ArtifactError> {
        self.extensions
            .iter()
            .map(|ext| self.caption_path(job_id, ext))
            .find(|path| path.is_file())
            .ok_or_else(|| ArtifactError::NotFound(job_id.to_string()))
    }

    /// Path of the normalized-text artifact derived from a caption file
    pub fn output_path(&self, caption_path: &Path) -> PathBuf {
        let file_name = caption_path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy();
        self.scratch_dir.join(format!("output_{}.txt", file_name))
    }

    /// Glob patterns matching every transient file of a job.
    ///
    /// The language segment keeps `job` from matching the files of `job.1`.
    fn patterns(&self, job_id: &str) -> [String; 2] {
        let dir = glob::Pattern::escape(&self.scratch_dir.to_string_lossy());
        let stem = glob::Pattern::escape(&format!("{}.{}", caption_stem(job_id), self.language));
        [
            format!("{}/{}.*", dir, stem),
            format!("{}/output_{}.*", dir, stem),
        ]
    }

    /// Remove every transient file of `job_id`.
    ///
    /// Best-effort: failures are logged and counted, never returned.
    pub fn cleanup(&self, job_id: &str) -> CleanupReport {
        let mut report = CleanupReport::default();

        for pattern in self.patterns(job_id) {
            let paths = match glob::glob(&pattern) {
                Ok(paths) => paths,
                Err(e) => {
                    error!(job_id, %pattern, error = %e, "Invalid cleanup pattern");
                    report.failed += 1;
                    continue;
                }
            };

            for entry in paths {
                match entry {
                    Ok(path) => match std::fs::remove_file(&path) {
                        Ok(()) => {
                            info!(job_id, path = %path.display(), "Cleaned up file");
                            report.removed.push(path);
                        }
                        Err(e) => {
                            error!(job_id, path = %path.display(), error = %e, "Error cleaning up file");
                            report.failed += 1;
                        }
                    },
                    Err(e) => {
                        error!(job_id, error = %e, "Error reading cleanup candidate");
                        report.failed += 1;
                    }
                }
            }
        }

        report
    }
}

/// Scope guard that runs [`ArtifactManager::cleanup`] exactly once.
///
/// [`CleanupGuard::release`] cleans up on a blocking thread. If the guard is
/// dropped without being released (early return, panic, cancelled future) it
/// cleans up synchronously in `drop`.
pub struct CleanupGuard {
    manager: ArtifactManager,
    job_id: String,
    armed: bool,
}

impl CleanupGuard {
    pub fn new(manager: ArtifactManager, job_id: impl Into<String>) -> Self {
        Self {
            manager,
            job_id: job_id.into(),
            armed: true,
        }
    }

    /// Run cleanup now and disarm the guard
    pub async fn release(mut self) -> CleanupReport {
        self.armed = false;
        let manager = self.manager.clone();
        let job_id = self.job_id.clone();

        match tokio::task::spawn_blocking(move || manager.cleanup(&job_id)).await {
            Ok(report) => report,
            Err(e) => {
                error!(job_id = %self.job_id, error = %e, "Cleanup task failed");
                CleanupReport::default()
            }
        }
    }
}

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        if self.armed {
            warn!(job_id = %self.job_id, "Pipeline exited early, cleaning up inline");
            self.manager.cleanup(&self.job_id);
        }
    }
}
