//! Configuration for caption-relay.
//!
//! Configuration sources (highest priority first):
//! 1. CLI flags and environment variables (applied by the CLI)
//! 2. Config file (explicit `--config`, else `.caption-relay/config.yaml`)
//! 3. Defaults
//!
//! Config file discovery:
//! - Searches current directory and parents for .caption-relay/config.yaml
//! - Relative paths in the config file resolve against the project root
//!   (the parent of `.caption-relay/`)
//!
//! The resolved configuration is built once at startup and passed down
//! explicitly.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::core::{ArtifactManager, RetryPolicy, WorkerSettings};

/// Directory holding the config file
pub const CONFIG_DIR: &str = ".caption-relay";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
    #[serde(default)]
    pub download: DownloadConfig,
    #[serde(default)]
    pub delivery: DeliveryConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueueConfig {
    pub name: Option<String>,
    pub command_type: Option<String>,
    pub pop_timeout_seconds: Option<u64>,
    pub error_pause_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkerConfig {
    pub count: Option<usize>,
    #[serde(default)]
    pub retry: Option<RetryPolicy>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DownloadConfig {
    pub binary: Option<String>,
    pub language: Option<String>,
    pub extensions: Option<Vec<String>>,
    pub timeout_seconds: Option<u64>,
    /// Scratch directory (relative to the project root)
    pub scratch_dir: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeliveryConfig {
    pub timeout_seconds: Option<u64>,
}

/// Resolved configuration with defaults applied
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub queue_name: String,
    pub command_type: String,
    pub pop_timeout: Duration,
    pub queue_error_pause: Duration,
    pub workers: usize,
    pub retry: RetryPolicy,
    pub downloader_binary: String,
    pub language: String,
    pub extensions: Vec<String>,
    pub download_timeout: Duration,
    pub scratch_dir: PathBuf,
    pub delivery_timeout: Duration,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            queue_name: "instructions_queue".to_string(),
            command_type: "youtube_transcript_dl".to_string(),
            pop_timeout: Duration::from_secs(5),
            queue_error_pause: Duration::from_secs(5),
            workers: 2,
            retry: RetryPolicy::default(),
            downloader_binary: "yt-dlp".to_string(),
            language: "en".to_string(),
            extensions: vec!["srt".to_string(), "vtt".to_string(), "ttml".to_string()],
            download_timeout: Duration::from_secs(600),
            scratch_dir: PathBuf::from("output_files"),
            delivery_timeout: Duration::from_secs(30),
            config_file: None,
        }
    }
}

impl ResolvedConfig {
    /// Apply a parsed config file on top of the defaults
    pub fn from_file(config: ConfigFile, base_dir: &Path, config_file: Option<PathBuf>) -> Self {
        let defaults = Self::default();

        Self {
            queue_name: config.queue.name.unwrap_or(defaults.queue_name),
            command_type: config.queue.command_type.unwrap_or(defaults.command_type),
            pop_timeout: config
                .queue
                .pop_timeout_seconds
                .map(Duration::from_secs)
                .unwrap_or(defaults.pop_timeout),
            queue_error_pause: config
                .queue
                .error_pause_seconds
                .map(Duration::from_secs)
                .unwrap_or(defaults.queue_error_pause),
            workers: config.worker.count.unwrap_or(defaults.workers),
            retry: config.worker.retry.unwrap_or(defaults.retry),
            downloader_binary: config.download.binary.unwrap_or(defaults.downloader_binary),
            language: config.download.language.unwrap_or(defaults.language),
            extensions: config.download.extensions.unwrap_or(defaults.extensions),
            download_timeout: config
                .download
                .timeout_seconds
                .map(Duration::from_secs)
                .unwrap_or(defaults.download_timeout),
            scratch_dir: config
                .download
                .scratch_dir
                .map(|dir| resolve_path(base_dir, &dir))
                .unwrap_or(defaults.scratch_dir),
            delivery_timeout: config
                .delivery
                .timeout_seconds
                .map(Duration::from_secs)
                .unwrap_or(defaults.delivery_timeout),
            config_file,
        }
    }

    /// Reject values the worker cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            anyhow::bail!("Worker count must be at least 1");
        }
        if self.retry.max_attempts == 0 {
            anyhow::bail!("max_attempts must be at least 1");
        }
        if self.extensions.is_empty() {
            anyhow::bail!("At least one subtitle extension is required");
        }
        if self.queue_name.is_empty() || self.command_type.is_empty() {
            anyhow::bail!("Queue name and command type cannot be empty");
        }
        Ok(())
    }

    /// Artifact manager for the configured scratch directory
    pub fn artifact_manager(&self) -> ArtifactManager {
        ArtifactManager::new(
            self.scratch_dir.clone(),
            self.language.clone(),
            self.extensions.clone(),
        )
    }

    /// Settings shared by every worker
    pub fn worker_settings(&self) -> WorkerSettings {
        WorkerSettings {
            command_type: self.command_type.clone(),
            pop_timeout: self.pop_timeout,
            queue_error_pause: self.queue_error_pause,
            retry: self.retry.clone(),
        }
    }
}

/// Find config file by searching `start` and its parents
fn find_config_file(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        let config_path = current.join(CONFIG_DIR).join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
pub fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to `base`
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

/// Project root for a discovered or explicit config file
fn base_dir_for(config_path: &Path) -> PathBuf {
    let parent = config_path.parent().unwrap_or(Path::new("."));
    if parent.file_name().map(|n| n == CONFIG_DIR).unwrap_or(false) {
        parent.parent().unwrap_or(Path::new(".")).to_path_buf()
    } else {
        parent.to_path_buf()
    }
}

/// Load configuration from an explicit file, a discovered file, or defaults
pub fn load_config(explicit: Option<&Path>) -> Result<ResolvedConfig> {
    let config_file = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => {
            let cwd = std::env::current_dir().context("Failed to determine current directory")?;
            find_config_file(&cwd)
        }
    };

    let config = match config_file {
        Some(ref path) => {
            let parsed = load_config_file(path)?;
            ResolvedConfig::from_file(parsed, &base_dir_for(path), config_file.clone())
        }
        None => ResolvedConfig::default(),
    };

    config.validate()?;
    Ok(config)
}
