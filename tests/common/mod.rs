//! In-memory capabilities shared by the integration tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use caption_relay::adapters::{
    Delivery, DeliveryError, DeliveryMeta, DownloadError, Downloader, JobQueue, QueueError,
};
use caption_relay::core::{ArtifactManager, JobPipeline, RetryPolicy, Worker, WorkerSettings};
use caption_relay::Job;

pub const COMMAND_TYPE: &str = "youtube_transcript_dl";

pub const SCENARIO_VTT: &str = "WEBVTT\n\n00:00:01.000 --> 00:00:02.000\nHello world.\n\n00:00:02.000 --> 00:00:03.000\nHello world.\nGoodbye!";

/// What the fake downloader does on a given call
#[derive(Debug, Clone)]
pub enum DownloadBehavior {
    /// Write `transcript_<id>.en.<extension>` with `content`
    Write {
        extension: &'static str,
        content: String,
    },
    /// Report a download failure
    Fail,
    /// Succeed without producing a file
    NoFile,
}

/// Downloader following a script; the last behavior repeats
pub struct FakeDownloader {
    scratch_dir: PathBuf,
    script: Vec<DownloadBehavior>,
    calls: Mutex<Vec<Instant>>,
}

impl FakeDownloader {
    pub fn new(scratch_dir: &Path, script: Vec<DownloadBehavior>) -> Self {
        Self {
            scratch_dir: scratch_dir.to_path_buf(),
            script,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn writing(scratch_dir: &Path, extension: &'static str, content: &str) -> Self {
        Self::new(
            scratch_dir,
            vec![DownloadBehavior::Write {
                extension,
                content: content.to_string(),
            }],
        )
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn call_times(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Downloader for FakeDownloader {
    fn name(&self) -> &str {
        "fake"
    }

    async fn download(&self, _url: &str, job_id: &str) -> Result<(), DownloadError> {
        let behavior = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(Instant::now());
            let index = (calls.len() - 1).min(self.script.len() - 1);
            self.script[index].clone()
        };

        match behavior {
            DownloadBehavior::Write { extension, content } => {
                let path = self
                    .scratch_dir
                    .join(format!("transcript_{}.en.{}", job_id, extension));
                std::fs::write(path, content).map_err(DownloadError::Spawn)
            }
            DownloadBehavior::Fail => Err(DownloadError::Exit {
                code: 1,
                stderr: "ERROR: no subtitles available".to_string(),
            }),
            DownloadBehavior::NoFile => Ok(()),
        }
    }
}

/// One recorded delivery call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivered {
    pub content: String,
    pub user_id: String,
    pub delivery_target: String,
    pub endpoint: String,
}

/// Delivery that records calls and answers with a fixed status
pub struct RecordingDelivery {
    status: u16,
    calls: Mutex<Vec<Delivered>>,
}

impl RecordingDelivery {
    pub fn ok() -> Self {
        Self::with_status(200)
    }

    pub fn with_status(status: u16) -> Self {
        Self {
            status,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<Delivered> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Delivery for RecordingDelivery {
    async fn deliver(&self, content: &str, meta: DeliveryMeta<'_>) -> Result<(), DeliveryError> {
        self.calls.lock().unwrap().push(Delivered {
            content: content.to_string(),
            user_id: meta.user_id.to_string(),
            delivery_target: meta.delivery_target.to_string(),
            endpoint: meta.endpoint.to_string(),
        });

        if self.status == 200 {
            Ok(())
        } else {
            Err(DeliveryError::Status {
                status: self.status,
                body: "rejected".to_string(),
            })
        }
    }
}

/// Queue replaying a fixed script; cancels `shutdown` once drained
pub struct ScriptedQueue {
    script: Mutex<VecDeque<Result<Option<String>, QueueError>>>,
    shutdown: CancellationToken,
}

impl ScriptedQueue {
    pub fn new(
        script: Vec<Result<Option<String>, QueueError>>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            script: Mutex::new(script.into()),
            shutdown,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), CancellationToken::new())
    }
}

#[async_trait]
impl JobQueue for ScriptedQueue {
    async fn pop(&mut self, _wait: Duration) -> Result<Option<String>, QueueError> {
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(item) => item,
            None => {
                self.shutdown.cancel();
                Ok(None)
            }
        }
    }
}

/// Scratch directory plus an artifact manager pointing at it
pub fn scratch() -> (TempDir, ArtifactManager) {
    let temp = TempDir::new().unwrap();
    let manager = ArtifactManager::new(
        temp.path().to_path_buf(),
        "en",
        vec!["srt".to_string(), "vtt".to_string(), "ttml".to_string()],
    );
    (temp, manager)
}

pub fn pipeline(
    downloader: Arc<FakeDownloader>,
    delivery: Arc<RecordingDelivery>,
    artifacts: ArtifactManager,
) -> Arc<JobPipeline> {
    Arc::new(JobPipeline::new(downloader, delivery, artifacts))
}

pub fn settings() -> WorkerSettings {
    WorkerSettings {
        command_type: COMMAND_TYPE.to_string(),
        pop_timeout: Duration::from_millis(10),
        queue_error_pause: Duration::from_secs(5),
        retry: RetryPolicy::default(),
    }
}

pub fn worker(queue: ScriptedQueue, pipeline: Arc<JobPipeline>) -> Worker<ScriptedQueue> {
    Worker::new(0, queue, pipeline, settings())
}

pub fn job(job_id: &str) -> Job {
    Job {
        url: format!("https://www.youtube.com/watch?v={}", job_id),
        job_id: job_id.to_string(),
        user_id: "user-7".to_string(),
        delivery_target: job_id.to_string(),
        endpoint: "https://hooks.example.com/transcripts".to_string(),
    }
}

pub fn job_message(job_id: &str) -> String {
    serde_json::json!({
        "command_type": COMMAND_TYPE,
        "url": format!("https://www.youtube.com/watch?v={}", job_id),
        "user_id": "user-7",
        "lead_magnet_id": job_id,
        "endpoint": "https://hooks.example.com/transcripts",
    })
    .to_string()
}

/// Names of all files left in a directory
pub fn remaining_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
