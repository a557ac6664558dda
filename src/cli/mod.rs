//! Command-line interface for caption-relay.
//!
//! Provides commands for running the worker pool, normalizing a caption file
//! by hand, and inspecting the resolved configuration.

use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::adapters::{HttpDelivery, RedisQueue, YtDlpDownloader};
use crate::config::{self, ResolvedConfig};
use crate::core::{normalizer, JobPipeline, Worker, WorkerPool};

/// caption-relay - Subtitle download and normalization worker
#[derive(Parser, Debug)]
#[command(name = "caption-relay")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file (defaults to .caption-relay/config.yaml in this or a parent directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the worker pool and process jobs until interrupted
    Run {
        /// Redis URL (e.g., redis://[:password@]host[:port][/db-number])
        #[arg(env = "CAPTION_RELAY_REDIS_URL")]
        redis_url: String,

        /// Number of concurrent workers
        #[arg(short, long)]
        workers: Option<usize>,

        /// Directory for transient caption files
        #[arg(long, env = "CAPTION_RELAY_SCRATCH_DIR")]
        scratch_dir: Option<PathBuf>,
    },

    /// Normalize a WebVTT/SRT file and print the plain text
    Normalize {
        /// Input file (reads from stdin if not provided)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        let mut config = config::load_config(self.config.as_deref())?;

        match self.command {
            Commands::Run {
                redis_url,
                workers,
                scratch_dir,
            } => {
                if let Some(workers) = workers {
                    config.workers = workers;
                }
                if let Some(scratch_dir) = scratch_dir {
                    config.scratch_dir = scratch_dir;
                }
                config.validate()?;
                run_workers(&config, &redis_url).await
            }
            Commands::Normalize { input } => normalize_input(input),
            Commands::Config => {
                show_config(&config);
                Ok(())
            }
        }
    }
}

/// Build the pipeline, connect one queue per worker and run until Ctrl-C
async fn run_workers(config: &ResolvedConfig, redis_url: &str) -> Result<()> {
    info!(
        workers = config.workers,
        queue = %config.queue_name,
        scratch_dir = %config.scratch_dir.display(),
        "Starting caption relay"
    );

    let artifacts = config.artifact_manager();
    artifacts.ensure_scratch_dir().with_context(|| {
        format!(
            "Failed to create scratch directory: {}",
            artifacts.scratch_dir().display()
        )
    })?;

    let downloader = YtDlpDownloader::new(
        config.scratch_dir.clone(),
        config.language.clone(),
        config.download_timeout,
    )
    .with_binary_path(config.downloader_binary.clone());
    let delivery =
        HttpDelivery::new(config.delivery_timeout).context("Failed to build HTTP client")?;

    let pipeline = Arc::new(JobPipeline::new(
        Arc::new(downloader),
        Arc::new(delivery),
        artifacts,
    ));

    let settings = config.worker_settings();
    let mut workers = Vec::with_capacity(config.workers);
    for id in 0..config.workers {
        let queue = RedisQueue::connect(redis_url, config.queue_name.clone())
            .await
            .with_context(|| format!("Failed to connect worker {} to Redis", id))?;
        workers.push(Worker::new(id, queue, Arc::clone(&pipeline), settings.clone()));
    }

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for shutdown signal");
            return;
        }
        info!("Received shutdown signal, gracefully stopping workers...");
        signal_token.cancel();
    });

    WorkerPool::new(workers).run(shutdown).await;
    Ok(())
}

/// Normalize a caption file (or stdin) to stdout
fn normalize_input(input_file: Option<PathBuf>) -> Result<()> {
    let input = if let Some(path) = input_file {
        let raw = std::fs::read(&path)
            .with_context(|| format!("Failed to read input file: {}", path.display()))?;
        String::from_utf8_lossy(&raw).into_owned()
    } else if !io::stdin().is_terminal() {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read from stdin")?;
        buffer
    } else {
        anyhow::bail!("No input provided. Use --input <file> or pipe to stdin");
    };

    let text = normalizer::normalize(&input);
    if text.is_empty() {
        anyhow::bail!("Normalized content is empty");
    }

    println!("{}", text);
    Ok(())
}

/// Print the resolved configuration
fn show_config(config: &ResolvedConfig) {
    println!("caption-relay configuration");
    println!();
    println!(
        "Config file: {}",
        config
            .config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Queue:");
    println!("  Name:           {}", config.queue_name);
    println!("  Command type:   {}", config.command_type);
    println!("  Pop timeout:    {:?}", config.pop_timeout);
    println!("  Error pause:    {:?}", config.queue_error_pause);
    println!();
    println!("Workers:");
    println!("  Count:          {}", config.workers);
    println!("  Max attempts:   {}", config.retry.max_attempts);
    println!("  Backoff unit:   {}ms", config.retry.backoff_unit_ms);
    println!();
    println!("Download:");
    println!("  Binary:         {}", config.downloader_binary);
    println!("  Language:       {}", config.language);
    println!("  Extensions:     {}", config.extensions.join(", "));
    println!("  Timeout:        {:?}", config.download_timeout);
    println!("  Scratch dir:    {}", config.scratch_dir.display());
    println!();
    println!("Delivery:");
    println!("  Timeout:        {:?}", config.delivery_timeout);
}
