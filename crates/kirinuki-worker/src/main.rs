//! Worker binary: runs one JSON job file.
//!
//! Usage: `kirinuki-worker <job.json>`

use anyhow::Context;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use kirinuki_media::check_ffmpeg;
use kirinuki_worker::{Job, WorkerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env().add_directive("kirinuki=info".parse()?);

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    let job_file = std::env::args()
        .nth(1)
        .context("usage: kirinuki-worker <job.json>")?;

    info!("Starting kirinuki-worker");

    let config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);

    let ffmpeg = check_ffmpeg()?;
    info!(ffmpeg = %ffmpeg.display(), "Found encoder");

    let content = tokio::fs::read_to_string(&job_file)
        .await
        .with_context(|| format!("Failed to read job file {job_file}"))?;
    let job = Job::from_json(&content).context("Invalid job file")?;

    match job.run(&config).await {
        Ok(output) => {
            info!(kind = job.kind(), output = %output.path.display(), "Job finished");
            println!("{}", serde_json::to_string(&output)?);
            Ok(())
        }
        Err(e) => {
            error!(kind = job.kind(), retryable = e.is_retryable(), "Job failed: {}", e);
            Err(e.into())
        }
    }
}
