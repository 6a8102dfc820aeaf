//! Job envelope read by the worker binary.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::burn_job::BurnJob;
use crate::clip_job::ClipJob;
use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};

/// A job, tagged by `type`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Job {
    Burn(BurnJob),
    Clip(ClipJob),
}

/// What a finished job produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobOutput {
    pub filename: String,
    pub path: PathBuf,
}

impl Job {
    /// Parse a job file.
    ///
    /// The tag is read first and the body decoded as the matching job, so
    /// numeric map keys such as `styleMap` indices decode normally.
    pub fn from_json(content: &str) -> WorkerResult<Self> {
        let mut value: serde_json::Value = serde_json::from_str(content)?;
        let kind = value
            .as_object_mut()
            .and_then(|body| body.remove("type"))
            .and_then(|t| t.as_str().map(str::to_string))
            .ok_or_else(|| WorkerError::invalid_job("Missing job type"))?;

        match kind.as_str() {
            "burn" => Ok(Job::Burn(serde_json::from_value(value)?)),
            "clip" => Ok(Job::Clip(serde_json::from_value(value)?)),
            other => Err(WorkerError::invalid_job(format!("Unknown job type: {other}"))),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Job::Burn(_) => "burn",
            Job::Clip(_) => "clip",
        }
    }

    pub async fn run(&self, config: &WorkerConfig) -> WorkerResult<JobOutput> {
        let path = match self {
            Job::Burn(job) => job.run(config).await?,
            Job::Clip(job) => job.run(config).await?,
        };
        Ok(JobOutput {
            filename: path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
            path,
        })
    }
}
