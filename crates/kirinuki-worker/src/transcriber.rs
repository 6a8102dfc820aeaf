//! Speech-to-text port and the lazily built model handle behind it.
//!
//! The model is owned by whoever creates the [`ModelSlot`] and passed to the
//! code that needs it. Changing the requested configuration drops the loaded
//! model; the next use builds a new one.

use std::path::Path;

use async_trait::async_trait;
use kirinuki_models::Cue;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::WorkerResult;

/// Which model to load and where to run it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelConfig {
    /// Model size, e.g. "base" or "large-v3"
    pub size: String,
    /// "cpu" or "cuda"
    pub device: String,
    /// Weight precision, e.g. "int8" or "float16"
    pub compute_type: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            size: "base".to_string(),
            device: "cpu".to_string(),
            compute_type: "int8".to_string(),
        }
    }
}

/// An optional model built on first use for a given configuration.
#[derive(Debug)]
pub struct ModelSlot<T> {
    config: ModelConfig,
    model: Option<T>,
}

impl<T> ModelSlot<T> {
    pub fn new(config: ModelConfig) -> Self {
        Self { config, model: None }
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn is_loaded(&self) -> bool {
        self.model.is_some()
    }

    /// The loaded model, building it with `builder` if there is none.
    ///
    /// A failed build leaves the slot empty.
    pub fn get_or_init<F, E>(&mut self, builder: F) -> Result<&T, E>
    where
        F: FnOnce(&ModelConfig) -> Result<T, E>,
    {
        let model = match self.model.take() {
            Some(model) => model,
            None => {
                info!(
                    size = %self.config.size,
                    device = %self.config.device,
                    compute_type = %self.config.compute_type,
                    "Loading transcription model"
                );
                builder(&self.config)?
            }
        };
        Ok(self.model.insert(model))
    }

    /// Switch to `config`, dropping the loaded model if it differs.
    ///
    /// Returns whether the configuration changed.
    pub fn reconfigure(&mut self, config: ModelConfig) -> bool {
        if config == self.config {
            return false;
        }
        info!(
            from = %self.config.size,
            to = %config.size,
            "Reconfiguring transcription model"
        );
        self.model = None;
        self.config = config;
        true
    }
}

/// Turns an audio or video file into timed cues.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, media: &Path) -> WorkerResult<Vec<Cue>>;
}
