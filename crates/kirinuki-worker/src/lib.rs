//! Burn and clip job worker.
//!
//! This crate provides:
//! - Environment configuration and job-scoped logging
//! - Burn jobs (captions, scrolling chat, prefix images and emoji)
//! - Clip jobs (cut, crop, vertical letterbox, scrolling chat)
//! - The transcription model slot and speech-to-text port

pub mod burn_job;
pub mod clip_job;
pub mod config;
pub mod error;
pub mod job;
pub mod logging;
pub mod sources;
pub mod transcriber;

pub use burn_job::BurnJob;
pub use clip_job::{sanitize_title, ClipJob};
pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use job::{Job, JobOutput};
pub use logging::JobLogger;
pub use sources::SourceFiles;
pub use transcriber::{ModelConfig, ModelSlot, Transcriber};
