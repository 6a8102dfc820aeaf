#![deny(unreachable_patterns)]
//! Subtitle compositing and FFmpeg CLI wrapper for clip rendering.
//!
//! This crate provides:
//! - Cue parsing, style resolution, layered caption layout and markup output
//! - Scrolling comment (danmaku) scheduling with emoji overlays
//! - Filter-graph building for captions, overlays, crops and letterboxing
//! - Type-safe FFmpeg command building with progress, timeout and cancellation
//! - Burn, clip, merge and probe operations
//! - Live chat extraction, editor exports and clip boundary heuristics

pub mod boundaries;
pub mod burn;
pub mod chat;
pub mod clip;
pub mod command;
pub mod emoji;
pub mod error;
pub mod filter_graph;
pub mod metrics;
pub mod probe;
pub mod progress;
pub mod subtitle;

pub use boundaries::{
    count_comments_in_clips, detect_boundaries_hybrid, detect_sentence_boundaries,
    extend_short_clips, score_clips, transcript_excerpt, ClipScorer, ScorerError,
};
pub use burn::{burn_subtitles, BurnSpec};
pub use chat::{load_comments, parse_info_comments, parse_live_chat};
pub use clip::{extract_clip, merge_clips, ClipSpec};
pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use emoji::{EmojiMap, EmojiResolver, NoEmoji};
pub use error::{MediaError, MediaResult};
pub use filter_graph::{FilterGraph, FilterGraphConfig, FilterNode, PreparedFilter};
pub use probe::{probe_video, VideoInfo};
pub use progress::{FfmpegProgress, ProgressCallback};
