//! Clip boundary heuristics and the clip scoring port.
//!
//! Boundaries come from two signals: silence gaps in the audio and
//! sentence ends in the transcript. Candidates too close together are
//! merged and the strongest are kept when there are too many.

use std::sync::LazyLock;

use async_trait::async_trait;
use kirinuki_models::{ClipCandidate, ClipScore, CommentEvent, Cue};
use regex::Regex;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Shortest clip produced by boundary detection, in seconds.
pub const MIN_CLIP_DURATION: f64 = 10.0;
/// Longest clip produced by boundary detection, in seconds.
pub const MAX_CLIP_DURATION: f64 = 60.0;
pub const DEFAULT_MAX_CLIPS: usize = 5;

/// Boundaries closer than this are considered the same point.
const BOUNDARY_MATCH_SECS: f64 = 0.5;
const SILENCE_SCORE: u32 = 2;
const SENTENCE_SCORE: u32 = 1;

static SENTENCE_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[。！？\n]|[.!?]\s").unwrap());

/// End times of cues whose text ends a sentence.
pub fn detect_sentence_boundaries(cues: &[Cue]) -> Vec<f64> {
    let boundaries: Vec<f64> = cues
        .iter()
        .filter(|cue| SENTENCE_END.is_match(&cue.text))
        .map(|cue| cue.end)
        .collect();
    debug!(count = boundaries.len(), "Detected sentence boundaries");
    boundaries
}

/// Split the transcript into clips at silence and sentence boundaries.
///
/// Only cues starting at or after `start_time` are considered. At most
/// `max_clips` clips are returned, each between [`MIN_CLIP_DURATION`] and
/// [`MAX_CLIP_DURATION`] long.
pub fn detect_boundaries_hybrid(
    cues: &[Cue],
    silence_boundaries: &[f64],
    max_clips: usize,
    start_time: f64,
) -> Vec<ClipCandidate> {
    let cues: Vec<Cue> = if start_time > 0.0 {
        cues.iter().filter(|c| c.start >= start_time).cloned().collect()
    } else {
        cues.to_vec()
    };
    let (Some(first), Some(last)) = (cues.first(), cues.last()) else {
        return Vec::new();
    };
    let (first_time, last_time) = (first.start, last.end);

    let sentence_boundaries = detect_sentence_boundaries(&cues);
    let mut candidates: Vec<f64> = silence_boundaries
        .iter()
        .chain(&sentence_boundaries)
        .copied()
        .collect();
    candidates.sort_by(f64::total_cmp);
    candidates.dedup();

    if candidates.is_empty() {
        return Vec::new();
    }

    let mut boundaries = vec![first_time];
    for boundary in candidates {
        if boundary < first_time || boundary > last_time {
            continue;
        }
        if boundaries
            .last()
            .is_some_and(|prev| boundary - prev >= MIN_CLIP_DURATION)
        {
            boundaries.push(boundary);
        }
    }
    if boundaries
        .last()
        .is_some_and(|prev| *prev < last_time - MIN_CLIP_DURATION)
    {
        boundaries.push(last_time);
    }

    let target = max_clips + 1;
    if boundaries.len() > target && boundaries.len() > 2 {
        let near = |set: &[f64], b: f64| set.iter().any(|s| (b - s).abs() < BOUNDARY_MATCH_SECS);
        let mut scored: Vec<(f64, u32)> = boundaries[1..boundaries.len() - 1]
            .iter()
            .map(|&b| {
                let mut score = 0;
                if near(silence_boundaries, b) {
                    score += SILENCE_SCORE;
                }
                if near(&sentence_boundaries, b) {
                    score += SENTENCE_SCORE;
                }
                (b, score)
            })
            .collect();
        // Stable: equal scores keep time order
        scored.sort_by(|a, b| b.1.cmp(&a.1));

        let mut selected = vec![first_time, last_time];
        selected.extend(scored.iter().take(target.saturating_sub(2)).map(|&(b, _)| b));
        selected.sort_by(f64::total_cmp);
        boundaries = selected;
    }

    let clips: Vec<ClipCandidate> = boundaries
        .windows(2)
        .enumerate()
        .filter_map(|(i, pair)| {
            let start = pair[0];
            let end = pair[1].min(start + MAX_CLIP_DURATION);
            let duration = end - start;
            (duration >= MIN_CLIP_DURATION).then(|| {
                ClipCandidate::new(
                    start,
                    end,
                    format!("Segment {}", i + 1),
                    format!("{duration:.1}s clip (hybrid detection)"),
                )
            })
        })
        .collect();

    info!(
        boundaries = boundaries.len(),
        clips = clips.len(),
        "Hybrid boundary detection finished"
    );
    clips
}

/// Widen clips shorter than `target` seconds, evenly on both sides.
///
/// Time that cannot be added at one edge of the video is added at the
/// other.
pub fn extend_short_clips(clips: &[ClipCandidate], video_duration: f64, target: f64) -> Vec<ClipCandidate> {
    clips
        .iter()
        .map(|clip| {
            let duration = clip.duration();
            if duration >= target {
                return clip.clone();
            }

            let half = (target - duration) / 2.0;
            let mut start = (clip.start - half).max(0.0);
            let mut end = (clip.end + half).min(video_duration);

            if start <= 0.0 && end - start < target {
                end = video_duration.min(target);
            }
            if end >= video_duration && end - start < target {
                start = (video_duration - target).max(0.0);
            }

            debug!(
                title = %clip.title,
                from = duration,
                to = end - start,
                "Extended short clip"
            );

            ClipCandidate {
                start,
                end,
                reason: format!("{} (extended from {:.1}s)", clip.reason, duration),
                ..clip.clone()
            }
        })
        .collect()
}

/// Set the number of comments inside each clip.
pub fn count_comments_in_clips(clips: &[ClipCandidate], comments: &[CommentEvent]) -> Vec<ClipCandidate> {
    clips
        .iter()
        .map(|clip| ClipCandidate {
            comment_count: Some(comments.iter().filter(|c| clip.contains(c.timestamp)).count()),
            ..clip.clone()
        })
        .collect()
}

/// Transcript text of the cues lying entirely inside `[start, end]`.
pub fn transcript_excerpt(cues: &[Cue], start: f64, end: f64) -> String {
    cues.iter()
        .filter(|c| c.start >= start && c.end <= end)
        .flat_map(|c| c.lines())
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Errors reported by a clip scorer.
#[derive(Debug, Error)]
pub enum ScorerError {
    #[error("Scorer unavailable: {0}")]
    Unavailable(String),

    #[error("Scorer returned an invalid response: {0}")]
    InvalidResponse(String),

    #[error("Nothing to score: {0}")]
    EmptyTranscript(String),
}

/// Rates how interesting a clip is from its transcript.
#[async_trait]
pub trait ClipScorer: Send + Sync {
    async fn score(&self, clip: &ClipCandidate, transcript: &str) -> Result<ClipScore, ScorerError>;
}

/// Score every clip; failures are logged and reported per clip.
pub async fn score_clips(
    scorer: &dyn ClipScorer,
    cues: &[Cue],
    clips: &[ClipCandidate],
) -> Vec<Result<ClipScore, ScorerError>> {
    let mut results = Vec::with_capacity(clips.len());
    for clip in clips {
        let transcript = transcript_excerpt(cues, clip.start, clip.end);
        let result = if transcript.is_empty() {
            Err(ScorerError::EmptyTranscript(format!("{:.1}-{:.1}", clip.start, clip.end)))
        } else {
            scorer.score(clip, &transcript).await
        };
        if let Err(e) = &result {
            warn!(start = clip.start, end = clip.end, error = %e, "Clip scoring failed");
        }
        results.push(result);
    }
    results
}
