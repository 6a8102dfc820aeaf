//! Cue track parser for WebVTT and SRT text.
//!
//! A small line-driven state machine: a `-->` line opens a cue, following
//! non-blank lines are its text, a blank line (or end of input) closes it.
//! Everything outside a cue, including the `WEBVTT` header, `NOTE` blocks
//! and sequence numbers, is ignored.

use kirinuki_models::{parse_cue_time, Cue, ModelResult};
use tracing::warn;

/// Separator between start and end time on a timing line.
pub const TIME_RANGE_SEPARATOR: &str = "-->";

/// Longest digit run still treated as a sequence number.
const MAX_SEQUENCE_DIGITS: usize = 9;

/// Parser options.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Joins the lines of a multi-line cue
    pub line_break: String,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            line_break: "\n".to_string(),
        }
    }
}

impl ParseOptions {
    /// Join lines with the markup soft break (`\N`).
    pub fn markup() -> Self {
        Self {
            line_break: kirinuki_models::MARKUP_LINE_BREAK.to_string(),
        }
    }
}

enum State {
    Idle,
    InCue {
        start: f64,
        end: f64,
        lines: Vec<String>,
        /// Numeric line that may turn out to be the next cue's sequence number
        pending_number: Option<String>,
    },
    /// Inside a cue whose timing line was malformed
    Skipping,
}

/// Parse cue text with default options (`\n` line joins).
pub fn parse_cues(input: &str) -> Vec<Cue> {
    parse_cues_with(input, &ParseOptions::default())
}

/// Parse cue text into cues in source order.
///
/// A malformed timing line drops that cue only; the rest of the track
/// still parses.
pub fn parse_cues_with(input: &str, options: &ParseOptions) -> Vec<Cue> {
    let mut cues = Vec::new();
    let mut state = State::Idle;

    for raw in input.lines() {
        let line = raw.trim();

        if line.contains(TIME_RANGE_SEPARATOR) {
            if let State::InCue { start, end, lines, .. } = state {
                // A pending number before a timing line is its sequence number
                close_cue(&mut cues, start, end, lines, options);
            }
            state = match parse_timing_line(line) {
                Ok((start, end)) => State::InCue {
                    start,
                    end,
                    lines: Vec::new(),
                    pending_number: None,
                },
                Err(e) => {
                    warn!(line = %line, error = %e, "Skipping cue with malformed timestamp");
                    State::Skipping
                }
            };
            continue;
        }

        if line.is_empty() {
            if let State::InCue {
                start,
                end,
                mut lines,
                pending_number,
            } = state
            {
                lines.extend(pending_number);
                close_cue(&mut cues, start, end, lines, options);
            }
            state = State::Idle;
            continue;
        }

        if let State::InCue {
            lines,
            pending_number,
            ..
        } = &mut state
        {
            if let Some(number) = pending_number.take() {
                lines.push(number);
            }
            if is_sequence_number(line) {
                *pending_number = Some(line.to_string());
            } else {
                lines.push(line.to_string());
            }
        }
    }

    if let State::InCue {
        start,
        end,
        mut lines,
        pending_number,
    } = state
    {
        lines.extend(pending_number);
        close_cue(&mut cues, start, end, lines, options);
    }

    cues
}

fn close_cue(cues: &mut Vec<Cue>, start: f64, end: f64, lines: Vec<String>, options: &ParseOptions) {
    if lines.is_empty() {
        return;
    }
    cues.push(Cue::new(start, end, lines.join(&options.line_break)));
}

/// Parse `start --> end [settings]`.
fn parse_timing_line(line: &str) -> ModelResult<(f64, f64)> {
    let (left, right) = line
        .split_once(TIME_RANGE_SEPARATOR)
        .unwrap_or((line, ""));

    let start = parse_cue_time(left.trim())?;
    // Cue settings ("align:start position:10%") may follow the end time
    let end_token = right.split_whitespace().next().unwrap_or("");
    let end = parse_cue_time(end_token)?;

    Ok((start, end))
}

fn is_sequence_number(line: &str) -> bool {
    !line.is_empty() && line.len() <= MAX_SEQUENCE_DIGITS && line.bytes().all(|b| b.is_ascii_digit())
}
