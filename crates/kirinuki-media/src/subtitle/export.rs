//! WebVTT and SRT writers.

use std::fmt::Write as _;

use kirinuki_models::{format_cue_time, format_srt_time, split_lines, Cue};

use super::parser::parse_cues;

/// Render cues as a WebVTT track.
pub fn write_vtt(cues: &[Cue]) -> String {
    let mut out = String::from("WEBVTT\n\n");
    for cue in cues {
        let _ = writeln!(
            out,
            "{} --> {}\n{}\n",
            format_cue_time(cue.start),
            format_cue_time(cue.end),
            plain_text(&cue.text)
        );
    }
    out
}

/// Render cues as an SRT track with 1-based sequence numbers.
pub fn write_srt(cues: &[Cue]) -> String {
    let mut out = String::new();
    for (i, cue) in cues.iter().enumerate() {
        let _ = writeln!(
            out,
            "{}\n{} --> {}\n{}\n",
            i + 1,
            format_srt_time(cue.start),
            format_srt_time(cue.end),
            plain_text(&cue.text)
        );
    }
    out
}

pub fn vtt_to_srt(vtt: &str) -> String {
    write_srt(&parse_cues(vtt))
}

pub fn srt_to_vtt(srt: &str) -> String {
    write_vtt(&parse_cues(srt))
}

/// Markup soft breaks become real newlines; blank lines would end the cue.
fn plain_text(text: &str) -> String {
    split_lines(text)
        .into_iter()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
