//! FCPXML 1.9 title export for editors (DaVinci Resolve, Final Cut).
//!
//! Every cue becomes a Basic Title clip connected to a gap that spans the
//! whole program. Times are rational frame counts (`value/base s`).

use std::fmt::Write as _;

use kirinuki_models::Cue;

const BASIC_TITLE_UID: &str =
    ".../Titles.localized/Bumper:Opener.localized/Basic Title.localized/Basic Title.moti";

/// Longest title name before truncation.
const MAX_TITLE_NAME_CHARS: usize = 30;

/// Export settings.
#[derive(Debug, Clone, PartialEq)]
pub struct FcpxmlOptions {
    pub fps: f64,
    /// Program duration in seconds
    pub duration: f64,
    pub project_name: String,
}

impl Default for FcpxmlOptions {
    fn default() -> Self {
        Self {
            fps: 30.0,
            duration: 0.0,
            project_name: "Subtitles".to_string(),
        }
    }
}

/// Frame timing for a frame rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameTiming {
    /// Time base (denominator)
    pub base: u64,
    /// Base units per frame
    pub scale: u64,
}

impl FrameTiming {
    pub fn for_fps(fps: f64) -> Self {
        let near = |target: f64| (fps - target).abs() < 0.01;
        if near(29.97) {
            Self { base: 30000, scale: 1001 }
        } else if near(23.976) {
            Self { base: 24000, scale: 1001 }
        } else if near(59.94) {
            Self { base: 60000, scale: 1001 }
        } else {
            Self {
                base: (fps as u64).max(1),
                scale: 1,
            }
        }
    }

    pub fn frame_duration(&self) -> String {
        format!("{}/{}s", self.scale, self.base)
    }

    /// Seconds as a rational time, truncated to whole frames.
    pub fn rational(&self, seconds: f64) -> String {
        let frames = (seconds.max(0.0) * self.base as f64 / self.scale as f64) as u64;
        format!("{}/{}s", frames * self.scale, self.base)
    }
}

/// Render cues as an FCPXML 1.9 document.
pub fn write_fcpxml(cues: &[Cue], options: &FcpxmlOptions) -> String {
    let timing = FrameTiming::for_fps(options.fps);
    let total = timing.rational(options.duration);
    let project = escape_xml(&options.project_name);

    let mut sorted: Vec<&Cue> = cues.iter().collect();
    sorted.sort_by(|a, b| a.start.total_cmp(&b.start));

    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<!DOCTYPE fcpxml>\n");
    out.push_str("<fcpxml version=\"1.9\">\n  <resources>\n");
    let _ = writeln!(
        out,
        "    <format id=\"r1\" name=\"FFVideoFormat1080p{}\" frameDuration=\"{}\" width=\"1920\" height=\"1080\" colorSpace=\"1-1-1 (Rec. 709)\"/>",
        options.fps as u64,
        timing.frame_duration()
    );
    let _ = writeln!(
        out,
        "    <effect id=\"r2\" name=\"Basic Title\" uid=\"{}\"/>",
        BASIC_TITLE_UID
    );
    out.push_str("  </resources>\n  <library>\n");
    let _ = writeln!(out, "    <event name=\"{project}\">");
    let _ = writeln!(out, "      <project name=\"{project}\">");
    let _ = writeln!(
        out,
        "        <sequence format=\"r1\" duration=\"{total}\" tcStart=\"0s\" tcFormat=\"NDF\" audioLayout=\"stereo\" audioRate=\"48k\">"
    );
    out.push_str("          <spine>\n");
    let _ = writeln!(
        out,
        "            <gap name=\"Gap\" offset=\"0s\" start=\"0s\" duration=\"{total}\">"
    );

    for (i, cue) in sorted.iter().enumerate() {
        write_title(&mut out, i + 1, cue, &timing);
    }

    out.push_str("            </gap>\n          </spine>\n        </sequence>\n");
    out.push_str("      </project>\n    </event>\n  </library>\n</fcpxml>\n");
    out
}

fn write_title(out: &mut String, id: usize, cue: &Cue, timing: &FrameTiming) {
    let start = timing.rational(cue.start);
    let duration = timing.rational(cue.duration());
    let text = escape_xml(&cue.text);

    let _ = writeln!(
        out,
        "              <title ref=\"r2\" lane=\"1\" name=\"{}\" offset=\"{start}\" start=\"{start}\" duration=\"{duration}\">",
        escape_xml(&title_name(&cue.text))
    );
    out.push_str("                <param name=\"Flatten\" key=\"9999/999166631/999166633/2/351\" value=\"1\"/>\n");
    out.push_str("                <param name=\"Alignment\" key=\"9999/999166631/999166633/2/354/3142713059/401\" value=\"1 (Center)\"/>\n");
    out.push_str("                <param name=\"Alignment\" key=\"9999/999166631/999166633/2/354/999169573/401\" value=\"1 (Center)\"/>\n");
    let _ = writeln!(
        out,
        "                <text>\n                  <text-style ref=\"ts{id}\">{text}</text-style>\n                </text>"
    );
    let _ = writeln!(out, "                <text-style-def id=\"ts{id}\">");
    out.push_str("                  <text-style font=\"Helvetica\" fontSize=\"60\" fontColor=\"1 1 1 1\" alignment=\"center\" fontFace=\"Regular\"/>\n");
    out.push_str("                </text-style-def>\n              </title>\n");
}

fn title_name(text: &str) -> String {
    if text.chars().count() > MAX_TITLE_NAME_CHARS {
        let head: String = text.chars().take(MAX_TITLE_NAME_CHARS).collect();
        format!("{head}... - Basic Title")
    } else {
        format!("{text} - Basic Title")
    }
}

pub fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
