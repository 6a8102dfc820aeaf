//! ASS (v4.00+) markup writer.
//!
//! The document is built from explicit row types and rendered with
//! `Display`, so the same writer serves the caption track and the
//! scrolling-comment track.

use std::fmt::{self, Write as _};

use kirinuki_models::{format_markup_time, PackedColor};

use super::compose::{RenderEvent, RenderLayer};
use super::resolve::{ResolvedStyle, ResolvedStyleBook, REFERENCE_HEIGHT, REFERENCE_WIDTH};

/// Column header of the style table (23 columns).
pub const STYLE_FORMAT: &str = "Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding";

/// Column header of the event table.
pub const EVENT_FORMAT: &str = "Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text";

/// Border style: outline plus drop shadow.
pub const BORDER_OUTLINE: u8 = 1;
/// Border style: opaque box behind the text.
pub const BORDER_OPAQUE_BOX: u8 = 3;

/// `[Script Info]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptInfo {
    pub play_res_x: u32,
    pub play_res_y: u32,
    /// 2 disables automatic wrapping
    pub wrap_style: u8,
    pub collisions: &'static str,
}

impl ScriptInfo {
    /// Header for the 1920x1080 caption canvas.
    pub fn reference() -> Self {
        Self::with_resolution(REFERENCE_WIDTH as u32, REFERENCE_HEIGHT as u32)
    }

    pub fn with_resolution(play_res_x: u32, play_res_y: u32) -> Self {
        Self {
            play_res_x,
            play_res_y,
            wrap_style: 2,
            collisions: "Normal",
        }
    }
}

impl fmt::Display for ScriptInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[Script Info]")?;
        writeln!(f, "ScriptType: v4.00+")?;
        writeln!(f, "PlayResX: {}", self.play_res_x)?;
        writeln!(f, "PlayResY: {}", self.play_res_y)?;
        writeln!(f, "WrapStyle: {}", self.wrap_style)?;
        writeln!(f, "ScaledBorderAndShadow: yes")?;
        writeln!(f, "Collisions: {}", self.collisions)
    }
}

/// One row of the style table.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleRow {
    pub name: String,
    pub font_name: String,
    pub font_size: u32,
    pub primary: PackedColor,
    pub secondary: PackedColor,
    pub outline_color: PackedColor,
    pub back: PackedColor,
    pub bold: bool,
    pub border_style: u8,
    pub outline: u32,
    pub shadow: u32,
    /// Numpad alignment code
    pub alignment: u8,
    pub margin_l: i32,
    pub margin_r: i32,
    pub margin_v: i32,
}

impl fmt::Display for StyleRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bold = if self.bold { -1 } else { 0 };
        write!(
            f,
            "Style: {},{},{},{},{},{},{},{},0,0,0,100,100,0,0,{},{},{},{},{},{},{},1",
            self.name,
            self.font_name,
            self.font_size,
            self.primary,
            self.secondary,
            self.outline_color,
            self.back,
            bold,
            self.border_style,
            self.outline,
            self.shadow,
            self.alignment,
            self.margin_l,
            self.margin_r,
            self.margin_v,
        )
    }
}

/// One row of the event table.
#[derive(Debug, Clone, PartialEq)]
pub struct DialogueRow {
    pub layer: u8,
    pub start: f64,
    pub end: f64,
    pub style: String,
    /// Text including any override tags
    pub text: String,
}

impl DialogueRow {
    /// Dialogue anchored with `\pos`.
    pub fn positioned(event: &RenderEvent) -> Self {
        Self {
            layer: event.layer.index(),
            start: event.start,
            end: event.end,
            style: event.style_ref.clone(),
            text: format!("{{\\pos({},{})}}{}", event.x, event.y, escape_text(&event.text)),
        }
    }
}

impl fmt::Display for DialogueRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Dialogue: {},{},{},{},,0,0,0,,{}",
            self.layer,
            format_markup_time(self.start),
            format_markup_time(self.end),
            self.style,
            self.text
        )
    }
}

/// A complete markup document.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkupDocument {
    pub info: ScriptInfo,
    pub styles: Vec<StyleRow>,
    pub events: Vec<DialogueRow>,
}

impl MarkupDocument {
    pub fn new(info: ScriptInfo) -> Self {
        Self {
            info,
            styles: Vec::new(),
            events: Vec::new(),
        }
    }

    /// Render to text. Styles always precede events.
    pub fn render(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail
        let _ = write!(out, "{}", self);
        out
    }
}

impl fmt::Display for MarkupDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.info)?;
        writeln!(f)?;
        writeln!(f, "[V4+ Styles]")?;
        writeln!(f, "{}", STYLE_FORMAT)?;
        for style in &self.styles {
            writeln!(f, "{}", style)?;
        }
        writeln!(f)?;
        writeln!(f, "[Events]")?;
        writeln!(f, "{}", EVENT_FORMAT)?;
        for event in &self.events {
            writeln!(f, "{}", event)?;
        }
        Ok(())
    }
}

/// The four layer rows of one resolved style.
pub fn style_rows(style: &ResolvedStyle) -> [StyleRow; 4] {
    let row = |layer: RenderLayer| StyleRow {
        name: layer.style_ref(&style.name),
        font_name: style.font_name.clone(),
        font_size: style.font_size,
        primary: style.primary_color,
        secondary: PackedColor::BLACK,
        outline_color: style.outline_color,
        back: style.shadow_color,
        bold: style.bold,
        border_style: BORDER_OUTLINE,
        outline: 0,
        shadow: 0,
        alignment: style.alignment.numpad(),
        margin_l: style.margin_l,
        margin_r: style.margin_r,
        margin_v: style.margin_v,
    };

    [
        StyleRow {
            outline_color: style.back_color,
            back: style.back_color,
            border_style: BORDER_OPAQUE_BOX,
            outline: style.padding,
            ..row(RenderLayer::Box)
        },
        StyleRow {
            primary: style.outer_outline_color,
            outline_color: style.outer_outline_color,
            outline: style.outer_border(),
            shadow: style.outer_shadow(),
            ..row(RenderLayer::OuterOutline)
        },
        StyleRow {
            outline: style.outline_width,
            shadow: style.inner_shadow(),
            ..row(RenderLayer::InnerOutline)
        },
        StyleRow {
            outline_color: PackedColor::BLACK,
            back: PackedColor::BLACK,
            ..row(RenderLayer::Text)
        },
    ]
}

/// Render the caption markup for composed events.
///
/// Style rows are written for every style in the book (Default first, then
/// named styles by name) so output is stable for identical input.
pub fn write_markup(styles: &ResolvedStyleBook, events: &[RenderEvent]) -> String {
    let mut document = MarkupDocument::new(ScriptInfo::reference());
    for style in styles.iter() {
        document.styles.extend(style_rows(style));
    }
    document.events.extend(events.iter().map(DialogueRow::positioned));
    document.render()
}

/// Keep dialogue text on one line and free of accidental override blocks.
pub fn escape_text(text: &str) -> String {
    text.replace('\r', "")
        .replace('\n', " ")
        .replace('{', "｛")
        .replace('}', "｝")
}
