//! Layer composition: cues + styles to positioned, layered render events.
//!
//! Overlapping cues are never handed to the renderer as overlapping
//! dialogue lines. Instead the timeline is cut at every cue boundary, the
//! cues active in each slice are grouped by screen anchor, and each group
//! is stacked line by line with an explicit `\pos`. Every stacked line is
//! then painted as up to four layers: box, outer outline, inner outline,
//! glyph fill.

use std::path::PathBuf;

use kirinuki_models::{split_lines, Alignment, Cue, HorizontalAnchor, OverlayDescriptor, StyleAssignment};
use tracing::debug;

use super::resolve::{ResolvedStyle, ResolvedStyleBook, REFERENCE_HEIGHT, REFERENCE_WIDTH};

/// Slices shorter than this are boundary jitter and are dropped.
pub const MIN_INTERVAL_SECS: f64 = 0.01;
/// Line height as a multiple of the font size.
pub const LINE_HEIGHT_FACTOR: f64 = 1.1;
/// Extra space between stacked lines, in reference pixels.
pub const LINE_GAP: f64 = 3.0;

/// Paint pass of a render event. Lower layers paint first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RenderLayer {
    Box = 0,
    OuterOutline = 1,
    InnerOutline = 2,
    Text = 3,
}

impl RenderLayer {
    pub const ALL: [RenderLayer; 4] = [
        RenderLayer::Box,
        RenderLayer::OuterOutline,
        RenderLayer::InnerOutline,
        RenderLayer::Text,
    ];

    pub fn index(&self) -> u8 {
        *self as u8
    }

    /// Suffix of the markup style painting this layer.
    pub fn style_suffix(&self) -> &'static str {
        match self {
            RenderLayer::Box => "_Box",
            RenderLayer::OuterOutline => "_Outer",
            RenderLayer::InnerOutline => "_Inner",
            RenderLayer::Text => "_Text",
        }
    }

    /// Markup style name for a resolved style's layer.
    pub fn style_ref(&self, style_name: &str) -> String {
        format!("{}{}", style_name, self.style_suffix())
    }
}

/// One paintable line pass with an absolute anchor point.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderEvent {
    pub start: f64,
    pub end: f64,
    pub layer: RenderLayer,
    /// Markup style row this event uses
    pub style_ref: String,
    /// Anchor in reference pixels
    pub x: i32,
    pub y: i32,
    pub text: String,
}

/// A cue with its style resolved.
#[derive(Debug, Clone)]
pub struct ExpandedEvent<'a> {
    pub start: f64,
    pub end: f64,
    pub text: String,
    pub style: &'a ResolvedStyle,
}

impl ExpandedEvent<'_> {
    pub fn alignment(&self) -> Alignment {
        self.style.alignment
    }

    pub fn has_outer(&self) -> bool {
        self.style.has_outer_outline
    }

    /// Text prefix for the first line. An image prefix suppresses it.
    pub fn prefix(&self) -> Option<&str> {
        if self.style.prefix_image.is_some() {
            None
        } else {
            self.style.prefix_text.as_deref()
        }
    }

    pub fn font_size(&self) -> u32 {
        self.style.font_size
    }

    pub fn base_margin_v(&self) -> i32 {
        self.style.margin_v
    }
}

/// A slice of the timeline with a constant set of active events.
#[derive(Debug, Clone, PartialEq)]
pub struct Interval {
    pub start: f64,
    pub end: f64,
    /// Indices of active spans, in input order
    pub active: Vec<usize>,
}

/// Cut `[start, end)` spans at every boundary.
///
/// Returns the non-empty slices at least [`MIN_INTERVAL_SECS`] long; the
/// active set of each slice is sampled at its midpoint.
pub fn flatten_intervals(spans: &[(f64, f64)]) -> Vec<Interval> {
    let mut boundaries: Vec<f64> = spans
        .iter()
        .flat_map(|&(start, end)| [start, end])
        .filter(|t| t.is_finite())
        .collect();
    boundaries.sort_by(f64::total_cmp);
    boundaries.dedup();

    boundaries
        .windows(2)
        .filter(|pair| pair[1] - pair[0] >= MIN_INTERVAL_SECS)
        .filter_map(|pair| {
            let (t0, t1) = (pair[0], pair[1]);
            let mid = (t0 + t1) / 2.0;
            let active: Vec<usize> = spans
                .iter()
                .enumerate()
                .filter(|&(_, &(start, end))| start <= mid && mid < end)
                .map(|(i, _)| i)
                .collect();
            (!active.is_empty()).then_some(Interval {
                start: t0,
                end: t1,
                active,
            })
        })
        .collect()
}

/// Resolve each cue's style through the assignment.
pub fn expand_cues<'a>(
    cues: &[Cue],
    assignment: &StyleAssignment,
    styles: &'a ResolvedStyleBook,
) -> Vec<ExpandedEvent<'a>> {
    cues.iter()
        .enumerate()
        .map(|(index, cue)| ExpandedEvent {
            start: cue.start,
            end: cue.end,
            text: cue.text.clone(),
            style: styles.get(assignment.style_for(index)),
        })
        .collect()
}

/// A line after stacking, before layer emission.
#[derive(Debug, Clone)]
pub struct StackedLine<'a> {
    pub text: String,
    pub style: &'a ResolvedStyle,
    pub x: i32,
    pub y: i32,
    /// Set on the first line of an event that has a prefix image
    pub carries_prefix_image: bool,
}

/// Stack every line of a same-alignment group.
///
/// Lines keep encounter order top to bottom. Bottom anchors grow upward
/// from the first event's margin, so the last line sits on the margin;
/// top anchors grow downward.
pub fn stack_group<'a>(events: &[&ExpandedEvent<'a>]) -> Vec<StackedLine<'a>> {
    let Some(first) = events.first() else {
        return Vec::new();
    };
    let alignment = first.alignment();
    let base = first.base_margin_v() as f64;

    let mut lines: Vec<(String, &'a ResolvedStyle, bool)> = Vec::new();
    for event in events {
        for (i, line) in split_lines(&event.text).into_iter().enumerate() {
            let text = match (i, event.prefix()) {
                (0, Some(prefix)) => format!("{}{}", prefix, line),
                _ => line.to_string(),
            };
            let carries_image = i == 0 && event.style.prefix_image.is_some();
            lines.push((text, event.style, carries_image));
        }
    }

    let heights: Vec<f64> = lines
        .iter()
        .map(|(_, style, _)| style.line_height() + LINE_GAP)
        .collect();

    lines
        .into_iter()
        .enumerate()
        .map(|(k, (text, style, carries_prefix_image))| {
            let y = if alignment.is_top() {
                base + heights[..k].iter().sum::<f64>()
            } else {
                REFERENCE_HEIGHT - (base + heights[k + 1..].iter().sum::<f64>())
            };
            StackedLine {
                text,
                style,
                x: anchor_x(style),
                y: y.round() as i32,
                carries_prefix_image,
            }
        })
        .collect()
}

/// Horizontal anchor point for a style.
pub fn anchor_x(style: &ResolvedStyle) -> i32 {
    match style.alignment.horizontal() {
        HorizontalAnchor::Left => style.margin_l,
        HorizontalAnchor::Right => REFERENCE_WIDTH as i32 - style.margin_r,
        HorizontalAnchor::Center => (REFERENCE_WIDTH / 2.0) as i32,
    }
}

/// The layers painted for one line, in paint order.
pub fn line_layers(style: &ResolvedStyle) -> impl Iterator<Item = RenderLayer> + '_ {
    RenderLayer::ALL.into_iter().filter(move |layer| match layer {
        RenderLayer::Box => style.has_box(),
        RenderLayer::OuterOutline => style.has_outer_outline,
        RenderLayer::InnerOutline | RenderLayer::Text => true,
    })
}

/// Where a prefix image goes, in reference space.
#[derive(Debug, Clone, PartialEq)]
pub struct PrefixImagePlacement {
    pub image: String,
    pub start: f64,
    pub end: f64,
    /// Left edge in reference units
    pub x: f64,
    /// Vertical center of the line in reference pixels
    pub y_center: f64,
    /// Square size in reference pixels (vertical scale)
    pub size: f64,
}

impl PrefixImagePlacement {
    fn from_line(line: &StackedLine<'_>, start: f64, end: f64) -> Option<Self> {
        if !line.carries_prefix_image {
            return None;
        }
        let style = line.style;
        let image = style.prefix_image.clone()?;

        // Text width is a font-size heuristic; glyph metrics are unknown here
        let text_width = line.text.chars().count() as f64 * style.font_size as f64;
        let text_left = match style.alignment.horizontal() {
            HorizontalAnchor::Left => line.x as f64,
            HorizontalAnchor::Center => line.x as f64 - text_width / 2.0,
            HorizontalAnchor::Right => line.x as f64 - text_width,
        };

        let half_line = style.line_height() / 2.0;
        let y_center = if style.alignment.is_top() {
            line.y as f64 + half_line
        } else {
            line.y as f64 - half_line
        };

        Some(Self {
            image,
            start,
            end,
            x: text_left - style.prefix_image_reserve,
            y_center,
            size: style.prefix_image_size,
        })
    }

    /// Convert to an overlay in video pixels.
    pub fn to_overlay(&self, image_path: PathBuf, video_width: u32, video_height: u32) -> OverlayDescriptor {
        let sx = video_width as f64 / REFERENCE_WIDTH;
        let sy = video_height as f64 / REFERENCE_HEIGHT;
        let size = (self.size * sy).round().max(1.0);
        OverlayDescriptor {
            image_path,
            start: self.start,
            end: self.end,
            x_expr: ((self.x * sx).round() as i64).to_string(),
            y: (self.y_center * sy - size / 2.0).round() as i64,
            size: size as u32,
        }
    }

    fn same_spot(&self, other: &Self) -> bool {
        self.image == other.image
            && (self.x - other.x).abs() < 0.5
            && (self.y_center - other.y_center).abs() < 0.5
            && (self.size - other.size).abs() < 0.5
    }
}

/// Output of [`compose`].
#[derive(Debug, Clone, Default)]
pub struct Composition {
    pub events: Vec<RenderEvent>,
    pub prefix_images: Vec<PrefixImagePlacement>,
    /// Number of flattened time slices that produced events
    pub interval_count: usize,
}

impl Composition {
    /// Events of a single paint layer, in emission order.
    pub fn layer(&self, layer: RenderLayer) -> impl Iterator<Item = &RenderEvent> {
        self.events.iter().filter(move |e| e.layer == layer)
    }
}

/// Compose cues into layered render events.
pub fn compose(cues: &[Cue], assignment: &StyleAssignment, styles: &ResolvedStyleBook) -> Composition {
    let expanded = expand_cues(cues, assignment, styles);
    let spans: Vec<(f64, f64)> = expanded.iter().map(|e| (e.start, e.end)).collect();
    let intervals = flatten_intervals(&spans);

    let mut composition = Composition {
        interval_count: intervals.len(),
        ..Default::default()
    };

    for interval in &intervals {
        for alignment in Alignment::ALL {
            let group: Vec<&ExpandedEvent<'_>> = interval
                .active
                .iter()
                .map(|&i| &expanded[i])
                .filter(|e| e.alignment() == *alignment)
                .collect();
            if group.is_empty() {
                continue;
            }

            for line in stack_group(&group) {
                for layer in line_layers(line.style) {
                    composition.events.push(RenderEvent {
                        start: interval.start,
                        end: interval.end,
                        layer,
                        style_ref: layer.style_ref(&line.style.name),
                        x: line.x,
                        y: line.y,
                        text: line.text.clone(),
                    });
                }

                if let Some(placement) = PrefixImagePlacement::from_line(&line, interval.start, interval.end) {
                    push_placement(&mut composition.prefix_images, placement);
                }
            }
        }
    }

    debug!(
        cues = cues.len(),
        intervals = composition.interval_count,
        events = composition.events.len(),
        prefix_images = composition.prefix_images.len(),
        "Composed subtitle layers"
    );

    composition
}

/// Extend a placement that ends where this one starts instead of adding a new one.
fn push_placement(placements: &mut Vec<PrefixImagePlacement>, placement: PrefixImagePlacement) {
    let continued = placements
        .iter_mut()
        .find(|p| p.same_spot(&placement) && (p.end - placement.start).abs() < 1e-6);
    match continued {
        Some(existing) => existing.end = placement.end,
        None => placements.push(placement),
    }
}
