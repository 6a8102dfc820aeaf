//! Scrolling comment (danmaku) layout.
//!
//! Comments travel right to left in horizontal lanes. Lanes are picked in
//! shuffled order; when every lane is still occupied the comment goes to the
//! lane that frees up first, so no comment is ever dropped. Inline emoji with
//! a local image are drawn by the encoder as separate overlays that follow
//! the text.

use std::sync::LazyLock;

use kirinuki_models::{CommentEvent, OverlayDescriptor, PackedColor};
use rand::seq::SliceRandom;
use rand::Rng;
use regex::Regex;
use tracing::debug;

use super::markup::{escape_text, DialogueRow, MarkupDocument, ScriptInfo, StyleRow, BORDER_OUTLINE};
use crate::emoji::EmojiResolver;

/// Style name used by every scrolling comment.
pub const DANMAKU_STYLE_NAME: &str = "Danmaku";

/// Lane height relative to the font size.
pub const LANE_HEIGHT_FACTOR: f64 = 1.2;

/// Text standing in for an emoji drawn as an image overlay.
pub const EMOJI_PLACEHOLDER: &str = "\u{3000}";

static EMOJI_SHORTCUT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r":[^:\s]+:").unwrap());

/// Layout parameters for scrolling comments.
#[derive(Debug, Clone, PartialEq)]
pub struct DanmakuConfig {
    pub font_name: String,
    pub font_size: u32,
    /// Slowest scroll speed in pixels per second
    pub min_speed: f64,
    /// Fastest scroll speed in pixels per second
    pub max_speed: f64,
    /// Fraction of the height kept free at the top
    pub top_margin_ratio: f64,
    /// Fraction of the height kept free at the bottom (captions live there)
    pub bottom_margin_ratio: f64,
    /// Estimated glyph width relative to the font size
    pub width_factor: f64,
    /// Off-screen distance added on both sides, in pixels
    pub buffer: f64,
    /// Fraction of a comment's transit after which its lane is reusable
    pub occupancy: f64,
    pub text_color: PackedColor,
    pub outline_color: PackedColor,
    pub outline_width: u32,
}

impl Default for DanmakuConfig {
    fn default() -> Self {
        Self {
            font_name: "Noto Sans CJK JP".to_string(),
            font_size: 48,
            min_speed: 200.0,
            max_speed: 300.0,
            top_margin_ratio: 0.05,
            bottom_margin_ratio: 0.25,
            width_factor: 2.0,
            buffer: 50.0,
            occupancy: 0.3,
            text_color: PackedColor::from_rgba(255, 255, 255, 255),
            outline_color: PackedColor::BLACK,
            outline_width: 2,
        }
    }
}

impl DanmakuConfig {
    pub fn with_font_size(mut self, font_size: u32) -> Self {
        self.font_size = font_size;
        self
    }

    pub fn with_speed(mut self, min_speed: f64, max_speed: f64) -> Self {
        self.min_speed = min_speed;
        self.max_speed = max_speed;
        self
    }

    pub fn with_margins(mut self, top_ratio: f64, bottom_ratio: f64) -> Self {
        self.top_margin_ratio = top_ratio;
        self.bottom_margin_ratio = bottom_ratio;
        self
    }

    pub fn with_occupancy(mut self, occupancy: f64) -> Self {
        self.occupancy = occupancy;
        self
    }

    pub fn lane_height(&self) -> f64 {
        self.font_size as f64 * LANE_HEIGHT_FACTOR
    }

    /// Number of lanes that fit between the reserved margins, at least one.
    pub fn lane_count(&self, height: u32) -> usize {
        let usable = height as f64 * (1.0 - self.top_margin_ratio - self.bottom_margin_ratio);
        let lanes = (usable / self.lane_height()).floor();
        if lanes.is_finite() && lanes >= 1.0 {
            lanes as usize
        } else {
            1
        }
    }

    /// Top edge of a lane in video pixels.
    pub fn lane_top(&self, lane: usize, height: u32) -> i64 {
        (height as f64 * self.top_margin_ratio + lane as f64 * self.lane_height()).round() as i64
    }

    /// Generous width estimate for text of `chars` characters.
    pub fn estimate_width(&self, chars: usize) -> f64 {
        chars as f64 * self.font_size as f64 * self.width_factor
    }

    fn pick_speed<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        if self.max_speed > self.min_speed {
            rng.random_range(self.min_speed..=self.max_speed)
        } else {
            self.min_speed
        }
    }
}

/// Lane picked for one comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaneChoice {
    pub index: usize,
    /// Every lane was busy and the earliest-free lane was reused
    pub fallback: bool,
}

/// Tracks when each lane becomes free during one scheduling pass.
#[derive(Debug, Clone)]
pub struct LaneScheduler {
    available_after: Vec<f64>,
    occupancy: f64,
}

impl LaneScheduler {
    pub fn new(lane_count: usize, occupancy: f64) -> Self {
        Self {
            available_after: vec![0.0; lane_count.max(1)],
            occupancy,
        }
    }

    pub fn lane_count(&self) -> usize {
        self.available_after.len()
    }

    pub fn available_after(&self, lane: usize) -> Option<f64> {
        self.available_after.get(lane).copied()
    }

    /// Assign a lane to a comment starting at `start` that scrolls for
    /// `duration` seconds.
    pub fn assign<R: Rng + ?Sized>(&mut self, start: f64, duration: f64, rng: &mut R) -> LaneChoice {
        let mut order: Vec<usize> = (0..self.available_after.len()).collect();
        order.shuffle(rng);

        let choice = match order.iter().copied().find(|&i| self.available_after[i] <= start) {
            Some(index) => LaneChoice { index, fallback: false },
            None => {
                // Ties resolve to the lowest index
                let index = (0..self.available_after.len())
                    .min_by(|&a, &b| self.available_after[a].total_cmp(&self.available_after[b]))
                    .unwrap_or(0);
                LaneChoice { index, fallback: true }
            }
        };

        self.available_after[choice.index] = start + duration * self.occupancy;
        choice
    }
}

/// Assign lanes to `(start, duration)` slots given in start order.
pub fn schedule_lanes<R: Rng + ?Sized>(
    slots: &[(f64, f64)],
    lane_count: usize,
    occupancy: f64,
    rng: &mut R,
) -> Vec<LaneChoice> {
    let mut scheduler = LaneScheduler::new(lane_count, occupancy);
    slots
        .iter()
        .map(|&(start, duration)| scheduler.assign(start, duration, rng))
        .collect()
}

/// Comment text after emoji substitution.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayText {
    pub text: String,
    /// Image and character offset of every substituted emoji
    pub emoji: Vec<(std::path::PathBuf, usize)>,
}

/// Replace resolvable emoji shortcuts with a placeholder.
///
/// Shortcuts without a local image stay in the text unchanged.
pub fn substitute_emoji(text: &str, resolver: &dyn EmojiResolver) -> DisplayText {
    let mut out = String::with_capacity(text.len());
    let mut emoji = Vec::new();
    let mut last = 0;

    for found in EMOJI_SHORTCUT.find_iter(text) {
        out.push_str(&text[last..found.start()]);
        match resolver.resolve(found.as_str()) {
            Some(path) => {
                emoji.push((path, out.chars().count()));
                out.push_str(EMOJI_PLACEHOLDER);
            }
            None => out.push_str(found.as_str()),
        }
        last = found.end();
    }
    out.push_str(&text[last..]);

    DisplayText { text: out, emoji }
}

/// One comment placed on screen.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledComment {
    pub start: f64,
    pub end: f64,
    pub lane: LaneChoice,
    /// Top edge in video pixels
    pub y: i64,
    pub start_x: f64,
    pub end_x: f64,
    pub text: String,
}

impl ScheduledComment {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Encoder expression for the x position of an image riding at
    /// `char_offset` characters into the text.
    pub fn x_expr(&self, char_offset: usize, font_size: u32) -> String {
        format!(
            "{sx:.1}-(t-{start:.3})/{dur:.3}*({sx:.1}-({ex:.1}))+{off}",
            sx = self.start_x,
            start = self.start,
            dur = self.duration(),
            ex = self.end_x,
            off = char_offset as u64 * font_size as u64,
        )
    }
}

/// Result of one scheduling pass.
#[derive(Debug, Clone, Default)]
pub struct DanmakuTrack {
    pub comments: Vec<ScheduledComment>,
    pub overlays: Vec<OverlayDescriptor>,
    pub lane_count: usize,
}

impl DanmakuTrack {
    /// Number of comments that had to share a busy lane.
    pub fn fallback_count(&self) -> usize {
        self.comments.iter().filter(|c| c.lane.fallback).count()
    }
}

/// Lay out comments on a `width` x `height` video.
pub fn schedule_danmaku<R: Rng + ?Sized>(
    comments: &[CommentEvent],
    width: u32,
    height: u32,
    config: &DanmakuConfig,
    resolver: &dyn EmojiResolver,
    rng: &mut R,
) -> DanmakuTrack {
    let mut sorted: Vec<&CommentEvent> = comments.iter().collect();
    sorted.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));

    let lane_count = config.lane_count(height);
    let mut lanes = LaneScheduler::new(lane_count, config.occupancy);
    let mut track = DanmakuTrack {
        lane_count,
        ..Default::default()
    };

    for comment in sorted {
        let display = substitute_emoji(&comment.text, resolver);
        let text_width = config.estimate_width(display.text.chars().count());
        let start_x = width as f64 + config.buffer;
        let end_x = -(text_width + config.buffer);
        let duration = (start_x - end_x) / config.pick_speed(rng);

        let start = comment.timestamp;
        let lane = lanes.assign(start, duration, rng);
        let scheduled = ScheduledComment {
            start,
            end: start + duration,
            lane,
            y: config.lane_top(lane.index, height),
            start_x,
            end_x,
            text: display.text,
        };

        for (image_path, offset) in display.emoji {
            track.overlays.push(OverlayDescriptor {
                image_path,
                start: scheduled.start,
                end: scheduled.end,
                x_expr: scheduled.x_expr(offset, config.font_size),
                y: scheduled.y,
                size: config.font_size,
            });
        }
        track.comments.push(scheduled);
    }

    debug!(
        comments = track.comments.len(),
        overlays = track.overlays.len(),
        lanes = lane_count,
        fallbacks = track.fallback_count(),
        "Scheduled scrolling comments"
    );
    track
}

/// Lay out comments with the thread-local random generator.
pub fn generate_danmaku(
    comments: &[CommentEvent],
    width: u32,
    height: u32,
    config: &DanmakuConfig,
    resolver: &dyn EmojiResolver,
) -> DanmakuTrack {
    schedule_danmaku(comments, width, height, config, resolver, &mut rand::rng())
}

/// Render a scheduled track as markup in video pixel space.
pub fn write_danmaku_markup(track: &DanmakuTrack, width: u32, height: u32, config: &DanmakuConfig) -> String {
    let mut document = MarkupDocument::new(ScriptInfo::with_resolution(width, height));
    document.styles.push(StyleRow {
        name: DANMAKU_STYLE_NAME.to_string(),
        font_name: config.font_name.clone(),
        font_size: config.font_size,
        primary: config.text_color,
        secondary: PackedColor::BLACK,
        outline_color: config.outline_color,
        back: PackedColor::BLACK,
        bold: false,
        border_style: BORDER_OUTLINE,
        outline: config.outline_width,
        shadow: 0,
        alignment: 7,
        margin_l: 0,
        margin_r: 0,
        margin_v: 0,
    });

    document.events.extend(track.comments.iter().map(|c| DialogueRow {
        layer: 0,
        start: c.start,
        end: c.end,
        style: DANMAKU_STYLE_NAME.to_string(),
        text: format!(
            "{{\\move({},{},{},{})}}{}",
            c.start_x.round() as i64,
            c.y,
            c.end_x.round() as i64,
            c.y,
            escape_text(&c.text)
        ),
    }));
    document.render()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::path::PathBuf;

    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::emoji::NoEmoji;

    fn kusa_resolver() -> HashMap<String, PathBuf> {
        HashMap::from([(":_kusa:".to_string(), PathBuf::from("/emoji/kusa.png"))])
    }

    #[test]
    fn test_lane_count() {
        let config = DanmakuConfig::default();
        // 1080 * 0.7 = 756 usable, 57.6 per lane
        assert_eq!(config.lane_count(1080), 13);
        assert_eq!(config.with_font_size(2000).lane_count(1080), 1);
    }

    #[test]
    fn test_free_lane_is_preferred() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut scheduler = LaneScheduler::new(2, 1.0);
        let first = scheduler.assign(0.0, 10.0, &mut rng);
        let second = scheduler.assign(1.0, 10.0, &mut rng);
        assert!(!first.fallback);
        assert!(!second.fallback);
        assert_ne!(first.index, second.index);
    }

    #[test]
    fn test_fallback_picks_earliest_free_lane() {
        let mut rng = StdRng::seed_from_u64(1);
        let choices = schedule_lanes(&[(0.0, 10.0), (1.0, 4.0), (2.0, 10.0)], 2, 1.0, &mut rng);
        assert!(!choices[0].fallback);
        assert!(!choices[1].fallback);
        // Lanes free at 10.0 and 5.0; the second comment's lane wins
        assert!(choices[2].fallback);
        assert_eq!(choices[2].index, choices[1].index);
    }

    #[test]
    fn test_lane_is_free_or_fallback_is_minimal() {
        let mut rng = StdRng::seed_from_u64(42);
        let slots: Vec<(f64, f64)> = (0..200).map(|i| (i as f64 * 0.25, 8.0 + (i % 5) as f64)).collect();
        let mut shadow = vec![0.0f64; 4];

        for (choice, &(start, duration)) in schedule_lanes(&slots, 4, 0.3, &mut rng).iter().zip(&slots) {
            if choice.fallback {
                assert!(shadow.iter().all(|&after| after > start));
                let min = shadow.iter().cloned().fold(f64::INFINITY, f64::min);
                assert_eq!(shadow[choice.index], min);
            } else {
                assert!(shadow[choice.index] <= start);
            }
            shadow[choice.index] = start + duration * 0.3;
        }
    }

    #[test]
    fn test_staggered_comments_never_share_active_lane() {
        // 12 comments 2 s apart, 10 s each, 5 lanes
        let slots: Vec<(f64, f64)> = (0..12).map(|i| (i as f64 * 2.0, 10.0)).collect();
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let choices = schedule_lanes(&slots, 5, 1.0, &mut rng);
            assert!(choices.iter().all(|c| !c.fallback));
            for i in 0..slots.len() {
                for j in (i + 1)..slots.len() {
                    let overlap = slots[j].0 < slots[i].0 + slots[i].1;
                    if overlap {
                        assert_ne!(choices[i].index, choices[j].index, "seed {seed}: {i} and {j}");
                    }
                }
            }
        }
    }

    #[test]
    fn test_substitute_emoji() {
        let display = substitute_emoji("wow:_kusa:and:_other:", &kusa_resolver());
        assert_eq!(display.text, "wow\u{3000}and:_other:");
        assert_eq!(display.emoji, vec![(PathBuf::from("/emoji/kusa.png"), 3)]);
    }

    #[test]
    fn test_unresolved_shortcut_kept() {
        let display = substitute_emoji("time: 12:30 :_kusa:", &NoEmoji);
        assert_eq!(display.text, "time: 12:30 :_kusa:");
        assert!(display.emoji.is_empty());
    }

    #[test]
    fn test_schedule_produces_riding_overlay() {
        let config = DanmakuConfig::default().with_speed(250.0, 250.0);
        let comments = vec![CommentEvent::new("ab:_kusa:", 4.0)];
        let mut rng = StdRng::seed_from_u64(3);
        let track = schedule_danmaku(&comments, 1280, 720, &config, &kusa_resolver(), &mut rng);

        assert_eq!(track.comments.len(), 1);
        let comment = &track.comments[0];
        // 3 chars * 48 * 2.0 = 288 px wide; 1330 + 338 = 1668 px at 250 px/s
        assert_eq!(comment.start_x, 1330.0);
        assert_eq!(comment.end_x, -338.0);
        assert!((comment.duration() - 6.672).abs() < 1e-9);

        assert_eq!(track.overlays.len(), 1);
        let overlay = &track.overlays[0];
        assert_eq!(overlay.x_expr, "1330.0-(t-4.000)/6.672*(1330.0-(-338.0))+96");
        assert_eq!(overlay.y, comment.y);
        assert_eq!(overlay.size, 48);
        assert_eq!(overlay.start, 4.0);
    }

    #[test]
    fn test_schedule_sorts_by_timestamp() {
        let comments = vec![CommentEvent::new("late", 9.0), CommentEvent::new("early", 1.0)];
        let mut rng = StdRng::seed_from_u64(0);
        let track = schedule_danmaku(&comments, 1920, 1080, &DanmakuConfig::default(), &NoEmoji, &mut rng);
        assert_eq!(track.comments[0].text, "early");
        assert_eq!(track.comments[1].text, "late");
        // 5 chars * 96 = 480 px wide, 2500 px of travel
        let (min, max) = (1.0 + 2500.0 / 300.0, 1.0 + 2500.0 / 200.0);
        assert!(track.comments[0].end >= min - 1e-9 && track.comments[0].end <= max + 1e-9);
    }

    #[test]
    fn test_danmaku_markup() {
        let config = DanmakuConfig::default().with_speed(200.0, 200.0);
        let mut rng = StdRng::seed_from_u64(5);
        let track = schedule_danmaku(&[CommentEvent::new("hi", 0.0)], 1920, 1080, &config, &NoEmoji, &mut rng);
        let markup = write_danmaku_markup(&track, 1920, 1080, &config);

        assert!(markup.contains("PlayResX: 1920\nPlayResY: 1080"));
        assert!(markup.contains("Style: Danmaku,Noto Sans CJK JP,48,&H00FFFFFF,"));
        let y = track.comments[0].y;
        assert!(markup.contains(&format!("Dialogue: 0,0:00:00.00,0:00:11.06,Danmaku,,0,0,0,,{{\\move(1970,{y},-242,{y})}}hi")));
    }
}
