//! Style resolution: preview-space style settings to renderer units.
//!
//! Everything here works in the 1920x1080 reference canvas the markup
//! declares as its play resolution. The editor preview renders text at
//! two thirds of the size the renderer does, hence the fixed 1.5 factor.

use std::collections::{BTreeMap, HashSet};

use kirinuki_models::{
    hex_to_packed_color, Alignment, HorizontalAnchor, ModelResult, PackedColor, StyleBook, StyleSpec,
    DEFAULT_STYLE_NAME,
};
use tracing::warn;

use super::compose::LINE_HEIGHT_FACTOR;

/// Reference canvas width.
pub const REFERENCE_WIDTH: f64 = 1920.0;
/// Reference canvas height.
pub const REFERENCE_HEIGHT: f64 = 1080.0;

/// Preview-to-renderer size factor.
pub const PREVIEW_SCALE: f64 = 1.5;
/// Reference pixels per percent of screen height.
pub const VERTICAL_MARGIN_PER_PERCENT: f64 = REFERENCE_HEIGHT / 100.0;
/// Smallest box padding.
pub const MIN_BOX_PADDING: u32 = 8;
/// Gap between a prefix image and its text, in reference pixels.
pub const PREFIX_IMAGE_SPACING: f64 = 8.0;

/// Horizontal margin on the anchored side of left/right styles.
pub const ANCHORED_SIDE_MARGIN: i32 = 150;
/// Horizontal margin everywhere else.
pub const DEFAULT_SIDE_MARGIN: i32 = 96;

/// Installed renderer font for a preview font family.
pub fn map_font_family(family: &str) -> &'static str {
    match family {
        "Noto Sans JP" => "Noto Sans CJK JP",
        "Klee One" => "Noto Serif CJK JP",
        "Dela Gothic One" => "Noto Sans CJK JP Black",
        "Kilgo U" => "Noto Sans CJK JP",
        _ => "Noto Sans CJK JP",
    }
}

/// Keep characters that are safe inside a markup style name.
pub fn sanitize_style_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-')
        .collect();
    if cleaned.is_empty() {
        "Style".to_string()
    } else {
        cleaned
    }
}

/// Horizontal correction for reference-space distances on a video whose
/// aspect ratio is not 16:9.
///
/// A square image `s` video pixels wide spans `s * correction` reference
/// units horizontally.
pub fn aspect_correction(video_width: u32, video_height: u32) -> f64 {
    if video_width == 0 || video_height == 0 {
        return 1.0;
    }
    (REFERENCE_WIDTH * video_height as f64) / (REFERENCE_HEIGHT * video_width as f64)
}

/// A style after every derived parameter has been computed.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedStyle {
    /// Sanitized name used as the markup style prefix
    pub name: String,
    pub font_name: String,
    /// Font size in reference pixels
    pub font_size: u32,
    pub bold: bool,
    pub primary_color: PackedColor,
    pub back_color: PackedColor,
    pub outline_color: PackedColor,
    pub outer_outline_color: PackedColor,
    pub shadow_color: PackedColor,
    pub outline_width: u32,
    pub outer_outline_width: u32,
    /// Shadow depth after the 1.5 scale
    pub shadow_depth: u32,
    pub padding: u32,
    pub margin_l: i32,
    pub margin_r: i32,
    pub margin_v: i32,
    pub alignment: Alignment,
    pub has_outer_outline: bool,
    pub prefix_text: Option<String>,
    pub prefix_image: Option<String>,
    /// Prefix image size in reference pixels
    pub prefix_image_size: f64,
    /// Horizontal room reserved for the prefix image, in reference units
    pub prefix_image_reserve: f64,
}

impl ResolvedStyle {
    /// Whether the background box layer paints anything.
    pub fn has_box(&self) -> bool {
        !self.back_color.is_fully_transparent()
    }

    /// Shadow on the outer outline layer.
    pub fn outer_shadow(&self) -> u32 {
        if self.has_outer_outline {
            self.shadow_depth
        } else {
            0
        }
    }

    /// Shadow on the inner outline layer.
    pub fn inner_shadow(&self) -> u32 {
        if self.has_outer_outline {
            0
        } else {
            self.shadow_depth
        }
    }

    /// Combined border of the outer layer, which must extend past the inner one.
    pub fn outer_border(&self) -> u32 {
        self.outline_width + self.outer_outline_width
    }

    /// Line height used when stacking.
    pub fn line_height(&self) -> f64 {
        self.font_size as f64 * LINE_HEIGHT_FACTOR
    }
}

/// Resolve a style with no aspect correction.
pub fn resolve_style(name: &str, spec: &StyleSpec) -> ModelResult<ResolvedStyle> {
    resolve_style_with(name, spec, 1.0)
}

/// Resolve a style for a video whose aspect correction is `correction`.
///
/// Colors are validated here; an invalid color is an error rather than a
/// silent substitution.
pub fn resolve_style_with(name: &str, spec: &StyleSpec, correction: f64) -> ModelResult<ResolvedStyle> {
    let scaled = |v: f64| (v.max(0.0) * PREVIEW_SCALE) as u32;

    let outline_width = scaled(spec.outline_width);
    let outer_outline_width = scaled(spec.outer_outline_width);

    let prefix_image = spec.prefix_image().map(str::to_string);
    let prefix_image_size = spec.prefix_image_size() * PREVIEW_SCALE;

    let (mut margin_l, margin_r) = match spec.alignment.horizontal() {
        HorizontalAnchor::Left => (ANCHORED_SIDE_MARGIN, DEFAULT_SIDE_MARGIN),
        HorizontalAnchor::Right => (DEFAULT_SIDE_MARGIN, ANCHORED_SIDE_MARGIN),
        HorizontalAnchor::Center => (DEFAULT_SIDE_MARGIN, DEFAULT_SIDE_MARGIN),
    };

    let prefix_image_reserve = if prefix_image.is_some() {
        (prefix_image_size + PREFIX_IMAGE_SPACING) * correction
    } else {
        0.0
    };
    if spec.alignment.horizontal() == HorizontalAnchor::Left {
        margin_l += prefix_image_reserve.round() as i32;
    }

    Ok(ResolvedStyle {
        name: sanitize_style_name(name),
        font_name: map_font_family(&spec.font_family).to_string(),
        font_size: scaled(spec.font_size),
        bold: spec.is_bold(),
        primary_color: hex_to_packed_color(&spec.color)?,
        back_color: hex_to_packed_color(&spec.background_color)?,
        outline_color: hex_to_packed_color(&spec.outline_color)?,
        outer_outline_color: hex_to_packed_color(&spec.outer_outline_color)?,
        shadow_color: hex_to_packed_color(&spec.shadow_color)?,
        outline_width,
        outer_outline_width,
        shadow_depth: scaled(spec.shadow_blur),
        padding: outline_width.max(MIN_BOX_PADDING),
        margin_l,
        margin_r,
        margin_v: (spec.bottom_percent.max(0.0) * VERTICAL_MARGIN_PER_PERCENT) as i32,
        alignment: spec.alignment,
        has_outer_outline: spec.outer_outline_width > 0.0,
        prefix_text: spec.effective_prefix_text().map(str::to_string),
        prefix_image,
        prefix_image_size,
        prefix_image_reserve,
    })
}

/// All styles of a [`StyleBook`], resolved once.
#[derive(Debug, Clone)]
pub struct ResolvedStyleBook {
    default: ResolvedStyle,
    named: BTreeMap<String, ResolvedStyle>,
}

impl ResolvedStyleBook {
    /// Resolve every style in the book.
    pub fn resolve(book: &StyleBook, correction: f64) -> ModelResult<Self> {
        let default = resolve_style_with(DEFAULT_STYLE_NAME, &book.default, correction)?;
        let mut taken = HashSet::from([default.name.clone()]);
        let mut named = BTreeMap::new();
        for (name, spec) in book.iter().skip(1) {
            let mut style = resolve_style_with(name, spec, correction)?;
            style.name = unique_name(&style.name, &mut taken);
            named.insert(name.to_string(), style);
        }
        Ok(Self { default, named })
    }

    pub fn default_style(&self) -> &ResolvedStyle {
        &self.default
    }

    /// Look up a style by its configured name, falling back to Default.
    pub fn get(&self, name: Option<&str>) -> &ResolvedStyle {
        match name {
            None => &self.default,
            Some(DEFAULT_STYLE_NAME) => &self.default,
            Some(name) => match self.named.get(name) {
                Some(style) => style,
                None => {
                    warn!(style = %name, "Unresolved style reference, using Default");
                    &self.default
                }
            },
        }
    }

    /// Default first, then named styles in name order.
    pub fn iter(&self) -> impl Iterator<Item = &ResolvedStyle> {
        std::iter::once(&self.default).chain(self.named.values())
    }
}

/// `name`, or `name_2`, `name_3`, ... when it is already taken.
fn unique_name(name: &str, taken: &mut HashSet<String>) -> String {
    let mut candidate = name.to_string();
    let mut n = 2;
    while !taken.insert(candidate.clone()) {
        candidate = format!("{name}_{n}");
        n += 1;
    }
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_resolution() {
        let style = resolve_style("Default", &StyleSpec::default()).unwrap();
        assert_eq!(style.font_size, 36);
        assert_eq!(style.font_name, "Noto Sans CJK JP");
        assert_eq!(style.padding, MIN_BOX_PADDING);
        assert_eq!(style.margin_v, 108);
        assert_eq!((style.margin_l, style.margin_r), (96, 96));
        assert_eq!(style.back_color.to_string(), "&H7F000000");
        assert!(style.has_box());
        assert!(!style.has_outer_outline);
    }

    #[test]
    fn test_scaled_widths_and_padding() {
        let spec = StyleSpec {
            font_size: 25.0,
            outline_width: 10.0,
            shadow_blur: 3.0,
            ..Default::default()
        };
        let style = resolve_style("S", &spec).unwrap();
        assert_eq!(style.font_size, 37);
        assert_eq!(style.outline_width, 15);
        assert_eq!(style.padding, 15);
        assert_eq!(style.shadow_depth, 4);
    }

    #[test]
    fn test_margins_by_alignment() {
        let left = resolve_style("L", &StyleSpec::default().with_alignment(Alignment::TopLeft)).unwrap();
        assert_eq!((left.margin_l, left.margin_r), (150, 96));
        let right = resolve_style("R", &StyleSpec::default().with_alignment(Alignment::Right)).unwrap();
        assert_eq!((right.margin_l, right.margin_r), (96, 150));
        let top = resolve_style("T", &StyleSpec::default().with_alignment(Alignment::Top)).unwrap();
        assert_eq!((top.margin_l, top.margin_r), (96, 96));
    }

    #[test]
    fn test_prefix_image_grows_left_margin() {
        let spec = StyleSpec::default()
            .with_alignment(Alignment::Left)
            .with_prefix_image("icon.png", 40.0);
        let style = resolve_style_with("L", &spec, 1.0).unwrap();
        // 40 * 1.5 + 8
        assert_eq!(style.margin_l, 150 + 68);

        let corrected = resolve_style_with("L", &spec, 2.0).unwrap();
        assert_eq!(corrected.margin_l, 150 + 136);
    }

    #[test]
    fn test_prefix_image_does_not_move_centered_text() {
        let spec = StyleSpec::default().with_prefix_image("icon.png", 40.0);
        let style = resolve_style_with("C", &spec, 1.0).unwrap();
        assert_eq!(style.margin_l, 96);
        assert!(style.prefix_image_reserve > 0.0);
    }

    #[test]
    fn test_shadow_layer_is_exclusive() {
        let inner = resolve_style(
            "A",
            &StyleSpec {
                outer_outline_width: 0.0,
                shadow_blur: 5.0,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(inner.inner_shadow(), 7);
        assert_eq!(inner.outer_shadow(), 0);

        let outer = resolve_style(
            "B",
            &StyleSpec {
                outer_outline_width: 3.0,
                shadow_blur: 5.0,
                ..Default::default()
            },
        )
        .unwrap();
        assert!(outer.has_outer_outline);
        assert_eq!(outer.outer_shadow(), 7);
        assert_eq!(outer.inner_shadow(), 0);
    }

    #[test]
    fn test_invalid_color_is_surfaced() {
        let spec = StyleSpec {
            color: "#fff".to_string(),
            ..Default::default()
        };
        assert!(resolve_style("X", &spec).is_err());
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let spec = StyleSpec::default().with_alignment(Alignment::Left);
        assert_eq!(resolve_style("A", &spec).unwrap(), resolve_style("A", &spec).unwrap());
    }

    #[test]
    fn test_sanitize_style_name() {
        assert_eq!(sanitize_style_name("Speaker A"), "SpeakerA");
        assert_eq!(sanitize_style_name("a,b:c"), "abc");
        assert_eq!(sanitize_style_name("話者_1"), "話者_1");
        assert_eq!(sanitize_style_name(",,"), "Style");
    }

    #[test]
    fn test_aspect_correction() {
        assert!((aspect_correction(1920, 1080) - 1.0).abs() < 1e-9);
        assert!((aspect_correction(1280, 720) - 1.0).abs() < 1e-9);
        assert!(aspect_correction(1080, 1920) > 3.0);
        assert_eq!(aspect_correction(0, 0), 1.0);
    }

    #[test]
    fn test_book_fallback() {
        let book = StyleBook::default().with_style("Speaker", StyleSpec::default().with_alignment(Alignment::Left));
        let resolved = ResolvedStyleBook::resolve(&book, 1.0).unwrap();
        assert_eq!(resolved.get(Some("Speaker")).alignment, Alignment::Left);
        assert_eq!(resolved.get(Some("Missing")).name, "Default");
        let names: Vec<_> = resolved.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Default", "Speaker"]);
    }

    #[test]
    fn test_colliding_sanitized_names_stay_distinct() {
        let book = StyleBook::default()
            .with_style("Speaker A", StyleSpec::default().with_alignment(Alignment::Left))
            .with_style("SpeakerA", StyleSpec::default().with_alignment(Alignment::Right))
            .with_style("Default!", StyleSpec::default());
        let resolved = ResolvedStyleBook::resolve(&book, 1.0).unwrap();

        let names: Vec<_> = resolved.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Default", "Default_2", "SpeakerA", "SpeakerA_2"]);
        assert_eq!(resolved.get(Some("Speaker A")).name, "SpeakerA");
        assert_eq!(resolved.get(Some("SpeakerA")).name, "SpeakerA_2");
        assert_eq!(resolved.get(Some("SpeakerA")).alignment, Alignment::Right);
    }
}
