//! Caption style configuration.
//!
//! Styles arrive from the editor as camelCase JSON. Every field has a
//! default so that an empty object still renders legibly: white text on a
//! semi-transparent black box, centered, bottom-anchored.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Name of the style that always exists.
pub const DEFAULT_STYLE_NAME: &str = "Default";

/// Default preview font size (before the renderer scale factor).
pub const DEFAULT_FONT_SIZE: f64 = 24.0;
/// Default prefix image size in preview pixels.
pub const DEFAULT_PREFIX_IMAGE_SIZE: f64 = 48.0;
/// Default distance from the anchor edge, in percent of screen height.
pub const DEFAULT_BOTTOM_PERCENT: f64 = 10.0;

/// Screen anchor for a caption: three horizontal positions × bottom/top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Alignment {
    /// Bottom left
    Left,
    /// Bottom center
    #[default]
    Center,
    /// Bottom right
    Right,
    /// Top left
    TopLeft,
    /// Top center
    Top,
    /// Top right
    TopRight,
}

/// Horizontal component of an [`Alignment`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HorizontalAnchor {
    Left,
    Center,
    Right,
}

impl Alignment {
    /// All alignment classes.
    pub const ALL: &'static [Alignment] = &[
        Alignment::Left,
        Alignment::Center,
        Alignment::Right,
        Alignment::TopLeft,
        Alignment::Top,
        Alignment::TopRight,
    ];

    /// Numpad alignment code used by the markup (1-3 bottom, 7-9 top).
    pub fn numpad(&self) -> u8 {
        match self {
            Alignment::Left => 1,
            Alignment::Center => 2,
            Alignment::Right => 3,
            Alignment::TopLeft => 7,
            Alignment::Top => 8,
            Alignment::TopRight => 9,
        }
    }

    /// Whether lines hang down from the top edge.
    pub fn is_top(&self) -> bool {
        matches!(self, Alignment::TopLeft | Alignment::Top | Alignment::TopRight)
    }

    /// Horizontal anchor class.
    pub fn horizontal(&self) -> HorizontalAnchor {
        match self {
            Alignment::Left | Alignment::TopLeft => HorizontalAnchor::Left,
            Alignment::Center | Alignment::Top => HorizontalAnchor::Center,
            Alignment::Right | Alignment::TopRight => HorizontalAnchor::Right,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Alignment::Left => "left",
            Alignment::Center => "center",
            Alignment::Right => "right",
            Alignment::TopLeft => "top-left",
            Alignment::Top => "top",
            Alignment::TopRight => "top-right",
        }
    }
}

impl fmt::Display for Alignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Alignment {
    type Err = AlignmentParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Alignment::ALL
            .iter()
            .copied()
            .find(|a| a.as_str() == s.trim().to_lowercase())
            .ok_or_else(|| AlignmentParseError(s.to_string()))
    }
}

#[derive(Debug, Error)]
#[error("Unknown alignment: {0}")]
pub struct AlignmentParseError(String);

/// Visual style for one class of captions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StyleSpec {
    /// Preview font family (mapped to an installed font at render time)
    #[serde(default = "default_font_family")]
    pub font_family: String,

    /// Preview font size in pixels
    #[serde(default = "default_font_size")]
    pub font_size: f64,

    /// "normal" or "bold"
    #[serde(default = "default_font_weight")]
    pub font_weight: String,

    /// Text fill color
    #[serde(default = "default_color")]
    pub color: String,

    /// Box color; fully transparent disables the box layer
    #[serde(default = "default_background_color")]
    pub background_color: String,

    /// Inner outline color
    #[serde(default = "default_outline_color")]
    pub outline_color: String,

    /// Inner outline width in preview pixels
    #[serde(default)]
    pub outline_width: f64,

    /// Outer outline color
    #[serde(default = "default_outer_outline_color")]
    pub outer_outline_color: String,

    /// Outer outline width; zero disables the outer layer
    #[serde(default)]
    pub outer_outline_width: f64,

    /// Shadow color
    #[serde(default = "default_shadow_color")]
    pub shadow_color: String,

    /// Shadow depth in preview pixels
    #[serde(default)]
    pub shadow_blur: f64,

    /// Distance from the anchor edge in percent of screen height
    #[serde(default = "default_bottom_percent", rename = "bottom", alias = "bottomPercent")]
    pub bottom_percent: f64,

    #[serde(default)]
    pub alignment: Alignment,

    /// Text prepended to the first line of each cue
    #[serde(default, rename = "prefix", alias = "prefixText", skip_serializing_if = "Option::is_none")]
    pub prefix_text: Option<String>,

    /// Icon drawn before the first line of each cue
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix_image: Option<String>,

    /// Icon size in preview pixels
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix_image_size: Option<f64>,
}

fn default_font_family() -> String {
    "Noto Sans JP".to_string()
}
fn default_font_size() -> f64 {
    DEFAULT_FONT_SIZE
}
fn default_font_weight() -> String {
    "normal".to_string()
}
fn default_color() -> String {
    "#ffffff".to_string()
}
fn default_background_color() -> String {
    "#00000080".to_string()
}
fn default_outline_color() -> String {
    "#000000".to_string()
}
fn default_outer_outline_color() -> String {
    "#ffffff".to_string()
}
fn default_shadow_color() -> String {
    "#000000".to_string()
}
fn default_bottom_percent() -> f64 {
    DEFAULT_BOTTOM_PERCENT
}

impl Default for StyleSpec {
    fn default() -> Self {
        Self {
            font_family: default_font_family(),
            font_size: DEFAULT_FONT_SIZE,
            font_weight: default_font_weight(),
            color: default_color(),
            background_color: default_background_color(),
            outline_color: default_outline_color(),
            outline_width: 0.0,
            outer_outline_color: default_outer_outline_color(),
            outer_outline_width: 0.0,
            shadow_color: default_shadow_color(),
            shadow_blur: 0.0,
            bottom_percent: DEFAULT_BOTTOM_PERCENT,
            alignment: Alignment::default(),
            prefix_text: None,
            prefix_image: None,
            prefix_image_size: None,
        }
    }
}

impl StyleSpec {
    /// Whether the text is bold.
    pub fn is_bold(&self) -> bool {
        self.font_weight.eq_ignore_ascii_case("bold")
    }

    /// Prefix image path, ignoring empty strings.
    pub fn prefix_image(&self) -> Option<&str> {
        self.prefix_image.as_deref().filter(|p| !p.trim().is_empty())
    }

    /// Effective text prefix. An image prefix always wins over text.
    pub fn effective_prefix_text(&self) -> Option<&str> {
        if self.prefix_image().is_some() {
            return None;
        }
        self.prefix_text.as_deref().filter(|p| !p.is_empty())
    }

    /// Icon size in preview pixels.
    pub fn prefix_image_size(&self) -> f64 {
        self.prefix_image_size
            .filter(|s| *s > 0.0)
            .unwrap_or(DEFAULT_PREFIX_IMAGE_SIZE)
    }

    /// Drop a text prefix when an image prefix is set.
    pub fn without_shadowed_prefix(mut self) -> Self {
        if self.prefix_image().is_some() {
            self.prefix_text = None;
        }
        self
    }

    /// Builder-style setter for alignment.
    pub fn with_alignment(mut self, alignment: Alignment) -> Self {
        self.alignment = alignment;
        self
    }

    /// Builder-style setter for the text prefix.
    pub fn with_prefix_text(mut self, prefix: impl Into<String>) -> Self {
        self.prefix_text = Some(prefix.into());
        self
    }

    /// Builder-style setter for the image prefix.
    pub fn with_prefix_image(mut self, path: impl Into<String>, size: f64) -> Self {
        self.prefix_image = Some(path.into());
        self.prefix_image_size = Some(size);
        self
    }
}

/// The default style plus any number of named styles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StyleBook {
    /// Style used when no assignment applies
    #[serde(default)]
    pub default: StyleSpec,

    /// Named styles, iterated in name order
    #[serde(default)]
    pub named: BTreeMap<String, StyleSpec>,
}

/// Outcome of looking a style name up in a [`StyleBook`].
#[derive(Debug, Clone, Copy)]
pub struct StyleLookup<'a> {
    /// Name under which the style was found
    pub name: &'a str,
    pub spec: &'a StyleSpec,
    /// Set when the requested name was undefined and Default was used
    pub fell_back: bool,
}

impl StyleBook {
    /// Create a book with only a default style.
    pub fn new(default: StyleSpec) -> Self {
        Self {
            default,
            named: BTreeMap::new(),
        }
    }

    /// Add a named style.
    pub fn with_style(mut self, name: impl Into<String>, spec: StyleSpec) -> Self {
        self.named.insert(name.into(), spec);
        self
    }

    /// Resolve a style name, falling back to Default when it is undefined.
    pub fn lookup<'a>(&'a self, name: Option<&'a str>) -> StyleLookup<'a> {
        match name {
            Some(name) if name != DEFAULT_STYLE_NAME => match self.named.get_key_value(name) {
                Some((key, spec)) => StyleLookup {
                    name: key.as_str(),
                    spec,
                    fell_back: false,
                },
                None => StyleLookup {
                    name: DEFAULT_STYLE_NAME,
                    spec: &self.default,
                    fell_back: true,
                },
            },
            _ => StyleLookup {
                name: DEFAULT_STYLE_NAME,
                spec: &self.default,
                fell_back: false,
            },
        }
    }

    /// Default first, then named styles in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &StyleSpec)> {
        std::iter::once((DEFAULT_STYLE_NAME, &self.default)).chain(
            self.named
                .iter()
                .filter(|(name, _)| name.as_str() != DEFAULT_STYLE_NAME)
                .map(|(name, spec)| (name.as_str(), spec)),
        )
    }

    /// Apply [`StyleSpec::without_shadowed_prefix`] to every style.
    pub fn without_shadowed_prefixes(self) -> Self {
        Self {
            default: self.default.without_shadowed_prefix(),
            named: self
                .named
                .into_iter()
                .map(|(name, spec)| (name, spec.without_shadowed_prefix()))
                .collect(),
        }
    }
}

/// Sparse map from cue index (0-based, parse order) to style name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct StyleAssignment(BTreeMap<usize, String>);

impl StyleAssignment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign a style to a cue index.
    pub fn assign(mut self, cue_index: usize, style: impl Into<String>) -> Self {
        self.0.insert(cue_index, style.into());
        self
    }

    /// Style name for a cue, if any.
    pub fn style_for(&self, cue_index: usize) -> Option<&str> {
        self.0.get(&cue_index).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
