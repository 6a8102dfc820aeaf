//! CSS hex colors and their packed markup representation.
//!
//! The markup renderer stores colors as `&HAABBGGRR` where alpha is inverted
//! relative to CSS: `00` is opaque and `FF` is fully transparent.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// A color in the markup's packed `AABBGGRR` layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct PackedColor(u32);

impl PackedColor {
    /// Fully opaque black.
    pub const BLACK: PackedColor = PackedColor(0x0000_0000);

    /// Build from CSS channels, where `css_alpha` 255 means opaque.
    pub fn from_rgba(r: u8, g: u8, b: u8, css_alpha: u8) -> Self {
        let alpha = 255 - css_alpha;
        Self(u32::from_be_bytes([alpha, b, g, r]))
    }

    /// Raw packed value.
    pub fn value(&self) -> u32 {
        self.0
    }

    /// Packed (inverted) alpha byte: 0 = opaque, 255 = transparent.
    pub fn alpha(&self) -> u8 {
        self.0.to_be_bytes()[0]
    }

    /// Alpha re-expressed in CSS convention (255 = opaque).
    pub fn css_alpha(&self) -> u8 {
        255 - self.alpha()
    }

    /// Whether nothing of this color would be painted.
    pub fn is_fully_transparent(&self) -> bool {
        self.alpha() == 0xFF
    }

    /// Red, green and blue channels.
    pub fn rgb(&self) -> (u8, u8, u8) {
        let [_, b, g, r] = self.0.to_be_bytes();
        (r, g, b)
    }
}

impl fmt::Display for PackedColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "&H{:08X}", self.0)
    }
}

/// Convert `#RRGGBB` or `#RRGGBBAA` to a packed markup color.
///
/// Six-digit colors are forced fully opaque; an eight-digit color has its
/// alpha inverted. Any other length is rejected rather than guessed.
///
/// # Examples
/// ```
/// use kirinuki_models::color::hex_to_packed_color;
/// assert_eq!(hex_to_packed_color("#ff0000").unwrap().to_string(), "&H000000FF");
/// assert_eq!(hex_to_packed_color("#00000080").unwrap().alpha(), 0x7F);
/// ```
pub fn hex_to_packed_color(hex: &str) -> ModelResult<PackedColor> {
    let digits = hex.trim().trim_start_matches('#');
    if !(digits.len() == 6 || digits.len() == 8) || !digits.is_ascii() {
        return Err(ModelError::invalid_color(hex));
    }

    let channel = |i: usize| -> ModelResult<u8> {
        u8::from_str_radix(&digits[i..i + 2], 16).map_err(|_| ModelError::invalid_color(hex))
    };

    let r = channel(0)?;
    let g = channel(2)?;
    let b = channel(4)?;
    let css_alpha = if digits.len() == 8 { channel(6)? } else { 0xFF };

    Ok(PackedColor::from_rgba(r, g, b, css_alpha))
}
