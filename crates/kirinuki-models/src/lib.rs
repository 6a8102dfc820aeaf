//! Shared data models for the kirinuki clip backend.
//!
//! This crate provides Serde-serializable types for:
//! - Subtitle cues and their timestamp codecs
//! - Caption styles, alignments and packed colors
//! - Viewer comments and image overlays
//! - Clip candidates, crop regions and encoding configuration

pub mod clip;
pub mod color;
pub mod comment;
pub mod cue;
pub mod encoding;
pub mod error;
pub mod overlay;
pub mod rect;
pub mod style;
pub mod timestamp;

// Re-export common types
pub use clip::{AspectRatio, AspectRatioParseError, ClipCandidate, ClipScore};
pub use color::{hex_to_packed_color, PackedColor};
pub use comment::{comments_for_clip, filter_by_density, CommentEvent};
pub use cue::{sort_cues, split_lines, Cue, MARKUP_LINE_BREAK};
pub use encoding::EncodingConfig;
pub use error::{ModelError, ModelResult};
pub use overlay::OverlayDescriptor;
pub use rect::CropRect;
pub use style::{
    Alignment, HorizontalAnchor, StyleAssignment, StyleBook, StyleLookup, StyleSpec,
    DEFAULT_STYLE_NAME,
};
pub use timestamp::{format_cue_time, format_markup_time, format_srt_time, parse_cue_time};
