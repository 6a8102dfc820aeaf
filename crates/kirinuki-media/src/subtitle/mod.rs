//! Caption compositing: cue parsing, style resolution, layered layout and
//! markup output, plus the scrolling comment track and editor exports.

pub mod compose;
pub mod danmaku;
pub mod export;
pub mod fcpxml;
pub mod markup;
pub mod parser;
pub mod resolve;
pub mod track;

pub use compose::{
    compose, flatten_intervals, Composition, Interval, PrefixImagePlacement, RenderEvent,
    RenderLayer,
};
pub use danmaku::{
    generate_danmaku, schedule_danmaku, write_danmaku_markup, DanmakuConfig, DanmakuTrack,
    LaneChoice, LaneScheduler,
};
pub use export::{srt_to_vtt, vtt_to_srt, write_srt, write_vtt};
pub use fcpxml::{write_fcpxml, FcpxmlOptions};
pub use markup::{write_markup, MarkupDocument};
pub use parser::{parse_cues, parse_cues_with, ParseOptions};
pub use resolve::{aspect_correction, resolve_style, ResolvedStyle, ResolvedStyleBook};
pub use track::{build_caption_track, CaptionTrack};
