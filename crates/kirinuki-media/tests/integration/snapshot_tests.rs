//! Exact output of the markup writer and the filter-graph serializer.

use std::collections::HashMap;
use std::path::Path;

use kirinuki_media::emoji::EmojiMap;
use kirinuki_media::subtitle::{build_caption_track, schedule_danmaku, write_danmaku_markup, DanmakuConfig};
use kirinuki_media::{BurnSpec, ClipSpec, FfmpegCommand, FilterGraph};
use kirinuki_models::{AspectRatio, CommentEvent, CropRect, Cue, OverlayDescriptor, StyleAssignment, StyleBook};
use rand::rngs::StdRng;
use rand::SeedableRng;

#[test]
fn test_default_caption_markup() {
    let cues = vec![Cue::new(0.0, 1.5, "Hi")];
    let track = build_caption_track(
        &cues,
        &StyleBook::default(),
        &StyleAssignment::new(),
        1920,
        1080,
        Path::new("/unused"),
    )
    .unwrap();

    let expected = "\
[Script Info]
ScriptType: v4.00+
PlayResX: 1920
PlayResY: 1080
WrapStyle: 2
ScaledBorderAndShadow: yes
Collisions: Normal

[V4+ Styles]
Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding
Style: Default_Box,Noto Sans CJK JP,36,&H00FFFFFF,&H00000000,&H7F000000,&H7F000000,0,0,0,0,100,100,0,0,3,8,0,2,96,96,108,1
Style: Default_Outer,Noto Sans CJK JP,36,&H00FFFFFF,&H00000000,&H00FFFFFF,&H00000000,0,0,0,0,100,100,0,0,1,0,0,2,96,96,108,1
Style: Default_Inner,Noto Sans CJK JP,36,&H00FFFFFF,&H00000000,&H00000000,&H00000000,0,0,0,0,100,100,0,0,1,0,0,2,96,96,108,1
Style: Default_Text,Noto Sans CJK JP,36,&H00FFFFFF,&H00000000,&H00000000,&H00000000,0,0,0,0,100,100,0,0,1,0,0,2,96,96,108,1

[Events]
Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text
Dialogue: 0,0:00:00.00,0:00:01.50,Default_Box,,0,0,0,,{\\pos(960,972)}Hi
Dialogue: 2,0:00:00.00,0:00:01.50,Default_Inner,,0,0,0,,{\\pos(960,972)}Hi
Dialogue: 3,0:00:00.00,0:00:01.50,Default_Text,,0,0,0,,{\\pos(960,972)}Hi
";
    assert_eq!(track.markup, expected);
    assert!(track.overlays.is_empty());
}

#[test]
fn test_clip_graph_with_danmaku_overlays() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("kusa.png"), b"png").unwrap();
    let emoji = EmojiMap::new(dir.path(), HashMap::from([(":_kusa:".to_string(), "kusa.png".to_string())]));

    let config = DanmakuConfig::default().with_speed(250.0, 250.0);
    let comments = vec![CommentEvent::new("w :_kusa:", 1.0), CommentEvent::new("plain", 2.0)];
    let spec = ClipSpec::new(0.0, 30.0, dir.path())
        .with_crop(CropRect::new(480, 0, 960, 1080))
        .with_aspect_ratio(AspectRatio::PORTRAIT);
    let (width, height) = spec.frame_size((1920, 1080));

    let mut rng = StdRng::seed_from_u64(7);
    let track = schedule_danmaku(&comments, width, height, &config, &emoji, &mut rng);
    assert_eq!(track.overlays.len(), 1);
    assert!(track.overlays[0].x_expr.starts_with("770.0-"));

    let markup_path = dir.path().join("danmaku.ass");
    std::fs::write(&markup_path, write_danmaku_markup(&track, width, height, &config)).unwrap();

    let spec = spec.with_danmaku(&markup_path, track.overlays.clone());
    let graph = spec.filter_graph().to_filter_complex();

    let chain_end = graph.find("[v0]").unwrap();
    let chain = &graph[..chain_end];
    assert!(chain.starts_with(
        "[0:v]crop=960:1080:480:0,\
         scale=720:1280:force_original_aspect_ratio=decrease,pad=720:1280:(ow-iw)/2:(oh-ih)/2,\
         subtitles='"
    ));
    assert!(chain.contains("danmaku.ass'"));

    let overlay = &track.overlays[0];
    let tail = format!(
        "[v0][img0]overlay=x='{}':y={}:enable='gte(t,1.000)*lt(t,{:.3})'[vout]",
        overlay.x_expr, overlay.y, overlay.end
    );
    assert!(graph.ends_with(&tail), "{graph}");
    assert!(graph.contains("kusa.png',scale=48:48[img0]"));
}

#[test]
fn test_burn_command_arguments() {
    let graph = FilterGraph::new()
        .subtitles("/w/main.ass")
        .fonts_dir("/fonts")
        .overlays([OverlayDescriptor::fixed("/img/a.png", 0.0, 2.0, 150, 940, 60)]);

    let prepared = graph.prepare(&Default::default(), Path::new("/tmp")).unwrap();
    assert!(!prepared.is_script());

    let args = prepared
        .apply(FfmpegCommand::new("/in/video.mp4", "/out/video.mp4"))
        .encoding(&BurnSpec::new("/w/main.ass", "/tmp").encoding)
        .build_args();

    let at = |flag: &str| args.iter().position(|a| a == flag).unwrap();
    assert_eq!(
        args[at("-filter_complex") + 1],
        "[0:v]subtitles='/w/main.ass':fontsdir='/fonts'[v0];\
         movie='/img/a.png',scale=60:60[img0];\
         [v0][img0]overlay=x='150':y=940:enable='gte(t,0.000)*lt(t,2.000)'[vout]"
    );
    assert_eq!(args[at("-map") + 1], "[vout]");
    assert_eq!(args[at("-c:a") + 1], "copy");
    assert!(at("-i") < at("-filter_complex"));
    assert_eq!(args.last().map(String::as_str), Some("/out/video.mp4"));
}
