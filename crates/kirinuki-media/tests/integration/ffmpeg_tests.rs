//! Render tests against a real encoder.

use std::path::{Path, PathBuf};

use kirinuki_media::subtitle::build_caption_track;
use kirinuki_media::{burn_subtitles, extract_clip, merge_clips, probe_video, BurnSpec, ClipSpec, FfmpegCommand, FfmpegRunner};
use kirinuki_models::{AspectRatio, Cue, EncodingConfig, StyleAssignment, StyleBook};

/// Render a short synthetic video with a silent audio track.
async fn synthetic_video(dir: &Path, seconds: u32) -> PathBuf {
    let output = dir.join("source.mp4");
    let audio = format!("anullsrc=r=44100:cl=stereo:d={seconds}");
    let cmd = FfmpegCommand::new(format!("testsrc=size=1280x720:rate=30:duration={seconds}"), &output)
        .operation("fixture")
        .input_args(["-f", "lavfi"])
        .output_args([
            "-f",
            "lavfi",
            "-i",
            audio.as_str(),
            "-shortest",
        ])
        .encoding(&EncodingConfig::default().with_preset("ultrafast"));
    FfmpegRunner::new().run(&cmd).await.expect("Failed to render fixture");
    output
}

#[tokio::test]
#[ignore = "requires ffmpeg"]
async fn test_probe_burn_clip_merge() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let source = synthetic_video(dir.path(), 4).await;
    let runner = FfmpegRunner::new().with_timeout(120);

    let info = probe_video(&source).await.expect("Failed to probe");
    assert_eq!((info.width, info.height), (1280, 720));
    assert!((info.duration - 4.0).abs() < 0.5);

    let cues = vec![Cue::new(0.0, 2.0, "Hello"), Cue::new(1.0, 3.0, "World")];
    let track = build_caption_track(
        &cues,
        &StyleBook::default(),
        &StyleAssignment::new(),
        info.width,
        info.height,
        dir.path(),
    )
    .expect("Failed to build captions");
    let markup = dir.path().join("captions.ass");
    std::fs::write(&markup, &track.markup).expect("Failed to write markup");

    let burned = dir.path().join("burned.mp4");
    let spec = BurnSpec::new(&markup, dir.path());
    burn_subtitles(&source, &burned, &spec, &runner)
        .await
        .expect("Failed to burn subtitles");
    assert!(burned.exists());

    let first = dir.path().join("clip_1.mp4");
    let second = dir.path().join("clip_2.mp4");
    for (path, start) in [(&first, 0.0), (&second, 2.0)] {
        let spec = ClipSpec::new(start, start + 1.5, dir.path()).with_aspect_ratio(AspectRatio::PORTRAIT);
        extract_clip(&burned, path, &spec, &runner).await.expect("Failed to cut clip");
    }

    let clip_info = probe_video(&first).await.expect("Failed to probe clip");
    assert_eq!((clip_info.width, clip_info.height), (720, 1280));

    let merged = dir.path().join("merged.mp4");
    merge_clips(&[first, second], &merged, &runner)
        .await
        .expect("Failed to merge clips");
    let merged_info = probe_video(&merged).await.expect("Failed to probe merge");
    assert!((merged_info.duration - 3.0).abs() < 0.5);
}
