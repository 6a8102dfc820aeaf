//! End-to-end compositing scenarios.

use std::path::Path;

use kirinuki_media::subtitle::danmaku::schedule_lanes;
use kirinuki_media::subtitle::markup::style_rows;
use kirinuki_media::subtitle::{build_caption_track, parse_cues, resolve_style, RenderLayer};
use kirinuki_models::{hex_to_packed_color, StyleAssignment, StyleBook, StyleSpec};
use rand::rngs::StdRng;
use rand::SeedableRng;

const OVERLAPPING_VTT: &str = "WEBVTT

1
00:00:00.000 --> 00:00:03.000
Hello

2
00:00:01.000 --> 00:00:02.000
World
";

/// Two overlapping cues split into three slices with a stacked middle.
#[test]
fn test_overlapping_cues_flatten_and_stack() {
    let cues = parse_cues(OVERLAPPING_VTT);
    assert_eq!(cues.len(), 2);

    let track = build_caption_track(
        &cues,
        &StyleBook::default(),
        &StyleAssignment::new(),
        1920,
        1080,
        Path::new("/unused"),
    )
    .unwrap();
    let composition = &track.composition;
    assert_eq!(composition.interval_count, 3);

    let lines_at = |start: f64| -> Vec<(String, i32)> {
        composition
            .layer(RenderLayer::Text)
            .filter(|e| (e.start - start).abs() < 1e-9)
            .map(|e| (e.text.clone(), e.y))
            .collect()
    };

    assert_eq!(lines_at(0.0).len(), 1);
    assert_eq!(lines_at(2.0).len(), 1);

    let middle = lines_at(1.0);
    assert_eq!(middle.len(), 2);
    assert_eq!(middle[0].0, "Hello");
    assert_eq!(middle[1].0, "World");
    assert!(middle[0].1 < middle[1].1, "Hello must sit above World");

    // Slices tile [0, 3) without gaps
    let mut bounds: Vec<(f64, f64)> = composition
        .layer(RenderLayer::Text)
        .map(|e| (e.start, e.end))
        .collect();
    bounds.dedup();
    assert_eq!(bounds, vec![(0.0, 1.0), (1.0, 2.0), (2.0, 3.0)]);

    assert!(track.markup.contains("Dialogue: 3,0:00:01.00,0:00:02.00,Default_Text,,0,0,0,,"));
}

/// Alpha inversion survives a decode and re-encode.
#[test]
fn test_alpha_round_trip() {
    let color = hex_to_packed_color("#00000080").unwrap();
    assert_eq!(color.alpha(), 0x7F);
    assert!((color.css_alpha() as i16 - 128).abs() <= 1);
    assert_eq!(color.to_string(), "&H7F000000");
}

/// The shadow attaches to exactly one outline layer.
#[test]
fn test_shadow_layer_selection() {
    let inner_only = resolve_style(
        "A",
        &StyleSpec {
            outer_outline_width: 0.0,
            shadow_blur: 5.0,
            ..Default::default()
        },
    )
    .unwrap();
    let [_, outer, inner, _] = style_rows(&inner_only);
    assert_eq!(outer.shadow, 0);
    assert!(inner.shadow > 0);

    let with_outer = resolve_style(
        "B",
        &StyleSpec {
            outer_outline_width: 3.0,
            shadow_blur: 5.0,
            ..Default::default()
        },
    )
    .unwrap();
    let [_, outer, inner, _] = style_rows(&with_outer);
    assert!(outer.shadow > 0);
    assert_eq!(inner.shadow, 0);
}

/// Staggered comments never share a lane while both are active.
#[test]
fn test_staggered_comments_keep_lanes_apart() {
    let slots: Vec<(f64, f64)> = (0..12).map(|i| (i as f64 * 2.0, 10.0)).collect();

    for seed in 0..20 {
        let mut rng = StdRng::seed_from_u64(seed);
        let choices = schedule_lanes(&slots, 5, 1.0, &mut rng);

        assert!(choices.iter().all(|c| !c.fallback), "seed {seed}");
        for (i, a) in choices.iter().enumerate() {
            for (j, b) in choices.iter().enumerate().skip(i + 1) {
                if a.index != b.index {
                    continue;
                }
                let (sa, da) = slots[i];
                let (sb, _) = slots[j];
                assert!(sa + da <= sb, "seed {seed}: comments {i} and {j} overlap in lane {}", a.index);
            }
        }
    }
}
