//! Caption track assembly for one video.

use std::path::{Path, PathBuf};

use kirinuki_models::{Cue, ModelResult, OverlayDescriptor, StyleAssignment, StyleBook};

use super::compose::{compose, Composition};
use super::markup::write_markup;
use super::resolve::{aspect_correction, ResolvedStyleBook};

/// Markup and prefix-image overlays for a caption track.
#[derive(Debug, Clone)]
pub struct CaptionTrack {
    pub markup: String,
    pub overlays: Vec<OverlayDescriptor>,
    pub composition: Composition,
}

/// Build the caption track for a `video_width` x `video_height` video.
///
/// Prefix images are looked up in `prefix_images_dir` by file name.
pub fn build_caption_track(
    cues: &[Cue],
    book: &StyleBook,
    assignment: &StyleAssignment,
    video_width: u32,
    video_height: u32,
    prefix_images_dir: &Path,
) -> ModelResult<CaptionTrack> {
    let book = book.clone().without_shadowed_prefixes();
    let styles = ResolvedStyleBook::resolve(&book, aspect_correction(video_width, video_height))?;
    let composition = compose(cues, assignment, &styles);
    let markup = write_markup(&styles, &composition.events);

    let overlays = composition
        .prefix_images
        .iter()
        .map(|placement| {
            let path = resolve_prefix_image(&placement.image, prefix_images_dir);
            placement.to_overlay(path, video_width, video_height)
        })
        .collect();

    Ok(CaptionTrack {
        markup,
        overlays,
        composition,
    })
}

/// Local file for a configured prefix image.
///
/// Existing absolute paths are used as-is; anything else (including served
/// URLs such as `/static/prefix_images/a.png`) maps to its file name inside
/// `dir`.
pub fn resolve_prefix_image(image: &str, dir: &Path) -> PathBuf {
    let path = Path::new(image);
    if path.is_absolute() && path.exists() {
        return path.to_path_buf();
    }
    let file_name = image.rsplit('/').next().unwrap_or(image);
    dir.join(file_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kirinuki_models::{Alignment, StyleSpec};

    #[test]
    fn test_resolve_prefix_image() {
        let dir = Path::new("/data/prefix_images");
        assert_eq!(
            resolve_prefix_image("/static/prefix_images/icon.png", dir),
            PathBuf::from("/data/prefix_images/icon.png")
        );
        assert_eq!(resolve_prefix_image("icon.png", dir), PathBuf::from("/data/prefix_images/icon.png"));
    }

    #[test]
    fn test_build_caption_track() {
        let book = StyleBook::default().with_style(
            "Speaker",
            StyleSpec::default()
                .with_alignment(Alignment::Left)
                .with_prefix_text("A: ")
                .with_prefix_image("/static/prefix_images/a.png", 40.0),
        );
        let assignment = StyleAssignment::new().assign(1, "Speaker");
        let cues = vec![Cue::new(0.0, 2.0, "plain"), Cue::new(0.0, 2.0, "hello")];

        let track = build_caption_track(&cues, &book, &assignment, 1920, 1080, Path::new("/img")).unwrap();

        assert!(track.markup.contains("Style: Speaker_Text,"));
        // Image wins over the text prefix
        assert!(!track.markup.contains("A: hello"));
        assert!(track.markup.contains("}hello"));
        assert_eq!(track.overlays.len(), 1);
        assert_eq!(track.overlays[0].image_path, PathBuf::from("/img/a.png"));
        assert_eq!((track.overlays[0].start, track.overlays[0].end), (0.0, 2.0));
    }

    #[test]
    fn test_invalid_color_is_surfaced() {
        let book = StyleBook::new(StyleSpec {
            color: "#12".to_string(),
            ..Default::default()
        });
        let result = build_caption_track(&[], &book, &StyleAssignment::new(), 1920, 1080, Path::new("/img"));
        assert!(result.is_err());
    }
}
