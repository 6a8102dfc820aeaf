//! Channel emoji lookup for scrolling comments.
//!
//! Membership emoji are stored per channel as `<emoji_dir>/<channel>/map.json`
//! (shortcut to local file name) next to the image files themselves. Images
//! saved without a map entry use the sanitized shortcut as `<stem>.png`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};
use crate::metrics::record_overlay_skipped;

/// Name of the per-channel mapping file.
pub const EMOJI_MAP_FILE: &str = "map.json";

/// Resolves an emoji shortcut (`:_kusa:`) to a local image.
pub trait EmojiResolver {
    fn resolve(&self, shortcut: &str) -> Option<PathBuf>;
}

/// Shortcuts that are already mapped to image paths.
impl EmojiResolver for HashMap<String, PathBuf> {
    fn resolve(&self, shortcut: &str) -> Option<PathBuf> {
        self.get(shortcut).cloned()
    }
}

/// Resolver that knows no emoji.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEmoji;

impl EmojiResolver for NoEmoji {
    fn resolve(&self, _shortcut: &str) -> Option<PathBuf> {
        None
    }
}

/// Emoji map of one channel.
#[derive(Debug, Clone, Default)]
pub struct EmojiMap {
    dir: PathBuf,
    entries: HashMap<String, String>,
}

impl EmojiMap {
    pub fn new(dir: impl Into<PathBuf>, entries: HashMap<String, String>) -> Self {
        Self {
            dir: dir.into(),
            entries,
        }
    }

    /// Load `<emoji_dir>/<channel>/map.json`.
    ///
    /// A channel without a map yields an empty map; a map that exists but
    /// cannot be parsed is an error.
    pub async fn load(emoji_dir: impl AsRef<Path>, channel: &str) -> MediaResult<Self> {
        let dir = emoji_dir.as_ref().join(channel);
        let map_path = dir.join(EMOJI_MAP_FILE);

        if !map_path.exists() {
            warn!(path = %map_path.display(), "No emoji map for channel");
            return Ok(Self::new(dir, HashMap::new()));
        }

        let content = tokio::fs::read_to_string(&map_path).await?;
        let entries: HashMap<String, String> = serde_json::from_str(&content)?;
        debug!(channel = %channel, count = entries.len(), "Loaded emoji map");
        Ok(Self::new(dir, entries))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl EmojiResolver for EmojiMap {
    /// Mapped image path, else `<stem>.png` named after the shortcut.
    ///
    /// `None` when neither exists on disk.
    fn resolve(&self, shortcut: &str) -> Option<PathBuf> {
        let Some(file_name) = self.entries.get(shortcut) else {
            let path = self.dir.join(emoji_file_name(shortcut)?);
            return path.exists().then_some(path);
        };
        let path = self.dir.join(file_name);
        if path.exists() {
            Some(path)
        } else {
            let error = MediaError::MissingOverlayAsset(path);
            warn!(shortcut = %shortcut, error = %error, "Emoji image missing, keeping shortcut text");
            record_overlay_skipped();
            None
        }
    }
}

/// File stem for a shortcut: alphanumerics, `_` and `-`, outer `_` trimmed.
pub fn sanitize_shortcut(shortcut: &str) -> String {
    shortcut
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-')
        .collect::<String>()
        .trim_matches('_')
        .to_string()
}

/// Default image file name for a shortcut without a map entry.
fn emoji_file_name(shortcut: &str) -> Option<String> {
    let stem = sanitize_shortcut(shortcut);
    (!stem.is_empty()).then(|| format!("{stem}.png"))
}
