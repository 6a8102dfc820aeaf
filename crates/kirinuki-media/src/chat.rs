//! Live chat replay extraction.
//!
//! A chat replay is JSON lines; each line is a packet holding one or more
//! chat actions and a video offset in milliseconds. Only the renderers that
//! carry viewer text are read: plain messages, paid messages, membership
//! items and gift redemptions.

use std::path::Path;

use kirinuki_models::CommentEvent;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::MediaResult;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatPacket {
    replay_chat_item_action: Option<ReplayAction>,
    #[serde(default)]
    actions: Vec<ChatAction>,
    video_offset_time_msec: Option<Offset>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReplayAction {
    #[serde(default)]
    actions: Vec<ChatAction>,
    video_offset_time_msec: Option<Offset>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatAction {
    add_chat_item_action: Option<AddChatItem>,
}

#[derive(Debug, Deserialize)]
struct AddChatItem {
    item: Option<ChatItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatItem {
    live_chat_text_message_renderer: Option<TextRenderer>,
    live_chat_paid_message_renderer: Option<PaidRenderer>,
    live_chat_membership_item_renderer: Option<MembershipRenderer>,
    live_chat_sponsorship_gift_redemption_announcement_renderer: Option<TextRenderer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TextRenderer {
    message: Option<Message>,
    video_offset_time_msec: Option<Offset>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PaidRenderer {
    message: Option<Message>,
    purchase_amount_text: Option<SimpleText>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MembershipRenderer {
    header_subtext: Option<Message>,
    message: Option<Message>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SimpleText {
    simple_text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Message {
    #[serde(default)]
    runs: Vec<Run>,
}

#[derive(Debug, Deserialize)]
struct Run {
    text: Option<String>,
    emoji: Option<Emoji>,
}

#[derive(Debug, Deserialize)]
struct Emoji {
    #[serde(default)]
    shortcuts: Vec<String>,
    image: Option<EmojiImage>,
}

#[derive(Debug, Deserialize)]
struct EmojiImage {
    accessibility: Option<Accessibility>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Accessibility {
    accessibility_data: Option<AccessibilityData>,
}

#[derive(Debug, Deserialize)]
struct AccessibilityData {
    label: Option<String>,
}

/// Offsets arrive as strings, occasionally as numbers.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Offset {
    Text(String),
    Number(i64),
}

impl Offset {
    fn seconds(&self) -> Option<f64> {
        let millis = match self {
            Self::Text(s) => s.trim().parse::<i64>().ok()?,
            Self::Number(n) => *n,
        };
        Some(millis as f64 / 1000.0)
    }
}

impl Message {
    /// Text runs verbatim; emoji as their first shortcut or `:label:`.
    fn flatten(&self) -> String {
        let mut text = String::new();
        for run in &self.runs {
            if let Some(t) = &run.text {
                text.push_str(t);
            } else if let Some(emoji) = &run.emoji {
                if let Some(shortcut) = emoji.shortcuts.first() {
                    text.push_str(shortcut);
                } else if let Some(label) = emoji.label().filter(|l| !l.is_empty()) {
                    text.push(':');
                    text.push_str(label);
                    text.push(':');
                }
            }
        }
        text
    }
}

impl Emoji {
    fn label(&self) -> Option<&str> {
        self.image
            .as_ref()?
            .accessibility
            .as_ref()?
            .accessibility_data
            .as_ref()?
            .label
            .as_deref()
    }
}

fn flatten(message: &Option<Message>) -> String {
    message.as_ref().map(Message::flatten).unwrap_or_default()
}

impl ChatItem {
    fn text(&self) -> Option<String> {
        let text = if let Some(r) = &self.live_chat_text_message_renderer {
            flatten(&r.message)
        } else if let Some(r) = &self.live_chat_paid_message_renderer {
            let text = flatten(&r.message);
            match r.purchase_amount_text.as_ref().and_then(|a| a.simple_text.as_deref()) {
                Some(amount) if !amount.is_empty() => format!("[{amount}] {text}"),
                _ => text,
            }
        } else if let Some(r) = &self.live_chat_membership_item_renderer {
            format!("{} {}", flatten(&r.header_subtext), flatten(&r.message))
                .trim()
                .to_string()
        } else if let Some(r) = &self.live_chat_sponsorship_gift_redemption_announcement_renderer {
            flatten(&r.message)
        } else {
            return None;
        };
        Some(text).filter(|t| !t.is_empty())
    }

    fn own_offset(&self) -> Option<&Offset> {
        self.live_chat_text_message_renderer
            .as_ref()?
            .video_offset_time_msec
            .as_ref()
    }
}

fn parse_packet(packet: ChatPacket, comments: &mut Vec<CommentEvent>) {
    let (actions, packet_offset) = match packet.replay_chat_item_action {
        Some(replay) if !replay.actions.is_empty() => (
            replay.actions,
            replay.video_offset_time_msec.or(packet.video_offset_time_msec),
        ),
        replay => (
            packet.actions,
            replay
                .and_then(|r| r.video_offset_time_msec)
                .or(packet.video_offset_time_msec),
        ),
    };

    for item in actions
        .into_iter()
        .filter_map(|a| a.add_chat_item_action)
        .filter_map(|a| a.item)
    {
        let Some(text) = item.text() else {
            continue;
        };
        let offset = item.own_offset().or(packet_offset.as_ref());
        if let Some(timestamp) = offset.and_then(Offset::seconds) {
            comments.push(CommentEvent::new(text, timestamp));
        }
    }
}

/// Parse a chat replay (JSON lines). Lines that fail to parse are skipped.
pub fn parse_live_chat(content: &str) -> Vec<CommentEvent> {
    let mut comments = Vec::new();
    let mut skipped = 0usize;

    for line in content.lines().filter(|l| !l.trim().is_empty()) {
        match serde_json::from_str::<ChatPacket>(line) {
            Ok(packet) => parse_packet(packet, &mut comments),
            Err(_) => skipped += 1,
        }
    }

    if skipped > 0 {
        debug!(skipped, "Skipped malformed chat lines");
    }
    comments
}

#[derive(Debug, Deserialize)]
struct InfoFile {
    #[serde(default)]
    comments: Vec<InfoComment>,
}

#[derive(Debug, Deserialize)]
struct InfoComment {
    #[serde(default)]
    text: String,
    timestamp: Option<f64>,
}

/// Comments from the `comments` array of a video info JSON.
pub fn parse_info_comments(content: &str) -> MediaResult<Vec<CommentEvent>> {
    let info: InfoFile = serde_json::from_str(content)?;
    Ok(info
        .comments
        .into_iter()
        .filter_map(|c| c.timestamp.map(|ts| CommentEvent::new(c.text, ts)))
        .collect())
}

/// Load comments from a chat replay, falling back to the info JSON when the
/// replay is missing or empty.
pub async fn load_comments(live_chat: &Path, info_json: &Path) -> MediaResult<Vec<CommentEvent>> {
    let mut comments = Vec::new();

    if live_chat.exists() {
        let content = tokio::fs::read_to_string(live_chat).await?;
        comments = parse_live_chat(&content);
    }

    if comments.is_empty() && info_json.exists() {
        let content = tokio::fs::read_to_string(info_json).await?;
        match parse_info_comments(&content) {
            Ok(found) => comments = found,
            Err(e) => warn!(path = %info_json.display(), error = %e, "Could not read comments from info file"),
        }
    }

    info!(count = comments.len(), "Extracted comments");
    Ok(comments)
}
