//! Media item representation.

use std::sync::LazyLock;

use chrono::{DateTime, TimeZone, Utc};
use regex::Regex;

static UNSAFE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[\\/:*?"<>|]"#).expect("valid filename regex"));

/// Kind of downloadable media.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Image,
    Video,
    Reel,
    Story,
    Highlight,
}

impl MediaType {
    /// Label used in logs and summaries.
    pub fn label(&self) -> &'static str {
        match self {
            MediaType::Image => "image",
            MediaType::Video => "video",
            MediaType::Reel => "reel",
            MediaType::Story => "story",
            MediaType::Highlight => "highlight",
        }
    }
}

/// A downloadable media item.
#[derive(Debug, Clone)]
pub struct MediaItem {
    /// CDN download URL.
    pub url: String,

    pub media_type: MediaType,

    /// Caption, or a label such as the highlight title.
    pub caption: String,

    /// Post shortcode, story pk, or `<highlight id>_<index>`.
    pub shortcode: String,

    pub username: Option<String>,

    /// 1-based position inside a carousel or highlight.
    pub index: Option<usize>,

    /// Unix seconds the media was taken at.
    pub timestamp: Option<i64>,

    /// Whether the payload is a video. Stories and highlights may be either.
    pub is_video: bool,
}

impl MediaItem {
    /// File extension including the dot.
    pub fn extension(&self) -> &'static str {
        if self.is_video || matches!(self.media_type, MediaType::Video | MediaType::Reel) {
            ".mp4"
        } else {
            ".jpg"
        }
    }

    /// Generate the filename for this media item.
    pub fn generate_filename(&self) -> String {
        let username = self.username.as_deref().unwrap_or("unknown");

        match self.media_type {
            MediaType::Story => {
                let stamp = self
                    .timestamp
                    .map(|ts| ts.to_string())
                    .unwrap_or_else(|| self.shortcode.clone());
                format!("{}_{}{}", username, stamp, self.extension())
            }
            MediaType::Highlight => format!(
                "{}_highlight_{}_{}{}",
                username,
                self.shortcode,
                self.index.unwrap_or(1),
                self.extension()
            ),
            _ => {
                let slug = caption_slug(&self.caption);
                match self.index {
                    Some(index) if index > 0 => {
                        format!("{}_{}_{}{}", slug, self.shortcode, index, self.extension())
                    }
                    _ => format!("{}_{}{}", slug, self.shortcode, self.extension()),
                }
            }
        }
    }

    /// Human readable taken-at time, when known.
    pub fn taken_at(&self) -> Option<String> {
        let dt: DateTime<Utc> = Utc.timestamp_opt(self.timestamp?, 0).single()?;
        Some(dt.format("%Y-%m-%d %H:%M:%S").to_string())
    }
}

/// First four words of a caption joined by underscores, with characters that
/// are unsafe in filenames replaced. Empty captions become `no_caption`.
pub fn caption_slug(caption: &str) -> String {
    let joined = caption.split_whitespace().take(4).collect::<Vec<_>>().join("_");
    if joined.is_empty() {
        return "no_caption".to_string();
    }
    UNSAFE_CHARS.replace_all(&joined, "_").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(media_type: MediaType) -> MediaItem {
        MediaItem {
            url: "https://cdn.example/x".to_string(),
            media_type,
            caption: "Sunset at the beach today!".to_string(),
            shortcode: "ABC123".to_string(),
            username: Some("alice".to_string()),
            index: None,
            timestamp: Some(1_700_000_000),
            is_video: false,
        }
    }

    #[test]
    fn test_post_filename_uses_caption_words() {
        assert_eq!(
            item(MediaType::Image).generate_filename(),
            "Sunset_at_the_beach_ABC123.jpg"
        );
    }

    #[test]
    fn test_carousel_filename_has_index() {
        let mut video = item(MediaType::Video);
        video.index = Some(2);
        assert_eq!(video.generate_filename(), "Sunset_at_the_beach_ABC123_2.mp4");
    }

    #[test]
    fn test_story_filename_prefers_timestamp() {
        let mut story = item(MediaType::Story);
        assert_eq!(story.generate_filename(), "alice_1700000000.jpg");

        story.timestamp = None;
        story.is_video = true;
        assert_eq!(story.generate_filename(), "alice_ABC123.mp4");
    }

    #[test]
    fn test_highlight_filename() {
        let mut highlight = item(MediaType::Highlight);
        highlight.shortcode = "1799_3".to_string();
        highlight.index = Some(3);
        assert_eq!(highlight.generate_filename(), "alice_highlight_1799_3_3.jpg");
    }

    #[test]
    fn test_caption_slug() {
        assert_eq!(caption_slug(""), "no_caption");
        assert_eq!(caption_slug("   "), "no_caption");
        assert_eq!(caption_slug("a/b c:d"), "a_b_c_d");
        assert_eq!(caption_slug("one two three four five"), "one_two_three_four");
    }

    #[test]
    fn test_taken_at_format() {
        assert_eq!(
            item(MediaType::Image).taken_at().as_deref(),
            Some("2023-11-14 22:13:20")
        );
    }
}
