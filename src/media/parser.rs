//! Conversion of API payloads into downloadable media items.

use crate::api::types::{DisplayResource, Highlight, ImageVersion, ShortcodeMedia, StoryItem};
use crate::media::item::{MediaItem, MediaType};

/// Items of a post or reel. Carousels yield one indexed item per child.
pub fn parse_shortcode_media(media: &ShortcodeMedia, as_reel: bool) -> Vec<MediaItem> {
    let caption = media.caption();
    let username = media.owner.as_ref().and_then(|o| o.username.clone());

    let single_type = |is_video: bool| match (as_reel, is_video) {
        (true, _) => MediaType::Reel,
        (false, true) => MediaType::Video,
        (false, false) => MediaType::Image,
    };

    let make = |url: &str, is_video: bool, index: Option<usize>| MediaItem {
        url: url.to_string(),
        media_type: single_type(is_video),
        caption: caption.clone(),
        shortcode: media.shortcode.clone(),
        username: username.clone(),
        index,
        timestamp: media.taken_at_timestamp,
        is_video,
    };

    if let Some(children) = &media.edge_sidecar_to_children {
        return children
            .edges
            .iter()
            .enumerate()
            .filter_map(|(i, edge)| {
                let child = &edge.node;
                let url = pick_url(child.is_video, &child.video_url, &child.display_url)?;
                Some(make(url, child.is_video, Some(i + 1)))
            })
            .collect();
    }

    pick_url(media.is_video, &media.video_url, &media.display_url)
        .map(|url| vec![make(url, media.is_video, None)])
        .unwrap_or_default()
}

/// A story item, picking the tallest rendition.
pub fn parse_story_item(item: &StoryItem, username: &str) -> Option<MediaItem> {
    let is_video = item.is_video();
    let url = if is_video {
        tallest_version(&item.video_versions)
    } else {
        item.image_versions2
            .as_ref()
            .and_then(|versions| tallest_version(&versions.candidates))
    }?;

    Some(MediaItem {
        url: url.to_string(),
        media_type: MediaType::Story,
        caption: "Story".to_string(),
        shortcode: item.pk.clone(),
        username: Some(username.to_string()),
        index: Some(1),
        timestamp: item.taken_at,
        is_video,
    })
}

/// Items of one highlight reel, numbered from 1.
pub fn parse_highlight(highlight: &Highlight, username: &str) -> Vec<MediaItem> {
    highlight
        .items
        .iter()
        .enumerate()
        .filter_map(|(i, item)| {
            let index = i + 1;
            let resources = if item.is_video {
                &item.video_resources
            } else {
                &item.display_resources
            };
            let fallback = if item.is_video {
                &item.video_url
            } else {
                &item.display_url
            };
            let url = tallest_resource(resources)
                .or(fallback.as_deref())
                .filter(|url| !url.is_empty())?;

            Some(MediaItem {
                url: url.to_string(),
                media_type: MediaType::Highlight,
                caption: highlight.title.clone(),
                shortcode: format!("{}_{}", highlight.id, index),
                username: Some(username.to_string()),
                index: Some(index),
                timestamp: None,
                is_video: item.is_video,
            })
        })
        .collect()
}

fn pick_url<'a>(
    is_video: bool,
    video_url: &'a Option<String>,
    display_url: &'a Option<String>,
) -> Option<&'a str> {
    let url = if is_video { video_url } else { display_url };
    url.as_deref().filter(|url| !url.is_empty())
}

fn tallest_version(versions: &[ImageVersion]) -> Option<&str> {
    versions
        .iter()
        .max_by_key(|v| v.height)
        .map(|v| v.url.as_str())
        .filter(|url| !url.is_empty())
}

fn tallest_resource(resources: &[DisplayResource]) -> Option<&str> {
    resources
        .iter()
        .max_by_key(|r| r.config_height)
        .map(|r| r.src.as_str())
        .filter(|src| !src.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shortcode_media(json: &str) -> ShortcodeMedia {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_single_image_post() {
        let media = shortcode_media(
            r#"{"id":"1","shortcode":"ABC","is_video":false,"display_url":"https://cdn/a.jpg",
                "edge_media_to_caption":{"edges":[{"node":{"text":"hello world"}}]}}"#,
        );
        let items = parse_shortcode_media(&media, false);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].media_type, MediaType::Image);
        assert_eq!(items[0].generate_filename(), "hello_world_ABC.jpg");
    }

    #[test]
    fn test_carousel_children_are_indexed() {
        let media = shortcode_media(
            r#"{"id":"1","shortcode":"ABC","is_video":false,"display_url":"https://cdn/cover.jpg",
                "edge_sidecar_to_children":{"edges":[
                    {"node":{"is_video":false,"display_url":"https://cdn/1.jpg"}},
                    {"node":{"is_video":true,"video_url":"https://cdn/2.mp4","display_url":"https://cdn/2.jpg"}}
                ]}}"#,
        );
        let items = parse_shortcode_media(&media, false);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].url, "https://cdn/1.jpg");
        assert_eq!(items[1].url, "https://cdn/2.mp4");
        assert_eq!(items[1].index, Some(2));
        assert_eq!(items[1].generate_filename(), "no_caption_ABC_2.mp4");
    }

    #[test]
    fn test_reel_is_typed_as_reel() {
        let media = shortcode_media(
            r#"{"id":"1","shortcode":"R1","is_video":true,"video_url":"https://cdn/r.mp4"}"#,
        );
        let items = parse_shortcode_media(&media, true);
        assert_eq!(items[0].media_type, MediaType::Reel);
        assert_eq!(items[0].extension(), ".mp4");
    }

    #[test]
    fn test_story_picks_tallest_rendition() {
        let item: StoryItem = serde_json::from_str(
            r#"{"pk":"42","taken_at":1700000000,"media_type":1,
                "image_versions2":{"candidates":[
                    {"url":"https://cdn/small.jpg","height":320,"width":180},
                    {"url":"https://cdn/big.jpg","height":1920,"width":1080}
                ]}}"#,
        )
        .unwrap();
        let parsed = parse_story_item(&item, "alice").unwrap();
        assert_eq!(parsed.url, "https://cdn/big.jpg");
        assert_eq!(parsed.generate_filename(), "alice_1700000000.jpg");
    }

    #[test]
    fn test_story_without_renditions_is_skipped() {
        let item: StoryItem =
            serde_json::from_str(r#"{"pk":"42","media_type":2,"video_duration":5.0}"#).unwrap();
        assert!(parse_story_item(&item, "alice").is_none());
    }

    #[test]
    fn test_highlight_items_fall_back_to_plain_urls() {
        let highlight = Highlight {
            id: "17".to_string(),
            title: "Trips".to_string(),
            items: serde_json::from_str(
                r#"[
                    {"is_video":false,"display_resources":[
                        {"src":"https://cdn/h1-small.jpg","config_height":640},
                        {"src":"https://cdn/h1.jpg","config_height":1080}]},
                    {"is_video":true,"video_url":"https://cdn/h2.mp4"}
                ]"#,
            )
            .unwrap(),
        };
        let items = parse_highlight(&highlight, "alice");
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].url, "https://cdn/h1.jpg");
        assert_eq!(items[1].url, "https://cdn/h2.mp4");
        assert_eq!(items[1].generate_filename(), "alice_highlight_17_2_2.mp4");
    }
}
