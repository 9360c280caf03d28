//! Media module for item representation and parsing.

pub mod item;
pub mod parser;

pub use item::{caption_slug, MediaItem, MediaType};
pub use parser::{parse_highlight, parse_shortcode_media, parse_story_item};
