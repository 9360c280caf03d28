//! Download module for content downloading.
//!
//! This module provides:
//! - Download result tracking
//! - Post and reel downloading
//! - Story downloading
//! - Highlight downloading
//! - Full profile downloading
//! - Media file streaming

pub mod highlights;
pub mod media;
pub mod post;
pub mod profile;
pub mod state;
pub mod story;

pub use highlights::download_highlights;
pub use media::{download_items, download_media_item};
pub use post::{download_post, download_reel};
pub use profile::{download_profile, ProfileOptions};
pub use state::DownloadReport;
pub use story::{download_stories, download_story};
