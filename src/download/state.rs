//! Download result tracking.

use std::path::PathBuf;

use crate::media::MediaItem;

/// Outcome of one download command.
///
/// Individual item failures do not abort a batch; they are collected here
/// and reported together.
#[derive(Debug, Default)]
pub struct DownloadReport {
    /// What was downloaded, e.g. `post ABC` or `@alice`.
    pub target: String,

    /// Files written by this run.
    pub files: Vec<PathBuf>,

    pub image_count: u64,
    pub video_count: u64,

    /// Items whose file already existed.
    pub skipped_count: u64,

    /// `(filename, reason)` for items that failed.
    pub failures: Vec<(String, String)>,
}

impl DownloadReport {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            ..Default::default()
        }
    }

    pub fn record_downloaded(&mut self, item: &MediaItem, path: PathBuf) {
        if item.is_video {
            self.video_count += 1;
        } else {
            self.image_count += 1;
        }
        self.files.push(path);
    }

    pub fn record_skipped(&mut self) {
        self.skipped_count += 1;
    }

    pub fn record_failed(&mut self, name: impl Into<String>, reason: impl ToString) {
        self.failures.push((name.into(), reason.to_string()));
    }

    /// Fold a section report (posts, stories, ...) into this one.
    pub fn merge(&mut self, other: DownloadReport) {
        self.files.extend(other.files);
        self.image_count += other.image_count;
        self.video_count += other.video_count;
        self.skipped_count += other.skipped_count;
        self.failures.extend(other.failures);
    }

    /// Get total downloaded count.
    pub fn total_downloaded(&self) -> u64 {
        self.image_count + self.video_count
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MediaType;

    fn item(is_video: bool) -> MediaItem {
        MediaItem {
            url: String::new(),
            media_type: MediaType::Image,
            caption: String::new(),
            shortcode: "A".to_string(),
            username: None,
            index: None,
            timestamp: None,
            is_video,
        }
    }

    #[test]
    fn test_counts_and_merge() {
        let mut posts = DownloadReport::new("posts");
        posts.record_downloaded(&item(false), PathBuf::from("a.jpg"));
        posts.record_downloaded(&item(true), PathBuf::from("b.mp4"));
        posts.record_skipped();

        let mut stories = DownloadReport::new("stories");
        stories.record_failed("c.jpg", "timeout");

        let mut all = DownloadReport::new("@alice");
        all.merge(posts);
        all.merge(stories);

        assert_eq!(all.total_downloaded(), 2);
        assert_eq!(all.video_count, 1);
        assert_eq!(all.skipped_count, 1);
        assert!(all.has_failures());
        assert_eq!(all.files.len(), 2);
        assert_eq!(all.target, "@alice");
    }
}
