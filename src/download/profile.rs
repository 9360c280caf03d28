//! Full profile downloading.

use crate::api::InstagramClient;
use crate::download::highlights::download_highlights;
use crate::download::media::download_items;
use crate::download::state::DownloadReport;
use crate::download::story::download_stories;
use crate::error::{Error, Result};
use crate::fs::get_profile_folder;
use crate::media::{parse_shortcode_media, MediaItem, MediaType};
use crate::output::create_item_bar;
use crate::session::Session;

/// What a profile download includes besides the profile picture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfileOptions {
    pub max_posts: usize,
    pub include_stories: bool,
    pub include_highlights: bool,
}

impl ProfileOptions {
    pub fn from_config(config: &crate::config::Config) -> Self {
        Self {
            max_posts: config.options.max_profile_posts,
            include_stories: config.options.include_stories,
            include_highlights: config.options.include_highlights,
        }
    }
}

/// Download a profile picture, the newest posts, and optionally stories and
/// highlights of `username`.
///
/// A failure in one section is recorded and the next section still runs,
/// unless the session itself was lost.
pub async fn download_profile(
    client: &mut InstagramClient,
    session: &mut Session,
    username: &str,
    options: ProfileOptions,
) -> Result<DownloadReport> {
    let user = client.user_info(session, username).await?;
    if user.is_private {
        return Err(Error::PrivateAccount(username.to_string()));
    }

    let mut report = DownloadReport::new(format!("@{}", username));

    if let Some(url) = &user.profile_pic_url {
        let picture = MediaItem {
            url: url.clone(),
            media_type: MediaType::Image,
            caption: "profile_picture".to_string(),
            shortcode: "profile".to_string(),
            username: Some(username.to_string()),
            index: None,
            timestamp: None,
            is_video: false,
        };
        let folder = get_profile_folder(client.config(), username)?;
        download_items(client, std::slice::from_ref(&picture), &folder, &mut report).await;
    }

    let posts = download_posts(client, session, username, options.max_posts).await?;
    report.merge(posts);

    if options.include_stories {
        let section = download_stories(client, session, username).await;
        absorb_section(&mut report, "stories", section)?;
    }

    if options.include_highlights {
        let section = download_highlights(client, session, username).await;
        absorb_section(&mut report, "highlights", section)?;
    }

    tracing::info!("Full profile download complete for @{}", username);
    Ok(report)
}

async fn download_posts(
    client: &mut InstagramClient,
    session: &mut Session,
    username: &str,
    max_posts: usize,
) -> Result<DownloadReport> {
    let mut report = DownloadReport::new("posts");
    if max_posts == 0 {
        return Ok(report);
    }

    let posts = client.user_posts(session, username, max_posts).await?;
    tracing::info!("Downloading {} posts of @{}", posts.len(), username);

    let target_dir = client.config().download_directory();
    let bar = client
        .config()
        .options
        .show_progress
        .then(|| create_item_bar(posts.len() as u64, "posts"));

    for post in &posts {
        let Some(shortcode) = post.shortcode() else {
            continue;
        };

        client.pace().await;
        match client.shortcode_media(session, shortcode).await {
            Ok(media) => {
                let items = parse_shortcode_media(&media, post.is_clip());
                download_items(client, &items, &target_dir, &mut report).await;
            }
            Err(e) if is_fatal(&e) => return Err(e),
            Err(e) => {
                tracing::warn!("Skipping post {}: {}", shortcode, e);
                report.record_failed(format!("post {}", shortcode), e);
            }
        }

        if let Some(ref bar) = bar {
            bar.inc(1);
        }
    }

    if let Some(bar) = bar {
        bar.finish_and_clear();
    }
    Ok(report)
}

fn absorb_section(
    report: &mut DownloadReport,
    section: &str,
    result: Result<DownloadReport>,
) -> Result<()> {
    match result {
        Ok(part) => report.merge(part),
        Err(Error::NotFound(_)) => tracing::info!("No {} to download", section),
        Err(e) if is_fatal(&e) => return Err(e),
        Err(e) => {
            tracing::warn!("{} download failed: {}", section, e);
            report.record_failed(section, e);
        }
    }
    Ok(())
}

fn is_fatal(e: &Error) -> bool {
    e.is_session_loss() || matches!(e, Error::ChallengeRequired { .. })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absorb_section_keeps_going_on_missing_content() {
        let mut report = DownloadReport::new("@alice");
        absorb_section(&mut report, "stories", Err(Error::NotFound("x".into()))).unwrap();
        absorb_section(&mut report, "highlights", Err(Error::Download("boom".into()))).unwrap();

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].0, "highlights");
    }

    #[test]
    fn test_absorb_section_surfaces_session_loss() {
        let mut report = DownloadReport::new("@alice");
        let result = absorb_section(&mut report, "stories", Err(Error::SessionExpired("gone".into())));
        assert!(matches!(result, Err(Error::SessionExpired(_))));
    }
}
