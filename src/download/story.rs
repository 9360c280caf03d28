//! Story downloading.

use crate::api::InstagramClient;
use crate::config::{parse_story_pk, parse_username};
use crate::download::media::download_items;
use crate::download::state::DownloadReport;
use crate::error::{Error, Result};
use crate::media::{parse_story_item, MediaItem};
use crate::session::Session;

/// Download the story named by `url`, or every current story of the user
/// when the URL names none.
pub async fn download_story(
    client: &mut InstagramClient,
    session: &mut Session,
    url: &str,
) -> Result<DownloadReport> {
    let username = parse_username(url)?;
    let items = match parse_story_pk(url)? {
        Some(pk) => single_story(client, session, &username, &pk).await?,
        None => all_stories(client, session, &username).await?,
    };

    if items.is_empty() {
        return Err(Error::NotFound(format!("stories of @{}", username)));
    }

    download_story_items(client, &username, &items).await
}

/// Download every current story of `username`.
pub async fn download_stories(
    client: &mut InstagramClient,
    session: &mut Session,
    username: &str,
) -> Result<DownloadReport> {
    let items = all_stories(client, session, username).await?;
    download_story_items(client, username, &items).await
}

async fn download_story_items(
    client: &InstagramClient,
    username: &str,
    items: &[MediaItem],
) -> Result<DownloadReport> {
    tracing::info!("Downloading {} story item(s) of @{}", items.len(), username);

    let mut report = DownloadReport::new(format!("stories of @{}", username));
    let target_dir = client.config().download_directory();
    download_items(client, items, &target_dir, &mut report).await;
    Ok(report)
}

async fn single_story(
    client: &mut InstagramClient,
    session: &mut Session,
    username: &str,
    pk: &str,
) -> Result<Vec<MediaItem>> {
    match client.story(session, pk).await {
        Ok(item) => Ok(parse_story_item(&item, username).into_iter().collect()),
        Err(Error::NotFound(_)) => {
            tracing::debug!("Story {} not found directly, searching the user's reel", pk);
            let items = all_stories(client, session, username).await?;
            Ok(items.into_iter().filter(|item| item.shortcode == pk).collect())
        }
        Err(e) => Err(e),
    }
}

async fn all_stories(
    client: &mut InstagramClient,
    session: &mut Session,
    username: &str,
) -> Result<Vec<MediaItem>> {
    let user = client.user_info(session, username).await?;
    let stories = client.stories(session, &user.user_id).await?;

    Ok(stories
        .iter()
        .filter_map(|item| parse_story_item(item, username))
        .collect())
}
