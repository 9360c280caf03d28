//! Post and reel downloading.

use crate::api::InstagramClient;
use crate::config::parse_shortcode;
use crate::download::media::download_items;
use crate::download::state::DownloadReport;
use crate::error::{Error, Result};
use crate::media::parse_shortcode_media;
use crate::session::Session;

/// Download every image and video of the post at `url`.
pub async fn download_post(
    client: &mut InstagramClient,
    session: &mut Session,
    url: &str,
) -> Result<DownloadReport> {
    download_shortcode(client, session, url, false).await
}

/// Download the reel at `url`.
pub async fn download_reel(
    client: &mut InstagramClient,
    session: &mut Session,
    url: &str,
) -> Result<DownloadReport> {
    download_shortcode(client, session, url, true).await
}

async fn download_shortcode(
    client: &mut InstagramClient,
    session: &mut Session,
    url: &str,
    as_reel: bool,
) -> Result<DownloadReport> {
    let shortcode = parse_shortcode(url)?;
    tracing::info!("Processing {}: {}", if as_reel { "reel" } else { "post" }, shortcode);

    client.pace().await;
    let media = client.shortcode_media(session, &shortcode).await?;
    let items = parse_shortcode_media(&media, as_reel);
    if items.is_empty() {
        return Err(Error::NotFound(format!("media of {}", shortcode)));
    }
    tracing::info!("Found {} media item(s)", items.len());

    let mut report = DownloadReport::new(format!("post {}", shortcode));
    let target_dir = client.config().download_directory();
    download_items(client, &items, &target_dir, &mut report).await;

    Ok(report)
}
