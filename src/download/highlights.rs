//! Highlight downloading.

use crate::api::InstagramClient;
use crate::download::media::download_items;
use crate::download::state::DownloadReport;
use crate::error::{Error, Result};
use crate::fs::get_highlight_folder;
use crate::media::parse_highlight;
use crate::session::Session;

/// Download every highlight reel of `username`, one folder per reel.
pub async fn download_highlights(
    client: &mut InstagramClient,
    session: &mut Session,
    username: &str,
) -> Result<DownloadReport> {
    let user = client.user_info(session, username).await?;
    if user.is_private {
        return Err(Error::PrivateAccount(username.to_string()));
    }

    let highlights = client.highlights(session, username, &user.user_id).await?;
    if highlights.is_empty() {
        return Err(Error::NotFound(format!("highlights of @{}", username)));
    }

    let mut report = DownloadReport::new(format!("highlights of @{}", username));
    for highlight in &highlights {
        let items = parse_highlight(highlight, username);
        tracing::info!(
            "Downloading {} item(s) from highlight: {}",
            items.len(),
            highlight.title
        );

        let folder = match get_highlight_folder(client.config(), username, &highlight.title) {
            Ok(folder) => folder,
            Err(e) => {
                report.record_failed(highlight.title.clone(), e);
                continue;
            }
        };
        download_items(client, &items, &folder, &mut report).await;
    }

    Ok(report)
}
