//! Media file downloading.

use std::path::{Path, PathBuf};

use futures::StreamExt;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::api::InstagramClient;
use crate::download::state::DownloadReport;
use crate::error::{Error, Result};
use crate::fs::{ensure_dir, sanitize_filename};
use crate::media::MediaItem;
use crate::output::create_download_bar;

/// Minimum file size to show progress bar (20 MB).
const PROGRESS_THRESHOLD: u64 = 20 * 1024 * 1024;

/// Download a media item to the specified directory.
///
/// Returns `None` when the target file already exists.
pub async fn download_media_item(
    client: &InstagramClient,
    item: &MediaItem,
    target_dir: &Path,
) -> Result<Option<PathBuf>> {
    let filename = sanitize_filename(&item.generate_filename())?;
    let output_path = target_dir.join(&filename);

    if output_path.exists() {
        tracing::debug!("Skipping existing file: {}", output_path.display());
        return Ok(None);
    }

    ensure_dir(target_dir)?;
    tracing::info!("Downloading {} {}", item.media_type.label(), filename);

    download_direct(client, item, &output_path).await?;
    Ok(Some(output_path))
}

/// Download every item into `target_dir`, pacing between files. Failures are
/// recorded in the report and do not stop the batch.
pub async fn download_items(
    client: &InstagramClient,
    items: &[MediaItem],
    target_dir: &Path,
    report: &mut DownloadReport,
) {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            client.pace().await;
        }

        match download_media_item(client, item, target_dir).await {
            Ok(Some(path)) => {
                tracing::info!("Saved {}", path.display());
                report.record_downloaded(item, path);
            }
            Ok(None) => report.record_skipped(),
            Err(e) => {
                tracing::warn!("Failed to download {}: {}", item.generate_filename(), e);
                report.record_failed(item.generate_filename(), e);
            }
        }
    }
}

/// Stream a CDN file to disk. The data lands in a `.part` file first so an
/// interrupted transfer is never mistaken for a finished one.
async fn download_direct(client: &InstagramClient, item: &MediaItem, output_path: &Path) -> Result<()> {
    let response = client
        .media_client()
        .get(&item.url)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(Error::Download(format!(
            "HTTP {} for {}",
            status.as_u16(),
            item.generate_filename()
        )));
    }

    let content_length = response.content_length();
    let show_progress = client.config().options.show_progress
        && content_length.map(|l| l > PROGRESS_THRESHOLD).unwrap_or(false);
    let progress = show_progress.then(|| create_download_bar(content_length.unwrap_or(0)));

    let partial = output_path.with_extension("part");
    let mut file = File::create(&partial).await?;
    let mut stream = response.bytes_stream();
    let mut downloaded: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                drop(file);
                let _ = tokio::fs::remove_file(&partial).await;
                return Err(Error::Download(format!("Stream error: {}", e)));
            }
        };
        file.write_all(&chunk).await?;
        downloaded += chunk.len() as u64;

        if let Some(ref pb) = progress {
            pb.set_position(downloaded);
        }
    }

    file.flush().await?;
    drop(file);
    tokio::fs::rename(&partial, output_path).await?;

    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    Ok(())
}
