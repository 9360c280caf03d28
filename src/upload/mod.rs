//! Photo and reel publishing.
//!
//! This module provides:
//! - Upload job state machine
//! - Chunked rupload protocol with resumable offsets
//! - Bounded retry policies for chunk sends and configure calls
//! - Media probing (dimensions, duration, first-frame thumbnail)

pub mod job;
pub mod probe;
pub mod protocol;
pub mod retry;

pub use job::{MediaKind, MediaMeta, UploadJob, UploadStatus};
pub use protocol::ChunkedUpload;
pub use retry::RetryPolicy;

use std::path::Path;

use crate::api::InstagramClient;
use crate::error::{Error, Result};
use crate::output::create_transfer_bar;
use crate::session::Session;

/// Publish a photo. Returns the new media id.
pub async fn upload_photo(
    client: &mut InstagramClient,
    session: &mut Session,
    path: &Path,
    caption: &str,
) -> Result<String> {
    let data = read_media(path).await?;
    let meta = probe::photo_meta(path)?;
    tracing::info!(
        "Uploading photo {} ({}x{}, {} bytes)",
        path.display(),
        meta.width,
        meta.height,
        data.len()
    );

    publish(client, session, path, MediaKind::Photo, caption, meta, &data, None).await
}

/// Publish a video as a reel. Returns the new media id.
///
/// Without an explicit thumbnail the first frame is extracted with ffmpeg;
/// if that fails the reel is published with the platform's default cover.
pub async fn upload_reel(
    client: &mut InstagramClient,
    session: &mut Session,
    path: &Path,
    thumbnail: Option<&Path>,
    caption: &str,
) -> Result<String> {
    let data = read_media(path).await?;
    let meta = probe::video_meta(path).await;
    tracing::info!(
        "Uploading reel {} ({}x{}, {:.1}s, {} bytes)",
        path.display(),
        meta.width,
        meta.height,
        meta.duration_secs(),
        data.len()
    );

    let cover = match thumbnail {
        Some(thumb) => {
            if !thumb.exists() {
                return Err(Error::Media(format!("thumbnail not found: {}", thumb.display())));
            }
            Some(tokio::fs::read(thumb).await?)
        }
        None => match probe::extract_thumbnail(path, meta.width).await {
            Ok(extracted) => Some(tokio::fs::read(extracted.path()).await?),
            Err(e) => {
                tracing::warn!("No thumbnail extracted ({}); using the default cover", e);
                None
            }
        },
    };

    publish(
        client,
        session,
        path,
        MediaKind::Video,
        caption,
        meta,
        &data,
        cover.as_deref(),
    )
    .await
}

#[allow(clippy::too_many_arguments)]
async fn publish(
    client: &mut InstagramClient,
    session: &mut Session,
    path: &Path,
    kind: MediaKind,
    caption: &str,
    meta: MediaMeta,
    data: &[u8],
    cover: Option<&[u8]>,
) -> Result<String> {
    let show_progress = client.config().options.show_progress;
    let mut upload = client.upload_session(session).await?;
    let mut job = UploadJob::new(
        path,
        kind,
        caption,
        data.len() as u64,
        meta,
        upload.session_id(),
    );

    let bar = show_progress.then(|| create_transfer_bar(job.total_size));
    if let Some(bar) = &bar {
        upload = upload.with_progress(bar.clone());
    }

    let result = run(&mut upload, &mut job, data, cover).await;
    drop(upload);

    if let Some(bar) = bar {
        bar.finish_and_clear();
    }
    if result.is_err() {
        job.fail();
    }
    tracing::info!(
        "Upload of {} ended {} after {} chunk sends and {} configure calls",
        path.display(),
        job.status(),
        job.chunk_sends,
        job.configure_calls
    );

    client.settle(session, &result);
    result
}

async fn run(
    upload: &mut ChunkedUpload<'_>,
    job: &mut UploadJob,
    data: &[u8],
    cover: Option<&[u8]>,
) -> Result<String> {
    upload.initiate(job).await?;
    upload.upload_all(job, data).await?;
    upload.finalize(job, cover).await
}

async fn read_media(path: &Path) -> Result<Vec<u8>> {
    if !path.is_file() {
        return Err(Error::Media(format!("file not found: {}", path.display())));
    }
    let data = tokio::fs::read(path).await?;
    if data.is_empty() {
        return Err(Error::Media(format!("{} is empty", path.display())));
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use tempfile::TempDir;

    use crate::api::HttpResponse;
    use crate::config::Config;
    use crate::test_support::{login_ok_script, ScriptedTransport};

    const MIB: u64 = 1024 * 1024;

    fn config(dir: &TempDir) -> Config {
        let mut config = Config::default();
        config.account.username = "alice".to_string();
        config.account.cookie_file = Some(dir.path().join("cookies.json"));
        config.options.request_delay_min_ms = 0;
        config.options.request_delay_max_ms = 0;
        config.options.show_progress = false;
        config.upload.chunk_size = 4 * MIB;
        config.upload.backoff_initial_ms = 1;
        config.upload.backoff_max_ms = 2;
        config.upload.finalize_interval_ms = 1;
        config
    }

    fn ack(offset: u64) -> HttpResponse {
        ScriptedTransport::json(200, &format!(r#"{{"status":"ok","offset":{}}}"#, offset))
    }

    async fn client_with(
        dir: &TempDir,
        responses: Vec<HttpResponse>,
    ) -> (InstagramClient, Arc<ScriptedTransport>, Session) {
        let mut script = login_ok_script("sess-1");
        script.push(ScriptedTransport::token_page());
        script.extend(responses);
        let transport = Arc::new(ScriptedTransport::new(script));
        let mut client = InstagramClient::with_transport(config(dir), transport.clone()).unwrap();
        let session = client.login("alice", "pw").await.unwrap();
        (client, transport, session)
    }

    #[tokio::test]
    async fn test_reel_upload_resends_only_the_failed_chunk() {
        let dir = TempDir::new().unwrap();
        let video = dir.path().join("clip.mp4");
        let cover = dir.path().join("cover.jpg");
        std::fs::write(&video, vec![7u8; (10 * MIB) as usize]).unwrap();
        std::fs::write(&cover, [0xFF, 0xD8, 0xFF]).unwrap();

        let (mut client, transport, mut session) = client_with(
            &dir,
            vec![
                ack(0),
                ack(4 * MIB),
                ScriptedTransport::json(503, "busy"),
                ack(8 * MIB),
                ack(10 * MIB),
                ScriptedTransport::json(200, r#"{"status":"ok"}"#),
                ScriptedTransport::json(200, r#"{"status":"ok","media":{"pk":"555"}}"#),
            ],
        )
        .await;

        let media_id = upload_reel(&mut client, &mut session, &video, Some(cover.as_path()), "hi")
            .await
            .unwrap();

        assert_eq!(media_id, "555");
        // initiate plus four chunk sends, the second chunk twice
        assert_eq!(transport.count_matching("/rupload_igvideo/"), 5);
        assert_eq!(transport.count_matching("/rupload_igphoto/"), 1);
        assert_eq!(transport.count_matching("configure_to_clips"), 1);
        assert_eq!(transport.login_calls(), 1);
        assert!(client.sessions().current().is_some());
    }

    #[tokio::test]
    async fn test_photo_upload_gives_up_after_bounded_finalize_attempts() {
        let dir = TempDir::new().unwrap();
        let photo = dir.path().join("photo.png");
        image::RgbImage::new(4, 3).save(&photo).unwrap();
        let size = std::fs::metadata(&photo).unwrap().len();

        let not_ready = || {
            ScriptedTransport::json(
                200,
                r#"{"status":"fail","message":"Transcode not finished yet."}"#,
            )
        };
        let (mut client, transport, mut session) = client_with(
            &dir,
            vec![ack(0), ack(size), not_ready(), not_ready(), not_ready()],
        )
        .await;

        let err = upload_photo(&mut client, &mut session, &photo, "caption")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Configuration(_)));
        assert_eq!(transport.count_matching("/web/create/configure/"), 3);
        // a refused configure is not a session loss
        assert!(client.sessions().current().is_some());
    }

    #[tokio::test]
    async fn test_missing_media_is_refused_before_any_request() {
        let dir = TempDir::new().unwrap();
        let (mut client, transport, mut session) = client_with(&dir, Vec::new()).await;
        let before = transport.requests().len();

        let err = upload_photo(&mut client, &mut session, &dir.path().join("nope.jpg"), "")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Media(_)));
        assert_eq!(transport.requests().len(), before);
    }
}
