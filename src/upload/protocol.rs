//! Resumable chunked upload against the rupload endpoints.
//!
//! A [`ChunkedUpload`] drives one [`UploadJob`] under the session that
//! created it. The token set is fixed for the lifetime of the driver: a
//! rejected session or token fails the job with [`Error::SessionExpired`]
//! and the caller restarts the upload under a fresh session.

use std::sync::Arc;

use chrono::Utc;
use indicatif::ProgressBar;
use rand::Rng;
use serde_json::json;
use uuid::Uuid;

use crate::api::endpoints::{
    configure_photo_url, configure_reel_url, photo_rupload_url, video_rupload_url,
};
use crate::api::response::{classify, ResponseClass};
use crate::api::transport::{HttpResponse, Transport};
use crate::api::types::{ConfigureResponse, RuploadResponse};
use crate::config::UploadConfig;
use crate::error::{Error, Result};
use crate::session::{RequestSigner, RequestSpec, Session, TokenSet};
use crate::upload::job::{MediaKind, UploadJob, UploadStatus};
use crate::upload::retry::RetryPolicy;

const IMAGE_COMPRESSION: &str = r#"{"lib_name":"moz","lib_version":"3.1.m","quality":"80"}"#;

/// Drives the upload state machine for jobs of one session.
pub struct ChunkedUpload<'s> {
    transport: Arc<dyn Transport>,
    signer: RequestSigner,
    session: &'s mut Session,
    tokens: TokenSet,
    chunk_size: u64,
    chunk_policy: RetryPolicy,
    finalize_policy: RetryPolicy,
    progress: Option<ProgressBar>,
}

impl<'s> ChunkedUpload<'s> {
    pub fn new(
        transport: Arc<dyn Transport>,
        signer: RequestSigner,
        session: &'s mut Session,
        tokens: TokenSet,
        config: &UploadConfig,
    ) -> Self {
        Self {
            transport,
            signer,
            session,
            tokens,
            chunk_size: config.chunk_size.max(1),
            chunk_policy: RetryPolicy::chunk(config),
            finalize_policy: RetryPolicy::finalize(config),
            progress: None,
        }
    }

    /// Report acknowledged bytes on `bar`.
    pub fn with_progress(mut self, bar: ProgressBar) -> Self {
        self.progress = Some(bar);
        self
    }

    /// Identity of the session new jobs are bound to.
    pub fn session_id(&self) -> Uuid {
        self.session.id
    }

    /// Request an upload slot. Moves the job to `Uploading`.
    ///
    /// A non-zero `offset` in the answer means the platform already holds
    /// part of the entity; sending resumes from there.
    pub async fn initiate(&mut self, job: &mut UploadJob) -> Result<String> {
        if job.status() != UploadStatus::Initiated || job.upload_id.is_some() {
            return Err(Error::Upload(format!(
                "cannot initiate a job that is {}",
                job.status()
            )));
        }

        let result = self.request_slot(job).await;
        if result.is_err() {
            job.fail();
        }
        result
    }

    async fn request_slot(&mut self, job: &mut UploadJob) -> Result<String> {
        self.check_owner(job)?;

        let upload_id = Utc::now().timestamp_millis().to_string();
        job.upload_id = Some(upload_id.clone());

        let spec = RequestSpec::get(rupload_url(job)?)
            .header("X-Instagram-Rupload-Params", rupload_params(job, &upload_id))
            .header("X-Entity-Name", job.entity_name()?)
            .header("X-Entity-Length", job.total_size.to_string())
            .header("X-Entity-Type", job.entity_type());

        let response = expect_ok(self.send(&spec).await?, "initiate", Error::UploadRejected)?;
        let answer: RuploadResponse = response.json().unwrap_or_default();

        let resumed = job.acknowledge(answer.offset.unwrap_or(0));
        if resumed > 0 {
            tracing::info!(
                "Upload {} resumes at byte {} of {}",
                upload_id,
                resumed,
                job.total_size
            );
        }

        job.advance(UploadStatus::Uploading)?;
        Ok(upload_id)
    }

    /// Send the bytes starting at `offset`. Returns the acknowledged offset.
    ///
    /// A chunk that ends at or below the acknowledged offset is already on
    /// the server and is not sent again. Any other offset must equal the
    /// acknowledged one.
    pub async fn send_chunk(
        &mut self,
        job: &mut UploadJob,
        offset: u64,
        bytes: &[u8],
    ) -> Result<u64> {
        if job.status() != UploadStatus::Uploading {
            return Err(Error::Upload(format!(
                "cannot send a chunk while the job is {}",
                job.status()
            )));
        }

        let end = offset + bytes.len() as u64;
        if end > job.total_size {
            return Err(Error::Upload(format!(
                "chunk {}..{} exceeds entity length {}",
                offset, end, job.total_size
            )));
        }
        if end <= job.acked_offset() {
            tracing::debug!("Chunk {}..{} already acknowledged", offset, end);
            return Ok(job.acked_offset());
        }
        if offset != job.acked_offset() {
            return Err(Error::Upload(format!(
                "out-of-order chunk at {} (acknowledged up to {})",
                offset,
                job.acked_offset()
            )));
        }

        job.chunk_sends += 1;
        match self.post_chunk(job, offset, bytes).await {
            Ok(acked) => Ok(acked),
            Err(e) => {
                if !e.is_transient() {
                    job.fail();
                }
                Err(e)
            }
        }
    }

    async fn post_chunk(&mut self, job: &mut UploadJob, offset: u64, bytes: &[u8]) -> Result<u64> {
        self.check_owner(job)?;
        let upload_id = job
            .upload_id
            .clone()
            .ok_or_else(|| Error::Upload("upload has not been initiated".to_string()))?;

        let spec = RequestSpec::post_bytes(rupload_url(job)?, bytes.to_vec())
            .header("X-Instagram-Rupload-Params", rupload_params(job, &upload_id))
            .header("Offset", offset.to_string())
            .header("X-Entity-Name", job.entity_name()?)
            .header("X-Entity-Length", job.total_size.to_string())
            .header("X-Entity-Type", job.entity_type())
            .header("Segment-Start-Offset", offset.to_string())
            .header("Segment-Type", "3");

        let response = expect_ok(self.send(&spec).await?, "chunk", Error::UploadRejected)?;
        let answer: RuploadResponse = response.json().unwrap_or_default();

        let end = offset + bytes.len() as u64;
        let acked = job.acknowledge(answer.offset.unwrap_or(end));
        tracing::debug!("Upload {} acknowledged {}/{}", upload_id, acked, job.total_size);

        if let Some(bar) = &self.progress {
            bar.set_position(acked);
        }
        Ok(acked)
    }

    /// Send every unacknowledged byte of `data`, retrying transient chunk
    /// failures under the chunk policy.
    pub async fn upload_all(&mut self, job: &mut UploadJob, data: &[u8]) -> Result<u64> {
        if data.len() as u64 != job.total_size {
            job.fail();
            return Err(Error::Upload(format!(
                "expected {} bytes, got {}",
                job.total_size,
                data.len()
            )));
        }

        while !job.is_fully_acked() {
            let offset = job.acked_offset();
            let end = (offset + self.chunk_size).min(job.total_size);
            let chunk = &data[offset as usize..end as usize];

            let mut attempt = 1;
            let acked = loop {
                match self.send_chunk(job, offset, chunk).await {
                    Ok(acked) => break acked,
                    Err(e) => match self.chunk_policy.next_delay(attempt, &e) {
                        Some(delay) => {
                            tracing::warn!(
                                "Chunk at {} failed (attempt {}/{}): {}. Retrying in {:?}",
                                offset,
                                attempt,
                                self.chunk_policy.max_attempts,
                                e,
                                delay
                            );
                            tokio::time::sleep(delay).await;
                            attempt += 1;
                        }
                        None => {
                            job.fail();
                            return Err(e);
                        }
                    },
                }
            };

            if acked <= offset {
                job.fail();
                return Err(Error::Upload(format!(
                    "server did not acknowledge the chunk at {}",
                    offset
                )));
            }
        }

        Ok(job.acked_offset())
    }

    /// Publish the uploaded bytes. Moves the job through `Finalizing` to
    /// `Configured`, uploading the cover first for a video with a thumbnail.
    ///
    /// A rejected configure call is retried under the finalize policy; once
    /// the bound is reached the job is `Failed` and the last error returned.
    pub async fn finalize(&mut self, job: &mut UploadJob, thumbnail: Option<&[u8]>) -> Result<String> {
        if job.status() != UploadStatus::Uploading || !job.is_fully_acked() {
            let err = Error::Upload(format!(
                "cannot finalize a job that is {} with {}/{} bytes acknowledged",
                job.status(),
                job.acked_offset(),
                job.total_size
            ));
            job.fail();
            return Err(err);
        }
        job.advance(UploadStatus::Finalizing)?;

        match (job.kind, thumbnail) {
            (MediaKind::Video, Some(cover)) => {
                if let Err(e) = self.upload_cover(job, cover).await {
                    job.fail();
                    return Err(e);
                }
            }
            (MediaKind::Photo, Some(_)) => {
                tracing::warn!("Ignoring thumbnail for a photo upload");
            }
            _ => {}
        }

        let mut attempt = 1;
        loop {
            job.configure_calls += 1;
            match self.configure(job).await {
                Ok(media_id) => {
                    job.advance(UploadStatus::Configured)?;
                    return Ok(media_id);
                }
                Err(e) => match self.finalize_policy.next_delay(attempt, &e) {
                    Some(delay) => {
                        tracing::info!(
                            "Configure attempt {}/{} not accepted: {}. Retrying in {:?}",
                            attempt,
                            self.finalize_policy.max_attempts,
                            e,
                            delay
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    }
                    None => {
                        job.fail();
                        return Err(e);
                    }
                },
            }
        }
    }

    async fn upload_cover(&mut self, job: &mut UploadJob, cover: &[u8]) -> Result<()> {
        let mut attempt = 1;
        loop {
            match self.post_cover(job, cover).await {
                Ok(()) => {
                    job.cover_uploaded = true;
                    return Ok(());
                }
                Err(e) => match self.chunk_policy.next_delay(attempt, &e) {
                    Some(delay) => {
                        tracing::warn!("Cover upload failed: {}. Retrying in {:?}", e, delay);
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    }
                    None => return Err(e),
                },
            }
        }
    }

    async fn post_cover(&mut self, job: &UploadJob, cover: &[u8]) -> Result<()> {
        self.check_owner(job)?;
        let upload_id = job
            .upload_id
            .clone()
            .ok_or_else(|| Error::Upload("upload has not been initiated".to_string()))?;

        let params = json!({
            "media_type": MediaKind::Photo.rupload_type(),
            "upload_id": upload_id,
            "upload_media_height": job.meta.height,
            "upload_media_width": job.meta.width,
            "xsharing_user_ids": "[]",
            "image_compression": IMAGE_COMPRESSION,
            "is_clips_cover": true,
        });

        let entity = job.entity_name()?;
        let spec = RequestSpec::post_bytes(photo_rupload_url(&entity), cover.to_vec())
            .header("X-Instagram-Rupload-Params", params.to_string())
            .header("Offset", "0")
            .header("X-Entity-Name", entity)
            .header("X-Entity-Length", cover.len().to_string())
            .header("X-Entity-Type", MediaKind::Photo.default_mime());

        expect_ok(self.send(&spec).await?, "cover upload", Error::UploadRejected)?;
        tracing::info!("Cover uploaded for {}", upload_id);
        Ok(())
    }

    async fn configure(&mut self, job: &UploadJob) -> Result<String> {
        self.check_owner(job)?;
        let upload_id = job
            .upload_id
            .clone()
            .ok_or_else(|| Error::Upload("upload has not been initiated".to_string()))?;

        let spec = match job.kind {
            MediaKind::Photo => {
                RequestSpec::post_form(configure_photo_url(), photo_configure_form(job, &upload_id))
            }
            MediaKind::Video => {
                RequestSpec::post_form(configure_reel_url(), reel_configure_form(job, &upload_id))
            }
        };

        let response = expect_ok(self.send(&spec).await?, "configure", Error::Configuration)?;
        let answer: ConfigureResponse = response
            .json()
            .map_err(|e| Error::Configuration(e.to_string()))?;

        let accepted = answer.status.as_deref() == Some("ok")
            && answer.message.as_deref() != Some("media_needs_reupload");
        if !accepted {
            return Err(Error::Configuration(
                answer
                    .error_title
                    .or(answer.message)
                    .unwrap_or_else(|| "configure was not accepted".to_string()),
            ));
        }

        Ok(answer
            .media
            .and_then(|media| media.pk.or(media.id).or(media.code))
            .unwrap_or(upload_id))
    }

    fn check_owner(&self, job: &UploadJob) -> Result<()> {
        if job.session != self.session.id || !self.session.valid {
            return Err(Error::SessionExpired(format!(
                "upload slot belongs to session {}, which is no longer current",
                job.session
            )));
        }
        Ok(())
    }

    async fn send(&mut self, spec: &RequestSpec) -> Result<ResponseClass> {
        let request = self.signer.prepare(&*self.session, &self.tokens, spec)?;
        tracing::debug!("{} {} ({} bytes)", request.method, request.url, request.body.byte_len());

        let response = self.transport.execute(request).await?;
        if !response.cookies.is_empty() {
            self.session.absorb(response.cookies.clone());
        }
        Ok(classify(response))
    }
}

fn expect_ok(class: ResponseClass, step: &str, rejected: fn(String) -> Error) -> Result<HttpResponse> {
    match class {
        ResponseClass::Ok(response) => Ok(response),
        ResponseClass::NeedsReauth | ResponseClass::NeedsTokenRefresh => Err(Error::SessionExpired(
            format!("{} was refused for the upload session", step),
        )),
        ResponseClass::Transient(reason) => Err(Error::Transient(reason)),
        ResponseClass::Rejected(reason) => Err(rejected(reason)),
        ResponseClass::Fatal(reason) => Err(Error::Upload(format!("{}: {}", step, reason))),
    }
}

fn rupload_url(job: &UploadJob) -> Result<String> {
    let entity = job.entity_name()?;
    Ok(match job.kind {
        MediaKind::Photo => photo_rupload_url(&entity),
        MediaKind::Video => video_rupload_url(&entity),
    })
}

fn rupload_params(job: &UploadJob, upload_id: &str) -> String {
    let mut params = json!({
        "media_type": job.kind.rupload_type(),
        "upload_id": upload_id,
        "upload_media_height": job.meta.height,
        "upload_media_width": job.meta.width,
        "xsharing_user_ids": "[]",
    });

    match job.kind {
        MediaKind::Photo => {
            params["image_compression"] = json!(IMAGE_COMPRESSION);
        }
        MediaKind::Video => {
            params["upload_media_duration_ms"] = json!(job.meta.duration_ms);
            params["is_clips_video"] = json!(true);
        }
    }

    params.to_string()
}

fn photo_configure_form(job: &UploadJob, upload_id: &str) -> Vec<(String, String)> {
    [
        ("upload_id", upload_id.to_string()),
        ("caption", job.caption.clone()),
        ("usertags", "[]".to_string()),
        ("custom_accessibility_caption", String::new()),
        ("disable_comments", "0".to_string()),
        ("like_and_view_counts_disabled", "0".to_string()),
        ("source_type", "library".to_string()),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

fn reel_configure_form(job: &UploadJob, upload_id: &str) -> Vec<(String, String)> {
    let now = Utc::now().timestamp();
    let mut rng = rand::thread_rng();
    let length = job.meta.duration_secs().to_string();
    let clips_metadata = json!({
        "clips_segments": [{"length": job.meta.duration_secs(), "source_type": "4"}],
        "audio_type": "original",
        "camera_position": "unknown",
        "effect_id": "0",
        "filter_id": "0",
    });
    let extra = json!({
        "source_width": job.meta.width,
        "source_height": job.meta.height,
    });

    [
        ("upload_id", upload_id.to_string()),
        ("caption", job.caption.clone()),
        ("source_type", "4".to_string()),
        ("share_to_feed", "1".to_string()),
        ("audience", "public".to_string()),
        ("disable_comments", "0".to_string()),
        ("like_and_view_counts_disabled", "0".to_string()),
        ("only_me", "0".to_string()),
        ("device_timestamp", upload_id.to_string()),
        ("creation_logger_session_id", uuid::Uuid::new_v4().to_string()),
        (
            "story_media_creation_date",
            (now - rng.gen_range(11..=20)).to_string(),
        ),
        ("client_shared_at", (now - rng.gen_range(3..=10)).to_string()),
        ("client_timestamp", now.to_string()),
        ("length", length.clone()),
        ("clips_length", length),
        ("clips_metadata", clips_metadata.to_string()),
        ("audio_metadata", "{}".to_string()),
        ("audio_muted", "false".to_string()),
        ("filter_type", "0".to_string()),
        ("poster_frame_index", "0".to_string()),
        ("video_result", "deprecated".to_string()),
        ("is_clips_video", "1".to_string()),
        ("product_type", "clips".to_string()),
        ("workflow", "clips".to_string()),
        ("mas_opt_in", "enabled".to_string()),
        ("timezone_offset", "0".to_string()),
        ("video_subtitles_enabled", "0".to_string()),
        ("video_subtitles_locale", "en_US".to_string()),
        ("extra", extra.to_string()),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::transport::RequestBody;
    use crate::config::loader::default_user_agents;
    use crate::session::cookies::{Cookie, CookieSet, SESSION_COOKIE};
    use crate::test_support::ScriptedTransport;
    use crate::upload::job::MediaMeta;

    fn session() -> Session {
        let mut cookies = CookieSet::new();
        cookies.insert(Cookie::new(SESSION_COOKIE, "sess"));
        cookies.insert(Cookie::new("csrftoken", "csrf"));
        Session::new("alice", cookies, Some("42".into()), "DEVICE".into())
    }

    fn config() -> UploadConfig {
        UploadConfig {
            chunk_size: 4,
            chunk_attempts: 3,
            finalize_attempts: 3,
            backoff_initial_ms: 1,
            backoff_max_ms: 2,
            finalize_interval_ms: 1,
        }
    }

    fn video_job(session: &Session, size: u64) -> UploadJob {
        UploadJob::new(
            "clip.mp4",
            MediaKind::Video,
            "caption",
            size,
            MediaMeta {
                width: 720,
                height: 1280,
                duration_ms: 3000,
            },
            session.id,
        )
    }

    fn ack(offset: u64) -> crate::api::transport::HttpResponse {
        ScriptedTransport::json(200, &format!(r#"{{"status":"ok","offset":{}}}"#, offset))
    }

    fn driver<'s>(
        transport: Arc<ScriptedTransport>,
        session: &'s mut Session,
    ) -> ChunkedUpload<'s> {
        let tokens = TokenSet::for_test(session);
        ChunkedUpload::new(
            transport,
            RequestSigner::new("1", default_user_agents()),
            session,
            tokens,
            &config(),
        )
    }

    #[tokio::test]
    async fn test_initiate_seeds_resume_offset() {
        let transport = Arc::new(ScriptedTransport::new(vec![ack(4)]));
        let mut session = session();
        let mut job = video_job(&session, 10);
        let mut upload = driver(transport.clone(), &mut session);

        let upload_id = upload.initiate(&mut job).await.unwrap();

        assert_eq!(job.status(), UploadStatus::Uploading);
        assert_eq!(job.acked_offset(), 4);
        let request = &transport.requests()[0];
        assert!(request.url.ends_with(&format!("/rupload_igvideo/fb_uploader_{}", upload_id)));
        let params = request.headers["x-instagram-rupload-params"].to_str().unwrap();
        assert!(params.contains(r#""is_clips_video":true"#));
        assert_eq!(request.headers["x-entity-type"], "video/mp4");
    }

    #[tokio::test]
    async fn test_initiate_rejection_fails_job() {
        let transport = Arc::new(ScriptedTransport::new(vec![ScriptedTransport::json(
            400,
            r#"{"status":"fail","message":"unsupported format"}"#,
        )]));
        let mut session = session();
        let mut job = video_job(&session, 10);
        let mut upload = driver(transport, &mut session);

        let err = upload.initiate(&mut job).await.unwrap_err();
        assert!(matches!(err, Error::UploadRejected(_)));
        assert_eq!(job.status(), UploadStatus::Failed);
    }

    #[tokio::test]
    async fn test_chunk_below_ack_is_not_resent() {
        let transport = Arc::new(ScriptedTransport::new(vec![ack(8)]));
        let mut session = session();
        let mut job = video_job(&session, 10);
        let mut upload = driver(transport.clone(), &mut session);
        upload.initiate(&mut job).await.unwrap();

        let acked = upload.send_chunk(&mut job, 4, &[0; 4]).await.unwrap();
        assert_eq!(acked, 8);
        assert_eq!(job.chunk_sends, 0);
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_out_of_order_chunk_is_refused() {
        let transport = Arc::new(ScriptedTransport::new(vec![ack(0)]));
        let mut session = session();
        let mut job = video_job(&session, 10);
        let mut upload = driver(transport, &mut session);
        upload.initiate(&mut job).await.unwrap();

        let err = upload.send_chunk(&mut job, 4, &[0; 4]).await.unwrap_err();
        assert!(matches!(err, Error::Upload(_)));
        assert_eq!(job.acked_offset(), 0);
    }

    #[tokio::test]
    async fn test_transient_retry_keeps_offset_monotonic() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            ack(0),
            ack(4),
            ScriptedTransport::json(503, "busy"),
            ack(8),
            ack(10),
        ]));
        let mut session = session();
        let mut job = video_job(&session, 10);
        let data: Vec<u8> = (0..10).collect();
        let mut upload = driver(transport.clone(), &mut session);

        upload.initiate(&mut job).await.unwrap();
        let acked = upload.upload_all(&mut job, &data).await.unwrap();

        assert_eq!(acked, 10);
        assert_eq!(job.chunk_sends, 4);

        let offsets: Vec<String> = transport
            .requests()
            .iter()
            .filter_map(|r| r.headers.get("offset"))
            .map(|v| v.to_str().unwrap().to_string())
            .collect();
        assert_eq!(offsets, vec!["0", "4", "4", "8"]);

        let retried = &transport.requests()[3];
        match &retried.body {
            RequestBody::Bytes(bytes) => assert_eq!(bytes, &vec![4, 5, 6, 7]),
            other => panic!("unexpected body {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_chunk_timeout_is_retried_and_upload_configures() {
        let transport = Arc::new(ScriptedTransport::with_outcomes(vec![
            Ok(ack(0)),
            Ok(ack(4)),
            ScriptedTransport::timeout(),
            Ok(ack(8)),
            Ok(ack(10)),
            Ok(ScriptedTransport::json(200, r#"{"status":"ok","media":{"pk":"42"}}"#)),
        ]));
        let mut session = session();
        let mut job = video_job(&session, 10);
        let data: Vec<u8> = (0..10).collect();
        let mut upload = driver(transport.clone(), &mut session);

        upload.initiate(&mut job).await.unwrap();
        upload.upload_all(&mut job, &data).await.unwrap();
        let media_id = upload.finalize(&mut job, None).await.unwrap();

        assert_eq!(media_id, "42");
        assert_eq!(job.status(), UploadStatus::Configured);
        assert_eq!(job.chunk_sends, 4);
        assert_eq!(job.configure_calls, 1);
    }

    #[tokio::test]
    async fn test_session_loss_during_chunk_fails_job() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            ack(0),
            ScriptedTransport::login_redirect(),
        ]));
        let mut session = session();
        let mut job = video_job(&session, 10);
        let mut upload = driver(transport.clone(), &mut session);

        upload.initiate(&mut job).await.unwrap();
        let err = upload.upload_all(&mut job, &[0; 10]).await.unwrap_err();

        assert!(matches!(err, Error::SessionExpired(_)));
        assert_eq!(job.status(), UploadStatus::Failed);
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_finalize_retries_until_accepted() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            ack(0),
            ack(4),
            ScriptedTransport::json(200, r#"{"status":"ok"}"#),
            ScriptedTransport::json(
                200,
                r#"{"status":"ok","message":"media_needs_reupload"}"#,
            ),
            ScriptedTransport::json(200, r#"{"status":"ok","media":{"pk":987654321}}"#),
        ]));
        let mut session = session();
        let mut job = video_job(&session, 4);
        let mut upload = driver(transport.clone(), &mut session);

        upload.initiate(&mut job).await.unwrap();
        upload.upload_all(&mut job, &[1, 2, 3, 4]).await.unwrap();
        let media_id = upload.finalize(&mut job, Some(&[0xFF, 0xD8])).await.unwrap();

        assert_eq!(media_id, "987654321");
        assert_eq!(job.status(), UploadStatus::Configured);
        assert!(job.cover_uploaded);
        assert_eq!(job.configure_calls, 2);
        assert_eq!(transport.count_matching("/rupload_igphoto/"), 1);
        assert_eq!(transport.count_matching("configure_to_clips"), 2);
    }

    #[tokio::test]
    async fn test_finalize_before_full_ack_fails() {
        let transport = Arc::new(ScriptedTransport::new(vec![ack(0)]));
        let mut session = session();
        let mut job = video_job(&session, 4);
        let mut upload = driver(transport, &mut session);

        upload.initiate(&mut job).await.unwrap();
        assert!(upload.finalize(&mut job, None).await.is_err());
        assert_eq!(job.status(), UploadStatus::Failed);
        assert_eq!(job.configure_calls, 0);
    }

    #[tokio::test]
    async fn test_job_from_other_session_is_refused() {
        let transport = Arc::new(ScriptedTransport::new(Vec::new()));
        let mut session = session();
        let other = Session::new("alice", session.cookies.clone(), None, "D".into());
        let mut job = video_job(&other, 4);
        let mut upload = driver(transport.clone(), &mut session);

        let err = upload.initiate(&mut job).await.unwrap_err();
        assert!(matches!(err, Error::SessionExpired(_)));
        assert_eq!(job.status(), UploadStatus::Failed);
        assert!(transport.requests().is_empty());
    }

    #[test]
    fn test_photo_params_carry_compression() {
        let session = session();
        let job = UploadJob::new(
            "a.jpg",
            MediaKind::Photo,
            "",
            1,
            MediaMeta {
                width: 1080,
                height: 1350,
                duration_ms: 0,
            },
            session.id,
        );
        let params: serde_json::Value =
            serde_json::from_str(&rupload_params(&job, "123")).unwrap();
        assert_eq!(params["media_type"], 1);
        assert_eq!(params["upload_media_height"], 1350);
        assert!(params["image_compression"].as_str().unwrap().contains("moz"));
        assert!(params.get("is_clips_video").is_none());
    }
}
