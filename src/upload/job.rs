//! Upload job state.

use std::fmt;
use std::path::PathBuf;

use uuid::Uuid;

use crate::error::{Error, Result};

/// Kind of media being published.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Photo,
    Video,
}

impl MediaKind {
    /// `media_type` value of the rupload parameters.
    pub fn rupload_type(&self) -> u8 {
        match self {
            MediaKind::Photo => 1,
            MediaKind::Video => 2,
        }
    }

    pub fn default_mime(&self) -> &'static str {
        match self {
            MediaKind::Photo => "image/jpeg",
            MediaKind::Video => "video/mp4",
        }
    }
}

/// Upload state machine.
///
/// `Initiated -> Uploading -> Finalizing -> Configured`, and any
/// non-terminal state may move to `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStatus {
    Initiated,
    Uploading,
    Finalizing,
    Configured,
    Failed,
}

impl UploadStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, UploadStatus::Configured | UploadStatus::Failed)
    }
}

impl fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UploadStatus::Initiated => "initiated",
            UploadStatus::Uploading => "uploading",
            UploadStatus::Finalizing => "finalizing",
            UploadStatus::Configured => "configured",
            UploadStatus::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Dimensions and duration reported in the rupload parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MediaMeta {
    pub width: u32,
    pub height: u32,
    pub duration_ms: u64,
}

impl MediaMeta {
    pub fn duration_secs(&self) -> f64 {
        self.duration_ms as f64 / 1000.0
    }
}

/// One upload, from initiate to configure.
#[derive(Debug, Clone)]
pub struct UploadJob {
    pub media_path: PathBuf,
    pub kind: MediaKind,
    pub caption: String,
    /// Assigned on initiate.
    pub upload_id: Option<String>,
    pub total_size: u64,
    acked_offset: u64,
    status: UploadStatus,
    /// Session the upload slot belongs to.
    pub session: Uuid,
    pub meta: MediaMeta,
    pub cover_uploaded: bool,
    /// Chunk POSTs issued, retries included.
    pub chunk_sends: u32,
    /// Configure calls issued, retries included.
    pub configure_calls: u32,
}

impl UploadJob {
    pub fn new(
        media_path: impl Into<PathBuf>,
        kind: MediaKind,
        caption: impl Into<String>,
        total_size: u64,
        meta: MediaMeta,
        session: Uuid,
    ) -> Self {
        Self {
            media_path: media_path.into(),
            kind,
            caption: caption.into(),
            upload_id: None,
            total_size,
            acked_offset: 0,
            status: UploadStatus::Initiated,
            session,
            meta,
            cover_uploaded: false,
            chunk_sends: 0,
            configure_calls: 0,
        }
    }

    pub fn status(&self) -> UploadStatus {
        self.status
    }

    /// Highest offset the server has acknowledged.
    pub fn acked_offset(&self) -> u64 {
        self.acked_offset
    }

    pub fn is_fully_acked(&self) -> bool {
        self.acked_offset >= self.total_size
    }

    /// `fb_uploader_<upload id>`.
    pub fn entity_name(&self) -> Result<String> {
        self.upload_id
            .as_ref()
            .map(|id| format!("fb_uploader_{}", id))
            .ok_or_else(|| Error::Upload("upload has not been initiated".to_string()))
    }

    /// MIME type sent as `X-Entity-Type`, guessed from the file extension.
    pub fn entity_type(&self) -> &'static str {
        let prefix = match self.kind {
            MediaKind::Photo => "image/",
            MediaKind::Video => "video/",
        };
        mime_guess::from_path(&self.media_path)
            .first_raw()
            .filter(|mime| mime.starts_with(prefix))
            .unwrap_or_else(|| self.kind.default_mime())
    }

    /// Record a server acknowledgement. The offset never moves backward.
    pub(crate) fn acknowledge(&mut self, offset: u64) -> u64 {
        self.acked_offset = self.acked_offset.max(offset.min(self.total_size));
        self.acked_offset
    }

    /// Move to `next`, rejecting transitions the state machine does not allow.
    pub fn advance(&mut self, next: UploadStatus) -> Result<()> {
        use UploadStatus::*;

        let allowed = matches!(
            (self.status, next),
            (Initiated, Uploading) | (Uploading, Finalizing) | (Finalizing, Configured)
        ) || (next == Failed && !self.status.is_terminal());

        if !allowed {
            return Err(Error::Upload(format!(
                "invalid upload transition {} -> {}",
                self.status, next
            )));
        }

        tracing::info!(
            "Upload {} {} -> {}",
            self.upload_id.as_deref().unwrap_or("(new)"),
            self.status,
            next
        );
        self.status = next;
        Ok(())
    }

    /// Mark the job failed unless it already reached a terminal state.
    pub fn fail(&mut self) {
        if !self.status.is_terminal() {
            let _ = self.advance(UploadStatus::Failed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> UploadJob {
        UploadJob::new(
            "clip.mp4",
            MediaKind::Video,
            "hello",
            100,
            MediaMeta {
                width: 720,
                height: 1280,
                duration_ms: 5000,
            },
            Uuid::new_v4(),
        )
    }

    #[test]
    fn test_happy_path_transitions() {
        let mut job = job();
        job.advance(UploadStatus::Uploading).unwrap();
        job.advance(UploadStatus::Finalizing).unwrap();
        job.advance(UploadStatus::Configured).unwrap();
        assert_eq!(job.status(), UploadStatus::Configured);
    }

    #[test]
    fn test_invalid_transitions() {
        let mut job = job();
        assert!(job.advance(UploadStatus::Finalizing).is_err());
        job.advance(UploadStatus::Uploading).unwrap();
        assert!(job.advance(UploadStatus::Configured).is_err());
    }

    #[test]
    fn test_terminal_states_stick() {
        let mut job = job();
        job.fail();
        assert_eq!(job.status(), UploadStatus::Failed);
        assert!(job.advance(UploadStatus::Uploading).is_err());
        job.fail();
        assert_eq!(job.status(), UploadStatus::Failed);
    }

    #[test]
    fn test_acknowledge_is_monotonic_and_clamped() {
        let mut job = job();
        assert_eq!(job.acknowledge(40), 40);
        assert_eq!(job.acknowledge(10), 40);
        assert_eq!(job.acknowledge(500), 100);
        assert!(job.is_fully_acked());
    }

    #[test]
    fn test_entity_type_from_extension() {
        let mut job = job();
        assert_eq!(job.entity_type(), "video/mp4");
        job.media_path = PathBuf::from("clip.mov");
        assert_eq!(job.entity_type(), "video/quicktime");
        job.media_path = PathBuf::from("clip.unknown");
        assert_eq!(job.entity_type(), "video/mp4");
    }

    #[test]
    fn test_entity_name_requires_upload_id() {
        let mut job = job();
        assert!(job.entity_name().is_err());
        job.upload_id = Some("1700000000000".into());
        assert_eq!(job.entity_name().unwrap(), "fb_uploader_1700000000000");
    }
}
