//! Media metadata for the rupload parameters.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use serde::Deserialize;
use tokio::process::Command;

use crate::error::{Error, Result};
use crate::upload::job::MediaMeta;

/// Dimensions assumed when a video cannot be probed.
const FALLBACK_VIDEO: MediaMeta = MediaMeta {
    width: 720,
    height: 1280,
    duration_ms: 0,
};

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    duration: Option<String>,
}

/// Width and height of a photo.
pub fn photo_meta(path: &Path) -> Result<MediaMeta> {
    let (width, height) = image::image_dimensions(path)
        .map_err(|e| Error::Media(format!("cannot read {}: {}", path.display(), e)))?;

    Ok(MediaMeta {
        width,
        height,
        duration_ms: 0,
    })
}

/// Width, height and duration of a video via `ffprobe`.
///
/// Falls back to 720x1280 with unknown duration when `ffprobe` is missing or
/// its output cannot be read.
pub async fn video_meta(path: &Path) -> MediaMeta {
    match probe(path).await {
        Ok(meta) => meta,
        Err(e) => {
            tracing::warn!(
                "Could not probe {}: {}. Assuming {}x{}",
                path.display(),
                e,
                FALLBACK_VIDEO.width,
                FALLBACK_VIDEO.height
            );
            FALLBACK_VIDEO
        }
    }
}

async fn probe(path: &Path) -> Result<MediaMeta> {
    let output = Command::new("ffprobe")
        .args(["-v", "quiet", "-print_format", "json", "-show_streams"])
        .arg(path)
        .stderr(Stdio::null())
        .output()
        .await
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FFmpegNotFound
            } else {
                Error::FFmpeg(format!("Failed to run ffprobe: {}", e))
            }
        })?;

    if !output.status.success() {
        return Err(Error::FFmpeg(format!("ffprobe exited with {}", output.status)));
    }

    parse_probe(&output.stdout)
}

fn parse_probe(stdout: &[u8]) -> Result<MediaMeta> {
    let parsed: ProbeOutput = serde_json::from_slice(stdout)?;
    let stream = parsed
        .streams
        .into_iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| Error::Media("no video stream".to_string()))?;

    let duration_ms = stream
        .duration
        .and_then(|d| d.parse::<f64>().ok())
        .map(|secs| (secs * 1000.0).round() as u64)
        .unwrap_or(0);

    Ok(MediaMeta {
        width: stream.width.unwrap_or(FALLBACK_VIDEO.width),
        height: stream.height.unwrap_or(FALLBACK_VIDEO.height),
        duration_ms,
    })
}

/// A first-frame JPEG extracted into the temp directory. Removed on drop.
pub struct ExtractedThumbnail {
    path: PathBuf,
}

impl ExtractedThumbnail {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ExtractedThumbnail {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            tracing::debug!("Could not remove {}: {}", self.path.display(), e);
        } else {
            tracing::debug!("Removed temporary thumbnail {}", self.path.display());
        }
    }
}

/// Extract the first frame of `video` with `ffmpeg`, scaled to `width`.
pub async fn extract_thumbnail(video: &Path, width: u32) -> Result<ExtractedThumbnail> {
    let path = std::env::temp_dir().join(format!("ig_thumb_{}.jpg", uuid::Uuid::new_v4()));
    let scale = format!("scale={}:-2", width.max(2));

    let status = Command::new("ffmpeg")
        .args(["-y", "-i"])
        .arg(video)
        .args(["-ss", "0", "-vframes", "1", "-vf", &scale])
        .arg(&path)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FFmpegNotFound
            } else {
                Error::FFmpeg(format!("Failed to run ffmpeg: {}", e))
            }
        })?;

    if !status.success() || !path.exists() {
        return Err(Error::FFmpeg(format!(
            "thumbnail extraction from {} failed ({})",
            video.display(),
            status
        )));
    }

    tracing::info!("Extracted thumbnail to {}", path.display());
    Ok(ExtractedThumbnail { path })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_probe_output() {
        let json = br#"{"streams":[
            {"codec_type":"audio","duration":"9.98"},
            {"codec_type":"video","width":1080,"height":1920,"duration":"10.010000"}
        ]}"#;
        let meta = parse_probe(json).unwrap();
        assert_eq!(meta.width, 1080);
        assert_eq!(meta.height, 1920);
        assert_eq!(meta.duration_ms, 10010);
    }

    #[test]
    fn test_parse_probe_without_video_stream() {
        assert!(parse_probe(br#"{"streams":[{"codec_type":"audio"}]}"#).is_err());
    }

    #[test]
    fn test_photo_meta_reads_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.png");
        image::RgbImage::new(3, 2).save(&path).unwrap();

        let meta = photo_meta(&path).unwrap();
        assert_eq!((meta.width, meta.height), (3, 2));
    }

    #[test]
    fn test_photo_meta_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.jpg");
        std::fs::write(&path, b"not an image").unwrap();
        assert!(matches!(photo_meta(&path), Err(Error::Media(_))));
    }
}
