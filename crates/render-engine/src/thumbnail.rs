//! Cached preview frames for source clips.

use std::path::{Path, PathBuf};

use reelsmith_common::error::{ReelsmithError, ReelsmithResult};
use reelsmith_preset_model::Resolution;

use crate::render::Encoder;

/// Timestamp the preview frame is taken from.
pub const THUMBNAIL_AT_SECS: f64 = 1.0;

pub fn default_thumbnail_size() -> Resolution {
    Resolution::new(320, 180)
}

/// `<thumb_dir>/<stem>.jpg`.
pub fn thumbnail_path(video: &Path, thumb_dir: &Path) -> ReelsmithResult<PathBuf> {
    let stem = video
        .file_stem()
        .ok_or_else(|| ReelsmithError::config(format!("Not a video file: {}", video.display())))?;
    let mut name = stem.to_os_string();
    name.push(".jpg");
    Ok(thumb_dir.join(name))
}

/// Return the cached preview of `video`, extracting it first if needed.
pub async fn render_thumbnail(
    encoder: &dyn Encoder,
    video: &Path,
    thumb_dir: &Path,
    size: Resolution,
) -> ReelsmithResult<PathBuf> {
    let target = thumbnail_path(video, thumb_dir)?;
    if target.is_file() {
        tracing::debug!(thumbnail = %target.display(), "Thumbnail cache hit");
        return Ok(target);
    }
    if !video.is_file() {
        return Err(ReelsmithError::not_found(video));
    }

    tokio::fs::create_dir_all(thumb_dir).await?;
    encoder
        .extract_frame(video, THUMBNAIL_AT_SECS, size, &target)
        .await?;
    tracing::info!(input = %video.display(), thumbnail = %target.display(), "Thumbnail written");
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingEncoder;

    #[tokio::test]
    async fn test_thumbnail_is_cached() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("clip.MOV");
        std::fs::write(&video, b"clip").unwrap();
        let thumbs = dir.path().join("thumbnails");
        let encoder = RecordingEncoder::default();

        let first = render_thumbnail(&encoder, &video, &thumbs, default_thumbnail_size())
            .await
            .unwrap();
        assert_eq!(first, thumbs.join("clip.jpg"));
        assert_eq!(std::fs::read(&first).unwrap(), b"frame");

        std::fs::write(&first, b"cached").unwrap();
        let second = render_thumbnail(&encoder, &video, &thumbs, default_thumbnail_size())
            .await
            .unwrap();
        assert_eq!(std::fs::read(second).unwrap(), b"cached");
    }

    #[tokio::test]
    async fn test_missing_video() {
        let dir = tempfile::tempdir().unwrap();
        let err = render_thumbnail(
            &RecordingEncoder::default(),
            &dir.path().join("gone.mp4"),
            dir.path(),
            default_thumbnail_size(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ReelsmithError::NotFound { .. }));
    }
}
