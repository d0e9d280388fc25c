//! Fake engine collaborators for unit tests.

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use reelsmith_common::error::{ReelsmithError, ReelsmithResult};
use reelsmith_preset_model::Resolution;

use crate::render::{
    EncodeProgress, EncodeProgressCallback, Encoder, MediaProbe, RenderRequest,
};

pub(crate) fn write_png(path: &Path) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    image::RgbaImage::from_pixel(4, 4, image::Rgba([200, 40, 40, 255]))
        .save(path)
        .unwrap();
}

/// Records every request and writes a placeholder output file. Requests
/// whose first input name contains `fail_marker` fail like a broken encode.
#[derive(Default)]
pub(crate) struct RecordingEncoder {
    fail_marker: Option<String>,
    requests: Mutex<Vec<RenderRequest>>,
}

impl RecordingEncoder {
    pub fn failing_on(marker: &str) -> Self {
        Self {
            fail_marker: Some(marker.to_string()),
            ..Self::default()
        }
    }

    pub fn requests(&self) -> Vec<RenderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Encoder for RecordingEncoder {
    async fn encode(
        &self,
        request: &RenderRequest,
        progress: Option<EncodeProgressCallback>,
    ) -> ReelsmithResult<()> {
        self.requests.lock().unwrap().push(request.clone());
        if let (Some(marker), Some(first)) = (&self.fail_marker, request.inputs.first()) {
            if first.path.to_string_lossy().contains(marker.as_str()) {
                return Err(ReelsmithError::render("moov atom not found"));
            }
        }
        std::fs::write(&request.output_path, b"encoded")?;
        if let Some(cb) = progress {
            cb(EncodeProgress {
                progress: 1.0,
                out_time_secs: 0.0,
                complete: true,
            });
        }
        Ok(())
    }

    async fn extract_frame(
        &self,
        _video: &Path,
        _at_secs: f64,
        _size: Resolution,
        output: &Path,
    ) -> ReelsmithResult<()> {
        std::fs::write(output, b"frame")?;
        Ok(())
    }

    async fn version(&self) -> ReelsmithResult<String> {
        Ok("fake 1.0".to_string())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// Reports the same duration for every file.
pub(crate) struct StaticProbe(pub f64);

#[async_trait]
impl MediaProbe for StaticProbe {
    async fn duration_secs(&self, _path: &Path) -> ReelsmithResult<f64> {
        Ok(self.0)
    }

    async fn version(&self) -> ReelsmithResult<String> {
        Ok("fake 1.0".to_string())
    }
}
