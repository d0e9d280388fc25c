//! Still-image normalization.
//!
//! Stills of any decodable format are re-encoded to baseline RGB JPEG at a
//! fixed quality before they enter a filter graph, so the engine never sees
//! exotic encodings (CMYK, 16-bit, alpha, progressive oddities).

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::{ImageEncoder, ImageError, ImageResult};
use reelsmith_common::error::{ReelsmithError, ReelsmithResult};

/// Suffix closing the name of every normalized still.
pub const CONVERTED_SUFFIX: &str = "_converted.jpg";

/// JPEG quality used for every normalized still.
pub const JPEG_QUALITY: u8 = 90;

/// Sibling path a still is normalized to: `photo.png` -> `photo_png_converted.jpg`.
///
/// The source extension stays in the name so `cat.png` and `cat.jpg` never
/// share an output.
pub fn converted_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{stem}_{}{CONVERTED_SUFFIX}", ext.to_string_lossy()),
        None => format!("{stem}{CONVERTED_SUFFIX}"),
    };
    path.with_file_name(name)
}

/// Whether `path` is the output of a previous normalization.
pub fn is_converted_artifact(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.to_ascii_lowercase().ends_with(CONVERTED_SUFFIX))
}

/// Decode `path` and write its normalized sibling, returning the new path.
///
/// Blocking; see [`normalize_image`] for the async wrapper.
pub fn normalize_image_blocking(path: &Path) -> ReelsmithResult<PathBuf> {
    let img = image::open(path).map_err(|e| ReelsmithError::conversion(path, e))?;
    let rgb = img.to_rgb8();
    let (width, height) = rgb.dimensions();

    let target = converted_path(path);
    write_or_remove(&target, |writer| {
        JpegEncoder::new_with_quality(writer, JPEG_QUALITY).write_image(
            rgb.as_raw(),
            width,
            height,
            image::ExtendedColorType::Rgb8,
        )
    })
    .map_err(|e| ReelsmithError::conversion(path, e))?;

    tracing::debug!(
        source = %path.display(),
        target = %target.display(),
        width,
        height,
        "Normalized still image"
    );
    Ok(target)
}

/// Create `target` and fill it with `encode`. A failed encode removes the
/// partial file.
fn write_or_remove<F>(target: &Path, encode: F) -> ImageResult<()>
where
    F: FnOnce(&mut BufWriter<File>) -> ImageResult<()>,
{
    let mut writer = BufWriter::new(File::create(target)?);
    let result = encode(&mut writer).and_then(|()| writer.flush().map_err(ImageError::from));
    drop(writer);
    if result.is_err() {
        if let Err(e) = std::fs::remove_file(target) {
            tracing::warn!(target = %target.display(), error = %e, "Failed to remove partial still");
        }
    }
    result
}

/// Normalize on the blocking pool so the async runtime keeps making progress.
pub async fn normalize_image(path: PathBuf) -> ReelsmithResult<PathBuf> {
    let source = path.clone();
    tokio::task::spawn_blocking(move || normalize_image_blocking(&path))
        .await
        .map_err(|e| ReelsmithError::conversion(source, e))?
}
