//! Preview frame extraction.

use std::path::PathBuf;

use reelsmith_common::config::AppConfig;
use reelsmith_render_engine::{default_thumbnail_size, render_thumbnail, FfmpegEncoder};

pub async fn run(config: &AppConfig, video: PathBuf, out: Option<PathBuf>) -> anyhow::Result<()> {
    let thumb_dir = out.unwrap_or_else(|| {
        video
            .parent()
            .map(|p| p.join("thumbnails"))
            .unwrap_or_else(|| PathBuf::from("thumbnails"))
    });

    let encoder = FfmpegEncoder::from_config(&config.engine);
    let path = render_thumbnail(&encoder, &video, &thumb_dir, default_thumbnail_size()).await?;
    println!("{}", path.display());
    Ok(())
}
