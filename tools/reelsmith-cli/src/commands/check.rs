//! Check the encoder engine and preset store.

use reelsmith_common::config::AppConfig;
use reelsmith_render_engine::{Encoder, FfmpegEncoder, FfprobeProbe, MediaProbe};

pub async fn run(config: &AppConfig) -> anyhow::Result<()> {
    println!("Reelsmith System Check");
    println!("{}", "=".repeat(50));

    let mut ready = true;

    let encoder = FfmpegEncoder::from_config(&config.engine);
    match encoder.version().await {
        Ok(version) => println!("[OK] ffmpeg: {version}"),
        Err(e) => {
            ready = false;
            println!("[FAIL] ffmpeg ({}): {e}", config.engine.ffmpeg_path.display());
        }
    }

    let probe = FfprobeProbe::from_config(&config.engine);
    match probe.version().await {
        Ok(version) => println!("[OK] ffprobe: {version}"),
        Err(e) => {
            ready = false;
            println!("[FAIL] ffprobe ({}): {e}", config.engine.ffprobe_path.display());
        }
    }

    match &config.engine.font_file {
        Some(font) if font.is_file() => println!("[OK] Font: {}", font.display()),
        Some(font) => println!("[WARN] Font not found: {}", font.display()),
        None => println!("[OK] Font: engine default"),
    }

    match super::open_store(config) {
        Ok(store) => println!(
            "[OK] Preset store: {} ({} preset(s))",
            store.path().display(),
            store.len()
        ),
        Err(e) => {
            ready = false;
            println!("[FAIL] Preset store: {e}");
        }
    }

    let media_root = &config.media_root;
    if media_root.is_dir() {
        println!("[OK] Media root: {}", media_root.display());
    } else {
        println!("[WARN] Media root missing: {}", media_root.display());
    }

    println!();
    if ready {
        println!("Reelsmith is ready.");
    } else {
        println!("Some required components are missing. See above.");
    }

    Ok(())
}
