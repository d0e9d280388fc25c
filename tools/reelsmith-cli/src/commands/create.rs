//! Render videos from one preset.

use std::io::Write;

use reelsmith_common::config::AppConfig;
use reelsmith_preset_model::Preset;
use reelsmith_render_engine::{Composer, EncodeProgress, EncodeProgressCallback};

pub async fn run(
    config: AppConfig,
    seed: Option<u64>,
    name: String,
    count: Option<u32>,
) -> anyhow::Result<()> {
    let store = super::open_store(&config)?;
    let preset = store
        .load(&name)
        .map_err(|e| anyhow::anyhow!("Failed to load preset: {e}"))?;

    let count = count.unwrap_or(match &preset {
        Preset::Standard(standard) => standard.count.max(1),
        Preset::ShortForm(_) => 1,
    });

    println!("Composing {count} video(s) with preset '{name}' ({})", preset.kind());

    let mut composer = Composer::from_config(config, seed);
    for i in 1..=count {
        let progress_cb: EncodeProgressCallback = Box::new(move |p: EncodeProgress| {
            print!(
                "\r  [{i}/{count}] Progress: {:.1}% ({:.1}s encoded)  ",
                p.progress * 100.0,
                p.out_time_secs
            );
            std::io::stdout().flush().ok();
        });

        let output = composer.compose(&preset, Some(progress_cb)).await?;
        println!("\n  Created: {}", output.display());
    }

    Ok(())
}
