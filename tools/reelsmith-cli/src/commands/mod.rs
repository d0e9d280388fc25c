pub mod batch;
pub mod check;
pub mod create;
pub mod presets;
pub mod sources;
pub mod thumbnail;

use reelsmith_common::config::AppConfig;
use reelsmith_preset_model::PresetStore;

/// Open the configured preset store.
pub fn open_store(config: &AppConfig) -> anyhow::Result<PresetStore> {
    PresetStore::open(&config.presets_file).map_err(|e| anyhow::anyhow!("{e}"))
}
