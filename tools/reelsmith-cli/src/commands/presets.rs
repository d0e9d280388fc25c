//! Preset store management.

use reelsmith_common::config::AppConfig;
use reelsmith_preset_model::Preset;

use crate::PresetAction;

pub fn run(config: &AppConfig, action: PresetAction) -> anyhow::Result<()> {
    let mut store = super::open_store(config)?;

    match action {
        PresetAction::List => {
            if store.is_empty() {
                println!(
                    "No presets in {} (run `reelsmith presets init`)",
                    store.path().display()
                );
                return Ok(());
            }
            for name in store.list() {
                match store.get(&name) {
                    Ok(stored) => println!(
                        "{name:<32} {:<10} updated {}",
                        stored.preset.kind(),
                        stored.updated_at.as_deref().unwrap_or("-")
                    ),
                    Err(e) => println!("{name:<32} [invalid] {e}"),
                }
            }
        }
        PresetAction::Show { name } => {
            let stored = store.get(&name).map_err(|e| anyhow::anyhow!("{e}"))?;
            println!("{}", serde_json::to_string_pretty(&stored.preset)?);
            if let Err(e) = stored.preset.validate() {
                println!("\nWarning: {e}");
            }
        }
        PresetAction::Delete { name } => {
            if store.delete(&name).map_err(|e| anyhow::anyhow!("{e}"))? {
                println!("Deleted preset '{name}'");
            } else {
                anyhow::bail!("No preset named '{name}'");
            }
        }
        PresetAction::Init => {
            let added = store
                .ensure_defaults()
                .map_err(|e| anyhow::anyhow!("{e}"))?;
            if added == 0 {
                println!("Store already has {} preset(s); nothing added", store.len());
            } else {
                println!("Added {added} built-in preset(s) to {}", store.path().display());
            }
        }
        PresetAction::Import { name, file } => {
            let content = std::fs::read_to_string(&file)
                .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", file.display()))?;
            let value: serde_json::Value = serde_json::from_str(&content)?;
            let mut preset = Preset::from_value(value)?;
            preset.set_name(&name);
            store.put(preset).map_err(|e| anyhow::anyhow!("{e}"))?;
            println!("Stored preset '{name}'");
        }
    }

    Ok(())
}
