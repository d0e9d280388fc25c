//! Source media enumeration.

use reelsmith_common::config::AppConfig;
use reelsmith_media_core::{list_files, list_subdirectories};
use reelsmith_preset_model::default_video_extensions;

use crate::SourceAction;

/// Directories that never hold source media.
const IGNORED_DIRS: &[&str] = &[
    "node_modules",
    "public",
    "editedvideos",
    "editedtiktok",
    "thumbnails",
    "target",
];

pub fn run(config: &AppConfig, action: SourceAction) -> anyhow::Result<()> {
    match action {
        SourceAction::Users => {
            let dir = config.resolve(&config.source_videos_dir);
            let users = list_subdirectories(&dir, IGNORED_DIRS)?;
            if users.is_empty() {
                println!("No users under {}", dir.display());
            }
            for user in users {
                let clips = list_files(&dir.join(&user), &default_video_extensions())?;
                println!("{user:<32} {} clip(s)", clips.len());
            }
        }
        SourceAction::Videos { user } => {
            let dir = config.resolve(&config.source_videos_dir).join(&user);
            for clip in list_files(&dir, &default_video_extensions())? {
                let size = std::fs::metadata(&clip).map(|m| m.len()).unwrap_or(0);
                let name = clip
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                println!("{name:<48} {:>8.1} MB", size as f64 / 1_048_576.0);
            }
        }
        SourceAction::Folders => {
            for folder in list_subdirectories(&config.media_root, IGNORED_DIRS)? {
                println!("{folder}");
            }
        }
    }
    Ok(())
}
