//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Preset store file (JSON object keyed by preset name).
    pub presets_file: PathBuf,

    /// Base directory that relative media directories resolve against.
    pub media_root: PathBuf,

    /// Where multi-segment renders are written.
    pub standard_output_dir: PathBuf,

    /// Where short-form renders are written.
    pub short_form_output_dir: PathBuf,

    /// Downloaded source clips, one subdirectory per user.
    pub source_videos_dir: PathBuf,

    /// Shared pool of overlay images for short-form renders.
    pub overlay_images_dir: PathBuf,

    /// Encoder engine binaries.
    pub engine: EngineConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// External encoding engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// ffmpeg binary (name on PATH or absolute path).
    pub ffmpeg_path: PathBuf,

    /// ffprobe binary (name on PATH or absolute path).
    pub ffprobe_path: PathBuf,

    /// Font file handed to drawtext. `None` lets the engine pick its default.
    pub font_file: Option<PathBuf>,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "reelsmith=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            presets_file: PathBuf::from("video-presets.json"),
            media_root: PathBuf::from("."),
            standard_output_dir: PathBuf::from("editedvideos"),
            short_form_output_dir: PathBuf::from("editedtiktok"),
            source_videos_dir: PathBuf::from("tiktokvideos"),
            overlay_images_dir: PathBuf::from("tiktokimages"),
            engine: EngineConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            ffprobe_path: PathBuf::from("ffprobe"),
            font_file: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        Self::load_from(&config_file_path())
    }

    /// Load config from an explicit path, falling back to defaults.
    pub fn load_from(config_path: &Path) -> Self {
        if config_path.exists() {
            match std::fs::read_to_string(config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        self.save_to(&config_file_path())
    }

    /// Save config to an explicit path.
    pub fn save_to(&self, config_path: &Path) -> Result<(), std::io::Error> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }

    /// Resolve a possibly-relative media path against `media_root`.
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.media_root.join(path)
        }
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("reelsmith").join("config.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_config_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_from(&dir.path().join("absent.json"));
        assert_eq!(config.standard_output_dir, PathBuf::from("editedvideos"));
        assert_eq!(config.engine.ffmpeg_path, PathBuf::from("ffmpeg"));
    }

    #[test]
    fn test_partial_config_keeps_defaults_for_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"media_root": "/srv/media", "logging": {"json": true}}"#)
            .unwrap();

        let config = AppConfig::load_from(&path);
        assert_eq!(config.media_root, PathBuf::from("/srv/media"));
        assert!(config.logging.json);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.overlay_images_dir, PathBuf::from("tiktokimages"));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let mut config = AppConfig::default();
        config.engine.font_file = Some(PathBuf::from("/fonts/arial.ttf"));
        config.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path);
        assert_eq!(
            loaded.engine.font_file,
            Some(PathBuf::from("/fonts/arial.ttf"))
        );
    }

    #[test]
    fn test_resolve_relative_and_absolute() {
        let config = AppConfig {
            media_root: PathBuf::from("/media"),
            ..AppConfig::default()
        };
        assert_eq!(config.resolve("music"), PathBuf::from("/media/music"));
        assert_eq!(config.resolve("/abs/music"), PathBuf::from("/abs/music"));
    }
}
