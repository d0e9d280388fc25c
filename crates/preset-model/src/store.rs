//! Preset store: a single JSON object mapping preset names to presets.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use reelsmith_common::error::ReelsmithError;

use crate::preset::{default_short_form_preset, default_standard_preset, Preset};

const CREATED_AT: &str = "createdAt";
const UPDATED_AT: &str = "updatedAt";

/// A preset together with its bookkeeping timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredPreset {
    pub preset: Preset,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// File-backed collection of named presets.
///
/// Records are kept as raw JSON until requested so that one malformed
/// entry does not make the whole file unreadable.
#[derive(Debug, Clone)]
pub struct PresetStore {
    path: PathBuf,
    records: BTreeMap<String, serde_json::Value>,
}

impl PresetStore {
    /// Open the store at `path`. A missing file is an empty store.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PresetError> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "Preset store does not exist yet");
            return Ok(Self {
                path,
                records: BTreeMap::new(),
            });
        }

        let content = std::fs::read_to_string(&path).map_err(|e| PresetError::Io {
            path: path.clone(),
            source: e,
        })?;
        let records = if content.trim().is_empty() {
            BTreeMap::new()
        } else {
            serde_json::from_str(&content).map_err(|e| PresetError::Parse {
                path: path.clone(),
                source: e,
            })?
        };

        Ok(Self { path, records })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Preset names in sorted order.
    pub fn list(&self) -> Vec<String> {
        self.records.keys().cloned().collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.records.contains_key(name)
    }

    /// Decode one preset. The store key wins over any `name` in the record.
    pub fn get(&self, name: &str) -> Result<StoredPreset, PresetError> {
        let value = self.records.get(name).ok_or_else(|| PresetError::Missing {
            name: name.to_string(),
        })?;

        let timestamp = |key: &str| value.get(key).and_then(|v| v.as_str()).map(str::to_string);
        let created_at = timestamp(CREATED_AT);
        let updated_at = timestamp(UPDATED_AT);

        let mut preset = Preset::from_value(value.clone()).map_err(|e| PresetError::Parse {
            path: self.path.clone(),
            source: e,
        })?;
        preset.set_name(name);

        Ok(StoredPreset {
            preset,
            created_at,
            updated_at,
        })
    }

    /// Decode and validate a preset ready for rendering.
    pub fn load(&self, name: &str) -> Result<Preset, PresetError> {
        let stored = self.get(name)?;
        stored.preset.validate()?;
        Ok(stored.preset)
    }

    /// Validate, insert or replace, and persist a preset under its name.
    pub fn put(&mut self, preset: Preset) -> Result<(), PresetError> {
        let name = preset.name().trim().to_string();
        if name.is_empty() {
            return Err(PresetError::invalid("Preset name must not be empty"));
        }
        preset.validate()?;

        let now = reelsmith_common::clock::now_rfc3339();
        let created_at = self
            .records
            .get(&name)
            .and_then(|v| v.get(CREATED_AT))
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| now.clone());

        let mut value = serde_json::to_value(&preset).map_err(|e| PresetError::Parse {
            path: self.path.clone(),
            source: e,
        })?;
        if let Some(obj) = value.as_object_mut() {
            obj.insert(CREATED_AT.to_string(), created_at.into());
            obj.insert(UPDATED_AT.to_string(), now.into());
        }

        tracing::info!(preset = %name, kind = preset.kind(), "Saving preset");
        self.records.insert(name, value);
        self.save()
    }

    /// Remove a preset. Returns whether anything was deleted.
    pub fn delete(&mut self, name: &str) -> Result<bool, PresetError> {
        if self.records.remove(name).is_none() {
            return Ok(false);
        }
        tracing::info!(preset = %name, "Deleted preset");
        self.save()?;
        Ok(true)
    }

    /// Seed the built-in presets into an empty store. Returns how many were added.
    pub fn ensure_defaults(&mut self) -> Result<usize, PresetError> {
        if !self.records.is_empty() {
            return Ok(0);
        }
        let defaults = [default_standard_preset(), default_short_form_preset()];
        let added = defaults.len();
        for preset in defaults {
            self.put(preset)?;
        }
        Ok(added)
    }

    /// Persist the store: write a sibling temp file, then rename over the target.
    pub fn save(&self) -> Result<(), PresetError> {
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |e: std::io::Error| PresetError::Io { path, source: e }
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err(parent))?;
        }

        let json = serde_json::to_string_pretty(&self.records).map_err(|e| PresetError::Parse {
            path: self.path.clone(),
            source: e,
        })?;

        let mut tmp_name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        tmp_name.push(".tmp");
        let tmp_path = self.path.with_file_name(tmp_name);

        std::fs::write(&tmp_path, json).map_err(io_err(&tmp_path))?;
        std::fs::rename(&tmp_path, &self.path).map_err(io_err(&self.path))?;
        Ok(())
    }
}

/// Errors raised by preset parsing, validation and persistence.
#[derive(Debug, thiserror::Error)]
pub enum PresetError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Preset not found: {name}")]
    Missing { name: String },

    #[error("Invalid preset: {message}")]
    Invalid { message: String },
}

impl PresetError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid {
            message: msg.into(),
        }
    }
}

impl From<PresetError> for ReelsmithError {
    fn from(err: PresetError) -> Self {
        match err {
            PresetError::Invalid { message } => ReelsmithError::config(message),
            other => ReelsmithError::preset(other.to_string()),
        }
    }
}
