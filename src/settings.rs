//! Application settings.
//!
//! Handles loading, validating, and merging `gallery.toml`. These settings
//! govern the gallery engine itself (reserved file names, walk limits,
//! preview sizes); per-album presentation settings live in `gallery.cnf`
//! files inside the content tree and are handled by
//! [`album_config`](crate::album_config).
//!
//! ## Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [files]
//! config_name = "gallery.cnf"    # Per-album config file
//! privacy_sentinel = ".nomedia"  # Presence hides the folder and everything below
//!
//! [walk]
//! max_depth = 64                 # Upper bound on the upward config walk
//!
//! [previews]
//! square_size = 200              # Edge of square thumbnails, before scaling
//! quality = 90                   # JPEG quality for opaque previews
//! cache_dir = ".gallery-cache"   # Preview cache, relative to the content root
//!
//! [media]
//! types = ["image/jpeg", "image/png", "image/webp", "image/tiff"]
//!
//! [processing]
//! max_processes = 4              # Workers for `warm` (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name of the settings file looked up in the content root.
pub const SETTINGS_FILENAME: &str = "gallery.toml";

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Settings validation error: {0}")]
    Validation(String),
}

/// Engine settings loaded from `gallery.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Reserved file names inside the content tree.
    pub files: FilesSettings,
    /// Limits on the upward configuration walk.
    pub walk: WalkSettings,
    /// Preview and thumbnail generation.
    pub previews: PreviewSettings,
    /// Media types offered when a request names none.
    pub media: MediaSettings,
    /// Parallelism for batch commands.
    pub processing: ProcessingSettings,
}

impl Settings {
    /// Validate values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.files.config_name.is_empty() || self.files.config_name.contains('/') {
            return Err(SettingsError::Validation(
                "files.config_name must be a plain file name".into(),
            ));
        }
        if self.files.privacy_sentinel.is_empty() || self.files.privacy_sentinel.contains('/') {
            return Err(SettingsError::Validation(
                "files.privacy_sentinel must be a plain file name".into(),
            ));
        }
        if self.files.config_name == self.files.privacy_sentinel {
            return Err(SettingsError::Validation(
                "files.config_name and files.privacy_sentinel must differ".into(),
            ));
        }
        if self.walk.max_depth == 0 {
            return Err(SettingsError::Validation(
                "walk.max_depth must be at least 1".into(),
            ));
        }
        if self.previews.square_size == 0 {
            return Err(SettingsError::Validation(
                "previews.square_size must be non-zero".into(),
            ));
        }
        if self.previews.quality == 0 || self.previews.quality > 100 {
            return Err(SettingsError::Validation(
                "previews.quality must be 1-100".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilesSettings {
    /// Per-album configuration file name.
    pub config_name: String,
    /// Privacy sentinel; only its presence matters.
    pub privacy_sentinel: String,
}

impl Default for FilesSettings {
    fn default() -> Self {
        Self {
            config_name: "gallery.cnf".to_string(),
            privacy_sentinel: ".nomedia".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WalkSettings {
    /// Containers visited above the start before the walk gives up.
    pub max_depth: usize,
}

impl Default for WalkSettings {
    fn default() -> Self {
        Self { max_depth: 64 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PreviewSettings {
    /// Edge length of square thumbnails at scale 1.
    pub square_size: u32,
    /// Encoding quality for opaque previews (1-100).
    pub quality: u32,
    /// Directory holding generated previews. Relative paths are taken from
    /// the content root.
    pub cache_dir: String,
}

impl PreviewSettings {
    /// Absolute cache location for a tree rooted at `content_root`.
    pub fn cache_path(&self, content_root: &Path) -> PathBuf {
        let dir = Path::new(&self.cache_dir);
        if dir.is_absolute() {
            dir.to_path_buf()
        } else {
            content_root.join(dir)
        }
    }
}

impl Default for PreviewSettings {
    fn default() -> Self {
        Self {
            square_size: 200,
            quality: 90,
            cache_dir: ".gallery-cache".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MediaSettings {
    pub types: Vec<String>,
}

impl Default for MediaSettings {
    fn default() -> Self {
        Self {
            types: ["image/jpeg", "image/png", "image/webp", "image/tiff"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingSettings {
    /// Maximum number of parallel workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(processing: &ProcessingSettings) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    processing
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

/// Stock defaults as a `toml::Value::Table`, the base layer for overrides.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(Settings::default()).unwrap_or(toml::Value::Table(Default::default()))
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load settings from `path`, or stock defaults when the file is absent.
pub fn load_settings(path: &Path) -> Result<Settings, SettingsError> {
    let base = stock_defaults_value();
    let merged = if path.exists() {
        let content = fs::read_to_string(path)?;
        let overlay: toml::Value = toml::from_str(&content)?;
        merge_toml(base, overlay)
    } else {
        base
    };
    let settings: Settings = merged.try_into()?;
    settings.validate()?;
    Ok(settings)
}

/// A fully-commented stock `gallery.toml`, printed by `gen-config`.
pub fn stock_settings_toml() -> &'static str {
    r##"# gallery-tree settings
# =====================
# All settings are optional. Values shown below are the defaults.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Reserved file names inside the content tree
# ---------------------------------------------------------------------------
[files]
# Per-album configuration (YAML): sorting, design, information, features.
config_name = "gallery.cnf"

# Presence of this file hides its folder and everything below it.
privacy_sentinel = ".nomedia"

# ---------------------------------------------------------------------------
# Configuration walk
# ---------------------------------------------------------------------------
[walk]
# Maximum number of parent folders visited when collecting album config.
max_depth = 64

# ---------------------------------------------------------------------------
# Previews
# ---------------------------------------------------------------------------
[previews]
# Edge length of square thumbnails at scale 1.
square_size = 200

# JPEG quality for opaque previews (1-100).
quality = 90

# Where generated previews are cached, relative to the content root.
cache_dir = ".gallery-cache"

# ---------------------------------------------------------------------------
# Media types listed when a request does not name any
# ---------------------------------------------------------------------------
[media]
types = ["image/jpeg", "image/png", "image/webp", "image/tiff"]

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel workers for `warm`.
# Omit to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
