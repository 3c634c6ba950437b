//! On-disk preview cache.
//!
//! Decoding and resampling a full-size photo is the expensive part of
//! serving a thumbnail. Rendered previews are stored as PNG files so a
//! second request for the same resource and size is a single file read.
//!
//! ## Layout
//!
//! ```text
//! <cache_dir>/
//! └── <owner>/
//!     └── <sha256(node id)[..16]>/
//!         ├── 200-200-crop.png
//!         └── 400-200-fit.png
//! ```
//!
//! The file name carries the whole request: box size, whether the source was
//! fitted inside the box or cropped to fill it, and `-up` when enlarging was
//! allowed. A bounded preview and a square crop of the same size are
//! separate entries.
//!
//! Entries are keyed by node id rather than path, so renaming or moving a
//! file keeps its previews. Each owner gets its own subtree: previews of a
//! shared file are rendered once per viewer that owns a mount of it.
//!
//! ## Freshness
//!
//! An entry is used only while its modification time is not older than the
//! source resource's. Anything unreadable or undecodable counts as a miss.
//!
//! Writes go to a temporary sibling first and are renamed into place, so a
//! concurrent reader never sees a half-written PNG.

use crate::imaging::PreviewSpec;
use crate::storage::NodeId;
use image::{DynamicImage, ImageFormat};
use sha2::{Digest, Sha256};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

/// Length of the hex id hash used as the per-resource directory name.
const ID_HASH_LEN: usize = 16;

#[derive(Debug, Clone)]
pub struct PreviewCache {
    root: PathBuf,
}

impl PreviewCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of the entry for `id` rendered according to `spec`.
    pub fn entry_path(&self, owner: &str, id: &NodeId, spec: &PreviewSpec) -> PathBuf {
        self.root
            .join(owner_dir(owner))
            .join(hash_id(id))
            .join(entry_name(spec))
    }

    /// Cached preview, if present and at least as new as `source_mtime`.
    pub fn load(
        &self,
        owner: &str,
        id: &NodeId,
        spec: &PreviewSpec,
        source_mtime: u64,
    ) -> Option<DynamicImage> {
        let path = self.entry_path(owner, id, spec);
        let modified = std::fs::metadata(&path).ok()?.modified().ok()?;
        let cached_mtime = modified.duration_since(UNIX_EPOCH).ok()?.as_secs();
        if cached_mtime < source_mtime {
            return None;
        }
        image::open(&path).ok()
    }

    /// Write (or replace) an entry.
    pub fn store(
        &self,
        owner: &str,
        id: &NodeId,
        spec: &PreviewSpec,
        image: &DynamicImage,
    ) -> io::Result<()> {
        let path = self.entry_path(owner, id, spec);
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let tmp = path.with_extension("png.tmp");
        image
            .save_with_format(&tmp, ImageFormat::Png)
            .map_err(io::Error::other)?;
        std::fs::rename(&tmp, &path)
    }

    /// Drop every entry belonging to `owner`.
    pub fn clear(&self, owner: &str) -> io::Result<()> {
        match std::fs::remove_dir_all(self.root.join(owner_dir(owner))) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

/// `{w}-{h}-{fit|crop}[-up].png`
fn entry_name(spec: &PreviewSpec) -> String {
    let mode = if spec.keep_aspect { "fit" } else { "crop" };
    let up = if spec.scale_up { "-up" } else { "" };
    format!("{}-{}-{mode}{up}.png", spec.width, spec.height)
}

/// Short SHA-256 hex digest of a node id.
pub fn hash_id(id: &NodeId) -> String {
    let digest = Sha256::digest(id.as_str().as_bytes());
    let mut hex = format!("{:x}", digest);
    hex.truncate(ID_HASH_LEN);
    hex
}

/// Owner names become single path components.
fn owner_dir(owner: &str) -> String {
    let cleaned: String = owner
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "_".to_string()
    } else {
        cleaned
    }
}

/// Hit/miss counters for one run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u32,
    pub misses: u32,
}

impl CacheStats {
    pub fn total(&self) -> u32 {
        self.hits + self.misses
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hits > 0 {
            write!(
                f,
                "{} cached, {} rendered ({} total)",
                self.hits,
                self.misses,
                self.total()
            )
        } else {
            write!(f, "{} rendered", self.misses)
        }
    }
}
