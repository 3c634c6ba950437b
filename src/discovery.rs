//! Downward media discovery.
//!
//! Two modes share the same filters (availability, privacy sentinel,
//! supported media types):
//!
//! - **Overview** ([`MediaDiscoverer::discover`]) collects just enough
//!   pictures to decorate album tiles. Each folder scan stops after
//!   [`ALBUM_QUOTA`] pictures; sub-albums are expanded below the start folder
//!   always, deeper only while nothing has been found yet.
//! - **Full** ([`MediaDiscoverer::discover_all`]) lists every supported
//!   resource of the subtree for flat views.
//!
//! ```text
//! start/            depth 0: scanned, sub-albums always expanded
//! ├── a.jpg
//! ├── Travel/       depth 1: scanned; expanded only if it had no pictures
//! │   ├── Japan/    depth 2: first sub-album with pictures ends the sweep
//! │   └── Italy/    ... so this one is skipped
//! └── Private/      holds `.nomedia`: never entered
//! ```

use crate::settings::{FilesSettings, WalkSettings};
use crate::storage::{Mount, Node, NodeId, Storage, StorageError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Pictures collected from one folder before its scan ends.
pub const ALBUM_QUOTA: usize = 4;

/// A supported resource found during discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveredMedia {
    pub id: NodeId,
    pub path: String,
    pub media_type: String,
    pub mtime: u64,
    pub etag: String,
    pub size: u64,
}

impl From<&Node> for DiscoveredMedia {
    fn from(node: &Node) -> Self {
        Self {
            id: node.id.clone(),
            path: node.path.clone(),
            media_type: node.media_type.clone(),
            mtime: node.mtime,
            etag: node.etag.clone(),
            size: node.size,
        }
    }
}

/// A container visited during discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveredAlbum {
    pub id: NodeId,
    pub path: String,
    pub mtime: u64,
}

impl From<&Node> for DiscoveredAlbum {
    fn from(node: &Node) -> Self {
        Self {
            id: node.id.clone(),
            path: node.path.clone(),
            mtime: node.mtime,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiscoveryResult {
    pub files: Vec<DiscoveredMedia>,
    pub albums: Vec<DiscoveredAlbum>,
}

/// How much of a subtree a listing covers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListMode {
    /// Quota-bounded sampling for album tiles.
    #[default]
    Overview,
    /// Every supported resource in the subtree.
    Full,
}

/// Set of media types a listing accepts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaTypes(BTreeSet<String>);

impl MediaTypes {
    pub fn new<I, T>(types: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self(types.into_iter().map(Into::into).collect())
    }

    pub fn contains(&self, media_type: &str) -> bool {
        self.0.contains(media_type)
    }

    pub fn insert(&mut self, media_type: impl Into<String>) {
        self.0.insert(media_type.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

pub struct MediaDiscoverer<'a, S: Storage + ?Sized> {
    storage: &'a S,
    sentinel: &'a str,
    media_types: &'a MediaTypes,
    max_depth: usize,
    allow_external_mounts: bool,
}

impl<'a, S: Storage + ?Sized> MediaDiscoverer<'a, S> {
    pub fn new(
        storage: &'a S,
        files: &'a FilesSettings,
        walk: &WalkSettings,
        media_types: &'a MediaTypes,
    ) -> Self {
        Self {
            storage,
            sentinel: &files.privacy_sentinel,
            media_types,
            max_depth: walk.max_depth,
            allow_external_mounts: false,
        }
    }

    /// Admit children living on available external mounts.
    pub fn allow_external_mounts(mut self, allow: bool) -> Self {
        self.allow_external_mounts = allow;
        self
    }

    pub fn run(&self, start: &Node, mode: ListMode) -> Result<DiscoveryResult, StorageError> {
        match mode {
            ListMode::Overview => self.discover(start),
            ListMode::Full => self.discover_all(start),
        }
    }

    /// Quota-bounded discovery for album overviews.
    pub fn discover(&self, start: &Node) -> Result<DiscoveryResult, StorageError> {
        let mut result = DiscoveryResult::default();
        self.search(start, 0, &mut result)?;
        debug!(
            path = %start.path,
            files = result.files.len(),
            albums = result.albums.len(),
            "overview discovery finished"
        );
        Ok(result)
    }

    /// Unbounded discovery of every supported resource below `start`.
    pub fn discover_all(&self, start: &Node) -> Result<DiscoveryResult, StorageError> {
        let mut result = DiscoveryResult::default();
        self.search_all(start, 0, &mut result)?;
        debug!(
            path = %start.path,
            files = result.files.len(),
            albums = result.albums.len(),
            "full discovery finished"
        );
        Ok(result)
    }

    /// Whether a child may be shown at all.
    pub fn is_available(&self, node: &Node) -> bool {
        if !node.readable {
            return false;
        }
        match node.mount {
            Mount::Local => true,
            Mount::External { available } => available && self.allow_external_mounts,
        }
    }

    /// Scan one folder; returns how many pictures it contributed itself.
    fn search(
        &self,
        folder: &Node,
        sub_depth: usize,
        out: &mut DiscoveryResult,
    ) -> Result<usize, StorageError> {
        out.albums.push(DiscoveredAlbum::from(folder));

        let mut found = 0;
        let mut sub_albums = Vec::new();
        for child in self.storage.children(folder)? {
            if !self.is_available(&child) {
                debug!(path = %child.path, "skipping unavailable node");
                continue;
            }
            if child.is_container() {
                if self.is_album_candidate(&child) {
                    sub_albums.push(child);
                }
            } else if found < ALBUM_QUOTA && self.media_types.contains(&child.media_type) {
                out.files.push(DiscoveredMedia::from(&child));
                found += 1;
            }
            // The start folder keeps looking for sub-albums past the quota.
            if found >= ALBUM_QUOTA && sub_depth > 0 {
                break;
            }
        }

        if !sub_albums.is_empty() && (sub_depth == 0 || found == 0) && sub_depth < self.max_depth
        {
            let next = sub_depth + 1;
            for album in &sub_albums {
                let sub_found = match self.search(album, next, out) {
                    Ok(n) => n,
                    Err(e) => {
                        warn!(path = %album.path, error = %e, "skipping sub-album");
                        continue;
                    }
                };
                if next > 1 && sub_found > 0 {
                    break;
                }
            }
        }

        Ok(found)
    }

    fn search_all(
        &self,
        folder: &Node,
        depth: usize,
        out: &mut DiscoveryResult,
    ) -> Result<(), StorageError> {
        out.albums.push(DiscoveredAlbum::from(folder));

        let mut sub_albums = Vec::new();
        for child in self.storage.children(folder)? {
            if !self.is_available(&child) {
                continue;
            }
            if child.is_container() {
                if self.is_album_candidate(&child) {
                    sub_albums.push(child);
                }
            } else if self.media_types.contains(&child.media_type) {
                out.files.push(DiscoveredMedia::from(&child));
            }
        }

        if depth >= self.max_depth {
            warn!(path = %folder.path, "full discovery reached its depth limit");
            return Ok(());
        }
        for album in &sub_albums {
            if let Err(e) = self.search_all(album, depth + 1, out) {
                warn!(path = %album.path, error = %e, "skipping sub-album");
            }
        }
        Ok(())
    }

    fn is_album_candidate(&self, folder: &Node) -> bool {
        match self.storage.has_child(folder, self.sentinel) {
            Ok(hidden) => !hidden,
            Err(e) => {
                warn!(path = %folder.path, error = %e, "cannot check privacy sentinel");
                false
            }
        }
    }
}
