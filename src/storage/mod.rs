//! Storage capability interface.
//!
//! Everything above this module sees the file store only through the
//! [`Storage`] trait: look a node up by id or path, list a container, step to
//! the parent, test for a child by name, read bytes. Nodes are plain values
//! fetched per request and dropped with it; nothing here caches.
//!
//! Two implementations ship with the crate:
//!
//! | Type | Backing |
//! |---|---|
//! | [`LocalStorage`] | a directory on the local filesystem |
//! | [`MemoryStorage`] | an in-memory tree, used by tests and embedders |
//!
//! ## Paths
//!
//! Node paths are relative to the storage root, `/`-separated, without a
//! leading slash. The root itself has the empty path `""`.

mod local;
mod memory;

pub use local::LocalStorage;
pub use memory::MemoryStorage;

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Not a container: {0}")]
    NotAContainer(String),
    #[error("Invalid path: {0}")]
    InvalidPath(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Opaque, stable node identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Container,
    Resource,
}

/// Permission bits as exposed to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permissions(pub u32);

impl Permissions {
    pub const READ: u32 = 1;
    pub const UPDATE: u32 = 2;
    pub const CREATE: u32 = 4;
    pub const DELETE: u32 = 8;
    pub const SHARE: u32 = 16;
    pub const ALL: u32 = 31;

    pub fn read_only() -> Self {
        Self(Self::READ)
    }

    pub fn all() -> Self {
        Self(Self::ALL)
    }

    pub fn contains(self, bits: u32) -> bool {
        self.0 & bits == bits
    }
}

/// Where a node physically lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mount {
    Local,
    /// Backed by an external mount; `available` is false when the backend
    /// cannot currently be reached.
    External { available: bool },
}

/// A folder or file as seen by one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub id: NodeId,
    /// Path relative to the storage root (`""` for the root).
    pub path: String,
    pub name: String,
    pub kind: NodeKind,
    pub media_type: String,
    /// Modification time, seconds since the epoch.
    pub mtime: u64,
    /// Modification marker; changes whenever the node or, for containers,
    /// its direct listing changes.
    pub etag: String,
    pub size: u64,
    pub permissions: Permissions,
    pub readable: bool,
    pub mount: Mount,
}

impl Node {
    pub fn is_container(&self) -> bool {
        self.kind == NodeKind::Container
    }

    pub fn is_resource(&self) -> bool {
        self.kind == NodeKind::Resource
    }

    /// Number of path segments below the storage root.
    pub fn depth(&self) -> usize {
        path_depth(&self.path)
    }
}

/// Media type reported for containers.
pub const CONTAINER_MEDIA_TYPE: &str = "httpd/unix-directory";

/// Minimal capability set the gallery needs from a file store.
///
/// Implementations must be `Sync` so independent requests can share one
/// store from worker threads.
pub trait Storage: Sync {
    /// The topmost container of this store.
    fn root(&self) -> Result<Node, StorageError>;

    /// Look a node up by its id.
    fn node_by_id(&self, id: &NodeId) -> Result<Node, StorageError>;

    /// Look a node up by its root-relative path.
    fn node_at(&self, path: &str) -> Result<Node, StorageError>;

    /// Parent container, or `None` for the root.
    fn parent(&self, node: &Node) -> Result<Option<Node>, StorageError>;

    /// Direct children of a container, sorted by name.
    fn children(&self, container: &Node) -> Result<Vec<Node>, StorageError>;

    /// Direct child by name.
    fn child(&self, container: &Node, name: &str) -> Result<Option<Node>, StorageError>;

    /// Whether a direct child with this name exists.
    fn has_child(&self, container: &Node, name: &str) -> Result<bool, StorageError> {
        Ok(self.child(container, name)?.is_some())
    }

    /// Full contents of a resource.
    fn read(&self, resource: &Node) -> Result<Vec<u8>, StorageError>;
}

/// Normalize a user-supplied path to the storage convention.
///
/// Strips leading/trailing slashes, collapses empty and `.` segments, and
/// rejects `..`.
pub fn normalize_path(path: &str) -> Result<String, StorageError> {
    let mut segments = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return Err(StorageError::InvalidPath(path.to_string())),
            s => segments.push(s),
        }
    }
    Ok(segments.join("/"))
}

/// Number of segments in a normalized path.
pub fn path_depth(path: &str) -> usize {
    if path.is_empty() {
        0
    } else {
        path.split('/').count()
    }
}

/// Whether `path` equals `ancestor` or lies below it.
pub fn is_within(path: &str, ancestor: &str) -> bool {
    ancestor.is_empty()
        || path == ancestor
        || (path.starts_with(ancestor) && path.as_bytes().get(ancestor.len()) == Some(&b'/'))
}

pub(crate) fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}/{name}")
    }
}

pub(crate) fn parent_path(path: &str) -> Option<&str> {
    if path.is_empty() {
        return None;
    }
    Some(path.rsplit_once('/').map(|(parent, _)| parent).unwrap_or(""))
}

const MEDIA_TYPES: &[(&str, &str)] = &[
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
    ("tif", "image/tiff"),
    ("tiff", "image/tiff"),
    ("bmp", "image/bmp"),
    ("svg", "image/svg+xml"),
    ("avif", "image/avif"),
    ("heic", "image/heic"),
    ("mp4", "video/mp4"),
    ("mov", "video/quicktime"),
    ("webm", "video/webm"),
    ("mp3", "audio/mpeg"),
    ("flac", "audio/flac"),
    ("pdf", "application/pdf"),
    ("txt", "text/plain"),
    ("md", "text/markdown"),
    ("cnf", "text/plain"),
];

/// Media type guessed from a file name's extension.
pub fn media_type_for_name(name: &str) -> &'static str {
    let ext = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => ext.to_ascii_lowercase(),
        _ => return "application/octet-stream",
    };
    MEDIA_TYPES
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, t)| *t)
        .unwrap_or("application/octet-stream")
}
