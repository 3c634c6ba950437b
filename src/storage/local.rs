//! [`Storage`] over a directory on the local filesystem.
//!
//! Node ids are the root-relative paths themselves: stable as long as the
//! file is not moved, and resolvable without an index. Symlinks anywhere on
//! a node's path mark it as an external mount, available while the link
//! target exists.

use super::{
    CONTAINER_MEDIA_TYPE, Mount, Node, NodeId, NodeKind, Permissions, Storage, StorageError,
    join_path, media_type_for_name, normalize_path, parent_path,
};
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        let meta = fs::metadata(&root).map_err(|e| map_io(e, &root.to_string_lossy()))?;
        if !meta.is_dir() {
            return Err(StorageError::NotAContainer(root.display().to_string()));
        }
        Ok(Self { root })
    }

    pub fn root_dir(&self) -> &Path {
        &self.root
    }

    fn absolute(&self, rel: &str) -> PathBuf {
        if rel.is_empty() {
            self.root.clone()
        } else {
            self.root.join(rel)
        }
    }

    fn stat(&self, rel: &str) -> Result<Node, StorageError> {
        let abs = self.absolute(rel);
        let link_meta = fs::symlink_metadata(&abs).map_err(|e| map_io(e, rel))?;
        let mount = self.mount_for(rel);
        let name = rel.rsplit('/').next().unwrap_or_default().to_string();

        // Broken links stay visible as unavailable external resources.
        let meta = match fs::metadata(&abs) {
            Ok(meta) => meta,
            Err(_) if link_meta.file_type().is_symlink() => link_meta,
            Err(e) => return Err(map_io(e, rel)),
        };

        let kind = if meta.is_dir() {
            NodeKind::Container
        } else {
            NodeKind::Resource
        };
        let mtime = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .unwrap_or_default();
        let permissions = if meta.permissions().readonly() {
            Permissions(Permissions::READ | Permissions::SHARE)
        } else {
            Permissions::all()
        };
        let media_type = match kind {
            NodeKind::Container => CONTAINER_MEDIA_TYPE.to_string(),
            NodeKind::Resource => media_type_for_name(&name).to_string(),
        };

        Ok(Node {
            id: NodeId(rel.to_string()),
            path: rel.to_string(),
            name,
            kind,
            media_type,
            mtime: mtime.as_secs(),
            etag: etag(rel, mtime.as_nanos(), meta.len()),
            size: meta.len(),
            permissions,
            readable: can_read(&abs, meta.is_dir()),
            mount,
        })
    }

    fn mount_for(&self, rel: &str) -> Mount {
        let mut current = self.root.clone();
        for segment in rel.split('/').filter(|s| !s.is_empty()) {
            current.push(segment);
            let is_link = fs::symlink_metadata(&current)
                .map(|m| m.file_type().is_symlink())
                .unwrap_or(false);
            if is_link {
                return Mount::External {
                    available: fs::metadata(self.absolute(rel)).is_ok(),
                };
            }
        }
        Mount::Local
    }
}

fn etag(rel: &str, mtime_nanos: u128, size: u64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(rel.as_bytes());
    hasher.update(b"\0");
    hasher.update(mtime_nanos.to_le_bytes());
    hasher.update(size.to_le_bytes());
    format!("{:x}", hasher.finalize())[..16].to_string()
}

/// Whether this process can actually open the entry: listing for folders,
/// reading for files.
fn can_read(abs: &Path, is_dir: bool) -> bool {
    if is_dir {
        fs::read_dir(abs).is_ok()
    } else {
        fs::File::open(abs).is_ok()
    }
}

fn map_io(err: io::Error, path: &str) -> StorageError {
    if err.kind() == io::ErrorKind::NotFound {
        StorageError::NotFound(path.to_string())
    } else {
        StorageError::Io(err)
    }
}

impl Storage for LocalStorage {
    fn root(&self) -> Result<Node, StorageError> {
        self.stat("")
    }

    fn node_by_id(&self, id: &NodeId) -> Result<Node, StorageError> {
        self.node_at(id.as_str())
    }

    fn node_at(&self, path: &str) -> Result<Node, StorageError> {
        self.stat(&normalize_path(path)?)
    }

    fn parent(&self, node: &Node) -> Result<Option<Node>, StorageError> {
        match parent_path(&node.path) {
            Some(parent) => self.stat(parent).map(Some),
            None => Ok(None),
        }
    }

    fn children(&self, container: &Node) -> Result<Vec<Node>, StorageError> {
        if !container.is_container() {
            return Err(StorageError::NotAContainer(container.path.clone()));
        }
        let abs = self.absolute(&container.path);
        let mut names: Vec<String> = fs::read_dir(&abs)
            .map_err(|e| map_io(e, &container.path))?
            .filter_map(|e| e.ok())
            .filter_map(|e| e.file_name().to_str().map(str::to_string))
            .collect();
        names.sort();

        let mut children = Vec::with_capacity(names.len());
        for name in names {
            match self.stat(&join_path(&container.path, &name)) {
                Ok(node) => children.push(node),
                // Raced with a delete; the entry is simply gone.
                Err(StorageError::NotFound(_)) => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(children)
    }

    fn child(&self, container: &Node, name: &str) -> Result<Option<Node>, StorageError> {
        if name.is_empty() || name.contains('/') || name == "." || name == ".." {
            return Ok(None);
        }
        match self.stat(&join_path(&container.path, name)) {
            Ok(node) => Ok(Some(node)),
            Err(StorageError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn has_child(&self, container: &Node, name: &str) -> Result<bool, StorageError> {
        if name.is_empty() || name.contains('/') {
            return Ok(false);
        }
        let abs = self.absolute(&join_path(&container.path, name));
        Ok(fs::symlink_metadata(abs).is_ok())
    }

    fn read(&self, resource: &Node) -> Result<Vec<u8>, StorageError> {
        if !resource.is_resource() {
            return Err(StorageError::InvalidPath(resource.path.clone()));
        }
        fs::read(self.absolute(&resource.path)).map_err(|e| map_io(e, &resource.path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fixture() -> (TempDir, LocalStorage) {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("Travel/Japan")).unwrap();
        fs::write(tmp.path().join("Travel/Japan/001-tokyo.jpg"), b"jpeg").unwrap();
        fs::write(tmp.path().join("Travel/.nomedia"), b"").unwrap();
        let storage = LocalStorage::new(tmp.path()).unwrap();
        (tmp, storage)
    }

    #[test]
    fn root_has_empty_path() {
        let (_tmp, storage) = fixture();
        let root = storage.root().unwrap();
        assert_eq!(root.path, "");
        assert!(root.is_container());
        assert_eq!(root.mount, Mount::Local);
    }

    #[test]
    fn node_at_reports_resource_attributes() {
        let (_tmp, storage) = fixture();
        let node = storage.node_at("Travel/Japan/001-tokyo.jpg").unwrap();
        assert!(node.is_resource());
        assert_eq!(node.media_type, "image/jpeg");
        assert_eq!(node.size, 4);
        assert_eq!(node.id, NodeId("Travel/Japan/001-tokyo.jpg".into()));
        assert!(node.readable);
    }

    #[test]
    fn missing_path_is_not_found() {
        let (_tmp, storage) = fixture();
        assert!(matches!(
            storage.node_at("Nowhere"),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn parent_segments_are_rejected() {
        let (_tmp, storage) = fixture();
        assert!(matches!(
            storage.node_at("Travel/../../etc/passwd"),
            Err(StorageError::InvalidPath(_))
        ));
    }

    #[test]
    fn has_child_sees_hidden_files() {
        let (_tmp, storage) = fixture();
        let travel = storage.node_at("Travel").unwrap();
        assert!(storage.has_child(&travel, ".nomedia").unwrap());
        assert!(!storage.has_child(&travel, "gallery.cnf").unwrap());
    }

    #[test]
    fn children_are_sorted_by_name() {
        let (tmp, storage) = fixture();
        fs::write(tmp.path().join("Travel/Japan/000-first.jpg"), b"x").unwrap();
        let japan = storage.node_at("Travel/Japan").unwrap();
        let names: Vec<String> = storage
            .children(&japan)
            .unwrap()
            .into_iter()
            .map(|n| n.name)
            .collect();
        assert_eq!(names, vec!["000-first.jpg", "001-tokyo.jpg"]);
    }

    #[test]
    fn read_returns_bytes() {
        let (_tmp, storage) = fixture();
        let node = storage.node_at("Travel/Japan/001-tokyo.jpg").unwrap();
        assert_eq!(storage.read(&node).unwrap(), b"jpeg");
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_directory_is_external_mount() {
        let (tmp, storage) = fixture();
        let outside = TempDir::new().unwrap();
        fs::write(outside.path().join("far.jpg"), b"x").unwrap();
        std::os::unix::fs::symlink(outside.path(), tmp.path().join("Linked")).unwrap();

        let linked = storage.node_at("Linked").unwrap();
        assert!(linked.is_container());
        assert_eq!(linked.mount, Mount::External { available: true });

        let far = storage.node_at("Linked/far.jpg").unwrap();
        assert_eq!(far.mount, Mount::External { available: true });
    }

    #[cfg(unix)]
    #[test]
    fn broken_symlink_is_unavailable() {
        let (tmp, storage) = fixture();
        std::os::unix::fs::symlink(tmp.path().join("gone"), tmp.path().join("Dangling")).unwrap();
        let node = storage.node_at("Dangling").unwrap();
        assert_eq!(node.mount, Mount::External { available: false });
        assert!(!node.readable);
    }

    #[cfg(unix)]
    #[test]
    fn locked_file_is_unreadable() {
        use std::os::unix::fs::PermissionsExt;
        let (tmp, storage) = fixture();
        let path = tmp.path().join("Travel/Japan/001-tokyo.jpg");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o000)).unwrap();

        let node = storage.node_at("Travel/Japan/001-tokyo.jpg").unwrap();
        // Privileged users bypass mode bits; the flag follows what open() says.
        assert_eq!(node.readable, fs::File::open(&path).is_ok());
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn unlistable_folder_is_unreadable() {
        use std::os::unix::fs::PermissionsExt;
        let (tmp, storage) = fixture();
        let dir = tmp.path().join("Travel/Japan");
        fs::set_permissions(&dir, fs::Permissions::from_mode(0o300)).unwrap();

        let node = storage.node_at("Travel/Japan").unwrap();
        assert_eq!(node.readable, fs::read_dir(&dir).is_ok());
        fs::set_permissions(&dir, fs::Permissions::from_mode(0o755)).unwrap();
    }
}
