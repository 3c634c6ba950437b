//! In-memory tree implementing [`Storage`].
//!
//! Built up with `add_dir`/`add_file`; missing parents are created on the
//! way. Every change bumps the revision of the node and all its ancestors,
//! so container etags move whenever anything below them changes.

use super::{
    CONTAINER_MEDIA_TYPE, Mount, Node, NodeId, NodeKind, Permissions, Storage, StorageError,
    join_path, media_type_for_name, normalize_path, parent_path,
};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone)]
struct Entry {
    id: NodeId,
    kind: NodeKind,
    data: Vec<u8>,
    media_type: String,
    mtime: u64,
    revision: u64,
    permissions: Permissions,
    readable: bool,
    mount: Mount,
}

#[derive(Debug, Clone)]
pub struct MemoryStorage {
    entries: BTreeMap<String, Entry>,
    ids: HashMap<NodeId, String>,
    next_id: u64,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStorage {
    /// An empty store holding only the root container.
    pub fn new() -> Self {
        let mut storage = Self {
            entries: BTreeMap::new(),
            ids: HashMap::new(),
            next_id: 1,
        };
        storage.insert(String::new(), NodeKind::Container, Vec::new());
        storage
    }

    /// Create a container (and any missing parents).
    pub fn add_dir(&mut self, path: &str) -> &mut Self {
        let path = normalize_path(path).unwrap_or_default();
        self.ensure_dir(&path);
        self
    }

    /// Create or replace a resource (creating missing parents).
    pub fn add_file(&mut self, path: &str, data: impl Into<Vec<u8>>) -> &mut Self {
        let path = normalize_path(path).unwrap_or_default();
        if path.is_empty() {
            return self;
        }
        if let Some(parent) = parent_path(&path) {
            self.ensure_dir(parent);
        }
        let data = data.into();
        if let Some(entry) = self.entries.get_mut(&path) {
            entry.data = data;
        } else {
            self.insert(path.clone(), NodeKind::Resource, data);
        }
        self.touch(&path);
        self
    }

    pub fn remove(&mut self, path: &str) -> &mut Self {
        let path = normalize_path(path).unwrap_or_default();
        let doomed: Vec<String> = self
            .entries
            .keys()
            .filter(|p| super::is_within(p, &path) && !p.is_empty())
            .cloned()
            .collect();
        for p in doomed {
            if let Some(entry) = self.entries.remove(&p) {
                self.ids.remove(&entry.id);
            }
        }
        if let Some(parent) = parent_path(&path) {
            self.touch(parent);
        }
        self
    }

    pub fn set_readable(&mut self, path: &str, readable: bool) -> &mut Self {
        self.update(path, |e| e.readable = readable)
    }

    pub fn set_mount(&mut self, path: &str, mount: Mount) -> &mut Self {
        self.update(path, |e| e.mount = mount)
    }

    pub fn set_permissions(&mut self, path: &str, permissions: Permissions) -> &mut Self {
        self.update(path, |e| e.permissions = permissions)
    }

    pub fn set_mtime(&mut self, path: &str, mtime: u64) -> &mut Self {
        self.update(path, |e| e.mtime = mtime)
    }

    pub fn set_media_type(&mut self, path: &str, media_type: &str) -> &mut Self {
        self.update(path, |e| e.media_type = media_type.to_string())
    }

    /// Id of the node at `path`, if present.
    pub fn id_of(&self, path: &str) -> Option<NodeId> {
        let path = normalize_path(path).ok()?;
        self.entries.get(&path).map(|e| e.id.clone())
    }

    fn update(&mut self, path: &str, f: impl FnOnce(&mut Entry)) -> &mut Self {
        let path = normalize_path(path).unwrap_or_default();
        if let Some(entry) = self.entries.get_mut(&path) {
            f(entry);
            self.touch(&path);
        }
        self
    }

    fn ensure_dir(&mut self, path: &str) {
        if self.entries.contains_key(path) {
            return;
        }
        if let Some(parent) = parent_path(path) {
            self.ensure_dir(parent);
        }
        self.insert(path.to_string(), NodeKind::Container, Vec::new());
        self.touch(path);
    }

    fn insert(&mut self, path: String, kind: NodeKind, data: Vec<u8>) {
        let id = NodeId(format!("n{}", self.next_id));
        self.next_id += 1;
        let media_type = match kind {
            NodeKind::Container => CONTAINER_MEDIA_TYPE.to_string(),
            NodeKind::Resource => {
                let name = path.rsplit('/').next().unwrap_or(&path);
                media_type_for_name(name).to_string()
            }
        };
        self.ids.insert(id.clone(), path.clone());
        self.entries.insert(
            path,
            Entry {
                id,
                kind,
                data,
                media_type,
                mtime: 0,
                revision: 0,
                permissions: Permissions::all(),
                readable: true,
                mount: Mount::Local,
            },
        );
    }

    /// Bump the revision of `path` and every ancestor.
    fn touch(&mut self, path: &str) {
        let mut current = Some(path);
        while let Some(p) = current {
            if let Some(entry) = self.entries.get_mut(p) {
                entry.revision += 1;
            }
            current = parent_path(p);
        }
    }

    fn node(&self, path: &str, entry: &Entry) -> Node {
        Node {
            id: entry.id.clone(),
            path: path.to_string(),
            name: path.rsplit('/').next().unwrap_or_default().to_string(),
            kind: entry.kind,
            media_type: entry.media_type.clone(),
            mtime: entry.mtime,
            etag: format!("{}-{}", entry.id, entry.revision),
            size: entry.data.len() as u64,
            permissions: entry.permissions,
            readable: entry.readable,
            mount: entry.mount,
        }
    }

    fn lookup(&self, path: &str) -> Result<Node, StorageError> {
        self.entries
            .get(path)
            .map(|entry| self.node(path, entry))
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }
}

impl Storage for MemoryStorage {
    fn root(&self) -> Result<Node, StorageError> {
        self.lookup("")
    }

    fn node_by_id(&self, id: &NodeId) -> Result<Node, StorageError> {
        let path = self
            .ids
            .get(id)
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;
        self.lookup(path)
    }

    fn node_at(&self, path: &str) -> Result<Node, StorageError> {
        self.lookup(&normalize_path(path)?)
    }

    fn parent(&self, node: &Node) -> Result<Option<Node>, StorageError> {
        match parent_path(&node.path) {
            Some(parent) => self.lookup(parent).map(Some),
            None => Ok(None),
        }
    }

    fn children(&self, container: &Node) -> Result<Vec<Node>, StorageError> {
        let entry = self
            .entries
            .get(&container.path)
            .ok_or_else(|| StorageError::NotFound(container.path.clone()))?;
        if entry.kind != NodeKind::Container {
            return Err(StorageError::NotAContainer(container.path.clone()));
        }
        let mut children: Vec<Node> = self
            .entries
            .iter()
            .filter(|(path, _)| !path.is_empty() && parent_path(path) == Some(container.path.as_str()))
            .map(|(path, entry)| self.node(path, entry))
            .collect();
        children.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(children)
    }

    fn child(&self, container: &Node, name: &str) -> Result<Option<Node>, StorageError> {
        if name.is_empty() || name.contains('/') {
            return Ok(None);
        }
        let path = join_path(&container.path, name);
        Ok(self.entries.get(&path).map(|entry| self.node(&path, entry)))
    }

    fn read(&self, resource: &Node) -> Result<Vec<u8>, StorageError> {
        let entry = self
            .entries
            .get(&resource.path)
            .ok_or_else(|| StorageError::NotFound(resource.path.clone()))?;
        if entry.kind != NodeKind::Resource {
            return Err(StorageError::InvalidPath(resource.path.clone()));
        }
        Ok(entry.data.clone())
    }
}
