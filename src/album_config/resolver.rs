//! Upward configuration walk.
//!
//! Starting at the album folder (level 0), each call looks at one folder,
//! merges whatever that folder contributes, and recurses into the parent at
//! `level + 1`. The merged state travels through the recursion by value in an
//! [`Accumulator`]; nothing is committed until the walk returns, so a privacy
//! sentinel found high up the chain still discards everything collected
//! below it.
//!
//! Once every requested topic is complete, merging stops but the walk keeps
//! climbing to the declared root checking for the sentinel alone.

use super::parser::{Sections, parse_album_config};
use super::validator::is_safe;
use super::{AlbumInfo, ConfigIssue, EffectiveAlbumConfig, Fragment, Topic};
use crate::settings::{FilesSettings, WalkSettings};
use crate::storage::{Node, NodeId, Storage, StorageError};
use serde_yaml::Value;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Information fields that may point outside a shared folder.
const LINK_FIELDS: &[&str] = &["description_link", "copyright_link"];

/// Bounds of one resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveScope {
    /// Container where the walk stops. Its `features` fragment applies to
    /// every album below it, inherited or not.
    pub root: NodeId,
    /// Levels between the start folder and the viewer's virtual root.
    /// `information` found beyond it loses its link fields. `None` means the
    /// viewer sees everything up to `root`.
    pub share_boundary: Option<usize>,
}

impl ResolveScope {
    pub fn new(root: NodeId) -> Self {
        Self {
            root,
            share_boundary: None,
        }
    }

    pub fn with_share_boundary(mut self, levels: usize) -> Self {
        self.share_boundary = Some(levels);
        self
    }
}

/// Outcome of a resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Album(EffectiveAlbumConfig),
    /// A privacy sentinel sits on the path; the album must not be shown.
    Blocked,
}

/// Per-topic completion flags, false → true only.
#[derive(Debug, Clone, PartialEq, Eq)]
struct CompletionState(BTreeMap<Topic, bool>);

impl CompletionState {
    fn new(topics: &[Topic]) -> Self {
        Self(topics.iter().map(|t| (*t, false)).collect())
    }

    fn incomplete(&self) -> Vec<Topic> {
        self.0
            .iter()
            .filter(|(_, done)| !**done)
            .map(|(t, _)| *t)
            .collect()
    }

    fn mark(&mut self, topic: Topic) {
        self.0.insert(topic, true);
    }

    fn mark_all(&mut self) {
        self.0.values_mut().for_each(|done| *done = true);
    }

    fn all_complete(&self) -> bool {
        self.0.values().all(|done| *done)
    }
}

#[derive(Debug, Clone)]
struct Accumulator {
    topics: BTreeMap<Topic, Fragment>,
    completion: CompletionState,
    error: Option<ConfigIssue>,
}

impl Accumulator {
    fn new(topics: &[Topic]) -> Self {
        Self {
            topics: BTreeMap::new(),
            completion: CompletionState::new(topics),
            error: None,
        }
    }

    /// Take every usable fragment for a still-incomplete topic.
    fn merge(mut self, mut sections: Sections, level: usize, at_root: bool) -> Self {
        for topic in self.completion.incomplete() {
            let Some(fields) = sections.remove(topic.as_str()) else {
                continue;
            };
            let fragment = Fragment { fields, level };

            let inheritable =
                level == 0 || fragment.inherits() || (topic == Topic::Features && at_root);
            if !inheritable {
                continue;
            }
            if !is_safe(topic, &fragment.fields) {
                debug!(topic = topic.as_str(), level, "ignoring unsafe fragment");
                continue;
            }
            // Sorting without a type would pin the order but not the key;
            // leave it open for an ancestor that names both.
            if topic == Topic::Sorting && !fragment.fields.contains_key("type") {
                continue;
            }

            self.topics.insert(topic, fragment);
            self.completion.mark(topic);
        }
        self
    }

    /// Record a broken config file and stop looking further up.
    fn fail(mut self, issue: ConfigIssue) -> Self {
        if self.error.is_none() {
            self.error = Some(issue);
        }
        self.completion.mark_all();
        self
    }

    fn finish(mut self, start: &Node, share_boundary: Option<usize>) -> EffectiveAlbumConfig {
        if let (Some(boundary), Some(info)) =
            (share_boundary, self.topics.get_mut(&Topic::Information))
            && info.level > boundary
        {
            for field in LINK_FIELDS {
                info.fields.insert((*field).to_string(), Value::Null);
            }
        }
        EffectiveAlbumConfig {
            album: AlbumInfo::from(start),
            topics: self.topics,
            error: self.error,
        }
    }
}

enum Walk {
    Done(Accumulator),
    Blocked,
}

/// Resolves the effective configuration of an album folder.
pub struct ConfigResolver<'a, S: Storage + ?Sized> {
    storage: &'a S,
    config_name: &'a str,
    sentinel: &'a str,
    max_depth: usize,
}

impl<'a, S: Storage + ?Sized> ConfigResolver<'a, S> {
    pub fn new(storage: &'a S, files: &'a FilesSettings, walk: &WalkSettings) -> Self {
        Self {
            storage,
            config_name: &files.config_name,
            sentinel: &files.privacy_sentinel,
            max_depth: walk.max_depth,
        }
    }

    /// Resolve `topics` for the album at `start`.
    ///
    /// Merging stops once every requested topic is complete, but the walk
    /// itself does not: it continues to `scope.root` looking only for the
    /// privacy sentinel. The folders visited are therefore every ancestor up
    /// to the root, not just those up to the last merged fragment.
    ///
    /// Storage failures while walking propagate; a broken config file does
    /// not, it is reported through [`EffectiveAlbumConfig::error`].
    pub fn resolve(
        &self,
        start: &Node,
        scope: &ResolveScope,
        topics: &[Topic],
    ) -> Result<Resolution, StorageError> {
        if !start.is_container() {
            return Err(StorageError::NotAContainer(start.path.clone()));
        }
        match self.walk(start.clone(), 0, scope, Accumulator::new(topics))? {
            Walk::Blocked => Ok(Resolution::Blocked),
            Walk::Done(acc) => Ok(Resolution::Album(acc.finish(start, scope.share_boundary))),
        }
    }

    /// Whether `node` lies in or below a folder holding the privacy sentinel,
    /// looking no higher than `root`.
    pub fn is_hidden(&self, node: &Node, root: &NodeId) -> Result<bool, StorageError> {
        let mut current = if node.is_container() {
            Some(node.clone())
        } else {
            self.storage.parent(node)?
        };
        let mut level = 0;
        while let Some(folder) = current {
            if self.storage.has_child(&folder, self.sentinel)? {
                return Ok(true);
            }
            if &folder.id == root || level >= self.max_depth {
                break;
            }
            current = self.storage.parent(&folder)?;
            level += 1;
        }
        Ok(false)
    }

    fn walk(
        &self,
        folder: Node,
        level: usize,
        scope: &ResolveScope,
        acc: Accumulator,
    ) -> Result<Walk, StorageError> {
        if self.storage.has_child(&folder, self.sentinel)? {
            debug!(path = %folder.path, level, "privacy sentinel on album path");
            return Ok(Walk::Blocked);
        }

        let at_root = folder.id == scope.root;
        let acc = if acc.completion.all_complete() {
            acc
        } else {
            self.collect(&folder, level, at_root, acc)?
        };

        if at_root {
            return Ok(Walk::Done(acc));
        }
        if level >= self.max_depth {
            warn!(
                path = %folder.path,
                max_depth = self.max_depth,
                "config walk reached its depth limit before the root"
            );
            return Ok(Walk::Done(acc));
        }
        match self.storage.parent(&folder)? {
            Some(parent) => self.walk(parent, level + 1, scope, acc),
            None => Ok(Walk::Done(acc)),
        }
    }

    /// Merge the contribution of one folder's config file, if any.
    fn collect(
        &self,
        folder: &Node,
        level: usize,
        at_root: bool,
        acc: Accumulator,
    ) -> Result<Accumulator, StorageError> {
        let Some(file) = self.storage.child(folder, self.config_name)? else {
            return Ok(acc);
        };
        if !file.is_resource() {
            return Ok(acc);
        }

        let parsed = self
            .storage
            .read(&file)
            .map_err(|e| e.to_string())
            .and_then(|bytes| parse_album_config(&bytes).map_err(|e| e.to_string()));

        match parsed {
            Ok(sections) => Ok(acc.merge(sections, level, at_root)),
            Err(message) => {
                warn!(path = %file.path, error = %message, "unusable album config");
                Ok(acc.fail(ConfigIssue {
                    message,
                    path: file.path,
                    level,
                }))
            }
        }
    }
}
